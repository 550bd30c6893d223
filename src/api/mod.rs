//! Typed facades over the Engine API, one module per resource family.

mod containers;
mod events;
mod execs;
mod images;
mod networks;
mod swarm;
mod system;
mod version;
mod volumes;

pub use containers::*;
pub use events::*;
pub use execs::*;
pub use images::*;
pub use networks::*;
pub use swarm::*;
pub use system::*;
pub use version::*;
pub use volumes::*;
