#![doc = include_str!("../README.md")]

pub mod api;
pub mod decode;
mod docker;
mod endpoint;
mod error;
mod filters;
pub mod transport;

#[cfg(test)]
pub(crate) mod test_utils;

pub use docker::{API_DEFAULT_VERSION, Capability, Docker};
pub use endpoint::{Endpoint, Query};
pub use error::Error;
pub use filters::Filters;
pub use transport::{Body, HttpTransport, Request, Response, Transport};
