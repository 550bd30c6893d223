use std::env;
use std::fmt;
use std::path::PathBuf;

use hyper::StatusCode;

use crate::api::{
    Containers, Events, Execs, Images, Info, Networks, Swarm, System, Version, Volumes,
};
use crate::decode;
use crate::endpoint::Endpoint;
use crate::error::Error;
use crate::transport::{HttpTransport, Request, Response, Transport};

/// The Engine API version the shipped constructors prefix onto every path.
pub const API_DEFAULT_VERSION: &str = "v1.48";

const DEFAULT_SOCKET: &str = "/var/run/docker.sock";

/// A family of Engine functionality.
///
/// The set a [`Docker`] client implements is fixed at construction and
/// published as [`Docker::SUPPORTED`]; asking for anything else through
/// [`Docker::require`] fails with [`Error::Unsupported`] instead of
/// surprising the caller deep inside an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Containers,
    Images,
    Networks,
    Volumes,
    Exec,
    Swarm,
    System,
    Events,
    Plugins,
    Secrets,
    Configs,
    Services,
    Nodes,
    Tasks,
    Distribution,
    Session,
}

impl Capability {
    fn as_str(self) -> &'static str {
        match self {
            Capability::Containers => "containers",
            Capability::Images => "images",
            Capability::Networks => "networks",
            Capability::Volumes => "volumes",
            Capability::Exec => "exec",
            Capability::Swarm => "swarm",
            Capability::System => "system",
            Capability::Events => "events",
            Capability::Plugins => "plugins",
            Capability::Secrets => "secrets",
            Capability::Configs => "configs",
            Capability::Services => "services",
            Capability::Nodes => "nodes",
            Capability::Tasks => "tasks",
            Capability::Distribution => "distribution",
            Capability::Session => "session",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The entry point for talking to a Docker Engine.
///
/// A `Docker` value is a versioned base endpoint plus an injected
/// [`Transport`]; it holds no other state. Family accessors
/// ([`containers`](Docker::containers), [`images`](Docker::images), ...)
/// return short-lived facades bound to the family's endpoint; facades are
/// constructed per call and never cached, so a shared `&Docker` is all that
/// concurrent callers need.
///
/// # Examples
///
/// ```no_run
/// use dockhand::Docker;
///
/// # async fn demo() -> Result<(), dockhand::Error> {
/// let docker = Docker::unix("/var/run/docker.sock");
/// if docker.ping().await? {
///     println!("daemon is up");
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Docker<T = HttpTransport> {
    transport: T,
    base: Endpoint,
}

impl Docker<HttpTransport> {
    /// Connects over the daemon's Unix socket.
    pub fn unix(path: impl Into<PathBuf>) -> Self {
        Self::with_transport(HttpTransport::unix(path), Self::default_base())
    }

    /// Connects over plain TCP.
    pub fn tcp(host: impl Into<String>, port: u16) -> Self {
        Self::with_transport(HttpTransport::tcp(host, port), Self::default_base())
    }

    /// Honors `DOCKER_HOST` (`unix://` and `tcp://` schemes), falling back
    /// to `/var/run/docker.sock` when it is unset.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::Transport`] when `DOCKER_HOST` carries a scheme
    /// the shipped transports cannot speak.
    pub fn from_env() -> Result<Self, Error> {
        match env::var("DOCKER_HOST") {
            Ok(host) => Self::from_host(&host),
            Err(_) => Ok(Self::unix(DEFAULT_SOCKET)),
        }
    }

    fn from_host(host: &str) -> Result<Self, Error> {
        if let Some(path) = host.strip_prefix("unix://") {
            return Ok(Self::unix(path));
        }
        if let Some(address) = host.strip_prefix("tcp://") {
            // DOCKER_HOST without a port means the conventional 2375.
            let (name, port) = match address.rsplit_once(':') {
                Some((name, port)) => {
                    let port = port.parse::<u16>().map_err(|e| Error::transport(host, e))?;
                    (name, port)
                }
                None => (address, 2375),
            };
            return Ok(Self::tcp(name, port));
        }
        Err(Error::transport(
            host,
            format!("unsupported DOCKER_HOST scheme: {host}"),
        ))
    }

    fn default_base() -> Endpoint {
        Endpoint::new(format!("/{API_DEFAULT_VERSION}"))
    }
}

impl<T: Transport> Docker<T> {
    /// The families this client implements. Everything else the Engine
    /// exposes is reported through [`Error::Unsupported`].
    pub const SUPPORTED: &'static [Capability] = &[
        Capability::Containers,
        Capability::Images,
        Capability::Networks,
        Capability::Volumes,
        Capability::Exec,
        Capability::Swarm,
        Capability::System,
        Capability::Events,
    ];

    /// Builds a client from any transport and base endpoint, e.g. a pooled
    /// TLS client pointed at `/v1.43`.
    pub fn with_transport(transport: T, base: Endpoint) -> Self {
        Self { transport, base }
    }

    /// True when this client implements the capability.
    pub fn supports(&self, capability: Capability) -> bool {
        Self::SUPPORTED.contains(&capability)
    }

    /// Guards an optional integration point.
    ///
    /// # Errors
    ///
    /// [`Error::Unsupported`] naming the capability when this client does
    /// not implement it.
    pub fn require(&self, capability: Capability) -> Result<(), Error> {
        if self.supports(capability) {
            Ok(())
        } else {
            Err(Error::Unsupported(capability))
        }
    }

    /// The container family, rooted at `/containers`.
    pub fn containers(&self) -> Containers<'_, T> {
        Containers::new(self)
    }

    /// The image family, rooted at `/images`.
    pub fn images(&self) -> Images<'_, T> {
        Images::new(self)
    }

    /// The network family, rooted at `/networks`.
    pub fn networks(&self) -> Networks<'_, T> {
        Networks::new(self)
    }

    /// The volume family, rooted at `/volumes`.
    pub fn volumes(&self) -> Volumes<'_, T> {
        Volumes::new(self)
    }

    /// Exec instances, rooted at `/exec`.
    pub fn execs(&self) -> Execs<'_, T> {
        Execs::new(self)
    }

    /// Swarm membership, rooted at `/swarm`.
    pub fn swarm(&self) -> Swarm<'_, T> {
        Swarm::new(self)
    }

    /// System-level reports, rooted at `/system`.
    pub fn system(&self) -> System<'_, T> {
        System::new(self)
    }

    /// The daemon's event feed, rooted at `/events`.
    pub fn events(&self) -> Events<'_, T> {
        Events::new(self)
    }

    /// Probes daemon liveness.
    ///
    /// Returns `true` iff the daemon answered 200; any other status is
    /// `false`. Transport failures still propagate as errors, so
    /// "unreachable" and "unhealthy" stay distinguishable.
    pub async fn ping(&self) -> Result<bool, Error> {
        let uri = self.base.join("_ping").to_string();
        let response = self.transport.execute(Request::get(uri)).await?;
        let healthy = response.status() == StatusCode::OK;
        decode::drain(response).await?;
        Ok(healthy)
    }

    /// Fetches the daemon's version report.
    pub async fn version(&self) -> Result<Version, Error> {
        let uri = self.base.join("version").to_string();
        let response = self.execute(Request::get(uri), &[StatusCode::OK]).await?;
        Ok(Version::new(decode::object(response).await?))
    }

    /// Fetches the system-wide information report.
    pub async fn info(&self) -> Result<Info, Error> {
        let uri = self.base.join("info").to_string();
        let response = self.execute(Request::get(uri), &[StatusCode::OK]).await?;
        Ok(Info::new(decode::object(response).await?))
    }

    pub(crate) fn base(&self) -> &Endpoint {
        &self.base
    }

    /// One exchange, status-matched. Decoding is the caller's business.
    pub(crate) async fn execute(
        &self,
        request: Request,
        accepted: &[StatusCode],
    ) -> Result<Response, Error> {
        let response = self.transport.execute(request).await?;
        decode::accept(response, accepted).await
    }
}
