use hyper::StatusCode;

use crate::docker::Capability;

/// The error type for every operation in this crate.
///
/// Operations never retry and never recover locally; whichever of these five
/// kinds a call hits is returned to its direct caller unchanged.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The request never produced a usable response: connect, handshake,
    /// timeout, or an interrupted body stream.
    #[error("transport error for {uri}: {source}")]
    Transport {
        /// The request URI (path and query).
        uri: String,
        /// The underlying failure, preserved for downcasting.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// The daemon answered with a status code outside the operation's
    /// accepted set. The status is preserved verbatim and the body is
    /// carried as raw text, never decoded.
    #[error("{uri} returned {status}: {message}")]
    Remote {
        /// The request URI (path and query).
        uri: String,
        /// The status line the daemon actually sent.
        status: StatusCode,
        /// The raw response body, read best-effort.
        message: String,
    },
    /// A request or response body could not be serialized or parsed as the
    /// JSON shape the operation expects. Distinct from [`Error::Remote`]:
    /// the daemon did not refuse, the payload contract did not hold.
    #[error("could not decode body for {uri}: {message}")]
    Decode {
        /// The request URI (path and query).
        uri: String,
        /// What went wrong while (de)serializing.
        message: String,
    },
    /// The Engine exposes this capability but the client does not implement
    /// it. Raised when the capability is requested, never a silent no-op.
    #[error("{0} is not supported by this client")]
    Unsupported(Capability),
    /// The daemon reported a failure inside an otherwise successful progress
    /// stream, e.g. an image pull that returned 200 and then failed
    /// mid-transfer.
    #[error("daemon reported an error mid-stream: {message}")]
    Stream {
        /// The daemon's in-band error text.
        message: String,
    },
}

impl Error {
    pub(crate) fn transport(
        uri: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Error::Transport {
            uri: uri.into(),
            source: source.into(),
        }
    }

    pub(crate) fn decode(uri: impl Into<String>, message: impl ToString) -> Self {
        Error::Decode {
            uri: uri.into(),
            message: message.to_string(),
        }
    }

    /// The remote status code, when the daemon answered at all.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::Remote { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True when the daemon answered 404 for the addressed resource.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND)
    }

    /// True when the daemon answered 409, e.g. removing a running container
    /// or a volume that is still in use.
    pub fn is_conflict(&self) -> bool {
        self.status() == Some(StatusCode::CONFLICT)
    }
}
