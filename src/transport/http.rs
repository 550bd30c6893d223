use std::path::PathBuf;
use std::time::Duration;

use bytes::Bytes;
use futures_util::StreamExt;
use http_body_util::{BodyExt, Full};
use hyper::HeaderMap;
use hyper::body::Incoming;
use hyper::client::conn::http1;
use hyper::header::{CONTENT_TYPE, HOST, HeaderName, HeaderValue};
use hyper_util::rt::TokioIo;
use tokio::net::{TcpStream, UnixStream};

use super::{Body, Request, Response, Transport};
use crate::error::Error;

/// The shipped [`Transport`]: plain HTTP/1.1 over a Unix socket or TCP.
///
/// Every call opens a fresh connection, performs one exchange, and lets the
/// connection close once the body has been consumed. Pooling, TLS, and
/// proxies are the business of custom [`Transport`] implementations.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use dockhand::HttpTransport;
///
/// let transport = HttpTransport::unix("/var/run/docker.sock")
///     .with_timeout(Duration::from_secs(30));
/// # let _ = transport;
/// ```
#[derive(Debug, Clone)]
pub struct HttpTransport {
    target: Target,
    timeout: Option<Duration>,
    headers: HeaderMap,
}

#[derive(Debug, Clone)]
enum Target {
    Unix { path: PathBuf },
    Tcp { host: String, port: u16 },
}

impl HttpTransport {
    /// A transport over the daemon's Unix socket, e.g. `/var/run/docker.sock`.
    pub fn unix(path: impl Into<PathBuf>) -> Self {
        Self {
            target: Target::Unix { path: path.into() },
            timeout: None,
            headers: HeaderMap::new(),
        }
    }

    /// A transport over plain TCP, e.g. a daemon bound to `127.0.0.1:2375`.
    pub fn tcp(host: impl Into<String>, port: u16) -> Self {
        Self {
            target: Target::Tcp {
                host: host.into(),
                port,
            },
            timeout: None,
            headers: HeaderMap::new(),
        }
    }

    /// Caps connect, handshake, and response-head time for every request.
    ///
    /// Body streams are not covered: logs and event streams may legitimately
    /// idle far longer than any sensible request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Adds a header to every request, e.g. `X-Registry-Auth` for pulls from
    /// a private registry.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    fn host_header(&self) -> String {
        match &self.target {
            Target::Unix { .. } => "localhost".to_string(),
            Target::Tcp { host, port } => format!("{host}:{port}"),
        }
    }

    fn build_request(&self, request: &Request) -> Result<hyper::Request<Full<Bytes>>, Error> {
        let mut builder = hyper::Request::builder()
            .method(request.method().clone())
            .uri(request.uri())
            .header(HOST, self.host_header());
        for (name, value) in &self.headers {
            builder = builder.header(name, value);
        }
        if request.body().is_some() {
            builder = builder.header(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }
        let body = request.body().cloned().unwrap_or_default();
        builder
            .body(Full::new(body))
            .map_err(|e| Error::transport(request.uri(), e))
    }

    async fn connect(&self, uri: &str) -> Result<http1::SendRequest<Full<Bytes>>, Error> {
        match &self.target {
            Target::Unix { path } => {
                let stream = UnixStream::connect(path)
                    .await
                    .map_err(|e| Error::transport(uri, e))?;
                Self::handshake(stream, uri).await
            }
            Target::Tcp { host, port } => {
                let stream = TcpStream::connect((host.as_str(), *port))
                    .await
                    .map_err(|e| Error::transport(uri, e))?;
                Self::handshake(stream, uri).await
            }
        }
    }

    async fn handshake<S>(stream: S, uri: &str) -> Result<http1::SendRequest<Full<Bytes>>, Error>
    where
        S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + Send + 'static,
    {
        let (sender, connection) = http1::handshake(TokioIo::new(stream))
            .await
            .map_err(|e| Error::transport(uri, e))?;
        // The spawned task drives the exchange, body stream included, and
        // finishes when the peer closes or the body is dropped.
        tokio::spawn(async move {
            if let Err(err) = connection.await {
                tracing::debug!(error = %err, "engine connection terminated");
            }
        });
        Ok(sender)
    }
}

impl Transport for HttpTransport {
    async fn execute(&self, request: Request) -> Result<Response, Error> {
        let uri = request.uri().to_owned();
        let http_request = self.build_request(&request)?;

        let exchange = async {
            let mut sender = self.connect(&uri).await?;
            sender
                .send_request(http_request)
                .await
                .map_err(|e| Error::transport(uri.as_str(), e))
        };
        let response = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, exchange)
                .await
                .map_err(|e| Error::transport(uri.as_str(), e))?,
            None => exchange.await,
        }?;

        tracing::trace!(
            method = %request.method(),
            uri = %uri,
            status = %response.status(),
            "engine exchange"
        );

        Ok(into_response(response, uri))
    }
}

fn into_response(response: hyper::Response<Incoming>, uri: String) -> Response {
    let (parts, incoming) = response.into_parts();
    let error_uri = uri.clone();
    let chunks = incoming
        .into_data_stream()
        .map(move |chunk| chunk.map_err(|e| Error::transport(error_uri.clone(), e)));
    Response::new(parts.status, uri, Body::from_stream(chunks)).with_headers(parts.headers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_build_request_sets_host_and_method() {
        let transport = HttpTransport::unix("/var/run/docker.sock");

        let request = transport
            .build_request(&Request::get("/v1.48/_ping"))
            .unwrap();

        assert_eq!(request.method(), hyper::Method::GET);
        assert_eq!(request.uri().path(), "/v1.48/_ping");
        assert_eq!(
            request.headers().get(HOST).unwrap().to_str().unwrap(),
            "localhost"
        );
        assert!(request.headers().get(CONTENT_TYPE).is_none());
    }

    #[test]
    fn test_build_request_keeps_the_query() {
        let transport = HttpTransport::unix("/var/run/docker.sock");

        let request = transport
            .build_request(&Request::get("/v1.48/containers/json?all=true"))
            .unwrap();

        assert_eq!(request.uri().path(), "/v1.48/containers/json");
        assert_eq!(request.uri().query(), Some("all=true"));
    }

    #[test]
    fn test_build_request_marks_json_bodies() {
        let transport = HttpTransport::unix("/var/run/docker.sock");
        let request = Request::post_json("/v1.48/volumes/create", &serde_json::json!({
            "Name": "data"
        }))
        .unwrap();

        let built = transport.build_request(&request).unwrap();

        assert_eq!(
            built.headers().get(CONTENT_TYPE).unwrap().to_str().unwrap(),
            "application/json"
        );
    }

    #[test]
    fn test_tcp_host_header_includes_the_port() {
        let transport = HttpTransport::tcp("127.0.0.1", 2375);

        assert_eq!(transport.host_header(), "127.0.0.1:2375");
    }

    #[test]
    fn test_default_headers_are_applied() {
        let transport = HttpTransport::unix("/var/run/docker.sock").with_header(
            HeaderName::from_static("x-registry-auth"),
            HeaderValue::from_static("c2VjcmV0"),
        );

        let request = transport
            .build_request(&Request::post("/v1.48/images/create?fromImage=alpine"))
            .unwrap();

        assert_eq!(
            request
                .headers()
                .get("x-registry-auth")
                .unwrap()
                .to_str()
                .unwrap(),
            "c2VjcmV0"
        );
    }
}
