//! The wire seam: one trait, one request shape, one response shape.
//!
//! Everything above this module speaks [`Request`] and [`Response`]; everything
//! below it is an implementation detail of whichever [`Transport`] the caller
//! injected. The shipped implementation is [`HttpTransport`]; anything that can
//! perform an HTTP exchange (a pooled client, a TLS tunnel, a test double) can
//! stand in by implementing the trait.

mod http;

pub use http::HttpTransport;

use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::{Bytes, BytesMut};
use futures_util::{Stream, StreamExt};
use hyper::{HeaderMap, Method, StatusCode};
use serde::Serialize;

use crate::error::Error;

/// A single HTTP exchange against the Engine.
///
/// One call to [`execute`] is one attempt: no retry, no backoff, no caching.
/// Implementations resolve with a [`Response`] as soon as the status line and
/// headers are in; the body streams afterwards.
///
/// [`execute`]: Transport::execute
pub trait Transport {
    /// Executes the request and resolves with the response head and a body
    /// stream, or a [`Error::Transport`] when no usable response arrived.
    fn execute(&self, request: Request) -> impl Future<Output = Result<Response, Error>>;
}

/// An Engine API request: verb, versioned path with query, optional JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    method: Method,
    uri: String,
    body: Option<Bytes>,
}

impl Request {
    /// A bodyless GET.
    pub fn get(uri: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            uri: uri.into(),
            body: None,
        }
    }

    /// A bodyless POST. Most lifecycle operations (start, stop, rename)
    /// take their arguments through the query string.
    pub fn post(uri: impl Into<String>) -> Self {
        Self {
            method: Method::POST,
            uri: uri.into(),
            body: None,
        }
    }

    /// A bodyless DELETE.
    pub fn delete(uri: impl Into<String>) -> Self {
        Self {
            method: Method::DELETE,
            uri: uri.into(),
            body: None,
        }
    }

    /// A POST carrying `payload` serialized as JSON.
    pub fn post_json<S: Serialize + ?Sized>(
        uri: impl Into<String>,
        payload: &S,
    ) -> Result<Self, Error> {
        let uri = uri.into();
        let body = serde_json::to_vec(payload)
            .map_err(|e| Error::decode(&uri, format!("could not serialize request body: {e}")))?;
        Ok(Self {
            method: Method::POST,
            uri,
            body: Some(Bytes::from(body)),
        })
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The path and query this request addresses, e.g.
    /// `/v1.48/containers/json?all=true`.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }
}

/// The response head plus a body stream that is consumed exactly once.
///
/// The request URI is echoed so that status matching and decoding can name
/// the operation in their errors.
#[derive(Debug)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    uri: String,
    body: Body,
}

impl Response {
    pub fn new(status: StatusCode, uri: impl Into<String>, body: Body) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            uri: uri.into(),
            body,
        }
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// The URI of the request that produced this response.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Hands over the body stream, dropping the head.
    pub fn into_body(self) -> Body {
        self.body
    }

    /// Collects the whole body into one buffer.
    pub async fn bytes(self) -> Result<Bytes, Error> {
        let mut body = self.body;
        let mut buffer = BytesMut::new();
        while let Some(chunk) = body.next().await {
            buffer.extend_from_slice(&chunk?);
        }
        Ok(buffer.freeze())
    }

    /// Collects the whole body as text, replacing invalid UTF-8.
    pub async fn text(self) -> Result<String, Error> {
        let bytes = self.bytes().await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// A streaming response payload.
pub struct Body {
    inner: Pin<Box<dyn Stream<Item = Result<Bytes, Error>> + Send>>,
}

impl Body {
    /// Wraps an arbitrary chunk stream.
    pub fn from_stream(
        stream: impl Stream<Item = Result<Bytes, Error>> + Send + 'static,
    ) -> Self {
        Self {
            inner: Box::pin(stream),
        }
    }

    /// A body with no chunks at all.
    pub fn empty() -> Self {
        Self::from_stream(futures_util::stream::empty())
    }

    /// A single-chunk body, mostly useful for tests and stubbed transports.
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        let bytes = bytes.into();
        Self::from_stream(futures_util::stream::once(async move { Ok(bytes) }))
    }
}

impl Stream for Body {
    type Item = Result<Bytes, Error>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Body { .. }")
    }
}
