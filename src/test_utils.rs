use bytes::Bytes;
use hyper::StatusCode;
use mockall::mock;

use crate::docker::Docker;
use crate::endpoint::Endpoint;
use crate::error::Error;
use crate::transport::{Body, Request, Response, Transport};

mock! {
    pub Transport {}

    impl Transport for Transport {
        async fn execute(&self, request: Request) -> Result<Response, Error>;
    }
}

/// A client over a mock transport, based at the default API version.
pub fn docker_with(transport: MockTransport) -> Docker<MockTransport> {
    Docker::with_transport(transport, Endpoint::new("/v1.48"))
}

/// A response delivering `body` in a single chunk.
pub fn json_response(status: StatusCode, uri: &str, body: &str) -> Response {
    Response::new(status, uri, Body::from_bytes(body.to_owned()))
}

/// A response with no body at all.
pub fn empty_response(status: StatusCode, uri: &str) -> Response {
    Response::new(status, uri, Body::empty())
}

/// A response delivering its body split across the given chunks, for
/// exercising framing-sensitive consumers.
pub fn chunked_response(status: StatusCode, uri: &str, chunks: Vec<&str>) -> Response {
    let chunks: Vec<Result<Bytes, Error>> = chunks
        .into_iter()
        .map(|chunk| Ok(Bytes::from(chunk.to_owned())))
        .collect();
    Response::new(
        status,
        uri,
        Body::from_stream(futures_util::stream::iter(chunks)),
    )
}
