//! Status matching and body decoding.
//!
//! Every operation runs the same pipeline: [`accept`] checks the status line
//! against the set the Engine documents for that operation, then one decoder
//! consumes the body stream exactly once. Matching always happens first, so a
//! 404 never reaches a JSON parser no matter what the error body contains.

use hyper::StatusCode;
use serde_json::{Map, Value};

use crate::error::Error;
use crate::transport::Response;

/// Returns the response untouched when its status is in `accepted`.
///
/// On a mismatch the body is read best-effort as text (a failure while
/// reading it is swallowed) and the exchange becomes [`Error::Remote`] with
/// the verbatim status code and the request URI.
pub async fn accept(response: Response, accepted: &[StatusCode]) -> Result<Response, Error> {
    if accepted.contains(&response.status()) {
        return Ok(response);
    }
    let status = response.status();
    let uri = response.uri().to_owned();
    let message = response.text().await.unwrap_or_default();
    Err(Error::Remote {
        uri,
        status,
        message,
    })
}

/// Parses the body as arbitrary JSON.
pub async fn value(response: Response) -> Result<Value, Error> {
    let uri = response.uri().to_owned();
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| Error::decode(uri, e))
}

/// Parses the body as a JSON object.
pub async fn object(response: Response) -> Result<Map<String, Value>, Error> {
    let uri = response.uri().to_owned();
    match value(response).await? {
        Value::Object(map) => Ok(map),
        other => Err(Error::decode(
            uri,
            format!("expected a JSON object, found {}", kind(&other)),
        )),
    }
}

/// Parses the body as a JSON array.
pub async fn array(response: Response) -> Result<Vec<Value>, Error> {
    let uri = response.uri().to_owned();
    match value(response).await? {
        Value::Array(items) => Ok(items),
        other => Err(Error::decode(
            uri,
            format!("expected a JSON array, found {}", kind(&other)),
        )),
    }
}

/// Collects the body as text, replacing invalid UTF-8.
pub async fn text(response: Response) -> Result<String, Error> {
    response.text().await
}

/// Consumes and discards the body. Lifecycle endpoints answer 204 with an
/// empty payload; draining keeps the consumed-exactly-once contract.
pub async fn drain(response: Response) -> Result<(), Error> {
    response.bytes().await.map(|_| ())
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
