use std::collections::HashMap;
use std::pin::Pin;
use std::task::{Context, Poll};

use chrono::{DateTime, Utc};
use futures_util::Stream;
use hyper::StatusCode;
use pin_project::pin_project;
use serde_json::Value;

use crate::docker::Docker;
use crate::endpoint::{Endpoint, Query};
use crate::error::Error;
use crate::filters::Filters;
use crate::transport::{Body, Request, Transport};

/// Facade for `/events`, the daemon's activity feed.
pub struct Events<'d, T> {
    docker: &'d Docker<T>,
    base: Endpoint,
}

impl<'d, T: Transport> Events<'d, T> {
    pub(crate) fn new(docker: &'d Docker<T>) -> Self {
        Self {
            docker,
            base: docker.base().join("events"),
        }
    }

    /// Subscribes to the event feed (`GET /events`).
    ///
    /// Without an `until` bound the daemon never closes the feed; the
    /// returned stream then yields until dropped. Lag is absorbed by
    /// transport backpressure, not by skipping events.
    pub async fn watch(&self, options: &EventsOptions) -> Result<EventStream, Error> {
        let uri = self.base.with_query(&options.to_query());
        let response = self
            .docker
            .execute(Request::get(uri), &[StatusCode::OK])
            .await?;
        Ok(EventStream::new(response))
    }
}

/// Options for subscribing to events.
///
/// # Examples
///
/// ```
/// use dockhand::Filters;
/// use dockhand::api::EventsOptions;
///
/// let options = EventsOptions::builder()
///     .filters(Filters::new().add("type", "container"))
///     .build();
/// ```
#[derive(Debug, Clone, Default, PartialEq, typed_builder::TypedBuilder)]
#[builder(doc)]
pub struct EventsOptions {
    /// Only events after this timestamp
    #[builder(default, setter(strip_option))]
    pub since: Option<DateTime<Utc>>,
    /// Only events before this timestamp; also makes the feed finite
    #[builder(default, setter(strip_option))]
    pub until: Option<DateTime<Utc>>,
    /// Engine filters, e.g. by object type or container
    #[builder(default)]
    pub filters: Filters,
}

impl EventsOptions {
    fn to_query(&self) -> Query {
        let mut query = Query::new();
        if let Some(since) = self.since {
            query.push("since", since.timestamp());
        }
        if let Some(until) = self.until {
            query.push("until", until.timestamp());
        }
        if !self.filters.is_empty() {
            query.push("filters", self.filters.encode());
        }
        query
    }
}

/// Stream of [`Event`]s decoded from the daemon's newline-delimited JSON
/// feed.
///
/// Chunk boundaries carry no meaning; events are cut at newlines regardless
/// of how the transport framed the bytes. Dropping the stream ends the
/// subscription.
#[pin_project]
pub struct EventStream {
    #[pin]
    body: Body,
    buffer: Vec<u8>,
    uri: String,
    done: bool,
}

impl EventStream {
    fn new(response: crate::transport::Response) -> Self {
        let uri = response.uri().to_owned();
        Self {
            body: response.into_body(),
            buffer: Vec::new(),
            uri,
            done: false,
        }
    }
}

fn parse_event(line: &[u8], uri: &str) -> Result<Event, Error> {
    let value: Value =
        serde_json::from_slice(line).map_err(|err| Error::decode(uri, err))?;
    match value {
        Value::Object(map) => Ok(Event::new(map)),
        _ => Err(Error::decode(uri, "expected a JSON object per event line")),
    }
}

impl Stream for EventStream {
    type Item = Result<Event, Error>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();
        loop {
            if let Some(pos) = this.buffer.iter().position(|&b| b == b'\n') {
                let line: Vec<u8> = this.buffer.drain(..=pos).collect();
                let line = &line[..line.len() - 1];
                if line.iter().all(u8::is_ascii_whitespace) {
                    continue;
                }
                return Poll::Ready(Some(parse_event(line, this.uri)));
            }

            if *this.done {
                // Trailing event the daemon sent without a final newline.
                if this.buffer.iter().any(|b| !b.is_ascii_whitespace()) {
                    let line = std::mem::take(this.buffer);
                    return Poll::Ready(Some(parse_event(&line, this.uri)));
                }
                this.buffer.clear();
                return Poll::Ready(None);
            }

            match this.body.as_mut().poll_next(cx) {
                Poll::Ready(Some(Ok(chunk))) => this.buffer.extend_from_slice(&chunk),
                Poll::Ready(Some(Err(err))) => return Poll::Ready(Some(Err(err))),
                Poll::Ready(None) => *this.done = true,
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

impl std::fmt::Debug for EventStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventStream")
            .field("uri", &self.uri)
            .field("buffered", &self.buffer.len())
            .field("done", &self.done)
            .finish()
    }
}

/// One event from the daemon's feed.
#[derive(Debug, Clone)]
pub struct Event {
    value: Value,
}

impl Event {
    fn new(map: serde_json::Map<String, Value>) -> Self {
        Self {
            value: Value::Object(map),
        }
    }

    /// The object kind the event concerns, e.g. `container` or `image`
    /// (the Engine's `Type` field).
    pub fn kind(&self) -> Option<&str> {
        self.value.get("Type").and_then(Value::as_str)
    }

    /// What happened, e.g. `create`, `start`, `die`.
    pub fn action(&self) -> Option<&str> {
        self.value.get("Action").and_then(Value::as_str)
    }

    /// Event scope, `local` or `swarm`.
    pub fn scope(&self) -> Option<&str> {
        self.value.get("scope").and_then(Value::as_str)
    }

    /// The ID of the object the event concerns.
    pub fn actor_id(&self) -> Option<&str> {
        self.value.pointer("/Actor/ID").and_then(Value::as_str)
    }

    /// Actor attributes, e.g. the container name and image.
    pub fn actor_attributes(&self) -> HashMap<&str, &str> {
        self.value
            .pointer("/Actor/Attributes")
            .and_then(Value::as_object)
            .map(|attributes| {
                attributes
                    .iter()
                    .filter_map(|(key, value)| value.as_str().map(|v| (key.as_str(), v)))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// When the event happened, at second precision.
    pub fn time(&self) -> Option<DateTime<Utc>> {
        self.value
            .get("time")
            .and_then(Value::as_i64)
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
    }

    /// When the event happened, in nanoseconds since the epoch.
    pub fn time_nanos(&self) -> Option<i64> {
        self.value.get("timeNano").and_then(Value::as_i64)
    }

    /// The raw JSON the event was built from.
    pub fn as_json(&self) -> &Value {
        &self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{MockTransport, chunked_response, docker_with, json_response};
    use bytes::Bytes;
    use futures_util::StreamExt;
    use mockall::predicate::eq;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_watch_forwards_bounds_and_filters() {
        // Arrange
        let mut transport = MockTransport::new();
        transport
            .expect_execute()
            .with(eq(Request::get(
                "/v1.48/events?since=1234567890&until=1234567900&filters=%7B%22type%22%3A%5B%22container%22%5D%7D",
            )))
            .times(1)
            .returning(|_| Ok(json_response(StatusCode::OK, "/v1.48/events", "")));
        let docker = docker_with(transport);

        // Act
        let options = EventsOptions::builder()
            .since(DateTime::from_timestamp(1_234_567_890, 0).unwrap())
            .until(DateTime::from_timestamp(1_234_567_900, 0).unwrap())
            .filters(Filters::new().add("type", "container"))
            .build();
        let mut stream = docker.events().watch(&options).await.unwrap();

        // Assert
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_events_are_cut_at_newlines_not_chunks() {
        // Arrange
        let mut transport = MockTransport::new();
        transport.expect_execute().times(1).returning(|_| {
            Ok(chunked_response(
                StatusCode::OK,
                "/v1.48/events",
                vec![
                    "{\"Type\":\"conta",
                    "iner\",\"Action\":\"start\"}\n{\"Type\":\"image\",",
                    "\"Action\":\"pull\"}\n",
                ],
            ))
        });
        let docker = docker_with(transport);

        // Act
        let mut stream = docker
            .events()
            .watch(&EventsOptions::default())
            .await
            .unwrap();
        let first = stream.next().await.unwrap().unwrap();
        let second = stream.next().await.unwrap().unwrap();

        // Assert
        assert_eq!(first.kind(), Some("container"));
        assert_eq!(first.action(), Some("start"));
        assert_eq!(second.kind(), Some("image"));
        assert_eq!(second.action(), Some("pull"));
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_trailing_event_without_newline_is_yielded() {
        // Arrange
        let mut transport = MockTransport::new();
        transport.expect_execute().times(1).returning(|_| {
            Ok(json_response(
                StatusCode::OK,
                "/v1.48/events",
                "{\"Type\":\"container\",\"Action\":\"die\"}",
            ))
        });
        let docker = docker_with(transport);

        // Act
        let mut stream = docker
            .events()
            .watch(&EventsOptions::default())
            .await
            .unwrap();
        let event = stream.next().await.unwrap().unwrap();

        // Assert
        assert_eq!(event.action(), Some("die"));
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_blank_lines_are_skipped() {
        // Arrange
        let mut transport = MockTransport::new();
        transport.expect_execute().times(1).returning(|_| {
            Ok(chunked_response(
                StatusCode::OK,
                "/v1.48/events",
                vec!["\n  \n{\"Type\":\"volume\",\"Action\":\"create\"}\n\n"],
            ))
        });
        let docker = docker_with(transport);

        // Act
        let mut stream = docker
            .events()
            .watch(&EventsOptions::default())
            .await
            .unwrap();
        let event = stream.next().await.unwrap().unwrap();

        // Assert
        assert_eq!(event.kind(), Some("volume"));
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_malformed_line_is_a_decode_error() {
        // Arrange
        let mut transport = MockTransport::new();
        transport.expect_execute().times(1).returning(|_| {
            Ok(chunked_response(
                StatusCode::OK,
                "/v1.48/events",
                vec!["not json\n{\"Type\":\"container\",\"Action\":\"start\"}\n"],
            ))
        });
        let docker = docker_with(transport);

        // Act
        let mut stream = docker
            .events()
            .watch(&EventsOptions::default())
            .await
            .unwrap();
        let error = stream.next().await.unwrap().unwrap_err();
        let event = stream.next().await.unwrap().unwrap();

        // Assert
        let Error::Decode { uri, .. } = error else {
            panic!("expected a decode error");
        };
        assert_eq!(uri, "/v1.48/events");
        assert_eq!(event.action(), Some("start"));
    }

    #[tokio::test]
    async fn test_transport_failure_mid_stream_propagates() {
        // Arrange
        let mut transport = MockTransport::new();
        transport.expect_execute().times(1).returning(|_| {
            let chunks: Vec<Result<Bytes, Error>> = vec![
                Ok(Bytes::from_static(
                    b"{\"Type\":\"container\",\"Action\":\"start\"}\n",
                )),
                Err(Error::transport(
                    "/v1.48/events",
                    std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset"),
                )),
            ];
            Ok(crate::transport::Response::new(
                StatusCode::OK,
                "/v1.48/events",
                Body::from_stream(futures_util::stream::iter(chunks)),
            ))
        });
        let docker = docker_with(transport);

        // Act
        let mut stream = docker
            .events()
            .watch(&EventsOptions::default())
            .await
            .unwrap();
        let event = stream.next().await.unwrap().unwrap();
        let error = stream.next().await.unwrap().unwrap_err();

        // Assert
        assert_eq!(event.action(), Some("start"));
        assert!(matches!(error, Error::Transport { .. }));
    }

    #[tokio::test]
    async fn test_event_accessors_read_the_wire_shape() {
        // Arrange
        let mut transport = MockTransport::new();
        transport.expect_execute().times(1).returning(|_| {
            Ok(json_response(
                StatusCode::OK,
                "/v1.48/events",
                concat!(
                    "{\"Type\":\"container\",\"Action\":\"start\",\"scope\":\"local\",",
                    "\"Actor\":{\"ID\":\"abc123\",\"Attributes\":{\"name\":\"web\",\"image\":\"nginx:1.27\"}},",
                    "\"time\":1730000000,\"timeNano\":1730000000000000000}\n",
                ),
            ))
        });
        let docker = docker_with(transport);

        // Act
        let mut stream = docker
            .events()
            .watch(&EventsOptions::default())
            .await
            .unwrap();
        let event = stream.next().await.unwrap().unwrap();

        // Assert
        assert_eq!(event.kind(), Some("container"));
        assert_eq!(event.action(), Some("start"));
        assert_eq!(event.scope(), Some("local"));
        assert_eq!(event.actor_id(), Some("abc123"));
        assert_eq!(event.actor_attributes().get("name"), Some(&"web"));
        assert_eq!(event.time(), DateTime::from_timestamp(1_730_000_000, 0));
        assert_eq!(event.time_nanos(), Some(1_730_000_000_000_000_000));
    }
}
