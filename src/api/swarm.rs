use chrono::{DateTime, Utc};
use hyper::StatusCode;
use serde::Serialize;
use serde_json::Value;

use crate::decode;
use crate::docker::Docker;
use crate::endpoint::{Endpoint, Query};
use crate::error::Error;
use crate::transport::{Request, Transport};

/// Facade for `/swarm`, the daemon's cluster membership endpoints.
///
/// Every operation here answers 503 as [`Error::Remote`] when the daemon is
/// in the wrong membership state, e.g. inspecting or leaving while not in a
/// swarm, or initializing while already in one.
pub struct Swarm<'d, T> {
    docker: &'d Docker<T>,
    base: Endpoint,
}

impl<'d, T: Transport> Swarm<'d, T> {
    pub(crate) fn new(docker: &'d Docker<T>) -> Self {
        Self {
            docker,
            base: docker.base().join("swarm"),
        }
    }

    /// Inspects the swarm (`GET /swarm`).
    pub async fn inspect(&self) -> Result<SwarmInfo, Error> {
        let uri = self.base.to_string();
        let response = self
            .docker
            .execute(Request::get(uri), &[StatusCode::OK])
            .await?;
        Ok(SwarmInfo::new(decode::object(response).await?))
    }

    /// Initializes a new swarm with this daemon as the first manager
    /// (`POST /swarm/init`). Returns the node ID.
    pub async fn init(&self, options: &SwarmInitOptions) -> Result<String, Error> {
        let uri = self.base.join("init").to_string();
        let response = self
            .docker
            .execute(Request::post_json(uri, options)?, &[StatusCode::OK])
            .await?;
        let response_uri = response.uri().to_owned();
        let node_id = decode::value(response).await?;
        node_id
            .as_str()
            .map(str::to_owned)
            .ok_or_else(|| Error::decode(response_uri, "expected a JSON string node ID"))
    }

    /// Joins an existing swarm (`POST /swarm/join`).
    pub async fn join(&self, options: &SwarmJoinOptions) -> Result<(), Error> {
        let uri = self.base.join("join").to_string();
        let response = self
            .docker
            .execute(Request::post_json(uri, options)?, &[StatusCode::OK])
            .await?;
        decode::drain(response).await
    }

    /// Leaves the swarm (`POST /swarm/leave`). `force` is required on the
    /// last manager node.
    pub async fn leave(&self, force: bool) -> Result<(), Error> {
        let mut query = Query::new();
        if force {
            query.push("force", "true");
        }
        let uri = self.base.join("leave").with_query(&query);
        let response = self
            .docker
            .execute(Request::post(uri), &[StatusCode::OK])
            .await?;
        decode::drain(response).await
    }
}

/// Read-only view over a swarm inspect response.
#[derive(Debug, Clone)]
pub struct SwarmInfo {
    value: Value,
}

impl SwarmInfo {
    pub(crate) fn new(map: serde_json::Map<String, Value>) -> Self {
        Self {
            value: Value::Object(map),
        }
    }

    /// The cluster ID.
    pub fn id(&self) -> Option<&str> {
        self.value.get("ID").and_then(Value::as_str)
    }

    /// When the cluster was created.
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.value
            .get("CreatedAt")
            .and_then(Value::as_str)
            .and_then(|stamp| stamp.parse().ok())
    }

    /// The token worker nodes join with.
    pub fn worker_token(&self) -> Option<&str> {
        self.value
            .pointer("/JoinTokens/Worker")
            .and_then(Value::as_str)
    }

    /// The token manager nodes join with.
    pub fn manager_token(&self) -> Option<&str> {
        self.value
            .pointer("/JoinTokens/Manager")
            .and_then(Value::as_str)
    }

    /// The raw JSON the view was built from.
    pub fn as_json(&self) -> &Value {
        &self.value
    }
}

/// Swarm initialization payload (`POST /swarm/init`).
#[derive(Debug, Clone, PartialEq, Serialize, typed_builder::TypedBuilder)]
#[builder(doc)]
#[serde(rename_all = "PascalCase")]
pub struct SwarmInitOptions {
    /// Address to listen for inter-manager traffic on
    #[builder(default = String::from("0.0.0.0:2377"), setter(into))]
    pub listen_addr: String,
    /// Address advertised to other cluster members
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option, into))]
    pub advertise_addr: Option<String>,
}

impl Default for SwarmInitOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Swarm join payload (`POST /swarm/join`).
#[derive(Debug, Clone, PartialEq, Serialize, typed_builder::TypedBuilder)]
#[builder(doc)]
#[serde(rename_all = "PascalCase")]
pub struct SwarmJoinOptions {
    /// Manager addresses to join through, `host:port`
    pub remote_addrs: Vec<String>,
    /// Worker or manager join token
    #[builder(setter(into))]
    pub join_token: String,
    /// Address to listen for inter-manager traffic on
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option, into))]
    pub listen_addr: Option<String>,
    /// Address advertised to other cluster members
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option, into))]
    pub advertise_addr: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{MockTransport, docker_with, empty_response, json_response};
    use mockall::predicate::{self, eq};
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_inspect_reads_the_join_tokens() {
        // Arrange
        let mut transport = MockTransport::new();
        transport
            .expect_execute()
            .with(eq(Request::get("/v1.48/swarm")))
            .times(1)
            .returning(|_| {
                Ok(json_response(
                    StatusCode::OK,
                    "/v1.48/swarm",
                    r#"{"ID":"sw1","CreatedAt":"2026-04-01T12:00:00Z","JoinTokens":{"Worker":"SWMTKN-1-w","Manager":"SWMTKN-1-m"}}"#,
                ))
            });
        let docker = docker_with(transport);

        // Act
        let swarm = docker.swarm().inspect().await.unwrap();

        // Assert
        assert_eq!(swarm.id(), Some("sw1"));
        assert_eq!(swarm.worker_token(), Some("SWMTKN-1-w"));
        assert_eq!(swarm.manager_token(), Some("SWMTKN-1-m"));
        assert!(swarm.created_at().is_some());
    }

    #[tokio::test]
    async fn test_inspect_outside_a_swarm_is_a_remote_error() {
        // Arrange
        let mut transport = MockTransport::new();
        transport.expect_execute().times(1).returning(|_| {
            Ok(json_response(
                StatusCode::SERVICE_UNAVAILABLE,
                "/v1.48/swarm",
                r#"{"message":"This node is not a swarm manager"}"#,
            ))
        });
        let docker = docker_with(transport);

        // Act
        let error = docker.swarm().inspect().await.unwrap_err();

        // Assert
        assert_eq!(error.status(), Some(StatusCode::SERVICE_UNAVAILABLE));
    }

    #[tokio::test]
    async fn test_init_returns_the_node_id() {
        // Arrange
        let mut transport = MockTransport::new();
        transport
            .expect_execute()
            .with(predicate::function(|request: &Request| {
                let body: Value =
                    serde_json::from_slice(request.body().expect("init sends a body")).unwrap();
                request.uri() == "/v1.48/swarm/init"
                    && body["ListenAddr"] == "0.0.0.0:2377"
                    && body.get("AdvertiseAddr").is_none()
            }))
            .times(1)
            .returning(|_| {
                Ok(json_response(
                    StatusCode::OK,
                    "/v1.48/swarm/init",
                    r#""node-id-1""#,
                ))
            });
        let docker = docker_with(transport);

        // Act
        let node_id = docker
            .swarm()
            .init(&SwarmInitOptions::default())
            .await
            .unwrap();

        // Assert
        assert_eq!(node_id, "node-id-1");
    }

    #[tokio::test]
    async fn test_join_posts_the_token_and_addresses() {
        // Arrange
        let mut transport = MockTransport::new();
        transport
            .expect_execute()
            .with(predicate::function(|request: &Request| {
                let body: Value =
                    serde_json::from_slice(request.body().expect("join sends a body")).unwrap();
                request.uri() == "/v1.48/swarm/join"
                    && body["RemoteAddrs"] == serde_json::json!(["10.0.0.1:2377"])
                    && body["JoinToken"] == "SWMTKN-1-w"
            }))
            .times(1)
            .returning(|_| Ok(empty_response(StatusCode::OK, "/v1.48/swarm/join")));
        let docker = docker_with(transport);

        // Act
        let options = SwarmJoinOptions::builder()
            .remote_addrs(vec!["10.0.0.1:2377".to_string()])
            .join_token("SWMTKN-1-w")
            .build();
        let result = docker.swarm().join(&options).await;

        // Assert
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_leave_forces_when_asked() {
        // Arrange
        let mut transport = MockTransport::new();
        transport
            .expect_execute()
            .with(eq(Request::post("/v1.48/swarm/leave?force=true")))
            .times(1)
            .returning(|_| Ok(empty_response(StatusCode::OK, "/v1.48/swarm/leave")));
        let docker = docker_with(transport);

        // Act
        let result = docker.swarm().leave(true).await;

        // Assert
        assert!(result.is_ok());
    }
}
