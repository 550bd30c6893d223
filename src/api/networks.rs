use std::collections::HashMap;

use chrono::{DateTime, Utc};
use hyper::StatusCode;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::decode;
use crate::docker::Docker;
use crate::endpoint::{Endpoint, Query};
use crate::error::Error;
use crate::filters::Filters;
use crate::transport::{Request, Transport};

/// Collection facade for `/networks`.
pub struct Networks<'d, T> {
    docker: &'d Docker<T>,
    base: Endpoint,
}

impl<'d, T: Transport> Networks<'d, T> {
    pub(crate) fn new(docker: &'d Docker<T>) -> Self {
        Self {
            docker,
            base: docker.base().join("networks"),
        }
    }

    /// Lists networks (`GET /networks`).
    pub async fn list(&self, options: &NetworkListOptions) -> Result<Vec<Network<'d, T>>, Error> {
        let uri = self.base.with_query(&options.to_query());
        let response = self
            .docker
            .execute(Request::get(uri), &[StatusCode::OK])
            .await?;
        let items = decode::array(response).await?;
        Ok(items
            .into_iter()
            .map(|item| Network::from_value(self.docker, item))
            .collect())
    }

    /// Creates a network (`POST /networks/create`).
    ///
    /// # Errors
    ///
    /// 409 as [`Error::Remote`] when a network with the name exists and the
    /// driver forbids duplicates.
    pub async fn create(&self, options: &NetworkCreateOptions) -> Result<Network<'d, T>, Error> {
        let uri = self.base.join("create").to_string();
        let response = self
            .docker
            .execute(Request::post_json(uri, options)?, &[StatusCode::CREATED])
            .await?;
        let value = Value::Object(decode::object(response).await?);
        Ok(Network::from_value(self.docker, value))
    }

    /// Inspects a network by ID or name (`GET /networks/{id}`).
    ///
    /// # Errors
    ///
    /// 404 surfaces as [`Error::Remote`] with
    /// [`is_not_found`](Error::is_not_found) set.
    pub async fn get(&self, id: &str) -> Result<Network<'d, T>, Error> {
        let uri = self.base.join(id).to_string();
        let response = self
            .docker
            .execute(Request::get(uri), &[StatusCode::OK])
            .await?;
        let value = Value::Object(decode::object(response).await?);
        Ok(Network::from_value(self.docker, value))
    }

    /// Deletes unused networks (`POST /networks/prune`).
    pub async fn prune(&self, filters: &Filters) -> Result<Map<String, Value>, Error> {
        let mut query = Query::new();
        if !filters.is_empty() {
            query.push("filters", filters.encode());
        }
        let uri = self.base.join("prune").with_query(&query);
        let response = self
            .docker
            .execute(Request::post(uri), &[StatusCode::OK])
            .await?;
        decode::object(response).await
    }
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct ConnectPayload<'a> {
    container: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct DisconnectPayload<'a> {
    container: &'a str,
    force: bool,
}

/// A single network: a view over the daemon's JSON plus the operations of
/// `/networks/{id}`.
pub struct Network<'d, T> {
    docker: &'d Docker<T>,
    endpoint: Endpoint,
    id: String,
    value: Value,
}

impl<'d, T: Transport> Network<'d, T> {
    fn from_value(docker: &'d Docker<T>, value: Value) -> Self {
        let id = value
            .get("Id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned();
        let endpoint = docker.base().join("networks").join(&id);
        Self {
            docker,
            endpoint,
            id,
            value,
        }
    }

    /// The network ID the daemon reported.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The network name.
    pub fn name(&self) -> Option<&str> {
        self.value.get("Name").and_then(Value::as_str)
    }

    /// The driver backing the network, e.g. `bridge` or `overlay`.
    pub fn driver(&self) -> Option<&str> {
        self.value.get("Driver").and_then(Value::as_str)
    }

    /// The scope, `local` or `swarm`.
    pub fn scope(&self) -> Option<&str> {
        self.value.get("Scope").and_then(Value::as_str)
    }

    /// Labels attached to the network.
    pub fn labels(&self) -> HashMap<&str, &str> {
        self.value
            .get("Labels")
            .and_then(Value::as_object)
            .map(|labels| {
                labels
                    .iter()
                    .filter_map(|(key, value)| value.as_str().map(|v| (key.as_str(), v)))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Creation time of the network.
    pub fn created(&self) -> Option<DateTime<Utc>> {
        self.value
            .get("Created")
            .and_then(Value::as_str)
            .and_then(|stamp| stamp.parse().ok())
    }

    /// The raw JSON the view was built from.
    pub fn as_json(&self) -> &Value {
        &self.value
    }

    /// Connects a container to this network
    /// (`POST /networks/{id}/connect`).
    pub async fn connect(&self, container: &str) -> Result<(), Error> {
        let uri = self.endpoint.join("connect").to_string();
        let payload = ConnectPayload { container };
        let response = self
            .docker
            .execute(Request::post_json(uri, &payload)?, &[StatusCode::OK])
            .await?;
        decode::drain(response).await
    }

    /// Disconnects a container from this network
    /// (`POST /networks/{id}/disconnect`).
    pub async fn disconnect(&self, container: &str, force: bool) -> Result<(), Error> {
        let uri = self.endpoint.join("disconnect").to_string();
        let payload = DisconnectPayload { container, force };
        let response = self
            .docker
            .execute(Request::post_json(uri, &payload)?, &[StatusCode::OK])
            .await?;
        decode::drain(response).await
    }

    /// Deletes the network (`DELETE /networks/{id}`), consuming the view.
    pub async fn remove(self) -> Result<(), Error> {
        let uri = self.endpoint.to_string();
        let response = self
            .docker
            .execute(Request::delete(uri), &[StatusCode::NO_CONTENT])
            .await?;
        decode::drain(response).await
    }
}

impl<T> std::fmt::Debug for Network<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Network")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

/// Options for listing networks.
#[derive(Debug, Clone, Default, PartialEq, typed_builder::TypedBuilder)]
#[builder(doc)]
pub struct NetworkListOptions {
    /// Engine filters, e.g. by driver or label
    #[builder(default)]
    pub filters: Filters,
}

impl NetworkListOptions {
    fn to_query(&self) -> Query {
        let mut query = Query::new();
        if !self.filters.is_empty() {
            query.push("filters", self.filters.encode());
        }
        query
    }
}

/// Network creation payload (`POST /networks/create`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, typed_builder::TypedBuilder)]
#[builder(doc)]
#[serde(rename_all = "PascalCase")]
pub struct NetworkCreateOptions {
    /// Name for the network
    #[builder(setter(into))]
    pub name: String,
    /// Driver to back the network with; the daemon defaults to `bridge`
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option, into))]
    pub driver: Option<String>,
    /// Restrict external access to the network
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option))]
    pub internal: Option<bool>,
    /// Allow manual container attachment
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option))]
    pub attachable: Option<bool>,
    /// Enable IPv6 on the network
    #[serde(rename = "EnableIPv6", skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option))]
    pub enable_ipv6: Option<bool>,
    /// Labels to attach
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option))]
    pub labels: Option<HashMap<String, String>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{MockTransport, docker_with, empty_response, json_response};
    use hyper::Method;
    use mockall::predicate::{self, eq};
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_list_builds_views() {
        // Arrange
        let mut transport = MockTransport::new();
        transport
            .expect_execute()
            .with(eq(Request::get("/v1.48/networks")))
            .times(1)
            .returning(|_| {
                Ok(json_response(
                    StatusCode::OK,
                    "/v1.48/networks",
                    r#"[{"Id":"n1","Name":"bridge","Driver":"bridge","Scope":"local","Created":"2026-02-01T08:30:00Z"}]"#,
                ))
            });
        let docker = docker_with(transport);

        // Act
        let networks = docker
            .networks()
            .list(&NetworkListOptions::default())
            .await
            .unwrap();

        // Assert
        let network = &networks[0];
        assert_eq!(network.id(), "n1");
        assert_eq!(network.name(), Some("bridge"));
        assert_eq!(network.driver(), Some("bridge"));
        assert_eq!(network.scope(), Some("local"));
        assert!(network.created().is_some());
    }

    #[tokio::test]
    async fn test_create_serializes_the_ipv6_flag_verbatim() {
        // Arrange
        let mut transport = MockTransport::new();
        transport
            .expect_execute()
            .with(predicate::function(|request: &Request| {
                let body: Value =
                    serde_json::from_slice(request.body().expect("create sends a body")).unwrap();
                request.method() == Method::POST
                    && request.uri() == "/v1.48/networks/create"
                    && body["Name"] == "backend"
                    && body["EnableIPv6"] == true
                    && body.get("Driver").is_none()
            }))
            .times(1)
            .returning(|_| {
                Ok(json_response(
                    StatusCode::CREATED,
                    "/v1.48/networks/create",
                    r#"{"Id":"n2","Warning":""}"#,
                ))
            });
        let docker = docker_with(transport);

        // Act
        let options = NetworkCreateOptions::builder()
            .name("backend")
            .enable_ipv6(true)
            .build();
        let network = docker.networks().create(&options).await.unwrap();

        // Assert
        assert_eq!(network.id(), "n2");
    }

    #[tokio::test]
    async fn test_get_missing_network_carries_the_uri() {
        // Arrange
        let mut transport = MockTransport::new();
        transport
            .expect_execute()
            .with(eq(Request::get("/v1.48/networks/nope")))
            .times(1)
            .returning(|_| {
                Ok(json_response(
                    StatusCode::NOT_FOUND,
                    "/v1.48/networks/nope",
                    r#"{"message":"network nope not found"}"#,
                ))
            });
        let docker = docker_with(transport);

        // Act
        let error = docker.networks().get("nope").await.unwrap_err();

        // Assert
        assert!(error.is_not_found());
        let Error::Remote { uri, message, .. } = error else {
            panic!("expected a remote error");
        };
        assert_eq!(uri, "/v1.48/networks/nope");
        assert_eq!(message, r#"{"message":"network nope not found"}"#);
    }

    #[tokio::test]
    async fn test_connect_posts_the_container() {
        // Arrange
        let mut transport = MockTransport::new();
        transport
            .expect_execute()
            .with(predicate::function(|request: &Request| {
                let body: Value =
                    serde_json::from_slice(request.body().expect("connect sends a body")).unwrap();
                request.uri() == "/v1.48/networks/n1/connect" && body["Container"] == "abc123"
            }))
            .times(1)
            .returning(|_| Ok(empty_response(StatusCode::OK, "/v1.48/networks/n1/connect")));
        let docker = docker_with(transport);
        let network = Network::from_value(&docker, serde_json::json!({"Id": "n1"}));

        // Act
        let result = network.connect("abc123").await;

        // Assert
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_disconnect_sends_the_force_flag() {
        // Arrange
        let mut transport = MockTransport::new();
        transport
            .expect_execute()
            .with(predicate::function(|request: &Request| {
                let body: Value = serde_json::from_slice(
                    request.body().expect("disconnect sends a body"),
                )
                .unwrap();
                request.uri() == "/v1.48/networks/n1/disconnect"
                    && body["Container"] == "abc123"
                    && body["Force"] == true
            }))
            .times(1)
            .returning(|_| {
                Ok(empty_response(
                    StatusCode::OK,
                    "/v1.48/networks/n1/disconnect",
                ))
            });
        let docker = docker_with(transport);
        let network = Network::from_value(&docker, serde_json::json!({"Id": "n1"}));

        // Act
        let result = network.disconnect("abc123", true).await;

        // Assert
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_remove_deletes_by_id() {
        // Arrange
        let mut transport = MockTransport::new();
        transport
            .expect_execute()
            .with(eq(Request::delete("/v1.48/networks/n1")))
            .times(1)
            .returning(|_| Ok(empty_response(StatusCode::NO_CONTENT, "/v1.48/networks/n1")));
        let docker = docker_with(transport);
        let network = Network::from_value(&docker, serde_json::json!({"Id": "n1"}));

        // Act
        let result = network.remove().await;

        // Assert
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_prune_reports_deleted_networks() {
        // Arrange
        let mut transport = MockTransport::new();
        transport
            .expect_execute()
            .with(eq(Request::post("/v1.48/networks/prune")))
            .times(1)
            .returning(|_| {
                Ok(json_response(
                    StatusCode::OK,
                    "/v1.48/networks/prune",
                    r#"{"NetworksDeleted":["backend"]}"#,
                ))
            });
        let docker = docker_with(transport);

        // Act
        let report = docker.networks().prune(&Filters::new()).await.unwrap();

        // Assert
        assert_eq!(
            report.get("NetworksDeleted"),
            Some(&serde_json::json!(["backend"]))
        );
    }
}
