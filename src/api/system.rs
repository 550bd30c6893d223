use hyper::StatusCode;
use serde_json::{Map, Value};

use crate::decode;
use crate::docker::Docker;
use crate::endpoint::Endpoint;
use crate::error::Error;
use crate::transport::{Request, Transport};

/// Facade for system-level reports under `/system`.
pub struct System<'d, T> {
    docker: &'d Docker<T>,
    base: Endpoint,
}

impl<'d, T: Transport> System<'d, T> {
    pub(crate) fn new(docker: &'d Docker<T>) -> Self {
        Self {
            docker,
            base: docker.base().join("system"),
        }
    }

    /// Reports data usage per layer, image, container, and volume
    /// (`GET /system/df`).
    pub async fn disk_usage(&self) -> Result<DiskUsage, Error> {
        let uri = self.base.join("df").to_string();
        let response = self
            .docker
            .execute(Request::get(uri), &[StatusCode::OK])
            .await?;
        Ok(DiskUsage::new(decode::object(response).await?))
    }
}

/// The daemon's disk usage report, as a read-only view.
#[derive(Debug, Clone, PartialEq)]
pub struct DiskUsage {
    value: Value,
}

impl DiskUsage {
    pub(crate) fn new(map: Map<String, Value>) -> Self {
        Self {
            value: Value::Object(map),
        }
    }

    /// Total size of all image layers, in bytes.
    pub fn layers_size(&self) -> Option<i64> {
        self.value.get("LayersSize").and_then(Value::as_i64)
    }

    pub fn images(&self) -> Option<&Vec<Value>> {
        self.value.get("Images").and_then(Value::as_array)
    }

    pub fn containers(&self) -> Option<&Vec<Value>> {
        self.value.get("Containers").and_then(Value::as_array)
    }

    pub fn volumes(&self) -> Option<&Vec<Value>> {
        self.value.get("Volumes").and_then(Value::as_array)
    }

    pub fn as_json(&self) -> &Value {
        &self.value
    }
}

/// The daemon's system information report (`GET /info`), as a read-only view.
#[derive(Debug, Clone, PartialEq)]
pub struct Info {
    value: Value,
}

impl Info {
    pub(crate) fn new(map: Map<String, Value>) -> Self {
        Self {
            value: Value::Object(map),
        }
    }

    /// The daemon's unique ID.
    pub fn id(&self) -> Option<&str> {
        self.value.get("ID").and_then(Value::as_str)
    }

    /// The daemon's hostname.
    pub fn name(&self) -> Option<&str> {
        self.value.get("Name").and_then(Value::as_str)
    }

    pub fn server_version(&self) -> Option<&str> {
        self.value.get("ServerVersion").and_then(Value::as_str)
    }

    pub fn operating_system(&self) -> Option<&str> {
        self.value.get("OperatingSystem").and_then(Value::as_str)
    }

    pub fn os_type(&self) -> Option<&str> {
        self.value.get("OSType").and_then(Value::as_str)
    }

    pub fn architecture(&self) -> Option<&str> {
        self.value.get("Architecture").and_then(Value::as_str)
    }

    pub fn containers(&self) -> Option<i64> {
        self.value.get("Containers").and_then(Value::as_i64)
    }

    pub fn containers_running(&self) -> Option<i64> {
        self.value.get("ContainersRunning").and_then(Value::as_i64)
    }

    pub fn containers_paused(&self) -> Option<i64> {
        self.value.get("ContainersPaused").and_then(Value::as_i64)
    }

    pub fn containers_stopped(&self) -> Option<i64> {
        self.value.get("ContainersStopped").and_then(Value::as_i64)
    }

    pub fn images(&self) -> Option<i64> {
        self.value.get("Images").and_then(Value::as_i64)
    }

    pub fn ncpu(&self) -> Option<i64> {
        self.value.get("NCPU").and_then(Value::as_i64)
    }

    /// Total memory available to the daemon, in bytes.
    pub fn mem_total(&self) -> Option<i64> {
        self.value.get("MemTotal").and_then(Value::as_i64)
    }

    pub fn as_json(&self) -> &Value {
        &self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{MockTransport, docker_with, json_response};
    use mockall::predicate::eq;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_disk_usage_report() {
        // Arrange
        let mut transport = MockTransport::new();
        transport
            .expect_execute()
            .with(eq(Request::get("/v1.48/system/df")))
            .times(1)
            .returning(|_| {
                Ok(json_response(
                    StatusCode::OK,
                    "/v1.48/system/df",
                    r#"{"LayersSize":1092588,"Images":[{"Id":"sha256:2b8f"}],"Containers":[],"Volumes":[{"Name":"data"}]}"#,
                ))
            });
        let docker = docker_with(transport);

        // Act
        let usage = docker.system().disk_usage().await.unwrap();

        // Assert
        assert_eq!(usage.layers_size(), Some(1_092_588));
        assert_eq!(usage.images().map(Vec::len), Some(1));
        assert_eq!(usage.containers().map(Vec::len), Some(0));
        assert_eq!(usage.volumes().map(Vec::len), Some(1));
    }

    #[tokio::test]
    async fn test_disk_usage_remote_error() {
        // Arrange
        let mut transport = MockTransport::new();
        transport.expect_execute().times(1).returning(|_| {
            Ok(json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "/v1.48/system/df",
                r#"{"message":"server error"}"#,
            ))
        });
        let docker = docker_with(transport);

        // Act
        let error = docker.system().disk_usage().await.unwrap_err();

        // Assert
        assert_eq!(error.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
    }

    #[test]
    fn test_info_missing_fields_read_as_none() {
        let info = Info::new(Map::new());

        assert_eq!(info.name(), None);
        assert_eq!(info.ncpu(), None);
        assert_eq!(info.mem_total(), None);
    }
}
