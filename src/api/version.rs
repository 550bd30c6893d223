use serde_json::{Map, Value};

/// The daemon's version report (`GET /version`), as a read-only view.
///
/// Accessors read the snapshot taken when the report was fetched; call
/// [`Docker::version`](crate::Docker::version) again for fresh data.
#[derive(Debug, Clone, PartialEq)]
pub struct Version {
    value: Value,
}

impl Version {
    pub(crate) fn new(map: Map<String, Value>) -> Self {
        Self {
            value: Value::Object(map),
        }
    }

    /// The Engine version string, e.g. `27.3.1`.
    pub fn version(&self) -> Option<&str> {
        self.value.get("Version").and_then(Value::as_str)
    }

    /// The API version the daemon negotiated, e.g. `1.48`.
    pub fn api_version(&self) -> Option<&str> {
        self.value.get("ApiVersion").and_then(Value::as_str)
    }

    /// The oldest API version the daemon still accepts.
    pub fn min_api_version(&self) -> Option<&str> {
        self.value.get("MinAPIVersion").and_then(Value::as_str)
    }

    pub fn os(&self) -> Option<&str> {
        self.value.get("Os").and_then(Value::as_str)
    }

    pub fn arch(&self) -> Option<&str> {
        self.value.get("Arch").and_then(Value::as_str)
    }

    pub fn kernel_version(&self) -> Option<&str> {
        self.value.get("KernelVersion").and_then(Value::as_str)
    }

    pub fn build_time(&self) -> Option<&str> {
        self.value.get("BuildTime").and_then(Value::as_str)
    }

    /// The Engine version parsed as semver, when it parses.
    pub fn semver(&self) -> Option<semver::Version> {
        self.version().and_then(|v| v.parse().ok())
    }

    /// The full report.
    pub fn as_json(&self) -> &Value {
        &self.value
    }
}
