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

/// Collection facade for `/volumes`.
pub struct Volumes<'d, T> {
    docker: &'d Docker<T>,
    base: Endpoint,
}

impl<'d, T: Transport> Volumes<'d, T> {
    pub(crate) fn new(docker: &'d Docker<T>) -> Self {
        Self {
            docker,
            base: docker.base().join("volumes"),
        }
    }

    /// Lists volumes (`GET /volumes`).
    ///
    /// The daemon wraps the result in an envelope; this method unwraps its
    /// `Volumes` array and logs any `Warnings` at debug level.
    pub async fn list(&self, options: &VolumeListOptions) -> Result<Vec<Volume<'d, T>>, Error> {
        let uri = self.base.with_query(&options.to_query());
        let response = self
            .docker
            .execute(Request::get(uri), &[StatusCode::OK])
            .await?;
        let envelope = decode::object(response).await?;
        if let Some(warnings) = envelope.get("Warnings").and_then(Value::as_array) {
            for warning in warnings.iter().filter_map(Value::as_str) {
                tracing::debug!(warning, "volume list warning");
            }
        }
        let items = match envelope.get("Volumes") {
            Some(Value::Array(items)) => items.clone(),
            _ => Vec::new(),
        };
        Ok(items
            .into_iter()
            .map(|item| Volume::from_value(self.docker, item))
            .collect())
    }

    /// Creates a volume (`POST /volumes/create`).
    ///
    /// Creating a volume whose name already exists succeeds and returns the
    /// existing volume; the daemon treats the operation as idempotent.
    pub async fn create(&self, options: &VolumeCreateOptions) -> Result<Volume<'d, T>, Error> {
        let uri = self.base.join("create").to_string();
        let response = self
            .docker
            .execute(Request::post_json(uri, options)?, &[StatusCode::CREATED])
            .await?;
        let value = Value::Object(decode::object(response).await?);
        Ok(Volume::from_value(self.docker, value))
    }

    /// Inspects a volume by name (`GET /volumes/{name}`).
    ///
    /// # Errors
    ///
    /// 404 surfaces as [`Error::Remote`] with
    /// [`is_not_found`](Error::is_not_found) set.
    pub async fn get(&self, name: &str) -> Result<Volume<'d, T>, Error> {
        let uri = self.base.join(name).to_string();
        let response = self
            .docker
            .execute(Request::get(uri), &[StatusCode::OK])
            .await?;
        let value = Value::Object(decode::object(response).await?);
        Ok(Volume::from_value(self.docker, value))
    }

    /// Deletes unused local volumes (`POST /volumes/prune`).
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

/// A single volume: a view over the daemon's JSON plus the operations of
/// `/volumes/{name}`. Volumes are addressed by name; the Engine assigns no
/// separate ID.
pub struct Volume<'d, T> {
    docker: &'d Docker<T>,
    endpoint: Endpoint,
    name: String,
    value: Value,
}

impl<'d, T: Transport> Volume<'d, T> {
    fn from_value(docker: &'d Docker<T>, value: Value) -> Self {
        let name = value
            .get("Name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned();
        let endpoint = docker.base().join("volumes").join(&name);
        Self {
            docker,
            endpoint,
            name,
            value,
        }
    }

    /// The volume name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The driver backing the volume.
    pub fn driver(&self) -> Option<&str> {
        self.value.get("Driver").and_then(Value::as_str)
    }

    /// Where the volume data lives on the host.
    pub fn mountpoint(&self) -> Option<&str> {
        self.value.get("Mountpoint").and_then(Value::as_str)
    }

    /// Labels attached to the volume.
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

    /// Creation time of the volume.
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.value
            .get("CreatedAt")
            .and_then(Value::as_str)
            .and_then(|stamp| stamp.parse().ok())
    }

    /// The raw JSON the view was built from.
    pub fn as_json(&self) -> &Value {
        &self.value
    }

    /// Deletes the volume (`DELETE /volumes/{name}`), consuming the view.
    ///
    /// # Errors
    ///
    /// 409 as [`Error::Remote`] when a container still uses the volume and
    /// `force` is off.
    pub async fn remove(self, force: bool) -> Result<(), Error> {
        let mut query = Query::new();
        if force {
            query.push("force", "true");
        }
        let uri = self.endpoint.with_query(&query);
        let response = self
            .docker
            .execute(Request::delete(uri), &[StatusCode::NO_CONTENT])
            .await?;
        decode::drain(response).await
    }
}

impl<T> std::fmt::Debug for Volume<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Volume")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Options for listing volumes.
#[derive(Debug, Clone, Default, PartialEq, typed_builder::TypedBuilder)]
#[builder(doc)]
pub struct VolumeListOptions {
    /// Engine filters, e.g. by driver or label
    #[builder(default)]
    pub filters: Filters,
}

impl VolumeListOptions {
    fn to_query(&self) -> Query {
        let mut query = Query::new();
        if !self.filters.is_empty() {
            query.push("filters", self.filters.encode());
        }
        query
    }
}

/// Volume creation payload (`POST /volumes/create`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, typed_builder::TypedBuilder)]
#[builder(doc)]
#[serde(rename_all = "PascalCase")]
pub struct VolumeCreateOptions {
    /// Name for the volume; the daemon generates one when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option, into))]
    pub name: Option<String>,
    /// Driver to back the volume with; the daemon defaults to `local`
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option, into))]
    pub driver: Option<String>,
    /// Driver-specific options
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option))]
    pub driver_opts: Option<HashMap<String, String>>,
    /// Labels to attach
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option))]
    pub labels: Option<HashMap<String, String>>,
}
