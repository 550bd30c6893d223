use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use hyper::StatusCode;
use serde::Serialize;
use serde_json::{Map, Value};

use super::execs::{Exec, ExecCreateOptions};
use crate::decode;
use crate::docker::Docker;
use crate::endpoint::{Endpoint, Query};
use crate::error::Error;
use crate::filters::Filters;
use crate::transport::{Request, Transport};

/// Collection facade for `/containers`.
///
/// Created per call through [`Docker::containers`]; holds nothing but a
/// borrow of the client and its endpoint.
pub struct Containers<'d, T> {
    docker: &'d Docker<T>,
    base: Endpoint,
}

impl<'d, T: Transport> Containers<'d, T> {
    pub(crate) fn new(docker: &'d Docker<T>) -> Self {
        Self {
            docker,
            base: docker.base().join("containers"),
        }
    }

    /// Lists containers (`GET /containers/json`), in the order the daemon
    /// reported them.
    pub async fn list(&self, options: &ContainerListOptions) -> Result<Vec<Container<'d, T>>, Error> {
        let uri = self.base.join("json").with_query(&options.to_query());
        let response = self
            .docker
            .execute(Request::get(uri), &[StatusCode::OK])
            .await?;
        let items = decode::array(response).await?;
        Ok(items
            .into_iter()
            .map(|item| Container::from_value(self.docker, item))
            .collect())
    }

    /// Creates a container (`POST /containers/create`).
    ///
    /// The returned view wraps the create response, which carries the new
    /// container's ID and any daemon warnings.
    ///
    /// # Errors
    ///
    /// 404 when the image is unknown and 409 on a name conflict, both as
    /// [`Error::Remote`].
    pub async fn create(&self, options: &ContainerCreateOptions) -> Result<Container<'d, T>, Error> {
        let mut query = Query::new();
        if let Some(name) = &options.name {
            query.push("name", name);
        }
        let uri = self.base.join("create").with_query(&query);
        let response = self
            .docker
            .execute(Request::post_json(uri, options)?, &[StatusCode::CREATED])
            .await?;
        let value = Value::Object(decode::object(response).await?);
        Ok(Container::from_value(self.docker, value))
    }

    /// Inspects a container by ID or name (`GET /containers/{id}/json`).
    ///
    /// # Errors
    ///
    /// 404 surfaces as [`Error::Remote`] with
    /// [`is_not_found`](Error::is_not_found) set.
    pub async fn get(&self, id: &str) -> Result<Container<'d, T>, Error> {
        let uri = self.base.join(id).join("json").to_string();
        let response = self
            .docker
            .execute(Request::get(uri), &[StatusCode::OK])
            .await?;
        let value = Value::Object(decode::object(response).await?);
        Ok(Container::from_value(self.docker, value))
    }

    /// Deletes stopped containers (`POST /containers/prune`), returning the
    /// daemon's report of deleted IDs and reclaimed space.
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

/// A single container: a read-only view over the JSON the daemon returned,
/// plus the lifecycle operations of `/containers/{id}`.
///
/// The view is a snapshot. Accessors never refetch; call
/// [`Containers::get`] again for fresh state.
pub struct Container<'d, T> {
    docker: &'d Docker<T>,
    endpoint: Endpoint,
    id: String,
    value: Value,
}

impl<'d, T: Transport> Container<'d, T> {
    fn from_value(docker: &'d Docker<T>, value: Value) -> Self {
        let id = value
            .get("Id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned();
        let endpoint = docker.base().join("containers").join(&id);
        Self {
            docker,
            endpoint,
            id,
            value,
        }
    }

    /// The container ID the daemon reported.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The container name. Inspect responses carry `Name`, list summaries a
    /// `Names` array; both are handled.
    pub fn name(&self) -> Option<&str> {
        self.value
            .get("Name")
            .and_then(Value::as_str)
            .or_else(|| {
                self.value
                    .get("Names")
                    .and_then(Value::as_array)
                    .and_then(|names| names.first())
                    .and_then(Value::as_str)
            })
            .map(|name| name.strip_prefix('/').unwrap_or(name))
    }

    /// The image reference the container was created from.
    pub fn image(&self) -> Option<&str> {
        self.value.get("Image").and_then(Value::as_str)
    }

    /// The lifecycle state. List summaries carry a bare string, inspect
    /// responses an object with a `Status` field; both are handled.
    pub fn state(&self) -> Option<ContainerState> {
        let raw = match self.value.get("State") {
            Some(Value::String(state)) => state.as_str(),
            Some(Value::Object(state)) => state.get("Status").and_then(Value::as_str)?,
            _ => return None,
        };
        raw.parse().ok()
    }

    /// The human-readable status line, e.g. `Up 2 hours`.
    pub fn status(&self) -> Option<&str> {
        self.value.get("Status").and_then(Value::as_str)
    }

    /// Labels, from the summary's `Labels` or the inspect response's
    /// `Config.Labels`.
    pub fn labels(&self) -> HashMap<&str, &str> {
        self.value
            .get("Labels")
            .or_else(|| self.value.pointer("/Config/Labels"))
            .and_then(Value::as_object)
            .map(|labels| {
                labels
                    .iter()
                    .filter_map(|(key, value)| value.as_str().map(|v| (key.as_str(), v)))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Creation time. Summaries carry Unix seconds, inspect responses an
    /// RFC 3339 string; both are handled.
    pub fn created(&self) -> Option<DateTime<Utc>> {
        match self.value.get("Created") {
            Some(Value::Number(seconds)) => seconds
                .as_i64()
                .and_then(|secs| DateTime::from_timestamp(secs, 0)),
            Some(Value::String(stamp)) => stamp.parse().ok(),
            _ => None,
        }
    }

    /// The raw JSON the view was built from.
    pub fn as_json(&self) -> &Value {
        &self.value
    }

    /// Starts the container. A 304 means it was already running, which is
    /// not an error.
    pub async fn start(&self) -> Result<(), Error> {
        let uri = self.endpoint.join("start").to_string();
        let response = self
            .docker
            .execute(
                Request::post(uri),
                &[StatusCode::NO_CONTENT, StatusCode::NOT_MODIFIED],
            )
            .await?;
        decode::drain(response).await
    }

    /// Stops the container, waiting up to `timeout` before the daemon
    /// kills it. A 304 means it was already stopped.
    pub async fn stop(&self, timeout: Option<Duration>) -> Result<(), Error> {
        let mut query = Query::new();
        if let Some(timeout) = timeout {
            query.push("t", timeout.as_secs());
        }
        let uri = self.endpoint.join("stop").with_query(&query);
        let response = self
            .docker
            .execute(
                Request::post(uri),
                &[StatusCode::NO_CONTENT, StatusCode::NOT_MODIFIED],
            )
            .await?;
        decode::drain(response).await
    }

    /// Restarts the container.
    pub async fn restart(&self, timeout: Option<Duration>) -> Result<(), Error> {
        let mut query = Query::new();
        if let Some(timeout) = timeout {
            query.push("t", timeout.as_secs());
        }
        let uri = self.endpoint.join("restart").with_query(&query);
        let response = self
            .docker
            .execute(Request::post(uri), &[StatusCode::NO_CONTENT])
            .await?;
        decode::drain(response).await
    }

    /// Sends a signal (`SIGKILL` when `signal` is `None`).
    ///
    /// # Errors
    ///
    /// 409 as [`Error::Remote`] when the container is not running.
    pub async fn kill(&self, signal: Option<&str>) -> Result<(), Error> {
        let mut query = Query::new();
        if let Some(signal) = signal {
            query.push("signal", signal);
        }
        let uri = self.endpoint.join("kill").with_query(&query);
        let response = self
            .docker
            .execute(Request::post(uri), &[StatusCode::NO_CONTENT])
            .await?;
        decode::drain(response).await
    }

    /// Pauses the container's processes.
    pub async fn pause(&self) -> Result<(), Error> {
        let uri = self.endpoint.join("pause").to_string();
        let response = self
            .docker
            .execute(Request::post(uri), &[StatusCode::NO_CONTENT])
            .await?;
        decode::drain(response).await
    }

    /// Resumes a paused container.
    pub async fn unpause(&self) -> Result<(), Error> {
        let uri = self.endpoint.join("unpause").to_string();
        let response = self
            .docker
            .execute(Request::post(uri), &[StatusCode::NO_CONTENT])
            .await?;
        decode::drain(response).await
    }

    /// Renames the container.
    ///
    /// # Errors
    ///
    /// 409 as [`Error::Remote`] when the name is already taken.
    pub async fn rename(&self, name: &str) -> Result<(), Error> {
        let mut query = Query::new();
        query.push("name", name);
        let uri = self.endpoint.join("rename").with_query(&query);
        let response = self
            .docker
            .execute(Request::post(uri), &[StatusCode::NO_CONTENT])
            .await?;
        decode::drain(response).await
    }

    /// Blocks until the container exits and returns its exit code
    /// (`POST /containers/{id}/wait`).
    pub async fn wait(&self) -> Result<i64, Error> {
        let uri = self.endpoint.join("wait").to_string();
        let response = self
            .docker
            .execute(Request::post(uri), &[StatusCode::OK])
            .await?;
        let body = decode::object(response).await?;
        Ok(body
            .get("StatusCode")
            .and_then(Value::as_i64)
            .unwrap_or_default())
    }

    /// Fetches logs as text (`GET /containers/{id}/logs`).
    ///
    /// The bytes are returned as the Engine sent them; for containers
    /// running without a TTY that includes the stream-multiplexing frame
    /// headers. There is no follow mode.
    pub async fn logs(&self, options: &LogsOptions) -> Result<String, Error> {
        let uri = self.endpoint.join("logs").with_query(&options.to_query());
        let response = self
            .docker
            .execute(Request::get(uri), &[StatusCode::OK])
            .await?;
        decode::text(response).await
    }

    /// Creates an exec instance inside this container
    /// (`POST /containers/{id}/exec`).
    ///
    /// # Errors
    ///
    /// 409 as [`Error::Remote`] when the container is not running.
    pub async fn exec(&self, options: &ExecCreateOptions) -> Result<Exec<'d, T>, Error> {
        let uri = self.endpoint.join("exec").to_string();
        let response = self
            .docker
            .execute(Request::post_json(uri, options)?, &[StatusCode::CREATED])
            .await?;
        let value = Value::Object(decode::object(response).await?);
        Ok(Exec::from_value(self.docker, value))
    }

    /// Deletes the container (`DELETE /containers/{id}`), consuming the
    /// view.
    ///
    /// # Errors
    ///
    /// 409 as [`Error::Remote`] when it is still running and `force` is
    /// off.
    pub async fn remove(self, options: &ContainerRemoveOptions) -> Result<(), Error> {
        let uri = self.endpoint.with_query(&options.to_query());
        let response = self
            .docker
            .execute(Request::delete(uri), &[StatusCode::NO_CONTENT])
            .await?;
        decode::drain(response).await
    }
}

impl<T> std::fmt::Debug for Container<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

/// Lifecycle states the Engine reports for a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerState {
    Created,
    Running,
    Paused,
    Restarting,
    Removing,
    Exited,
    Dead,
}

/// Error type for parsing [`ContainerState`] from a string.
#[derive(Debug, thiserror::Error)]
#[error("unknown container state: '{0}'")]
pub struct UnknownContainerState(String);

impl FromStr for ContainerState {
    type Err = UnknownContainerState;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(ContainerState::Created),
            "running" => Ok(ContainerState::Running),
            "paused" => Ok(ContainerState::Paused),
            "restarting" => Ok(ContainerState::Restarting),
            "removing" => Ok(ContainerState::Removing),
            "exited" => Ok(ContainerState::Exited),
            "dead" => Ok(ContainerState::Dead),
            _ => Err(UnknownContainerState(s.to_string())),
        }
    }
}

impl std::fmt::Display for ContainerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match self {
            ContainerState::Created => "created",
            ContainerState::Running => "running",
            ContainerState::Paused => "paused",
            ContainerState::Restarting => "restarting",
            ContainerState::Removing => "removing",
            ContainerState::Exited => "exited",
            ContainerState::Dead => "dead",
        };
        f.write_str(state)
    }
}

/// Options for listing containers.
#[derive(Debug, Clone, Default, PartialEq, typed_builder::TypedBuilder)]
#[builder(doc)]
pub struct ContainerListOptions {
    /// Include stopped containers
    #[builder(default = false)]
    pub all: bool,
    /// Return at most this many of the most recently created containers
    #[builder(default, setter(strip_option))]
    pub limit: Option<u32>,
    /// Include size information per container
    #[builder(default = false)]
    pub size: bool,
    /// Engine filters, e.g. by status or label
    #[builder(default)]
    pub filters: Filters,
}

impl ContainerListOptions {
    fn to_query(&self) -> Query {
        let mut query = Query::new();
        if self.all {
            query.push("all", "true");
        }
        if let Some(limit) = self.limit {
            query.push("limit", limit);
        }
        if self.size {
            query.push("size", "true");
        }
        if !self.filters.is_empty() {
            query.push("filters", self.filters.encode());
        }
        query
    }
}

/// Container creation payload (`POST /containers/create`).
///
/// Field names follow the Engine API; unset fields are left out of the JSON
/// body entirely. The `name` goes into the query string, not the body.
///
/// # Examples
///
/// ```
/// use dockhand::api::ContainerCreateOptions;
///
/// let options = ContainerCreateOptions::builder()
///     .name("web")
///     .image("nginx:1.27")
///     .env(vec!["TZ=UTC".to_string()])
///     .build();
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, typed_builder::TypedBuilder)]
#[builder(doc)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerCreateOptions {
    /// Name for the container
    #[serde(skip)]
    #[builder(default, setter(strip_option, into))]
    pub name: Option<String>,
    /// Image reference to create the container from
    #[builder(setter(into))]
    pub image: String,
    /// Command to run
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option))]
    pub cmd: Option<Vec<String>>,
    /// Entrypoint override
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option))]
    pub entrypoint: Option<Vec<String>>,
    /// Environment variables, `KEY=value`
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option))]
    pub env: Option<Vec<String>>,
    /// User to run as inside the container
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option, into))]
    pub user: Option<String>,
    /// Working directory inside the container
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option, into))]
    pub working_dir: Option<String>,
    /// Labels to attach
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option))]
    pub labels: Option<HashMap<String, String>>,
    /// Allocate a pseudo-TTY
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option))]
    pub tty: Option<bool>,
    /// Host-level configuration
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option))]
    pub host_config: Option<HostConfig>,
}

/// Host-level settings nested under `HostConfig` in the create payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, typed_builder::TypedBuilder)]
#[builder(doc)]
#[serde(rename_all = "PascalCase")]
pub struct HostConfig {
    /// Volume bindings, `host-src:container-dest[:options]`
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option))]
    pub binds: Option<Vec<String>>,
    /// Port bindings keyed by `port/protocol`, e.g. `80/tcp`
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option))]
    pub port_bindings: Option<HashMap<String, Vec<PortBinding>>>,
    /// Remove the container when it exits
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option))]
    pub auto_remove: Option<bool>,
    /// Network mode: `bridge`, `host`, `none`, or a network name
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option, into))]
    pub network_mode: Option<String>,
    /// Memory limit in bytes
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option))]
    pub memory: Option<i64>,
    /// CPU quota in units of 10^-9 CPUs
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option))]
    pub nano_cpus: Option<i64>,
    /// Publish all exposed ports to random host ports
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option))]
    pub publish_all_ports: Option<bool>,
    /// Give extended privileges
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option))]
    pub privileged: Option<bool>,
}

/// One host-side binding for a container port.
#[derive(Debug, Clone, Default, PartialEq, Serialize, typed_builder::TypedBuilder)]
#[builder(doc)]
#[serde(rename_all = "PascalCase")]
pub struct PortBinding {
    /// Host IP to bind to; all interfaces when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option, into))]
    pub host_ip: Option<String>,
    /// Host port; a random free port when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option, into))]
    pub host_port: Option<String>,
}

/// Options for deleting a container.
#[derive(Debug, Clone, Default, PartialEq, typed_builder::TypedBuilder)]
#[builder(doc)]
pub struct ContainerRemoveOptions {
    /// Kill the container first when it is still running
    #[builder(default = false)]
    pub force: bool,
    /// Also remove anonymous volumes
    #[builder(default = false)]
    pub volumes: bool,
    /// Remove the named link instead of the container
    #[builder(default = false)]
    pub link: bool,
}

impl ContainerRemoveOptions {
    fn to_query(&self) -> Query {
        let mut query = Query::new();
        if self.force {
            query.push("force", "true");
        }
        if self.volumes {
            query.push("v", "true");
        }
        if self.link {
            query.push("link", "true");
        }
        query
    }
}

/// Specifies how many lines to retrieve from the tail of the logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tail {
    /// Return all log lines
    All,
    /// Return a specific number of lines from the end
    Number(u64),
}

/// Error type for parsing `Tail` from a string.
#[derive(Debug, thiserror::Error)]
pub enum TailParseError {
    /// The string is not a valid tail value (must be "all" or a positive number)
    #[error("Invalid tail value: '{0}'. Expected 'all' or a positive number")]
    InvalidValue(String),
}

impl From<u64> for Tail {
    fn from(n: u64) -> Self {
        Tail::Number(n)
    }
}

impl TryFrom<&str> for Tail {
    type Error = TailParseError;

    fn try_from(s: &str) -> Result<Self, TailParseError> {
        match s {
            "all" => Ok(Tail::All),
            _ => s
                .parse::<u64>()
                .map(Tail::Number)
                .map_err(|_| TailParseError::InvalidValue(s.to_string())),
        }
    }
}

impl std::fmt::Display for Tail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tail::All => write!(f, "all"),
            Tail::Number(n) => write!(f, "{}", n),
        }
    }
}

/// Options for retrieving logs from a container.
///
/// # Examples
///
/// ```
/// use dockhand::api::{LogsOptions, Tail};
///
/// let options = LogsOptions::builder()
///     .stdout(true)
///     .stderr(true)
///     .tail(Tail::Number(100))
///     .timestamps(true)
///     .build();
/// ```
#[derive(Debug, Clone, Default, PartialEq, typed_builder::TypedBuilder)]
#[builder(doc)]
pub struct LogsOptions {
    /// Return output from stdout
    #[builder(default = false)]
    pub stdout: bool,
    /// Return output from stderr
    #[builder(default = false)]
    pub stderr: bool,
    /// Only return lines logged after this timestamp
    #[builder(default, setter(strip_option))]
    pub since: Option<DateTime<Utc>>,
    /// Only return lines logged before this timestamp
    #[builder(default, setter(strip_option))]
    pub until: Option<DateTime<Utc>>,
    /// Prefix every line with its timestamp
    #[builder(default = false)]
    pub timestamps: bool,
    /// Return this many lines from the tail of the logs
    #[builder(default, setter(strip_option, into))]
    pub tail: Option<Tail>,
}

impl LogsOptions {
    fn to_query(&self) -> Query {
        let mut query = Query::new();
        if self.stdout {
            query.push("stdout", "true");
        }
        if self.stderr {
            query.push("stderr", "true");
        }
        if let Some(since) = self.since {
            query.push("since", since.timestamp());
        }
        if let Some(until) = self.until {
            query.push("until", until.timestamp());
        }
        if self.timestamps {
            query.push("timestamps", "true");
        }
        if let Some(tail) = &self.tail {
            query.push("tail", tail);
        }
        query
    }
}
