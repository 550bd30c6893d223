use hyper::StatusCode;
use serde::Serialize;
use serde_json::Value;

use crate::decode;
use crate::docker::Docker;
use crate::endpoint::{Endpoint, Query};
use crate::error::Error;
use crate::transport::{Request, Transport};

/// Collection facade for `/exec`.
///
/// Exec instances are created through
/// [`Container::exec`](super::Container::exec); this facade looks up
/// existing ones by ID.
pub struct Execs<'d, T> {
    docker: &'d Docker<T>,
    base: Endpoint,
}

impl<'d, T: Transport> Execs<'d, T> {
    pub(crate) fn new(docker: &'d Docker<T>) -> Self {
        Self {
            docker,
            base: docker.base().join("exec"),
        }
    }

    /// Inspects an exec instance (`GET /exec/{id}/json`).
    ///
    /// # Errors
    ///
    /// 404 surfaces as [`Error::Remote`] with
    /// [`is_not_found`](Error::is_not_found) set.
    pub async fn get(&self, id: &str) -> Result<Exec<'d, T>, Error> {
        let uri = self.base.join(id).join("json").to_string();
        let response = self
            .docker
            .execute(Request::get(uri), &[StatusCode::OK])
            .await?;
        let value = Value::Object(decode::object(response).await?);
        Ok(Exec::from_value(self.docker, value))
    }
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct StartPayload {
    detach: bool,
    tty: bool,
}

/// A single exec instance: a view over the daemon's JSON plus the
/// operations of `/exec/{id}`.
pub struct Exec<'d, T> {
    docker: &'d Docker<T>,
    endpoint: Endpoint,
    id: String,
    value: Value,
}

impl<'d, T: Transport> Exec<'d, T> {
    // Create responses spell the key "Id", inspect responses "ID".
    pub(crate) fn from_value(docker: &'d Docker<T>, value: Value) -> Self {
        let id = value
            .get("Id")
            .or_else(|| value.get("ID"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned();
        let endpoint = docker.base().join("exec").join(&id);
        Self {
            docker,
            endpoint,
            id,
            value,
        }
    }

    /// The exec instance ID.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Whether the process is still running, when the view carries
    /// inspect data.
    pub fn running(&self) -> Option<bool> {
        self.value.get("Running").and_then(Value::as_bool)
    }

    /// The exit code. The daemon reports it only once the process has
    /// finished.
    pub fn exit_code(&self) -> Option<i64> {
        self.value.get("ExitCode").and_then(Value::as_i64)
    }

    /// The ID of the container the exec runs in.
    pub fn container_id(&self) -> Option<&str> {
        self.value.get("ContainerID").and_then(Value::as_str)
    }

    /// The raw JSON the view was built from.
    pub fn as_json(&self) -> &Value {
        &self.value
    }

    /// Starts the exec instance detached (`POST /exec/{id}/start`), leaving
    /// output in the container's log streams.
    ///
    /// # Errors
    ///
    /// 409 as [`Error::Remote`] when the container is paused.
    pub async fn start_detached(&self) -> Result<(), Error> {
        let uri = self.endpoint.join("start").to_string();
        let payload = StartPayload {
            detach: true,
            tty: false,
        };
        let response = self
            .docker
            .execute(Request::post_json(uri, &payload)?, &[StatusCode::OK])
            .await?;
        decode::drain(response).await
    }

    /// Resizes the TTY of a running exec instance
    /// (`POST /exec/{id}/resize`).
    pub async fn resize(&self, height: u32, width: u32) -> Result<(), Error> {
        let mut query = Query::new();
        query.push("h", height);
        query.push("w", width);
        let uri = self.endpoint.join("resize").with_query(&query);
        let response = self
            .docker
            .execute(Request::post(uri), &[StatusCode::OK])
            .await?;
        decode::drain(response).await
    }
}

impl<T> std::fmt::Debug for Exec<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Exec")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

/// Exec creation payload (`POST /containers/{id}/exec`).
///
/// # Examples
///
/// ```
/// use dockhand::api::ExecCreateOptions;
///
/// let options = ExecCreateOptions::builder()
///     .cmd(vec!["sh".to_string(), "-c".to_string(), "echo hi".to_string()])
///     .attach_stdout(true)
///     .build();
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, typed_builder::TypedBuilder)]
#[builder(doc)]
#[serde(rename_all = "PascalCase")]
pub struct ExecCreateOptions {
    /// Command to run
    pub cmd: Vec<String>,
    /// Environment variables, `KEY=value`
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option))]
    pub env: Option<Vec<String>>,
    /// User to run as
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option, into))]
    pub user: Option<String>,
    /// Working directory for the command
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option, into))]
    pub working_dir: Option<String>,
    /// Attach to stdout
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option))]
    pub attach_stdout: Option<bool>,
    /// Attach to stderr
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option))]
    pub attach_stderr: Option<bool>,
    /// Attach to stdin
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option))]
    pub attach_stdin: Option<bool>,
    /// Allocate a pseudo-TTY
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option))]
    pub tty: Option<bool>,
    /// Run with extended privileges
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option))]
    pub privileged: Option<bool>,
}
