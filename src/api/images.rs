use std::collections::HashMap;

use chrono::{DateTime, Utc};
use hyper::StatusCode;
use serde_json::{Map, Value};

use crate::decode;
use crate::docker::Docker;
use crate::endpoint::{Endpoint, Query};
use crate::error::Error;
use crate::filters::Filters;
use crate::transport::{Request, Transport};

/// Collection facade for `/images`.
pub struct Images<'d, T> {
    docker: &'d Docker<T>,
    base: Endpoint,
}

impl<'d, T: Transport> Images<'d, T> {
    pub(crate) fn new(docker: &'d Docker<T>) -> Self {
        Self {
            docker,
            base: docker.base().join("images"),
        }
    }

    /// Lists images (`GET /images/json`).
    pub async fn list(&self, options: &ImageListOptions) -> Result<Vec<Image<'d, T>>, Error> {
        let uri = self.base.join("json").with_query(&options.to_query());
        let response = self
            .docker
            .execute(Request::get(uri), &[StatusCode::OK])
            .await?;
        let items = decode::array(response).await?;
        Ok(items
            .into_iter()
            .map(|item| Image::from_value(self.docker, item))
            .collect())
    }

    /// Pulls an image from a registry (`POST /images/create`).
    ///
    /// The daemon answers 200 and then streams progress records; a pull
    /// that fails after that point reports the failure as an in-band
    /// `error` record. This method drains the stream and surfaces such a
    /// record as [`Error::Stream`], so an `Ok` return means the pull
    /// completed.
    pub async fn pull(&self, from_image: &str, tag: &str) -> Result<Image<'d, T>, Error> {
        let mut query = Query::new();
        query.push("fromImage", from_image);
        query.push("tag", tag);
        let uri = self.base.join("create").with_query(&query);
        let response = self
            .docker
            .execute(Request::post(uri), &[StatusCode::OK])
            .await?;
        let progress = decode::text(response).await?;
        for line in progress.lines().filter(|line| !line.trim().is_empty()) {
            let record: Value = serde_json::from_str(line).unwrap_or(Value::Null);
            if let Some(message) = record.get("error").and_then(Value::as_str) {
                return Err(Error::Stream {
                    message: message.to_owned(),
                });
            }
        }

        let reference = format!("{from_image}:{tag}");
        Ok(Image::from_reference(self.docker, reference))
    }

    /// Inspects an image by ID or reference (`GET /images/{name}/json`).
    ///
    /// # Errors
    ///
    /// 404 surfaces as [`Error::Remote`] with
    /// [`is_not_found`](Error::is_not_found) set.
    pub async fn get(&self, name: &str) -> Result<Image<'d, T>, Error> {
        let uri = self.base.join(name).join("json").to_string();
        let response = self
            .docker
            .execute(Request::get(uri), &[StatusCode::OK])
            .await?;
        let value = Value::Object(decode::object(response).await?);
        Ok(Image::from_value(self.docker, value))
    }

    /// Deletes unused images (`POST /images/prune`).
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

/// A single image: a view over inspect or summary JSON, plus the operations
/// of `/images/{name}`.
pub struct Image<'d, T> {
    docker: &'d Docker<T>,
    endpoint: Endpoint,
    reference: String,
    value: Value,
}

impl<'d, T: Transport> Image<'d, T> {
    fn from_value(docker: &'d Docker<T>, value: Value) -> Self {
        let reference = value
            .get("Id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned();
        Self::build(docker, reference, value)
    }

    fn from_reference(docker: &'d Docker<T>, reference: String) -> Self {
        Self::build(docker, reference, Value::Null)
    }

    fn build(docker: &'d Docker<T>, reference: String, value: Value) -> Self {
        let endpoint = docker.base().join("images").join(&reference);
        Self {
            docker,
            endpoint,
            reference,
            value,
        }
    }

    /// The reference this view addresses the image by: the `Id` for views
    /// built from daemon JSON, or `image:tag` for freshly pulled ones.
    pub fn reference(&self) -> &str {
        &self.reference
    }

    /// The content-addressable image ID, when the view carries one.
    pub fn id(&self) -> Option<&str> {
        self.value.get("Id").and_then(Value::as_str)
    }

    /// Repository tags pointing at this image.
    pub fn repo_tags(&self) -> Vec<&str> {
        self.value
            .get("RepoTags")
            .and_then(Value::as_array)
            .map(|tags| tags.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    /// Size in bytes.
    pub fn size(&self) -> Option<i64> {
        self.value.get("Size").and_then(Value::as_i64)
    }

    /// Labels attached to the image.
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

    /// Returns the layer history (`GET /images/{name}/history`), oldest
    /// layer last, as the daemon reports it.
    pub async fn history(&self) -> Result<Vec<Value>, Error> {
        let uri = self.endpoint.join("history").to_string();
        let response = self
            .docker
            .execute(Request::get(uri), &[StatusCode::OK])
            .await?;
        decode::array(response).await
    }

    /// Tags the image into a repository (`POST /images/{name}/tag`).
    pub async fn tag(&self, repo: &str, tag: &str) -> Result<(), Error> {
        let mut query = Query::new();
        query.push("repo", repo);
        query.push("tag", tag);
        let uri = self.endpoint.join("tag").with_query(&query);
        let response = self
            .docker
            .execute(Request::post(uri), &[StatusCode::CREATED])
            .await?;
        decode::drain(response).await
    }

    /// Deletes the image (`DELETE /images/{name}`), consuming the view.
    /// Returns the daemon's report of untagged and deleted layers.
    ///
    /// # Errors
    ///
    /// 409 as [`Error::Remote`] when a container still uses the image and
    /// `force` is off.
    pub async fn remove(self, options: &ImageRemoveOptions) -> Result<Vec<Value>, Error> {
        let uri = self.endpoint.with_query(&options.to_query());
        let response = self
            .docker
            .execute(Request::delete(uri), &[StatusCode::OK])
            .await?;
        decode::array(response).await
    }
}

impl<T> std::fmt::Debug for Image<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Image")
            .field("reference", &self.reference)
            .finish_non_exhaustive()
    }
}

/// Options for listing images.
#[derive(Debug, Clone, Default, PartialEq, typed_builder::TypedBuilder)]
#[builder(doc)]
pub struct ImageListOptions {
    /// Include intermediate layers
    #[builder(default = false)]
    pub all: bool,
    /// Include digest information
    #[builder(default = false)]
    pub digests: bool,
    /// Engine filters, e.g. by reference or label
    #[builder(default)]
    pub filters: Filters,
}

impl ImageListOptions {
    fn to_query(&self) -> Query {
        let mut query = Query::new();
        if self.all {
            query.push("all", "true");
        }
        if self.digests {
            query.push("digests", "true");
        }
        if !self.filters.is_empty() {
            query.push("filters", self.filters.encode());
        }
        query
    }
}

/// Options for deleting an image.
#[derive(Debug, Clone, Default, PartialEq, typed_builder::TypedBuilder)]
#[builder(doc)]
pub struct ImageRemoveOptions {
    /// Delete even when tagged in multiple repositories or in use
    #[builder(default = false)]
    pub force: bool,
    /// Keep untagged parent layers
    #[builder(default = false)]
    pub noprune: bool,
}

impl ImageRemoveOptions {
    fn to_query(&self) -> Query {
        let mut query = Query::new();
        if self.force {
            query.push("force", "true");
        }
        if self.noprune {
            query.push("noprune", "true");
        }
        query
    }
}
