use std::fmt;

/// An immutable API path, e.g. `/v1.48/containers/abc123`.
///
/// Endpoints are never mutated: child locations are derived with [`join`],
/// which returns a new value. Facades hold the endpoint they were created
/// with for their whole (short) life.
///
/// [`join`]: Endpoint::join
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    path: String,
}

impl Endpoint {
    /// Creates an endpoint from a path, normalizing the leading and trailing
    /// slashes.
    pub fn new(path: impl Into<String>) -> Self {
        let raw = path.into();
        let trimmed = raw.trim_matches('/');
        Self {
            path: format!("/{trimmed}"),
        }
    }

    /// Derives a child endpoint by appending one path segment.
    ///
    /// The segment is inserted verbatim; the Engine accepts image references
    /// such as `library/alpine:3.20` unescaped in the path.
    pub fn join(&self, segment: &str) -> Endpoint {
        Endpoint {
            path: format!("{}/{}", self.path, segment.trim_matches('/')),
        }
    }

    /// The path as a string slice.
    pub fn as_str(&self) -> &str {
        &self.path
    }

    /// Renders the path with a query string appended, or the bare path when
    /// the query is empty.
    pub fn with_query(&self, query: &Query) -> String {
        if query.is_empty() {
            self.path.clone()
        } else {
            format!("{}?{}", self.path, query.encode())
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

/// An ordered list of query parameters.
///
/// Values are percent-encoded when rendered; keys are the plain ASCII names
/// the Engine documents and are emitted as-is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    pairs: Vec<(String, String)>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one `key=value` pair.
    pub fn push(&mut self, key: &str, value: impl ToString) {
        self.pairs.push((key.to_string(), value.to_string()));
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Renders the pairs as `k=v&k=v` with percent-encoded values.
    pub fn encode(&self) -> String {
        self.pairs
            .iter()
            .map(|(key, value)| format!("{key}={}", urlencoding::encode(value)))
            .collect::<Vec<_>>()
            .join("&")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_new_normalizes_slashes() {
        assert_eq!(Endpoint::new("/v1.48/").as_str(), "/v1.48");
        assert_eq!(Endpoint::new("v1.48").as_str(), "/v1.48");
        assert_eq!(Endpoint::new("/v1.48").as_str(), "/v1.48");
    }

    #[test]
    fn test_join_derives_children() {
        let base = Endpoint::new("/v1.48");
        let containers = base.join("containers");
        let inspect = containers.join("abc123").join("json");

        assert_eq!(containers.as_str(), "/v1.48/containers");
        assert_eq!(inspect.as_str(), "/v1.48/containers/abc123/json");
        // The parent is untouched.
        assert_eq!(base.as_str(), "/v1.48");
    }

    #[test]
    fn test_join_keeps_image_references_verbatim() {
        let images = Endpoint::new("/v1.48/images");
        let inspect = images.join("library/alpine:3.20").join("json");

        assert_eq!(inspect.as_str(), "/v1.48/images/library/alpine:3.20/json");
    }

    #[test]
    fn test_with_query_renders_pairs() {
        let endpoint = Endpoint::new("/v1.48/containers/json");
        let mut query = Query::new();
        query.push("all", true);
        query.push("limit", 5);

        assert_eq!(
            endpoint.with_query(&query),
            "/v1.48/containers/json?all=true&limit=5"
        );
    }

    #[test]
    fn test_with_query_omits_empty_query() {
        let endpoint = Endpoint::new("/v1.48/volumes");

        assert_eq!(endpoint.with_query(&Query::new()), "/v1.48/volumes");
    }

    #[test]
    fn test_query_percent_encodes_values() {
        let mut query = Query::new();
        query.push("filters", r#"{"label":["a=b"]}"#);

        assert_eq!(
            query.encode(),
            "filters=%7B%22label%22%3A%5B%22a%3Db%22%5D%7D"
        );
    }
}
