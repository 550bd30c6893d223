use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Filters for listing and pruning endpoints.
///
/// The Engine expects filters as a JSON object mapping each filter name to a
/// list of values, e.g. `{"status":["running","paused"]}`, percent-encoded
/// into a `filters` query parameter. Keys are kept sorted so the encoding is
/// deterministic.
///
/// # Examples
///
/// ```
/// use dockhand::Filters;
///
/// let filters = Filters::new()
///     .status("running")
///     .label("com.example.team=backend");
///
/// assert_eq!(
///     filters.encode(),
///     r#"{"label":["com.example.team=backend"],"status":["running"]}"#
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Filters {
    map: BTreeMap<String, Vec<String>>,
}

impl Filters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one value under `key`. Repeated keys accumulate values.
    pub fn add(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.map.entry(key.into()).or_default().push(value.into());
        self
    }

    /// Filters by label, either `key` or `key=value`.
    pub fn label(self, label: impl Into<String>) -> Self {
        self.add("label", label)
    }

    /// Filters by resource name.
    pub fn name(self, name: impl Into<String>) -> Self {
        self.add("name", name)
    }

    /// Filters containers by lifecycle state, e.g. `running` or `exited`.
    pub fn status(self, status: impl Into<String>) -> Self {
        self.add("status", status)
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Renders the Engine's filter JSON. The caller is responsible for
    /// percent-encoding, which [`Query::push`](crate::Query::push) does.
    pub fn encode(&self) -> String {
        serde_json::to_string(&self.map).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_encode_groups_values_by_key() {
        let filters = Filters::new()
            .status("running")
            .status("paused")
            .label("env=prod");

        assert_eq!(
            filters.encode(),
            r#"{"label":["env=prod"],"status":["running","paused"]}"#
        );
    }

    #[test]
    fn test_encode_round_trips() {
        let filters = Filters::new()
            .name("web")
            .label("com.example.team=backend")
            .label("com.example.tier");

        let decoded: Filters = serde_json::from_str(&filters.encode()).unwrap();

        assert_eq!(decoded, filters);
    }

    #[test]
    fn test_empty_filters() {
        let filters = Filters::new();

        assert!(filters.is_empty());
        assert_eq!(filters.encode(), "{}");
    }

    #[test]
    fn test_keys_are_ordered() {
        // Insertion order does not leak into the encoding.
        let a = Filters::new().add("b", "2").add("a", "1");
        let b = Filters::new().add("a", "1").add("b", "2");

        assert_eq!(a.encode(), b.encode());
    }
}
