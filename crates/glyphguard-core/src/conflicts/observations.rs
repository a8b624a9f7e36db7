//! Observations of foreign assets and the aggregate they merge into.

use crate::error::{GlyphError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Stable identifier of one observed foreign element or library.
pub type ObservationId = String;

/// Derive an observation id from an element's identifying content
/// (its `src`/`href`, or its inline text).
pub fn observation_id(content: &str) -> ObservationId {
    hex::encode(Sha256::digest(content.as_bytes()))
}

/// Mapping of observation id to its free-form metadata.
///
/// Used both for the durable cross-session aggregate and for a single page
/// load's submission.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnregisteredClients(BTreeMap<ObservationId, Value>);

impl UnregisteredClients {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a stored or submitted value.
    ///
    /// An empty JSON array decodes to an empty map, since some writers encode
    /// an empty mapping that way. Anything else that is not an object is
    /// rejected.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self::from(map)),
            Value::Array(items) if items.is_empty() => Ok(Self::new()),
            Value::Null => Ok(Self::new()),
            other => Err(GlyphError::Validation {
                field: "unregisteredClients".to_string(),
                message: format!("expected an object, got {}", json_kind(&other)),
            }),
        }
    }

    pub fn to_value(&self) -> Value {
        Value::Object(
            self.0
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }

    pub fn insert(&mut self, id: impl Into<ObservationId>, payload: Value) {
        self.0.insert(id.into(), payload);
    }

    pub fn get(&self, id: &str) -> Option<&Value> {
        self.0.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.0.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &ObservationId> {
        self.0.keys()
    }

    /// Right-biased union: ids in `newer` replace ours, every other id is kept.
    pub fn merge(&mut self, newer: &UnregisteredClients) {
        for (id, payload) in &newer.0 {
            self.0.insert(id.clone(), payload.clone());
        }
    }

    /// Number of our ids that `prior` did not contain.
    pub fn count_absent_from(&self, prior: &UnregisteredClients) -> usize {
        self.0.keys().filter(|id| !prior.contains(id)).count()
    }
}

impl From<Map<String, Value>> for UnregisteredClients {
    fn from(map: Map<String, Value>) -> Self {
        Self(map.into_iter().collect())
    }
}

impl FromIterator<(ObservationId, Value)> for UnregisteredClients {
    fn from_iter<I: IntoIterator<Item = (ObservationId, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn clients(value: Value) -> UnregisteredClients {
        UnregisteredClients::from_value(value).unwrap()
    }

    #[test]
    fn test_merge_is_right_biased() {
        let mut current = clients(json!({"a": {"src": "old"}, "b": {"src": "b"}}));
        current.merge(&clients(json!({"a": {"src": "new"}, "c": {"src": "c"}})));

        assert_eq!(current.len(), 3);
        assert_eq!(current.get("a"), Some(&json!({"src": "new"})));
        assert_eq!(current.get("b"), Some(&json!({"src": "b"})));
    }

    #[test]
    fn test_count_absent_from() {
        let prior = clients(json!({"a": 1, "b": 1}));
        let latest = clients(json!({"a": 1, "b": 1, "c": 1}));
        assert_eq!(latest.count_absent_from(&prior), 1);
        assert_eq!(prior.count_absent_from(&latest), 0);
    }

    #[test]
    fn test_empty_array_decodes_to_empty() {
        assert!(clients(json!([])).is_empty());
        assert!(clients(Value::Null).is_empty());
        assert!(UnregisteredClients::from_value(json!([1])).is_err());
        assert!(UnregisteredClients::from_value(json!("x")).is_err());
    }

    #[test]
    fn test_observation_id_is_stable_hex() {
        let id = observation_id("https://cdn.example.com/icons.css");
        assert_eq!(id.len(), 64);
        assert_eq!(id, observation_id("https://cdn.example.com/icons.css"));
        assert_ne!(id, observation_id("https://cdn.example.com/other.css"));
    }
}
