//! User options stored alongside the aggregate.
//!
//! Only the scanner deadline drives behavior here. The remaining fields are
//! carried so a rewrite of the options key does not drop them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserOptions {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default = "default_technology")]
    pub technology: String,
    #[serde(default)]
    pub use_pro: bool,
    #[serde(default)]
    pub v4compat: bool,
    #[serde(default)]
    pub svg_pseudo_elements: bool,
    /// Scanner runs while `now` is before this instant.
    #[serde(default)]
    pub detect_conflicts_until: Option<DateTime<Utc>>,
    /// Observation ids an admin chose to block.
    #[serde(default)]
    pub blocklist: Vec<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

fn default_technology() -> String {
    "webfont".to_string()
}

impl Default for UserOptions {
    fn default() -> Self {
        Self {
            version: None,
            technology: default_technology(),
            use_pro: false,
            v4compat: false,
            svg_pseudo_elements: false,
            detect_conflicts_until: None,
            blocklist: Vec::new(),
            extra: serde_json::Map::new(),
        }
    }
}

impl UserOptions {
    /// Whether the conflict scanner is enabled at `now`.
    pub fn detecting_conflicts(&self, now: DateTime<Utc>) -> bool {
        self.detect_conflicts_until
            .map(|until| now < until)
            .unwrap_or(false)
    }
}
