//! Immutable fact set a scan status is derived from.

use serde::{Deserialize, Serialize};

/// Everything a page's scan status depends on, frozen at one instant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanFacts {
    /// A detection submission is in flight.
    pub is_submitting: bool,
    /// A detection submission has completed.
    pub has_submitted: bool,
    /// The last detection submission succeeded.
    pub success: bool,
    /// Message from the last detection submission.
    pub message: Option<String>,
    /// The last scanner enable/disable exchange has completed.
    pub scanner_has_submitted: bool,
    /// The last scanner enable/disable exchange succeeded.
    pub scanner_success: bool,
    /// The user asked to stop the scanner. Never clears.
    pub user_attempted_stop: bool,
    /// The scanner countdown reached zero.
    pub expired: bool,
    /// Size of the aggregate the page holds, including its own results.
    pub unregistered_clients_count: usize,
}
