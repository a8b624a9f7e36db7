//! Per-page scan session: the facts behind a status and the events that
//! change them.

use super::facts::ScanFacts;
use super::status::{derive_status, ScanStatus};
use crate::conflicts::{ClientSnapshot, UnregisteredClients};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Progress of this page's detection submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanSessionState {
    pub is_submitting: bool,
    pub has_submitted: bool,
    pub success: bool,
    pub message: Option<String>,
    /// Aggregate size when the submission began.
    pub count_before_detection: usize,
    /// Conflicts the submission carried.
    pub count_after_detection: usize,
}

/// Progress of the scanner enable/disable exchange.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScannerEnablementState {
    pub has_submitted: bool,
    pub success: bool,
    /// Why the last exchange failed.
    pub message: Option<String>,
}

/// Things that happen to a scan session.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanEvent {
    SubmitStarted,
    SubmitFinished {
        success: bool,
        message: Option<String>,
        detected: UnregisteredClients,
    },
    ScannerSubmitStarted,
    /// Reply to the exchange numbered `exchange`. Replies to anything but the
    /// latest exchange are dropped.
    ScannerSubmitFinished {
        exchange: u64,
        success: bool,
        message: Option<String>,
    },
    UserAttemptedStop,
    TimerExpired,
}

/// Counts shown once a page scan completes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoneTally {
    /// Detected ids that were not in the aggregate before this page submitted.
    pub new_on_page: usize,
    /// Size of the aggregate after merging this page.
    pub total: usize,
}

/// One page's scan session.
///
/// [`apply`](Self::apply) is the only way to change it; the status is always
/// recomputed from the current facts.
#[derive(Debug, Clone, Default)]
pub struct ScanSession {
    state: ScanSessionState,
    scanner: ScannerEnablementState,
    scanner_exchange: u64,
    user_attempted_stop: bool,
    expired: bool,
    aggregate: UnregisteredClients,
    before_detection: UnregisteredClients,
    detected: UnregisteredClients,
}

impl ScanSession {
    /// Start a session from the aggregate known at page load.
    pub fn new(aggregate: UnregisteredClients) -> Self {
        Self {
            aggregate,
            ..Default::default()
        }
    }

    pub fn from_snapshot(snapshot: &ClientSnapshot) -> Self {
        Self::new(snapshot.unregistered_clients.clone())
    }

    pub fn state(&self) -> &ScanSessionState {
        &self.state
    }

    pub fn scanner(&self) -> &ScannerEnablementState {
        &self.scanner
    }

    /// Number of the latest scanner exchange. Starts at zero.
    pub fn scanner_exchange(&self) -> u64 {
        self.scanner_exchange
    }

    /// The local copy of the aggregate, including this page's merged results.
    pub fn aggregate(&self) -> &UnregisteredClients {
        &self.aggregate
    }

    /// Apply one event and return the resulting status.
    pub fn apply(&mut self, event: ScanEvent) -> ScanStatus {
        debug!("Scan event: {:?}", event);
        match event {
            ScanEvent::SubmitStarted => {
                self.state.is_submitting = true;
                self.before_detection = self.aggregate.clone();
                self.state.count_before_detection = self.aggregate.len();
            }
            ScanEvent::SubmitFinished {
                success,
                message,
                detected,
            } => {
                self.state.is_submitting = false;
                self.state.has_submitted = true;
                self.state.success = success;
                self.state.message = message;
                self.state.count_after_detection = detected.len();
                if success {
                    self.aggregate.merge(&detected);
                }
                self.detected = detected;
            }
            ScanEvent::ScannerSubmitStarted => {
                self.scanner_exchange += 1;
                self.scanner = ScannerEnablementState::default();
            }
            ScanEvent::ScannerSubmitFinished {
                exchange,
                success,
                message,
            } => {
                if exchange == self.scanner_exchange {
                    self.scanner = ScannerEnablementState {
                        has_submitted: true,
                        success,
                        message,
                    };
                } else {
                    debug!(
                        "Dropping reply to scanner exchange {} (latest {})",
                        exchange, self.scanner_exchange
                    );
                }
            }
            ScanEvent::UserAttemptedStop => self.user_attempted_stop = true,
            ScanEvent::TimerExpired => self.expired = true,
        }
        self.status()
    }

    pub fn facts(&self) -> ScanFacts {
        ScanFacts {
            is_submitting: self.state.is_submitting,
            has_submitted: self.state.has_submitted,
            success: self.state.success,
            message: self.state.message.clone(),
            scanner_has_submitted: self.scanner.has_submitted,
            scanner_success: self.scanner.success,
            user_attempted_stop: self.user_attempted_stop,
            expired: self.expired,
            unregistered_clients_count: self.aggregate.len(),
        }
    }

    pub fn status(&self) -> ScanStatus {
        derive_status(&self.facts())
    }

    /// Text for the current status. Errors show the failed exchange's message.
    pub fn status_text(&self) -> String {
        match self.status() {
            ScanStatus::Error => {
                let message = if self.user_attempted_stop {
                    &self.scanner.message
                } else {
                    &self.state.message
                };
                message
                    .clone()
                    .unwrap_or_else(|| ScanStatus::Error.label().to_string())
            }
            status => status.label().to_string(),
        }
    }

    pub fn done_tally(&self) -> DoneTally {
        DoneTally {
            new_on_page: self.detected.count_absent_from(&self.before_detection),
            total: self.aggregate.len(),
        }
    }
}
