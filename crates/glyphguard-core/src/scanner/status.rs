//! Status derivation for a scan session.

use super::facts::ScanFacts;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What a page's scanner is currently doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScanStatus {
    Running,
    Submitting,
    Done,
    None,
    Error,
    Expired,
    Ready,
    Stopped,
    Stopping,
}

impl ScanStatus {
    /// Short text shown next to the status.
    pub fn label(&self) -> &'static str {
        match self {
            ScanStatus::Running => "Scanning...",
            ScanStatus::Submitting => "Submitting...",
            ScanStatus::Done => "Page scan complete",
            ScanStatus::None => "All clear!",
            ScanStatus::Error => "Error",
            ScanStatus::Expired => "Timer expired",
            ScanStatus::Ready => "Scanner ready",
            ScanStatus::Stopped => "Timer stopped",
            ScanStatus::Stopping => "Stopping...",
        }
    }
}

impl fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScanStatus::Running => "Running",
            ScanStatus::Submitting => "Submitting",
            ScanStatus::Done => "Done",
            ScanStatus::None => "None",
            ScanStatus::Error => "Error",
            ScanStatus::Expired => "Expired",
            ScanStatus::Ready => "Ready",
            ScanStatus::Stopped => "Stopped",
            ScanStatus::Stopping => "Stopping",
        };
        f.write_str(name)
    }
}

/// Project a fact set onto exactly one status. First matching rule wins.
pub fn derive_status(facts: &ScanFacts) -> ScanStatus {
    if facts.user_attempted_stop {
        return if !facts.scanner_has_submitted {
            ScanStatus::Stopping
        } else if facts.scanner_success {
            ScanStatus::Stopped
        } else {
            ScanStatus::Error
        };
    }

    if facts.scanner_has_submitted && facts.scanner_success {
        ScanStatus::Ready
    } else if facts.expired {
        ScanStatus::Expired
    } else if facts.success && facts.unregistered_clients_count == 0 {
        ScanStatus::None
    } else if facts.success {
        ScanStatus::Done
    } else if facts.is_submitting {
        ScanStatus::Submitting
    } else if !facts.has_submitted {
        ScanStatus::Running
    } else {
        ScanStatus::Error
    }
}
