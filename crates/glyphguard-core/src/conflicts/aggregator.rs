//! Server-side merge point for conflict reports.
//!
//! Each page load posts the observations it made. The aggregator folds them
//! into the single durable aggregate with a read-merge-write on one store key.
//! No lock is taken across the three steps: concurrent reports may interleave,
//! and the aggregate converges per id with the last writer winning.

use super::observations::UnregisteredClients;
use super::options::UserOptions;
use super::snapshot::ClientSnapshot;
use crate::config::{ScannerConfig, StoreConfig};
use crate::error::{GlyphError, Result};
use crate::store::OptionStore;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Why a report was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// The durable write did not go through.
    UpdateFailed,
}

impl RejectReason {
    /// Machine-readable code sent to clients.
    pub fn code(&self) -> &'static str {
        match self {
            RejectReason::UpdateFailed => "update_failed",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            RejectReason::UpdateFailed => {
                "We weren't able to update the unregistered clients data."
            }
        }
    }
}

/// Result of one conflict report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportOutcome {
    /// Merged and written.
    Accepted,
    /// Merge computed but not persisted; the previous aggregate is unchanged.
    Rejected(RejectReason),
    /// The scanner is disabled; nothing was read or written.
    NotApplicable,
}

/// Merges per-page observation sets into the durable aggregate.
#[derive(Clone)]
pub struct ConflictAggregator {
    store: Arc<dyn OptionStore>,
}

impl ConflictAggregator {
    pub fn new(store: Arc<dyn OptionStore>) -> Self {
        Self { store }
    }

    /// Read the user options. Absent options read as defaults.
    ///
    /// Store failures come back tagged as external faults.
    pub fn user_options(&self) -> Result<UserOptions> {
        let raw = self
            .store
            .get(StoreConfig::OPTIONS_KEY)
            .map_err(GlyphError::external)?;
        match raw {
            Some(value) => serde_json::from_value(value).map_err(|e| {
                GlyphError::internal(format!("Stored user options are malformed: {}", e))
            }),
            None => Ok(UserOptions::default()),
        }
    }

    /// Whether the scanner is enabled site-wide at `now`.
    pub fn detecting_conflicts(&self, now: DateTime<Utc>) -> Result<bool> {
        Ok(self.user_options()?.detecting_conflicts(now))
    }

    /// The deadline until which the scanner runs, if it is on.
    pub fn scanner_deadline(&self) -> Result<Option<DateTime<Utc>>> {
        Ok(self.user_options()?.detect_conflicts_until)
    }

    /// Read the aggregate. Absent reads as empty.
    pub fn unregistered_clients(&self) -> Result<UnregisteredClients> {
        let raw = self
            .store
            .get(StoreConfig::UNREGISTERED_CLIENTS_KEY)
            .map_err(GlyphError::external)?;
        match raw {
            Some(value) => UnregisteredClients::from_value(value).map_err(|e| {
                GlyphError::internal(format!("Stored aggregate is malformed: {}", e))
            }),
            None => Ok(UnregisteredClients::new()),
        }
    }

    /// Merge `observations` into the aggregate.
    ///
    /// The merged value is always written back, even when it equals what was
    /// stored. Errors are faults at the request boundary; a failed write is a
    /// [`ReportOutcome::Rejected`], not an error.
    pub fn report_conflicts(
        &self,
        observations: &UnregisteredClients,
        now: DateTime<Utc>,
    ) -> Result<ReportOutcome> {
        if !self.detecting_conflicts(now)? {
            debug!("Conflict report ignored: scanner disabled");
            return Ok(ReportOutcome::NotApplicable);
        }

        let mut merged = self.unregistered_clients()?;
        let before = merged.len();
        merged.merge(observations);

        match self
            .store
            .update(StoreConfig::UNREGISTERED_CLIENTS_KEY, &merged.to_value())
        {
            Ok(true) => {
                info!(
                    "Merged {} observations into aggregate ({} -> {} clients)",
                    observations.len(),
                    before,
                    merged.len()
                );
                Ok(ReportOutcome::Accepted)
            }
            Ok(false) => {
                warn!("Store refused aggregate write");
                Ok(ReportOutcome::Rejected(RejectReason::UpdateFailed))
            }
            Err(e) => {
                warn!("Aggregate write failed: {}", e);
                Ok(ReportOutcome::Rejected(RejectReason::UpdateFailed))
            }
        }
    }

    /// Turn the scanner on for the default duration, or off.
    ///
    /// Returns the new deadline.
    pub fn set_scanner(&self, enable: bool, now: DateTime<Utc>) -> Result<Option<DateTime<Utc>>> {
        let mut options = self.user_options()?;
        options.detect_conflicts_until = if enable {
            let duration = chrono::Duration::from_std(ScannerConfig::DEFAULT_DURATION)
                .map_err(|e| GlyphError::internal(format!("Invalid scanner duration: {}", e)))?;
            Some(now + duration)
        } else {
            None
        };

        let value = serde_json::to_value(&options)?;
        let written = self
            .store
            .update(StoreConfig::OPTIONS_KEY, &value)
            .map_err(|e| GlyphError::Persistence {
                key: StoreConfig::OPTIONS_KEY.to_string(),
                message: e.to_string(),
            })?;
        if !written {
            return Err(GlyphError::Persistence {
                key: StoreConfig::OPTIONS_KEY.to_string(),
                message: "store refused the write".to_string(),
            });
        }

        info!(
            "Conflict scanner {} (until {:?})",
            if enable { "enabled" } else { "disabled" },
            options.detect_conflicts_until
        );
        Ok(options.detect_conflicts_until)
    }

    /// Build the snapshot a page load starts from.
    pub fn snapshot(
        &self,
        now: DateTime<Utc>,
        settings_page_url: &str,
        api_url: &str,
    ) -> Result<ClientSnapshot> {
        let options = self.user_options()?;
        let unregistered_clients = self.unregistered_clients()?;
        ClientSnapshot::new(
            unregistered_clients,
            options.detect_conflicts_until,
            options.detecting_conflicts(now),
            settings_page_url,
            api_url,
        )
    }
}
