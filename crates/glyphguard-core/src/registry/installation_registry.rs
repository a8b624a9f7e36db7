//! Registry of co-installed copies and the arbiter that picks the active one.

use super::manifest::InstallationManifest;
use super::version::DottedVersion;
use crate::error::{GlyphError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

/// One bundled copy of the library at a distinct location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallationRecord {
    pub location: PathBuf,
    pub version: DottedVersion,
}

impl InstallationRecord {
    pub fn new(location: impl Into<PathBuf>, version: DottedVersion) -> Self {
        Self {
            location: location.into(),
            version,
        }
    }
}

/// Boot-scoped registry of every installation that announced itself.
///
/// Construct one per boot and share it by reference. [`select`](Self::select)
/// compares versions only on its first successful call; the result is kept for
/// the rest of the process even if more installations register later.
#[derive(Debug, Default)]
pub struct InstallationRegistry {
    installations: RwLock<Vec<InstallationRecord>>,
    selected: Mutex<Option<InstallationRecord>>,
}

impl InstallationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an installation. Registering an identical pair again is a no-op.
    ///
    /// Returns `true` if the record was added.
    pub fn register(&self, location: impl Into<PathBuf>, version: DottedVersion) -> Result<bool> {
        let record = InstallationRecord::new(location, version);
        let mut installations = self.installations.write().map_err(|_| {
            GlyphError::internal("Failed to acquire installation registry lock")
        })?;

        if installations
            .iter()
            .any(|r| r.location == record.location && r.version.as_str() == record.version.as_str())
        {
            debug!(
                "Installation already registered: {} ({})",
                record.location.display(),
                record.version
            );
            return Ok(false);
        }

        debug!(
            "Registered installation {} at {}",
            record.version,
            record.location.display()
        );
        installations.push(record);
        Ok(true)
    }

    /// Register the installation at `location`, reading its version from the
    /// manifest when `version` is `None`.
    ///
    /// A location without a manifest is skipped and `Ok(false)` returned.
    pub fn register_location(&self, location: &Path, version: Option<&str>) -> Result<bool> {
        let manifest = match InstallationManifest::read(location)? {
            Some(manifest) => manifest,
            None => {
                warn!(
                    "Skipping installation without manifest: {}",
                    location.display()
                );
                return Ok(false);
            }
        };

        let version = DottedVersion::parse(version.unwrap_or(&manifest.version))?;
        self.register(location, version)
    }

    /// Number of installations currently registered, active or not.
    pub fn installation_count(&self) -> usize {
        self.installations.read().map(|i| i.len()).unwrap_or(0)
    }

    /// All registered installations in registration order.
    pub fn installations(&self) -> Vec<InstallationRecord> {
        self.installations
            .read()
            .map(|i| i.clone())
            .unwrap_or_default()
    }

    /// The installation chosen by an earlier [`select`](Self::select), if any.
    pub fn selected(&self) -> Option<InstallationRecord> {
        self.selected.lock().ok().and_then(|s| s.clone())
    }

    /// Pick the installation with the highest version.
    ///
    /// Equal versions resolve to the one registered first. The first successful
    /// result is cached and returned by every later call.
    pub fn select(&self) -> Result<InstallationRecord> {
        // Held across the comparison so no caller observes an uncached result.
        let mut selected = self
            .selected
            .lock()
            .map_err(|_| GlyphError::internal("Failed to acquire arbiter lock"))?;

        if let Some(record) = selected.as_ref() {
            return Ok(record.clone());
        }

        let installations = self.installations.read().map_err(|_| {
            GlyphError::internal("Failed to acquire installation registry lock")
        })?;

        let mut best: Option<&InstallationRecord> = None;
        for candidate in installations.iter() {
            match best {
                Some(current) if candidate.version <= current.version => {}
                _ => best = Some(candidate),
            }
        }

        let winner = best.cloned().ok_or_else(|| GlyphError::Configuration {
            message: "No installations registered".to_string(),
        })?;

        info!(
            "Selected installation {} at {} ({} registered)",
            winner.version,
            winner.location.display(),
            installations.len()
        );
        *selected = Some(winner.clone());
        Ok(winner)
    }
}
