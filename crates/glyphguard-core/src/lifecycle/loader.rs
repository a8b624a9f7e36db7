//! Boot sequence and count-gated lifecycle entry points.
//!
//! The host calls into whichever installation it happens to load first. The
//! loader turns that call into work done by the arbitrated installation, and
//! lets destructive teardown through only when a single installation is left.

use super::hooks::InstallationHooks;
use super::notice::AdminNotice;
use crate::config::BootConfig;
use crate::error::{GlyphError, Result};
use crate::registry::{InstallationManifest, InstallationRecord, InstallationRegistry};
use semver::{Version, VersionReq};
use std::sync::Arc;
use tracing::{debug, error, info};

/// What a boot attempt produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootOutcome {
    /// The active installation for this boot.
    Loaded(InstallationRecord),
    /// Boot halted; nothing from any installation was loaded.
    Failed(AdminNotice),
}

impl BootOutcome {
    pub fn active(&self) -> Option<&InstallationRecord> {
        match self {
            BootOutcome::Loaded(record) => Some(record),
            BootOutcome::Failed(_) => None,
        }
    }
}

/// Boot and lifecycle driver shared by every co-installed copy.
pub struct Loader {
    registry: Arc<InstallationRegistry>,
    hooks: Arc<dyn InstallationHooks>,
    host_runtime: Version,
}

impl Loader {
    pub fn new(
        registry: Arc<InstallationRegistry>,
        hooks: Arc<dyn InstallationHooks>,
        host_runtime: Version,
    ) -> Self {
        Self {
            registry,
            hooks,
            host_runtime,
        }
    }

    pub fn registry(&self) -> &Arc<InstallationRegistry> {
        &self.registry
    }

    /// Select the active installation and check the host runtime against its
    /// requirement. Only the installation's manifest is read.
    pub fn resolve(&self) -> Result<InstallationRecord> {
        let selected = self.registry.select()?;

        let manifest = InstallationManifest::read(&selected.location).map_err(|e| {
            GlyphError::Configuration {
                message: format!(
                    "Unreadable manifest for installation at {}: {}",
                    selected.location.display(),
                    e
                ),
            }
        })?;
        let requirement = match manifest {
            Some(manifest) => manifest.host_requirement(),
            None => VersionReq::parse(BootConfig::MIN_HOST_RUNTIME).map_err(|e| {
                GlyphError::Validation {
                    field: "requiresHost".to_string(),
                    message: e.to_string(),
                }
            }),
        }
        .map_err(|e| GlyphError::Configuration {
            message: e.to_string(),
        })?;

        if !requirement.matches(&self.host_runtime) {
            return Err(GlyphError::IncompatibleRuntime {
                required: requirement.to_string(),
                found: self.host_runtime.to_string(),
            });
        }

        Ok(selected)
    }

    /// Boot once. Fatal errors become an admin notice.
    pub fn boot(&self) -> BootOutcome {
        match self.resolve() {
            Ok(active) => {
                info!(
                    "Loaded installation {} from {}",
                    active.version,
                    active.location.display()
                );
                BootOutcome::Loaded(active)
            }
            Err(e) => {
                error!("Boot halted: {}", e);
                BootOutcome::Failed(AdminNotice::for_boot_error(&e))
            }
        }
    }

    /// Run the activation hook of the active installation.
    pub async fn activate(&self) -> std::result::Result<InstallationRecord, AdminNotice> {
        let active = self.resolve().map_err(|e| AdminNotice::for_boot_error(&e))?;
        if let Err(e) = self.hooks.activate(&active).await {
            let e = GlyphError::external(e);
            error!("Activation failed ({:?}): {}", e.origin(), e);
            return Err(AdminNotice::activation_failed());
        }
        Ok(active)
    }

    /// Run the initialization hook of the active installation.
    pub async fn initialize(&self) -> std::result::Result<InstallationRecord, AdminNotice> {
        let active = self.resolve().map_err(|e| AdminNotice::for_boot_error(&e))?;
        if let Err(e) = self.hooks.initialize(&active).await {
            let e = GlyphError::external(e);
            error!("Initialization failed ({:?}): {}", e.origin(), e);
            return Err(AdminNotice::initialization_failed());
        }
        Ok(active)
    }

    /// Uninstall shared state if this is the last registered installation.
    ///
    /// Returns `true` if the hook ran.
    pub async fn maybe_uninstall(&self) -> Result<bool> {
        let Some(sole) = self.sole_installation() else {
            return Ok(false);
        };
        self.hooks
            .uninstall(&sole)
            .await
            .map_err(GlyphError::external)?;
        Ok(true)
    }

    /// Deactivate shared state if this is the last registered installation.
    ///
    /// Returns `true` if the hook ran.
    pub async fn maybe_deactivate(&self) -> Result<bool> {
        let Some(sole) = self.sole_installation() else {
            return Ok(false);
        };
        self.hooks
            .deactivate(&sole)
            .await
            .map_err(GlyphError::external)?;
        Ok(true)
    }

    /// The only registered installation, counted at call time.
    fn sole_installation(&self) -> Option<InstallationRecord> {
        let installations = self.registry.installations();
        if installations.len() == 1 {
            installations.into_iter().next()
        } else {
            debug!(
                "Skipping teardown: {} installations registered",
                installations.len()
            );
            None
        }
    }
}
