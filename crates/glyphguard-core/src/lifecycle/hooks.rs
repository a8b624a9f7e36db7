//! Lifecycle hooks an installation exposes to the host.

use crate::error::Result;
use crate::registry::InstallationRecord;
use async_trait::async_trait;

/// Install/teardown logic belonging to one installation.
///
/// The loader decides which installation a hook runs for and whether it runs
/// at all; implementations only do the work.
#[async_trait]
pub trait InstallationHooks: Send + Sync {
    /// Run when the host activates the extension.
    async fn activate(&self, installation: &InstallationRecord) -> Result<()>;

    /// Run on boot to seed missing durable state.
    async fn initialize(&self, installation: &InstallationRecord) -> Result<()>;

    /// Run when the host deactivates the extension.
    async fn deactivate(&self, installation: &InstallationRecord) -> Result<()>;

    /// Run when the host deletes the extension. Removes shared durable state.
    async fn uninstall(&self, installation: &InstallationRecord) -> Result<()>;
}
