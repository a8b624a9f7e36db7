//! Default hooks: seed and tear down the option keys.

use super::hooks::InstallationHooks;
use crate::config::StoreConfig;
use crate::conflicts::{UnregisteredClients, UserOptions};
use crate::error::{GlyphError, Result};
use crate::registry::InstallationRecord;
use crate::store::OptionStore;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

/// Hooks that manage GlyphGuard's own keys in the option store.
pub struct OptionsActivator {
    store: Arc<dyn OptionStore>,
}

impl OptionsActivator {
    pub fn new(store: Arc<dyn OptionStore>) -> Self {
        Self { store }
    }

    /// Write default user options and an empty aggregate.
    ///
    /// Existing values are left alone unless `force` is set.
    pub fn initialize_options(&self, force: bool) -> Result<()> {
        if force || self.store.get(StoreConfig::OPTIONS_KEY)?.is_none() {
            let defaults = serde_json::to_value(UserOptions::default())?;
            self.write(StoreConfig::OPTIONS_KEY, &defaults)?;
            debug!("Initialized user options");
        }

        if force || self.store.get(StoreConfig::UNREGISTERED_CLIENTS_KEY)?.is_none() {
            self.write(
                StoreConfig::UNREGISTERED_CLIENTS_KEY,
                &UnregisteredClients::new().to_value(),
            )?;
            debug!("Initialized unregistered clients aggregate");
        }

        Ok(())
    }

    fn write(&self, key: &str, value: &Value) -> Result<()> {
        if self.store.update(key, value)? {
            Ok(())
        } else {
            Err(GlyphError::Persistence {
                key: key.to_string(),
                message: "store refused the write".to_string(),
            })
        }
    }
}

#[async_trait]
impl InstallationHooks for OptionsActivator {
    async fn activate(&self, installation: &InstallationRecord) -> Result<()> {
        info!("Activating installation {}", installation.version);
        self.initialize_options(false)
    }

    async fn initialize(&self, _installation: &InstallationRecord) -> Result<()> {
        self.initialize_options(false)
    }

    async fn deactivate(&self, installation: &InstallationRecord) -> Result<()> {
        info!("Deactivating installation {}", installation.version);
        let Some(raw) = self.store.get(StoreConfig::OPTIONS_KEY)? else {
            return Ok(());
        };
        let mut options: UserOptions = serde_json::from_value(raw)?;
        if options.detect_conflicts_until.take().is_some() {
            let value = serde_json::to_value(&options)?;
            self.write(StoreConfig::OPTIONS_KEY, &value)?;
        }
        Ok(())
    }

    async fn uninstall(&self, installation: &InstallationRecord) -> Result<()> {
        info!("Uninstalling installation {}", installation.version);
        self.store.delete(StoreConfig::OPTIONS_KEY)?;
        self.store.delete(StoreConfig::UNREGISTERED_CLIENTS_KEY)?;
        Ok(())
    }
}
