//! Centralized configuration for GlyphGuard.
//!
//! Constants for storage keys, scanner timing, REST routing and boot checks.

use std::time::Duration;

/// Application-level configuration.
pub struct AppConfig;

impl AppConfig {
    pub const APP_NAME: &'static str = "GlyphGuard";
    pub const PLUGIN_SLUG: &'static str = "glyphguard";
    pub const DATA_DIR_NAME: &'static str = "glyphguard";
    pub const DATABASE_FILE_NAME: &'static str = "options.db";
}

/// Durable store keys and SQLite tuning.
pub struct StoreConfig;

impl StoreConfig {
    pub const OPTIONS_KEY: &'static str = "glyphguard-options";
    pub const UNREGISTERED_CLIENTS_KEY: &'static str = "glyphguard-unregistered-clients";
    pub const BUSY_TIMEOUT_MS: u32 = 5000;
}

/// Conflict scanner timing.
pub struct ScannerConfig;

impl ScannerConfig {
    /// How long the scanner stays enabled after an admin turns it on.
    pub const DEFAULT_DURATION: Duration = Duration::from_secs(10 * 60);
    /// Capacity of a scan session's event queue.
    pub const EVENT_QUEUE_CAPACITY: usize = 64;
}

/// REST routing.
pub struct RestConfig;

impl RestConfig {
    pub const NAMESPACE: &'static str = "glyphguard/v1";
    pub const REPORT_CONFLICTS_ROUTE: &'static str = "report-conflicts";
    pub const CONFLICT_DETECTION_ROUTE: &'static str = "conflict-detection";
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
    /// Query appended to the settings page to open the troubleshoot tab.
    pub const TROUBLESHOOT_TAB: &'static str = "ts";
}

/// Boot-time checks.
pub struct BootConfig;

impl BootConfig {
    /// Manifest file every installation carries at its location.
    pub const MANIFEST_FILE_NAME: &'static str = "glyphguard.json";
    /// Host runtime requirement used when a manifest declares none.
    pub const MIN_HOST_RUNTIME: &'static str = ">=1.0.0";
}
