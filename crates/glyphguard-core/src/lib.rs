//! GlyphGuard Core - arbitration between co-installed copies of the GlyphGuard
//! extension, and the conflict scanner that finds foreign icon assets.
//!
//! Several extensions may bundle their own copy of GlyphGuard. Every copy
//! registers itself during boot; exactly one, the highest version, is loaded.
//! Destructive lifecycle actions only run from the last copy left.
//!
//! The conflict scanner runs on page loads while an admin has it switched on.
//! Each page reports the foreign assets it saw, and the reports are merged
//! into one durable aggregate.
//!
//! # Example
//!
//! ```rust,ignore
//! use glyphguard_core::{InstallationRegistry, Loader, OptionsActivator, SqliteOptionStore};
//! use std::sync::Arc;
//!
//! let registry = Arc::new(InstallationRegistry::new());
//! registry.register_location("/plugins/a/glyphguard".as_ref(), None)?;
//! registry.register_location("/plugins/b/glyphguard".as_ref(), None)?;
//!
//! let store = Arc::new(SqliteOptionStore::open("/var/lib/glyphguard/options.db")?);
//! let hooks = Arc::new(OptionsActivator::new(store));
//! let loader = Loader::new(registry, hooks, semver::Version::new(1, 4, 0));
//! let outcome = loader.boot();
//! ```

pub mod cancel;
pub mod config;
pub mod conflicts;
pub mod error;
pub mod lifecycle;
pub mod registry;
pub mod scanner;
pub mod store;

// Re-export commonly used types
pub use cancel::CancellationToken;
pub use conflicts::{
    observation_id, ClientSnapshot, ConflictAggregator, RejectReason, ReportOutcome,
    UnregisteredClients, UserOptions,
};
pub use error::{FaultOrigin, GlyphError, Result};
pub use lifecycle::{AdminNotice, BootOutcome, InstallationHooks, Loader, OptionsActivator};
pub use registry::{DottedVersion, InstallationManifest, InstallationRecord, InstallationRegistry};
pub use scanner::{
    derive_status, HttpScanTransport, ScanDriver, ScanEvent, ScanFacts, ScanHandle, ScanSession,
    ScanStatus, ScanTimer, ScanTransport,
};
pub use store::{MemoryOptionStore, OptionStore, SqliteOptionStore};

use config::AppConfig;
use std::path::PathBuf;

/// Default directory for the option database.
///
/// Falls back to the working directory when the platform has no data dir.
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(AppConfig::DATA_DIR_NAME)
}

/// Default path of the option database.
pub fn default_database_path() -> PathBuf {
    default_data_dir().join(AppConfig::DATABASE_FILE_NAME)
}
