//! Installation registry and version arbitration.
//!
//! Every co-installed copy registers `(location, version)` during boot. The
//! registry picks exactly one active copy and reports how many copies exist so
//! destructive lifecycle actions run only from the last one.

pub mod installation_registry;
pub mod manifest;
pub mod version;

pub use installation_registry::{InstallationRecord, InstallationRegistry};
pub use manifest::InstallationManifest;
pub use version::DottedVersion;
