//! Installation manifest discovery.
//!
//! Each installation carries a small JSON manifest at its root. Reading it never
//! loads code from the installation; it only yields the declared version and
//! host runtime requirement.

use crate::config::BootConfig;
use crate::error::{GlyphError, Result};
use semver::VersionReq;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Metadata declared by one installation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InstallationManifest {
    #[serde(default)]
    pub name: String,
    pub version: String,
    /// Semver requirement on the host runtime, e.g. `">=1.4"`.
    #[serde(default)]
    pub requires_host: Option<String>,
}

impl InstallationManifest {
    /// Path of the manifest inside an installation.
    pub fn path_for(location: &Path) -> PathBuf {
        location.join(BootConfig::MANIFEST_FILE_NAME)
    }

    /// Read the manifest at `location`.
    ///
    /// Returns `None` if the installation has no manifest.
    pub fn read(location: &Path) -> Result<Option<Self>> {
        let path = Self::path_for(location);
        if !path.exists() {
            return Ok(None);
        }

        let contents =
            std::fs::read_to_string(&path).map_err(|e| GlyphError::io_with_path(e, &path))?;
        let manifest: InstallationManifest =
            serde_json::from_str(&contents).map_err(|e| GlyphError::Json {
                message: format!("Failed to parse {}: {}", path.display(), e),
                source: Some(e),
            })?;

        Ok(Some(manifest))
    }

    /// Host runtime requirement, falling back to the built-in minimum.
    pub fn host_requirement(&self) -> Result<VersionReq> {
        let raw = self
            .requires_host
            .as_deref()
            .unwrap_or(BootConfig::MIN_HOST_RUNTIME);
        VersionReq::parse(raw).map_err(|e| GlyphError::Validation {
            field: "requiresHost".to_string(),
            message: format!("{}: {}", raw, e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_read_missing_manifest() {
        let temp_dir = TempDir::new().unwrap();
        assert!(InstallationManifest::read(temp_dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_read_manifest() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(
            InstallationManifest::path_for(temp_dir.path()),
            r#"{"name": "glyphguard", "version": "4.1.0", "requiresHost": ">=1.4"}"#,
        )
        .unwrap();

        let manifest = InstallationManifest::read(temp_dir.path()).unwrap().unwrap();
        assert_eq!(manifest.version, "4.1.0");
        let req = manifest.host_requirement().unwrap();
        assert!(req.matches(&semver::Version::new(1, 4, 0)));
        assert!(!req.matches(&semver::Version::new(1, 3, 9)));
    }

    #[test]
    fn test_default_host_requirement() {
        let manifest = InstallationManifest {
            name: String::new(),
            version: "4.0.0".into(),
            requires_host: None,
        };
        let req = manifest.host_requirement().unwrap();
        assert!(req.matches(&semver::Version::new(1, 0, 0)));
        assert!(!req.matches(&semver::Version::new(0, 9, 0)));
    }

    #[test]
    fn test_malformed_manifest_is_error() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(InstallationManifest::path_for(temp_dir.path()), "{not json").unwrap();
        assert!(InstallationManifest::read(temp_dir.path()).is_err());
    }
}
