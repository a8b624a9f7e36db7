//! Error types for GlyphGuard.
//!
//! Errors fall into two groups: fatal boot errors that halt loading of every
//! installation (`Configuration`, `IncompatibleRuntime`), and recoverable errors
//! scoped to one request or scan session. Faults that originate in collaborator
//! code (the durable store, lifecycle hooks) carry a [`FaultOrigin`] tag so the
//! request boundary can log where they came from without exposing detail.

use std::path::PathBuf;
use thiserror::Error;

/// Where a fault was raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultOrigin {
    /// Raised by GlyphGuard's own code.
    Internal,
    /// Raised by a collaborator GlyphGuard calls into (store engine, hooks).
    External,
}

impl std::fmt::Display for FaultOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FaultOrigin::Internal => write!(f, "internal"),
            FaultOrigin::External => write!(f, "external"),
        }
    }
}

/// Main error type for GlyphGuard.
#[derive(Debug, Error)]
pub enum GlyphError {
    // Fatal boot errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Incompatible host runtime {found}: requires {required}")]
    IncompatibleRuntime { required: String, found: String },

    // Persistence errors
    #[error("Persistence error for {key}: {message}")]
    Persistence { key: String, message: String },

    #[error("Database error: {message}")]
    Database {
        message: String,
        #[source]
        source: Option<rusqlite::Error>,
    },

    // Request-boundary faults
    #[error("Fault ({origin}): {message}")]
    Fault { origin: FaultOrigin, message: String },

    // Client-side session errors
    #[error("User action failed: {message}")]
    UserAction { message: String },

    #[error("Network error: {message}")]
    Network {
        message: String,
        status_code: Option<u16>,
    },

    // File system errors
    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    // Serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    // Validation errors
    #[error("Validation error for {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Invalid version: {version}")]
    InvalidVersion { version: String },
}

/// Result type alias for GlyphGuard operations.
pub type Result<T> = std::result::Result<T, GlyphError>;

impl From<std::io::Error> for GlyphError {
    fn from(err: std::io::Error) -> Self {
        GlyphError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for GlyphError {
    fn from(err: serde_json::Error) -> Self {
        GlyphError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<rusqlite::Error> for GlyphError {
    fn from(err: rusqlite::Error) -> Self {
        GlyphError::Database {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<reqwest::Error> for GlyphError {
    fn from(err: reqwest::Error) -> Self {
        GlyphError::Network {
            message: err.to_string(),
            status_code: err.status().map(|s| s.as_u16()),
        }
    }
}

impl GlyphError {
    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        GlyphError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// Create an internal fault.
    pub fn internal(message: impl Into<String>) -> Self {
        GlyphError::Fault {
            origin: FaultOrigin::Internal,
            message: message.into(),
        }
    }

    /// Tag an error raised inside collaborator code as an external fault.
    ///
    /// Errors that already carry a classification the caller acts on
    /// (`Persistence`, fatal boot errors) pass through unchanged.
    pub fn external(err: GlyphError) -> Self {
        match err {
            GlyphError::Fault { .. }
            | GlyphError::Persistence { .. }
            | GlyphError::Configuration { .. }
            | GlyphError::IncompatibleRuntime { .. } => err,
            other => GlyphError::Fault {
                origin: FaultOrigin::External,
                message: other.to_string(),
            },
        }
    }

    /// Where the fault came from, if this is a fault.
    pub fn origin(&self) -> Option<FaultOrigin> {
        match self {
            GlyphError::Fault { origin, .. } => Some(*origin),
            _ => None,
        }
    }

    /// Fatal errors halt the boot of every installation.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            GlyphError::Configuration { .. } | GlyphError::IncompatibleRuntime { .. }
        )
    }

    /// HTTP status a request boundary should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            GlyphError::Persistence { .. }
            | GlyphError::Validation { .. }
            | GlyphError::InvalidVersion { .. } => 400,
            _ => 500,
        }
    }
}
