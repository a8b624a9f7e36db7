//! Admin-visible failure notices.

use crate::error::GlyphError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A message shown to site administrators instead of crashing the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminNotice {
    pub message: String,
}

impl AdminNotice {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Notice for a fatal boot error.
    pub fn for_boot_error(err: &GlyphError) -> Self {
        match err {
            GlyphError::IncompatibleRuntime { required, found } => Self::new(format!(
                "GlyphGuard is incompatible with host runtime {}. Please upgrade to {}.",
                found, required
            )),
            GlyphError::Configuration { message } => Self::new(format!(
                "Unable to load GlyphGuard. Please contact the author. ({})",
                message
            )),
            _ => Self::new("Unable to load GlyphGuard. Please contact the author."),
        }
    }

    pub fn activation_failed() -> Self {
        Self::new("Sorry, GlyphGuard could not be activated.")
    }

    pub fn initialization_failed() -> Self {
        Self::new("Sorry, GlyphGuard could not be initialized.")
    }
}

impl fmt::Display for AdminNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}
