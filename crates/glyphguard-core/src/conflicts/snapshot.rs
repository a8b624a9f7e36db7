//! Read-only state handed to each page load.

use super::observations::UnregisteredClients;
use crate::config::RestConfig;
use crate::error::{GlyphError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClientSnapshot {
    pub unregistered_clients: UnregisteredClients,
    pub detect_conflicts_until: Option<DateTime<Utc>>,
    /// Whether the page should run the scanner and show the reporter.
    pub show_conflict_detection_reporter: bool,
    pub settings_page_url: String,
    pub troubleshoot_tab_url: String,
    pub api_url: String,
}

impl ClientSnapshot {
    pub fn new(
        unregistered_clients: UnregisteredClients,
        detect_conflicts_until: Option<DateTime<Utc>>,
        show_conflict_detection_reporter: bool,
        settings_page_url: &str,
        api_url: &str,
    ) -> Result<Self> {
        Ok(Self {
            unregistered_clients,
            detect_conflicts_until,
            show_conflict_detection_reporter,
            settings_page_url: settings_page_url.to_string(),
            troubleshoot_tab_url: troubleshoot_tab_url(settings_page_url)?,
            api_url: api_url.to_string(),
        })
    }
}

/// Settings page URL with the troubleshoot tab selected.
pub fn troubleshoot_tab_url(settings_page_url: &str) -> Result<String> {
    let mut url = Url::parse(settings_page_url).map_err(|e| GlyphError::Validation {
        field: "settingsPageUrl".to_string(),
        message: e.to_string(),
    })?;
    url.query_pairs_mut()
        .append_pair("tab", RestConfig::TROUBLESHOOT_TAB);
    Ok(url.to_string())
}
