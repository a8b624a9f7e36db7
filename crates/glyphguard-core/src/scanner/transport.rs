//! Client side of the REST exchanges a scan session makes.

use crate::config::{AppConfig, RestConfig};
use crate::conflicts::UnregisteredClients;
use crate::error::{GlyphError, Result};
use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

/// Network exchanges a scan session depends on.
#[async_trait]
pub trait ScanTransport: Send + Sync {
    /// Submit this page's observations.
    async fn report_conflicts(&self, observations: &UnregisteredClients) -> Result<()>;

    /// Turn the site-wide scanner on or off.
    async fn set_scanner(&self, enable: bool) -> Result<()>;
}

/// [`ScanTransport`] over the GlyphGuard REST routes.
pub struct HttpScanTransport {
    api_url: String,
    admin_token: Option<String>,
    client: reqwest::Client,
}

impl HttpScanTransport {
    /// `api_url` is the namespace root, e.g. `http://host/glyphguard/v1`.
    pub fn new(api_url: &str, admin_token: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(RestConfig::REQUEST_TIMEOUT)
            .user_agent(AppConfig::PLUGIN_SLUG)
            .build()
            .map_err(|e| GlyphError::Network {
                message: format!("Failed to build HTTP client: {}", e),
                status_code: None,
            })?;

        Ok(Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            admin_token,
            client,
        })
    }

    fn url(&self, route: &str) -> String {
        format!("{}/{}", self.api_url, route)
    }

    async fn post(&self, route: &str, body: serde_json::Value) -> Result<()> {
        let url = self.url(route);
        debug!("POST {}", url);

        let mut request = self.client.post(&url).json(&body);
        if let Some(token) = &self.admin_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| GlyphError::Network {
            message: format!("Failed to reach {}: {}", url, e),
            status_code: None,
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GlyphError::Network {
                message: format!("{} returned {}: {}", url, status, body),
                status_code: Some(status.as_u16()),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ScanTransport for HttpScanTransport {
    async fn report_conflicts(&self, observations: &UnregisteredClients) -> Result<()> {
        self.post(RestConfig::REPORT_CONFLICTS_ROUTE, observations.to_value())
            .await
    }

    async fn set_scanner(&self, enable: bool) -> Result<()> {
        self.post(
            RestConfig::CONFLICT_DETECTION_ROUTE,
            json!({ "enable": enable }),
        )
        .await
    }
}
