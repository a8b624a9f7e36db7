//! Scanner switch and page snapshot endpoints.

use super::require_admin;
use crate::error::{ApiError, ApiResult};
use crate::server::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::HeaderMap,
    Json,
};
use chrono::{DateTime, Utc};
use glyphguard_core::ClientSnapshot;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct ScannerToggle {
    pub enable: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScannerState {
    pub detect_conflicts_until: Option<DateTime<Utc>>,
}

/// `POST <namespace>/conflict-detection` with `{"enable": bool}`.
pub async fn set_conflict_detection(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<Json<ScannerToggle>, JsonRejection>,
) -> ApiResult<Json<ScannerState>> {
    require_admin(&state, &headers)?;

    let Json(toggle) = body.map_err(|e| ApiError::invalid_body(e.body_text()))?;
    let detect_conflicts_until = state.aggregator.set_scanner(toggle.enable, Utc::now())?;
    Ok(Json(ScannerState {
        detect_conflicts_until,
    }))
}

/// `GET <namespace>/conflict-detection`: the state a page load starts from.
pub async fn get_conflict_detection(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<Json<ClientSnapshot>> {
    require_admin(&state, &headers)?;

    let snapshot =
        state
            .aggregator
            .snapshot(Utc::now(), &state.settings_page_url, &state.api_url)?;
    Ok(Json(snapshot))
}
