//! Conflict report endpoint.

use super::require_admin;
use crate::error::{ApiError, ApiResult};
use crate::server::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use chrono::Utc;
use glyphguard_core::{ReportOutcome, UnregisteredClients};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// `POST <namespace>/report-conflicts`
///
/// 204 on merge, 404 while the scanner is off, 400 when the write fails.
pub async fn report_conflicts(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<StatusCode> {
    require_admin(&state, &headers)?;

    let Json(body) = body.map_err(|e| ApiError::invalid_body(e.body_text()))?;
    let observations = UnregisteredClients::from_value(body)
        .map_err(|e| ApiError::invalid_body(e.to_string()))?;
    debug!("Conflict report with {} observations", observations.len());

    match state
        .aggregator
        .report_conflicts(&observations, Utc::now())?
    {
        ReportOutcome::Accepted => Ok(StatusCode::NO_CONTENT),
        ReportOutcome::NotApplicable => Ok(StatusCode::NOT_FOUND),
        ReportOutcome::Rejected(reason) => Err(ApiError::rejected(reason)),
    }
}
