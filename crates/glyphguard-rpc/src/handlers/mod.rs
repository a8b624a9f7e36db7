//! REST handlers.

mod conflicts;
mod scanner;

pub use conflicts::report_conflicts;
pub use scanner::{get_conflict_detection, set_conflict_detection};

use crate::error::ApiError;
use crate::server::AppState;
use axum::{
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap},
    response::IntoResponse,
    Json,
};
use glyphguard_core::BootOutcome;
use serde_json::json;
use std::sync::Arc;

/// Health check endpoint. Reports the boot notice when boot failed.
pub async fn handle_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match &state.boot {
        BootOutcome::Loaded(active) => Json(json!({
            "status": "ok",
            "version": active.version,
        })),
        BootOutcome::Failed(notice) => Json(json!({
            "status": "degraded",
            "notice": notice.message,
        })),
    }
}

/// Check the administrative capability.
///
/// With no admin token configured every caller is an admin.
pub(crate) fn require_admin(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let Some(expected) = state.admin_token.as_deref() else {
        return Ok(());
    };

    let presented = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match presented {
        Some(token) if token == expected => Ok(()),
        _ => Err(ApiError::forbidden()),
    }
}
