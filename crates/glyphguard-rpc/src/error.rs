//! Mapping from core errors to REST responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use glyphguard_core::{FaultOrigin, GlyphError, RejectReason};
use serde_json::json;
use std::fmt;
use tracing::{error, warn};

pub type ApiResult<T> = Result<T, ApiError>;

/// A structured REST error: `{"code", "message", "data": {"status"}}`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn forbidden() -> Self {
        Self::new(
            StatusCode::FORBIDDEN,
            "rest_forbidden",
            "Sorry, you are not allowed to do that.",
        )
    }

    pub fn invalid_body(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "invalid_body", message)
    }

    pub fn rejected(reason: RejectReason) -> Self {
        Self::new(StatusCode::BAD_REQUEST, reason.code(), reason.message())
    }

    /// Generic 500 that carries no internal detail.
    pub fn fault(origin: FaultOrigin) -> Self {
        match origin {
            FaultOrigin::Internal => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "caught_error",
                "Whoops, there was a critical error with GlyphGuard.",
            ),
            FaultOrigin::External => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "caught_exception",
                "Whoops, there was a critical exception with GlyphGuard.",
            ),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "code": self.code,
            "message": self.message,
            "data": {
                "status": self.status.as_u16(),
            }
        }));

        (self.status, body).into_response()
    }
}

impl From<GlyphError> for ApiError {
    fn from(err: GlyphError) -> Self {
        match &err {
            GlyphError::Persistence { .. } => {
                warn!("Request rejected: {}", err);
                Self::rejected(RejectReason::UpdateFailed)
            }
            GlyphError::Validation { .. } | GlyphError::InvalidVersion { .. } => {
                Self::invalid_body(err.to_string())
            }
            _ => {
                let origin = err.origin().unwrap_or(FaultOrigin::Internal);
                error!("Request failed ({} fault): {}", origin, err);
                Self::fault(origin)
            }
        }
    }
}
