//! Error types for ayah-render
//!
//! Render pipeline failures are either a user-correctable invalid template
//! (400) or an infrastructure failure at a named stage (500).

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;
use thiserror::Error;

/// Pipeline stage at which a render failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStage {
    Request,
    Bundle,
    Browser,
    Discovery,
    Render,
    Stream,
}

impl fmt::Display for RenderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RenderStage::Request => "request validation",
            RenderStage::Bundle => "bundle",
            RenderStage::Browser => "browser connection",
            RenderStage::Discovery => "composition discovery",
            RenderStage::Render => "render",
            RenderStage::Stream => "stream setup",
        })
    }
}

/// Render orchestration error
#[derive(Debug, Error)]
pub enum RenderError {
    /// Template unknown or not exposed by the bundle
    #[error("Invalid template: {requested:?}")]
    InvalidTemplate { requested: Option<String> },

    /// Infrastructure failure; aborts the request
    #[error("{stage} failed: {message}")]
    Failed { stage: RenderStage, message: String },
}

impl RenderError {
    pub fn failed(stage: RenderStage, err: impl fmt::Display) -> Self {
        RenderError::Failed {
            stage,
            message: err.to_string(),
        }
    }

    pub fn stage(&self) -> Option<RenderStage> {
        match self {
            RenderError::Failed { stage, .. } => Some(*stage),
            RenderError::InvalidTemplate { .. } => None,
        }
    }
}

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid template (400)
    #[error("Invalid template")]
    InvalidTemplate,

    /// Malformed request body (400)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Any render pipeline failure (500)
    #[error("Render failed: {0}")]
    RenderFailed(String),
}

impl From<RenderError> for ApiError {
    fn from(err: RenderError) -> Self {
        match err {
            RenderError::InvalidTemplate { .. } => ApiError::InvalidTemplate,
            failed @ RenderError::Failed { .. } => ApiError::RenderFailed(failed.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::InvalidTemplate => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "Invalid template" }),
            ),
            ApiError::InvalidRequest(details) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "Invalid request", "details": details }),
            ),
            ApiError::RenderFailed(details) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "Render failed", "details": details }),
            ),
        };

        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
