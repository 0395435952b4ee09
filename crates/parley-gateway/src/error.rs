//! Translation of pipeline errors into HTTP responses.
//!
//! Two policies are in use. File and text endpoints answer with a bare
//! `{"detail": ...}` body; the conversational endpoints answer with an
//! [`ErrorResponse`] that names the failing stage and carries a fallback
//! phrase for the client to speak.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, warn};

use parley_core::error::{ErrorKind, ParleyError, Stage};

/// Spoken by clients when the pipeline could not produce audio.
pub const FALLBACK_TEXT: &str = "I'm having trouble connecting right now. Please try again.";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub success: bool,
    pub error_stage: Stage,
    pub message: String,
    pub fallback_text: String,
}

impl ErrorResponse {
    pub fn new(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            success: false,
            error_stage: stage,
            message: message.into(),
            fallback_text: FALLBACK_TEXT.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// `{"detail": "<prefix>: <message>"}`
    Detail { prefix: &'static str },
    /// [`ErrorResponse`] with stage tag.
    Structured,
}

/// A [`ParleyError`] paired with the policy of the endpoint it escaped from.
#[derive(Debug)]
pub struct ApiError {
    pub policy: ErrorPolicy,
    pub error: ParleyError,
}

impl ApiError {
    pub fn detail(prefix: &'static str, error: ParleyError) -> Self {
        Self {
            policy: ErrorPolicy::Detail { prefix },
            error,
        }
    }

    pub fn structured(error: ParleyError) -> Self {
        Self {
            policy: ErrorPolicy::Structured,
            error,
        }
    }

    pub fn status(&self) -> StatusCode {
        match (self.error.kind(), self.policy) {
            (ErrorKind::InvalidInput, _) => StatusCode::BAD_REQUEST,
            (ErrorKind::UpstreamFailure, ErrorPolicy::Structured) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.error.to_string();

        if self.error.kind() == ErrorKind::InvalidInput {
            warn!(%status, "Rejected request: {message}");
            return (status, Json(json!({ "detail": message }))).into_response();
        }

        match self.policy {
            ErrorPolicy::Detail { prefix } => {
                error!(%status, "{prefix}: {message}");
                (status, Json(json!({ "detail": format!("{prefix}: {message}") }))).into_response()
            }
            ErrorPolicy::Structured => {
                let stage = match self.error.kind() {
                    ErrorKind::UpstreamFailure => self.error.stage(),
                    _ => Stage::Unknown,
                };
                error!(%status, ?stage, "Pipeline failed: {message}");
                (status, Json(ErrorResponse::new(stage, message))).into_response()
            }
        }
    }
}
