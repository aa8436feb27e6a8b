//! Error taxonomy shared by the pipeline and its HTTP mapping.
//!
//! Each variant carries a stable `code()` that clients can switch on; the
//! message is for humans.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Failure reported by the persistence collaborator.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store request failed: {0}")]
    Transport(String),
    #[error("store rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("store returned an unexpected payload: {0}")]
    Decode(String),
}

#[derive(Debug, Error)]
pub enum CoreError {
    /// Missing or malformed request fields. Raised before any external call.
    #[error("{0}")]
    Validation(String),

    /// Execution collaborator unreachable or returned a malformed envelope.
    #[error("execution service unavailable: {0}")]
    ExecutionUnavailable(String),

    /// Oracle text did not parse as the expected JSON after fence stripping.
    #[error("oracle reply is not valid JSON: {reason}")]
    MalformedOracleResponse { reason: String, raw: String },

    /// Oracle unreachable, not configured, or answered with an HTTP error.
    #[error("oracle unavailable: {0}")]
    OracleUnavailable(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("{0}")]
    NotFound(String),

    #[error("hint is locked: {remaining} more attempt(s) required")]
    HintLocked { remaining: u32 },
}

impl CoreError {
    pub fn validation(message: impl Into<String>) -> Self {
        CoreError::Validation(message.into())
    }

    pub fn malformed(reason: impl ToString, raw: impl Into<String>) -> Self {
        CoreError::MalformedOracleResponse { reason: reason.to_string(), raw: raw.into() }
    }

    pub fn code(&self) -> &'static str {
        match self {
            CoreError::Validation(_) => "validation_error",
            CoreError::ExecutionUnavailable(_) => "execution_unavailable",
            CoreError::MalformedOracleResponse { .. } => "malformed_oracle_response",
            CoreError::OracleUnavailable(_) => "oracle_unavailable",
            CoreError::Store(_) => "store_error",
            CoreError::NotFound(_) => "not_found",
            CoreError::HintLocked { .. } => "hint_locked",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            CoreError::Validation(_) => StatusCode::BAD_REQUEST,
            CoreError::HintLocked { .. } => StatusCode::FORBIDDEN,
            CoreError::NotFound(_) => StatusCode::NOT_FOUND,
            CoreError::ExecutionUnavailable(_)
            | CoreError::MalformedOracleResponse { .. }
            | CoreError::OracleUnavailable(_)
            | CoreError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for CoreError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut body = json!({ "error": self.to_string(), "code": self.code() });
        if let CoreError::MalformedOracleResponse { raw, .. } = &self {
            body["raw"] = json!(raw);
        }
        (status, Json(body)).into_response()
    }
}
