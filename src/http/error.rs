//! Error responses.
//!
//! Validation problems render as a `form` view with a prompt. Everything
//! else renders as an `error` view carrying the classified kind.

use axum::{
    extract::multipart::MultipartRejection,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::orchestrator::error::first_line;
use crate::orchestrator::{ActionError, AmountError, ErrorKind, OrchestratorError};

#[derive(Debug)]
pub enum ApiError {
    /// Missing or malformed input. No call was attempted.
    Prompt(String),
    NotFound(String),
    Unauthorized,
    Failed(ActionError),
}

impl ApiError {
    pub fn prompt(message: impl Into<String>) -> Self {
        ApiError::Prompt(message.into())
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::Prompt(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Failed(error) => match error.kind {
                ErrorKind::Validation | ErrorKind::DuplicateAddress => StatusCode::BAD_REQUEST,
                ErrorKind::NotRegistered => StatusCode::NOT_FOUND,
                ErrorKind::Unavailable | ErrorKind::ReceiptTimeout => {
                    StatusCode::SERVICE_UNAVAILABLE
                }
                _ => StatusCode::BAD_GATEWAY,
            },
        }
    }
}

impl From<OrchestratorError> for ApiError {
    fn from(err: OrchestratorError) -> Self {
        tracing::warn!(error = %err, "Request failed");
        ApiError::Failed(err.classify())
    }
}

impl From<AmountError> for ApiError {
    fn from(err: AmountError) -> Self {
        ApiError::Prompt(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!(error = %rejection, "Rejected JSON body");
        ApiError::Prompt(format!(
            "Invalid form: {}",
            first_line(&rejection.body_text())
        ))
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        tracing::debug!(error = %rejection, "Rejected multipart body");
        ApiError::Prompt(format!(
            "Expected a multipart form: {}",
            first_line(&rejection.body_text())
        ))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Prompt(first_line(&rejection.body_text()).to_string())
    }
}

/// An id that does not parse names nothing.
impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::NotFound(first_line(&rejection.body_text()).to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            ApiError::Prompt(prompt) => json!({ "view": "form", "prompt": prompt }),
            ApiError::NotFound(message) => json!({
                "view": "error",
                "error": { "kind": "not_found", "message": message },
            }),
            ApiError::Unauthorized => json!({
                "view": "error",
                "error": { "kind": "unauthorized", "message": "Invalid or missing admin key" },
            }),
            ApiError::Failed(error) => json!({ "view": "error", "error": error }),
        };
        (status, Json(body)).into_response()
    }
}
