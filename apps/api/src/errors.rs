use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::proposal::error::GenerationError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            // Malformed bodies share the code of blank input.
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "INVALID_INPUT", msg.clone()),
            AppError::Generation(e) => {
                let status = generation_status(e);
                if status.is_server_error() {
                    tracing::error!("Generation error: {e}");
                }
                (status, e.code(), e.to_string())
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

fn generation_status(err: &GenerationError) -> StatusCode {
    match err {
        GenerationError::InvalidInput => StatusCode::BAD_REQUEST,
        GenerationError::MissingCredential => StatusCode::SERVICE_UNAVAILABLE,
        GenerationError::Busy | GenerationError::Cancelled => StatusCode::CONFLICT,
        GenerationError::Transport { .. }
        | GenerationError::EmptyResponse
        | GenerationError::EmbeddedService(_)
        | GenerationError::SchemaValidation(_) => StatusCode::BAD_GATEWAY,
    }
}
