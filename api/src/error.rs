//! Error types for the REST API

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use modelhub_core::{ErrorClass, ModelHubError};
use serde_json::json;
use thiserror::Error;
use tokio::task::JoinError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ModelHubError> for ApiError {
    fn from(err: ModelHubError) -> Self {
        match err.class() {
            ErrorClass::Client => ApiError::BadRequest(err.to_string()),
            ErrorClass::NotFound => ApiError::NotFound(err.to_string()),
            ErrorClass::Server => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<JoinError> for ApiError {
    fn from(err: JoinError) -> Self {
        ApiError::Internal(format!("Worker task failed: {err}"))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::BadRequest(msg) => {
                tracing::warn!(detail = %msg, "Rejected request");
                (StatusCode::BAD_REQUEST, msg.clone())
            }
            ApiError::NotFound(msg) => {
                tracing::warn!(detail = %msg, "Resource not found");
                (StatusCode::NOT_FOUND, msg.clone())
            }
            ApiError::Internal(msg) => {
                tracing::error!(detail = %msg, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, msg.clone())
            }
        };

        let body = Json(json!({
            "error": true,
            "message": message,
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_errors_map_to_status() {
        let cases = [
            (
                ModelHubError::UnsupportedModelType("svm".into()),
                StatusCode::BAD_REQUEST,
            ),
            (
                ModelHubError::InvalidHyperparameters("C".into()),
                StatusCode::BAD_REQUEST,
            ),
            (ModelHubError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (
                ModelHubError::PredictionFailure("shape".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                ModelHubError::ArtifactLoadFailure {
                    uri: "runs:/x/model".into(),
                    reason: "missing".into(),
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            let response = ApiError::from(err).into_response();
            assert_eq!(response.status(), status);
        }
    }
}
