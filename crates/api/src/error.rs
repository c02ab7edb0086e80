//! API error responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use fleet_engine::EngineError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Errors returned by handlers, rendered as `{error, kind}` JSON
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("{0}")]
    Unavailable(String),
}

impl ApiError {
    fn status_and_kind(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            ApiError::Unavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "unavailable"),
            ApiError::Engine(err) => match err {
                EngineError::InvalidReading(_) => (StatusCode::BAD_REQUEST, "invalid_reading"),
                EngineError::OutOfOrder { .. } => (StatusCode::CONFLICT, "out_of_order"),
                EngineError::BatteryNotFound(_) | EngineError::AlertNotFound(_) => {
                    (StatusCode::NOT_FOUND, "not_found")
                }
                EngineError::EvaluationTimeout { .. } => {
                    (StatusCode::SERVICE_UNAVAILABLE, "evaluation_timeout")
                }
                EngineError::Configuration(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "configuration")
                }
                EngineError::Scoring(_) => (StatusCode::INTERNAL_SERVER_ERROR, "scoring"),
                EngineError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "storage"),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind) = self.status_and_kind();
        if status.is_server_error() {
            error!(kind, error = %self, "Request failed");
        }
        (status, Json(json!({ "error": self.to_string(), "kind": kind }))).into_response()
    }
}
