use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("LLM error: {0}")]
    LlmError(String),
}

/// Coarse classification of a language-model failure message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmFailureKind {
    RateLimited,
    Authentication,
    ModelUnavailable,
    Other,
}

impl LlmFailureKind {
    /// Classify from the provider's error text
    pub fn classify(message: &str) -> Self {
        let lower = message.to_lowercase();
        // "rate" alone would match "generateContent"
        if ["quota", "rate limit", "exhausted", "too many requests"]
            .iter()
            .any(|needle| lower.contains(needle))
        {
            Self::RateLimited
        } else if lower.contains("api key") || lower.contains("authentication") {
            Self::Authentication
        } else if lower.contains("not found") || lower.contains("model") {
            Self::ModelUnavailable
        } else {
            Self::Other
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RateLimited => "Request limit exceeded",
            Self::Authentication => "API authentication error",
            Self::ModelUnavailable => "Model not available",
            Self::Other => "Internal error",
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            ApiError::NotFound(msg) => {
                tracing::warn!("Not found: {}", msg);
                (StatusCode::NOT_FOUND, "NotFound", msg)
            }
            ApiError::BadRequest(msg) => {
                tracing::warn!("Bad request: {}", msg);
                (StatusCode::BAD_REQUEST, "BadRequest", msg)
            }
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "InternalError", msg)
            }
            ApiError::LlmError(msg) => {
                tracing::error!("LLM error: {}", msg);
                let status = match LlmFailureKind::classify(&msg) {
                    LlmFailureKind::RateLimited => StatusCode::TOO_MANY_REQUESTS,
                    LlmFailureKind::Authentication => StatusCode::UNAUTHORIZED,
                    LlmFailureKind::ModelUnavailable => StatusCode::BAD_REQUEST,
                    LlmFailureKind::Other => StatusCode::SERVICE_UNAVAILABLE,
                };
                (status, "LlmError", msg)
            }
        };

        let body = Json(ErrorResponse {
            error: error_type.to_string(),
            message,
        });

        (status, body).into_response()
    }
}
