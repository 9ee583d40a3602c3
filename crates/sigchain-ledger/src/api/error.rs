//! API error types and responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use sigchain_core::SigChainError;

/// API error type
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    #[error(transparent)]
    Ledger(#[from] SigChainError),
}

/// API error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// HTTP status for this error
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::UnknownFunction(_) => StatusCode::BAD_REQUEST,
            ApiError::Ledger(err) => match err {
                SigChainError::NotFound(_) => StatusCode::NOT_FOUND,
                SigChainError::AlreadyExists(_)
                | SigChainError::AlreadyFinalized(_)
                | SigChainError::AlreadyConsumed(_) => StatusCode::CONFLICT,
                SigChainError::VerificationFailure(_) | SigChainError::InvalidKeyFormat(_) => {
                    StatusCode::UNAUTHORIZED
                }
                SigChainError::ConsumptionRefused(_) => StatusCode::FORBIDDEN,
                SigChainError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
                SigChainError::ArityMismatch { .. }
                | SigChainError::TimestampSkew { .. }
                | SigChainError::InvalidPayload(_)
                | SigChainError::InvalidArgument(_)
                | SigChainError::Serialization(_) => StatusCode::BAD_REQUEST,
            },
        }
    }

    /// Stable error code string
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::UnknownFunction(_) => "UNKNOWN_FUNCTION",
            ApiError::Ledger(err) => err.code(),
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            ApiError::Ledger(SigChainError::ArityMismatch {
                field,
                expected,
                actual,
            }) => Some(serde_json::json!({
                "field": field,
                "expected": expected,
                "actual": actual,
            })),
            ApiError::Ledger(SigChainError::TimestampSkew {
                supplied,
                transaction,
                max_skew_secs,
            }) => Some(serde_json::json!({
                "supplied": supplied,
                "transaction": transaction,
                "max_skew_secs": max_skew_secs,
            })),
            _ => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.to_string(),
            code: self.code().to_string(),
            details: self.details(),
        };

        (self.status(), Json(body)).into_response()
    }
}
