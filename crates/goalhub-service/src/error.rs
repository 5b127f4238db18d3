//! API error types and responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use goalhub_core::ValidationError;
use goalhub_store::StoreError;

use crate::linkage::LinkageError;
use crate::mpesa::GatewayError;
use crate::reconcile::EngineError;

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Unauthorized - missing or invalid credentials.
    #[error("unauthorized")]
    Unauthorized,

    /// Forbidden - valid credentials but insufficient permissions.
    #[error("forbidden")]
    Forbidden,

    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Bad request - invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The referenced payment exists but has not completed.
    #[error("precondition failed: {message}")]
    PreconditionFailed {
        /// Human-readable reason.
        message: String,
        /// Current payment status.
        payment_status: String,
    },

    /// Conflict - resource already exists or already linked.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Rate limit exceeded.
    #[error("too many requests: {0}")]
    TooManyRequests(String),

    /// The payment provider did not answer in time.
    #[error("gateway timeout: {0}")]
    GatewayTimeout(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),

    /// External service error.
    #[error("external service error: {0}")]
    ExternalService(String),
}

/// JSON error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match &self {
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                self.to_string(),
                None,
            ),
            Self::Forbidden => (StatusCode::FORBIDDEN, "forbidden", self.to_string(), None),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone(), None),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone(), None),
            Self::PreconditionFailed {
                message,
                payment_status,
            } => (
                StatusCode::BAD_REQUEST,
                "precondition_failed",
                message.clone(),
                Some(serde_json::json!({ "payment_status": payment_status })),
            ),
            Self::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg.clone(), None),
            Self::TooManyRequests(msg) => (
                StatusCode::TOO_MANY_REQUESTS,
                "rate_limited",
                msg.clone(),
                None,
            ),
            Self::GatewayTimeout(msg) => (
                StatusCode::GATEWAY_TIMEOUT,
                "gateway_timeout",
                msg.clone(),
                None,
            ),
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
            Self::ExternalService(msg) => (
                StatusCode::BAD_GATEWAY,
                "external_service_error",
                msg.clone(),
                None,
            ),
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => {
                Self::NotFound(format!("{entity} not found: {id}"))
            }
            StoreError::Conflict(msg) => Self::Conflict(msg),
            StoreError::Database(msg) | StoreError::Serialization(msg) => Self::Internal(msg),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Validation(e) => e.into(),
            GatewayError::Timeout(_) => Self::GatewayTimeout(err.to_string()),
            GatewayError::AuthFailure(_)
            | GatewayError::Failure(_)
            | GatewayError::Rejected { .. } => Self::ExternalService(err.to_string()),
        }
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Gateway(e) => e.into(),
            EngineError::NotFound(id) => Self::NotFound(format!("Payment not found: {id}")),
            EngineError::Store(e) => e.into(),
        }
    }
}

impl From<LinkageError> for ApiError {
    fn from(err: LinkageError) -> Self {
        match err {
            LinkageError::PaymentNotFound(_) | LinkageError::TurfNotFound(_) => {
                Self::NotFound(err.to_string())
            }
            LinkageError::PaymentIncomplete { status, .. } => Self::PreconditionFailed {
                message: err.to_string(),
                payment_status: status.as_str().to_string(),
            },
            LinkageError::PaymentAlreadyLinked(_) => Self::Conflict(err.to_string()),
            LinkageError::Validation(e) => e.into(),
            LinkageError::Store(e) => e.into(),
        }
    }
}
