//! Client error types.

use goalhub_core::PaymentStatus;

/// Errors that can occur when using the goalhub client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server returned an error response.
    #[error("API error: {code} - {message}")]
    Api {
        /// Error code.
        code: String,
        /// Error message.
        message: String,
        /// HTTP status code.
        status: u16,
    },

    /// Payment, booking or turf not found.
    #[error("not found: {message}")]
    NotFound {
        /// Server message naming what was missing.
        message: String,
    },

    /// The payment backing a booking has not completed.
    #[error("payment not completed (status: {status})")]
    PaymentIncomplete {
        /// Status the payment was in.
        status: PaymentStatus,
    },

    /// Too many payment initiations from this client.
    #[error("rate limited: {message}")]
    RateLimited {
        /// Server message.
        message: String,
    },

    /// The payment did not reach a terminal state before the deadline.
    #[error("payment {checkout_request_id} still {last_status} at deadline")]
    Timeout {
        /// Payment being waited on.
        checkout_request_id: String,
        /// Last status observed.
        last_status: PaymentStatus,
    },

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Configuration(String),
}
