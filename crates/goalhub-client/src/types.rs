//! Request and response types for the goalhub client.

use goalhub_core::{Booking, Turf};
use serde::{Deserialize, Serialize};

/// Payment initiation request.
#[derive(Debug, Clone, Serialize)]
pub struct StkPushRequest {
    /// Subscriber number in any accepted local or international form.
    pub phone: String,
    /// Whole shillings.
    pub amount: i64,
}

/// Provider acknowledgment of a payment prompt.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PaymentInitiation {
    /// Provider merchant request id.
    #[serde(rename = "MerchantRequestID")]
    pub merchant_request_id: String,
    /// Correlation id to poll and book with.
    #[serde(rename = "CheckoutRequestID")]
    pub checkout_request_id: String,
    /// `"0"` when the push was accepted.
    #[serde(rename = "ResponseCode")]
    pub response_code: String,
    /// Human-readable status.
    #[serde(rename = "ResponseDescription", default)]
    pub response_description: String,
    /// Message intended for the customer.
    #[serde(rename = "CustomerMessage", default)]
    pub customer_message: String,
}

/// A booking with its turf embedded.
#[derive(Debug, Clone, Deserialize)]
pub struct BookingResponse {
    /// The booking.
    #[serde(flatten)]
    pub booking: Booking,
    /// Turf details, when the turf still exists.
    #[serde(default)]
    pub turf: Option<Turf>,
}

/// API error response.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    /// Error details.
    pub error: ApiErrorDetails,
}

/// API error details.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorDetails {
    /// Error code.
    pub code: String,
    /// Error message.
    pub message: String,
    /// Additional details.
    #[serde(default)]
    pub details: Option<serde_json::Value>,
}
