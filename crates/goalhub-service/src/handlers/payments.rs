//! Payment initiation, callback and status handlers.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use goalhub_core::{CheckoutRequestId, PaymentStatusView};

use crate::error::ApiError;
use crate::mpesa::StkPushResponse;
use crate::state::AppState;

/// Largest callback body read. Real callbacks are well under a kilobyte.
pub const CALLBACK_MAX_BODY_BYTES: usize = 64 * 1024;

/// Payment initiation request.
#[derive(Debug, Deserialize)]
pub struct StkPushBody {
    /// Subscriber number, e.g. `0712345678`.
    pub phone: String,
    /// Whole shillings.
    pub amount: i64,
}

/// Acknowledgment returned to the provider for every callback.
#[derive(Debug, Serialize)]
pub struct CallbackAck {
    /// Always zero.
    #[serde(rename = "ResultCode")]
    pub result_code: i32,
    /// Always "Callback Received".
    #[serde(rename = "ResultDesc")]
    pub result_desc: &'static str,
}

impl CallbackAck {
    const RECEIVED: Self = Self {
        result_code: 0,
        result_desc: "Callback Received",
    };
}

/// Prompt a subscriber to pay.
pub async fn initiate_stk_push(
    State(state): State<Arc<AppState>>,
    Json(body): Json<StkPushBody>,
) -> Result<Json<StkPushResponse>, ApiError> {
    let response = state.engine.initiate(&body.phone, body.amount).await?;
    Ok(Json(response))
}

/// Receive the provider's result callback.
///
/// The body is read raw, and bounded here rather than by the router, so that
/// malformed or oversized payloads still get the standard acknowledgment.
pub async fn mpesa_callback(State(state): State<Arc<AppState>>, body: Body) -> Json<CallbackAck> {
    match axum::body::to_bytes(body, CALLBACK_MAX_BODY_BYTES).await {
        Ok(bytes) => {
            let outcome = state.engine.handle_callback_body(&bytes).await;
            tracing::debug!(?outcome, "Callback handled");
        }
        Err(e) => {
            tracing::warn!(
                event = "callback_malformed",
                error = %e,
                limit = CALLBACK_MAX_BODY_BYTES,
                "Callback body unreadable"
            );
        }
    }
    Json(CallbackAck::RECEIVED)
}

/// Poll a payment's status.
pub async fn payment_status(
    State(state): State<Arc<AppState>>,
    Path(checkout_request_id): Path<String>,
) -> Result<Json<PaymentStatusView>, ApiError> {
    let checkout_request_id = CheckoutRequestId::new(checkout_request_id)
        .map_err(|_| ApiError::NotFound("Payment not found".into()))?;

    let view = state.engine.query_status(&checkout_request_id).await?;
    Ok(Json(view))
}
