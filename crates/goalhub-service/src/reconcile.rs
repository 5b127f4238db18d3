//! Payment reconciliation.
//!
//! The engine owns the payment lifecycle: a record is created `pending` when
//! the provider accepts a push, and moved to `completed` or `failed` exactly
//! once when the matching callback arrives. Callback outcomes are reported
//! through logs and [`CallbackOutcome`] only; the provider always receives the
//! same acknowledgment.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;

use goalhub_core::{CheckoutRequestId, Payment, PaymentStatus, PaymentStatusView, StkCallback};
use goalhub_store::{SettleResult, Store, StoreError};

use crate::mpesa::{GatewayError, MpesaClient, PushResult, StkPushResponse};

/// Errors from the initiation and status paths.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The gateway call failed or the push was not accepted.
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// No payment for the checkout request id.
    #[error("payment not found: {0}")]
    NotFound(CheckoutRequestId),

    /// Storage failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// What a callback did. Only used for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// Not JSON, or no `Body.stkCallback` envelope.
    Malformed,
    /// No payment with that checkout request id.
    UnknownPayment,
    /// The payment was already terminal; nothing changed.
    Duplicate {
        /// The status the payment already had.
        status: PaymentStatus,
    },
    /// The payment moved out of pending.
    Applied {
        /// The new status.
        status: PaymentStatus,
    },
    /// The store failed while settling.
    StoreFailure,
}

/// Owns the pending to terminal transition of payments.
#[derive(Clone)]
pub struct ReconciliationEngine {
    store: Arc<dyn Store>,
    gateway: Arc<MpesaClient>,
}

impl ReconciliationEngine {
    /// Create an engine over a store and a gateway client.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, gateway: Arc<MpesaClient>) -> Self {
        Self { store, gateway }
    }

    /// Submit a push and track it if the provider accepts it.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Gateway` if the push fails or is not accepted,
    /// in which case no payment is recorded.
    pub async fn initiate(&self, phone: &str, amount: i64) -> Result<StkPushResponse, EngineError> {
        let push = self
            .gateway
            .initiate_push(phone, amount)
            .await
            .inspect_err(|e| {
                tracing::warn!(event = "stk_push_failed", error = %e, amount, "STK push failed");
            })?;

        if !push.response.is_accepted() {
            tracing::warn!(
                event = "stk_push_failed",
                response_code = %push.response.response_code,
                description = %push.response.response_description,
                "STK push not accepted"
            );
            return Err(GatewayError::Rejected {
                code: push.response.response_code,
                description: push.response.response_description,
            }
            .into());
        }

        tracing::info!(
            event = "stk_push_initiated",
            checkout_request_id = %push.response.checkout_request_id,
            simulated = push.simulated,
            amount = push.amount,
            "STK push accepted"
        );

        self.record_pending(&push).await?;
        Ok(push.response)
    }

    /// Create the pending record for an accepted push.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Gateway` if the acknowledgment has no checkout
    /// request id, or `EngineError::Store` if the insert fails.
    pub async fn record_pending(&self, push: &PushResult) -> Result<Payment, EngineError> {
        let checkout_request_id = CheckoutRequestId::new(
            push.response.checkout_request_id.clone(),
        )
        .map_err(|_| GatewayError::Failure("acknowledgment carried no CheckoutRequestID".into()))?;

        let merchant_request_id = Some(push.response.merchant_request_id.clone())
            .filter(|id| !id.is_empty());

        let payment = Payment::pending(
            checkout_request_id,
            merchant_request_id,
            push.phone.clone(),
            push.amount,
        );
        self.store.insert_payment(&payment).await?;

        tracing::info!(
            event = "payment_tracked",
            checkout_request_id = %payment.checkout_request_id,
            payment_id = %payment.id,
            "Pending payment recorded"
        );
        Ok(payment)
    }

    /// Handle a raw callback body.
    pub async fn handle_callback_body(&self, body: &[u8]) -> CallbackOutcome {
        match serde_json::from_slice::<Value>(body) {
            Ok(payload) => self.handle_callback(&payload).await,
            Err(e) => {
                tracing::warn!(event = "callback_malformed", error = %e, "Callback is not JSON");
                CallbackOutcome::Malformed
            }
        }
    }

    /// Apply a provider callback.
    ///
    /// Never fails: malformed, unknown and duplicate callbacks are logged and
    /// otherwise ignored.
    pub async fn handle_callback(&self, payload: &Value) -> CallbackOutcome {
        let callback = match StkCallback::parse(payload) {
            Ok(callback) => callback,
            Err(e) => {
                tracing::warn!(event = "callback_malformed", error = %e, "Malformed callback");
                return CallbackOutcome::Malformed;
            }
        };

        let checkout_request_id = &callback.checkout_request_id;
        tracing::info!(
            event = "callback_received",
            checkout_request_id = %checkout_request_id,
            result_code = %callback.result_code,
            "Callback received"
        );

        let settlement = callback.settlement(payload.clone());
        let result = self
            .store
            .settle_payment(checkout_request_id, &settlement, Utc::now())
            .await;

        match result {
            Ok(SettleResult::Settled(payment)) => {
                match payment.status {
                    PaymentStatus::Completed => tracing::info!(
                        event = "payment_completed",
                        checkout_request_id = %checkout_request_id,
                        reference = ?payment.reference,
                        amount = payment.amount,
                        "Payment completed"
                    ),
                    _ => tracing::info!(
                        event = "payment_failed",
                        checkout_request_id = %checkout_request_id,
                        result_code = %callback.result_code,
                        reason = ?payment.failure_reason,
                        "Payment failed"
                    ),
                }
                CallbackOutcome::Applied {
                    status: payment.status,
                }
            }
            Ok(SettleResult::AlreadySettled(payment)) => {
                tracing::info!(
                    event = "callback_duplicate",
                    checkout_request_id = %checkout_request_id,
                    status = %payment.status.as_str(),
                    "Duplicate callback ignored"
                );
                CallbackOutcome::Duplicate {
                    status: payment.status,
                }
            }
            Ok(SettleResult::NotFound) => {
                tracing::warn!(
                    event = "callback_unknown",
                    checkout_request_id = %checkout_request_id,
                    "Callback for unknown payment"
                );
                CallbackOutcome::UnknownPayment
            }
            Err(e) => {
                tracing::error!(
                    checkout_request_id = %checkout_request_id,
                    error = %e,
                    "Failed to settle payment"
                );
                CallbackOutcome::StoreFailure
            }
        }
    }

    /// Current status of a payment, for polling clients.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::NotFound` if no payment has that id.
    pub async fn query_status(
        &self,
        checkout_request_id: &CheckoutRequestId,
    ) -> Result<PaymentStatusView, EngineError> {
        self.store
            .get_payment(checkout_request_id)
            .await?
            .map(|payment| payment.status_view())
            .ok_or_else(|| EngineError::NotFound(checkout_request_id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Environment, MpesaConfig};
    use goalhub_store::MemoryStore;
    use serde_json::json;

    fn engine() -> (ReconciliationEngine, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let gateway = Arc::new(MpesaClient::new(
            MpesaConfig::default(),
            Environment::Development,
            "http://localhost:8000/api/callback".into(),
        )
        .unwrap());
        (ReconciliationEngine::new(store.clone(), gateway), store)
    }

    fn callback(checkout: &str, code: i64, receipt: Option<&str>) -> Value {
        let mut stk = json!({
            "MerchantRequestID": "29115-34620561-1",
            "CheckoutRequestID": checkout,
            "ResultCode": code,
            "ResultDesc": if code == 0 {
                "The service request is processed successfully."
            } else {
                "Request cancelled by user"
            },
        });
        if let Some(receipt) = receipt {
            stk["CallbackMetadata"] = json!({
                "Item": [
                    {"Name": "Amount", "Value": 1500},
                    {"Name": "MpesaReceiptNumber", "Value": receipt},
                    {"Name": "PhoneNumber", "Value": 254_712_345_678_i64}
                ]
            });
        }
        json!({"Body": {"stkCallback": stk}})
    }

    #[tokio::test]
    async fn simulated_push_is_tracked_as_pending() {
        let (engine, _) = engine();

        let response = engine.initiate("0712345678", 1500).await.unwrap();
        let checkout = CheckoutRequestId::new(response.checkout_request_id).unwrap();

        let status = engine.query_status(&checkout).await.unwrap();
        assert_eq!(status.status, PaymentStatus::Pending);
        assert_eq!(status.phone, "254712345678");
        assert_eq!(status.amount, 1500);
    }

    #[tokio::test]
    async fn invalid_amount_records_nothing() {
        let (engine, _) = engine();
        assert!(matches!(
            engine.initiate("0712345678", 0).await,
            Err(EngineError::Gateway(GatewayError::Validation(_)))
        ));
    }

    #[tokio::test]
    async fn success_callback_completes_with_receipt() {
        let (engine, store) = engine();
        let response = engine.initiate("0712345678", 1500).await.unwrap();
        let id = response.checkout_request_id;

        let outcome = engine
            .handle_callback(&callback(&id, 0, Some("NLJ7RT61SV")))
            .await;
        assert_eq!(
            outcome,
            CallbackOutcome::Applied {
                status: PaymentStatus::Completed
            }
        );

        let payment = store
            .get_payment(&CheckoutRequestId::new(id).unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(payment.reference.as_deref(), Some("NLJ7RT61SV"));
        assert!(payment.completed_at.is_some());
        assert!(payment.raw_callback.is_some());
    }

    #[tokio::test]
    async fn duplicate_callback_does_not_mutate() {
        let (engine, store) = engine();
        let id = engine
            .initiate("0712345678", 1500)
            .await
            .unwrap()
            .checkout_request_id;
        let checkout = CheckoutRequestId::new(id.clone()).unwrap();

        engine
            .handle_callback(&callback(&id, 0, Some("NLJ7RT61SV")))
            .await;
        let first = store.get_payment(&checkout).await.unwrap().unwrap();

        let outcome = engine.handle_callback(&callback(&id, 1032, None)).await;
        assert_eq!(
            outcome,
            CallbackOutcome::Duplicate {
                status: PaymentStatus::Completed
            }
        );
        assert_eq!(store.get_payment(&checkout).await.unwrap().unwrap(), first);
    }

    #[tokio::test]
    async fn failure_callback_records_reason() {
        let (engine, store) = engine();
        let id = engine
            .initiate("0712345678", 1500)
            .await
            .unwrap()
            .checkout_request_id;

        let outcome = engine.handle_callback(&callback(&id, 1032, None)).await;
        assert_eq!(
            outcome,
            CallbackOutcome::Applied {
                status: PaymentStatus::Failed
            }
        );

        let payment = store
            .get_payment(&CheckoutRequestId::new(id).unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(payment.failure_reason.as_deref(), Some("Request cancelled by user"));
        assert!(payment.reference.is_none());
    }

    #[tokio::test]
    async fn unknown_and_malformed_callbacks_are_ignored() {
        let (engine, _) = engine();

        assert_eq!(
            engine
                .handle_callback(&callback("ws_CO_UNKNOWN", 0, Some("X")))
                .await,
            CallbackOutcome::UnknownPayment
        );
        assert_eq!(
            engine.handle_callback(&json!({"foo": "bar"})).await,
            CallbackOutcome::Malformed
        );
        assert_eq!(
            engine.handle_callback_body(b"not json").await,
            CallbackOutcome::Malformed
        );
    }

    #[tokio::test]
    async fn concurrent_callbacks_apply_once() {
        let (engine, _) = engine();
        let id = engine
            .initiate("0712345678", 1500)
            .await
            .unwrap()
            .checkout_request_id;
        let payload = callback(&id, 0, Some("NLJ7RT61SV"));

        let outcomes = futures::future::join_all(
            (0..8).map(|_| {
                let engine = engine.clone();
                let payload = payload.clone();
                tokio::spawn(async move { engine.handle_callback(&payload).await })
            }),
        )
        .await;

        let applied = outcomes
            .into_iter()
            .map(Result::unwrap)
            .filter(|o| matches!(o, CallbackOutcome::Applied { .. }))
            .count();
        assert_eq!(applied, 1);
    }

    #[tokio::test]
    async fn unknown_status_query_is_not_found() {
        let (engine, _) = engine();
        let id = CheckoutRequestId::new("ws_CO_MISSING").unwrap();
        assert!(matches!(
            engine.query_status(&id).await,
            Err(EngineError::NotFound(_))
        ));
    }
}
