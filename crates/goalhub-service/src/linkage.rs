//! Booking linkage.
//!
//! A booking that names a checkout request id is only created once that
//! payment has completed, and is then confirmed with the payment linked.
//! Bookings without a payment start out pending.

use std::sync::Arc;

use goalhub_core::{
    Booking, BookingStatus, CheckoutRequestId, NewBooking, PaymentStatus, TurfId, UserId,
    ValidationError,
};
use goalhub_store::{Store, StoreError};

use crate::config::PaymentReusePolicy;

/// Reasons a booking cannot be created.
#[derive(Debug, thiserror::Error)]
pub enum LinkageError {
    /// The referenced payment does not exist.
    #[error("payment not found, complete payment first: {0}")]
    PaymentNotFound(CheckoutRequestId),

    /// The referenced payment has not completed.
    #[error("payment not completed, current status: {}", status.as_str())]
    PaymentIncomplete {
        /// The referenced payment.
        checkout_request_id: CheckoutRequestId,
        /// Its current status.
        status: PaymentStatus,
    },

    /// The payment already backs another booking.
    #[error("payment already used for another booking: {0}")]
    PaymentAlreadyLinked(CheckoutRequestId),

    /// The turf does not exist.
    #[error("turf not found: {0}")]
    TurfNotFound(TurfId),

    /// Booking details rejected.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Storage failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Gates booking confirmation on payment completion.
#[derive(Clone)]
pub struct BookingLinker {
    store: Arc<dyn Store>,
    reuse: PaymentReusePolicy,
}

impl BookingLinker {
    /// Create a linker with the given reuse policy.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, reuse: PaymentReusePolicy) -> Self {
        Self { store, reuse }
    }

    /// Create a booking, optionally backed by a payment.
    ///
    /// # Errors
    ///
    /// - `LinkageError::TurfNotFound` if the turf does not exist
    /// - `LinkageError::PaymentNotFound` if the checkout request id is unknown
    /// - `LinkageError::PaymentIncomplete` if the payment is pending or failed
    /// - `LinkageError::PaymentAlreadyLinked` under `PaymentReusePolicy::Reject`
    ///   when another booking already references the payment
    pub async fn create_booking(
        &self,
        details: NewBooking,
        user_id: Option<UserId>,
        checkout_request_id: Option<&CheckoutRequestId>,
    ) -> Result<Booking, LinkageError> {
        details.validate()?;

        if self.store.get_turf(&details.turf_id).await?.is_none() {
            return Err(LinkageError::TurfNotFound(details.turf_id));
        }

        let Some(checkout_request_id) = checkout_request_id else {
            let booking = Booking::new(details, user_id, None, BookingStatus::Pending);
            self.store.insert_booking(&booking, false).await?;
            tracing::info!(booking_id = %booking.id, "Unpaid booking created");
            return Ok(booking);
        };

        let payment = self
            .store
            .get_payment(checkout_request_id)
            .await?
            .ok_or_else(|| LinkageError::PaymentNotFound(checkout_request_id.clone()))?;

        if payment.status != PaymentStatus::Completed {
            return Err(LinkageError::PaymentIncomplete {
                checkout_request_id: checkout_request_id.clone(),
                status: payment.status,
            });
        }

        let booking = Booking::new(
            details,
            user_id,
            Some(payment.id),
            BookingStatus::Confirmed,
        );
        let exclusive = self.reuse == PaymentReusePolicy::Reject;

        match self.store.insert_booking(&booking, exclusive).await {
            Ok(()) => {}
            Err(StoreError::Conflict(_)) if exclusive => {
                tracing::warn!(
                    checkout_request_id = %checkout_request_id,
                    "Payment reuse rejected"
                );
                return Err(LinkageError::PaymentAlreadyLinked(
                    checkout_request_id.clone(),
                ));
            }
            Err(e) => return Err(e.into()),
        }

        tracing::info!(
            booking_id = %booking.id,
            payment_id = %payment.id,
            checkout_request_id = %checkout_request_id,
            "Paid booking confirmed"
        );
        Ok(booking)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use goalhub_core::{NewTurf, Payment, Settlement};
    use goalhub_store::MemoryStore;
    use serde_json::json;

    async fn seeded(reuse: PaymentReusePolicy) -> (BookingLinker, Arc<MemoryStore>, TurfId) {
        let store = Arc::new(MemoryStore::new());
        let turf = NewTurf {
            name: "Kasarani Arena".into(),
            location: "Nairobi".into(),
            kind: "5-a-side".into(),
            price: 2500,
            image: None,
            description: None,
        }
        .into_turf()
        .unwrap();
        store.insert_turf(&turf).await.unwrap();
        (BookingLinker::new(store.clone(), reuse), store, turf.id)
    }

    fn details(turf_id: TurfId) -> NewBooking {
        NewBooking {
            turf_id,
            date: NaiveDate::from_ymd_opt(2026, 3, 14).unwrap(),
            time_slot: "18:00".into(),
            duration: 1,
            amount: 2500,
            extras: None,
            customer_name: Some("Wanjiru".into()),
            customer_phone: Some("0712345678".into()),
            customer_email: None,
        }
    }

    async fn payment(store: &MemoryStore, id: &str, settlement: Option<Settlement>) -> CheckoutRequestId {
        let checkout = CheckoutRequestId::new(id).unwrap();
        store
            .insert_payment(&Payment::pending(checkout.clone(), None, "254712345678", 2500))
            .await
            .unwrap();
        if let Some(settlement) = settlement {
            store
                .settle_payment(&checkout, &settlement, Utc::now())
                .await
                .unwrap();
        }
        checkout
    }

    fn completed() -> Settlement {
        Settlement::Completed {
            reference: Some("NLJ7RT61SV".into()),
            raw_callback: json!({}),
        }
    }

    #[tokio::test]
    async fn booking_without_payment_is_pending() {
        let (linker, _, turf) = seeded(PaymentReusePolicy::Reject).await;
        let booking = linker.create_booking(details(turf), None, None).await.unwrap();
        assert_eq!(booking.status, BookingStatus::Pending);
        assert!(booking.payment_id.is_none());
    }

    #[tokio::test]
    async fn completed_payment_confirms_booking() {
        let (linker, store, turf) = seeded(PaymentReusePolicy::Reject).await;
        let checkout = payment(&store, "ws_CO_1", Some(completed())).await;

        let booking = linker
            .create_booking(details(turf), None, Some(&checkout))
            .await
            .unwrap();

        let payment = store.get_payment(&checkout).await.unwrap().unwrap();
        assert_eq!(booking.status, BookingStatus::Confirmed);
        assert_eq!(booking.payment_id, Some(payment.id));
    }

    #[tokio::test]
    async fn failed_and_pending_payments_are_preconditions() {
        let (linker, store, turf) = seeded(PaymentReusePolicy::Reject).await;
        let failed = payment(
            &store,
            "ws_CO_FAILED",
            Some(Settlement::Failed {
                reason: "Request cancelled by user".into(),
                raw_callback: json!({}),
            }),
        )
        .await;
        let pending = payment(&store, "ws_CO_PENDING", None).await;

        assert!(matches!(
            linker.create_booking(details(turf), None, Some(&failed)).await,
            Err(LinkageError::PaymentIncomplete {
                status: PaymentStatus::Failed,
                ..
            })
        ));
        assert!(matches!(
            linker.create_booking(details(turf), None, Some(&pending)).await,
            Err(LinkageError::PaymentIncomplete {
                status: PaymentStatus::Pending,
                ..
            })
        ));
        assert!(store.list_bookings().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_payment_and_turf_are_not_found() {
        let (linker, _, turf) = seeded(PaymentReusePolicy::Reject).await;
        let missing = CheckoutRequestId::new("ws_CO_MISSING").unwrap();

        assert!(matches!(
            linker.create_booking(details(turf), None, Some(&missing)).await,
            Err(LinkageError::PaymentNotFound(_))
        ));
        assert!(matches!(
            linker
                .create_booking(details(TurfId::generate()), None, None)
                .await,
            Err(LinkageError::TurfNotFound(_))
        ));
    }

    #[tokio::test]
    async fn reuse_policy_controls_second_booking() {
        let (linker, store, turf) = seeded(PaymentReusePolicy::Reject).await;
        let checkout = payment(&store, "ws_CO_1", Some(completed())).await;
        linker
            .create_booking(details(turf), None, Some(&checkout))
            .await
            .unwrap();
        assert!(matches!(
            linker.create_booking(details(turf), None, Some(&checkout)).await,
            Err(LinkageError::PaymentAlreadyLinked(_))
        ));

        let permissive = BookingLinker::new(store.clone(), PaymentReusePolicy::Allow);
        assert!(permissive
            .create_booking(details(turf), None, Some(&checkout))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn concurrent_bookings_link_payment_once() {
        let (linker, store, turf) = seeded(PaymentReusePolicy::Reject).await;
        let checkout = payment(&store, "ws_CO_RACE", Some(completed())).await;

        let attempts =
            (0..16).map(|_| linker.create_booking(details(turf), None, Some(&checkout)));
        let results = futures::future::join_all(attempts).await;

        let linked = results.iter().filter(|r| r.is_ok()).count();
        let rejected = results
            .iter()
            .filter(|r| matches!(r, Err(LinkageError::PaymentAlreadyLinked(_))))
            .count();
        assert_eq!(linked, 1);
        assert_eq!(rejected, 15);
        assert_eq!(store.list_bookings().await.unwrap().len(), 1);
    }
}
