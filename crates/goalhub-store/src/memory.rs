//! In-memory storage implementation.
//!
//! All tables sit behind one `RwLock`, so every trait method is a single
//! critical section. That is what makes `settle_payment` and the exclusive
//! `insert_booking` atomic here.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use goalhub_core::{
    Booking, BookingId, CheckoutRequestId, Event, EventId, Notification, NotificationId, Payment,
    Settlement, Turf, TurfId, User, UserId,
};

use crate::error::{Result, StoreError};
use crate::{SettleResult, Store};

#[derive(Default)]
struct Tables {
    payments: HashMap<CheckoutRequestId, Payment>,
    bookings: HashMap<BookingId, Booking>,
    turfs: HashMap<TurfId, Turf>,
    events: HashMap<EventId, Event>,
    notifications: HashMap<NotificationId, Notification>,
    users: HashMap<UserId, User>,
}

/// A thread-safe in-memory store.
///
/// Cloning shares the underlying tables.
#[derive(Default, Clone)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    /// Creates a new, empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_payment(&self, payment: &Payment) -> Result<()> {
        let mut tables = self.tables.write().await;
        if tables.payments.contains_key(&payment.checkout_request_id) {
            return Err(StoreError::Conflict(format!(
                "payment already recorded for {}",
                payment.checkout_request_id
            )));
        }
        tables
            .payments
            .insert(payment.checkout_request_id.clone(), payment.clone());
        Ok(())
    }

    async fn get_payment(
        &self,
        checkout_request_id: &CheckoutRequestId,
    ) -> Result<Option<Payment>> {
        let tables = self.tables.read().await;
        Ok(tables.payments.get(checkout_request_id).cloned())
    }

    async fn settle_payment(
        &self,
        checkout_request_id: &CheckoutRequestId,
        settlement: &Settlement,
        at: DateTime<Utc>,
    ) -> Result<SettleResult> {
        let mut tables = self.tables.write().await;
        let Some(payment) = tables.payments.get_mut(checkout_request_id) else {
            return Ok(SettleResult::NotFound);
        };

        if payment.settle(settlement, at) {
            Ok(SettleResult::Settled(payment.clone()))
        } else {
            Ok(SettleResult::AlreadySettled(payment.clone()))
        }
    }

    async fn insert_booking(&self, booking: &Booking, exclusive_payment: bool) -> Result<()> {
        let mut tables = self.tables.write().await;
        if let (true, Some(payment_id)) = (exclusive_payment, booking.payment_id) {
            let taken = tables
                .bookings
                .values()
                .any(|existing| existing.payment_id == Some(payment_id));
            if taken {
                return Err(StoreError::Conflict(format!(
                    "payment {payment_id} is already linked to a booking"
                )));
            }
        }
        tables.bookings.insert(booking.id, booking.clone());
        Ok(())
    }

    async fn get_booking(&self, id: &BookingId) -> Result<Option<Booking>> {
        let tables = self.tables.read().await;
        Ok(tables.bookings.get(id).cloned())
    }

    async fn list_bookings(&self) -> Result<Vec<Booking>> {
        let tables = self.tables.read().await;
        let mut bookings: Vec<_> = tables.bookings.values().cloned().collect();
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(bookings)
    }

    async fn update_booking(&self, booking: &Booking) -> Result<()> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .bookings
            .get_mut(&booking.id)
            .ok_or_else(|| StoreError::not_found("booking", booking.id))?;

        stored.turf_id = booking.turf_id;
        stored.date = booking.date;
        stored.time_slot.clone_from(&booking.time_slot);
        stored.status = booking.status;
        Ok(())
    }

    async fn insert_turf(&self, turf: &Turf) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.turfs.insert(turf.id, turf.clone());
        Ok(())
    }

    async fn get_turf(&self, id: &TurfId) -> Result<Option<Turf>> {
        let tables = self.tables.read().await;
        Ok(tables.turfs.get(id).cloned())
    }

    async fn list_turfs(&self) -> Result<Vec<Turf>> {
        let tables = self.tables.read().await;
        let mut turfs: Vec<_> = tables.turfs.values().cloned().collect();
        turfs.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(turfs)
    }

    async fn insert_event(&self, event: &Event) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.events.insert(event.id, event.clone());
        Ok(())
    }

    async fn get_event(&self, id: &EventId) -> Result<Option<Event>> {
        let tables = self.tables.read().await;
        Ok(tables.events.get(id).cloned())
    }

    async fn list_events(&self) -> Result<Vec<Event>> {
        let tables = self.tables.read().await;
        let mut events: Vec<_> = tables.events.values().cloned().collect();
        events.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(events)
    }

    async fn update_event(&self, event: &Event) -> Result<()> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .events
            .get_mut(&event.id)
            .ok_or_else(|| StoreError::not_found("event", event.id))?;
        *stored = event.clone();
        Ok(())
    }

    async fn delete_event(&self, id: &EventId) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables
            .events
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found("event", id))
    }

    async fn insert_notification(&self, notification: &Notification) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables
            .notifications
            .insert(notification.id, notification.clone());
        Ok(())
    }

    async fn list_notifications(&self) -> Result<Vec<Notification>> {
        let tables = self.tables.read().await;
        let mut notifications: Vec<_> = tables.notifications.values().cloned().collect();
        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(notifications)
    }

    async fn mark_notification_read(&self, id: &NotificationId) -> Result<Notification> {
        let mut tables = self.tables.write().await;
        let notification = tables
            .notifications
            .get_mut(id)
            .ok_or_else(|| StoreError::not_found("notification", id))?;
        notification.read = true;
        Ok(notification.clone())
    }

    async fn insert_user(&self, user: &User) -> Result<()> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict(format!(
                "user with email {} already exists",
                user.email
            )));
        }
        tables.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn get_user(&self, id: &UserId) -> Result<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.get(id).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let tables = self.tables.read().await;
        let mut users: Vec<_> = tables.users.values().cloned().collect();
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(users)
    }

    async fn update_user(&self, user: &User) -> Result<()> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .users
            .get_mut(&user.id)
            .ok_or_else(|| StoreError::not_found("user", user.id))?;

        stored.name.clone_from(&user.name);
        stored.phone.clone_from(&user.phone);
        stored.role = user.role;
        stored.avatar.clone_from(&user.avatar);
        stored.is_active = user.is_active;
        Ok(())
    }

    async fn delete_user(&self, id: &UserId) -> Result<()> {
        let mut tables = self.tables.write().await;
        if tables.users.remove(id).is_none() {
            return Err(StoreError::not_found("user", id));
        }

        for booking in tables.bookings.values_mut() {
            if booking.user_id.as_ref() == Some(id) {
                booking.user_id = None;
            }
        }
        for notification in tables.notifications.values_mut() {
            if notification.user_id.as_ref() == Some(id) {
                notification.user_id = None;
            }
        }
        Ok(())
    }

    async fn count_users(&self) -> Result<i64> {
        let tables = self.tables.read().await;
        Ok(i64::try_from(tables.users.len()).unwrap_or(i64::MAX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use goalhub_core::{BookingStatus, NewBooking, PaymentStatus};
    use serde_json::json;

    fn checkout(id: &str) -> CheckoutRequestId {
        CheckoutRequestId::new(id).unwrap()
    }

    fn completed() -> Settlement {
        Settlement::Completed {
            reference: Some("NLJ7RT61SV".into()),
            raw_callback: json!({"Body": {}}),
        }
    }

    fn booking(payment: Option<&Payment>) -> Booking {
        let details: NewBooking = serde_json::from_value(json!({
            "turf_id": TurfId::generate(),
            "date": "2026-05-02",
            "time_slot": "20:00",
            "amount": 1500
        }))
        .unwrap();
        Booking::new(
            details,
            None,
            payment.map(|p| p.id),
            BookingStatus::Confirmed,
        )
    }

    #[tokio::test]
    async fn duplicate_checkout_id_is_a_conflict() {
        let store = MemoryStore::new();
        let payment = Payment::pending(checkout("ws_CO_1"), None, "254712345678", 100);
        store.insert_payment(&payment).await.unwrap();

        let again = Payment::pending(checkout("ws_CO_1"), None, "254700000000", 5);
        assert!(matches!(
            store.insert_payment(&again).await,
            Err(StoreError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn settle_is_compare_and_set() {
        let store = MemoryStore::new();
        let id = checkout("ws_CO_2");
        store
            .insert_payment(&Payment::pending(id.clone(), None, "254712345678", 100))
            .await
            .unwrap();

        let first = store.settle_payment(&id, &completed(), Utc::now()).await.unwrap();
        assert!(matches!(first, SettleResult::Settled(ref p) if p.status == PaymentStatus::Completed));

        let failed = Settlement::Failed {
            reason: "late".into(),
            raw_callback: json!({}),
        };
        let second = store.settle_payment(&id, &failed, Utc::now()).await.unwrap();
        match second {
            SettleResult::AlreadySettled(payment) => {
                assert_eq!(payment.status, PaymentStatus::Completed);
                assert_eq!(payment.failure_reason, None);
            }
            other => panic!("expected AlreadySettled, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn settle_unknown_payment() {
        let store = MemoryStore::new();
        let result = store
            .settle_payment(&checkout("ws_CO_missing"), &completed(), Utc::now())
            .await
            .unwrap();
        assert_eq!(result, SettleResult::NotFound);
    }

    #[tokio::test]
    async fn concurrent_settlements_apply_once() {
        let store = MemoryStore::new();
        let id = checkout("ws_CO_race");
        store
            .insert_payment(&Payment::pending(id.clone(), None, "254712345678", 100))
            .await
            .unwrap();

        let settlement = completed();
        let attempts = (0..16).map(|_| store.settle_payment(&id, &settlement, Utc::now()));
        let results = futures::future::join_all(attempts).await;

        let settled = results
            .iter()
            .filter(|r| matches!(r, Ok(SettleResult::Settled(_))))
            .count();
        assert_eq!(settled, 1);
    }

    #[tokio::test]
    async fn exclusive_booking_rejects_second_link() {
        let store = MemoryStore::new();
        let payment = Payment::pending(checkout("ws_CO_3"), None, "254712345678", 1500);

        store.insert_booking(&booking(Some(&payment)), true).await.unwrap();
        assert!(matches!(
            store.insert_booking(&booking(Some(&payment)), true).await,
            Err(StoreError::Conflict(_))
        ));

        store.insert_booking(&booking(Some(&payment)), false).await.unwrap();
        assert_eq!(store.list_bookings().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn update_booking_keeps_payment_link() {
        let store = MemoryStore::new();
        let payment = Payment::pending(checkout("ws_CO_4"), None, "254712345678", 1500);
        let original = booking(Some(&payment));
        store.insert_booking(&original, true).await.unwrap();

        let mut edited = original.clone();
        edited.status = BookingStatus::Cancelled;
        edited.payment_id = None;
        store.update_booking(&edited).await.unwrap();

        let stored = store.get_booking(&original.id).await.unwrap().unwrap();
        assert_eq!(stored.status, BookingStatus::Cancelled);
        assert_eq!(stored.payment_id, Some(payment.id));
    }

    #[tokio::test]
    async fn missing_records_are_not_found() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.delete_event(&EventId::generate()).await,
            Err(StoreError::NotFound { entity: "event", .. })
        ));
        assert!(matches!(
            store.mark_notification_read(&NotificationId::generate()).await,
            Err(StoreError::NotFound { .. })
        ));
        assert!(matches!(
            store.delete_user(&UserId::generate()).await,
            Err(StoreError::NotFound { entity: "user", .. })
        ));
    }

    #[tokio::test]
    async fn deleting_user_clears_booking_owner() {
        let store = MemoryStore::new();
        let user = goalhub_core::NewUser {
            email: "player@goalhub.test".into(),
            name: None,
            phone: None,
            role: goalhub_core::Role::User,
            avatar: None,
        }
        .into_user()
        .unwrap();
        store.insert_user(&user).await.unwrap();

        let mut owned = booking(None);
        owned.user_id = Some(user.id);
        store.insert_booking(&owned, false).await.unwrap();

        store.delete_user(&user.id).await.unwrap();

        assert!(store.get_user(&user.id).await.unwrap().is_none());
        let stored = store.get_booking(&owned.id).await.unwrap().unwrap();
        assert_eq!(stored.user_id, None);
    }
}
