//! Storage layer for Goalhub.
//!
//! This crate persists payments, bookings and the collaborator records
//! (turfs, events, notifications, users) behind the async [`Store`] trait.
//!
//! # Backends
//!
//! - [`PgStore`]: PostgreSQL through `sqlx`, schema managed by the embedded
//!   migrations in `migrations/`
//! - [`MemoryStore`]: process-local maps, used by tests and by development
//!   runs without `DATABASE_URL`
//!
//! # Payment settlement
//!
//! [`Store::settle_payment`] is the only way a payment leaves `pending`. Both
//! backends implement it as a compare-and-set on the pending status, so two
//! concurrent callbacks for the same checkout request cannot both apply.
//!
//! # Example
//!
//! ```no_run
//! use goalhub_core::{CheckoutRequestId, Payment};
//! use goalhub_store::{MemoryStore, Store};
//!
//! # async fn example() -> goalhub_store::Result<()> {
//! let store = MemoryStore::new();
//! let checkout = CheckoutRequestId::new("ws_CO_191220191020363925").unwrap();
//! store
//!     .insert_payment(&Payment::pending(checkout.clone(), None, "254712345678", 1500))
//!     .await?;
//!
//! let payment = store.get_payment(&checkout).await?;
//! assert!(payment.is_some());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod memory;
pub mod postgres;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use goalhub_core::{
    Booking, BookingId, CheckoutRequestId, Event, EventId, Notification, NotificationId, Payment,
    Settlement, Turf, TurfId, User, UserId,
};

/// Outcome of [`Store::settle_payment`].
#[derive(Debug, Clone, PartialEq)]
pub enum SettleResult {
    /// The payment was pending and now carries the settlement.
    Settled(Payment),
    /// The payment had already left pending; it is returned unchanged.
    AlreadySettled(Payment),
    /// No payment exists for the checkout request id.
    NotFound,
}

/// The storage trait defining all database operations.
///
/// This trait abstracts the storage layer, allowing for different
/// implementations (PostgreSQL, in-memory for testing).
#[async_trait]
pub trait Store: Send + Sync {
    // =========================================================================
    // Payment Operations
    // =========================================================================

    /// Insert a new payment record.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Conflict` if a payment with the same checkout
    /// request id already exists.
    async fn insert_payment(&self, payment: &Payment) -> Result<()>;

    /// Get a payment by its provider checkout request id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn get_payment(&self, checkout_request_id: &CheckoutRequestId)
        -> Result<Option<Payment>>;

    /// Move a pending payment to its terminal state.
    ///
    /// Atomic per record: of two concurrent calls for the same pending
    /// payment exactly one returns `Settled`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn settle_payment(
        &self,
        checkout_request_id: &CheckoutRequestId,
        settlement: &Settlement,
        at: DateTime<Utc>,
    ) -> Result<SettleResult>;

    // =========================================================================
    // Booking Operations
    // =========================================================================

    /// Insert a booking.
    ///
    /// With `exclusive_payment`, the insert fails if another booking already
    /// references the same payment. The check and the insert are atomic.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Conflict` if the payment is already linked.
    async fn insert_booking(&self, booking: &Booking, exclusive_payment: bool) -> Result<()>;

    /// Get a booking by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn get_booking(&self, id: &BookingId) -> Result<Option<Booking>>;

    /// List all bookings, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn list_bookings(&self) -> Result<Vec<Booking>>;

    /// Overwrite the editable fields of a booking.
    ///
    /// `payment_id`, `user_id` and `created_at` are never changed.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the booking doesn't exist.
    async fn update_booking(&self, booking: &Booking) -> Result<()>;

    // =========================================================================
    // Turf Operations
    // =========================================================================

    /// Insert a turf.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn insert_turf(&self, turf: &Turf) -> Result<()>;

    /// Get a turf by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn get_turf(&self, id: &TurfId) -> Result<Option<Turf>>;

    /// List all turfs by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn list_turfs(&self) -> Result<Vec<Turf>>;

    // =========================================================================
    // Event Operations
    // =========================================================================

    /// Insert an event.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn insert_event(&self, event: &Event) -> Result<()>;

    /// Get an event by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn get_event(&self, id: &EventId) -> Result<Option<Event>>;

    /// List all events, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn list_events(&self) -> Result<Vec<Event>>;

    /// Overwrite an event.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the event doesn't exist.
    async fn update_event(&self, event: &Event) -> Result<()>;

    /// Delete an event.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the event doesn't exist.
    async fn delete_event(&self, id: &EventId) -> Result<()>;

    // =========================================================================
    // Notification Operations
    // =========================================================================

    /// Insert a notification.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn insert_notification(&self, notification: &Notification) -> Result<()>;

    /// List notifications, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn list_notifications(&self) -> Result<Vec<Notification>>;

    /// Mark a notification as read and return it.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the notification doesn't exist.
    async fn mark_notification_read(&self, id: &NotificationId) -> Result<Notification>;

    // =========================================================================
    // User Operations
    // =========================================================================

    /// Insert a user.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Conflict` if the email is already taken.
    async fn insert_user(&self, user: &User) -> Result<()>;

    /// Get a user by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn get_user(&self, id: &UserId) -> Result<Option<User>>;

    /// Get a user by email.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;

    /// List all users, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn list_users(&self) -> Result<Vec<User>>;

    /// Overwrite the editable fields of a user.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the user doesn't exist.
    async fn update_user(&self, user: &User) -> Result<()>;

    /// Delete a user. Bookings and notifications they owned are kept with
    /// their owner cleared.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the user doesn't exist.
    async fn delete_user(&self, id: &UserId) -> Result<()>;

    /// Number of users.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn count_users(&self) -> Result<i64>;
}
