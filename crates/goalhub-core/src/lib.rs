//! Core types for the Goalhub turf booking backend.
//!
//! This crate provides the domain model shared by the store, the HTTP service
//! and the client SDK:
//!
//! - **Identifiers**: `PaymentId`, `BookingId`, `TurfId`, `UserId`, `EventId`,
//!   `NotificationId`, and the provider-issued `CheckoutRequestId`
//! - **Payments**: `Payment`, `PaymentStatus`, `Settlement`, phone and amount
//!   validation
//! - **Callbacks**: `StkCallback` parsing of the M-Pesa result envelope
//! - **Bookings**: `Booking`, `NewBooking`, `BookingUpdate`
//! - **Collaborators**: `Turf`, `Event`, `Notification`, `User`
//! - **Partial updates**: `Patch<T>`
//!
//! # Amounts
//!
//! All amounts are whole Kenyan shillings stored as `i64`. The push payment
//! rail only accepts integers, so there is no fractional unit to carry.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod booking;
pub mod callback;
pub mod error;
pub mod event;
pub mod ids;
pub mod notification;
pub mod patch;
pub mod payment;
pub mod turf;
pub mod user;

pub use booking::{Booking, BookingStatus, BookingUpdate, NewBooking};
pub use callback::{
    CallbackMetadata, MalformedCallback, MetadataItem, ResultCode, StkCallback,
    RECEIPT_NUMBER_KEY,
};
pub use error::{Result, ValidationError};
pub use event::{Event, EventUpdate, NewEvent};
pub use ids::{
    BookingId, CheckoutRequestId, EventId, IdError, NotificationId, PaymentId, TurfId, UserId,
};
pub use notification::{NewNotification, Notification};
pub use patch::Patch;
pub use payment::{
    normalize_phone, validate_amount, Payment, PaymentStatus, PaymentStatusView, Settlement,
    COUNTRY_PREFIX, MAX_AMOUNT, MIN_AMOUNT,
};
pub use turf::{NewTurf, Turf};
pub use user::{NewUser, Role, User, UserUpdate};
