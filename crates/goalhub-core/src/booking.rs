//! Turf bookings.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::ids::{BookingId, PaymentId, TurfId, UserId};
use crate::patch::Patch;

/// Booking lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    /// Created without a completed payment.
    Pending,
    /// Backed by a completed payment, or confirmed by staff.
    Confirmed,
    /// Cancelled by staff.
    Cancelled,
    /// The slot has been played.
    Completed,
}

impl BookingStatus {
    /// Lowercase name as stored and sent over the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "cancelled" => Ok(Self::Cancelled),
            "completed" => Ok(Self::Completed),
            other => Err(ValidationError::UnknownStatus(other.to_string())),
        }
    }
}

/// A reserved turf slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    /// Booking identifier.
    pub id: BookingId,
    /// Booked turf.
    pub turf_id: TurfId,
    /// Owning user; `None` for guest bookings.
    pub user_id: Option<UserId>,
    /// Backing payment. Set at creation and never changed.
    pub payment_id: Option<PaymentId>,
    /// Day of play.
    pub date: NaiveDate,
    /// Start slot label, e.g. `18:00`.
    pub time_slot: String,
    /// Length in hours.
    pub duration: i32,
    /// Total charged, in KES.
    pub amount: i64,
    /// Current state.
    pub status: BookingStatus,
    /// Guest contact name.
    pub customer_name: Option<String>,
    /// Guest contact phone.
    pub customer_phone: Option<String>,
    /// Guest contact email.
    pub customer_email: Option<String>,
    /// Add-ons (balls, bibs, ...) as submitted by the front end.
    pub extras: Option<serde_json::Value>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

const fn default_duration() -> i32 {
    1
}

/// Booking details supplied by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewBooking {
    /// Turf to book.
    pub turf_id: TurfId,
    /// Day of play.
    pub date: NaiveDate,
    /// Start slot label.
    pub time_slot: String,
    /// Length in hours.
    #[serde(default = "default_duration")]
    pub duration: i32,
    /// Total charged, in KES.
    pub amount: i64,
    /// Add-ons.
    #[serde(default)]
    pub extras: Option<serde_json::Value>,
    /// Guest contact name.
    #[serde(default)]
    pub customer_name: Option<String>,
    /// Guest contact phone.
    #[serde(default)]
    pub customer_phone: Option<String>,
    /// Guest contact email.
    #[serde(default)]
    pub customer_email: Option<String>,
}

impl NewBooking {
    /// Reject unusable details.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidField` for a blank slot, a
    /// non-positive duration or a negative amount.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.time_slot.trim().is_empty() {
            return Err(ValidationError::field("time_slot", "must not be empty"));
        }
        if self.duration < 1 {
            return Err(ValidationError::field("duration", "must be at least 1"));
        }
        if self.amount < 0 {
            return Err(ValidationError::field("amount", "must not be negative"));
        }
        Ok(())
    }
}

/// Staff edit of an existing booking. Omitted fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BookingUpdate {
    /// New status.
    #[serde(default)]
    pub status: Patch<BookingStatus>,
    /// New day of play.
    #[serde(default)]
    pub date: Patch<NaiveDate>,
    /// New slot.
    #[serde(default)]
    pub time_slot: Patch<String>,
    /// Move to another turf.
    #[serde(default)]
    pub turf_id: Patch<TurfId>,
}

impl Booking {
    /// Build a booking from caller details.
    #[must_use]
    pub fn new(
        details: NewBooking,
        user_id: Option<UserId>,
        payment_id: Option<PaymentId>,
        status: BookingStatus,
    ) -> Self {
        Self {
            id: BookingId::generate(),
            turf_id: details.turf_id,
            user_id,
            payment_id,
            date: details.date,
            time_slot: details.time_slot,
            duration: details.duration,
            amount: details.amount,
            status,
            customer_name: details.customer_name,
            customer_phone: details.customer_phone,
            customer_email: details.customer_email,
            extras: details.extras,
            created_at: Utc::now(),
        }
    }

    /// Apply a staff edit.
    pub fn apply(&mut self, update: BookingUpdate) {
        update.status.apply_to(&mut self.status);
        update.date.apply_to(&mut self.date);
        update.time_slot.apply_to(&mut self.time_slot);
        update.turf_id.apply_to(&mut self.turf_id);
    }
}
