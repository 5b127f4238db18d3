//! Payment records and the push payment input rules.
//!
//! A `Payment` is created in `Pending` once the provider accepts a push
//! request and moves exactly once to `Completed` or `Failed` when the
//! callback for its `CheckoutRequestId` arrives. The transition is one-way:
//! a settled payment never changes again.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::ids::{CheckoutRequestId, PaymentId};

// ============================================================================
// Constants
// ============================================================================

/// Smallest amount (KES) the push rail accepts.
pub const MIN_AMOUNT: i64 = 1;

/// Largest amount (KES) accepted for a single push payment.
pub const MAX_AMOUNT: i64 = 300_000;

/// International dialling prefix the provider requires (Kenya).
pub const COUNTRY_PREFIX: &str = "254";

/// Length of a normalized subscriber number, prefix included.
const NORMALIZED_PHONE_LEN: usize = 12;

/// Lifecycle state of a payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// Push accepted by the provider, outcome not yet known.
    Pending,
    /// Customer confirmed; the provider reported success.
    Completed,
    /// Cancelled, timed out, or rejected by the provider.
    Failed,
}

impl PaymentStatus {
    /// Lowercase name as stored and sent over the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Completed and failed are terminal.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(ValidationError::UnknownStatus(other.to_string())),
        }
    }
}

/// One push payment attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    /// System-generated identity.
    pub id: PaymentId,

    /// Provider correlation id; unique and immutable.
    pub checkout_request_id: CheckoutRequestId,

    /// Provider merchant request id, when the provider returned one.
    pub merchant_request_id: Option<String>,

    /// Normalized phone number (`2547XXXXXXXX`).
    pub phone: String,

    /// Amount in KES.
    pub amount: i64,

    /// Current state.
    pub status: PaymentStatus,

    /// Provider receipt number, only ever set on completion.
    pub reference: Option<String>,

    /// Provider result description, only ever set on failure.
    pub failure_reason: Option<String>,

    /// The callback payload that settled this payment, kept for audit.
    pub raw_callback: Option<serde_json::Value>,

    /// When the push was accepted.
    pub created_at: DateTime<Utc>,

    /// When the payment left `Pending`. Set once.
    pub completed_at: Option<DateTime<Utc>>,
}

impl Payment {
    /// A freshly accepted push payment.
    #[must_use]
    pub fn pending(
        checkout_request_id: CheckoutRequestId,
        merchant_request_id: Option<String>,
        phone: impl Into<String>,
        amount: i64,
    ) -> Self {
        Self {
            id: PaymentId::generate(),
            checkout_request_id,
            merchant_request_id,
            phone: phone.into(),
            amount,
            status: PaymentStatus::Pending,
            reference: None,
            failure_reason: None,
            raw_callback: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Apply a settlement if the payment is still pending.
    ///
    /// Returns `false` and leaves the record untouched when the payment is
    /// already terminal.
    pub fn settle(&mut self, settlement: &Settlement, at: DateTime<Utc>) -> bool {
        if self.status.is_terminal() {
            return false;
        }

        match settlement {
            Settlement::Completed {
                reference,
                raw_callback,
            } => {
                self.status = PaymentStatus::Completed;
                self.reference.clone_from(reference);
                self.raw_callback = Some(raw_callback.clone());
            }
            Settlement::Failed {
                reason,
                raw_callback,
            } => {
                self.status = PaymentStatus::Failed;
                self.failure_reason = Some(reason.clone());
                self.raw_callback = Some(raw_callback.clone());
            }
        }
        self.completed_at = Some(at);
        true
    }

    /// Read-only projection served to polling clients.
    #[must_use]
    pub fn status_view(&self) -> PaymentStatusView {
        PaymentStatusView {
            status: self.status,
            amount: self.amount,
            phone: self.phone.clone(),
        }
    }
}

/// The terminal outcome reported by a provider callback.
#[derive(Debug, Clone, PartialEq)]
pub enum Settlement {
    /// Result code zero.
    Completed {
        /// Receipt number from the callback metadata, if present.
        reference: Option<String>,
        /// The full callback payload.
        raw_callback: serde_json::Value,
    },
    /// Any nonzero result code.
    Failed {
        /// Provider result description.
        reason: String,
        /// The full callback payload.
        raw_callback: serde_json::Value,
    },
}

impl Settlement {
    /// The status this settlement moves a payment to.
    #[must_use]
    pub const fn status(&self) -> PaymentStatus {
        match self {
            Self::Completed { .. } => PaymentStatus::Completed,
            Self::Failed { .. } => PaymentStatus::Failed,
        }
    }
}

/// Status polling response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentStatusView {
    /// Current state.
    pub status: PaymentStatus,
    /// Amount in KES.
    pub amount: i64,
    /// Normalized phone number.
    pub phone: String,
}

/// Normalize a subscriber number to the `254XXXXXXXXX` form.
///
/// Whitespace, hyphens and a leading `+` are dropped. A leading `0` becomes
/// the country prefix, as does a bare nine-digit local number starting with
/// `7` or `1`. Already-prefixed numbers pass through unchanged.
///
/// # Errors
///
/// Returns `ValidationError::InvalidPhone` if the result is not twelve digits
/// starting with the country prefix.
pub fn normalize_phone(input: &str) -> Result<String, ValidationError> {
    let compact: String = input
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect();
    let digits = compact.strip_prefix('+').unwrap_or(&compact);

    let normalized = if let Some(local) = digits.strip_prefix('0') {
        format!("{COUNTRY_PREFIX}{local}")
    } else if digits.len() == NORMALIZED_PHONE_LEN - COUNTRY_PREFIX.len()
        && (digits.starts_with('7') || digits.starts_with('1'))
    {
        format!("{COUNTRY_PREFIX}{digits}")
    } else {
        digits.to_string()
    };

    let valid = normalized.len() == NORMALIZED_PHONE_LEN
        && normalized.starts_with(COUNTRY_PREFIX)
        && normalized.bytes().all(|b| b.is_ascii_digit());

    if valid {
        Ok(normalized)
    } else {
        Err(ValidationError::InvalidPhone(input.to_string()))
    }
}

/// Check a push amount against the accepted range.
///
/// # Errors
///
/// Returns `ValidationError::AmountOutOfRange` outside `MIN_AMOUNT..=MAX_AMOUNT`.
pub fn validate_amount(amount: i64) -> Result<i64, ValidationError> {
    if (MIN_AMOUNT..=MAX_AMOUNT).contains(&amount) {
        Ok(amount)
    } else {
        Err(ValidationError::AmountOutOfRange {
            amount,
            min: MIN_AMOUNT,
            max: MAX_AMOUNT,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pending() -> Payment {
        Payment::pending(
            CheckoutRequestId::new("ws_CO_1").unwrap(),
            Some("29115-34620561-1".into()),
            "254712345678",
            1500,
        )
    }

    #[test]
    fn phone_forms_normalize_to_the_same_number() {
        for input in ["0712345678", "+254712345678", "254712345678"] {
            assert_eq!(normalize_phone(input).unwrap(), "254712345678", "{input}");
        }
    }

    #[test]
    fn phone_normalization_strips_spacing() {
        assert_eq!(normalize_phone("+254 712 345 678").unwrap(), "254712345678");
        assert_eq!(normalize_phone("0712-345-678").unwrap(), "254712345678");
        assert_eq!(normalize_phone("712345678").unwrap(), "254712345678");
        assert_eq!(normalize_phone("0110345678").unwrap(), "254110345678");
    }

    #[test]
    fn phone_normalization_rejects_garbage() {
        assert!(normalize_phone("").is_err());
        assert!(normalize_phone("07123").is_err());
        assert!(normalize_phone("+1 555 123 4567").is_err());
        assert!(normalize_phone("07123456ab").is_err());
    }

    #[test]
    fn amount_bounds() {
        assert!(validate_amount(0).is_err());
        assert!(validate_amount(300_001).is_err());
        assert!(validate_amount(-5).is_err());
        assert_eq!(validate_amount(1), Ok(1));
        assert_eq!(validate_amount(300_000), Ok(300_000));
    }

    #[test]
    fn settle_completed_sets_reference_and_timestamp() {
        let mut payment = pending();
        let at = Utc::now();
        let applied = payment.settle(
            &Settlement::Completed {
                reference: Some("NLJ7RT61SV".into()),
                raw_callback: json!({"ok": true}),
            },
            at,
        );

        assert!(applied);
        assert_eq!(payment.status, PaymentStatus::Completed);
        assert_eq!(payment.reference.as_deref(), Some("NLJ7RT61SV"));
        assert_eq!(payment.failure_reason, None);
        assert_eq!(payment.completed_at, Some(at));
    }

    #[test]
    fn settle_is_one_way() {
        let mut payment = pending();
        let first = Utc::now();
        assert!(payment.settle(
            &Settlement::Failed {
                reason: "Request cancelled by user".into(),
                raw_callback: json!({}),
            },
            first,
        ));

        let again = payment.settle(
            &Settlement::Completed {
                reference: Some("LATE".into()),
                raw_callback: json!({}),
            },
            Utc::now(),
        );

        assert!(!again);
        assert_eq!(payment.status, PaymentStatus::Failed);
        assert_eq!(payment.reference, None);
        assert_eq!(payment.completed_at, Some(first));
    }

    #[test]
    fn status_roundtrips_through_str() {
        for status in [
            PaymentStatus::Pending,
            PaymentStatus::Completed,
            PaymentStatus::Failed,
        ] {
            assert_eq!(status.as_str().parse::<PaymentStatus>().unwrap(), status);
        }
        assert!("refunded".parse::<PaymentStatus>().is_err());
    }
}
