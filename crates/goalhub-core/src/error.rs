//! Error types for Goalhub domain validation.

use crate::ids::IdError;

/// Result type for domain operations.
pub type Result<T> = std::result::Result<T, ValidationError>;

/// Input rejected before it reaches storage or the payment provider.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Phone number cannot be normalized to the international form.
    #[error("invalid phone number: {0}")]
    InvalidPhone(String),

    /// Amount outside the accepted push payment range.
    #[error("amount must be between {min} and {max}, got {amount}")]
    AmountOutOfRange {
        /// The rejected amount.
        amount: i64,
        /// Smallest accepted amount.
        min: i64,
        /// Largest accepted amount.
        max: i64,
    },

    /// A status string that does not name a known state.
    #[error("unknown status: {0}")]
    UnknownStatus(String),

    /// A role string that does not name a known role.
    #[error("unknown role: {0}")]
    UnknownRole(String),

    /// A required field was empty or otherwise unusable.
    #[error("invalid {field}: {reason}")]
    InvalidField {
        /// Name of the offending field.
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },

    /// Invalid identifier.
    #[error("invalid identifier: {0}")]
    InvalidId(#[from] IdError),
}

impl ValidationError {
    /// Shorthand for [`ValidationError::InvalidField`].
    #[must_use]
    pub fn field(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field,
            reason: reason.into(),
        }
    }
}
