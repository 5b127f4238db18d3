//! Turfs (bookable pitches).

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::ids::TurfId;

/// A bookable pitch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turf {
    /// Turf identifier.
    pub id: TurfId,
    /// Display name.
    pub name: String,
    /// Where it is.
    pub location: String,
    /// Format, e.g. `5-a-side`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Hourly price in KES.
    pub price: i64,
    /// Image URL.
    pub image: Option<String>,
    /// Free text.
    pub description: Option<String>,
}

/// Turf creation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTurf {
    /// Display name.
    pub name: String,
    /// Where it is.
    pub location: String,
    /// Format, e.g. `7-a-side`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Hourly price in KES.
    pub price: i64,
    /// Image URL.
    #[serde(default)]
    pub image: Option<String>,
    /// Free text.
    #[serde(default)]
    pub description: Option<String>,
}

impl NewTurf {
    /// Turn the request into a turf with a fresh id.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidField` for a blank name or a negative
    /// price.
    pub fn into_turf(self) -> Result<Turf, ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::field("name", "must not be empty"));
        }
        if self.price < 0 {
            return Err(ValidationError::field("price", "must not be negative"));
        }
        Ok(Turf {
            id: TurfId::generate(),
            name: self.name,
            location: self.location,
            kind: self.kind,
            price: self.price,
            image: self.image,
            description: self.description,
        })
    }
}
