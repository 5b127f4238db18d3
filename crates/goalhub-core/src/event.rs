//! Events shown on the public events page.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::ids::EventId;
use crate::patch::Patch;

/// A tournament, clinic or similar listing.
///
/// `date` and `time` are free-form display strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Event identifier.
    pub id: EventId,
    /// Headline.
    pub title: String,
    /// Body text.
    pub description: Option<String>,
    /// Display date.
    pub date: String,
    /// Display time.
    pub time: String,
    /// Image URL.
    pub image: Option<String>,
    /// Venue.
    pub location: Option<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// Event creation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEvent {
    /// Headline.
    pub title: String,
    /// Body text.
    #[serde(default)]
    pub description: Option<String>,
    /// Display date.
    pub date: String,
    /// Display time.
    pub time: String,
    /// Image URL.
    #[serde(default)]
    pub image: Option<String>,
    /// Venue.
    #[serde(default)]
    pub location: Option<String>,
}

impl NewEvent {
    /// Turn the request into an event with a fresh id.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidField` for a blank title.
    pub fn into_event(self) -> Result<Event, ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::field("title", "must not be empty"));
        }
        Ok(Event {
            id: EventId::generate(),
            title: self.title,
            description: self.description,
            date: self.date,
            time: self.time,
            image: self.image,
            location: self.location,
            created_at: Utc::now(),
        })
    }
}

/// Partial event edit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventUpdate {
    /// New headline.
    #[serde(default)]
    pub title: Patch<String>,
    /// New body text; `null` clears it.
    #[serde(default)]
    pub description: Patch<Option<String>>,
    /// New display date.
    #[serde(default)]
    pub date: Patch<String>,
    /// New display time.
    #[serde(default)]
    pub time: Patch<String>,
    /// New image; `null` clears it.
    #[serde(default)]
    pub image: Patch<Option<String>>,
    /// New venue; `null` clears it.
    #[serde(default)]
    pub location: Patch<Option<String>>,
}

impl Event {
    /// Apply a partial edit.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidField` if the edit blanks the title;
    /// the event is left unchanged in that case.
    pub fn apply(&mut self, update: EventUpdate) -> Result<(), ValidationError> {
        if update
            .title
            .as_ref()
            .is_some_and(|title| title.trim().is_empty())
        {
            return Err(ValidationError::field("title", "must not be empty"));
        }
        update.title.apply_to(&mut self.title);
        update.description.apply_to(&mut self.description);
        update.date.apply_to(&mut self.date);
        update.time.apply_to(&mut self.time);
        update.image.apply_to(&mut self.image);
        update.location.apply_to(&mut self.location);
        Ok(())
    }
}
