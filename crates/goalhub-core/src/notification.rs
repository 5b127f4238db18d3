//! In-app notifications.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::ids::{NotificationId, UserId};

/// A notification, global when `user_id` is `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Notification identifier.
    pub id: NotificationId,
    /// Recipient.
    pub user_id: Option<UserId>,
    /// Category: `booking`, `payment`, `system`, ...
    #[serde(rename = "type")]
    pub kind: String,
    /// Text shown to the user.
    pub message: String,
    /// Whether the user has seen it.
    pub read: bool,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// Notification creation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewNotification {
    /// Category.
    #[serde(rename = "type")]
    pub kind: String,
    /// Text shown to the user.
    pub message: String,
    /// Recipient.
    #[serde(default)]
    pub user_id: Option<UserId>,
}

impl NewNotification {
    /// Turn the request into an unread notification.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidField` for a blank type or message.
    pub fn into_notification(self) -> Result<Notification, ValidationError> {
        if self.kind.trim().is_empty() {
            return Err(ValidationError::field("type", "must not be empty"));
        }
        if self.message.trim().is_empty() {
            return Err(ValidationError::field("message", "must not be empty"));
        }
        Ok(Notification {
            id: NotificationId::generate(),
            user_id: self.user_id,
            kind: self.kind,
            message: self.message,
            read: false,
            created_at: Utc::now(),
        })
    }
}
