//! Users and roles.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::ids::UserId;
use crate::patch::Patch;

/// Access level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// A customer.
    #[default]
    User,
    /// Venue staff.
    Manager,
    /// Full access.
    Admin,
}

impl Role {
    /// Lowercase name as stored.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Manager => "manager",
            Self::Admin => "admin",
        }
    }

    /// Managers and admins may edit bookings, turfs and events.
    #[must_use]
    pub const fn can_manage(self) -> bool {
        matches!(self, Self::Manager | Self::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "manager" => Ok(Self::Manager),
            "admin" => Ok(Self::Admin),
            other => Err(ValidationError::UnknownRole(other.to_string())),
        }
    }
}

/// A user row. Email is the join key with the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// User identifier.
    pub id: UserId,
    /// Unique email.
    pub email: String,
    /// Display name.
    pub name: Option<String>,
    /// Contact phone.
    pub phone: Option<String>,
    /// Access level.
    pub role: Role,
    /// Avatar URL.
    pub avatar: Option<String>,
    /// Disabled accounts keep their history.
    pub is_active: bool,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// User creation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    /// Unique email.
    pub email: String,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Contact phone.
    #[serde(default)]
    pub phone: Option<String>,
    /// Access level.
    #[serde(default)]
    pub role: Role,
    /// Avatar URL.
    #[serde(default)]
    pub avatar: Option<String>,
}

impl NewUser {
    /// Turn the request into an active user.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidField` if the email is not plausibly
    /// an address.
    pub fn into_user(self) -> Result<User, ValidationError> {
        let email = self.email.trim().to_lowercase();
        let plausible = email
            .split_once('@')
            .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
        if !plausible {
            return Err(ValidationError::field("email", "not a valid address"));
        }
        Ok(User {
            id: UserId::generate(),
            email,
            name: self.name,
            phone: self.phone,
            role: self.role,
            avatar: self.avatar,
            is_active: true,
            created_at: Utc::now(),
        })
    }
}

/// Partial user edit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserUpdate {
    /// New display name; `null` clears it.
    #[serde(default)]
    pub name: Patch<Option<String>>,
    /// New phone; `null` clears it.
    #[serde(default)]
    pub phone: Patch<Option<String>>,
    /// New role.
    #[serde(default)]
    pub role: Patch<Role>,
    /// New avatar; `null` clears it.
    #[serde(default)]
    pub avatar: Patch<Option<String>>,
    /// Enable or disable.
    #[serde(default)]
    pub is_active: Patch<bool>,
}

impl User {
    /// Apply a partial edit.
    pub fn apply(&mut self, update: UserUpdate) {
        update.name.apply_to(&mut self.name);
        update.phone.apply_to(&mut self.phone);
        update.role.apply_to(&mut self.role);
        update.avatar.apply_to(&mut self.avatar);
        update.is_active.apply_to(&mut self.is_active);
    }
}
