//! Partial update wrapper.
//!
//! A field of an update request is either absent (leave the stored value
//! alone) or present (overwrite it). Nullable columns use `Patch<Option<T>>`
//! so that an explicit JSON `null` clears the value while a missing key does
//! not touch it.
//!
//! Update structs mark every field `#[serde(default)]`; a missing key then
//! deserializes to [`Patch::Absent`].

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// One field of a partial update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Patch<T> {
    /// The field was not supplied.
    Absent,
    /// The field was supplied with this value.
    Present(T),
}

impl<T> Patch<T> {
    /// Overwrite `target` if the field was supplied.
    pub fn apply_to(self, target: &mut T) {
        if let Self::Present(value) = self {
            *target = value;
        }
    }

    /// Borrow the supplied value, if any.
    #[must_use]
    pub const fn as_ref(&self) -> Option<&T> {
        match self {
            Self::Present(value) => Some(value),
            Self::Absent => None,
        }
    }
}

impl<T> Default for Patch<T> {
    fn default() -> Self {
        Self::Absent
    }
}

impl<T> From<T> for Patch<T> {
    fn from(value: T) -> Self {
        Self::Present(value)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Patch<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        T::deserialize(deserializer).map(Self::Present)
    }
}

impl<T: Serialize> Serialize for Patch<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Present(value) => value.serialize(serializer),
            Self::Absent => serializer.serialize_none(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Update {
        #[serde(default)]
        name: Patch<Option<String>>,
        #[serde(default)]
        capacity: Patch<u32>,
    }

    #[test]
    fn missing_key_is_absent() {
        let update: Update = serde_json::from_str("{}").unwrap();
        assert_eq!(update.name, Patch::Absent);
        assert_eq!(update.capacity, Patch::Absent);
    }

    #[test]
    fn explicit_null_clears_nullable_field() {
        let update: Update = serde_json::from_str(r#"{"name": null}"#).unwrap();
        assert_eq!(update.name, Patch::Present(None));

        let mut name = Some("old".to_string());
        update.name.apply_to(&mut name);
        assert_eq!(name, None);
    }

    #[test]
    fn absent_leaves_target_untouched() {
        let mut capacity = 10;
        Patch::<u32>::Absent.apply_to(&mut capacity);
        assert_eq!(capacity, 10);

        Patch::Present(14).apply_to(&mut capacity);
        assert_eq!(capacity, 14);
    }
}
