//! Core type definitions with validation.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Validation errors for core types and operation inputs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The provided value was empty.
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    /// A scaled value fell outside its declared bounds.
    #[error("{scale} must be between {min} and {max}, got {value}")]
    OutOfRange {
        scale: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },

    /// A label did not match any known variant.
    #[error("unknown {kind}: {value}")]
    UnknownLabel { kind: &'static str, value: String },

    /// Planned duration is non-positive or unrealistically large.
    #[error("planned duration must be between 1 and {max} minutes, got {minutes}")]
    PlannedDuration { minutes: i64, max: i64 },

    /// An interval ends at or before it starts.
    #[error("{what} must end after it starts")]
    EndBeforeStart { what: &'static str },

    /// An interval is implausibly short or long.
    #[error("{what} duration of {minutes} minutes is outside {min}..={max}")]
    ImplausibleDuration {
        what: &'static str,
        minutes: i64,
        min: i64,
        max: i64,
    },
}

/// Generates a validated string ID newtype with common trait implementations.
macro_rules! define_string_id {
    (
        $(#[$meta:meta])*
        $name:ident, $field_name:literal
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates a new ID after validation.
            pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
                let id = id.into();
                if id.trim().is_empty() {
                    return Err(ValidationError::Empty { field: $field_name });
                }
                Ok(Self(id))
            }

            /// Generates a fresh random ID.
            pub fn generate() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            /// Returns the ID as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl std::str::FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }
    };
}

define_string_id!(
    /// A validated session identifier.
    ///
    /// Freshly started sessions receive a random UUID; uniqueness is enforced
    /// by the record store.
    SessionId, "session ID"
);

define_string_id!(
    /// A validated task identifier.
    TaskId, "task ID"
);

/// Generates a bounded integer scale newtype.
///
/// Values are validated on construction and on deserialization, so a stored
/// or transmitted value outside the scale never reaches the scoring code.
macro_rules! define_scale {
    (
        $(#[$meta:meta])*
        $name:ident, $label:literal, $min:literal ..= $max:literal
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "u8", into = "u8")]
        pub struct $name(u8);

        impl $name {
            /// Lowest value on the scale.
            pub const MIN: Self = Self($min);

            /// Highest value on the scale.
            pub const MAX: Self = Self($max);

            /// Creates a value after checking the scale bounds.
            pub fn new(value: u8) -> Result<Self, ValidationError> {
                if !($min..=$max).contains(&value) {
                    return Err(ValidationError::OutOfRange {
                        scale: $label,
                        value: i64::from(value),
                        min: $min,
                        max: $max,
                    });
                }
                Ok(Self(value))
            }

            /// Returns the raw value.
            #[must_use]
            pub const fn get(self) -> u8 {
                self.0
            }

            /// Returns the value widened to `f64`.
            #[must_use]
            pub fn as_f64(self) -> f64 {
                f64::from(self.0)
            }
        }

        impl TryFrom<u8> for $name {
            type Error = ValidationError;

            fn try_from(value: u8) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for u8 {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

define_scale!(
    /// A 1–10 self-reported level (energy, stress, mood).
    Level, "level", 1..=10
);

define_scale!(
    /// A 1–5 rating (progress, quality, focus, resistance, sleep quality).
    Rating, "rating", 1..=5
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_id_rejects_empty() {
        assert!(SessionId::new("").is_err());
        assert!(SessionId::new("   ").is_err());
        assert!(SessionId::new("valid-session").is_ok());
    }

    #[test]
    fn generated_ids_are_distinct() {
        let a = SessionId::generate();
        let b = SessionId::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 36);
    }

    #[test]
    fn task_id_serde_roundtrip() {
        let id = TaskId::new("task-abc").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"task-abc\"");
        let parsed: TaskId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn session_id_serde_rejects_empty() {
        let result: Result<SessionId, _> = serde_json::from_str("\"\"");
        assert!(result.is_err());
    }

    #[test]
    fn rating_validates_bounds() {
        assert!(Rating::new(0).is_err());
        assert!(Rating::new(1).is_ok());
        assert!(Rating::new(5).is_ok());
        assert_eq!(
            Rating::new(6),
            Err(ValidationError::OutOfRange {
                scale: "rating",
                value: 6,
                min: 1,
                max: 5,
            })
        );
    }

    #[test]
    fn level_validates_bounds() {
        assert!(Level::new(0).is_err());
        assert!(Level::new(10).is_ok());
        assert!(Level::new(11).is_err());
        assert_eq!(Level::MAX.get(), 10);
    }

    #[test]
    fn scale_deserialization_rejects_out_of_range() {
        assert!(serde_json::from_str::<Rating>("9").is_err());
        let level: Level = serde_json::from_str("7").unwrap();
        assert_eq!(level.get(), 7);
        assert_eq!(serde_json::to_string(&level).unwrap(), "7");
    }

    #[test]
    fn validation_error_messages_are_readable() {
        let err = Level::new(12).unwrap_err();
        assert_eq!(err.to_string(), "level must be between 1 and 10, got 12");
        let err = ValidationError::Empty {
            field: "project name",
        };
        assert_eq!(err.to_string(), "project name cannot be empty");
    }
}
