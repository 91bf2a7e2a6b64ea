//! Labelled enums for the categorical session fields.
//!
//! Each enum's label is the single source of truth for its string form: it is
//! what gets stored, serialized, and printed. Parsing is lenient about case and
//! accepts `-`/`_` in place of spaces so CLI arguments like `personal-project`
//! resolve to `Personal Project`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::types::ValidationError;

macro_rules! labelled_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal {
            $( $(#[$vmeta:meta])* $variant:ident => $label:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// Human-readable label used for storage and display.
            #[must_use]
            pub const fn label(self) -> &'static str {
                match self {
                    $(Self::$variant => $label),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        }

        impl FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = normalize_label(s);
                Self::ALL
                    .iter()
                    .copied()
                    .find(|variant| normalize_label(variant.label()) == wanted)
                    .ok_or_else(|| ValidationError::UnknownLabel {
                        kind: $kind,
                        value: s.to_string(),
                    })
            }
        }

        impl Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.serialize_str(self.label())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

fn normalize_label(s: &str) -> String {
    s.trim()
        .chars()
        .map(|c| match c {
            '-' | '_' => ' ',
            c => c.to_ascii_lowercase(),
        })
        .collect()
}

labelled_enum!(
    /// The life-area a session belongs to.
    Domain, "domain" {
        Work => "Work",
        PersonalProject => "Personal Project",
        College => "College",
        Learning => "Learning",
        Admin => "Admin",
        Health => "Health",
        Relationships => "Relationships",
    }
);

labelled_enum!(
    /// Cognitive mode of a session.
    WorkType, "work type" {
        Deep => "Deep",
        Shallow => "Shallow",
        Maintenance => "Maintenance",
        Recovery => "Recovery",
        /// Not yet known; usually corrected after the session ends.
        Unknown => "Unknown",
    }
);

labelled_enum!(
    /// Headline outcome of a finished session.
    CompletionStatus, "completion status" {
        Completed => "Completed",
        GoodProgress => "Good progress",
        MinorProgress => "Minor progress",
        Blocked => "Blocked",
        Abandoned => "Abandoned",
    }
);

labelled_enum!(
    /// A loggable meal slot.
    Meal, "meal" {
        Breakfast => "breakfast",
        Lunch => "lunch",
        Dinner => "dinner",
    }
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_all_variants() {
        for domain in Domain::ALL {
            let parsed: Domain = domain.to_string().parse().expect("should parse");
            assert_eq!(parsed, *domain);
        }
        for work_type in WorkType::ALL {
            let parsed: WorkType = work_type.to_string().parse().expect("should parse");
            assert_eq!(parsed, *work_type);
        }
        for status in CompletionStatus::ALL {
            let parsed: CompletionStatus = status.to_string().parse().expect("should parse");
            assert_eq!(parsed, *status);
        }
    }

    #[test]
    fn parsing_accepts_cli_spellings() {
        assert_eq!(
            "personal-project".parse::<Domain>().unwrap(),
            Domain::PersonalProject
        );
        assert_eq!(
            "GOOD_PROGRESS".parse::<CompletionStatus>().unwrap(),
            CompletionStatus::GoodProgress
        );
        assert_eq!("deep".parse::<WorkType>().unwrap(), WorkType::Deep);
        assert_eq!("Lunch".parse::<Meal>().unwrap(), Meal::Lunch);
    }

    #[test]
    fn unknown_label_errors() {
        let err = "napping".parse::<WorkType>().unwrap_err();
        assert_eq!(err.to_string(), "unknown work type: napping");
    }

    #[test]
    fn serializes_as_label() {
        let json = serde_json::to_string(&Domain::PersonalProject).unwrap();
        assert_eq!(json, "\"Personal Project\"");
        let parsed: CompletionStatus = serde_json::from_str("\"Minor progress\"").unwrap();
        assert_eq!(parsed, CompletionStatus::MinorProgress);
    }
}
