//! Identifier types for animals, requests, users and shelters
//!
//! All identifiers are positive integers assigned by the record store.
//! They are wrapped in distinct newtypes so an animal id can never be
//! passed where a request id is expected.
//!
//! Textual forms accept either the bare number (`42`) or the prefixed
//! display form (`A-42`), so ids copied from CLI output parse back.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum IdError {
    #[error("Invalid {kind} ID: expected a positive integer, got '{value}'")]
    Invalid { kind: &'static str, value: String },
}

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wraps a raw store id
            pub const fn new(raw: i64) -> Self {
                Self(raw)
            }

            /// Returns the raw store id
            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}-{}", $prefix, self.0)
            }
        }

        impl FromStr for $name {
            type Err = IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let trimmed = s.trim();
                let digits = trimmed
                    .strip_prefix(concat!($prefix, "-"))
                    .unwrap_or(trimmed);

                match digits.parse::<i64>() {
                    Ok(raw) if raw > 0 => Ok(Self(raw)),
                    _ => Err(IdError::Invalid {
                        kind: $kind,
                        value: s.to_string(),
                    }),
                }
            }
        }

        impl From<i64> for $name {
            fn from(raw: i64) -> Self {
                Self(raw)
            }
        }
    };
}

record_id!(
    /// Stable identity of an animal
    AnimalId,
    "animal",
    "A"
);

record_id!(
    /// Identity of an adoption request
    AdoptionRequestId,
    "adoption request",
    "AR"
);

record_id!(
    /// Identity of a foster request
    FosterRequestId,
    "foster request",
    "FR"
);

record_id!(
    /// Identity of a requester, reviewer or admin
    UserId,
    "user",
    "U"
);

record_id!(
    /// Identity of a shelter
    ShelterId,
    "shelter",
    "S"
);
