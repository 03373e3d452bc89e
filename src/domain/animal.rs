//! Animal domain model
//!
//! An animal's custody state is derived, never set directly: it follows
//! from the decided adoption and foster requests recorded for the animal.
//! Only the lifecycle engine writes it back to the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::id::{AnimalId, ShelterId};

#[derive(Debug, Error, PartialEq)]
#[error("Unknown custody state: '{0}'")]
pub struct UnknownCustodyState(pub String);

/// Current care arrangement of an animal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CustodyState {
    #[default]
    Available,
    Adopted,
    Fostering,
    /// Legacy marker for animals whose foster ended before custody was derived.
    /// Derivation never produces it.
    FosterEnded,
    Deceased,
}

impl CustodyState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CustodyState::Available => "AVAILABLE",
            CustodyState::Adopted => "ADOPTED",
            CustodyState::Fostering => "FOSTERING",
            CustodyState::FosterEnded => "FOSTER_ENDED",
            CustodyState::Deceased => "DECEASED",
        }
    }

    /// Returns true if no lifecycle operation may touch the animal anymore
    pub fn is_terminal(&self) -> bool {
        matches!(self, CustodyState::Deceased)
    }
}

impl fmt::Display for CustodyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CustodyState {
    type Err = UnknownCustodyState;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "AVAILABLE" => Ok(CustodyState::Available),
            "ADOPTED" => Ok(CustodyState::Adopted),
            "FOSTERING" => Ok(CustodyState::Fostering),
            "FOSTER_ENDED" => Ok(CustodyState::FosterEnded),
            "DECEASED" => Ok(CustodyState::Deceased),
            _ => Err(UnknownCustodyState(s.to_string())),
        }
    }
}

/// Facts about an animal's requests that determine its custody state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CustodyFacts {
    /// An adoption request for the animal is `APPROVED`
    pub approved_adoption: bool,
    /// Number of non-deleted `ONGOING` foster requests for the animal
    pub ongoing_fosters: usize,
}

/// Derives custody from the current state and the request facts.
///
/// `DECEASED` is sticky. Otherwise any ongoing foster means `FOSTERING`,
/// an approved adoption means `ADOPTED`, and everything else is `AVAILABLE`.
pub fn derive_custody(current: CustodyState, facts: CustodyFacts) -> CustodyState {
    if current.is_terminal() {
        return current;
    }

    if facts.ongoing_fosters > 0 {
        CustodyState::Fostering
    } else if facts.approved_adoption {
        CustodyState::Adopted
    } else {
        CustodyState::Available
    }
}

/// A registered animal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Animal {
    /// Stable identifier
    pub id: AnimalId,

    /// Display name
    pub name: String,

    /// Breed, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breed: Option<String>,

    /// Owning shelter
    pub shelter_id: ShelterId,

    /// Derived custody state (written only by the lifecycle engine)
    pub(crate) custody: CustodyState,

    /// When the animal was registered
    pub registered_at: DateTime<Utc>,

    /// When the custody state last changed
    pub updated_at: DateTime<Utc>,
}

impl Animal {
    /// Returns the current custody state
    pub fn custody(&self) -> CustodyState {
        self.custody
    }

    /// Applies a derived custody state. Returns true if it changed.
    pub(crate) fn apply_custody(&mut self, next: CustodyState, at: DateTime<Utc>) -> bool {
        if self.custody == next {
            return false;
        }
        self.custody = next;
        self.updated_at = at;
        true
    }

    /// Returns true if the animal is dead and frozen against further lifecycle changes
    pub fn is_deceased(&self) -> bool {
        self.custody == CustodyState::Deceased
    }
}
