//! Adoption request domain model
//!
//! `PENDING -> {APPROVED, REJECTED}`. Both outcomes are terminal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::id::{AdoptionRequestId, AnimalId, UserId};
use super::review::{Review, TransitionError};

/// Status of an adoption request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdoptionStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl AdoptionStatus {
    /// Statuses that block a new adoption request for the same animal
    pub const ACTIVE: [AdoptionStatus; 2] = [AdoptionStatus::Pending, AdoptionStatus::Approved];

    pub fn as_str(&self) -> &'static str {
        match self {
            AdoptionStatus::Pending => "PENDING",
            AdoptionStatus::Approved => "APPROVED",
            AdoptionStatus::Rejected => "REJECTED",
        }
    }

    /// Returns true if a reviewer has decided the request
    pub fn is_decided(&self) -> bool {
        !matches!(self, AdoptionStatus::Pending)
    }

    /// Returns true if the request blocks new requests for the animal
    pub fn is_active(&self) -> bool {
        Self::ACTIVE.contains(self)
    }
}

impl fmt::Display for AdoptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AdoptionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(AdoptionStatus::Pending),
            "APPROVED" => Ok(AdoptionStatus::Approved),
            "REJECTED" => Ok(AdoptionStatus::Rejected),
            _ => Err(format!("Unknown adoption status: '{}'", s)),
        }
    }
}

/// A request to adopt an animal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdoptionRequest {
    pub id: AdoptionRequestId,

    pub animal_id: AnimalId,

    pub requester_id: UserId,

    pub status: AdoptionStatus,

    /// Canonical "adopted at" instant once approved.
    /// Holds the creation time while the request is pending.
    pub decided_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review: Option<Review>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl AdoptionRequest {
    /// Creates a pending request. The id is assigned by the store on insert.
    pub fn new(animal_id: AnimalId, requester_id: UserId, now: DateTime<Utc>) -> Self {
        Self {
            id: AdoptionRequestId::new(0),
            animal_id,
            requester_id,
            status: AdoptionStatus::Pending,
            decided_at: now,
            review: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn refuse(&self, action: &'static str) -> TransitionError {
        TransitionError {
            kind: "adoption",
            action,
            state: self.status.as_str(),
        }
    }

    /// `PENDING -> APPROVED`, stamping the decision time
    pub fn approve(&mut self, review: Review) -> Result<(), TransitionError> {
        if self.status != AdoptionStatus::Pending {
            return Err(self.refuse("approve"));
        }
        self.status = AdoptionStatus::Approved;
        self.decided_at = review.reviewed_at;
        self.updated_at = review.reviewed_at;
        self.review = Some(review);
        Ok(())
    }

    /// `PENDING -> REJECTED`
    pub fn reject(&mut self, review: Review) -> Result<(), TransitionError> {
        if self.status != AdoptionStatus::Pending {
            return Err(self.refuse("reject"));
        }
        self.status = AdoptionStatus::Rejected;
        self.updated_at = review.reviewed_at;
        self.review = Some(review);
        Ok(())
    }
}
