//! Foster request domain model
//!
//! `PENDING -> {ONGOING, REJECTED}`, `ONGOING -> COMPLETED`.
//! Requests are soft-deleted rather than removed so the history survives.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::id::{AnimalId, FosterRequestId, ShelterId, UserId};
use super::review::{Review, TransitionError};

/// Status of a foster request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FosterStatus {
    #[default]
    Pending,
    Ongoing,
    Completed,
    Rejected,
}

impl FosterStatus {
    /// Statuses that block another request for the same animal and requester
    pub const ACTIVE: [FosterStatus; 2] = [FosterStatus::Pending, FosterStatus::Ongoing];

    pub fn as_str(&self) -> &'static str {
        match self {
            FosterStatus::Pending => "PENDING",
            FosterStatus::Ongoing => "ONGOING",
            FosterStatus::Completed => "COMPLETED",
            FosterStatus::Rejected => "REJECTED",
        }
    }

    pub fn is_active(&self) -> bool {
        Self::ACTIVE.contains(self)
    }

    /// Returns true if the request represents actual fostering history
    pub fn has_started(&self) -> bool {
        matches!(self, FosterStatus::Ongoing | FosterStatus::Completed)
    }
}

impl fmt::Display for FosterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FosterStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(FosterStatus::Pending),
            "ONGOING" => Ok(FosterStatus::Ongoing),
            "COMPLETED" => Ok(FosterStatus::Completed),
            "REJECTED" => Ok(FosterStatus::Rejected),
            _ => Err(format!("Unknown foster status: '{}'", s)),
        }
    }
}

/// Resolves the start instant of a new foster request.
///
/// Absent or today's date starts now; any other date starts at its midnight (UTC),
/// so future-dated fostering is never started early.
pub fn resolve_start(start_date: Option<NaiveDate>, now: DateTime<Utc>) -> DateTime<Utc> {
    match start_date {
        Some(date) if date != now.date_naive() => date
            .and_hms_opt(0, 0, 0)
            .map(|midnight| midnight.and_utc())
            .unwrap_or(now),
        _ => now,
    }
}

/// A request by an adopter to have a shelter foster their animal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FosterRequest {
    pub id: FosterRequestId,

    pub animal_id: AnimalId,

    pub requester_id: UserId,

    /// Shelter hosting the animal during the foster period
    pub shelter_id: ShelterId,

    pub status: FosterStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub deleted: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review: Option<Review>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl FosterRequest {
    /// Creates a pending request. The id is assigned by the store on insert.
    pub fn new(
        animal_id: AnimalId,
        requester_id: UserId,
        shelter_id: ShelterId,
        start_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: FosterRequestId::new(0),
            animal_id,
            requester_id,
            shelter_id,
            status: FosterStatus::Pending,
            start_at: Some(start_at),
            end_at: None,
            deleted: false,
            review: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn refuse(&self, action: &'static str) -> TransitionError {
        TransitionError {
            kind: "foster",
            action,
            state: self.status.as_str(),
        }
    }

    /// `PENDING -> ONGOING`; an unset start becomes the review time
    pub fn approve(&mut self, review: Review) -> Result<(), TransitionError> {
        if self.status != FosterStatus::Pending {
            return Err(self.refuse("approve"));
        }
        self.status = FosterStatus::Ongoing;
        if self.start_at.is_none() {
            self.start_at = Some(review.reviewed_at);
        }
        self.updated_at = review.reviewed_at;
        self.review = Some(review);
        Ok(())
    }

    /// `PENDING -> REJECTED`
    pub fn reject(&mut self, review: Review) -> Result<(), TransitionError> {
        if self.status != FosterStatus::Pending {
            return Err(self.refuse("reject"));
        }
        self.status = FosterStatus::Rejected;
        self.updated_at = review.reviewed_at;
        self.review = Some(review);
        Ok(())
    }

    /// `ONGOING -> COMPLETED`, stamping the end time
    pub fn complete(&mut self, now: DateTime<Utc>) -> Result<(), TransitionError> {
        if self.status != FosterStatus::Ongoing {
            return Err(self.refuse("complete"));
        }
        self.status = FosterStatus::Completed;
        self.end_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Logically removes a request that is not ongoing
    pub fn soft_delete(&mut self, now: DateTime<Utc>) -> Result<(), TransitionError> {
        if self.status == FosterStatus::Ongoing {
            return Err(self.refuse("delete"));
        }
        if self.deleted {
            return Err(TransitionError {
                kind: "foster",
                action: "delete",
                state: "DELETED",
            });
        }
        self.deleted = true;
        if self.end_at.is_none() {
            self.end_at = Some(now);
        }
        self.updated_at = now;
        Ok(())
    }

    /// Returns true if the foster period is over.
    ///
    /// Covers completion, an explicit end time, and the defensive case of a
    /// rejected request that had a start recorded.
    pub fn has_ended(&self) -> bool {
        self.status == FosterStatus::Completed
            || self.end_at.is_some()
            || (self.status == FosterStatus::Rejected && self.start_at.is_some())
    }

    /// End instant, falling back to the last update when the state implies termination
    pub fn effective_end(&self) -> DateTime<Utc> {
        self.end_at.unwrap_or(self.updated_at)
    }
}
