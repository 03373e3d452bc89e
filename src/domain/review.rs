//! Review records and transition failures shared by both request kinds

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::id::UserId;

/// A request refused to move from its current state
#[derive(Debug, Error, PartialEq)]
#[error("Cannot {action} {kind} request in state {state}")]
pub struct TransitionError {
    pub kind: &'static str,
    pub action: &'static str,
    pub state: &'static str,
}

/// Reviewer decision on a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Approve,
    Reject,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Approve => "approve",
            Decision::Reject => "reject",
        }
    }
}

/// Who reviewed a request, when, and what they wrote
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub reviewer_id: UserId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,

    pub reviewed_at: DateTime<Utc>,
}

impl Review {
    pub fn new(reviewer_id: UserId, note: Option<String>, reviewed_at: DateTime<Utc>) -> Self {
        Self {
            reviewer_id,
            note: note.filter(|n| !n.trim().is_empty()),
            reviewed_at,
        }
    }
}

/// Current time truncated to the microsecond precision the store keeps
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}
