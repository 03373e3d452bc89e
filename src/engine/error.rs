//! Error taxonomy for lifecycle operations
//!
//! Business-rule failures are raised before anything is written and are
//! never retried. Each variant carries a stable code for callers.

use thiserror::Error;

use crate::domain::TransitionError;
use crate::storage::StoreError;

pub type Result<T> = std::result::Result<T, LifecycleError>;

#[derive(Debug, Error)]
pub enum LifecycleError {
    /// Referenced animal or request does not exist
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },

    /// The request is not in a state that permits the operation
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// A duplicate-active-request guard tripped, or the animal is already in the target state
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Ownership, role or shelter-scope check failed
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

impl LifecycleError {
    pub(crate) fn not_found(kind: &'static str, id: impl ToString) -> Self {
        LifecycleError::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    /// Stable machine-readable category
    pub fn code(&self) -> &'static str {
        match self {
            LifecycleError::NotFound { .. } => "NOT_FOUND",
            LifecycleError::InvalidState(_) => "INVALID_STATE",
            LifecycleError::Conflict(_) => "CONFLICT",
            LifecycleError::Forbidden(_) => "FORBIDDEN",
            LifecycleError::Storage(_) => "STORAGE",
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, LifecycleError::NotFound { .. })
    }

    pub fn is_invalid_state(&self) -> bool {
        matches!(self, LifecycleError::InvalidState(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, LifecycleError::Conflict(_))
    }

    pub fn is_forbidden(&self) -> bool {
        matches!(self, LifecycleError::Forbidden(_))
    }
}

impl From<TransitionError> for LifecycleError {
    fn from(err: TransitionError) -> Self {
        LifecycleError::InvalidState(err.to_string())
    }
}

impl From<rusqlite::Error> for LifecycleError {
    fn from(err: rusqlite::Error) -> Self {
        LifecycleError::Storage(StoreError::from(err))
    }
}

/// Maps a constraint violation from the store's uniqueness backstop to a conflict
pub(crate) fn conflict_on_constraint(err: StoreError, message: &str) -> LifecycleError {
    if err.is_constraint_violation() {
        LifecycleError::Conflict(message.to_string())
    } else {
        LifecycleError::Storage(err)
    }
}
