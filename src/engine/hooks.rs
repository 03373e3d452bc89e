//! Side-effect ports fired by the lifecycle engine
//!
//! Both hooks are best-effort. The engine calls them only after a
//! transaction commits, and a failing hook is logged and otherwise ignored.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{AnimalId, ShelterId, UserId};

/// Event type for a newly created adoption request
pub const ADOPTION_REQUESTED: &str = "adoption_requested";

/// Event type for a newly created foster request
pub const FOSTER_REQUESTED: &str = "foster_requested";

/// A fire-and-forget notification about a new request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub event_type: String,
    pub animal_id: AnimalId,
    pub requester_id: UserId,
    pub shelter_id: ShelterId,
    pub payload: serde_json::Value,
    pub at: DateTime<Utc>,
}

/// Delivers notifications (push, email, outbox...)
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: &Notification) -> Result<()>;
}

/// Drops stale read-side projections
pub trait CacheInvalidator: Send + Sync {
    fn invalidate_detail(&self, animal_id: AnimalId) -> Result<()>;

    fn invalidate_list_projections(&self) -> Result<()>;
}

/// Notifier that does nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, _notification: &Notification) -> Result<()> {
        Ok(())
    }
}

/// Invalidator for callers without read-side projections
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCacheInvalidator;

impl CacheInvalidator for NoopCacheInvalidator {
    fn invalidate_detail(&self, _animal_id: AnimalId) -> Result<()> {
        Ok(())
    }

    fn invalidate_list_projections(&self) -> Result<()> {
        Ok(())
    }
}

/// Notifier that emits each notification as a tracing event
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: &Notification) -> Result<()> {
        tracing::info!(
            event = %notification.event_type,
            animal = %notification.animal_id,
            requester = %notification.requester_id,
            shelter = %notification.shelter_id,
            payload = %notification.payload,
            "notification"
        );
        Ok(())
    }
}
