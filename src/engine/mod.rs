//! # Lifecycle Engine
//!
//! Enforces the adoption and foster state machines and keeps each animal's
//! custody in step with its requests.
//!
//! ## Operations
//!
//! | Operation | Who | Custody effect |
//! |-----------|-----|----------------|
//! | `create_adoption_request` | any user | none |
//! | `decide_adoption_request` | admin | `ADOPTED` / `AVAILABLE` |
//! | `create_foster_request` | the adopter | none |
//! | `decide_foster_request` | admin | `FOSTERING` / re-derived |
//! | `complete_foster` | requester or admin | re-derived |
//! | `soft_delete_foster` | requester | none |
//! | `record_death` | admin | `DECEASED` |
//!
//! ## Hooks
//!
//! [`Notifier`] fires when a request is created and [`CacheInvalidator`]
//! fires when custody may have changed. Both run after commit; their
//! failures are logged and dropped.

mod error;
mod guard;
mod hooks;
mod lifecycle;
mod timeline;

pub use error::{LifecycleError, Result};
pub use hooks::{
    CacheInvalidator, LogNotifier, NoopCacheInvalidator, NoopNotifier, Notification, Notifier,
    ADOPTION_REQUESTED, FOSTER_REQUESTED,
};
pub use lifecycle::LifecycleEngine;
pub use timeline::TimelineReconstructor;
