//! Shelter lifecycle - adoption and foster state machines for animal shelters
//!
//! Animals move between custody states (available, adopted, fostering,
//! deceased) through two approval workflows. The [`engine`] keeps each
//! animal's custody derived from its requests and reconstructs a per-requester
//! timeline of what happened to it.

pub mod domain;
pub mod storage;
pub mod engine;
pub mod cli;

pub use domain::{Actor, Animal, AnimalId, CustodyState, Role, Timeline, UserId};
pub use engine::{LifecycleEngine, LifecycleError, TimelineReconstructor};
