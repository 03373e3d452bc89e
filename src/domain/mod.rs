//! Domain models for the shelter lifecycle
//!
//! Contains the core business rules without any I/O concerns.

mod id;
mod animal;
mod adoption;
mod foster;
mod actor;
mod review;
mod timeline;

pub use id::{AdoptionRequestId, AnimalId, FosterRequestId, IdError, ShelterId, UserId};
pub use animal::{derive_custody, Animal, CustodyFacts, CustodyState, UnknownCustodyState};
pub use adoption::{AdoptionRequest, AdoptionStatus};
pub use foster::{resolve_start, FosterRequest, FosterStatus};
pub use actor::{Actor, Role};
pub use review::{now, Decision, Review, TransitionError};
pub use timeline::{
    adoption_events, foster_events, merge_history, order_events, Timeline, TimelineEvent,
    TimelineEventKind,
};
