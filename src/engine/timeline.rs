//! Timeline reconstruction
//!
//! Read-only. Loads the latest adoption and every foster request an animal
//! has for one requester, then hands them to the pure merge in
//! [`crate::domain::merge_history`]. It takes no write lock, so a timeline
//! may lag a mutation that is still in flight.

use super::error::{LifecycleError, Result};
use crate::domain::{merge_history, AnimalId, Timeline, UserId};
use crate::storage::{AdoptionFilter, AdoptionOrder, FosterFilter, FosterOrder, Records, Store};

pub struct TimelineReconstructor<'s> {
    records: Records<'s>,
}

impl<'s> TimelineReconstructor<'s> {
    pub fn new(store: &'s Store) -> Self {
        Self {
            records: store.records(),
        }
    }

    /// Builds the ordered history of `animal_id` as seen by `requester_id`
    pub fn build(&self, animal_id: AnimalId, requester_id: UserId) -> Result<Timeline> {
        let animal = self
            .records
            .find_animal(animal_id)?
            .ok_or_else(|| LifecycleError::not_found("animal", animal_id))?;

        let adoption = self.records.find_one_adoption(
            &AdoptionFilter::for_animal(animal_id).requester(requester_id),
            AdoptionOrder::LATEST_DECISION,
        )?;

        // Soft-deleted fosters are still history
        let fosters = match &adoption {
            Some(_) => self.records.list_fosters(
                &FosterFilter::for_animal(animal_id)
                    .requester(requester_id)
                    .with_deleted(),
                FosterOrder::default(),
            )?,
            None => Vec::new(),
        };

        let events = merge_history(adoption.as_ref(), &fosters, animal.shelter_id);
        tracing::debug!(
            animal = %animal_id,
            requester = %requester_id,
            fosters = fosters.len(),
            events = events.len(),
            "timeline built"
        );

        Ok(Timeline::new(events, animal.name, animal.breed))
    }
}
