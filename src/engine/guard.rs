//! Shared precondition checks for lifecycle operations
//!
//! Every check runs inside the caller's write transaction, before anything
//! is written, so a failed guard leaves no trace.

use chrono::{DateTime, Utc};

use super::error::{LifecycleError, Result};
use crate::domain::{
    derive_custody, Actor, AdoptionRequest, AdoptionRequestId, Animal, AnimalId, CustodyState,
    FosterRequest, FosterRequestId, ShelterId, UserId,
};
use crate::storage::Records;

pub(crate) fn load_animal(records: &Records<'_>, id: AnimalId) -> Result<Animal> {
    records
        .find_animal(id)?
        .ok_or_else(|| LifecycleError::not_found("animal", id))
}

pub(crate) fn load_adoption(records: &Records<'_>, id: AdoptionRequestId) -> Result<AdoptionRequest> {
    records
        .find_adoption(id)?
        .ok_or_else(|| LifecycleError::not_found("adoption request", id))
}

pub(crate) fn load_foster(records: &Records<'_>, id: FosterRequestId) -> Result<FosterRequest> {
    records
        .find_foster(id)?
        .ok_or_else(|| LifecycleError::not_found("foster request", id))
}

/// Review actions need an admin whose scope covers the shelter
pub(crate) fn require_reviewer(actor: &Actor, shelter_id: ShelterId, action: &str) -> Result<()> {
    if !actor.is_admin() {
        return Err(LifecycleError::Forbidden(format!(
            "{} may not {}: admin role required",
            actor.requester_id, action
        )));
    }
    if !actor.administers(shelter_id) {
        return Err(LifecycleError::Forbidden(format!(
            "{} may not {}: outside shelter scope",
            actor.requester_id, action
        )));
    }
    Ok(())
}

/// The record's own requester, or a reviewer for its shelter
pub(crate) fn require_owner_or_reviewer(
    actor: &Actor,
    owner: UserId,
    shelter_id: ShelterId,
    action: &str,
) -> Result<()> {
    if actor.requester_id == owner || actor.administers(shelter_id) {
        return Ok(());
    }
    Err(LifecycleError::Forbidden(format!(
        "{} may not {} a request owned by {}",
        actor.requester_id, action, owner
    )))
}

pub(crate) fn require_owner(actor: &Actor, owner: UserId, action: &str) -> Result<()> {
    if actor.requester_id == owner {
        return Ok(());
    }
    Err(LifecycleError::Forbidden(format!(
        "{} may not {} a request owned by {}",
        actor.requester_id, action, owner
    )))
}

/// Deceased animals are frozen
pub(crate) fn ensure_alive(animal: &Animal) -> Result<()> {
    if animal.is_deceased() {
        return Err(LifecycleError::Conflict(format!(
            "animal {} is deceased",
            animal.id
        )));
    }
    Ok(())
}

/// Re-derives custody from the request rows visible in `records` and writes it back.
pub(crate) fn recompute_custody(
    records: &Records<'_>,
    animal_id: AnimalId,
    at: DateTime<Utc>,
) -> Result<Animal> {
    let mut animal = load_animal(records, animal_id)?;
    let facts = records.custody_facts(animal_id)?;
    let next = derive_custody(animal.custody(), facts);
    set_custody(records, &mut animal, next, at)?;
    Ok(animal)
}

pub(crate) fn set_custody(
    records: &Records<'_>,
    animal: &mut Animal,
    next: CustodyState,
    at: DateTime<Utc>,
) -> Result<()> {
    let previous = animal.custody();
    if animal.apply_custody(next, at) {
        records.update_animal_custody(animal)?;
        tracing::debug!(animal = %animal.id, from = %previous, to = %next, "custody changed");
    }
    Ok(())
}
