//! The lifecycle engine
//!
//! The only code allowed to mutate an animal together with its adoption and
//! foster requests. Each operation runs in one immediate write transaction:
//! guards are checked, the request row is written, custody is re-derived and
//! written back, and only then is the transaction committed. Hooks fire after
//! the commit and can never undo it.

use std::sync::Arc;

use chrono::NaiveDate;

use super::error::{conflict_on_constraint, LifecycleError, Result};
use super::guard::{
    ensure_alive, load_adoption, load_animal, load_foster, recompute_custody, require_owner,
    require_owner_or_reviewer, require_reviewer, set_custody,
};
use super::hooks::{
    CacheInvalidator, NoopCacheInvalidator, NoopNotifier, Notification, Notifier,
    ADOPTION_REQUESTED, FOSTER_REQUESTED,
};
use super::timeline::TimelineReconstructor;
use crate::domain::{
    now, resolve_start, Actor, AdoptionRequest, AdoptionRequestId, AdoptionStatus, Animal,
    AnimalId, CustodyState, Decision, FosterRequest, FosterRequestId, FosterStatus, Review,
    ShelterId, Timeline, UserId,
};
use crate::storage::{
    AdoptionFilter, AdoptionOrder, AnimalFilter, FosterFilter, FosterOrder, Records, Store,
};

const ACTIVE_ADOPTION: &str = "active request exists";
const ACTIVE_FOSTER: &str = "active foster request exists for this requester";

/// Drives adoption and foster requests through their state machines
pub struct LifecycleEngine {
    store: Store,
    notifier: Arc<dyn Notifier>,
    cache: Arc<dyn CacheInvalidator>,
}

impl LifecycleEngine {
    /// Creates an engine with no-op hooks
    pub fn new(store: Store) -> Self {
        Self {
            store,
            notifier: Arc::new(NoopNotifier),
            cache: Arc::new(NoopCacheInvalidator),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_cache_invalidator(mut self, cache: Arc<dyn CacheInvalidator>) -> Self {
        self.cache = cache;
        self
    }

    /// Read-only access to the underlying store
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Registers a new animal at a shelter
    pub fn register_animal(
        &mut self,
        name: &str,
        breed: Option<&str>,
        shelter_id: ShelterId,
    ) -> Result<Animal> {
        let animal = self.store.register_animal(name, breed, shelter_id)?;
        self.invalidate(None);
        Ok(animal)
    }

    // --- adoption ---

    /// Opens a `PENDING` adoption request for the acting user
    pub fn create_adoption_request(
        &mut self,
        actor: &Actor,
        animal_id: AnimalId,
    ) -> Result<AdoptionRequest> {
        let at = now();
        let tx = self.store.begin_write()?;
        let records = Records::new(&tx);

        let animal = load_animal(&records, animal_id)?;
        ensure_alive(&animal)?;

        let active = records.count_adoptions(
            &AdoptionFilter::for_animal(animal_id).statuses(&AdoptionStatus::ACTIVE),
        )?;
        if active > 0 {
            return Err(LifecycleError::Conflict(ACTIVE_ADOPTION.to_string()));
        }

        let request = records
            .insert_adoption(&AdoptionRequest::new(animal_id, actor.requester_id, at))
            .map_err(|e| conflict_on_constraint(e, ACTIVE_ADOPTION))?;
        tx.commit()?;

        tracing::info!(
            request = %request.id,
            animal = %animal_id,
            requester = %actor.requester_id,
            "adoption requested"
        );

        self.notify(Notification {
            event_type: ADOPTION_REQUESTED.to_string(),
            animal_id,
            requester_id: actor.requester_id,
            shelter_id: animal.shelter_id,
            payload: serde_json::json!({
                "request_id": request.id,
                "animal_name": animal.name,
            }),
            at,
        });
        if let Err(err) = self.cache.invalidate_list_projections() {
            tracing::warn!(error = %format!("{err:#}"), "list projection invalidation failed");
        }

        Ok(request)
    }

    /// Approves or rejects a `PENDING` adoption request
    pub fn decide_adoption_request(
        &mut self,
        actor: &Actor,
        request_id: AdoptionRequestId,
        decision: Decision,
        note: Option<String>,
    ) -> Result<AdoptionRequest> {
        let at = now();
        let tx = self.store.begin_write()?;
        let records = Records::new(&tx);

        let mut request = load_adoption(&records, request_id)?;
        let mut animal = load_animal(&records, request.animal_id)?;
        require_reviewer(actor, animal.shelter_id, decision.as_str())?;

        let review = Review::new(actor.requester_id, note, at);
        match decision {
            Decision::Approve => {
                ensure_alive(&animal)?;
                request.approve(review)?;
                records.update_adoption(&request)?;
                recompute_custody(&records, animal.id, at)?;
            }
            Decision::Reject => {
                request.reject(review)?;
                records.update_adoption(&request)?;
                // Rejection releases the animal outright
                if !animal.is_deceased() {
                    set_custody(&records, &mut animal, CustodyState::Available, at)?;
                }
            }
        }
        tx.commit()?;

        tracing::info!(
            request = %request.id,
            animal = %request.animal_id,
            status = %request.status,
            reviewer = %actor.requester_id,
            "adoption request decided"
        );
        self.invalidate(Some(request.animal_id));

        Ok(request)
    }

    // --- fostering ---

    /// Opens a `PENDING` foster request for the adopter of an animal.
    ///
    /// The start resolves to now when `start_date` is absent or today, and to
    /// midnight UTC of `start_date` otherwise.
    pub fn create_foster_request(
        &mut self,
        actor: &Actor,
        animal_id: AnimalId,
        hosting_shelter: ShelterId,
        start_date: Option<NaiveDate>,
    ) -> Result<FosterRequest> {
        let at = now();
        let tx = self.store.begin_write()?;
        let records = Records::new(&tx);

        let animal = load_animal(&records, animal_id)?;
        ensure_alive(&animal)?;

        let owns = records.count_adoptions(
            &AdoptionFilter::for_animal(animal_id)
                .requester(actor.requester_id)
                .statuses(&[AdoptionStatus::Approved]),
        )?;
        if owns == 0 {
            return Err(LifecycleError::Forbidden(format!(
                "{} holds no approved adoption for animal {}",
                actor.requester_id, animal_id
            )));
        }

        if animal.custody() != CustodyState::Adopted {
            return Err(LifecycleError::Conflict(format!(
                "animal {} is {}, not ADOPTED",
                animal_id,
                animal.custody()
            )));
        }

        let active = records.count_fosters(
            &FosterFilter::for_animal(animal_id)
                .requester(actor.requester_id)
                .statuses(&FosterStatus::ACTIVE),
        )?;
        if active > 0 {
            return Err(LifecycleError::Conflict(ACTIVE_FOSTER.to_string()));
        }

        let draft = FosterRequest::new(
            animal_id,
            actor.requester_id,
            hosting_shelter,
            resolve_start(start_date, at),
            at,
        );
        let request = records
            .insert_foster(&draft)
            .map_err(|e| conflict_on_constraint(e, ACTIVE_FOSTER))?;
        tx.commit()?;

        tracing::info!(
            request = %request.id,
            animal = %animal_id,
            requester = %actor.requester_id,
            shelter = %hosting_shelter,
            "foster requested"
        );

        self.notify(Notification {
            event_type: FOSTER_REQUESTED.to_string(),
            animal_id,
            requester_id: actor.requester_id,
            shelter_id: hosting_shelter,
            payload: serde_json::json!({
                "request_id": request.id,
                "start_at": request.start_at,
            }),
            at,
        });

        Ok(request)
    }

    /// Approves (`PENDING -> ONGOING`) or rejects a foster request
    pub fn decide_foster_request(
        &mut self,
        actor: &Actor,
        request_id: FosterRequestId,
        decision: Decision,
        note: Option<String>,
    ) -> Result<FosterRequest> {
        let at = now();
        let tx = self.store.begin_write()?;
        let records = Records::new(&tx);

        let mut request = load_foster(&records, request_id)?;
        require_reviewer(actor, request.shelter_id, decision.as_str())?;
        if request.deleted {
            return Err(LifecycleError::InvalidState(format!(
                "Cannot {} deleted foster request {}",
                decision.as_str(),
                request.id
            )));
        }

        let review = Review::new(actor.requester_id, note, at);
        match decision {
            Decision::Approve => {
                ensure_alive(&load_animal(&records, request.animal_id)?)?;
                request.approve(review)?;
            }
            Decision::Reject => request.reject(review)?,
        }
        records.update_foster(&request)?;

        // Another requester's ongoing foster keeps the animal FOSTERING
        recompute_custody(&records, request.animal_id, at)?;
        tx.commit()?;

        tracing::info!(
            request = %request.id,
            animal = %request.animal_id,
            status = %request.status,
            reviewer = %actor.requester_id,
            "foster request decided"
        );
        self.invalidate(Some(request.animal_id));

        Ok(request)
    }

    /// Ends an `ONGOING` foster period
    pub fn complete_foster(
        &mut self,
        actor: &Actor,
        request_id: FosterRequestId,
    ) -> Result<FosterRequest> {
        let at = now();
        let tx = self.store.begin_write()?;
        let records = Records::new(&tx);

        let mut request = load_foster(&records, request_id)?;
        require_owner_or_reviewer(actor, request.requester_id, request.shelter_id, "complete")?;

        request.complete(at)?;
        records.update_foster(&request)?;
        let animal = recompute_custody(&records, request.animal_id, at)?;
        tx.commit()?;

        tracing::info!(
            request = %request.id,
            animal = %request.animal_id,
            custody = %animal.custody(),
            "foster completed"
        );
        self.invalidate(Some(request.animal_id));

        Ok(request)
    }

    /// Logically removes a foster request the actor owns.
    ///
    /// Custody is untouched: a request that is not `ONGOING` no longer
    /// contributes to it.
    pub fn soft_delete_foster(
        &mut self,
        actor: &Actor,
        request_id: FosterRequestId,
    ) -> Result<FosterRequest> {
        let at = now();
        let tx = self.store.begin_write()?;
        let records = Records::new(&tx);

        let mut request = load_foster(&records, request_id)?;
        require_owner(actor, request.requester_id, "delete")?;
        if request.status == FosterStatus::Ongoing {
            return Err(LifecycleError::Conflict(format!(
                "foster request {} is ONGOING; complete it first",
                request.id
            )));
        }

        request.soft_delete(at)?;
        records.update_foster(&request)?;
        tx.commit()?;

        tracing::info!(request = %request.id, animal = %request.animal_id, "foster request deleted");
        Ok(request)
    }

    // --- animal ---

    /// Marks an animal `DECEASED`. Terminal.
    pub fn record_death(&mut self, actor: &Actor, animal_id: AnimalId) -> Result<Animal> {
        let at = now();
        let tx = self.store.begin_write()?;
        let records = Records::new(&tx);

        let mut animal = load_animal(&records, animal_id)?;
        require_reviewer(actor, animal.shelter_id, "record death")?;
        ensure_alive(&animal)?;

        let ongoing = records.count_fosters(
            &FosterFilter::for_animal(animal_id).statuses(&[FosterStatus::Ongoing]),
        )?;
        if ongoing > 0 {
            return Err(LifecycleError::Conflict(format!(
                "animal {} has an ONGOING foster; complete it first",
                animal_id
            )));
        }

        set_custody(&records, &mut animal, CustodyState::Deceased, at)?;
        tx.commit()?;

        tracing::info!(animal = %animal_id, reviewer = %actor.requester_id, "death recorded");
        self.invalidate(Some(animal_id));

        Ok(animal)
    }

    // --- reads ---

    pub fn animal(&self, animal_id: AnimalId) -> Result<Animal> {
        load_animal(&self.store.records(), animal_id)
    }

    pub fn animals(&self, filter: &AnimalFilter) -> Result<Vec<Animal>> {
        Ok(self.store.records().list_animals(filter)?)
    }

    pub fn adoption_requests(&self, filter: &AdoptionFilter) -> Result<Vec<AdoptionRequest>> {
        Ok(self
            .store
            .records()
            .list_adoptions(filter, AdoptionOrder::default())?)
    }

    /// Foster requests, soft-deleted ones only if the filter asks for them
    pub fn foster_requests(&self, filter: &FosterFilter) -> Result<Vec<FosterRequest>> {
        Ok(self
            .store
            .records()
            .list_fosters(filter, FosterOrder::default())?)
    }

    /// Number of adoption and foster requests still awaiting or in effect
    pub fn active_request_count(&self, animal_id: AnimalId) -> Result<usize> {
        let records = self.store.records();
        let adoptions = records.count_adoptions(
            &AdoptionFilter::for_animal(animal_id).statuses(&AdoptionStatus::ACTIVE),
        )?;
        let fosters = records.count_fosters(
            &FosterFilter::for_animal(animal_id).statuses(&FosterStatus::ACTIVE),
        )?;
        Ok(adoptions + fosters)
    }

    /// Reconstructs the history of one animal for one requester
    pub fn timeline(&self, animal_id: AnimalId, requester_id: UserId) -> Result<Timeline> {
        TimelineReconstructor::new(&self.store).build(animal_id, requester_id)
    }

    // --- hooks ---

    fn notify(&self, notification: Notification) {
        if let Err(err) = self.notifier.notify(&notification) {
            tracing::warn!(
                error = %format!("{err:#}"),
                event = %notification.event_type,
                animal = %notification.animal_id,
                "notification failed"
            );
        }
    }

    fn invalidate(&self, animal_id: Option<AnimalId>) {
        if let Some(animal_id) = animal_id {
            if let Err(err) = self.cache.invalidate_detail(animal_id) {
                tracing::warn!(error = %format!("{err:#}"), animal = %animal_id, "detail invalidation failed");
            }
        }
        if let Err(err) = self.cache.invalidate_list_projections() {
            tracing::warn!(error = %format!("{err:#}"), "list projection invalidation failed");
        }
    }
}
