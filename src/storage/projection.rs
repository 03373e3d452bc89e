//! In-memory read-side projections of animals
//!
//! Detail and list views are memoized between lifecycle mutations. The
//! lifecycle engine drops them through the [`CacheInvalidator`] port after
//! every custody change.
//!
//! Meant for long-lived library embedders; the `shelter` binary exits after
//! each command and runs without it.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use anyhow::Result;

use super::filter::AnimalFilter;
use super::store::{Records, StoreResult};
use crate::domain::{Animal, AnimalId};
use crate::engine::CacheInvalidator;

/// Memoized animal detail and list projections
#[derive(Debug, Default)]
pub struct ProjectionCache {
    details: RwLock<HashMap<AnimalId, Animal>>,
    lists: RwLock<HashMap<AnimalFilter, Vec<Animal>>>,
}

impl ProjectionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Animal detail, loaded from the store on a miss
    pub fn animal(&self, records: &Records<'_>, id: AnimalId) -> StoreResult<Option<Animal>> {
        if let Some(hit) = self
            .details
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
        {
            return Ok(Some(hit.clone()));
        }

        let loaded = records.find_animal(id)?;
        if let Some(animal) = &loaded {
            self.details
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(id, animal.clone());
        }
        Ok(loaded)
    }

    /// Animal list for a filter, loaded from the store on a miss
    pub fn animals(&self, records: &Records<'_>, filter: &AnimalFilter) -> StoreResult<Vec<Animal>> {
        if let Some(hit) = self
            .lists
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(filter)
        {
            return Ok(hit.clone());
        }

        let loaded = records.list_animals(filter)?;
        self.lists
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(filter.clone(), loaded.clone());
        Ok(loaded)
    }

    /// Number of memoized detail and list entries
    pub fn len(&self) -> (usize, usize) {
        let details = self.details.read().unwrap_or_else(PoisonError::into_inner).len();
        let lists = self.lists.read().unwrap_or_else(PoisonError::into_inner).len();
        (details, lists)
    }
}

impl CacheInvalidator for ProjectionCache {
    fn invalidate_detail(&self, animal_id: AnimalId) -> Result<()> {
        self.details
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&animal_id);
        tracing::debug!(animal = %animal_id, "invalidated animal detail projection");
        Ok(())
    }

    fn invalidate_list_projections(&self) -> Result<()> {
        self.lists
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        tracing::debug!("invalidated animal list projections");
        Ok(())
    }
}
