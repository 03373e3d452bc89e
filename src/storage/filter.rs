//! Filter and ordering primitives for record queries
//!
//! Filters are conjunctions of equality and "in" predicates on indexed
//! columns. Each filter renders to a `WHERE` clause with positional
//! parameters so values are never spliced into SQL text.

use rusqlite::types::Value;

use crate::domain::{AdoptionStatus, AnimalId, CustodyState, FosterStatus, ShelterId, UserId};

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    fn sql(self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

/// Ordering for adoption request queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdoptionOrder {
    DecidedAt(Direction),
    CreatedAt(Direction),
}

impl AdoptionOrder {
    /// Most recent decision first
    pub const LATEST_DECISION: AdoptionOrder = AdoptionOrder::DecidedAt(Direction::Desc);

    pub(crate) fn sql(self) -> String {
        match self {
            AdoptionOrder::DecidedAt(dir) => {
                format!(" ORDER BY decided_at {0}, id {0}", dir.sql())
            }
            AdoptionOrder::CreatedAt(dir) => {
                format!(" ORDER BY created_at {0}, id {0}", dir.sql())
            }
        }
    }
}

impl Default for AdoptionOrder {
    fn default() -> Self {
        AdoptionOrder::CreatedAt(Direction::Asc)
    }
}

/// Ordering for foster request queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FosterOrder {
    /// Requests without a start time sort last in either direction
    StartAt(Direction),
    CreatedAt(Direction),
}

impl FosterOrder {
    pub(crate) fn sql(self) -> String {
        match self {
            FosterOrder::StartAt(dir) => {
                format!(" ORDER BY start_at IS NULL, start_at {0}, id {0}", dir.sql())
            }
            FosterOrder::CreatedAt(dir) => {
                format!(" ORDER BY created_at {0}, id {0}", dir.sql())
            }
        }
    }
}

impl Default for FosterOrder {
    fn default() -> Self {
        FosterOrder::StartAt(Direction::Asc)
    }
}

/// Accumulates `WHERE` predicates and their bound values
#[derive(Debug, Default)]
pub(crate) struct Where {
    clauses: Vec<String>,
    values: Vec<Value>,
}

impl Where {
    fn eq(&mut self, column: &str, value: impl Into<Value>) {
        self.clauses.push(format!("{} = ?", column));
        self.values.push(value.into());
    }

    fn any_of(&mut self, column: &str, values: impl IntoIterator<Item = Value>) {
        let values: Vec<Value> = values.into_iter().collect();
        if values.is_empty() {
            return;
        }
        let placeholders = vec!["?"; values.len()].join(", ");
        self.clauses.push(format!("{} IN ({})", column, placeholders));
        self.values.extend(values);
    }

    fn raw(&mut self, clause: &str) {
        self.clauses.push(clause.to_string());
    }

    /// Renders ` WHERE ...`, or an empty string when unconstrained
    pub(crate) fn sql(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clauses.join(" AND "))
        }
    }

    pub(crate) fn values(&self) -> &[Value] {
        &self.values
    }
}

fn text(s: &str) -> Value {
    Value::Text(s.to_string())
}

/// Filter over animals
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct AnimalFilter {
    pub shelter_id: Option<ShelterId>,
    pub custody: Vec<CustodyState>,
}

impl AnimalFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn shelter(mut self, shelter_id: ShelterId) -> Self {
        self.shelter_id = Some(shelter_id);
        self
    }

    pub fn custody(mut self, states: &[CustodyState]) -> Self {
        self.custody = states.to_vec();
        self
    }

    pub(crate) fn to_where(&self) -> Where {
        let mut w = Where::default();
        if let Some(shelter) = self.shelter_id {
            w.eq("shelter_id", shelter.get());
        }
        w.any_of("custody", self.custody.iter().map(|s| text(s.as_str())));
        w
    }
}

/// Filter over adoption requests
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdoptionFilter {
    pub animal_id: Option<AnimalId>,
    pub requester_id: Option<UserId>,
    pub statuses: Vec<AdoptionStatus>,
}

impl AdoptionFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn for_animal(animal_id: AnimalId) -> Self {
        Self {
            animal_id: Some(animal_id),
            ..Self::default()
        }
    }

    pub fn requester(mut self, requester_id: UserId) -> Self {
        self.requester_id = Some(requester_id);
        self
    }

    pub fn statuses(mut self, statuses: &[AdoptionStatus]) -> Self {
        self.statuses = statuses.to_vec();
        self
    }

    pub(crate) fn to_where(&self) -> Where {
        let mut w = Where::default();
        if let Some(animal) = self.animal_id {
            w.eq("animal_id", animal.get());
        }
        if let Some(requester) = self.requester_id {
            w.eq("requester_id", requester.get());
        }
        w.any_of("status", self.statuses.iter().map(|s| text(s.as_str())));
        w
    }
}

/// Filter over foster requests. Soft-deleted rows are excluded unless asked for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FosterFilter {
    pub animal_id: Option<AnimalId>,
    pub requester_id: Option<UserId>,
    pub shelter_id: Option<ShelterId>,
    pub statuses: Vec<FosterStatus>,
    pub include_deleted: bool,
}

impl FosterFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn for_animal(animal_id: AnimalId) -> Self {
        Self {
            animal_id: Some(animal_id),
            ..Self::default()
        }
    }

    pub fn requester(mut self, requester_id: UserId) -> Self {
        self.requester_id = Some(requester_id);
        self
    }

    pub fn shelter(mut self, shelter_id: ShelterId) -> Self {
        self.shelter_id = Some(shelter_id);
        self
    }

    pub fn statuses(mut self, statuses: &[FosterStatus]) -> Self {
        self.statuses = statuses.to_vec();
        self
    }

    pub fn with_deleted(mut self) -> Self {
        self.include_deleted = true;
        self
    }

    pub(crate) fn to_where(&self) -> Where {
        let mut w = Where::default();
        if let Some(animal) = self.animal_id {
            w.eq("animal_id", animal.get());
        }
        if let Some(requester) = self.requester_id {
            w.eq("requester_id", requester.get());
        }
        if let Some(shelter) = self.shelter_id {
            w.eq("shelter_id", shelter.get());
        }
        w.any_of("status", self.statuses.iter().map(|s| text(s.as_str())));
        if !self.include_deleted {
            w.raw("deleted = 0");
        }
        w
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_filter_has_no_where() {
        let w = AdoptionFilter::all().to_where();
        assert_eq!(w.sql(), "");
        assert!(w.values().is_empty());
    }

    #[test]
    fn adoption_filter_renders_predicates() {
        let w = AdoptionFilter::for_animal(AnimalId::new(1))
            .requester(UserId::new(10))
            .statuses(&AdoptionStatus::ACTIVE)
            .to_where();

        assert_eq!(
            w.sql(),
            " WHERE animal_id = ? AND requester_id = ? AND status IN (?, ?)"
        );
        assert_eq!(
            w.values(),
            &[
                Value::Integer(1),
                Value::Integer(10),
                Value::Text("PENDING".to_string()),
                Value::Text("APPROVED".to_string()),
            ]
        );
    }

    #[test]
    fn foster_filter_hides_deleted_by_default() {
        let w = FosterFilter::for_animal(AnimalId::new(2)).to_where();
        assert_eq!(w.sql(), " WHERE animal_id = ? AND deleted = 0");

        let w = FosterFilter::for_animal(AnimalId::new(2)).with_deleted().to_where();
        assert_eq!(w.sql(), " WHERE animal_id = ?");
    }

    #[test]
    fn animal_filter_by_custody() {
        let w = AnimalFilter::all()
            .shelter(ShelterId::new(5))
            .custody(&[CustodyState::Available])
            .to_where();
        assert_eq!(w.sql(), " WHERE shelter_id = ? AND custody IN (?)");
    }

    #[test]
    fn orderings() {
        assert_eq!(
            AdoptionOrder::LATEST_DECISION.sql(),
            " ORDER BY decided_at DESC, id DESC"
        );
        assert_eq!(
            FosterOrder::default().sql(),
            " ORDER BY start_at IS NULL, start_at ASC, id ASC"
        );
    }
}
