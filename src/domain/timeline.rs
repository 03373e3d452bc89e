//! Timeline events and the merge of adoption and foster history
//!
//! Building a timeline is two-phase: each source (the adoption, the foster
//! requests) contributes its own event list, then a single stable sort with an
//! explicit tie-break key orders everything and assigns sequence numbers.
//! Nothing here touches storage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use super::adoption::{AdoptionRequest, AdoptionStatus};
use super::foster::{FosterRequest, FosterStatus};
use super::id::ShelterId;

/// Kind of lifecycle milestone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimelineEventKind {
    Adopted,
    FosterStarted,
    FosterEnded,
}

impl TimelineEventKind {
    /// Tie-break rank for events sharing a timestamp; causally prior kinds sort first
    pub fn priority(&self) -> u8 {
        match self {
            TimelineEventKind::Adopted => 0,
            TimelineEventKind::FosterStarted => 1,
            TimelineEventKind::FosterEnded => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TimelineEventKind::Adopted => "ADOPTED",
            TimelineEventKind::FosterStarted => "FOSTER_STARTED",
            TimelineEventKind::FosterEnded => "FOSTER_ENDED",
        }
    }
}

impl fmt::Display for TimelineEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One derived, read-only lifecycle milestone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEvent {
    /// 1-based position after global ordering (0 until ordered)
    pub sequence: u32,

    pub kind: TimelineEventKind,

    pub at: DateTime<Utc>,

    pub description: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shelter_id: Option<ShelterId>,

    /// Human-readable status label
    pub status: String,
}

impl TimelineEvent {
    fn new(
        kind: TimelineEventKind,
        at: DateTime<Utc>,
        description: String,
        shelter_id: Option<ShelterId>,
        status: &str,
    ) -> Self {
        Self {
            sequence: 0,
            kind,
            at,
            description,
            shelter_id,
            status: status.to_string(),
        }
    }

    /// Global ordering key: timestamp, then kind priority, then description
    pub fn ordering(&self, other: &Self) -> Ordering {
        self.at
            .cmp(&other.at)
            .then_with(|| self.kind.priority().cmp(&other.kind.priority()))
            .then_with(|| self.description.cmp(&other.description))
    }
}

/// Reconstructed history of one animal for one requester
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    pub timeline: Vec<TimelineEvent>,
    pub total: usize,
    pub animal_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub animal_breed: Option<String>,
}

impl Timeline {
    pub fn new(events: Vec<TimelineEvent>, animal_name: String, animal_breed: Option<String>) -> Self {
        Self {
            total: events.len(),
            timeline: events,
            animal_name,
            animal_breed,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.timeline.is_empty()
    }

    /// Event kinds in order
    pub fn kinds(&self) -> Vec<TimelineEventKind> {
        self.timeline.iter().map(|e| e.kind).collect()
    }
}

/// Events contributed by the adoption: one `ADOPTED` at the decision instant if approved
pub fn adoption_events(adoption: &AdoptionRequest, shelter_id: ShelterId) -> Vec<TimelineEvent> {
    if adoption.status != AdoptionStatus::Approved {
        return Vec::new();
    }

    vec![TimelineEvent::new(
        TimelineEventKind::Adopted,
        adoption.decided_at,
        format!("Adopted by {}", adoption.requester_id),
        Some(shelter_id),
        "adopted",
    )]
}

/// Events contributed by foster requests.
///
/// Requests starting on a day before the adoption was decided are stale
/// leftovers of an earlier adoption cycle and are dropped. Only requests that
/// actually started (`ONGOING`/`COMPLETED`) produce events.
pub fn foster_events(fosters: &[FosterRequest], adopted_at: DateTime<Utc>) -> Vec<TimelineEvent> {
    let adopted_on = adopted_at.date_naive();
    let mut events = Vec::new();

    for foster in fosters {
        let Some(start) = foster.start_at else {
            continue;
        };
        if start.date_naive() < adopted_on {
            continue;
        }
        if !foster.status.has_started() {
            continue;
        }

        let started_label = if foster.status == FosterStatus::Ongoing {
            "fostering"
        } else {
            "foster ended"
        };
        events.push(TimelineEvent::new(
            TimelineEventKind::FosterStarted,
            start,
            format!("Foster {} started at {}", foster.id, foster.shelter_id),
            Some(foster.shelter_id),
            started_label,
        ));

        if foster.has_ended() {
            events.push(TimelineEvent::new(
                TimelineEventKind::FosterEnded,
                foster.effective_end(),
                format!("Foster {} ended at {}", foster.id, foster.shelter_id),
                Some(foster.shelter_id),
                "foster ended",
            ));
        }
    }

    events
}

/// Sorts events by the global ordering key and numbers them 1..N
pub fn order_events(mut events: Vec<TimelineEvent>) -> Vec<TimelineEvent> {
    events.sort_by(|a, b| a.ordering(b));
    for (index, event) in events.iter_mut().enumerate() {
        event.sequence = index as u32 + 1;
    }
    events
}

/// Merges an adoption and its foster history into ordered events.
///
/// An absent or rejected adoption has no visible history.
pub fn merge_history(
    adoption: Option<&AdoptionRequest>,
    fosters: &[FosterRequest],
    shelter_id: ShelterId,
) -> Vec<TimelineEvent> {
    let Some(adoption) = adoption else {
        return Vec::new();
    };
    if adoption.status == AdoptionStatus::Rejected {
        return Vec::new();
    }

    let mut events = adoption_events(adoption, shelter_id);
    events.extend(foster_events(fosters, adoption.decided_at));
    order_events(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::id::{AnimalId, FosterRequestId, UserId};
    use crate::domain::review::Review;
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;

    fn t(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, day, hour, 0, 0).unwrap()
    }

    fn approved_adoption(at: DateTime<Utc>) -> AdoptionRequest {
        let mut request = AdoptionRequest::new(AnimalId::new(1), UserId::new(10), at - Duration::days(1));
        request.approve(Review::new(UserId::new(99), None, at)).unwrap();
        request
    }

    fn foster(id: i64, status: FosterStatus, start: DateTime<Utc>, end: Option<DateTime<Utc>>) -> FosterRequest {
        let mut request = FosterRequest::new(AnimalId::new(1), UserId::new(10), ShelterId::new(5), start, start);
        request.id = FosterRequestId::new(id);
        request.status = status;
        request.end_at = end;
        if let Some(end) = end {
            request.updated_at = end;
        }
        request
    }

    #[test]
    fn absent_adoption_is_empty() {
        let fosters = vec![foster(1, FosterStatus::Ongoing, t(2, 0), None)];
        assert!(merge_history(None, &fosters, ShelterId::new(5)).is_empty());
    }

    #[test]
    fn rejected_adoption_is_empty() {
        let mut request = AdoptionRequest::new(AnimalId::new(1), UserId::new(10), t(1, 0));
        request.reject(Review::new(UserId::new(99), None, t(1, 1))).unwrap();
        let fosters = vec![foster(1, FosterStatus::Completed, t(2, 0), Some(t(3, 0)))];

        assert!(merge_history(Some(&request), &fosters, ShelterId::new(5)).is_empty());
    }

    #[test]
    fn pending_adoption_has_no_adopted_event() {
        let request = AdoptionRequest::new(AnimalId::new(1), UserId::new(10), t(1, 0));
        assert!(merge_history(Some(&request), &[], ShelterId::new(5)).is_empty());
    }

    #[test]
    fn adopted_then_completed_foster() {
        let adoption = approved_adoption(t(1, 9));
        let fosters = vec![foster(1, FosterStatus::Completed, t(2, 0), Some(t(4, 0)))];

        let events = merge_history(Some(&adoption), &fosters, ShelterId::new(5));
        let kinds: Vec<_> = events.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TimelineEventKind::Adopted,
                TimelineEventKind::FosterStarted,
                TimelineEventKind::FosterEnded
            ]
        );
        assert_eq!(events.iter().map(|e| e.sequence).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(events[1].status, "foster ended");
        assert_eq!(events[2].at, t(4, 0));
    }

    #[test]
    fn ongoing_foster_is_labelled_fostering() {
        let adoption = approved_adoption(t(1, 9));
        let fosters = vec![foster(1, FosterStatus::Ongoing, t(2, 0), None)];

        let events = merge_history(Some(&adoption), &fosters, ShelterId::new(5));
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].status, "fostering");
        assert_eq!(events[1].shelter_id, Some(ShelterId::new(5)));
    }

    #[test]
    fn pending_and_rejected_fosters_are_skipped() {
        let adoption = approved_adoption(t(1, 9));
        let fosters = vec![
            foster(1, FosterStatus::Pending, t(2, 0), None),
            foster(2, FosterStatus::Rejected, t(3, 0), None),
        ];

        let events = merge_history(Some(&adoption), &fosters, ShelterId::new(5));
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, TimelineEventKind::Adopted);
    }

    #[test]
    fn fosters_predating_adoption_are_dropped() {
        let adoption = approved_adoption(t(10, 9));
        let fosters = vec![
            foster(1, FosterStatus::Completed, t(3, 0), Some(t(5, 0))),
            // same day, earlier hour: kept, the filter is by date
            foster(2, FosterStatus::Ongoing, t(10, 1), None),
        ];

        let events = merge_history(Some(&adoption), &fosters, ShelterId::new(5));
        assert_eq!(events.len(), 2);
        assert!(events.iter().any(|e| e.description.contains("FR-2")));
        assert!(!events.iter().any(|e| e.description.contains("FR-1")));
    }

    #[test]
    fn equal_timestamps_sort_by_kind_priority() {
        let adoption = approved_adoption(t(1, 9));
        // Migrated data: foster started and ended in the adoption instant
        let fosters = vec![foster(1, FosterStatus::Completed, t(1, 9), Some(t(1, 9)))];

        let events = merge_history(Some(&adoption), &fosters, ShelterId::new(5));
        let kinds: Vec<_> = events.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TimelineEventKind::Adopted,
                TimelineEventKind::FosterStarted,
                TimelineEventKind::FosterEnded
            ]
        );
    }

    #[test]
    fn end_falls_back_to_updated_at() {
        let adoption = approved_adoption(t(1, 9));
        let mut completed = foster(1, FosterStatus::Completed, t(2, 0), None);
        completed.updated_at = t(6, 12);

        let events = merge_history(Some(&adoption), &[completed], ShelterId::new(5));
        assert_eq!(events.len(), 3);
        assert_eq!(events[2].at, t(6, 12));
    }

    #[test]
    fn multiple_periods_interleave_chronologically() {
        let adoption = approved_adoption(t(1, 9));
        let fosters = vec![
            foster(2, FosterStatus::Ongoing, t(8, 0), None),
            foster(1, FosterStatus::Completed, t(2, 0), Some(t(5, 0))),
        ];

        let events = merge_history(Some(&adoption), &fosters, ShelterId::new(5));
        let times: Vec<_> = events.iter().map(|e| e.at).collect();
        assert_eq!(times, vec![t(1, 9), t(2, 0), t(5, 0), t(8, 0)]);
    }

    fn any_kind() -> impl Strategy<Value = TimelineEventKind> {
        prop_oneof![
            Just(TimelineEventKind::Adopted),
            Just(TimelineEventKind::FosterStarted),
            Just(TimelineEventKind::FosterEnded),
        ]
    }

    fn any_event() -> impl Strategy<Value = TimelineEvent> {
        (any_kind(), 0i64..20, "[a-c]{1,3}").prop_map(|(kind, offset, description)| {
            TimelineEvent::new(
                kind,
                t(1, 0) + Duration::hours(offset),
                description,
                None,
                "x",
            )
        })
    }

    proptest! {
        /// Property: output is non-decreasing by timestamp, then by kind priority
        #[test]
        fn ordering_law(events in prop::collection::vec(any_event(), 0..24)) {
            let ordered = order_events(events);
            for pair in ordered.windows(2) {
                let (a, b) = (&pair[0], &pair[1]);
                prop_assert!(a.at <= b.at);
                if a.at == b.at {
                    prop_assert!(a.kind.priority() <= b.kind.priority());
                }
            }
        }

        /// Property: sequence numbers are exactly 1..N in order
        #[test]
        fn sequences_are_dense(events in prop::collection::vec(any_event(), 0..24)) {
            let count = events.len();
            let ordered = order_events(events);
            let sequences: Vec<u32> = ordered.iter().map(|e| e.sequence).collect();
            let expected: Vec<u32> = (1..=count as u32).collect();
            prop_assert_eq!(sequences, expected);
        }
    }
}
