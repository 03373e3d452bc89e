//! Lifecycle scenarios against the library API
//!
//! Walks the adoption and foster workflows end to end on real SQLite stores,
//! checks the derived-custody invariants, and exercises the hooks.

use std::sync::{Arc, Barrier, Mutex};
use std::thread;
use std::time::Duration;

use proptest::prelude::*;
use shelter_lifecycle::domain::{
    Actor, AdoptionRequestId, AdoptionStatus, AnimalId, CustodyState, Decision, FosterRequestId,
    FosterStatus, ShelterId, TimelineEventKind, UserId,
};
use shelter_lifecycle::engine::{
    CacheInvalidator, LifecycleEngine, LifecycleError, Notification, Notifier,
    ADOPTION_REQUESTED, FOSTER_REQUESTED,
};
use shelter_lifecycle::storage::{
    AdoptionFilter, AnimalFilter, FosterFilter, OutboxNotifier, ProjectionCache, Store,
};
use tempfile::TempDir;

const SHELTER: ShelterId = ShelterId::new(5);
const REQUESTER: UserId = UserId::new(10);

fn admin() -> Actor {
    Actor::admin(UserId::new(1))
}

fn requester() -> Actor {
    Actor::user(REQUESTER)
}

fn engine() -> LifecycleEngine {
    LifecycleEngine::new(Store::open_in_memory().unwrap())
}

fn engine_with_animal() -> (LifecycleEngine, AnimalId) {
    let mut engine = engine();
    let animal = engine.register_animal("Biscuit", Some("Beagle"), SHELTER).unwrap();
    (engine, animal.id)
}

fn custody(engine: &LifecycleEngine, animal: AnimalId) -> CustodyState {
    engine.animal(animal).unwrap().custody()
}

/// Scenarios A and B: one adopter, approved
fn adopted(engine: &mut LifecycleEngine, animal: AnimalId) -> AdoptionRequestId {
    let request = engine.create_adoption_request(&requester(), animal).unwrap();
    engine
        .decide_adoption_request(&admin(), request.id, Decision::Approve, None)
        .unwrap();
    request.id
}

/// Scenario C: foster requested today and approved
fn fostering(engine: &mut LifecycleEngine, animal: AnimalId) -> FosterRequestId {
    let foster = engine
        .create_foster_request(&requester(), animal, SHELTER, None)
        .unwrap();
    engine
        .decide_foster_request(&admin(), foster.id, Decision::Approve, None)
        .unwrap();
    foster.id
}

#[derive(Default)]
struct RecordingNotifier {
    seen: Mutex<Vec<Notification>>,
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: &Notification) -> anyhow::Result<()> {
        self.seen.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

struct FailingHooks;

impl Notifier for FailingHooks {
    fn notify(&self, _notification: &Notification) -> anyhow::Result<()> {
        anyhow::bail!("push gateway down")
    }
}

impl CacheInvalidator for FailingHooks {
    fn invalidate_detail(&self, _animal_id: AnimalId) -> anyhow::Result<()> {
        anyhow::bail!("cache unreachable")
    }

    fn invalidate_list_projections(&self) -> anyhow::Result<()> {
        anyhow::bail!("cache unreachable")
    }
}

// =============================================================================
// Scenarios
// =============================================================================

#[test]
fn scenario_a_second_adoption_request_conflicts() {
    let (mut engine, animal) = engine_with_animal();

    let first = engine.create_adoption_request(&requester(), animal).unwrap();
    assert_eq!(first.status, AdoptionStatus::Pending);
    assert_eq!(first.decided_at, first.created_at);

    let err = engine.create_adoption_request(&requester(), animal).unwrap_err();
    assert!(err.is_conflict());
    assert_eq!(err.code(), "CONFLICT");
    assert_eq!(custody(&engine, animal), CustodyState::Available);
}

#[test]
fn scenario_b_approval_adopts() {
    let (mut engine, animal) = engine_with_animal();
    adopted(&mut engine, animal);

    assert_eq!(custody(&engine, animal), CustodyState::Adopted);

    let timeline = engine.timeline(animal, REQUESTER).unwrap();
    assert_eq!(timeline.kinds(), vec![TimelineEventKind::Adopted]);
    assert_eq!(timeline.total, 1);
    assert_eq!(timeline.animal_name, "Biscuit");
    assert_eq!(timeline.animal_breed.as_deref(), Some("Beagle"));
}

#[test]
fn scenario_c_approved_foster_is_fostering() {
    let (mut engine, animal) = engine_with_animal();
    adopted(&mut engine, animal);

    let foster = engine
        .create_foster_request(&requester(), animal, SHELTER, Some(chrono::Utc::now().date_naive()))
        .unwrap();
    assert_eq!(foster.status, FosterStatus::Pending);
    assert_eq!(custody(&engine, animal), CustodyState::Adopted);

    engine
        .decide_foster_request(&admin(), foster.id, Decision::Approve, None)
        .unwrap();
    assert_eq!(custody(&engine, animal), CustodyState::Fostering);

    let timeline = engine.timeline(animal, REQUESTER).unwrap();
    assert_eq!(
        timeline.kinds(),
        vec![TimelineEventKind::Adopted, TimelineEventKind::FosterStarted]
    );
    assert_eq!(timeline.timeline[1].status, "fostering");
}

#[test]
fn scenario_d_completion_returns_to_adopted() {
    let (mut engine, animal) = engine_with_animal();
    adopted(&mut engine, animal);
    let foster = fostering(&mut engine, animal);

    let completed = engine.complete_foster(&requester(), foster).unwrap();
    assert_eq!(completed.status, FosterStatus::Completed);
    assert!(completed.end_at.is_some());
    assert_eq!(custody(&engine, animal), CustodyState::Adopted);

    let timeline = engine.timeline(animal, REQUESTER).unwrap();
    assert_eq!(
        timeline.kinds(),
        vec![
            TimelineEventKind::Adopted,
            TimelineEventKind::FosterStarted,
            TimelineEventKind::FosterEnded
        ]
    );
    let sequences: Vec<u32> = timeline.timeline.iter().map(|e| e.sequence).collect();
    assert_eq!(sequences, vec![1, 2, 3]);
    assert_eq!(timeline.timeline[1].status, "foster ended");
}

#[test]
fn scenario_e_foster_without_adoption_is_forbidden() {
    let (mut engine, animal) = engine_with_animal();

    let err = engine
        .create_foster_request(&requester(), animal, SHELTER, None)
        .unwrap_err();
    assert!(err.is_forbidden());

    // Someone else's approved adoption does not help
    adopted(&mut engine, animal);
    let err = engine
        .create_foster_request(&Actor::user(UserId::new(11)), animal, SHELTER, None)
        .unwrap_err();
    assert!(err.is_forbidden());
}

#[test]
fn scenario_f_rejection_releases_animal() {
    let (mut engine, animal) = engine_with_animal();
    let request = engine.create_adoption_request(&requester(), animal).unwrap();

    engine
        .decide_adoption_request(&admin(), request.id, Decision::Reject, Some("no yard".into()))
        .unwrap();
    assert_eq!(custody(&engine, animal), CustodyState::Available);
    assert!(engine.timeline(animal, REQUESTER).unwrap().is_empty());

    // The slot is free again
    assert!(engine
        .create_adoption_request(&Actor::user(UserId::new(11)), animal)
        .is_ok());
}

#[test]
fn deciding_twice_is_invalid_state() {
    let (mut engine, animal) = engine_with_animal();
    let request = adopted(&mut engine, animal);

    for decision in [Decision::Approve, Decision::Reject] {
        let err = engine
            .decide_adoption_request(&admin(), request, decision, None)
            .unwrap_err();
        assert!(err.is_invalid_state(), "{decision:?}: {err}");
    }
    assert_eq!(custody(&engine, animal), CustodyState::Adopted);
}

#[test]
fn completing_a_pending_foster_is_invalid_state() {
    let (mut engine, animal) = engine_with_animal();
    adopted(&mut engine, animal);
    let foster = engine
        .create_foster_request(&requester(), animal, SHELTER, None)
        .unwrap();

    let err = engine.complete_foster(&requester(), foster.id).unwrap_err();
    assert!(err.is_invalid_state());
    assert!(engine
        .complete_foster(&Actor::user(UserId::new(11)), foster.id)
        .unwrap_err()
        .is_forbidden());
}

#[test]
fn fostering_animal_cannot_be_fostered_again() {
    let (mut engine, animal) = engine_with_animal();
    adopted(&mut engine, animal);
    fostering(&mut engine, animal);

    let err = engine
        .create_foster_request(&requester(), animal, SHELTER, None)
        .unwrap_err();
    assert!(matches!(err, LifecycleError::Conflict(_)));
}

#[test]
fn future_start_date_begins_at_midnight() {
    let (mut engine, animal) = engine_with_animal();
    adopted(&mut engine, animal);

    let start = chrono::Utc::now().date_naive() + chrono::Days::new(3);
    let foster = engine
        .create_foster_request(&requester(), animal, SHELTER, Some(start))
        .unwrap();

    let start_at = foster.start_at.unwrap();
    assert_eq!(start_at.date_naive(), start);
    assert_eq!(start_at.time(), chrono::NaiveTime::MIN);

    // Approval keeps the requested start
    let approved = engine
        .decide_foster_request(&admin(), foster.id, Decision::Approve, None)
        .unwrap();
    assert_eq!(approved.start_at, Some(start_at));
}

#[test]
fn repeated_foster_periods_build_a_longer_timeline() {
    let (mut engine, animal) = engine_with_animal();
    adopted(&mut engine, animal);

    for _ in 0..2 {
        let foster = fostering(&mut engine, animal);
        engine.complete_foster(&admin(), foster).unwrap();
    }

    let timeline = engine.timeline(animal, REQUESTER).unwrap();
    assert_eq!(timeline.total, 5);
    assert_eq!(timeline.kinds()[0], TimelineEventKind::Adopted);
    for pair in timeline.timeline.windows(2) {
        assert!(pair[0].at <= pair[1].at);
    }
}

#[test]
fn read_helpers_filter_requests() {
    let (mut engine, animal) = engine_with_animal();
    let other = engine.register_animal("Mochi", None, ShelterId::new(6)).unwrap();
    adopted(&mut engine, animal);
    let foster = engine
        .create_foster_request(&requester(), animal, SHELTER, None)
        .unwrap();
    engine.soft_delete_foster(&requester(), foster.id).unwrap();

    assert_eq!(engine.animals(&AnimalFilter::all()).unwrap().len(), 2);
    assert_eq!(
        engine
            .animals(&AnimalFilter::all().shelter(ShelterId::new(6)))
            .unwrap()[0]
            .id,
        other.id
    );
    assert_eq!(
        engine
            .adoption_requests(&AdoptionFilter::all().requester(REQUESTER))
            .unwrap()
            .len(),
        1
    );
    assert!(engine
        .foster_requests(&FosterFilter::for_animal(animal))
        .unwrap()
        .is_empty());
    assert_eq!(
        engine
            .foster_requests(&FosterFilter::for_animal(animal).with_deleted())
            .unwrap()
            .len(),
        1
    );
}

// =============================================================================
// Concurrency
// =============================================================================

#[test]
fn concurrent_adoption_requests_yield_one_success() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("shelter.db");
    let animal = Store::open(&path, Duration::from_secs(5))
        .unwrap()
        .register_animal("Biscuit", None, SHELTER)
        .unwrap()
        .id;

    let barrier = Arc::new(Barrier::new(2));
    let handles: Vec<_> = [10, 11]
        .into_iter()
        .map(|user| {
            let path = path.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let mut engine =
                    LifecycleEngine::new(Store::open(&path, Duration::from_secs(5)).unwrap());
                barrier.wait();
                engine.create_adoption_request(&Actor::user(UserId::new(user)), animal)
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let successes = results.iter().filter(|r| r.is_ok()).count();
    let conflicts = results
        .iter()
        .filter(|r| matches!(r, Err(e) if e.is_conflict()))
        .count();
    assert_eq!((successes, conflicts), (1, 1));

    let store = Store::open(&path, Duration::from_secs(5)).unwrap();
    assert_eq!(
        store
            .records()
            .count_adoptions(&AdoptionFilter::for_animal(animal).statuses(&AdoptionStatus::ACTIVE))
            .unwrap(),
        1
    );
}

// =============================================================================
// Hooks
// =============================================================================

#[test]
fn creation_notifies_with_request_context() {
    let notifier = Arc::new(RecordingNotifier::default());
    let mut engine = engine().with_notifier(notifier.clone());
    let animal = engine.register_animal("Biscuit", None, SHELTER).unwrap().id;

    adopted(&mut engine, animal);
    engine
        .create_foster_request(&requester(), animal, ShelterId::new(7), None)
        .unwrap();

    let seen = notifier.seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].event_type, ADOPTION_REQUESTED);
    assert_eq!(seen[0].shelter_id, SHELTER);
    assert_eq!(seen[1].event_type, FOSTER_REQUESTED);
    assert_eq!(seen[1].shelter_id, ShelterId::new(7));
    assert_eq!(seen[1].requester_id, REQUESTER);
}

#[test]
fn failing_hooks_never_fail_the_operation() {
    let hooks = Arc::new(FailingHooks);
    let mut engine = engine()
        .with_notifier(hooks.clone())
        .with_cache_invalidator(hooks);
    let animal = engine.register_animal("Biscuit", None, SHELTER).unwrap().id;

    adopted(&mut engine, animal);
    let foster = fostering(&mut engine, animal);
    engine.complete_foster(&requester(), foster).unwrap();

    assert_eq!(custody(&engine, animal), CustodyState::Adopted);
}

#[test]
fn custody_changes_invalidate_projections() {
    let cache = Arc::new(ProjectionCache::new());
    let mut engine = engine().with_cache_invalidator(cache.clone());
    let animal = engine.register_animal("Biscuit", None, SHELTER).unwrap().id;

    let warm = |engine: &LifecycleEngine| {
        let records = engine.store().records();
        cache.animal(&records, animal).unwrap();
        cache.animals(&records, &AnimalFilter::all()).unwrap();
    };

    warm(&engine);
    assert_eq!(cache.len(), (1, 1));
    let request = engine.create_adoption_request(&requester(), animal).unwrap();
    // Creation only touches list projections
    assert_eq!(cache.len(), (1, 0));

    warm(&engine);
    engine
        .decide_adoption_request(&admin(), request.id, Decision::Approve, None)
        .unwrap();
    assert_eq!(cache.len(), (0, 0));

    let fresh = cache.animal(&engine.store().records(), animal).unwrap().unwrap();
    assert_eq!(fresh.custody(), CustodyState::Adopted);
}

#[test]
fn outbox_receives_new_requests() {
    let dir = TempDir::new().unwrap();
    let outbox = OutboxNotifier::new(dir.path().join("notifications.jsonl"));
    let mut engine = engine().with_notifier(Arc::new(outbox.clone()));
    let animal = engine.register_animal("Biscuit", None, SHELTER).unwrap().id;

    engine.create_adoption_request(&requester(), animal).unwrap();

    let queued = outbox.read_all().unwrap();
    assert_eq!(queued.len(), 1);
    assert_eq!(queued[0].animal_id, animal);
    assert_eq!(queued[0].event_type, ADOPTION_REQUESTED);
}

// =============================================================================
// Invariants under arbitrary operation sequences
// =============================================================================

#[derive(Debug, Clone)]
enum Op {
    RequestAdoption(usize),
    DecideAdoption(usize, bool),
    RequestFoster(usize),
    DecideFoster(usize, bool),
    Complete(usize),
    Delete(usize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..3usize).prop_map(Op::RequestAdoption),
        (0..4usize, any::<bool>()).prop_map(|(i, a)| Op::DecideAdoption(i, a)),
        (0..3usize).prop_map(Op::RequestFoster),
        (0..4usize, any::<bool>()).prop_map(|(i, a)| Op::DecideFoster(i, a)),
        (0..4usize).prop_map(Op::Complete),
        (0..4usize).prop_map(Op::Delete),
    ]
}

fn decision(approve: bool) -> Decision {
    if approve {
        Decision::Approve
    } else {
        Decision::Reject
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn custody_tracks_requests(ops in prop::collection::vec(op_strategy(), 1..24)) {
        let (mut engine, animal) = engine_with_animal();
        let users = [UserId::new(10), UserId::new(11), UserId::new(12)];
        let mut adoptions: Vec<AdoptionRequestId> = Vec::new();
        let mut fosters: Vec<(FosterRequestId, UserId)> = Vec::new();

        for op in ops {
            // Business-rule failures are expected; only storage faults are bugs
            let result = match op {
                Op::RequestAdoption(u) => engine
                    .create_adoption_request(&Actor::user(users[u]), animal)
                    .map(|r| adoptions.push(r.id)),
                Op::DecideAdoption(i, approve) => match adoptions.get(i) {
                    Some(id) => engine
                        .decide_adoption_request(&admin(), *id, decision(approve), None)
                        .map(|_| ()),
                    None => Ok(()),
                },
                Op::RequestFoster(u) => engine
                    .create_foster_request(&Actor::user(users[u]), animal, SHELTER, None)
                    .map(|r| fosters.push((r.id, users[u]))),
                Op::DecideFoster(i, approve) => match fosters.get(i) {
                    Some((id, _)) => engine
                        .decide_foster_request(&admin(), *id, decision(approve), None)
                        .map(|_| ()),
                    None => Ok(()),
                },
                Op::Complete(i) => match fosters.get(i) {
                    Some((id, owner)) => engine
                        .complete_foster(&Actor::user(*owner), *id)
                        .map(|_| ()),
                    None => Ok(()),
                },
                Op::Delete(i) => match fosters.get(i) {
                    Some((id, owner)) => engine
                        .soft_delete_foster(&Actor::user(*owner), *id)
                        .map(|_| ()),
                    None => Ok(()),
                },
            };
            if let Err(err) = result {
                prop_assert!(!matches!(err, LifecycleError::Storage(_)), "{}", err);
            }

            let records = engine.store().records();
            let active_adoptions = records
                .count_adoptions(&AdoptionFilter::for_animal(animal).statuses(&AdoptionStatus::ACTIVE))
                .unwrap();
            prop_assert!(active_adoptions <= 1);

            let ongoing = records
                .count_fosters(&FosterFilter::for_animal(animal).statuses(&[FosterStatus::Ongoing]))
                .unwrap();
            let state = custody(&engine, animal);
            prop_assert_eq!(state == CustodyState::Fostering, ongoing > 0);
            prop_assert_ne!(state, CustodyState::FosterEnded);

            for user in users {
                let timeline = engine.timeline(animal, user).unwrap();
                for pair in timeline.timeline.windows(2) {
                    prop_assert!(pair[0].ordering(&pair[1]) != std::cmp::Ordering::Greater);
                }
            }
        }
    }
}
