//! Engine integration tests
//!
//! Exercises the engine end to end over the in-memory store:
//! 1. Ranking and recommendation
//! 2. Auto-assignment
//! 3. Bulk manual assignment
//! 4. Distribution report
//! 5. Concurrent writers and conflict retry

mod common;

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use colorin::config::EngineConfig;
use colorin::engine::error::{EngineError, EntityKind, ErrorKind};
use colorin::engine::StaffingEngine;
use colorin::models::{
    Assignment, AssignmentFilter, AssignmentId, DateRange, Event, EventId, NewAssignment, Teacher,
    TeacherId,
};
use colorin::storage::{InMemoryStore, Snapshot, StaffingStore, StoreError, StoreResult};
use tokio_test::{assert_err, assert_ok};

use common::{date, engine, seed_with_loads, staffed_seed, store, today, TARGET_EVENT};

async fn assigned_teachers(store: &InMemoryStore, event: EventId) -> Vec<TeacherId> {
    let mut teachers: Vec<TeacherId> = store
        .list_assignments(AssignmentFilter {
            event_id: Some(event),
            ..Default::default()
        })
        .await
        .unwrap()
        .into_iter()
        .map(|a| a.teacher_id)
        .collect();
    teachers.sort();
    teachers
}

// ============================================================================
// Ranking
// ============================================================================

#[tokio::test]
async fn test_ranking_orders_by_load_then_name() {
    let store = store(staffed_seed());
    let ranking = engine(&store)
        .rank_candidates(TARGET_EVENT, today())
        .await
        .unwrap();

    let names: Vec<&str> = ranking.candidates.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, ["Ana", "Beatriz", "Carlos", "Diego", "Elena"]);

    let loads: Vec<u32> = ranking.candidates.iter().map(|c| c.future_load).collect();
    assert_eq!(loads, [0, 0, 1, 2, 3]);

    let recommended: Vec<&str> = ranking.recommended().map(|c| c.name.as_str()).collect();
    assert_eq!(recommended, ["Ana", "Beatriz"]);
    assert_eq!(ranking.available, 5);
    assert_eq!(ranking.total_teachers, 5);
}

#[tokio::test]
async fn test_past_events_do_not_count() {
    let store = store(staffed_seed());
    let engine = engine(&store);

    // Ana only worked the February event
    assert_eq!(engine.future_load(TeacherId(1), today()).await.unwrap(), 0);

    // An event dated exactly on the reference date still counts
    assert_eq!(
        engine.future_load(TeacherId(3), date(2024, 3, 5)).await.unwrap(),
        1
    );
    assert_eq!(
        engine.future_load(TeacherId(3), date(2024, 3, 6)).await.unwrap(),
        0
    );
}

#[tokio::test]
async fn test_ranking_excludes_inactive_and_assigned_from_eligibility() {
    let store = store(staffed_seed());
    store.set_teacher_active(TeacherId(1), false).await.unwrap();
    let engine = engine(&store);
    engine
        .create_assignment(NewAssignment::new(2, TARGET_EVENT.get(), "Apoyo"))
        .await
        .unwrap();

    let ranking = engine.rank_candidates(TARGET_EVENT, today()).await.unwrap();

    let ana = ranking.get(TeacherId(1)).unwrap();
    assert!(!ana.active);
    assert!(!ana.recommended);

    let beatriz = ranking.get(TeacherId(2)).unwrap();
    assert!(beatriz.already_assigned);
    assert!(!beatriz.recommended);

    let recommended: Vec<TeacherId> = ranking.recommended().map(|c| c.teacher_id).collect();
    assert_eq!(recommended, [TeacherId(3)]);
    assert_eq!(ranking.available, 3);
}

#[tokio::test]
async fn test_rank_unknown_event() {
    let store = store(staffed_seed());
    let err = engine(&store)
        .rank_candidates(EventId(999), today())
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::not_found(EntityKind::Event, EventId(999)));
}

// ============================================================================
// Auto-assignment
// ============================================================================

#[tokio::test]
async fn test_auto_assign_picks_least_loaded() {
    let store = store(staffed_seed());
    let engine = engine(&store);

    let created = engine.auto_assign(TARGET_EVENT, 2, today()).await.unwrap();

    let teachers: Vec<TeacherId> = created.iter().map(|a| a.teacher_id).collect();
    assert_eq!(teachers, [TeacherId(1), TeacherId(2)]);
    assert!(created.iter().all(|a| a.role == "Profesor"));
    assert!(created.iter().all(|a| a.event_id == TARGET_EVENT));

    assert_eq!(engine.future_load(TeacherId(1), today()).await.unwrap(), 1);
    assert_eq!(
        assigned_teachers(&store, TARGET_EVENT).await,
        [TeacherId(1), TeacherId(2)]
    );

    let ranking = engine.rank_candidates(TARGET_EVENT, today()).await.unwrap();
    assert!(ranking.get(TeacherId(1)).unwrap().already_assigned);
    assert!(ranking.get(TeacherId(2)).unwrap().already_assigned);
    assert_eq!(ranking.available, 3);
}

#[tokio::test]
async fn test_ranking_is_deterministic() {
    let store = store(staffed_seed());
    let engine = engine(&store);

    let first = engine.rank_candidates(TARGET_EVENT, today()).await.unwrap();
    let second = engine.rank_candidates(TARGET_EVENT, today()).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_auto_assign_uses_configured_role() {
    let store = store(staffed_seed());
    let config = EngineConfig::builder().default_role("Apoyo").build().unwrap();
    let engine = engine(&store).with_config(config);

    let created = engine.auto_assign(TARGET_EVENT, 1, today()).await.unwrap();
    assert_eq!(created[0].role, "Apoyo");
}

#[tokio::test]
async fn test_auto_assign_is_not_idempotent() {
    let store = store(staffed_seed());
    let engine = engine(&store);

    engine.auto_assign(TARGET_EVENT, 2, today()).await.unwrap();
    let second = engine.auto_assign(TARGET_EVENT, 2, today()).await.unwrap();

    let teachers: Vec<TeacherId> = second.iter().map(|a| a.teacher_id).collect();
    assert_eq!(teachers, [TeacherId(3), TeacherId(4)]);
    assert_eq!(assigned_teachers(&store, TARGET_EVENT).await.len(), 4);
}

#[tokio::test]
async fn test_auto_assign_insufficient_candidates_creates_nothing() {
    let store = store(staffed_seed());
    store.set_teacher_active(TeacherId(5), false).await.unwrap();
    let engine = engine(&store);

    let err = engine.auto_assign(TARGET_EVENT, 5, today()).await.unwrap_err();
    assert_eq!(
        err,
        EngineError::InsufficientCandidates {
            event_id: TARGET_EVENT.get(),
            requested: 5,
            available: 4,
        }
    );
    assert!(assigned_teachers(&store, TARGET_EVENT).await.is_empty());
}

#[tokio::test]
async fn test_auto_assign_rejects_zero_count() {
    let store = store(staffed_seed());
    let err = engine(&store)
        .auto_assign(TARGET_EVENT, 0, today())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidRequest);
}

// ============================================================================
// Bulk manual assignment
// ============================================================================

#[tokio::test]
async fn test_bulk_partial_failure_is_itemized() {
    let store = store(staffed_seed());
    let engine = engine(&store);

    let outcome = engine
        .create_many(vec![
            NewAssignment::new(1, TARGET_EVENT.get(), "Profesor"),
            NewAssignment::new(1, TARGET_EVENT.get(), "Profesor"),
            NewAssignment::new(2, TARGET_EVENT.get(), "Coordinador"),
        ])
        .await
        .unwrap();

    assert_eq!(outcome.created_count, 2);
    assert_eq!(outcome.created_ids.len(), 2);
    assert_eq!(outcome.errors.len(), 1);
    assert_eq!(outcome.errors[0].index, 1);
    assert_eq!(outcome.errors[0].reason, ErrorKind::DuplicateAssignment);
    assert!(!outcome.is_complete());

    assert_eq!(
        assigned_teachers(&store, TARGET_EVENT).await,
        [TeacherId(1), TeacherId(2)]
    );
}

#[tokio::test]
async fn test_bulk_reports_each_failure_kind() {
    let store = store(staffed_seed());
    let outcome = engine(&store)
        .create_many(vec![
            NewAssignment::new(42, TARGET_EVENT.get(), "Profesor"),
            NewAssignment::new(1, 4242, "Profesor"),
            NewAssignment::new(1, TARGET_EVENT.get(), "   "),
            NewAssignment::new(3, TARGET_EVENT.get(), "Profesor"),
        ])
        .await
        .unwrap();

    let reasons: Vec<(usize, ErrorKind)> =
        outcome.errors.iter().map(|e| (e.index, e.reason)).collect();
    assert_eq!(
        reasons,
        [
            (0, ErrorKind::NotFound),
            (1, ErrorKind::NotFound),
            (2, ErrorKind::InvalidRequest),
        ]
    );
    assert_eq!(outcome.created_count, 1);
}

#[tokio::test]
async fn test_bulk_empty_list_rejected() {
    let store = store(staffed_seed());
    let result = engine(&store).create_many(Vec::new()).await;
    let err = assert_err!(result);
    assert_eq!(err.kind(), ErrorKind::InvalidRequest);
}

#[tokio::test]
async fn test_removal_frees_teacher_for_auto_assign() {
    let store = store(staffed_seed());
    let engine = engine(&store);

    let created = assert_ok!(engine.auto_assign(TARGET_EVENT, 1, today()).await);
    assert_eq!(created[0].teacher_id, TeacherId(1));

    assert_ok!(engine.remove_assignment(created[0].id).await);
    assert_eq!(engine.future_load(TeacherId(1), today()).await.unwrap(), 0);

    let again = engine.auto_assign(TARGET_EVENT, 1, today()).await.unwrap();
    assert_eq!(again[0].teacher_id, TeacherId(1));

    let err = engine.remove_assignment(AssignmentId(9999)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

// ============================================================================
// Distribution report
// ============================================================================

#[tokio::test]
async fn test_distribution_within_spread_is_equitable() {
    let store = store(seed_with_loads(&[2, 2, 3]));
    let report = engine(&store).equitable_report(today()).await.unwrap();

    assert_eq!(report.analysis.min, 2);
    assert_eq!(report.analysis.max, 3);
    assert_eq!(report.analysis.diff, 1);
    assert!(report.analysis.is_equitable);
}

#[tokio::test]
async fn test_distribution_beyond_spread_is_not_equitable() {
    let store = store(seed_with_loads(&[1, 4]));
    let report = engine(&store).equitable_report(today()).await.unwrap();

    assert_eq!(report.analysis.diff, 3);
    assert!(!report.analysis.is_equitable);
}

#[tokio::test]
async fn test_distribution_ignores_inactive_teachers() {
    let store = store(seed_with_loads(&[0, 1, 5]));
    store.set_teacher_active(TeacherId(3), false).await.unwrap();

    let report = engine(&store).equitable_report(today()).await.unwrap();
    assert_eq!(report.per_teacher.len(), 2);
    assert!(report.analysis.is_equitable);
}

#[tokio::test]
async fn test_teacher_statistics_and_events() {
    let store = store(staffed_seed());
    let engine = engine(&store);

    let stats = engine
        .teacher_statistics(DateRange::new(Some(date(2024, 3, 1)), None))
        .await
        .unwrap();
    let totals: Vec<u32> = stats.teachers.iter().map(|t| t.total_events).collect();
    assert_eq!(totals, [0, 0, 1, 2, 3]);
    assert_eq!(stats.summary.total_assignments, 6);
    assert_eq!(stats.summary.average_per_teacher, 1.2);

    let events = engine
        .teacher_events(TeacherId(5), DateRange::default())
        .await
        .unwrap();
    let ids: Vec<EventId> = events.events.iter().map(|e| e.event_id).collect();
    assert_eq!(ids, [EventId(10), EventId(11), EventId(12)]);

    let err = engine
        .teacher_statistics(DateRange::new(Some(date(2024, 4, 1)), Some(date(2024, 3, 1))))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidRequest);
}

// ============================================================================
// Concurrency
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_auto_assign_never_double_books() {
    let store = store(staffed_seed());
    let engine = engine(&store);

    let (first, second) = tokio::join!(
        engine.auto_assign(TARGET_EVENT, 2, today()),
        engine.auto_assign(TARGET_EVENT, 2, today()),
    );
    let first = first.unwrap();
    let second = second.unwrap();

    let teachers: HashSet<TeacherId> = first
        .iter()
        .chain(second.iter())
        .map(|a| a.teacher_id)
        .collect();
    assert_eq!(teachers.len(), 4);
    assert_eq!(
        assigned_teachers(&store, TARGET_EVENT).await,
        [TeacherId(1), TeacherId(2), TeacherId(3), TeacherId(4)]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_auto_assign_for_last_teacher() {
    let store = store(seed_with_loads(&[0]));
    let engine = engine(&store);

    let (first, second) = tokio::join!(
        engine.auto_assign(TARGET_EVENT, 1, today()),
        engine.auto_assign(TARGET_EVENT, 1, today()),
    );

    let outcomes = [first, second];
    let successes = outcomes.iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1);

    for err in outcomes.iter().filter_map(|r| r.as_ref().err()) {
        assert!(matches!(
            err.kind(),
            ErrorKind::InsufficientCandidates | ErrorKind::ConcurrencyConflict
        ));
    }
    assert_eq!(assigned_teachers(&store, TARGET_EVENT).await, [TeacherId(1)]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_manual_creates_single_winner() {
    let store = store(staffed_seed());
    let engine = engine(&store);

    let attempts = (0..8).map(|_| {
        let engine = engine.clone();
        tokio::spawn(async move {
            engine
                .create_assignment(NewAssignment::new(1, TARGET_EVENT.get(), "Profesor"))
                .await
        })
    });
    let results = futures::future::join_all(attempts).await;

    let mut created = 0;
    for result in results {
        match result.unwrap() {
            Ok(_) => created += 1,
            Err(e) => assert_eq!(e.kind(), ErrorKind::DuplicateAssignment),
        }
    }
    assert_eq!(created, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_overlapping_bulk_and_auto_assign_share_one_pool() {
    let store = store(staffed_seed());
    let engine = engine(&store);

    let whole_pool = || {
        (1..=5)
            .map(|teacher| NewAssignment::new(teacher, TARGET_EVENT.get(), "Profesor"))
            .collect::<Vec<_>>()
    };
    let bulk_a = tokio::spawn({
        let engine = engine.clone();
        let requests = whole_pool();
        async move { engine.create_many(requests).await }
    });
    let bulk_b = tokio::spawn({
        let engine = engine.clone();
        let requests = whole_pool();
        async move { engine.create_many(requests).await }
    });
    let auto = tokio::spawn({
        let engine = engine.clone();
        async move { engine.auto_assign(TARGET_EVENT, 1, today()).await }
    });

    let bulk_a = assert_ok!(bulk_a.await.unwrap());
    let bulk_b = assert_ok!(bulk_b.await.unwrap());
    let auto_created = match auto.await.unwrap() {
        Ok(created) => created.len(),
        Err(e) => {
            assert!(matches!(
                e.kind(),
                ErrorKind::InsufficientCandidates | ErrorKind::ConcurrencyConflict
            ));
            0
        }
    };

    let mut ids = HashSet::new();
    for outcome in [&bulk_a, &bulk_b] {
        assert_eq!(outcome.created_count, outcome.created_ids.len());
        assert_eq!(outcome.created_count + outcome.errors.len(), 5);
        assert!(outcome
            .errors
            .iter()
            .all(|e| e.reason == ErrorKind::DuplicateAssignment));
        ids.extend(outcome.created_ids.iter().copied());
    }
    assert_eq!(ids.len(), bulk_a.created_count + bulk_b.created_count);

    assert_eq!(
        bulk_a.created_count + bulk_b.created_count + auto_created,
        5
    );
    assert_eq!(
        assigned_teachers(&store, TARGET_EVENT).await,
        [TeacherId(1), TeacherId(2), TeacherId(3), TeacherId(4), TeacherId(5)]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_writers_on_different_events_do_not_interfere() {
    let mut seed = staffed_seed();
    seed.events
        .push(Event::new(101, "Concurso de oratoria", date(2024, 3, 21)));
    let store = store(seed);
    let engine = engine(&store);

    let (a, b) = tokio::join!(
        engine.auto_assign(TARGET_EVENT, 3, today()),
        engine.auto_assign(EventId(101), 3, today()),
    );
    assert_eq!(a.unwrap().len(), 3);
    assert_eq!(b.unwrap().len(), 3);
}

// ============================================================================
// Stores that misbehave
// ============================================================================

/// Lets an outside writer take the first selected teacher before the commit
struct RacingStore {
    inner: InMemoryStore,
    raced: AtomicBool,
    inserts: AtomicUsize,
}

impl RacingStore {
    fn new(inner: InMemoryStore) -> Self {
        Self {
            inner,
            raced: AtomicBool::new(false),
            inserts: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl StaffingStore for RacingStore {
    async fn snapshot(&self) -> StoreResult<Snapshot> {
        self.inner.snapshot().await
    }

    async fn get_teacher(&self, id: TeacherId) -> StoreResult<Option<Teacher>> {
        self.inner.get_teacher(id).await
    }

    async fn get_event(&self, id: EventId) -> StoreResult<Option<Event>> {
        self.inner.get_event(id).await
    }

    async fn list_assignments(&self, filter: AssignmentFilter) -> StoreResult<Vec<Assignment>> {
        self.inner.list_assignments(filter).await
    }

    async fn insert_assignments(
        &self,
        requests: &[NewAssignment],
    ) -> StoreResult<Vec<Assignment>> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        if !self.raced.swap(true, Ordering::SeqCst) {
            if let Some(first) = requests.first() {
                self.inner
                    .insert_assignments(std::slice::from_ref(first))
                    .await?;
            }
        }
        self.inner.insert_assignments(requests).await
    }

    async fn delete_assignment(&self, id: AssignmentId) -> StoreResult<Assignment> {
        self.inner.delete_assignment(id).await
    }
}

#[tokio::test]
async fn test_lost_race_is_retried_from_fresh_snapshot() {
    let inner = InMemoryStore::from_seed(staffed_seed()).unwrap();
    let store = Arc::new(RacingStore::new(inner));
    let engine = StaffingEngine::new(store.clone());

    let created = engine.auto_assign(TARGET_EVENT, 1, today()).await.unwrap();

    // Ana went to the outside writer, the retry picks Beatriz
    assert_eq!(created[0].teacher_id, TeacherId(2));
    assert_eq!(store.inserts.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_lost_race_without_retries_is_a_conflict() {
    let inner = InMemoryStore::from_seed(staffed_seed()).unwrap();
    let store = Arc::new(RacingStore::new(inner));
    let config = EngineConfig::builder().conflict_retries(0).build().unwrap();
    let engine = StaffingEngine::new(store.clone()).with_config(config);

    let err = engine.auto_assign(TARGET_EVENT, 2, today()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConcurrencyConflict);

    // Only the outside writer's assignment exists
    let assigned = store
        .list_assignments(AssignmentFilter {
            event_id: Some(TARGET_EVENT),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(assigned.len(), 1);
}

/// Reads work, writes report the backend as gone
struct ClosedStore {
    inner: InMemoryStore,
}

#[async_trait]
impl StaffingStore for ClosedStore {
    async fn snapshot(&self) -> StoreResult<Snapshot> {
        self.inner.snapshot().await
    }

    async fn get_teacher(&self, id: TeacherId) -> StoreResult<Option<Teacher>> {
        self.inner.get_teacher(id).await
    }

    async fn get_event(&self, id: EventId) -> StoreResult<Option<Event>> {
        self.inner.get_event(id).await
    }

    async fn list_assignments(&self, filter: AssignmentFilter) -> StoreResult<Vec<Assignment>> {
        self.inner.list_assignments(filter).await
    }

    async fn insert_assignments(&self, _: &[NewAssignment]) -> StoreResult<Vec<Assignment>> {
        Err(StoreError::Unavailable {
            reason: "connection closed".to_string(),
        })
    }

    async fn delete_assignment(&self, _: AssignmentId) -> StoreResult<Assignment> {
        Err(StoreError::Unavailable {
            reason: "connection closed".to_string(),
        })
    }
}

#[tokio::test]
async fn test_unavailable_store_fails_whole_bulk_call() {
    let store = Arc::new(ClosedStore {
        inner: InMemoryStore::from_seed(staffed_seed()).unwrap(),
    });
    let engine = StaffingEngine::new(store);

    let result = engine
        .create_many(vec![
            NewAssignment::new(1, TARGET_EVENT.get(), "Profesor"),
            NewAssignment::new(2, TARGET_EVENT.get(), "Profesor"),
        ])
        .await;
    let err = assert_err!(result);
    assert_eq!(err.kind(), ErrorKind::ConcurrencyConflict);
}
