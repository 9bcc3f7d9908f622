//! Equitable assignment engine
//!
//! [`StaffingEngine`] ranks teachers for an event by future workload,
//! auto-assigns the least loaded ones, commits bulk manual assignments with
//! per-item error reporting and reports how evenly work is spread.
//!
//! # Concurrency
//!
//! Writers take the write scope of the event they touch (see
//! [`locks::EventLocks`]); writers on different events run in parallel.
//! Readers take no engine lock and work from one store snapshot per call.
//! The store's (teacher, event) uniqueness check backs everything up.

pub mod bulk;
pub mod error;
pub mod locks;
pub mod ranker;
pub mod report;
pub mod selector;
pub mod workload;

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::metrics::{self, AssignmentSource};
use crate::models::{
    Assignment, AssignmentFilter, AssignmentId, DateRange, EventId, NewAssignment, TeacherId,
};
use crate::storage::{Snapshot, StaffingStore, StoreError};
use crate::utils::retry::with_retry_if;

use bulk::{BulkOutcome, ItemFailure};
use error::{EngineError, EngineResult, EntityKind};
use locks::EventLocks;
use ranker::CandidateRanking;
use report::{DistributionReport, TeacherEvents, TeacherStatistics};
use workload::WorkloadIndex;

/// Facade over a [`StaffingStore`] exposing every engine operation
#[derive(Clone)]
pub struct StaffingEngine {
    store: Arc<dyn StaffingStore>,
    locks: EventLocks,
    config: EngineConfig,
}

impl std::fmt::Debug for StaffingEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaffingEngine")
            .field("locks", &self.locks)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl StaffingEngine {
    /// Create an engine with default configuration
    pub fn new(store: Arc<dyn StaffingStore>) -> Self {
        Self {
            store,
            locks: EventLocks::new(),
            config: EngineConfig::default(),
        }
    }

    /// Set engine configuration
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn StaffingStore> {
        &self.store
    }

    async fn snapshot(&self) -> EngineResult<Snapshot> {
        Ok(self.store.snapshot().await?)
    }

    // ========================================================================
    // Read paths
    // ========================================================================

    /// Number of assignments of `teacher` on or after `as_of`
    pub async fn future_load(&self, teacher: TeacherId, as_of: NaiveDate) -> EngineResult<u32> {
        let snapshot = self.snapshot().await?;
        if snapshot.teacher(teacher).is_none() {
            return Err(EngineError::not_found(EntityKind::Teacher, teacher));
        }
        Ok(WorkloadIndex::build(&snapshot, as_of).future_load(teacher))
    }

    /// Rank every teacher as a candidate for `event_id`
    pub async fn rank_candidates(
        &self,
        event_id: EventId,
        as_of: NaiveDate,
    ) -> EngineResult<CandidateRanking> {
        let _timer = metrics::start_operation_timer("rank_candidates");
        let snapshot = self.snapshot().await?;

        let ranking = ranker::rank(&snapshot, event_id, as_of)
            .ok_or_else(|| EngineError::not_found(EntityKind::Event, event_id))?;

        debug!(
            event_id = %event_id,
            candidates = ranking.candidates.len(),
            available = ranking.available,
            "Ranked candidates"
        );
        Ok(ranking)
    }

    /// Fleet-wide equitable distribution report
    pub async fn equitable_report(&self, as_of: NaiveDate) -> EngineResult<DistributionReport> {
        let _timer = metrics::start_operation_timer("equitable_report");
        let snapshot = self.snapshot().await?;
        let report = report::distribution(&snapshot, as_of);

        metrics::update_distribution_spread(report.analysis.diff);
        debug!(
            teachers = report.per_teacher.len(),
            diff = report.analysis.diff,
            equitable = report.analysis.is_equitable,
            "Built distribution report"
        );
        Ok(report)
    }

    /// Per-teacher assignment counts within `range`
    pub async fn teacher_statistics(&self, range: DateRange) -> EngineResult<TeacherStatistics> {
        check_range(&range)?;
        let snapshot = self.snapshot().await?;
        Ok(report::teacher_statistics(&snapshot, range))
    }

    /// Events one teacher is assigned to within `range`
    pub async fn teacher_events(
        &self,
        teacher: TeacherId,
        range: DateRange,
    ) -> EngineResult<TeacherEvents> {
        check_range(&range)?;
        let snapshot = self.snapshot().await?;
        report::teacher_events(&snapshot, teacher, range)
            .ok_or_else(|| EngineError::not_found(EntityKind::Teacher, teacher))
    }

    /// Assignments matching `filter`, ordered by id
    pub async fn list_assignments(&self, filter: AssignmentFilter) -> EngineResult<Vec<Assignment>> {
        let mut assignments = self.store.list_assignments(filter).await?;
        assignments.sort_by_key(|a| a.id);
        Ok(assignments)
    }

    // ========================================================================
    // Write paths
    // ========================================================================

    /// Assign the `count` least loaded eligible teachers to `event_id`
    ///
    /// All-or-nothing. Not idempotent: each call adds `count` more teachers.
    pub async fn auto_assign(
        &self,
        event_id: EventId,
        count: usize,
        as_of: NaiveDate,
    ) -> EngineResult<Vec<Assignment>> {
        let _timer = metrics::start_operation_timer("auto_assign");

        match self.auto_assign_scoped(event_id, count, as_of).await {
            Ok(created) => {
                metrics::record_assignments_created(AssignmentSource::Auto, created.len());
                info!(
                    event_id = %event_id,
                    count = count,
                    created = created.len(),
                    "Auto-assigned teachers"
                );
                Ok(created)
            }
            Err(e) => {
                metrics::record_assignment_failure("auto_assign", e.kind().as_str());
                warn!(event_id = %event_id, count = count, error = %e, "Auto-assignment failed");
                Err(e)
            }
        }
    }

    async fn auto_assign_scoped(
        &self,
        event_id: EventId,
        count: usize,
        as_of: NaiveDate,
    ) -> EngineResult<Vec<Assignment>> {
        if count == 0 {
            return Err(EngineError::invalid("count", "must be at least 1"));
        }

        let _scope = self
            .locks
            .acquire(event_id, self.config.lock_timeout())
            .await?;

        with_retry_if(
            &self.config.retry_config(),
            || self.try_auto_assign(event_id, count, as_of),
            EngineError::is_recoverable,
        )
        .await
    }

    /// One rank, select and commit round from a fresh snapshot
    async fn try_auto_assign(
        &self,
        event_id: EventId,
        count: usize,
        as_of: NaiveDate,
    ) -> EngineResult<Vec<Assignment>> {
        let snapshot = self.snapshot().await?;
        let ranking = ranker::rank(&snapshot, event_id, as_of)
            .ok_or_else(|| EngineError::not_found(EntityKind::Event, event_id))?;

        let batch: Vec<NewAssignment> = selector::select(&ranking, count)?
            .into_iter()
            .map(|candidate| NewAssignment {
                teacher_id: candidate.teacher_id,
                event_id,
                role: Some(self.config.default_role.clone()),
            })
            .collect();

        match self.store.insert_assignments(&batch).await {
            Ok(created) => Ok(created),
            // Someone outside the engine staffed a selected teacher after our snapshot
            Err(StoreError::Duplicate {
                teacher_id,
                event_id: _,
            }) => Err(EngineError::conflict(
                Some(event_id),
                format!("teacher {teacher_id} was assigned concurrently"),
            )),
            Err(e) => Err(e.into()),
        }
    }

    /// Create a single manual assignment
    pub async fn create_assignment(&self, request: NewAssignment) -> EngineResult<Assignment> {
        let event_id = request.event_id;
        let teacher_id = request.teacher_id;

        match self.commit_one(request).await {
            Ok(assignment) => {
                metrics::record_assignments_created(AssignmentSource::Manual, 1);
                info!(
                    event_id = %event_id,
                    teacher_id = %teacher_id,
                    assignment_id = %assignment.id,
                    "Created assignment"
                );
                Ok(assignment)
            }
            Err(ItemFailure::Item(e) | ItemFailure::Fatal(e)) => {
                metrics::record_assignment_failure("create_assignment", e.kind().as_str());
                warn!(event_id = %event_id, teacher_id = %teacher_id, error = %e, "Assignment failed");
                Err(e)
            }
        }
    }

    /// Commit each request independently, collecting per-item errors
    ///
    /// Only an empty request list or unavailable storage fails the call.
    pub async fn create_many(&self, requests: Vec<NewAssignment>) -> EngineResult<BulkOutcome> {
        let _timer = metrics::start_operation_timer("create_many");

        if requests.is_empty() {
            metrics::record_assignment_failure("create_many", "InvalidRequest");
            return Err(EngineError::invalid(
                "requests",
                "must contain at least one assignment",
            ));
        }

        let total = requests.len();
        let mut outcome = BulkOutcome::with_capacity(total);

        for (index, request) in requests.into_iter().enumerate() {
            match self.commit_one(request).await {
                Ok(assignment) => outcome.record_created(&assignment),
                Err(ItemFailure::Item(e)) => {
                    metrics::record_assignment_failure("create_many", e.kind().as_str());
                    warn!(index = index, error = %e, "Bulk item rejected");
                    outcome.record_failed(index, &e);
                }
                Err(ItemFailure::Fatal(e)) => {
                    metrics::record_assignment_failure("create_many", e.kind().as_str());
                    warn!(index = index, error = %e, "Bulk assignment aborted");
                    return Err(e);
                }
            }
        }

        metrics::record_assignments_created(AssignmentSource::Bulk, outcome.created_count);
        info!(
            requested = total,
            created = outcome.created_count,
            errors = outcome.errors.len(),
            "Committed bulk assignments"
        );
        Ok(outcome)
    }

    /// Validate and commit one request under its event's write scope
    async fn commit_one(&self, request: NewAssignment) -> Result<Assignment, ItemFailure> {
        let role = self
            .normalize_role(request.role_or(&self.config.default_role))
            .map_err(ItemFailure::Item)?;

        let _scope = self
            .locks
            .acquire(request.event_id, self.config.lock_timeout())
            .await
            .map_err(ItemFailure::Item)?;

        if self
            .store
            .get_teacher(request.teacher_id)
            .await
            .map_err(classify)?
            .is_none()
        {
            return Err(ItemFailure::Item(EngineError::not_found(
                EntityKind::Teacher,
                request.teacher_id,
            )));
        }
        if self
            .store
            .get_event(request.event_id)
            .await
            .map_err(classify)?
            .is_none()
        {
            return Err(ItemFailure::Item(EngineError::not_found(
                EntityKind::Event,
                request.event_id,
            )));
        }

        let batch = [NewAssignment {
            role: Some(role),
            ..request
        }];
        self.store
            .insert_assignments(&batch)
            .await
            .map_err(classify)?
            .into_iter()
            .next()
            .ok_or_else(|| {
                ItemFailure::Item(EngineError::conflict(
                    Some(batch[0].event_id),
                    "store accepted the assignment but returned no record",
                ))
            })
    }

    /// Remove one assignment; the next read reflects it
    pub async fn remove_assignment(&self, id: AssignmentId) -> EngineResult<Assignment> {
        let removed = match self.store.delete_assignment(id).await {
            Ok(removed) => removed,
            Err(e) => {
                let e = EngineError::from(e);
                metrics::record_assignment_failure("remove_assignment", e.kind().as_str());
                return Err(e);
            }
        };

        info!(
            assignment_id = %id,
            event_id = %removed.event_id,
            teacher_id = %removed.teacher_id,
            "Removed assignment"
        );
        Ok(removed)
    }

    /// Trimmed role label; empty or overlong labels are rejected
    fn normalize_role(&self, role: &str) -> EngineResult<String> {
        let role = role.trim();
        if role.is_empty() {
            return Err(EngineError::invalid("role", "must not be empty"));
        }
        if role.chars().count() > self.config.max_role_len {
            return Err(EngineError::invalid(
                "role",
                format!("must be at most {} characters", self.config.max_role_len),
            ));
        }
        Ok(role.to_string())
    }
}

fn classify(err: StoreError) -> ItemFailure {
    if err.is_structural() {
        ItemFailure::Fatal(err.into())
    } else {
        ItemFailure::Item(err.into())
    }
}

fn check_range(range: &DateRange) -> EngineResult<()> {
    if range.is_inverted() {
        return Err(EngineError::invalid("range", "from must not be after to"));
    }
    Ok(())
}
