//! In-memory reference store
//!
//! Holds every record behind one `tokio::sync::RwLock`. A snapshot is taken
//! under the read lock and every write (including a whole assignment batch)
//! happens under the write lock, so readers never see a half-applied batch.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{SeedData, Snapshot, StaffingStore, StoreError, StoreResult};
use crate::engine::error::EntityKind;
use crate::models::{
    Assignment, AssignmentFilter, AssignmentId, Event, EventId, EventTask, NewAssignment, TaskId,
    TaskUpdate, Teacher, TeacherId, DEFAULT_ROLE,
};

#[derive(Debug, Default)]
struct StoreState {
    teachers: BTreeMap<TeacherId, Teacher>,
    events: BTreeMap<EventId, Event>,
    assignments: BTreeMap<AssignmentId, Assignment>,
    pairs: HashSet<(TeacherId, EventId)>,
    tasks: BTreeMap<TaskId, EventTask>,
    next_assignment_id: i64,
    next_task_id: i64,
}

impl StoreState {
    fn require_event(&self, id: EventId) -> StoreResult<()> {
        if self.events.contains_key(&id) {
            Ok(())
        } else {
            Err(StoreError::not_found(EntityKind::Event, id))
        }
    }

    fn task_mut(&mut self, event_id: EventId, task_id: TaskId) -> StoreResult<&mut EventTask> {
        self.require_event(event_id)?;
        self.tasks
            .get_mut(&task_id)
            .filter(|task| task.event_id == event_id)
            .ok_or_else(|| StoreError::not_found(EntityKind::Task, task_id))
    }

    fn check_batch(&self, requests: &[NewAssignment]) -> StoreResult<()> {
        let mut batch = HashSet::with_capacity(requests.len());
        for request in requests {
            if !self.teachers.contains_key(&request.teacher_id) {
                return Err(StoreError::not_found(EntityKind::Teacher, request.teacher_id));
            }
            self.require_event(request.event_id)?;
            if self.pairs.contains(&request.pair()) || !batch.insert(request.pair()) {
                return Err(StoreError::duplicate(request.pair()));
            }
        }
        Ok(())
    }
}

/// Reference [`StaffingStore`] kept entirely in memory
#[derive(Debug)]
pub struct InMemoryStore {
    state: RwLock<StoreState>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(StoreState {
                next_assignment_id: 1,
                next_task_id: 1,
                ..Default::default()
            }),
        }
    }

    /// Build a store from seed data
    ///
    /// Seed assignments are checked like any other insert: they must
    /// reference known records and must not repeat a (teacher, event) pair.
    pub fn from_seed(seed: SeedData) -> StoreResult<Self> {
        let mut state = StoreState::default();

        state.teachers = seed.teachers.into_iter().map(|t| (t.id, t)).collect();
        state.events = seed.events.into_iter().map(|e| (e.id, e)).collect();

        for assignment in seed.assignments {
            if !state.teachers.contains_key(&assignment.teacher_id) {
                return Err(StoreError::not_found(
                    EntityKind::Teacher,
                    assignment.teacher_id,
                ));
            }
            state.require_event(assignment.event_id)?;
            if !state.pairs.insert(assignment.pair()) {
                return Err(StoreError::duplicate(assignment.pair()));
            }
            state.assignments.insert(assignment.id, assignment);
        }

        for task in seed.tasks {
            state.require_event(task.event_id)?;
            state.tasks.insert(task.id, task);
        }

        state.next_assignment_id = state.assignments.keys().last().map_or(1, |id| id.get() + 1);
        state.next_task_id = state.tasks.keys().last().map_or(1, |id| id.get() + 1);

        Ok(Self {
            state: RwLock::new(state),
        })
    }

    /// Load a store from a JSON seed file
    pub fn load_json(path: &Path) -> Result<Self> {
        let seed = SeedData::from_json_file(path)?;
        Ok(Self::from_seed(seed)?)
    }

    /// Dump the current contents
    pub async fn to_seed(&self) -> SeedData {
        let state = self.state.read().await;
        SeedData {
            teachers: state.teachers.values().cloned().collect(),
            events: state.events.values().cloned().collect(),
            assignments: state.assignments.values().cloned().collect(),
            tasks: state.tasks.values().cloned().collect(),
        }
    }

    /// Persist the current contents to a JSON file
    pub async fn save_json(&self, path: &Path) -> Result<()> {
        self.to_seed().await.save_json_file(path)
    }

    // ========================================================================
    // Teachers and events
    // ========================================================================

    /// Insert or replace a teacher
    pub async fn upsert_teacher(&self, teacher: Teacher) {
        let mut state = self.state.write().await;
        state.teachers.insert(teacher.id, teacher);
    }

    pub async fn set_teacher_active(&self, id: TeacherId, active: bool) -> StoreResult<Teacher> {
        let mut state = self.state.write().await;
        let teacher = state
            .teachers
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found(EntityKind::Teacher, id))?;
        teacher.active = active;
        Ok(teacher.clone())
    }

    /// Delete a teacher that holds no assignments
    pub async fn delete_teacher(&self, id: TeacherId) -> StoreResult<Teacher> {
        let mut state = self.state.write().await;
        if !state.teachers.contains_key(&id) {
            return Err(StoreError::not_found(EntityKind::Teacher, id));
        }

        let held = state
            .assignments
            .values()
            .filter(|a| a.teacher_id == id)
            .count();
        if held > 0 {
            return Err(StoreError::constraint(
                "teacher",
                format!("teacher {id} still holds {held} assignments"),
            ));
        }

        state
            .teachers
            .remove(&id)
            .ok_or_else(|| StoreError::not_found(EntityKind::Teacher, id))
    }

    /// Insert or replace an event
    pub async fn upsert_event(&self, event: Event) {
        let mut state = self.state.write().await;
        state.events.insert(event.id, event);
    }

    /// Delete an event together with its assignments and tasks
    pub async fn delete_event(&self, id: EventId) -> StoreResult<Event> {
        let mut state = self.state.write().await;
        let event = state
            .events
            .remove(&id)
            .ok_or_else(|| StoreError::not_found(EntityKind::Event, id))?;

        let StoreState {
            assignments,
            pairs,
            tasks,
            ..
        } = &mut *state;
        assignments.retain(|_, a| {
            let keep = a.event_id != id;
            if !keep {
                pairs.remove(&a.pair());
            }
            keep
        });
        tasks.retain(|_, t| t.event_id != id);

        Ok(event)
    }

    // ========================================================================
    // Event tasks
    // ========================================================================

    pub async fn create_task(
        &self,
        event_id: EventId,
        description: &str,
    ) -> StoreResult<EventTask> {
        let description = description.trim();
        if description.is_empty() {
            return Err(StoreError::constraint("description", "must not be empty"));
        }

        let mut state = self.state.write().await;
        state.require_event(event_id)?;

        let id = TaskId(state.next_task_id);
        state.next_task_id += 1;

        let task = EventTask::new(id, event_id, description);
        state.tasks.insert(id, task.clone());
        Ok(task)
    }

    /// Tasks of an event, pending first, newest first within each group
    pub async fn list_tasks(
        &self,
        event_id: EventId,
        completed: Option<bool>,
    ) -> StoreResult<Vec<EventTask>> {
        let state = self.state.read().await;
        state.require_event(event_id)?;

        let mut tasks: Vec<EventTask> = state
            .tasks
            .values()
            .filter(|t| t.event_id == event_id)
            .filter(|t| completed.map_or(true, |c| t.completed == c))
            .cloned()
            .collect();

        tasks.sort_by(|a, b| {
            a.completed
                .cmp(&b.completed)
                .then_with(|| b.created_at.cmp(&a.created_at))
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(tasks)
    }

    pub async fn update_task(
        &self,
        event_id: EventId,
        task_id: TaskId,
        update: TaskUpdate,
    ) -> StoreResult<EventTask> {
        let description = match update.description {
            Some(text) if text.trim().is_empty() => {
                return Err(StoreError::constraint("description", "must not be empty"));
            }
            Some(text) => Some(text.trim().to_string()),
            None => None,
        };

        let mut state = self.state.write().await;
        let task = state.task_mut(event_id, task_id)?;
        if let Some(text) = description {
            task.description = text;
        }
        if let Some(completed) = update.completed {
            task.set_completed(completed, Utc::now());
        }
        Ok(task.clone())
    }

    pub async fn toggle_task(&self, event_id: EventId, task_id: TaskId) -> StoreResult<EventTask> {
        let mut state = self.state.write().await;
        let task = state.task_mut(event_id, task_id)?;
        task.toggle(Utc::now());
        Ok(task.clone())
    }

    pub async fn delete_task(&self, event_id: EventId, task_id: TaskId) -> StoreResult<EventTask> {
        let mut state = self.state.write().await;
        state.task_mut(event_id, task_id)?;
        state
            .tasks
            .remove(&task_id)
            .ok_or_else(|| StoreError::not_found(EntityKind::Task, task_id))
    }
}

#[async_trait]
impl StaffingStore for InMemoryStore {
    async fn snapshot(&self) -> StoreResult<Snapshot> {
        let state = self.state.read().await;
        Ok(Snapshot::new(
            state.teachers.values().cloned().collect(),
            state.events.values().cloned().collect(),
            state.assignments.values().cloned().collect(),
        ))
    }

    async fn get_teacher(&self, id: TeacherId) -> StoreResult<Option<Teacher>> {
        Ok(self.state.read().await.teachers.get(&id).cloned())
    }

    async fn get_event(&self, id: EventId) -> StoreResult<Option<Event>> {
        Ok(self.state.read().await.events.get(&id).cloned())
    }

    async fn list_assignments(&self, filter: AssignmentFilter) -> StoreResult<Vec<Assignment>> {
        let state = self.state.read().await;
        Ok(state
            .assignments
            .values()
            .filter(|a| filter.matches(a))
            .cloned()
            .collect())
    }

    async fn insert_assignments(
        &self,
        requests: &[NewAssignment],
    ) -> StoreResult<Vec<Assignment>> {
        let mut state = self.state.write().await;
        state.check_batch(requests)?;

        let mut created = Vec::with_capacity(requests.len());
        for request in requests {
            let assignment = Assignment {
                id: AssignmentId(state.next_assignment_id),
                teacher_id: request.teacher_id,
                event_id: request.event_id,
                role: request.role_or(DEFAULT_ROLE).to_string(),
            };
            state.next_assignment_id += 1;
            state.pairs.insert(assignment.pair());
            state.assignments.insert(assignment.id, assignment.clone());
            created.push(assignment);
        }
        Ok(created)
    }

    async fn delete_assignment(&self, id: AssignmentId) -> StoreResult<Assignment> {
        let mut state = self.state.write().await;
        let removed = state
            .assignments
            .remove(&id)
            .ok_or_else(|| StoreError::not_found(EntityKind::Assignment, id))?;
        state.pairs.remove(&removed.pair());
        Ok(removed)
    }
}
