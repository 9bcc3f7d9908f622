//! Storage boundary for staffing records
//!
//! The engine never owns persistence. It reads and writes through the
//! [`StaffingStore`] trait so the same logic runs over the in-memory
//! reference store, a database-backed store, or a test double.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     StaffingEngine                          │
//! │          (ranking, auto-assignment, bulk, reports)          │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    StaffingStore trait                      │
//! │   snapshot · get_teacher · get_event · insert_assignments   │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!              ┌───────────────┴───────────────┐
//!              ▼                               ▼
//!     ┌─────────────────┐             ┌─────────────────┐
//!     │  InMemoryStore  │             │  external / DB  │
//!     └─────────────────┘             └─────────────────┘
//! ```
//!
//! Every implementation must enforce uniqueness of the (teacher, event)
//! pair at insert time and must make [`StaffingStore::insert_assignments`]
//! all-or-nothing.

pub mod memory;

use std::collections::{HashMap, HashSet};
use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine::error::EntityKind;
use crate::models::{
    Assignment, AssignmentFilter, AssignmentId, Event, EventId, EventTask, NewAssignment, Teacher,
    TeacherId,
};

pub use memory::InMemoryStore;

// ============================================================================
// Errors
// ============================================================================

/// Result type for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Errors raised by a store implementation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Uniqueness constraint on (teacher, event) violated
    #[error("assignment ({teacher_id}, {event_id}) already exists")]
    Duplicate { teacher_id: i64, event_id: i64 },

    /// Referenced record does not exist
    #[error("{entity} {id} does not exist")]
    NotFound { entity: EntityKind, id: i64 },

    /// Record-level rule rejected the write
    #[error("constraint on {field}: {reason}")]
    Constraint { field: String, reason: String },

    /// Optimistic write lost against a concurrent writer
    #[error("write conflict: {reason}")]
    Conflict {
        event_id: Option<EventId>,
        reason: String,
    },

    /// Storage did not answer in time
    #[error("timed out during {operation}")]
    Timeout { operation: String },

    /// Storage cannot serve requests at all
    #[error("storage unavailable: {reason}")]
    Unavailable { reason: String },
}

impl StoreError {
    pub fn not_found(entity: EntityKind, id: impl Into<i64>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn duplicate(pair: (TeacherId, EventId)) -> Self {
        Self::Duplicate {
            teacher_id: pair.0.get(),
            event_id: pair.1.get(),
        }
    }

    pub fn constraint(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Constraint {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Whether the whole store is out of service (not just this write)
    pub fn is_structural(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}

// ============================================================================
// Snapshot
// ============================================================================

/// A consistent, point-in-time copy of the records the engine reads
///
/// Ranking and reporting compute everything from one snapshot, so a single
/// call never mixes states from before and after a concurrent commit.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    teachers: Vec<Teacher>,
    events: HashMap<EventId, Event>,
    assignments: Vec<Assignment>,
}

impl Snapshot {
    pub fn new(teachers: Vec<Teacher>, events: Vec<Event>, assignments: Vec<Assignment>) -> Self {
        Self {
            teachers,
            events: events.into_iter().map(|e| (e.id, e)).collect(),
            assignments,
        }
    }

    pub fn teachers(&self) -> &[Teacher] {
        &self.teachers
    }

    pub fn assignments(&self) -> &[Assignment] {
        &self.assignments
    }

    pub fn teacher(&self, id: TeacherId) -> Option<&Teacher> {
        self.teachers.iter().find(|t| t.id == id)
    }

    pub fn event(&self, id: EventId) -> Option<&Event> {
        self.events.get(&id)
    }

    /// Teachers already linked to `event`
    pub fn assigned_to(&self, event: EventId) -> HashSet<TeacherId> {
        self.assignments
            .iter()
            .filter(|a| a.event_id == event)
            .map(|a| a.teacher_id)
            .collect()
    }

    /// Assignments of one teacher
    pub fn assignments_of(&self, teacher: TeacherId) -> impl Iterator<Item = &Assignment> {
        self.assignments
            .iter()
            .filter(move |a| a.teacher_id == teacher)
    }
}

// ============================================================================
// Seed Data
// ============================================================================

/// Serializable dump of a store, used to seed the in-memory store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeedData {
    #[serde(default)]
    pub teachers: Vec<Teacher>,
    #[serde(default)]
    pub events: Vec<Event>,
    #[serde(default)]
    pub assignments: Vec<Assignment>,
    #[serde(default)]
    pub tasks: Vec<EventTask>,
}

impl SeedData {
    /// Load seed data from a JSON file
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read data file: {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse JSON data file: {}", path.display()))
    }

    /// Write seed data to a JSON file
    pub fn save_json_file(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self).context("Failed to serialize data")?;

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write data file: {}", path.display()))
    }
}

// ============================================================================
// Store Trait
// ============================================================================

/// Repository the engine reads from and writes assignments through
#[async_trait]
pub trait StaffingStore: Send + Sync {
    /// Consistent copy of teachers, events, and assignments
    async fn snapshot(&self) -> StoreResult<Snapshot>;

    async fn get_teacher(&self, id: TeacherId) -> StoreResult<Option<Teacher>>;

    async fn get_event(&self, id: EventId) -> StoreResult<Option<Event>>;

    async fn list_assignments(&self, filter: AssignmentFilter) -> StoreResult<Vec<Assignment>>;

    /// Insert a batch of assignments
    ///
    /// All-or-nothing: on any error (unknown teacher/event, duplicate pair
    /// against stored rows or within the batch) nothing is written.
    async fn insert_assignments(&self, requests: &[NewAssignment])
        -> StoreResult<Vec<Assignment>>;

    /// Remove one assignment, returning it
    async fn delete_assignment(&self, id: AssignmentId) -> StoreResult<Assignment>;
}
