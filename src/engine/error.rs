//! Error taxonomy for the assignment engine

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::models::EventId;
use crate::storage::StoreError;

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Record kinds that can be missing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Teacher,
    Event,
    Assignment,
    Task,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Teacher => "teacher",
            Self::Event => "event",
            Self::Assignment => "assignment",
            Self::Task => "task",
        }
    }

    fn spanish_name(&self) -> &'static str {
        match self {
            Self::Teacher => "Profesor",
            Self::Event => "Evento",
            Self::Assignment => "Asignación",
            Self::Task => "Tarea",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Machine-readable error kind, stable across releases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    NotFound,
    DuplicateAssignment,
    InsufficientCandidates,
    InvalidRequest,
    ConcurrencyConflict,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "NotFound",
            Self::DuplicateAssignment => "DuplicateAssignment",
            Self::InsufficientCandidates => "InsufficientCandidates",
            Self::InvalidRequest => "InvalidRequest",
            Self::ConcurrencyConflict => "ConcurrencyConflict",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Engine errors
///
/// Every variant carries enough context for a caller to render its own
/// message; [`EngineError::kind`] gives the stable classification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// Unknown record id
    #[error("{entity} {id} not found")]
    NotFound { entity: EntityKind, id: i64 },

    /// The (teacher, event) pair is already assigned
    #[error("teacher {teacher_id} is already assigned to event {event_id}")]
    DuplicateAssignment { teacher_id: i64, event_id: i64 },

    /// Auto-assignment asked for more teachers than are eligible
    #[error(
        "event {event_id} needs {requested} teachers but only {available} are eligible"
    )]
    InsufficientCandidates {
        event_id: i64,
        requested: usize,
        available: usize,
    },

    /// Malformed input
    #[error("invalid {field}: {reason}")]
    InvalidRequest { field: String, reason: String },

    /// Lost a race on an event, or the store could not complete the write
    #[error("concurrency conflict{}: {reason}", event_suffix(.event_id))]
    ConcurrencyConflict {
        event_id: Option<i64>,
        reason: String,
    },
}

fn event_suffix(event_id: &Option<i64>) -> String {
    event_id
        .map(|id| format!(" on event {id}"))
        .unwrap_or_default()
}

impl EngineError {
    /// Create a not found error
    pub fn not_found(entity: EntityKind, id: impl Into<i64>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Create a duplicate assignment error
    pub fn duplicate(teacher_id: impl Into<i64>, event_id: impl Into<i64>) -> Self {
        Self::DuplicateAssignment {
            teacher_id: teacher_id.into(),
            event_id: event_id.into(),
        }
    }

    /// Create an insufficient candidates error
    pub fn insufficient(event_id: EventId, requested: usize, available: usize) -> Self {
        Self::InsufficientCandidates {
            event_id: event_id.get(),
            requested,
            available,
        }
    }

    /// Create an invalid request error
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidRequest {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create a concurrency conflict error
    pub fn conflict(event_id: Option<EventId>, reason: impl Into<String>) -> Self {
        Self::ConcurrencyConflict {
            event_id: event_id.map(EventId::get),
            reason: reason.into(),
        }
    }

    /// Stable classification of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::DuplicateAssignment { .. } => ErrorKind::DuplicateAssignment,
            Self::InsufficientCandidates { .. } => ErrorKind::InsufficientCandidates,
            Self::InvalidRequest { .. } => ErrorKind::InvalidRequest,
            Self::ConcurrencyConflict { .. } => ErrorKind::ConcurrencyConflict,
        }
    }

    /// Check if retrying the same call can succeed
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::ConcurrencyConflict { .. })
    }

    /// Get Spanish description for the error
    pub fn spanish_desc(&self) -> String {
        match self {
            Self::NotFound { entity, id } => {
                format!("{} {} no encontrado", entity.spanish_name(), id)
            }
            Self::DuplicateAssignment {
                teacher_id,
                event_id,
            } => {
                format!(
                    "El profesor {} ya está asignado al evento {}",
                    teacher_id, event_id
                )
            }
            Self::InsufficientCandidates {
                requested,
                available,
                ..
            } => {
                format!(
                    "Solo hay {} profesores disponibles, pero se solicitan {}",
                    available, requested
                )
            }
            Self::InvalidRequest { field, reason } => {
                format!("Solicitud inválida ({}): {}", field, reason)
            }
            Self::ConcurrencyConflict { .. } => {
                "Otra operación modificó el evento al mismo tiempo; inténtelo de nuevo".to_string()
            }
        }
    }
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate {
                teacher_id,
                event_id,
            } => Self::duplicate(teacher_id, event_id),
            StoreError::NotFound { entity, id } => Self::NotFound { entity, id },
            StoreError::Constraint { field, reason } => Self::InvalidRequest { field, reason },
            StoreError::Conflict { event_id, reason } => Self::conflict(event_id, reason),
            StoreError::Timeout { operation } => {
                Self::conflict(None, format!("storage timed out during {operation}"))
            }
            StoreError::Unavailable { reason } => {
                Self::conflict(None, format!("storage unavailable: {reason}"))
            }
        }
    }
}
