//! Bulk manual assignment outcome
//!
//! Each request in a bulk call is committed on its own. Failures are
//! collected per index; only structural problems fail the whole call.

use serde::{Deserialize, Serialize};

use super::error::{EngineError, ErrorKind};
use crate::models::{Assignment, AssignmentId};

/// Failure of one item in a bulk call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkItemError {
    /// Position of the request in the submitted list
    pub index: usize,
    pub reason: ErrorKind,
    /// Human-readable context
    pub detail: String,
}

/// Result of a bulk call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkOutcome {
    pub created_count: usize,
    pub created_ids: Vec<AssignmentId>,
    pub errors: Vec<BulkItemError>,
}

impl BulkOutcome {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            created_count: 0,
            created_ids: Vec::with_capacity(capacity),
            errors: Vec::new(),
        }
    }

    pub(crate) fn record_created(&mut self, assignment: &Assignment) {
        self.created_ids.push(assignment.id);
        self.created_count = self.created_ids.len();
    }

    pub(crate) fn record_failed(&mut self, index: usize, error: &EngineError) {
        self.errors.push(BulkItemError {
            index,
            reason: error.kind(),
            detail: error.to_string(),
        });
    }

    /// Whether every item was created
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Why one item could not be committed
pub(crate) enum ItemFailure {
    /// Recorded against the item, processing continues
    Item(EngineError),
    /// Storage is gone; the whole call fails
    Fatal(EngineError),
}
