//! colorin - Equitable assignment and recommendation engine for event staffing
//!
//! Ranks teachers for an event by how many upcoming commitments they already
//! carry, auto-assigns the least loaded ones, commits bulk manual assignments
//! with per-item error reporting and reports how evenly work is spread.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`] - Configuration management and settings
//! - [`models`] - Teachers, events, assignments and event tasks
//! - [`storage`] - Store boundary and the in-memory reference store
//! - [`engine`] - Ranking, selection, bulk commits and reports
//! - [`api`] - REST API over the engine
//! - [`metrics`] - Prometheus metrics
//! - [`utils`] - Retry helpers
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use colorin::engine::StaffingEngine;
//! use colorin::storage::InMemoryStore;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = Arc::new(InMemoryStore::load_json("data.json".as_ref())?);
//!     let engine = StaffingEngine::new(store);
//!     let today = chrono::Local::now().date_naive();
//!     let report = engine.equitable_report(today).await?;
//!     println!("equitable: {}", report.analysis.is_equitable);
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod models;
pub mod storage;
pub mod utils;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{Config, EngineConfig};
    pub use crate::engine::bulk::{BulkItemError, BulkOutcome};
    pub use crate::engine::error::{EngineError, EngineResult, ErrorKind};
    pub use crate::engine::ranker::{Candidate, CandidateRanking};
    pub use crate::engine::report::{DistributionReport, EQUITABLE_SPREAD};
    pub use crate::engine::StaffingEngine;
    pub use crate::error::{ColorinErrorTrait, Error, ErrorCategory, Result};
    pub use crate::models::{
        Assignment, AssignmentId, Event, EventId, NewAssignment, Teacher, TeacherId,
    };
    pub use crate::storage::{InMemoryStore, SeedData, StaffingStore, StoreError};
}

// Direct re-exports for convenience
pub use engine::StaffingEngine;
pub use models::{Assignment, Event, NewAssignment, Teacher};
