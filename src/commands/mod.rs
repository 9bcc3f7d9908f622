pub mod assign;
pub mod report;
pub mod serve;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use colorin::config::Config;
use colorin::engine::StaffingEngine;
use colorin::storage::InMemoryStore;

// Re-export command functions for convenience
pub use assign::{auto_assign, rank};
pub use report::{report, stats};
pub use serve::serve;

/// Load a JSON snapshot and wrap an engine around it
pub(crate) fn open_engine(
    config: &Config,
    data: &Path,
) -> Result<(Arc<InMemoryStore>, StaffingEngine)> {
    let store = Arc::new(
        InMemoryStore::load_json(data)
            .with_context(|| format!("Failed to open data file: {}", data.display()))?,
    );
    let engine = StaffingEngine::new(store.clone()).with_config(config.engine.clone());
    Ok((store, engine))
}
