use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};

use colorin::api::ApiServer;
use colorin::config::Config;
use colorin::metrics;
use colorin::storage::InMemoryStore;

/// Start the HTTP API until Ctrl-C
pub async fn serve(
    mut config: Config,
    data: Option<PathBuf>,
    bind: Option<SocketAddr>,
) -> Result<()> {
    if let Some(path) = data {
        config.storage.seed_path = Some(path);
    }
    if let Some(addr) = bind {
        config.server.bind_address = addr;
    }

    if let Err(e) = metrics::init_metrics() {
        tracing::warn!(error = %e, "Failed to initialize metrics, continuing without them");
    }

    let store = match &config.storage.seed_path {
        Some(path) => InMemoryStore::load_json(path)
            .with_context(|| format!("Failed to seed store from {}", path.display()))?,
        None => {
            tracing::warn!("No data file given, starting with an empty store");
            InMemoryStore::new()
        }
    };

    let server = ApiServer::new(&config, Arc::new(store))?;
    println!("{}", server.info().display());

    server.start_with_shutdown(shutdown_signal()).await?;
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received"),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    }
}
