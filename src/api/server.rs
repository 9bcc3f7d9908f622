//! API server implementation
//!
//! Wires the staffing engine and the in-memory store behind the REST router.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::{Config, ServerConfig};
use crate::engine::StaffingEngine;
use crate::storage::InMemoryStore;

use super::handlers::create_router;

// ============================================================================
// App State
// ============================================================================

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Assignment engine
    pub engine: StaffingEngine,

    /// Backing store, used directly by the task routes
    pub store: Arc<InMemoryStore>,

    /// Server start time
    pub start_time: Instant,

    /// Server configuration
    pub config: ServerConfig,
}

impl AppState {
    /// Build state over a store with the given configuration
    pub fn new(config: &Config, store: Arc<InMemoryStore>) -> Self {
        let engine = StaffingEngine::new(store.clone()).with_config(config.engine.clone());
        Self {
            engine,
            store,
            start_time: Instant::now(),
            config: config.server.clone(),
        }
    }
}

// ============================================================================
// API Server
// ============================================================================

/// HTTP server for the assignment engine
pub struct ApiServer {
    config: ServerConfig,
    state: AppState,
}

impl ApiServer {
    /// Create a new server
    pub fn new(config: &Config, store: Arc<InMemoryStore>) -> Result<Self, ServerError> {
        config
            .validate()
            .map_err(|e| ServerError::Config(format!("{e:#}")))?;

        Ok(Self {
            config: config.server.clone(),
            state: AppState::new(config, store),
        })
    }

    /// Get the application state
    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    /// Build the router with all routes
    pub fn build_router(&self) -> Router {
        let mut router = create_router(self.state.clone());

        if self.config.enable_cors {
            router = router.layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            );
        }

        if self.config.enable_request_logging {
            router = router.layer(TraceLayer::new_for_http());
        }

        router
    }

    /// Start the server
    pub async fn start(&self) -> Result<(), ServerError> {
        self.start_with_shutdown(std::future::pending()).await
    }

    /// Start with graceful shutdown
    pub async fn start_with_shutdown(
        &self,
        shutdown_signal: impl std::future::Future<Output = ()> + Send + 'static,
    ) -> Result<(), ServerError> {
        let router = self.build_router();
        let addr = self.config.bind_address;

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Bind(e.to_string()))?;

        tracing::info!(address = %addr, "Starting API server");

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal)
            .await
            .map_err(|e| ServerError::Serve(e.to_string()))?;

        tracing::info!("API server shutdown complete");
        Ok(())
    }

    /// Get server info
    pub fn info(&self) -> ServerInfo {
        let engine = self.state.engine.config();
        ServerInfo {
            bind_address: self.config.bind_address,
            default_role: engine.default_role.clone(),
            conflict_retries: engine.conflict_retries,
            lock_timeout_ms: engine.lock_timeout_ms,
            cors_enabled: self.config.enable_cors,
            request_logging_enabled: self.config.enable_request_logging,
        }
    }
}

/// Server information
#[derive(Debug, Clone)]
pub struct ServerInfo {
    pub bind_address: SocketAddr,
    pub default_role: String,
    pub conflict_retries: u32,
    pub lock_timeout_ms: u64,
    pub cors_enabled: bool,
    pub request_logging_enabled: bool,
}

impl ServerInfo {
    /// Format as display string
    pub fn display(&self) -> String {
        format!(
            "Colorin API Server\n\
             {:-<40}\n\
             Bind Address: {}\n\
             Default Role: {}\n\
             Conflict Retries: {}\n\
             Lock Timeout: {}ms\n\
             CORS: {}\n\
             Request Logging: {}",
            "",
            self.bind_address,
            self.default_role,
            self.conflict_retries,
            self.lock_timeout_ms,
            if self.cors_enabled { "enabled" } else { "disabled" },
            if self.request_logging_enabled { "enabled" } else { "disabled" }
        )
    }
}

// ============================================================================
// Server Errors
// ============================================================================

/// Server errors
#[derive(Debug, Clone, Error)]
pub enum ServerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to bind: {0}")]
    Bind(String),

    #[error("Server error: {0}")]
    Serve(String),
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Teacher;
    use crate::storage::StaffingStore;

    #[test]
    fn test_server_creation() {
        let server = ApiServer::new(&Config::default(), Arc::new(InMemoryStore::new()));
        assert!(server.is_ok());
    }

    #[test]
    fn test_server_info() {
        let server = ApiServer::new(&Config::default(), Arc::new(InMemoryStore::new())).unwrap();
        let info = server.info();

        assert_eq!(info.default_role, "Profesor");
        assert_eq!(info.conflict_retries, 1);
        assert!(info.cors_enabled);
        assert!(info.display().contains("Bind Address: 0.0.0.0:8080"));
    }

    #[test]
    fn test_server_rejects_invalid_config() {
        let mut config = Config::default();
        config.engine.lock_timeout_ms = 0;

        let result = ApiServer::new(&config, Arc::new(InMemoryStore::new()));
        assert!(matches!(result, Err(ServerError::Config(_))));
    }

    #[tokio::test]
    async fn test_state_shares_store() {
        let store = Arc::new(InMemoryStore::new());
        let server = ApiServer::new(&Config::default(), store.clone()).unwrap();
        store.upsert_teacher(Teacher::new(1, "Ana")).await;

        let state = server.state();
        let snapshot = state.engine.store().snapshot().await.unwrap();
        assert_eq!(snapshot.teachers().len(), 1);
    }
}
