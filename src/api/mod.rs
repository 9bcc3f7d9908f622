//! HTTP surface for the staffing engine
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                 ApiServer                    │
//! │                                              │
//! │  ┌────────────────────────────────────────┐  │
//! │  │            REST API                    │  │
//! │  │  GET  /api/events/{id}/candidates      │  │
//! │  │  POST /api/events/{id}/auto-assign     │  │
//! │  │  POST /api/assignments[/bulk]          │  │
//! │  │  GET  /api/reports/distribution        │  │
//! │  │  GET  /api/reports/teachers            │  │
//! │  │  *    /api/events/{id}/tasks           │  │
//! │  └────────────────────────────────────────┘  │
//! │                    │                         │
//! │  ┌─────────────────▼──────────────────────┐  │
//! │  │   StaffingEngine  ·  InMemoryStore     │  │
//! │  └────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use colorin::api::ApiServer;
//!
//! let server = ApiServer::new(&config, store)?;
//! server.start().await?;
//! ```

pub mod handlers;
pub mod server;

pub use handlers::{create_router, ApiError, ApiResponse, ErrorResponse};
pub use server::{ApiServer, AppState, ServerError};
