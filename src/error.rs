//! Unified error handling for the colorin crate
//!
//! This module provides a unified error type that consolidates the
//! domain-specific errors into a single `Error` enum, while keeping the
//! domain errors available where a caller needs their detail.
//!
//! # Architecture
//!
//! - [`ColorinErrorTrait`] - Common interface implemented by all error types
//! - [`ErrorCategory`] - Classification of errors for handling strategies
//! - [`Error`] - Unified error enum wrapping all domain-specific errors
//!
//! # Usage
//!
//! ```rust,ignore
//! use colorin::error::{ColorinErrorTrait, Error};
//!
//! fn handle_error(err: Error) {
//!     if err.is_recoverable() {
//!         println!("Reintentando: {}", err.localized_desc());
//!     } else {
//!         eprintln!("Fatal error: {}", err);
//!     }
//! }
//! ```

use std::io;
use thiserror::Error;

pub use crate::config::ConfigError;
pub use crate::engine::error::{EngineError, ErrorKind};
pub use crate::storage::StoreError;

/// Common trait for all colorin error types
pub trait ColorinErrorTrait: std::error::Error {
    /// Check if this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Get localized (Spanish) description for user-facing messages
    fn localized_desc(&self) -> String;

    /// Get the error category for handling strategies
    fn category(&self) -> ErrorCategory;
}

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Malformed input
    Validation,
    /// Unknown record
    NotFound,
    /// Uniqueness violation or lost write race
    Conflict,
    /// Not enough eligible teachers
    Capacity,
    /// Storage and I/O errors
    Storage,
    /// Configuration errors
    Config,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    /// Get Spanish description for the category
    pub fn spanish_desc(&self) -> &'static str {
        match self {
            Self::Validation => "Error de validación",
            Self::NotFound => "Registro no encontrado",
            Self::Conflict => "Conflicto",
            Self::Capacity => "Profesores insuficientes",
            Self::Storage => "Error de almacenamiento",
            Self::Config => "Error de configuración",
            Self::Other => "Otro error",
        }
    }
}

impl From<ErrorKind> for ErrorCategory {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::NotFound => Self::NotFound,
            ErrorKind::DuplicateAssignment | ErrorKind::ConcurrencyConflict => Self::Conflict,
            ErrorKind::InsufficientCandidates => Self::Capacity,
            ErrorKind::InvalidRequest => Self::Validation,
        }
    }
}

impl ColorinErrorTrait for EngineError {
    fn is_recoverable(&self) -> bool {
        EngineError::is_recoverable(self)
    }

    fn localized_desc(&self) -> String {
        self.spanish_desc()
    }

    fn category(&self) -> ErrorCategory {
        self.kind().into()
    }
}

impl ColorinErrorTrait for StoreError {
    fn is_recoverable(&self) -> bool {
        matches!(self, Self::Conflict { .. } | Self::Timeout { .. })
    }

    fn localized_desc(&self) -> String {
        EngineError::from(self.clone()).spanish_desc()
    }

    fn category(&self) -> ErrorCategory {
        if self.is_structural() {
            ErrorCategory::Storage
        } else {
            EngineError::from(self.clone()).kind().into()
        }
    }
}

/// Unified error type for the colorin crate
#[derive(Error, Debug)]
pub enum Error {
    /// Assignment engine errors
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// Storage boundary errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{context}")]
    Other {
        context: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl ColorinErrorTrait for Error {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Engine(e) => ColorinErrorTrait::is_recoverable(e),
            Self::Store(e) => e.is_recoverable(),
            Self::Io(_) => true, // I/O errors are often transient
            Self::Json(_) | Self::Config(_) | Self::Other { .. } => false,
        }
    }

    fn localized_desc(&self) -> String {
        match self {
            Self::Engine(e) => e.spanish_desc(),
            Self::Store(e) => e.localized_desc(),
            Self::Config(msg) => format!("{}: {msg}", ErrorCategory::Config.spanish_desc()),
            Self::Io(e) => format!("Error de E/S: {e}"),
            Self::Json(e) => format!("JSON inválido: {e}"),
            Self::Other { context, .. } => context.clone(),
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Engine(e) => ColorinErrorTrait::category(e),
            Self::Store(e) => e.category(),
            Self::Config(_) => ErrorCategory::Config,
            Self::Io(_) => ErrorCategory::Storage,
            Self::Json(_) => ErrorCategory::Validation,
            Self::Other { .. } => ErrorCategory::Other,
        }
    }
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a generic error with context
    pub fn other(context: impl Into<String>) -> Self {
        Self::Other {
            context: context.into(),
            source: None,
        }
    }

    /// Create a generic error with context and source
    pub fn with_source(
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Other {
            context: context.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Taxonomy kind, when the error maps onto one
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Engine(e) => Some(e.kind()),
            Self::Store(e) if !e.is_structural() => Some(EngineError::from(e.clone()).kind()),
            Self::Json(_) => Some(ErrorKind::InvalidRequest),
            _ => None,
        }
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

// Conversion from anyhow::Error
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other {
            context: format!("{err:#}"),
            source: None,
        }
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;
