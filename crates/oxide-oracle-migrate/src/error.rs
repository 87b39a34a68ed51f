//! Error types for the migration engine.

use std::path::PathBuf;

use oxide_oracle_core::CompileError;

/// Oracle error codes meaning the object does not exist (table or view,
/// then object in general).
const OBJECT_NOT_FOUND_CODES: [&str; 2] = ["ORA-00942", "ORA-04043"];

/// An error reported by the database engine behind a [`Connection`].
///
/// [`Connection`]: crate::connection::Connection
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct EngineError {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl EngineError {
    /// Creates an engine error from a message, typically `ORA-xxxxx: ...`.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Wraps a driver error.
    pub fn from_source(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self {
            message: source.to_string(),
            source: Some(Box::new(source)),
        }
    }

    /// The engine's message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Whether the engine reported that the object does not exist.
    #[must_use]
    pub fn is_object_not_found(&self) -> bool {
        OBJECT_NOT_FOUND_CODES
            .iter()
            .any(|code| self.message.contains(code))
    }
}

/// Errors that can occur during migration and adapter operations.
#[derive(Debug, thiserror::Error)]
pub enum MigrateError {
    /// A caller supplied an argument the engine refuses.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A query tree could not be compiled.
    #[error("Compile error: {0}")]
    Compile(#[from] CompileError),

    /// The database engine rejected a statement.
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// A result had an unexpected shape.
    #[error("Invalid migration state: {0}")]
    InvalidState(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error reading a definition or options file.
    #[error("IO error reading '{path}': {source}")]
    Io {
        /// The file being read.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },
}

/// Result type for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;
