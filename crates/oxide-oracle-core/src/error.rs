//! Error types for query compilation.

use thiserror::Error;

/// Errors raised while turning a query tree into Oracle SQL.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CompileError {
    /// An expression node is malformed.
    #[error("invalid expression: {0}")]
    InvalidExpression(String),

    /// A function received an argument shape it cannot render.
    #[error("unsupported argument for {function}: {message}")]
    UnsupportedShape {
        /// The function that rejected the argument.
        function: &'static str,
        /// What was wrong with it.
        message: String,
    },

    /// A function node names no known dialect function.
    #[error("unknown dialect function '{0}'")]
    UnknownFunction(String),

    /// The query has no target entity.
    #[error("entity is missing")]
    MissingEntity,

    /// An argument is missing or out of range.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A JSON query document does not follow the query-tree contract.
    #[error("invalid query document: {0}")]
    Json(String),
}

/// Result type alias for compilation.
pub type Result<T> = std::result::Result<T, CompileError>;
