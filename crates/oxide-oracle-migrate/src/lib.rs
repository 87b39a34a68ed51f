//! Idempotent schema migrations for Oracle.
//!
//! `oxide-oracle-migrate` brings tables in line with declarative
//! definitions and keeps a ledger of applied versions, where:
//! - A definition lists the wanted columns with abstract types
//! - Missing tables are created, missing columns added, changed columns modified
//! - Applying the same version twice is a no-op
//!
//! # Architecture
//!
//! - **Connection** - The seam to an Oracle driver; everything runs through it
//! - **Introspector** - Reads tables, columns, views, indexes and sequences
//! - **Dialect** - Renders DDL for schema operations
//! - **Reconciler** - Diffs a definition against the live table and records it
//! - **Identity** - Sequence-backed identity values
//! - **Adapter** - Wires the above together with the query formatter
//!
//! # Example
//!
//! ```rust,ignore
//! use oxide_oracle_migrate::prelude::*;
//!
//! let adapter = OracleAdapter::new(driver, AdapterOptions::default())
//!     .with_observer(Arc::new(JsonResultParser));
//!
//! let request = MigrationRequest::new("Products", "1.0")
//!     .field(FieldDescriptor::new("id", AbstractType::Counter).primary_key())
//!     .field(FieldDescriptor::new("name", AbstractType::Text).with_size(255));
//!
//! let outcome = adapter.migrate(&request).await?;
//! assert!(!outcome.updated());
//! ```

pub mod adapter;
pub mod config;
pub mod connection;
pub mod dialect;
pub mod diff;
pub mod error;
pub mod history;
pub mod identity;
pub mod introspect;
pub mod observer;
pub mod operations;
pub mod reconciler;
pub mod schema;
pub mod table;

pub use adapter::OracleAdapter;
pub use config::AdapterOptions;
pub use connection::{Connection, Row, RowExt};
pub use error::{EngineError, MigrateError, Result};
pub use reconciler::{MigrationOutcome, MigrationReconciler, MigrationRequest};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::adapter::OracleAdapter;
    pub use crate::config::AdapterOptions;
    pub use crate::connection::{Connection, Row, RowExt};
    pub use crate::dialect::{MigrationDialect, OracleDialect};
    pub use crate::error::{EngineError, MigrateError, Result};
    pub use crate::history::{MigrationContext, MigrationLedgerEntry};
    pub use crate::identity::sequence_name;
    pub use crate::observer::{JsonResultParser, QueryObserver};
    pub use crate::operations::MigrationOperation;
    pub use crate::reconciler::{MigrationOutcome, MigrationRequest};
    pub use crate::schema::{ColumnDescriptor, IndexDescriptor, QualifiedName};
    pub use oxide_oracle_core::{AbstractType, FieldDescriptor};
}
