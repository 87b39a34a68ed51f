//! DDL generation.
//!
//! A dialect turns [`MigrationOperation`]s into SQL statements.

mod oracle;

pub use oracle::OracleDialect;

use oxide_oracle_core::formatter::quote_ident;
use oxide_oracle_core::{native_type, FieldDescriptor};

use crate::operations::MigrationOperation;

/// Trait for database-specific DDL generation.
pub trait MigrationDialect: Send + Sync {
    /// Returns the dialect name.
    fn name(&self) -> &'static str;

    /// Generates the statements for one operation.
    fn generate_sql(&self, operation: &MigrationOperation) -> Vec<String>;

    /// Generates a column definition: quoted name, type and nullability.
    fn column_definition(&self, field: &FieldDescriptor) -> String {
        format!("{} {}", self.quote_identifier(&field.name), native_type(field))
    }

    /// Quote an identifier (table name, column name, etc.).
    fn quote_identifier(&self, name: &str) -> String {
        quote_ident(name)
    }
}
