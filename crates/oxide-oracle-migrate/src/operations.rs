//! Schema operations issued by the migration engine.

use oxide_oracle_core::FieldDescriptor;

use crate::schema::QualifiedName;

/// A column to modify, with a flag telling whether its nullability already
/// matches the live column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnModification {
    /// Target definition.
    pub field: FieldDescriptor,
    /// Leave the NULL/NOT NULL constraint out of the MODIFY clause; Oracle
    /// rejects a change to the nullability the column already has.
    pub keep_nullability: bool,
}

/// A single DDL operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationOperation {
    /// Create a table with a primary key constraint.
    CreateTable {
        /// Table name.
        table: QualifiedName,
        /// Requested fields; one-to-many fields are skipped.
        fields: Vec<FieldDescriptor>,
    },

    /// Add columns to a table.
    AddColumns {
        /// Table name.
        table: QualifiedName,
        /// New columns.
        fields: Vec<FieldDescriptor>,
    },

    /// Change column types.
    ModifyColumns {
        /// Table name.
        table: QualifiedName,
        /// Columns to change.
        columns: Vec<ColumnModification>,
    },

    /// Drop a table.
    DropTable {
        /// Table name.
        table: QualifiedName,
    },

    /// Create a sequence starting at 1.
    CreateSequence {
        /// Sequence name.
        name: String,
    },

    /// Restart a sequence at a value.
    RestartSequence {
        /// Sequence name.
        name: String,
        /// Next value the sequence hands out.
        start: i64,
    },

    /// Create a secondary index.
    CreateIndex {
        /// Index name.
        name: String,
        /// Indexed table.
        table: QualifiedName,
        /// Columns in order.
        columns: Vec<String>,
    },

    /// Drop an index.
    DropIndex {
        /// Index name.
        name: String,
    },

    /// Create a view from compiled select text.
    CreateView {
        /// View name.
        name: QualifiedName,
        /// The view's SELECT statement.
        select_sql: String,
    },

    /// Drop a view.
    DropView {
        /// View name.
        name: QualifiedName,
    },
}

impl MigrationOperation {
    /// Returns a human-readable description of this operation.
    #[must_use]
    pub fn description(&self) -> String {
        match self {
            Self::CreateTable { table, .. } => format!("Create table '{table}'"),
            Self::AddColumns { table, fields } => {
                format!("Add {} column(s) to table '{table}'", fields.len())
            }
            Self::ModifyColumns { table, columns } => {
                format!("Modify {} column(s) of table '{table}'", columns.len())
            }
            Self::DropTable { table } => format!("Drop table '{table}'"),
            Self::CreateSequence { name } => format!("Create sequence '{name}'"),
            Self::RestartSequence { name, start } => {
                format!("Restart sequence '{name}' at {start}")
            }
            Self::CreateIndex { name, table, .. } => {
                format!("Create index '{name}' on table '{table}'")
            }
            Self::DropIndex { name } => format!("Drop index '{name}'"),
            Self::CreateView { name, .. } => format!("Create view '{name}'"),
            Self::DropView { name } => format!("Drop view '{name}'"),
        }
    }
}
