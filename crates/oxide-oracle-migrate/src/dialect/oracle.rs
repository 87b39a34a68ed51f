//! Oracle DDL.
//!
//! Oracle has no `IF EXISTS` clauses; callers check the catalog first.
//! Column lists of `ALTER TABLE` are parenthesized and applied in one
//! statement.

use oxide_oracle_core::types::base_type;
use oxide_oracle_core::FieldDescriptor;

use crate::operations::{ColumnModification, MigrationOperation};
use crate::schema::QualifiedName;

use super::MigrationDialect;

/// Oracle migration dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct OracleDialect;

impl OracleDialect {
    /// Creates a new Oracle dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn create_table_sql(&self, table: &QualifiedName, fields: &[FieldDescriptor]) -> String {
        let columns: Vec<&FieldDescriptor> = fields.iter().filter(|f| !f.one_to_many).collect();
        let mut definitions: Vec<String> = columns
            .iter()
            .map(|f| self.column_definition(f))
            .collect();

        let primary: Vec<String> = columns
            .iter()
            .filter(|f| f.primary)
            .map(|f| self.quote_identifier(&f.name))
            .collect();
        if !primary.is_empty() {
            definitions.push(format!(
                "CONSTRAINT {} PRIMARY KEY ({})",
                self.quote_identifier(&format!("{}_pk", table.name)),
                primary.join(", ")
            ));
        }

        format!("CREATE TABLE {} ({})", table.to_sql(), definitions.join(", "))
    }

    fn add_columns_sql(&self, table: &QualifiedName, fields: &[FieldDescriptor]) -> String {
        let definitions: Vec<String> = fields
            .iter()
            .filter(|f| !f.one_to_many)
            .map(|f| self.column_definition(f))
            .collect();
        format!("ALTER TABLE {} ADD ({})", table.to_sql(), definitions.join(", "))
    }

    fn modify_columns_sql(&self, table: &QualifiedName, columns: &[ColumnModification]) -> String {
        let definitions: Vec<String> = columns
            .iter()
            .map(|c| {
                if c.keep_nullability {
                    format!(
                        "{} {}",
                        self.quote_identifier(&c.field.name),
                        base_type(&c.field)
                    )
                } else {
                    self.column_definition(&c.field)
                }
            })
            .collect();
        format!(
            "ALTER TABLE {} MODIFY ({})",
            table.to_sql(),
            definitions.join(", ")
        )
    }

    fn create_index_sql(&self, name: &str, table: &QualifiedName, columns: &[String]) -> String {
        let quoted: Vec<String> = columns.iter().map(|c| self.quote_identifier(c)).collect();
        format!(
            "CREATE INDEX {} ON {}({})",
            self.quote_identifier(name),
            table.to_sql(),
            quoted.join(",")
        )
    }
}

impl MigrationDialect for OracleDialect {
    fn name(&self) -> &'static str {
        "oracle"
    }

    fn generate_sql(&self, operation: &MigrationOperation) -> Vec<String> {
        match operation {
            MigrationOperation::CreateTable { table, fields } => {
                vec![self.create_table_sql(table, fields)]
            }
            MigrationOperation::AddColumns { fields, .. } if fields.is_empty() => vec![],
            MigrationOperation::AddColumns { table, fields } => {
                vec![self.add_columns_sql(table, fields)]
            }
            MigrationOperation::ModifyColumns { columns, .. } if columns.is_empty() => vec![],
            MigrationOperation::ModifyColumns { table, columns } => {
                vec![self.modify_columns_sql(table, columns)]
            }
            MigrationOperation::DropTable { table } => {
                vec![format!("DROP TABLE {}", table.to_sql())]
            }
            MigrationOperation::CreateSequence { name } => vec![format!(
                "CREATE SEQUENCE {} START WITH 1 INCREMENT BY 1",
                self.quote_identifier(name)
            )],
            MigrationOperation::RestartSequence { name, start } => vec![format!(
                "ALTER SEQUENCE {} RESTART START WITH {start} INCREMENT BY 1",
                self.quote_identifier(name)
            )],
            MigrationOperation::CreateIndex {
                name,
                table,
                columns,
            } => vec![self.create_index_sql(name, table, columns)],
            MigrationOperation::DropIndex { name } => {
                vec![format!("DROP INDEX {}", self.quote_identifier(name))]
            }
            MigrationOperation::CreateView { name, select_sql } => {
                vec![format!("CREATE VIEW {} AS {select_sql}", name.to_sql())]
            }
            MigrationOperation::DropView { name } => {
                vec![format!("DROP VIEW {}", name.to_sql())]
            }
        }
    }
}
