//! Handles over one table, view or table's indexes.

use oxide_oracle_core::{FieldDescriptor, OracleFormatter, QueryExpression};
use tracing::{debug, info};

use crate::config::AdapterOptions;
use crate::connection::Connection;
use crate::diff::modifications;
use crate::dialect::{MigrationDialect, OracleDialect};
use crate::error::{MigrateError, Result};
use crate::history::{MigrationLedger, INITIAL_VERSION};
use crate::introspect::Introspector;
use crate::operations::MigrationOperation;
use crate::schema::{ColumnDescriptor, IndexDescriptor, QualifiedName};

/// Executes the statements of one operation.
pub(crate) async fn apply<C: Connection + ?Sized>(
    conn: &C,
    operation: &MigrationOperation,
) -> Result<()> {
    let statements = OracleDialect::new().generate_sql(operation);
    if statements.is_empty() {
        return Ok(());
    }
    info!(operation = %operation.description(), "Applying");
    for sql in statements {
        conn.execute(&sql, &[]).await?;
    }
    Ok(())
}

/// A table, addressed as `name` or `owner.name`.
pub struct TableHandle<'a, C: ?Sized> {
    conn: &'a C,
    options: &'a AdapterOptions,
    raw_name: String,
    name: QualifiedName,
}

impl<'a, C: Connection + ?Sized> TableHandle<'a, C> {
    /// Creates a handle; bare names take the configured schema.
    pub fn new(conn: &'a C, options: &'a AdapterOptions, name: &str) -> Self {
        Self {
            conn,
            options,
            raw_name: name.to_string(),
            name: QualifiedName::resolve(name, options.schema.as_deref()),
        }
    }

    /// The resolved table name.
    #[must_use]
    pub const fn name(&self) -> &QualifiedName {
        &self.name
    }

    fn introspector(&self) -> Introspector<'a, C> {
        Introspector::new(self.conn, self.options)
    }

    /// Whether the table exists.
    pub async fn exists(&self) -> Result<bool> {
        self.introspector().table_exists(&self.name).await
    }

    /// The highest version recorded in the ledger, or `0.0`.
    pub async fn version(&self) -> Result<String> {
        match MigrationLedger::new(self.conn, self.options)
            .version(&self.raw_name)
            .await
        {
            Err(MigrateError::Engine(err)) if err.is_object_not_found() => {
                Ok(INITIAL_VERSION.to_string())
            }
            other => other,
        }
    }

    /// The live columns.
    pub async fn columns(&self) -> Result<Vec<ColumnDescriptor>> {
        self.introspector().columns(&self.name).await
    }

    /// Whether the table's `<name>_seq` sequence exists.
    pub async fn has_sequence(&self) -> Result<bool> {
        let sequence = QualifiedName {
            owner: self.name.owner.clone(),
            name: format!("{}_seq", self.name.name),
        };
        self.introspector().has_sequence(&sequence).await
    }

    /// Creates the table with a primary key constraint over primary fields.
    pub async fn create(&self, fields: &[FieldDescriptor]) -> Result<()> {
        if fields.is_empty() {
            return Err(MigrateError::InvalidArgument(
                "fields collection cannot be empty".to_string(),
            ));
        }
        apply(
            self.conn,
            &MigrationOperation::CreateTable {
                table: self.name.clone(),
                fields: fields.to_vec(),
            },
        )
        .await
    }

    /// Adds columns. Does nothing for an empty list.
    pub async fn add(&self, fields: &[FieldDescriptor]) -> Result<()> {
        apply(
            self.conn,
            &MigrationOperation::AddColumns {
                table: self.name.clone(),
                fields: fields.to_vec(),
            },
        )
        .await
    }

    /// Changes column types, leaving nullability out where it already
    /// matches. Does nothing for an empty list.
    pub async fn change(&self, fields: &[FieldDescriptor]) -> Result<()> {
        if fields.is_empty() {
            return Ok(());
        }
        let columns = self.columns().await?;
        self.change_with(fields, &columns).await
    }

    pub(crate) async fn change_with(
        &self,
        fields: &[FieldDescriptor],
        columns: &[ColumnDescriptor],
    ) -> Result<()> {
        apply(
            self.conn,
            &MigrationOperation::ModifyColumns {
                table: self.name.clone(),
                columns: modifications(fields, columns),
            },
        )
        .await
    }

    /// Drops the table when it exists.
    pub async fn drop(&self) -> Result<()> {
        if !self.exists().await? {
            debug!(table = %self.name, "Table does not exist, nothing to drop");
            return Ok(());
        }
        apply(
            self.conn,
            &MigrationOperation::DropTable {
                table: self.name.clone(),
            },
        )
        .await
    }
}

/// A view, addressed as `name` or `owner.name`.
pub struct ViewHandle<'a, C: ?Sized> {
    conn: &'a C,
    options: &'a AdapterOptions,
    formatter: &'a OracleFormatter,
    name: QualifiedName,
}

impl<'a, C: Connection + ?Sized> ViewHandle<'a, C> {
    /// Creates a handle; bare names take the configured schema.
    pub fn new(
        conn: &'a C,
        options: &'a AdapterOptions,
        formatter: &'a OracleFormatter,
        name: &str,
    ) -> Self {
        Self {
            conn,
            options,
            formatter,
            name: QualifiedName::resolve(name, options.schema.as_deref()),
        }
    }

    /// Whether the view exists.
    pub async fn exists(&self) -> Result<bool> {
        Introspector::new(self.conn, self.options)
            .view_exists(&self.name)
            .await
    }

    /// Drops the view when it exists.
    pub async fn drop(&self) -> Result<()> {
        if !self.exists().await? {
            return Ok(());
        }
        apply(
            self.conn,
            &MigrationOperation::DropView {
                name: self.name.clone(),
            },
        )
        .await
    }

    /// Replaces the view with one over `query`, inside a transaction.
    pub async fn create(&self, query: &QueryExpression) -> Result<()> {
        let select_sql = self.formatter.format_select(query)?;
        self.conn.begin().await?;
        let result = async {
            self.drop().await?;
            apply(
                self.conn,
                &MigrationOperation::CreateView {
                    name: self.name.clone(),
                    select_sql,
                },
            )
            .await
        }
        .await;
        match result {
            Ok(()) => {
                self.conn.commit().await?;
                Ok(())
            }
            Err(err) => {
                self.conn.rollback().await?;
                Err(err)
            }
        }
    }
}

/// The secondary indexes of one table.
pub struct IndexHandle<'a, C: ?Sized> {
    conn: &'a C,
    options: &'a AdapterOptions,
    table: QualifiedName,
}

impl<'a, C: Connection + ?Sized> IndexHandle<'a, C> {
    /// Creates a handle; bare names take the configured schema, or the
    /// connecting user when no schema is configured.
    pub fn new(conn: &'a C, options: &'a AdapterOptions, table: &str) -> Self {
        Self {
            conn,
            options,
            table: QualifiedName::resolve(table, options.schema.as_deref()),
        }
    }

    /// Lists the table's indexes.
    pub async fn list(&self) -> Result<Vec<IndexDescriptor>> {
        Introspector::new(self.conn, self.options)
            .list_indexes(&self.table)
            .await
    }

    /// Creates an index, re-creating it when it exists over other columns.
    pub async fn create(&self, name: &str, columns: &[String]) -> Result<()> {
        if columns.is_empty() {
            return Err(MigrateError::InvalidArgument(format!(
                "index {name} needs at least one column"
            )));
        }
        let indexes = self.list().await?;
        if let Some(existing) = indexes.iter().find(|ix| ix.name == name) {
            let same = existing.columns.len() == columns.len()
                && columns.iter().all(|c| existing.columns.contains(c));
            if same {
                debug!(index = %name, "Index already up to date");
                return Ok(());
            }
            apply(
                self.conn,
                &MigrationOperation::DropIndex {
                    name: name.to_string(),
                },
            )
            .await?;
        }
        apply(
            self.conn,
            &MigrationOperation::CreateIndex {
                name: name.to_string(),
                table: self.table.clone(),
                columns: columns.to_vec(),
            },
        )
        .await
    }

    /// Drops an index when it exists.
    pub async fn drop(&self, name: &str) -> Result<()> {
        let indexes = self.list().await?;
        if !indexes.iter().any(|ix| ix.name == name) {
            return Ok(());
        }
        apply(
            self.conn,
            &MigrationOperation::DropIndex {
                name: name.to_string(),
            },
        )
        .await
    }
}
