//! Migration ledger.
//!
//! This module manages the `migrations` table that records which version of
//! each table definition has been applied. The ledger is append-only.

use std::cmp::Ordering;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};

use oxide_oracle_core::SqlValue;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::AdapterOptions;
use crate::connection::{Connection, RowExt};
use crate::error::{MigrateError, Result};
use crate::identity::IdentityAllocator;
use crate::introspect::Introspector;
use crate::schema::QualifiedName;

/// Name of the ledger table.
pub const MIGRATIONS_TABLE: &str = "migrations";

/// SQL to create the ledger table.
pub const CREATE_MIGRATIONS_TABLE_SQL: &str = r#"CREATE TABLE "migrations"("id" NUMBER(10) NOT NULL, "appliesTo" NVARCHAR2(255) NOT NULL, "model" NVARCHAR2(255) NULL, "description" NVARCHAR2(255),"version" NVARCHAR2(24) NOT NULL, CONSTRAINT "migrations_pk" PRIMARY KEY ("id"))"#;

/// SQL to create the sequence behind ledger ids.
pub const CREATE_MIGRATIONS_SEQUENCE_SQL: &str =
    r#"CREATE SEQUENCE "migrations_id_seq" START WITH 1 INCREMENT BY 1"#;

const INSERT_ENTRY_SQL: &str = r#"INSERT INTO "migrations"("id","appliesTo","model","version","description") VALUES (?,?,?,?,?)"#;

const SELECT_VERSIONS_SQL: &str = r#"SELECT "version" FROM "migrations" WHERE "appliesTo"=?"#;

const SELECT_ENTRIES_SQL: &str = r#"SELECT "id", "appliesTo", "model", "version", "description" FROM "migrations" ORDER BY "id""#;

/// Version reported for tables that have never been migrated.
pub const INITIAL_VERSION: &str = "0.0";

/// One row of the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationLedgerEntry {
    /// Ledger id from `migrations_id_seq`.
    pub id: i64,
    /// Migrated table.
    pub applies_to: String,
    /// Model the table belongs to.
    pub model: Option<String>,
    /// Applied version.
    pub version: String,
    /// Free text.
    pub description: Option<String>,
}

/// Per-adapter migration state.
///
/// Remembers whether the ledger table is known to exist, so it is checked
/// once per context rather than once per migration.
#[derive(Debug, Default)]
pub struct MigrationContext {
    bootstrapped: AtomicBool,
}

impl MigrationContext {
    /// A context that has not checked the ledger yet.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            bootstrapped: AtomicBool::new(false),
        }
    }

    /// Whether the ledger table is known to exist.
    #[must_use]
    pub fn is_bootstrapped(&self) -> bool {
        self.bootstrapped.load(AtomicOrdering::Acquire)
    }

    fn mark_bootstrapped(&self) {
        self.bootstrapped.store(true, AtomicOrdering::Release);
    }
}

/// Compares dotted versions segment by segment.
///
/// Numeric segments compare as numbers (`1.10 > 1.9`), anything else as
/// text. Missing trailing segments count as zero, so `1.0 == 1`.
#[must_use]
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let left: Vec<&str> = a.trim().split('.').collect();
    let right: Vec<&str> = b.trim().split('.').collect();
    for i in 0..left.len().max(right.len()) {
        let x = left.get(i).copied().unwrap_or("0");
        let y = right.get(i).copied().unwrap_or("0");
        let ordering = match (x.parse::<u64>(), y.parse::<u64>()) {
            (Ok(x), Ok(y)) => x.cmp(&y),
            _ => x.cmp(y),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

/// Reads and appends ledger entries.
pub struct MigrationLedger<'a, C: ?Sized> {
    conn: &'a C,
    options: &'a AdapterOptions,
}

impl<'a, C: Connection + ?Sized> MigrationLedger<'a, C> {
    /// Creates a ledger over a connection.
    pub const fn new(conn: &'a C, options: &'a AdapterOptions) -> Self {
        Self { conn, options }
    }

    /// Creates the ledger table and its sequence unless the context already
    /// knows they exist.
    pub async fn ensure_table(&self, context: &MigrationContext) -> Result<()> {
        if context.is_bootstrapped() {
            return Ok(());
        }
        let introspector = Introspector::new(self.conn, self.options);
        if !introspector
            .table_exists(&QualifiedName::new(MIGRATIONS_TABLE))
            .await?
        {
            info!("Creating migration ledger table");
            for sql in [CREATE_MIGRATIONS_TABLE_SQL, CREATE_MIGRATIONS_SEQUENCE_SQL] {
                self.conn.execute(sql, &[]).await?;
            }
        }
        context.mark_bootstrapped();
        Ok(())
    }

    /// The highest applied version of a table, or `0.0`.
    pub async fn version(&self, applies_to: &str) -> Result<String> {
        let rows = self
            .conn
            .execute(SELECT_VERSIONS_SQL, &[SqlValue::Text(applies_to.to_string())])
            .await?;
        Ok(rows
            .iter()
            .filter_map(|row| row.text("version"))
            .max_by(|a, b| compare_versions(a, b))
            .unwrap_or_else(|| INITIAL_VERSION.to_string()))
    }

    /// Appends an entry and returns it with its allocated id.
    pub async fn record(
        &self,
        applies_to: &str,
        model: Option<&str>,
        version: &str,
        description: Option<&str>,
    ) -> Result<MigrationLedgerEntry> {
        let id = IdentityAllocator::new(self.conn, self.options)
            .next_value(MIGRATIONS_TABLE, "id")
            .await?;
        let optional = |value: Option<&str>| value.map_or(SqlValue::Null, |v| SqlValue::Text(v.to_string()));
        let params = [
            SqlValue::Int(id),
            SqlValue::Text(applies_to.to_string()),
            optional(model),
            SqlValue::Text(version.to_string()),
            optional(description),
        ];
        self.conn.execute(INSERT_ENTRY_SQL, &params).await?;
        debug!(id, applies_to = %applies_to, version = %version, "Recorded migration");

        Ok(MigrationLedgerEntry {
            id,
            applies_to: applies_to.to_string(),
            model: model.map(str::to_string),
            version: version.to_string(),
            description: description.map(str::to_string),
        })
    }

    /// All entries in id order.
    pub async fn entries(&self) -> Result<Vec<MigrationLedgerEntry>> {
        let rows = self.conn.execute(SELECT_ENTRIES_SQL, &[]).await?;
        rows.iter()
            .map(|row| {
                Ok(MigrationLedgerEntry {
                    id: row
                        .int("id")
                        .ok_or_else(|| MigrateError::InvalidState("ledger row without id".into()))?,
                    applies_to: row.text("appliesTo").unwrap_or_default(),
                    model: row.text("model"),
                    version: row.text("version").unwrap_or_default(),
                    description: row.text("description"),
                })
            })
            .collect()
    }
}
