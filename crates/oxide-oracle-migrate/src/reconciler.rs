//! Migration reconciliation.
//!
//! A migration request describes the wanted columns of one table at one
//! version. Reconciling it:
//!
//! 1. ensures the ledger table exists (once per [`MigrationContext`]);
//! 2. skips the request when the ledger already holds an equal or higher
//!    version for the table;
//! 3. creates the table, or adds missing columns and modifies columns
//!    whose type differs;
//! 4. appends a ledger entry.
//!
//! DDL already issued is not rolled back when a later step fails. Two
//! processes reconciling the same version concurrently may both apply it.

use std::cmp::Ordering;

use oxide_oracle_core::FieldDescriptor;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::AdapterOptions;
use crate::connection::Connection;
use crate::diff::plan_columns;
use crate::error::{MigrateError, Result};
use crate::history::{compare_versions, MigrationLedger, MigrationLedgerEntry};
use crate::table::TableHandle;

pub use crate::history::MigrationContext;

/// A table definition to reconcile, read from camelCase JSON.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationRequest {
    /// Target table, `name` or `owner.name`.
    pub applies_to: String,
    /// Model the table belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Free text stored in the ledger.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Dotted version of this definition.
    pub version: String,
    /// Wanted columns.
    #[serde(default)]
    pub add: Vec<FieldDescriptor>,
    /// Must be empty; changes are derived from `add`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub change: Vec<FieldDescriptor>,
    /// Must be empty; columns are never dropped.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub remove: Vec<FieldDescriptor>,
}

impl MigrationRequest {
    /// A request for a table at a version.
    pub fn new(applies_to: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            applies_to: applies_to.into(),
            version: version.into(),
            ..Self::default()
        }
    }

    /// Sets the model.
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Adds a wanted column.
    #[must_use]
    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.add.push(field);
        self
    }

    fn validate(&self) -> Result<()> {
        if self.applies_to.trim().is_empty() {
            return Err(MigrateError::InvalidArgument(
                "migration target cannot be empty".to_string(),
            ));
        }
        if !self.remove.is_empty() {
            return Err(MigrateError::InvalidArgument(
                "removing columns is not supported".to_string(),
            ));
        }
        if !self.change.is_empty() {
            return Err(MigrateError::InvalidArgument(
                "changes are derived from the add collection; change must be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// What a reconciliation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// The ledger already held this version or a newer one.
    AlreadyApplied {
        /// Version found in the ledger.
        version: String,
    },
    /// The table did not exist and was created.
    Created {
        /// The new ledger entry.
        entry: MigrationLedgerEntry,
    },
    /// The table existed and was altered.
    Altered {
        /// Columns added.
        added: usize,
        /// Columns modified.
        changed: usize,
        /// The new ledger entry.
        entry: MigrationLedgerEntry,
    },
}

impl MigrationOutcome {
    /// Whether the request turned out to be applied already.
    #[must_use]
    pub const fn updated(&self) -> bool {
        matches!(self, Self::AlreadyApplied { .. })
    }

    /// The ledger entry written, if any.
    #[must_use]
    pub const fn entry(&self) -> Option<&MigrationLedgerEntry> {
        match self {
            Self::AlreadyApplied { .. } => None,
            Self::Created { entry } | Self::Altered { entry, .. } => Some(entry),
        }
    }
}

/// Brings tables in line with migration requests.
pub struct MigrationReconciler<'a, C: ?Sized> {
    conn: &'a C,
    options: &'a AdapterOptions,
    context: &'a MigrationContext,
}

impl<'a, C: Connection + ?Sized> MigrationReconciler<'a, C> {
    /// Creates a reconciler.
    pub const fn new(
        conn: &'a C,
        options: &'a AdapterOptions,
        context: &'a MigrationContext,
    ) -> Self {
        Self {
            conn,
            options,
            context,
        }
    }

    /// Reconciles one request.
    pub async fn migrate(&self, request: &MigrationRequest) -> Result<MigrationOutcome> {
        request.validate()?;

        let ledger = MigrationLedger::new(self.conn, self.options);
        ledger.ensure_table(self.context).await?;

        let current = ledger.version(&request.applies_to).await?;
        if compare_versions(&current, &request.version) != Ordering::Less {
            warn!(
                table = %request.applies_to,
                version = %request.version,
                applied = %current,
                "Migration already applied, skipping"
            );
            return Ok(MigrationOutcome::AlreadyApplied { version: current });
        }

        let table = TableHandle::new(self.conn, self.options, &request.applies_to);
        let created = !table.exists().await?;
        let (added, changed) = if created {
            table.create(&request.add).await?;
            (0, 0)
        } else {
            let columns = table.columns().await?;
            let plan = plan_columns(&request.add, &columns);
            table.add(&plan.add).await?;
            if !plan.change.is_empty() {
                table.change_with(&plan.change, &columns).await?;
            }
            (plan.add.len(), plan.change.len())
        };

        let entry = ledger
            .record(
                &request.applies_to,
                request.model.as_deref(),
                &request.version,
                request.description.as_deref(),
            )
            .await?;

        if created {
            info!(table = %request.applies_to, version = %request.version, "Table created");
            Ok(MigrationOutcome::Created { entry })
        } else {
            info!(
                table = %request.applies_to,
                version = %request.version,
                added,
                changed,
                "Table altered"
            );
            Ok(MigrationOutcome::Altered {
                added,
                changed,
                entry,
            })
        }
    }
}
