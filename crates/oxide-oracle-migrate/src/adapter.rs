//! The Oracle adapter.
//!
//! [`OracleAdapter`] ties a driver [`Connection`] to the formatter, the
//! introspector, the migration reconciler and the identity allocator.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::future::BoxFuture;
use oxide_oracle_core::formatter::quote_ident;
use oxide_oracle_core::{escape, OracleFormatter, SqlValue, Statement};
use tracing::{debug, error};

use crate::config::AdapterOptions;
use crate::connection::{Connection, Row};
use crate::error::Result;
use crate::history::MigrationContext;
use crate::identity::IdentityAllocator;
use crate::introspect::Introspector;
use crate::observer::{ObservedConnection, QueryObserver};
use crate::reconciler::{MigrationOutcome, MigrationReconciler, MigrationRequest};
use crate::schema::{TableDescriptor, ViewDescriptor};
use crate::table::{IndexHandle, TableHandle, ViewHandle};

/// An Oracle database adapter over a driver connection.
pub struct OracleAdapter<C> {
    conn: ObservedConnection<C>,
    options: AdapterOptions,
    formatter: OracleFormatter,
    context: MigrationContext,
    in_transaction: AtomicBool,
}

impl<C: Connection> OracleAdapter<C> {
    /// Creates an adapter.
    pub fn new(conn: C, options: AdapterOptions) -> Self {
        Self {
            conn: ObservedConnection::new(conn),
            formatter: OracleFormatter::with_settings(options.formatter_settings()),
            options,
            context: MigrationContext::new(),
            in_transaction: AtomicBool::new(false),
        }
    }

    /// Registers an observer run around every statement.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn QueryObserver>) -> Self {
        self.conn.add_observer(observer);
        self
    }

    /// The formatter used for query trees.
    pub const fn formatter(&self) -> &OracleFormatter {
        &self.formatter
    }

    /// The adapter options.
    pub const fn options(&self) -> &AdapterOptions {
        &self.options
    }

    /// The observed connection.
    pub const fn connection(&self) -> &ObservedConnection<C> {
        &self.conn
    }

    /// Executes raw SQL with `?` parameters.
    pub async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>> {
        Ok(self.conn.run(sql, params, None).await?)
    }

    /// Compiles and executes a statement.
    pub async fn execute_query(&self, statement: &Statement) -> Result<Vec<Row>> {
        let sql = self.formatter.format(statement)?;
        Ok(self.conn.run(&sql, &[], Some(statement)).await?)
    }

    /// A handle over a table, `name` or `owner.name`.
    pub fn table(&self, name: &str) -> TableHandle<'_, ObservedConnection<C>> {
        TableHandle::new(&self.conn, &self.options, name)
    }

    /// A handle over a view, `name` or `owner.name`.
    pub fn view(&self, name: &str) -> ViewHandle<'_, ObservedConnection<C>> {
        ViewHandle::new(&self.conn, &self.options, &self.formatter, name)
    }

    /// A handle over a table's indexes.
    pub fn indexes(&self, table: &str) -> IndexHandle<'_, ObservedConnection<C>> {
        IndexHandle::new(&self.conn, &self.options, table)
    }

    /// Lists tables of the configured schema or of the connecting user.
    pub async fn list_tables(&self) -> Result<Vec<TableDescriptor>> {
        Introspector::new(&self.conn, &self.options)
            .list_tables()
            .await
    }

    /// Lists views of the configured schema or of the connecting user.
    pub async fn list_views(&self) -> Result<Vec<ViewDescriptor>> {
        Introspector::new(&self.conn, &self.options)
            .list_views()
            .await
    }

    /// Reconciles a table with a migration request.
    pub async fn migrate(&self, request: &MigrationRequest) -> Result<MigrationOutcome> {
        MigrationReconciler::new(&self.conn, &self.options, &self.context)
            .migrate(request)
            .await
    }

    /// Returns the next identity value of an entity attribute.
    pub async fn select_identity(&self, entity: &str, attribute: &str) -> Result<i64> {
        IdentityAllocator::new(&self.conn, &self.options)
            .next_value(entity, attribute)
            .await
    }

    /// Restarts an identity sequence after the column's current maximum.
    pub async fn reset_identity(&self, entity: &str, attribute: &str) -> Result<i64> {
        IdentityAllocator::new(&self.conn, &self.options)
            .reset(entity, attribute)
            .await
    }

    /// `ALTER SESSION` statements for the configured session parameters.
    #[must_use]
    pub fn session_statements(&self) -> Vec<String> {
        self.options
            .session
            .iter()
            .map(|(key, value)| {
                format!(
                    "ALTER session SET {}={}",
                    quote_ident(key),
                    escape(&SqlValue::from(value.clone()), false)
                )
            })
            .collect()
    }

    /// Applies the configured session parameters.
    pub async fn init_session(&self) -> Result<()> {
        for sql in self.session_statements() {
            self.execute(&sql, &[]).await?;
        }
        Ok(())
    }

    /// Runs `f` inside a transaction.
    ///
    /// A call made while a transaction is already open runs `f` inside the
    /// outer transaction. The transaction commits when `f` succeeds and
    /// rolls back when it fails.
    pub async fn execute_in_transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: for<'b> FnOnce(&'b Self) -> BoxFuture<'b, Result<T>>,
    {
        if self.in_transaction.swap(true, Ordering::AcqRel) {
            return f(self).await;
        }
        if let Err(err) = self.conn.begin().await {
            self.in_transaction.store(false, Ordering::Release);
            return Err(err.into());
        }

        let result = f(self).await;
        let finished = match &result {
            Ok(_) => self.conn.commit().await,
            Err(_) => self.conn.rollback().await,
        };
        self.in_transaction.store(false, Ordering::Release);

        match (result, finished) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(err)) => Err(err.into()),
            (Err(err), Ok(())) => {
                debug!(error = %err, "Transaction rolled back");
                Err(err)
            }
            (Err(err), Err(rollback)) => {
                error!(error = %rollback, "Rollback failed");
                Err(err)
            }
        }
    }
}
