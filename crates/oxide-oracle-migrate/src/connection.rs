//! The execution seam between the engine and an Oracle driver.
//!
//! Drivers implement [`Connection`]. Statements use `?` positional
//! placeholders; a driver that needs `:1` style binds, or none at all, can
//! rewrite them or inline the values with [`oxide_oracle_core::value::prepare`].

use async_trait::async_trait;
use oxide_oracle_core::SqlValue;
use serde_json::Value;

use crate::error::EngineError;

/// One result row, keyed by column name.
pub type Row = serde_json::Map<String, Value>;

/// A connection able to execute SQL against Oracle.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Executes one statement and returns its rows (empty for DDL and DML).
    async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>, EngineError>;

    /// Starts a transaction.
    async fn begin(&self) -> Result<(), EngineError> {
        Ok(())
    }

    /// Commits the current transaction.
    async fn commit(&self) -> Result<(), EngineError> {
        Ok(())
    }

    /// Rolls back the current transaction.
    async fn rollback(&self) -> Result<(), EngineError> {
        Ok(())
    }
}

#[async_trait]
impl<C: Connection + ?Sized> Connection for &C {
    async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>, EngineError> {
        (**self).execute(sql, params).await
    }

    async fn begin(&self) -> Result<(), EngineError> {
        (**self).begin().await
    }

    async fn commit(&self) -> Result<(), EngineError> {
        (**self).commit().await
    }

    async fn rollback(&self) -> Result<(), EngineError> {
        (**self).rollback().await
    }
}

/// Lenient typed access to row values.
///
/// Oracle drivers disagree on how `NUMBER` columns come back (numbers or
/// numeric strings) and on the case of column names, so lookups fall back
/// to a case-insensitive match and numbers are parsed from text.
pub trait RowExt {
    /// Returns the raw value of a column.
    fn value(&self, column: &str) -> Option<&Value>;

    /// Returns a column as text.
    fn text(&self, column: &str) -> Option<String> {
        match self.value(column)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Returns a column as an integer.
    fn int(&self, column: &str) -> Option<i64> {
        match self.value(column)? {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
            Value::String(s) => s.trim().parse().ok(),
            Value::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    /// Returns a column as a boolean (`1`/`0`, `Y`/`N`, `true`/`false`).
    fn flag(&self, column: &str) -> Option<bool> {
        match self.value(column)? {
            Value::Bool(b) => Some(*b),
            Value::String(s) => match s.as_str() {
                "Y" | "y" | "true" | "1" => Some(true),
                "N" | "n" | "false" | "0" => Some(false),
                _ => None,
            },
            _ => self.int(column).map(|n| n != 0),
        }
    }
}

impl RowExt for Row {
    fn value(&self, column: &str) -> Option<&Value> {
        self.get(column).or_else(|| {
            self.iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(column))
                .map(|(_, value)| value)
        })
    }
}
