//! Hooks around statement execution.
//!
//! Observers see every statement before it runs and may rewrite its rows
//! afterwards. They run in registration order. [`JsonResultParser`] is the
//! built-in observer that turns JSON text produced by the JSON functions
//! back into structured values.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use oxide_oracle_core::query::{Expr, Field, Function};
use oxide_oracle_core::value::prepare;
use oxide_oracle_core::{SqlValue, Statement};
use serde_json::Value;
use tracing::{debug, error};

use crate::connection::{Connection, Row};
use crate::error::EngineError;

/// A statement about to be executed.
#[derive(Debug, Clone, Copy)]
pub struct ExecutingEvent<'a> {
    /// SQL text.
    pub sql: &'a str,
    /// Positional parameters.
    pub params: &'a [SqlValue],
    /// The query tree the SQL was compiled from, if any.
    pub statement: Option<&'a Statement>,
}

/// A statement that completed, with its rows.
#[derive(Debug)]
pub struct ExecutedEvent<'a> {
    /// SQL text.
    pub sql: &'a str,
    /// Positional parameters.
    pub params: &'a [SqlValue],
    /// The query tree the SQL was compiled from, if any.
    pub statement: Option<&'a Statement>,
    /// Result rows. Observers may rewrite them.
    pub rows: &'a mut Vec<Row>,
}

/// Callbacks run around every statement.
pub trait QueryObserver: Send + Sync {
    /// Called before the statement is sent.
    fn executing(&self, _event: &ExecutingEvent<'_>) {}

    /// Called after the statement succeeded.
    fn executed(&self, _event: &mut ExecutedEvent<'_>) {}
}

/// A connection that logs statements and runs observers around them.
pub struct ObservedConnection<C> {
    inner: C,
    observers: Vec<Arc<dyn QueryObserver>>,
}

impl<C: Connection> ObservedConnection<C> {
    /// Wraps a connection with no observers.
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            observers: Vec::new(),
        }
    }

    /// Registers an observer.
    pub fn add_observer(&mut self, observer: Arc<dyn QueryObserver>) {
        self.observers.push(observer);
    }

    /// The wrapped connection.
    pub const fn inner(&self) -> &C {
        &self.inner
    }

    /// Executes a statement, passing the originating query tree to observers.
    pub async fn run(
        &self,
        sql: &str,
        params: &[SqlValue],
        statement: Option<&Statement>,
    ) -> Result<Vec<Row>, EngineError> {
        {
            let event = ExecutingEvent {
                sql,
                params,
                statement,
            };
            for observer in &self.observers {
                observer.executing(&event);
            }
        }

        debug!(sql = %sql, params = params.len(), "Executing SQL");
        let started = Instant::now();
        let mut rows = match self.inner.execute(sql, params).await {
            Ok(rows) => rows,
            Err(err) => {
                error!(sql = %prepare(sql, params), error = %err, "Statement failed");
                return Err(err);
            }
        };
        debug!(
            rows = rows.len(),
            elapsed_ms = started.elapsed().as_millis(),
            "Statement completed"
        );

        let mut event = ExecutedEvent {
            sql,
            params,
            statement,
            rows: &mut rows,
        };
        for observer in &self.observers {
            observer.executed(&mut event);
        }
        Ok(rows)
    }
}

#[async_trait]
impl<C: Connection> Connection for ObservedConnection<C> {
    async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>, EngineError> {
        self.run(sql, params, None).await
    }

    async fn begin(&self) -> Result<(), EngineError> {
        debug!("Beginning transaction");
        self.inner.begin().await
    }

    async fn commit(&self) -> Result<(), EngineError> {
        debug!("Committing transaction");
        self.inner.commit().await
    }

    async fn rollback(&self) -> Result<(), EngineError> {
        debug!("Rolling back transaction");
        self.inner.rollback().await
    }
}

/// Parses the text of JSON-valued projections into JSON values.
///
/// Oracle returns `json_object`, `JSON_ARRAYAGG` and JSON literals as text.
/// Fields of the originating select built with `jsonObject`, `jsonArray` or
/// `jsonGroupArray` are decoded in place; text that is not valid JSON is
/// left untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonResultParser;

impl JsonResultParser {
    fn json_columns(statement: &Statement) -> Vec<&str> {
        statement
            .fields()
            .iter()
            .filter(|field| {
                matches!(
                    &field.expr,
                    Expr::Function(f) if matches!(
                        **f,
                        Function::JsonObject(_) | Function::JsonArray(_) | Function::JsonGroupArray(_)
                    )
                )
            })
            .filter_map(Field::output_name)
            .collect()
    }
}

impl QueryObserver for JsonResultParser {
    fn executed(&self, event: &mut ExecutedEvent<'_>) {
        let Some(statement) = event.statement else {
            return;
        };
        let columns = Self::json_columns(statement);
        if columns.is_empty() {
            return;
        }
        for row in event.rows.iter_mut() {
            for (key, value) in row.iter_mut() {
                if !columns.iter().any(|c| c.eq_ignore_ascii_case(key)) {
                    continue;
                }
                if let Value::String(text) = value {
                    if let Ok(parsed) = serde_json::from_str::<Value>(text) {
                        *value = parsed;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxide_oracle_core::query::QueryExpression;
    use serde_json::json;

    fn rows(value: Value) -> Vec<Row> {
        match value {
            Value::Array(items) => items
                .into_iter()
                .filter_map(|v| match v {
                    Value::Object(map) => Some(map),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    #[test]
    fn test_json_parser_decodes_json_fields_only() {
        let statement = Statement::Select(QueryExpression::from_entity("Orders").select([
            Field::column("Orders.note"),
            Field::aliased(
                "customer",
                Expr::function(Function::JsonObject(vec![Field::column("Customers.id")])),
            ),
        ]));
        let mut data = rows(json!([
            { "note": "{\"raw\":true}", "customer": "{\"id\":7}" },
            { "note": "x", "customer": "not json" }
        ]));
        let mut event = ExecutedEvent {
            sql: "",
            params: &[],
            statement: Some(&statement),
            rows: &mut data,
        };
        JsonResultParser.executed(&mut event);

        assert_eq!(data[0]["customer"], json!({ "id": 7 }));
        assert_eq!(data[0]["note"], json!("{\"raw\":true}"));
        assert_eq!(data[1]["customer"], json!("not json"));
    }

    struct Echo;

    #[async_trait]
    impl Connection for Echo {
        async fn execute(
            &self,
            sql: &str,
            _params: &[SqlValue],
        ) -> Result<Vec<Row>, EngineError> {
            if sql.starts_with("FAIL") {
                return Err(EngineError::new("ORA-00900: invalid SQL statement"));
            }
            Ok(rows(serde_json::json!([{ "doc": "[1,2]" }])))
        }
    }

    #[derive(Default)]
    struct Recorder {
        seen: std::sync::Mutex<Vec<String>>,
    }

    impl QueryObserver for Recorder {
        fn executing(&self, event: &ExecutingEvent<'_>) {
            self.seen.lock().unwrap().push(format!("before {}", event.sql));
        }

        fn executed(&self, event: &mut ExecutedEvent<'_>) {
            self.seen
                .lock()
                .unwrap()
                .push(format!("after {} ({} rows)", event.sql, event.rows.len()));
        }
    }

    #[test]
    fn test_observers_run_in_order() {
        let recorder = Arc::new(Recorder::default());
        let mut conn = ObservedConnection::new(Echo);
        conn.add_observer(recorder.clone());
        conn.add_observer(Arc::new(JsonResultParser));

        let statement = Statement::Select(QueryExpression::fixed().select([Field::aliased(
            "doc",
            Expr::function(Function::JsonArray(Expr::value(1))),
        )]));
        let rows = tokio_test::block_on(conn.run("SELECT 1", &[], Some(&statement))).unwrap();
        assert_eq!(rows[0]["doc"], json!([1, 2]));

        let failed = tokio_test::block_on(conn.execute("FAIL", &[]));
        assert!(failed.is_err());
        assert_eq!(
            *recorder.seen.lock().unwrap(),
            vec!["before SELECT 1", "after SELECT 1 (1 rows)", "before FAIL"]
        );
    }

    #[test]
    fn test_json_parser_ignores_raw_sql() {
        let mut data = rows(json!([{ "customer": "{\"id\":7}" }]));
        let mut event = ExecutedEvent {
            sql: "SELECT 1 FROM DUAL",
            params: &[],
            statement: None,
            rows: &mut data,
        };
        JsonResultParser.executed(&mut event);
        assert_eq!(data[0]["customer"], json!("{\"id\":7}"));
    }
}
