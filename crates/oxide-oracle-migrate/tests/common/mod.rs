#![allow(dead_code)]

//! An in-memory stand-in for an Oracle server.
//!
//! `FakeOracle` understands exactly the statements the engine issues:
//! catalog queries, DDL for tables, sequences, indexes and views, and the
//! ledger queries. Every statement is recorded in order.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use oxide_oracle_core::SqlValue;
use oxide_oracle_migrate::{AdapterOptions, Connection, EngineError, OracleAdapter, Row};
use serde_json::{json, Value};

#[derive(Debug, Clone, PartialEq)]
pub struct FakeColumn {
    pub name: String,
    pub data_type: String,
    pub size: Option<i64>,
    pub precision: Option<i64>,
    pub scale: Option<i64>,
    pub nullable: bool,
    pub primary: bool,
}

#[derive(Debug, Clone)]
pub struct FakeIndex {
    pub table: String,
    pub name: String,
    pub columns: Vec<String>,
    pub primary: bool,
}

#[derive(Debug, Default)]
pub struct FakeState {
    pub tables: BTreeMap<String, Vec<FakeColumn>>,
    pub views: BTreeSet<String>,
    pub sequences: BTreeMap<String, i64>,
    pub indexes: Vec<FakeIndex>,
    pub ledger: Vec<Row>,
    pub max_values: BTreeMap<(String, String), i64>,
    pub statements: Vec<String>,
    pub params: Vec<Vec<SqlValue>>,
    pub transactions: Vec<&'static str>,
    pub select_rows: Vec<Row>,
    pub fail_on: Option<(String, String)>,
}

#[derive(Debug, Default)]
pub struct FakeOracle {
    state: Mutex<FakeState>,
}

impl FakeOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    /// Statements executed so far.
    pub fn statements(&self) -> Vec<String> {
        self.state().statements.clone()
    }

    /// Statements starting with a prefix.
    pub fn statements_starting_with(&self, prefix: &str) -> Vec<String> {
        self.statements()
            .into_iter()
            .filter(|s| s.starts_with(prefix))
            .collect()
    }

    pub fn clear_statements(&self) {
        self.state().statements.clear();
    }

    /// Makes statements containing `pattern` fail with `message`.
    pub fn fail_on(&self, pattern: &str, message: &str) {
        self.state().fail_on = Some((pattern.to_string(), message.to_string()));
    }

    /// Runs a DDL statement directly, as if issued by another client.
    pub fn seed(&self, sql: &str) {
        let mut state = self.state();
        handle(&mut state, sql, &[]).unwrap();
    }

    pub fn column(&self, table: &str, column: &str) -> Option<FakeColumn> {
        self.state()
            .tables
            .get(table)?
            .iter()
            .find(|c| c.name == column)
            .cloned()
    }
}

#[async_trait]
impl Connection for FakeOracle {
    async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>, EngineError> {
        let mut state = self.state();
        state.statements.push(sql.to_string());
        state.params.push(params.to_vec());
        if let Some((pattern, message)) = &state.fail_on {
            if sql.contains(pattern.as_str()) {
                return Err(EngineError::new(message.clone()));
            }
        }
        handle(&mut state, sql, params)
    }

    async fn begin(&self) -> Result<(), EngineError> {
        self.state().transactions.push("begin");
        Ok(())
    }

    async fn commit(&self) -> Result<(), EngineError> {
        self.state().transactions.push("commit");
        Ok(())
    }

    async fn rollback(&self) -> Result<(), EngineError> {
        self.state().transactions.push("rollback");
        Ok(())
    }
}

pub fn options() -> AdapterOptions {
    AdapterOptions {
        user: Some("app".to_string()),
        json_date_format: Some(r#"YYYY-MM-DD"T"HH24:MI:SS.FF3"Z""#.to_string()),
        ..AdapterOptions::default()
    }
}

pub fn adapter(fake: &FakeOracle) -> OracleAdapter<&FakeOracle> {
    OracleAdapter::new(fake, options())
}

pub fn row(value: Value) -> Row {
    match value {
        Value::Object(map) => map,
        other => panic!("expected an object, got {other}"),
    }
}

// ===================================================================
// Statement handling
// ===================================================================

fn text(params: &[SqlValue], i: usize) -> String {
    match params.get(i) {
        Some(SqlValue::Text(s)) => s.clone(),
        other => panic!("expected text parameter {i}, got {other:?}"),
    }
}

fn count(n: usize) -> Vec<Row> {
    vec![row(json!({ "count": n }))]
}

fn err(message: &str) -> Result<Vec<Row>, EngineError> {
    Err(EngineError::new(message))
}

/// All double-quoted identifiers in a fragment.
fn quoted(fragment: &str) -> Vec<String> {
    fragment
        .split('"')
        .enumerate()
        .filter(|(i, _)| i % 2 == 1)
        .map(|(_, s)| s.to_string())
        .collect()
}

/// The last quoted identifier in a fragment (the object name of `"owner"."name"`).
fn object_name(fragment: &str) -> String {
    quoted(fragment).pop().unwrap_or_default()
}

/// Splits on commas outside parentheses.
fn split_top_level(body: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut depth = 0;
    let mut current = String::new();
    for c in body.chars() {
        match c {
            '(' => depth += 1,
            ')' => depth -= 1,
            ',' if depth == 0 => {
                parts.push(current.trim().to_string());
                current.clear();
                continue;
            }
            _ => {}
        }
        current.push(c);
    }
    if !current.trim().is_empty() {
        parts.push(current.trim().to_string());
    }
    parts
}

/// Parses `"name" TYPE [NULL|NOT NULL]`. Nullability is `None` when omitted.
fn parse_column(def: &str) -> (FakeColumn, Option<bool>) {
    let name = quoted(def).into_iter().next().unwrap();
    let rest = def.trim().trim_start_matches(&format!("\"{name}\"")).trim();
    let (type_sql, nullable) = if let Some(t) = rest.strip_suffix(" NOT NULL") {
        (t, Some(false))
    } else if let Some(t) = rest.strip_suffix(" NULL") {
        (t, Some(true))
    } else {
        (rest, None)
    };

    let mut column = FakeColumn {
        name,
        data_type: type_sql.to_string(),
        size: None,
        precision: None,
        scale: None,
        nullable: nullable.unwrap_or(true),
        primary: false,
    };
    if type_sql.starts_with("TIMESTAMP(") {
        column.size = Some(11);
    } else if let Some((base, args)) = type_sql.split_once('(') {
        let args: Vec<i64> = args
            .trim_end_matches(')')
            .split(',')
            .map(|a| a.trim().parse().unwrap())
            .collect();
        column.data_type = if base == "VARCHAR" { "VARCHAR2".into() } else { base.into() };
        match args.as_slice() {
            [size] => column.size = Some(*size),
            [precision, scale] => {
                column.size = Some(22);
                column.precision = Some(*precision);
                column.scale = Some(*scale);
            }
            _ => panic!("unexpected type {type_sql}"),
        }
    } else if type_sql == "NCLOB" {
        column.size = Some(4000);
    } else if type_sql == "LONG RAW" {
        column.size = Some(0);
    }
    (column, nullable)
}

fn body(sql: &str) -> &str {
    let start = sql.find('(').unwrap();
    let end = sql.rfind(')').unwrap();
    &sql[start + 1..end]
}

fn create_table(state: &mut FakeState, sql: &str) -> Result<Vec<Row>, EngineError> {
    let head = &sql[..sql.find('(').unwrap()];
    let table = object_name(head);
    if state.tables.contains_key(&table) {
        return err("ORA-00955: name is already used by an existing object");
    }
    let mut columns = Vec::new();
    let mut primary = Vec::new();
    for part in split_top_level(body(sql)) {
        if part.starts_with("CONSTRAINT") {
            let (_, keys) = part.split_once("PRIMARY KEY").unwrap();
            primary = quoted(keys);
        } else {
            columns.push(parse_column(&part).0);
        }
    }
    for column in &mut columns {
        column.primary = primary.contains(&column.name);
    }
    if !primary.is_empty() {
        state.indexes.push(FakeIndex {
            table: table.clone(),
            name: format!("SYS_C{:05}", state.indexes.len() + 1),
            columns: primary,
            primary: true,
        });
    }
    state.tables.insert(table, columns);
    Ok(vec![])
}

fn alter_table(state: &mut FakeState, sql: &str) -> Result<Vec<Row>, EngineError> {
    let (head, _) = sql.split_once(" (").unwrap();
    let modify = head.ends_with(" MODIFY");
    let table = object_name(head);
    let Some(columns) = state.tables.get_mut(&table) else {
        return err("ORA-00942: table or view does not exist");
    };
    for part in split_top_level(body(sql)) {
        let (column, nullable) = parse_column(&part);
        match columns.iter_mut().find(|c| c.name == column.name) {
            Some(existing) if modify => {
                if nullable.is_some() && nullable == Some(existing.nullable) {
                    return err("ORA-01442: column to be modified to NOT NULL is already NOT NULL");
                }
                let keep = existing.nullable;
                *existing = FakeColumn {
                    nullable: nullable.unwrap_or(keep),
                    primary: existing.primary,
                    ..column
                };
            }
            Some(_) => return err("ORA-01430: column being added already exists in table"),
            None if modify => return err("ORA-00904: invalid identifier"),
            None => columns.push(column),
        }
    }
    Ok(vec![])
}

fn columns_rows(state: &FakeState, table: &str) -> Vec<Row> {
    state
        .tables
        .get(table)
        .map(|columns| {
            columns
                .iter()
                .enumerate()
                .map(|(i, c)| {
                    row(json!({
                        "name": c.name,
                        "type": c.data_type,
                        "ordinal": i + 1,
                        "size": c.size,
                        "scale": c.scale,
                        "precision": c.precision,
                        "nullable": i64::from(c.nullable),
                        "primary": i64::from(c.primary),
                    }))
                })
                .collect()
        })
        .unwrap_or_default()
}

fn handle(state: &mut FakeState, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>, EngineError> {
    if sql.contains("FROM ALL_OBJECTS WHERE OBJECT_TYPE IN ('TABLE')") {
        return Ok(count(usize::from(state.tables.contains_key(&text(params, 0)))));
    }
    if sql.contains("FROM ALL_OBJECTS WHERE OBJECT_TYPE IN ('VIEW')") {
        return Ok(count(usize::from(state.views.contains(&text(params, 0)))));
    }
    if sql.contains("FROM ALL_SEQUENCES") {
        return Ok(count(usize::from(state.sequences.contains_key(&text(params, 0)))));
    }
    if sql.contains("FROM ALL_TAB_COLUMNS") {
        return Ok(columns_rows(state, &text(params, 1)));
    }
    if sql.contains(r#"FROM USER_INDEXES "indexes" LEFT JOIN"#) {
        let table = text(params, 0);
        return Ok(state
            .indexes
            .iter()
            .filter(|ix| ix.table == table)
            .map(|ix| {
                row(json!({
                    "name": ix.name,
                    "type": "NORMAL",
                    "constraint": if ix.primary { Value::from("P") } else { Value::Null },
                }))
            })
            .collect());
    }
    if sql.contains("FROM USER_IND_COLUMNS") {
        let table = text(params, 0);
        return Ok(state
            .indexes
            .iter()
            .filter(|ix| ix.table == table)
            .flat_map(|ix| {
                ix.columns
                    .iter()
                    .map(|c| row(json!({ "name": c, "index": ix.name })))
                    .collect::<Vec<_>>()
            })
            .collect());
    }
    if sql.contains("FROM USER_TABLES") || sql.contains("FROM ALL_TABLES") {
        return Ok(state
            .tables
            .keys()
            .map(|t| row(json!({ "owner": "APP", "name": t })))
            .collect());
    }
    if sql.contains("FROM USER_VIEWS") || sql.contains("FROM ALL_VIEWS") {
        return Ok(state
            .views
            .iter()
            .map(|v| row(json!({ "owner": "APP", "name": v })))
            .collect());
    }
    if sql.starts_with(r#"SELECT "version" FROM "migrations""#) {
        if !state.tables.contains_key("migrations") {
            return err("ORA-00942: table or view does not exist");
        }
        let applies_to = text(params, 0);
        return Ok(state
            .ledger
            .iter()
            .filter(|r| r["appliesTo"] == json!(applies_to))
            .map(|r| row(json!({ "version": r["version"] })))
            .collect());
    }
    if sql.starts_with(r#"SELECT "id", "appliesTo""#) {
        return Ok(state.ledger.clone());
    }
    if sql.starts_with(r#"INSERT INTO "migrations""#) {
        if !state.tables.contains_key("migrations") {
            return err("ORA-00942: table or view does not exist");
        }
        let values: Vec<Value> = params.iter().map(SqlValue::to_json).collect();
        state.ledger.push(row(json!({
            "id": values[0],
            "appliesTo": values[1],
            "model": values[2],
            "version": values[3],
            "description": values[4],
        })));
        return Ok(vec![]);
    }
    if sql.starts_with("CREATE TABLE") {
        return create_table(state, sql);
    }
    if sql.starts_with("ALTER TABLE") {
        return alter_table(state, sql);
    }
    if sql.starts_with("DROP TABLE") {
        let table = object_name(sql);
        if state.tables.remove(&table).is_none() {
            return err("ORA-00942: table or view does not exist");
        }
        state.indexes.retain(|ix| ix.table != table);
        return Ok(vec![]);
    }
    if sql.starts_with("CREATE SEQUENCE") {
        let name = object_name(sql);
        if state.sequences.contains_key(&name) {
            return err("ORA-00955: name is already used by an existing object");
        }
        state.sequences.insert(name, 1);
        return Ok(vec![]);
    }
    if sql.starts_with("ALTER SEQUENCE") {
        let name = object_name(sql);
        let start: i64 = sql
            .split("START WITH ")
            .nth(1)
            .and_then(|s| s.split_whitespace().next())
            .and_then(|s| s.parse().ok())
            .unwrap();
        match state.sequences.get_mut(&name) {
            Some(next) => *next = start,
            None => return err("ORA-02289: sequence does not exist"),
        }
        return Ok(vec![]);
    }
    if sql.contains(".nextval") {
        let name = object_name(sql.split(".nextval").next().unwrap());
        let Some(next) = state.sequences.get_mut(&name) else {
            return err("ORA-02289: sequence does not exist");
        };
        let value = *next;
        *next += 1;
        return Ok(vec![row(json!({ "resultId": value }))]);
    }
    if sql.starts_with("SELECT MAX(") {
        let names = quoted(sql);
        let column = names[0].clone();
        let table = names.last().unwrap().clone();
        let max = state.max_values.get(&(table, column)).copied();
        return Ok(vec![row(json!({ "maxValue": max }))]);
    }
    if sql.starts_with("CREATE INDEX") {
        let (head, cols) = sql.split_once(" ON ").unwrap();
        let name = object_name(head);
        if state.indexes.iter().any(|ix| ix.name == name) {
            return err("ORA-00955: name is already used by an existing object");
        }
        let (table, columns) = cols.split_once('(').unwrap();
        state.indexes.push(FakeIndex {
            table: object_name(table),
            name,
            columns: quoted(columns),
            primary: false,
        });
        return Ok(vec![]);
    }
    if sql.starts_with("DROP INDEX") {
        let name = object_name(sql);
        let before = state.indexes.len();
        state.indexes.retain(|ix| ix.name != name);
        if state.indexes.len() == before {
            return err("ORA-01418: specified index does not exist");
        }
        return Ok(vec![]);
    }
    if sql.starts_with("CREATE VIEW") {
        let (head, _) = sql.split_once(" AS ").unwrap();
        let name = object_name(head);
        if !state.views.insert(name) {
            return err("ORA-00955: name is already used by an existing object");
        }
        return Ok(vec![]);
    }
    if sql.starts_with("DROP VIEW") {
        if !state.views.remove(&object_name(sql)) {
            return err("ORA-00942: table or view does not exist");
        }
        return Ok(vec![]);
    }
    if sql.starts_with("ALTER session") {
        return Ok(vec![]);
    }
    if sql.starts_with("SELECT") {
        return Ok(state.select_rows.clone());
    }
    err(&format!("ORA-00900: invalid SQL statement: {sql}"))
}
