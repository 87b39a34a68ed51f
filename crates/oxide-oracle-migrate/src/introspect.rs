//! Catalog queries.
//!
//! Every call goes back to the catalog views; nothing is cached between
//! calls. Existence checks treat "object not found" engine errors as a
//! negative answer.

use std::collections::BTreeMap;

use oxide_oracle_core::SqlValue;
use tracing::trace;

use crate::config::AdapterOptions;
use crate::connection::{Connection, Row, RowExt};
use crate::error::{MigrateError, Result};
use crate::schema::{
    ColumnDescriptor, IndexDescriptor, QualifiedName, TableDescriptor, ViewDescriptor,
};

const OWNER_FILTER: &str = " AND REGEXP_LIKE(OWNER,?,'i')";

const TABLE_EXISTS_SQL: &str =
    r#"SELECT COUNT(*) AS "count" FROM ALL_OBJECTS WHERE OBJECT_TYPE IN ('TABLE') AND OBJECT_NAME = ?"#;

const VIEW_EXISTS_SQL: &str =
    r#"SELECT COUNT(*) AS "count" FROM ALL_OBJECTS WHERE OBJECT_TYPE IN ('VIEW') AND OBJECT_NAME = ?"#;

const SEQUENCE_EXISTS_SQL: &str =
    r#"SELECT COUNT(*) AS "count" FROM ALL_SEQUENCES WHERE SEQUENCE_NAME = ?"#;

const SEQUENCE_OWNER_FILTER: &str = " AND REGEXP_LIKE(SEQUENCE_OWNER,?,'i')";

const COLUMNS_SQL: &str = r#"SELECT c0.COLUMN_NAME AS "name", c0.DATA_TYPE AS "type", c0.COLUMN_ID AS "ordinal", CASE WHEN c0.CHAR_LENGTH > 0 THEN c0.CHAR_LENGTH ELSE c0.DATA_LENGTH END AS "size", c0.DATA_SCALE AS "scale", c0.DATA_PRECISION AS "precision", CASE WHEN c0.NULLABLE = 'Y' THEN 1 ELSE 0 END AS "nullable", CASE WHEN t0.CONSTRAINT_TYPE = 'P' THEN 1 ELSE 0 END AS "primary" FROM ALL_TAB_COLUMNS c0 LEFT JOIN (SELECT cols.TABLE_NAME, cols.COLUMN_NAME, cols.OWNER, cons.CONSTRAINT_TYPE FROM ALL_CONSTRAINTS cons INNER JOIN ALL_CONS_COLUMNS cols ON cons.CONSTRAINT_TYPE = 'P' AND cons.CONSTRAINT_NAME = cols.CONSTRAINT_NAME AND cons.OWNER = cols.OWNER WHERE cols.TABLE_NAME = ?) t0 ON c0.COLUMN_NAME = t0.COLUMN_NAME AND c0.OWNER = t0.OWNER WHERE c0.TABLE_NAME = ?"#;

const INDEXES_SQL: &str = r#"SELECT "indexes"."INDEX_NAME" AS "name", "indexes"."INDEX_TYPE" AS "type", "constraints"."CONSTRAINT_TYPE" AS "constraint" FROM USER_INDEXES "indexes" LEFT JOIN USER_CONSTRAINTS "constraints" ON "indexes"."INDEX_NAME" = "constraints"."INDEX_NAME" AND "indexes"."TABLE_NAME" = "constraints"."TABLE_NAME" AND "indexes"."TABLE_OWNER" = "constraints"."OWNER" WHERE "indexes"."TABLE_NAME" = ? AND "indexes"."TABLE_OWNER" = ?"#;

const INDEX_COLUMNS_SQL: &str = r#"SELECT "columns"."COLUMN_NAME" AS "name", "columns"."INDEX_NAME" AS "index" FROM USER_IND_COLUMNS "columns" INNER JOIN USER_INDEXES "indexes" ON "indexes"."INDEX_NAME" = "columns"."INDEX_NAME" AND "indexes"."TABLE_NAME" = "columns"."TABLE_NAME" WHERE "indexes"."TABLE_NAME" = ? AND "indexes"."TABLE_OWNER" = ? ORDER BY "columns"."COLUMN_POSITION""#;

/// Reads schema state through a connection.
pub struct Introspector<'a, C: ?Sized> {
    conn: &'a C,
    options: &'a AdapterOptions,
}

impl<'a, C: Connection + ?Sized> Introspector<'a, C> {
    /// Creates an introspector using the options' default schema.
    pub const fn new(conn: &'a C, options: &'a AdapterOptions) -> Self {
        Self { conn, options }
    }

    /// Resolves `owner.name` or a bare name against the configured schema.
    #[must_use]
    pub fn resolve(&self, name: &str) -> QualifiedName {
        QualifiedName::resolve(name, self.options.schema.as_deref())
    }

    /// Whether a table exists.
    pub async fn table_exists(&self, table: &QualifiedName) -> Result<bool> {
        self.exists(TABLE_EXISTS_SQL, OWNER_FILTER, table).await
    }

    /// Whether a view exists.
    pub async fn view_exists(&self, view: &QualifiedName) -> Result<bool> {
        self.exists(VIEW_EXISTS_SQL, OWNER_FILTER, view).await
    }

    /// Whether a sequence exists.
    pub async fn has_sequence(&self, sequence: &QualifiedName) -> Result<bool> {
        self.exists(SEQUENCE_EXISTS_SQL, SEQUENCE_OWNER_FILTER, sequence)
            .await
    }

    /// The columns of a table in ordinal order. Empty when the table is missing.
    pub async fn columns(&self, table: &QualifiedName) -> Result<Vec<ColumnDescriptor>> {
        let mut sql = COLUMNS_SQL.to_string();
        let mut params = vec![
            SqlValue::Text(table.name.clone()),
            SqlValue::Text(table.name.clone()),
        ];
        if let Some(owner) = &table.owner {
            sql.push_str(" AND REGEXP_LIKE(c0.OWNER,?,'i')");
            params.push(owner_pattern(owner));
        }
        sql.push_str(" ORDER BY c0.COLUMN_ID");

        let rows = match self.conn.execute(&sql, &params).await {
            Ok(rows) => rows,
            Err(err) if err.is_object_not_found() => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };
        rows.iter().map(column_from_row).collect()
    }

    /// The secondary indexes of a table, excluding primary key indexes.
    ///
    /// The owner defaults to the upper-cased connecting user.
    pub async fn list_indexes(&self, table: &QualifiedName) -> Result<Vec<IndexDescriptor>> {
        let owner = table
            .owner
            .clone()
            .or_else(|| self.options.user.as_ref().map(|u| u.to_uppercase()))
            .unwrap_or_default();
        let params = [
            SqlValue::Text(table.name.clone()),
            SqlValue::Text(owner),
        ];

        let rows = match self.conn.execute(INDEXES_SQL, &params).await {
            Ok(rows) => rows,
            Err(err) if err.is_object_not_found() => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };
        let names: Vec<String> = rows
            .iter()
            .filter(|row| row.text("constraint").as_deref() != Some("P"))
            .filter_map(|row| row.text("name"))
            .collect();
        if names.is_empty() {
            return Ok(Vec::new());
        }

        let mut columns: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for row in self.conn.execute(INDEX_COLUMNS_SQL, &params).await? {
            if let (Some(index), Some(column)) = (row.text("index"), row.text("name")) {
                columns.entry(index).or_default().push(column);
            }
        }
        trace!(table = %table, indexes = names.len(), "Listed indexes");

        Ok(names
            .into_iter()
            .map(|name| IndexDescriptor {
                columns: columns.remove(&name).unwrap_or_default(),
                name,
            })
            .collect())
    }

    /// Tables owned by the configured schema, or by the connecting user.
    pub async fn list_tables(&self) -> Result<Vec<TableDescriptor>> {
        let rows = self
            .list(
                r#"SELECT OWNER AS "owner", TABLE_NAME AS "name" FROM ALL_TABLES WHERE REGEXP_LIKE(OWNER,?,'i')"#,
                r#"SELECT USER AS "owner", TABLE_NAME AS "name" FROM USER_TABLES"#,
            )
            .await?;
        Ok(rows
            .into_iter()
            .map(|(owner, name)| TableDescriptor { owner, name })
            .collect())
    }

    /// Views owned by the configured schema, or by the connecting user.
    pub async fn list_views(&self) -> Result<Vec<ViewDescriptor>> {
        let rows = self
            .list(
                r#"SELECT OWNER AS "owner", VIEW_NAME AS "name" FROM ALL_VIEWS WHERE REGEXP_LIKE(OWNER,?,'i')"#,
                r#"SELECT USER AS "owner", VIEW_NAME AS "name" FROM USER_VIEWS"#,
            )
            .await?;
        Ok(rows
            .into_iter()
            .map(|(owner, name)| ViewDescriptor { owner, name })
            .collect())
    }

    async fn exists(&self, sql: &str, owner_filter: &str, name: &QualifiedName) -> Result<bool> {
        let mut sql = sql.to_string();
        let mut params = vec![SqlValue::Text(name.name.clone())];
        if let Some(owner) = &name.owner {
            sql.push_str(owner_filter);
            params.push(owner_pattern(owner));
        }
        match self.conn.execute(&sql, &params).await {
            Ok(rows) => Ok(count(&rows)? > 0),
            Err(err) if err.is_object_not_found() => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    async fn list(&self, by_owner: &str, by_user: &str) -> Result<Vec<(String, String)>> {
        let rows = match &self.options.schema {
            Some(owner) => self.conn.execute(by_owner, &[owner_pattern(owner)]).await?,
            None => self.conn.execute(by_user, &[]).await?,
        };
        Ok(rows
            .iter()
            .filter_map(|row| Some((row.text("owner")?, row.text("name")?)))
            .collect())
    }
}

fn owner_pattern(owner: &str) -> SqlValue {
    SqlValue::Text(format!("^{owner}$"))
}

fn count(rows: &[Row]) -> Result<i64> {
    rows.first()
        .and_then(|row| row.int("count"))
        .ok_or_else(|| MigrateError::InvalidState("expected a count row".to_string()))
}

fn column_from_row(row: &Row) -> Result<ColumnDescriptor> {
    let name = row
        .text("name")
        .ok_or_else(|| MigrateError::InvalidState("column row without name".to_string()))?;
    Ok(ColumnDescriptor {
        native_type: row.text("type").unwrap_or_default(),
        ordinal: row.int("ordinal").unwrap_or_default(),
        size: row.int("size"),
        scale: row.int("scale"),
        precision: row.int("precision"),
        nullable: row.flag("nullable").unwrap_or(true),
        primary: row.flag("primary").unwrap_or(false),
        name,
    })
}
