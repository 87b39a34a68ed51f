//! Compiles query trees into Oracle SQL.
//!
//! Oracle (before 12c) has no `LIMIT`/`OFFSET`, so paged selects are
//! rewritten into a windowed subquery: the inner query numbers its rows with
//! `ROW_NUMBER()` and the outer query keeps the requested range.

mod functions;
mod settings;

pub use settings::{
    host_json_date_format, json_date_format_for, FormatterSettings, OFFSET_JSON_DATE_FORMAT,
    UTC_JSON_DATE_FORMAT,
};

use crate::error::{CompileError, Result};
use crate::query::{
    ColumnRef, ComparisonOp, Entity, Expr, Field, Function, Join, OrderBy, Predicate,
    QueryExpression, Statement,
};
use crate::value::{self, SqlValue};

/// Name of the synthetic row-number column of paged selects.
pub const ROW_INDEX_COLUMN: &str = "__RowIndex";

const PAGED_SUBQUERY_ALIAS: &str = "t0";

/// Oracle SQL formatter.
#[derive(Debug, Clone, Default)]
pub struct OracleFormatter {
    settings: FormatterSettings,
}

impl OracleFormatter {
    /// Creates a formatter with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a formatter with the given settings.
    #[must_use]
    pub const fn with_settings(settings: FormatterSettings) -> Self {
        Self { settings }
    }

    /// Returns the settings.
    #[must_use]
    pub const fn settings(&self) -> &FormatterSettings {
        &self.settings
    }

    /// Compiles any statement.
    pub fn format(&self, statement: &Statement) -> Result<String> {
        match statement {
            Statement::Select(query) => self.format_select(query),
            Statement::Insert { entity, values } => {
                if values.is_empty() {
                    return Err(CompileError::InvalidExpression(format!(
                        "insert into {entity} has no values"
                    )));
                }
                let columns = values
                    .iter()
                    .map(|(name, _)| quote_ident(name))
                    .collect::<Vec<_>>()
                    .join(", ");
                let exprs = values
                    .iter()
                    .map(|(_, expr)| self.format_expr(expr))
                    .collect::<Result<Vec<_>>>()?
                    .join(", ");
                Ok(format!(
                    "INSERT INTO {}({columns}) VALUES ({exprs})",
                    value::escape_name(entity)
                ))
            }
            Statement::Update {
                entity,
                values,
                filter,
            } => {
                if values.is_empty() {
                    return Err(CompileError::InvalidExpression(format!(
                        "update of {entity} has no values"
                    )));
                }
                let assignments = values
                    .iter()
                    .map(|(name, expr)| Ok(format!("{}={}", quote_ident(name), self.format_expr(expr)?)))
                    .collect::<Result<Vec<_>>>()?
                    .join(", ");
                let mut sql = format!("UPDATE {} SET {assignments}", value::escape_name(entity));
                self.push_where(&mut sql, filter.as_ref())?;
                Ok(sql)
            }
            Statement::Delete { entity, filter } => {
                let mut sql = format!("DELETE FROM {}", value::escape_name(entity));
                self.push_where(&mut sql, filter.as_ref())?;
                Ok(sql)
            }
        }
    }

    /// Compiles a select, applying paging when `take` is positive.
    ///
    /// A paged select without a projection renders its outer query as
    /// `SELECT *`, so the rows also carry the `"__RowIndex"` column.
    /// Project fields explicitly to leave it out.
    pub fn format_select(&self, query: &QueryExpression) -> Result<String> {
        if query.fixed {
            return self.format_fixed_select(query);
        }
        if query.is_paged() {
            return self.format_limit_select(query);
        }
        self.format_plain_select(query)
    }

    /// `SELECT <fields> FROM DUAL`.
    fn format_fixed_select(&self, query: &QueryExpression) -> Result<String> {
        if query.fields.is_empty() {
            return Err(CompileError::InvalidExpression(
                "a fixed select needs at least one field".to_string(),
            ));
        }
        Ok(format!("SELECT {} FROM DUAL", self.format_fields(&query.fields)?))
    }

    fn format_plain_select(&self, query: &QueryExpression) -> Result<String> {
        let entity = query.entity.as_ref().ok_or(CompileError::MissingEntity)?;
        let mut sql = String::from("SELECT ");
        if query.distinct {
            sql.push_str("DISTINCT ");
        }
        if query.fields.is_empty() {
            sql.push_str(&value::escape_name(&format!("{}.*", source_name(entity))));
        } else {
            sql.push_str(&self.format_fields(&query.fields)?);
        }
        sql.push_str(" FROM ");
        sql.push_str(&format_entity(entity));
        for join in &query.joins {
            sql.push(' ');
            sql.push_str(&self.format_join(join)?);
        }
        self.push_where(&mut sql, query.filter.as_ref())?;
        if !query.group.is_empty() {
            let group = query
                .group
                .iter()
                .map(|expr| self.format_expr(expr))
                .collect::<Result<Vec<_>>>()?
                .join(", ");
            sql.push_str(" GROUP BY ");
            sql.push_str(&group);
        }
        if !query.order.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&self.format_order(&query.order)?);
        }
        Ok(sql)
    }

    /// Wraps a numbered copy of the query and keeps rows `skip+1..=skip+take`.
    ///
    /// The caller's tree is cloned, never modified.
    fn format_limit_select(&self, query: &QueryExpression) -> Result<String> {
        let skip = query.skip.unwrap_or(0);
        let take = query.take.unwrap_or(0);
        let (first, last) = skip
            .checked_add(1)
            .zip(skip.checked_add(take))
            .ok_or_else(|| {
                CompileError::InvalidArgument(format!("page {skip}+{take} is out of range"))
            })?;
        let entity = query.entity.as_ref().ok_or(CompileError::MissingEntity)?;

        let mut inner = query.clone();
        inner.order = Vec::new();
        inner.skip = None;
        inner.take = None;

        let outer_fields = if query.fields.is_empty() {
            inner
                .fields
                .push(Field::column(&format!("{}.*", source_name(entity))));
            "*".to_string()
        } else {
            query
                .fields
                .iter()
                .map(|field| match field.output_name() {
                    Some("*") => Ok("*".to_string()),
                    Some(name) => Ok(quote_ident(name)),
                    None => Err(CompileError::InvalidExpression(
                        "fields of a paged select need an alias".to_string(),
                    )),
                })
                .collect::<Result<Vec<_>>>()?
                .join(", ")
        };
        inner.fields.push(Field::aliased(
            ROW_INDEX_COLUMN,
            Expr::function(Function::RowIndex(query.order.clone())),
        ));

        Ok(format!(
            "SELECT {outer_fields} FROM ({}) {PAGED_SUBQUERY_ALIAS} WHERE \"{ROW_INDEX_COLUMN}\" BETWEEN {} AND {} ORDER BY \"{ROW_INDEX_COLUMN}\"",
            self.format_plain_select(&inner)?,
            first,
            last,
        ))
    }

    fn format_fields(&self, fields: &[Field]) -> Result<String> {
        Ok(fields
            .iter()
            .map(|field| self.format_field(field))
            .collect::<Result<Vec<_>>>()?
            .join(", "))
    }

    /// Renders a projected field with its alias.
    pub fn format_field(&self, field: &Field) -> Result<String> {
        let expr = self.format_expr(&field.expr)?;
        let alias = field.alias.as_deref().or(match &field.expr {
            Expr::Column(column)
                if self.settings.force_alias && column.table.is_some() && column.name != "*" =>
            {
                Some(column.name.as_str())
            }
            _ => None,
        });
        Ok(match alias {
            Some(alias) if self.settings.use_alias_keyword => {
                format!("{expr} AS {}", quote_ident(alias))
            }
            Some(alias) => format!("{expr} {}", quote_ident(alias)),
            None => expr,
        })
    }

    /// Renders an expression.
    pub fn format_expr(&self, expr: &Expr) -> Result<String> {
        match expr {
            Expr::Column(column) => Ok(format_column(column)),
            Expr::Value(value) => Ok(value::escape(value, false)),
            Expr::Function(function) => self.format_function(function),
            Expr::Select(query) => Ok(format!("({})", self.format_select(query)?)),
        }
    }

    /// Renders `ORDER BY` terms without the keyword.
    pub fn format_order(&self, order: &[OrderBy]) -> Result<String> {
        Ok(order
            .iter()
            .map(|o| Ok(format!("{} {}", self.format_expr(&o.expr)?, o.direction.as_str())))
            .collect::<Result<Vec<_>>>()?
            .join(", "))
    }

    fn format_join(&self, join: &Join) -> Result<String> {
        Ok(format!(
            "{} {} ON {}",
            join.kind.as_str(),
            format_entity(&join.entity),
            self.format_where(&join.on)?
        ))
    }

    fn push_where(&self, sql: &mut String, filter: Option<&Predicate>) -> Result<()> {
        if let Some(predicate) = filter {
            sql.push_str(" WHERE ");
            sql.push_str(&self.format_where(predicate)?);
        }
        Ok(())
    }

    /// Renders a predicate.
    pub fn format_where(&self, predicate: &Predicate) -> Result<String> {
        match predicate {
            Predicate::And(items) => self.format_logical(items, " AND "),
            Predicate::Or(items) => self.format_logical(items, " OR "),
            Predicate::Not(inner) => Ok(format!("NOT {}", parenthesize(self.format_where(inner)?))),
            Predicate::Nor(items) => Ok(format!(
                "NOT {}",
                parenthesize(self.format_logical(items, " OR ")?)
            )),
            Predicate::Compare { left, op, right } => {
                let left = self.format_expr(left)?;
                match (op, right) {
                    (ComparisonOp::Eq, Expr::Value(SqlValue::Null)) => {
                        Ok(format!("({left} IS NULL)"))
                    }
                    (ComparisonOp::Ne, Expr::Value(SqlValue::Null)) => {
                        Ok(format!("({left} IS NOT NULL)"))
                    }
                    _ => Ok(format!("({left}{}{})", op.as_str(), self.format_expr(right)?)),
                }
            }
            Predicate::In {
                expr,
                values,
                negated,
            } => {
                let left = self.format_expr(expr)?;
                let list = match values.as_slice() {
                    [] => {
                        return Ok(if *negated { "(1=1)" } else { "(1=0)" }.to_string());
                    }
                    [Expr::Select(query)] => format!("({})", self.format_select(query)?),
                    items => format!(
                        "({})",
                        items
                            .iter()
                            .map(|item| self.format_expr(item))
                            .collect::<Result<Vec<_>>>()?
                            .join(", ")
                    ),
                };
                if *negated {
                    Ok(format!("(NOT {left} IN {list})"))
                } else {
                    Ok(format!("({left} IN {list})"))
                }
            }
            Predicate::Between { expr, low, high } => Ok(format!(
                "({} BETWEEN {} AND {})",
                self.format_expr(expr)?,
                self.format_expr(low)?,
                self.format_expr(high)?
            )),
            Predicate::Expr(expr) => self.format_expr(expr),
        }
    }

    fn format_logical(&self, items: &[Predicate], separator: &str) -> Result<String> {
        match items {
            [] => Err(CompileError::InvalidExpression(
                "a logical expression needs at least one condition".to_string(),
            )),
            [single] => self.format_where(single),
            items => Ok(format!(
                "({})",
                items
                    .iter()
                    .map(|item| self.format_where(item))
                    .collect::<Result<Vec<_>>>()?
                    .join(separator)
            )),
        }
    }

    /// Escapes a value as an Oracle literal.
    #[must_use]
    pub fn escape(&self, value: &SqlValue, unquoted: bool) -> String {
        value::escape(value, unquoted)
    }

    /// Quotes a dotted name.
    #[must_use]
    pub fn escape_name(&self, name: &str) -> String {
        value::escape_name(name)
    }
}

/// Quotes a single identifier, doubling embedded quotes.
#[must_use]
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn format_column(column: &ColumnRef) -> String {
    let name = if column.name == "*" {
        "*".to_string()
    } else {
        quote_ident(&column.name)
    };
    match &column.table {
        Some(table) => format!("{}.{name}", quote_ident(table)),
        None => name,
    }
}

fn format_entity(entity: &Entity) -> String {
    match &entity.alias {
        Some(alias) => format!("{} {}", value::escape_name(&entity.name), quote_ident(alias)),
        None => value::escape_name(&entity.name),
    }
}

fn source_name(entity: &Entity) -> &str {
    entity.alias.as_deref().unwrap_or(&entity.name)
}

fn parenthesize(sql: String) -> String {
    if sql.starts_with('(') && sql.ends_with(')') {
        sql
    } else {
        format!("({sql})")
    }
}
