//! Reads query trees from their JSON form.
//!
//! The JSON form is the one query producers emit: statements are objects
//! keyed by `$select`, `$insert`, `$update` or `$delete`, expressions are
//! literals, `$`-prefixed field names (`"$price"`), `{"$name": "T.c"}`
//! references or single-key function nodes such as
//! `{"$startsWith": ["$name", "Mac"]}`.
//!
//! ```rust
//! use oxide_oracle_core::query::json::statement_from_json;
//! use oxide_oracle_core::OracleFormatter;
//!
//! let doc = serde_json::json!({
//!     "$select": { "Products": ["id", "name"] },
//!     "$where": { "$gt": ["$price", 500] }
//! });
//! let statement = statement_from_json(&doc).unwrap();
//! let sql = OracleFormatter::new().format(&statement).unwrap();
//! assert_eq!(sql, r#"SELECT "id", "name" FROM "Products" WHERE ("price">500)"#);
//! ```

use serde_json::{Map, Value};

use super::{
    Assignments, DateKind, Direction, Entity, Expr, Field, Function, Join, JoinKind, OrderBy,
    Predicate, QueryExpression, Statement,
};
use crate::error::{CompileError, Result};
use crate::value::SqlValue;

fn invalid(message: impl Into<String>) -> CompileError {
    CompileError::Json(message.into())
}

fn as_object<'a>(value: &'a Value, what: &str) -> Result<&'a Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| invalid(format!("{what} must be an object")))
}

/// The only key of a single-key object.
fn single_entry<'a>(map: &'a Map<String, Value>, what: &str) -> Result<(&'a String, &'a Value)> {
    let mut entries = map.iter();
    match (entries.next(), entries.next()) {
        (Some(entry), None) => Ok(entry),
        _ => Err(invalid(format!("{what} must have exactly one key"))),
    }
}

/// Function arguments: an array is the argument list, anything else is a
/// single argument.
fn arguments(value: &Value) -> Vec<&Value> {
    match value {
        Value::Array(items) => items.iter().collect(),
        Value::Null => Vec::new(),
        other => vec![other],
    }
}

/// Reads a statement.
pub fn statement_from_json(value: &Value) -> Result<Statement> {
    let map = as_object(value, "a statement")?;
    if let Some(target) = map.get("$insert") {
        let (entity, values) = mutation_target(target, "$insert")?;
        return Ok(Statement::Insert { entity, values });
    }
    if let Some(target) = map.get("$update") {
        let (entity, values) = mutation_target(target, "$update")?;
        return Ok(Statement::Update {
            entity,
            values,
            filter: map.get("$where").map(predicate_from_json).transpose()?,
        });
    }
    if let Some(target) = map.get("$delete") {
        let entity = target
            .as_str()
            .ok_or_else(|| invalid("$delete must name an entity"))?
            .to_string();
        return Ok(Statement::Delete {
            entity,
            filter: map.get("$where").map(predicate_from_json).transpose()?,
        });
    }
    query_from_json(value).map(Statement::Select)
}

fn mutation_target(value: &Value, what: &str) -> Result<(String, Assignments)> {
    let (entity, values) = single_entry(as_object(value, what)?, what)?;
    let values = as_object(values, what)?
        .iter()
        .map(|(column, value)| Ok((column.clone(), expr_from_json(value)?)))
        .collect::<Result<Assignments>>()?;
    Ok((entity.clone(), values))
}

/// Reads a select query.
pub fn query_from_json(value: &Value) -> Result<QueryExpression> {
    let map = as_object(value, "a query")?;
    let mut query = QueryExpression {
        fixed: map.get("$fixed").and_then(Value::as_bool).unwrap_or(false),
        distinct: map.get("$distinct").and_then(Value::as_bool).unwrap_or(false),
        ..QueryExpression::default()
    };

    if let Some(select) = map.get("$select") {
        let (entity, fields) = single_entry(as_object(select, "$select")?, "$select")?;
        if !query.fixed {
            let mut target = Entity::new(entity.as_str());
            if let Some(alias) = map.get("$alias").and_then(Value::as_str) {
                target = target.alias(alias);
            }
            query.entity = Some(target);
        }
        query.fields = fields_from_json(fields)?;
    } else if !query.fixed {
        return Err(CompileError::MissingEntity);
    }

    query.filter = map.get("$where").map(predicate_from_json).transpose()?;
    if let Some(expand) = map.get("$expand") {
        query.joins = arguments(expand)
            .into_iter()
            .map(join_from_json)
            .collect::<Result<_>>()?;
    }
    if let Some(order) = map.get("$order") {
        query.order = order_from_json(order)?;
    }
    if let Some(group) = map.get("$group") {
        query.group = arguments(group)
            .into_iter()
            .map(expr_from_json)
            .collect::<Result<_>>()?;
    }
    query.skip = map.get("$skip").and_then(Value::as_u64);
    query.take = map.get("$take").and_then(Value::as_u64);
    Ok(query)
}

/// Reads a projection list.
pub fn fields_from_json(value: &Value) -> Result<Vec<Field>> {
    match value {
        Value::Array(items) => items.iter().map(field_from_json).collect(),
        Value::Object(map) if !map.keys().any(|k| k.starts_with('$')) => map
            .iter()
            .map(|(alias, expr)| Ok(Field::aliased(alias.as_str(), expr_from_json(expr)?)))
            .collect(),
        other => Ok(vec![field_from_json(other)?]),
    }
}

/// Reads one projected field: `"name"`, `{"$name": ..}`, a function node,
/// or `{"alias": <expression>}`.
pub fn field_from_json(value: &Value) -> Result<Field> {
    match value {
        Value::String(name) => Ok(Field::column(name.trim_start_matches('$'))),
        Value::Object(map) => {
            let (key, inner) = single_entry(map, "a field")?;
            if key.starts_with('$') {
                Ok(Field::new(expr_from_json(value)?))
            } else {
                Ok(Field::aliased(key.as_str(), expr_from_json(inner)?))
            }
        }
        _ => Err(invalid("a field must be a name or an object")),
    }
}

fn join_from_json(value: &Value) -> Result<Join> {
    let map = as_object(value, "an $expand item")?;
    let entity_value = map
        .get("$entity")
        .ok_or_else(|| invalid("an $expand item needs $entity"))?;
    let (entity, kind) = match entity_value {
        Value::String(name) => (Entity::new(name.as_str()), JoinKind::Inner),
        Value::Object(spec) => {
            let name = spec
                .get("name")
                .and_then(Value::as_str)
                .ok_or_else(|| invalid("$entity needs a name"))?;
            let mut entity = Entity::new(name);
            if let Some(alias) = spec.get("$as").and_then(Value::as_str) {
                entity = entity.alias(alias);
            }
            let kind = match spec.get("$join").and_then(Value::as_str) {
                None | Some("inner") => JoinKind::Inner,
                Some("left") => JoinKind::Left,
                Some("right") => JoinKind::Right,
                Some(other) => return Err(invalid(format!("unknown join type '{other}'"))),
            };
            (entity, kind)
        }
        _ => return Err(invalid("$entity must be a name or an object")),
    };
    let on = match map.get("$with") {
        Some(Value::Array(pair)) if pair.len() == 2 => {
            Predicate::eq(expr_from_json(&pair[0])?, expr_from_json(&pair[1])?)
        }
        Some(condition) => predicate_from_json(condition)?,
        None => return Err(invalid("an $expand item needs $with")),
    };
    Ok(Join::new(kind, entity, on))
}

/// Reads `$order`: `"name"`, `{"$asc": expr}` or `{"$desc": expr}` items.
pub fn order_from_json(value: &Value) -> Result<Vec<OrderBy>> {
    arguments(value)
        .into_iter()
        .map(|item| -> Result<OrderBy> {
            match item {
                Value::Object(map) => {
                    let (key, expr) = single_entry(map, "an $order item")?;
                    let direction = match key.as_str() {
                        "$asc" => Direction::Asc,
                        "$desc" => Direction::Desc,
                        _ => return Ok(OrderBy::asc(expr_from_json(item)?)),
                    };
                    Ok(OrderBy {
                        expr: expr_from_json(expr)?,
                        direction,
                    })
                }
                Value::String(name) => {
                    Ok(OrderBy::asc(Expr::column(name.trim_start_matches('$'))))
                }
                _ => Err(invalid("an $order item must be a name or an object")),
            }
        })
        .collect()
}

/// Reads an expression.
pub fn expr_from_json(value: &Value) -> Result<Expr> {
    match value {
        Value::String(s) if s.len() > 1 && s.starts_with('$') => Ok(Expr::column(&s[1..])),
        Value::Object(map) if map.contains_key("$select") => {
            Ok(Expr::select(query_from_json(value)?))
        }
        Value::Object(map) if map.len() == 1 => {
            let (key, inner) = single_entry(map, "an expression")?;
            match key.as_str() {
                "$name" => inner
                    .as_str()
                    .map(|name| Expr::column(name.trim_start_matches('$')))
                    .ok_or_else(|| invalid("$name must be a string")),
                "$value" | "$literal" => Ok(Expr::Value(SqlValue::from(inner.clone()))),
                name if name.starts_with('$') => {
                    Ok(Expr::function(function_from_json(&name[1..], inner)?))
                }
                _ => Ok(Expr::Value(SqlValue::from(value.clone()))),
            }
        }
        other => Ok(Expr::Value(SqlValue::from(other.clone()))),
    }
}

fn arg<'a>(args: &[&'a Value], index: usize, function: &str) -> Result<&'a Value> {
    args.get(index)
        .copied()
        .ok_or_else(|| CompileError::InvalidArgument(format!("{function} expects argument {}", index + 1)))
}

fn expr_arg(args: &[&Value], index: usize, function: &str) -> Result<Expr> {
    expr_from_json(arg(args, index, function)?)
}

fn int_arg(args: &[&Value], index: usize, function: &str) -> Result<Option<i64>> {
    args.get(index)
        .map(|value| {
            value
                .as_i64()
                .ok_or_else(|| CompileError::InvalidArgument(format!("{function} expects an integer")))
        })
        .transpose()
}

fn precision_arg(args: &[&Value], index: usize, function: &str) -> Result<Option<u32>> {
    int_arg(args, index, function)?
        .map(|n| {
            u32::try_from(n)
                .map_err(|_| CompileError::InvalidArgument(format!("{function} precision out of range")))
        })
        .transpose()
}

/// Reads a function node. `name` is the key without its `$`.
pub fn function_from_json(name: &str, value: &Value) -> Result<Function> {
    let args = arguments(value);
    let unary = |f: fn(Expr) -> Function| expr_arg(&args, 0, name).map(f);
    let binary = |f: fn(Expr, Expr) -> Function| -> Result<Function> {
        Ok(f(expr_arg(&args, 0, name)?, expr_arg(&args, 1, name)?))
    };
    match name {
        "indexOf" | "indexof" => binary(Function::IndexOf),
        "substring" | "substr" => Ok(Function::Substring {
            source: expr_arg(&args, 0, name)?,
            start: int_arg(&args, 1, name)?.unwrap_or(0),
            length: int_arg(&args, 2, name)?,
        }),
        "length" => unary(Function::Length),
        "startsWith" | "startswith" => binary(Function::StartsWith),
        "contains" => binary(Function::Contains),
        "endsWith" | "endswith" => binary(Function::EndsWith),
        "regex" => binary(Function::Regex),
        "text" => binary(Function::Text),
        "concat" => Ok(Function::Concat(
            args.iter().map(|v| expr_from_json(v)).collect::<Result<_>>()?,
        )),
        "toString" | "tostring" => unary(Function::ToString),
        "toLower" | "tolower" => unary(Function::ToLower),
        "toUpper" | "toupper" => unary(Function::ToUpper),
        "trim" => unary(Function::Trim),

        "day" => unary(Function::Day),
        "month" => unary(Function::Month),
        "year" => unary(Function::Year),
        "hour" => unary(Function::Hour),
        "minute" | "minutes" => unary(Function::Minute),
        "second" | "seconds" => unary(Function::Second),
        "date" => unary(Function::Date),
        "now" => Ok(Function::Now),
        "getDate" | "getdate" => {
            let kind = match args.first().and_then(|v| v.as_str()) {
                None | Some("timestamp") => DateKind::Timestamp,
                Some("date") => DateKind::Date,
                Some("datetime") => DateKind::DateTime,
                Some(other) => {
                    return Err(CompileError::InvalidArgument(format!(
                        "getDate expects date, datetime or timestamp, got '{other}'"
                    )))
                }
            };
            Ok(Function::GetDate(kind))
        }

        "ceiling" | "ceil" => unary(Function::Ceiling),
        "floor" => unary(Function::Floor),
        "round" => Ok(Function::Round(
            expr_arg(&args, 0, name)?,
            args.get(1).map(|v| expr_from_json(v)).transpose()?,
        )),
        "toInt" => unary(Function::ToInt),
        "toDouble" => unary(Function::ToDouble),
        "toDecimal" => Ok(Function::ToDecimal {
            expr: expr_arg(&args, 0, name)?,
            precision: precision_arg(&args, 1, name)?,
            scale: precision_arg(&args, 2, name)?,
        }),
        "toLong" => unary(Function::ToLong),
        "bitAnd" | "bit" => binary(Function::BitAnd),
        "add" => binary(Function::Add),
        "subtract" => binary(Function::Subtract),
        "multiply" => binary(Function::Multiply),
        "divide" => binary(Function::Divide),
        "modulo" | "mod" => binary(Function::Modulo),

        "jsonGet" => {
            let path = match arg(&args, 0, name)? {
                Value::String(path) => path.trim_start_matches('$').to_string(),
                Value::Object(map) => map
                    .get("$name")
                    .and_then(Value::as_str)
                    .map(|p| p.trim_start_matches('$').to_string())
                    .ok_or_else(|| invalid("jsonGet expects a $name reference"))?,
                _ => return Err(invalid("jsonGet expects a path")),
            };
            Ok(Function::JsonGet(path))
        }
        "jsonObject" => {
            let fields = args
                .iter()
                .map(|v| fields_from_json(v))
                .collect::<Result<Vec<_>>>()?
                .into_iter()
                .flatten()
                .collect();
            Ok(Function::JsonObject(fields))
        }
        "jsonArray" => {
            let source = match value {
                Value::Array(items) if items.len() == 1 && items[0].is_object() => {
                    expr_from_json(&items[0])?
                }
                other => expr_from_json(other)?,
            };
            Ok(Function::JsonArray(source))
        }
        "jsonGroupArray" => unary(Function::JsonGroupArray),
        "jsonEach" => unary(Function::JsonEach),

        "ifNull" | "ifnull" => binary(Function::IfNull),
        "cond" => {
            let condition = arg(&args, 0, name)?;
            let condition = match condition.get("$where") {
                Some(filter) => predicate_from_json(filter)?,
                None => predicate_from_json(condition)?,
            };
            Ok(Function::Cond {
                condition,
                then: expr_arg(&args, 1, name)?,
                otherwise: expr_arg(&args, 2, name)?,
            })
        }
        "uuid" | "newGuid" => Ok(Function::Uuid),
        "toGuid" => unary(Function::ToGuid),

        "count" => unary(Function::Count),
        "min" => unary(Function::Min),
        "max" => unary(Function::Max),
        "sum" => unary(Function::Sum),
        "avg" => unary(Function::Avg),

        "rowIndex" => Ok(Function::RowIndex(order_from_json(value)?)),
        other => Err(CompileError::UnknownFunction(other.to_string())),
    }
}

/// Reads a `$where` predicate.
pub fn predicate_from_json(value: &Value) -> Result<Predicate> {
    let map = as_object(value, "a condition")?;
    if map.len() > 1 {
        return map
            .iter()
            .map(|(key, inner)| {
                let mut single = Map::new();
                single.insert(key.clone(), inner.clone());
                predicate_from_json(&Value::Object(single))
            })
            .collect::<Result<Vec<_>>>()
            .map(Predicate::And);
    }
    let (key, inner) = single_entry(map, "a condition")?;
    match key.as_str() {
        "$and" => logical(inner).map(Predicate::And),
        "$or" => logical(inner).map(Predicate::Or),
        "$nor" => logical(inner).map(Predicate::Nor),
        "$not" => {
            let mut items = logical(inner)?;
            match items.len() {
                1 => Ok(Predicate::Not(Box::new(items.remove(0)))),
                _ => Ok(Predicate::Not(Box::new(Predicate::And(items)))),
            }
        }
        "$eq" | "$ne" | "$gt" | "$gte" | "$lt" | "$lte" | "$in" | "$nin" | "$between" => {
            let args = arguments(inner);
            let left = expr_arg(&args, 0, key)?;
            operator(key, left, &args[1..])
        }
        name if name.starts_with('$') => Ok(Predicate::Expr(Expr::function(
            function_from_json(&name[1..], inner)?,
        ))),
        field => {
            let left = Expr::column(field);
            match inner {
                Value::Object(ops) if ops.keys().all(|k| k.starts_with('$')) && !ops.is_empty() => {
                    let parts = ops
                        .iter()
                        .map(|(op, operand)| {
                            let operands = match (op.as_str(), operand) {
                                ("$between", Value::Array(items)) => items.iter().collect(),
                                _ => vec![operand],
                            };
                            operator(op, left.clone(), &operands)
                        })
                        .collect::<Result<Vec<_>>>()?;
                    let mut parts = parts;
                    Ok(if parts.len() == 1 {
                        parts.remove(0)
                    } else {
                        Predicate::And(parts)
                    })
                }
                other => Ok(Predicate::eq(left, expr_from_json(other)?)),
            }
        }
    }
}

fn logical(value: &Value) -> Result<Vec<Predicate>> {
    arguments(value)
        .into_iter()
        .map(predicate_from_json)
        .collect()
}

fn operator(op: &str, left: Expr, operands: &[&Value]) -> Result<Predicate> {
    let right = |index: usize| expr_arg(operands, index, op);
    match op {
        "$eq" => Ok(Predicate::eq(left, right(0)?)),
        "$ne" => Ok(Predicate::ne(left, right(0)?)),
        "$gt" => Ok(Predicate::gt(left, right(0)?)),
        "$gte" => Ok(Predicate::gte(left, right(0)?)),
        "$lt" => Ok(Predicate::lt(left, right(0)?)),
        "$lte" => Ok(Predicate::lte(left, right(0)?)),
        "$between" => Ok(Predicate::between(left, right(0)?, right(1)?)),
        "$in" | "$nin" => {
            let values = match arg(operands, 0, op)? {
                Value::Array(items) => items.iter().map(expr_from_json).collect::<Result<_>>()?,
                other => vec![expr_from_json(other)?],
            };
            Ok(if op == "$in" {
                Predicate::is_in(left, values)
            } else {
                Predicate::not_in(left, values)
            })
        }
        other => Err(invalid(format!("unknown operator '{other}'"))),
    }
}
