//! SQL templates for the dialect functions.

use super::{quote_ident, OracleFormatter};
use crate::error::{CompileError, Result};
use crate::query::{DateKind, Expr, Field, Function, QueryExpression};
use crate::value::{self, SqlValue};

const UUID_LAYOUT: &str = r"'(.{8})(.{4})(.{4})(.{4})(.{12})', '\1-\2-\3-\4-\5'";

impl OracleFormatter {
    /// Renders a function call.
    pub fn format_function(&self, function: &Function) -> Result<String> {
        match function {
            Function::IndexOf(source, search) => Ok(format!(
                "(INSTR({},{})-1)",
                self.format_expr(source)?,
                self.format_expr(search)?
            )),
            Function::Substring {
                source,
                start,
                length,
            } => {
                let source = self.format_expr(source)?;
                let position = start.checked_add(1).ok_or_else(|| {
                    CompileError::InvalidArgument(format!("substring start {start} is out of range"))
                })?;
                Ok(match length {
                    Some(length) => format!("SUBSTR({source},{position},{length})"),
                    None => format!("SUBSTR({source},{position})"),
                })
            }
            Function::Length(expr) => Ok(format!("LENGTH({})", self.format_expr(expr)?)),
            Function::StartsWith(source, prefix) => Ok(format!(
                "REGEXP_COUNT({},{}, 1, 'i')",
                self.format_expr(source)?,
                self.pattern(prefix, "^", "")?
            )),
            Function::Contains(source, search) => Ok(format!(
                "(CASE WHEN REGEXP_COUNT({},{}, 1, 'i') > 0 THEN 1 ELSE 0 END)",
                self.format_expr(source)?,
                self.pattern(search, "", "")?
            )),
            Function::EndsWith(source, suffix) => Ok(format!(
                "REGEXP_COUNT({},{}, 1, 'i')",
                self.format_expr(source)?,
                self.pattern(suffix, "", "$")?
            )),
            Function::Regex(source, pattern) => Ok(format!(
                "REGEXP_LIKE({},{})",
                self.format_expr(source)?,
                self.pattern(pattern, "", "")?
            )),
            Function::Text(source, search) => Ok(format!(
                "(INSTR({},{})-1)>=0",
                self.format_expr(source)?,
                self.format_expr(search)?
            )),
            Function::Concat(items) => {
                if items.len() < 2 {
                    return Err(CompileError::InvalidArgument(
                        "concat expects at least two arguments".to_string(),
                    ));
                }
                let parts = items
                    .iter()
                    .map(|item| Ok(format!("COALESCE(TO_CHAR({}),'')", self.format_expr(item)?)))
                    .collect::<Result<Vec<_>>>()?;
                Ok(format!("({})", parts.join(" || ")))
            }
            Function::ToString(expr) => Ok(format!("TO_NCHAR({})", self.format_expr(expr)?)),
            Function::ToLower(expr) => Ok(format!("LOWER({})", self.format_expr(expr)?)),
            Function::ToUpper(expr) => Ok(format!("UPPER({})", self.format_expr(expr)?)),
            Function::Trim(expr) => Ok(format!("TRIM({})", self.format_expr(expr)?)),

            Function::Day(expr) => self.extract("DAY", expr),
            Function::Month(expr) => self.extract("MONTH", expr),
            Function::Year(expr) => self.extract("YEAR", expr),
            Function::Hour(expr) => self.extract("HOUR", expr),
            Function::Minute(expr) => self.extract("MINUTE", expr),
            Function::Second(expr) => self.extract("SECOND", expr),
            Function::Date(expr) => Ok(format!(
                "TO_CHAR(TRUNC({}), 'YYYY-MM-DD')",
                self.format_expr(expr)?
            )),
            Function::Now => Ok(current_date(DateKind::Timestamp).to_string()),
            Function::GetDate(kind) => Ok(current_date(*kind).to_string()),

            Function::Ceiling(expr) => Ok(format!("CEIL({})", self.format_expr(expr)?)),
            Function::Floor(expr) => Ok(format!("FLOOR({})", self.format_expr(expr)?)),
            Function::Round(expr, digits) => {
                let digits = match digits {
                    Some(digits) => self.format_expr(digits)?,
                    None => "0".to_string(),
                };
                Ok(format!("ROUND({},{digits})", self.format_expr(expr)?))
            }
            Function::ToInt(expr) => Ok(format!(
                "FLOOR(CAST({} as DECIMAL(19,8)))",
                self.format_expr(expr)?
            )),
            Function::ToDouble(expr) => Ok(format!(
                "CAST({} AS DECIMAL(19,8))",
                self.format_expr(expr)?
            )),
            Function::ToDecimal {
                expr,
                precision,
                scale,
            } => Ok(format!(
                "CAST({} AS DECIMAL({},{}))",
                self.format_expr(expr)?,
                precision.unwrap_or(19),
                scale.unwrap_or(8)
            )),
            Function::ToLong(expr) => Ok(format!("CAST({} AS NUMBER(19))", self.format_expr(expr)?)),
            Function::BitAnd(left, right) => self.binary(left, right, |a, b| format!("BITAND({a}, {b})")),
            Function::Add(left, right) => self.binary(left, right, |a, b| format!("({a} + {b})")),
            Function::Subtract(left, right) => self.binary(left, right, |a, b| format!("({a} - {b})")),
            Function::Multiply(left, right) => self.binary(left, right, |a, b| format!("({a} * {b})")),
            Function::Divide(left, right) => self.binary(left, right, |a, b| format!("({a} / {b})")),
            Function::Modulo(left, right) => self.binary(left, right, |a, b| format!("MOD({a}, {b})")),

            Function::JsonGet(path) => json_get(path),
            Function::JsonObject(fields) => self.json_object(fields),
            Function::JsonArray(expr) => self.json_array(expr),
            Function::JsonGroupArray(expr) => match expr {
                Expr::Function(inner) if matches!(**inner, Function::JsonObject(_)) => {
                    Ok(format!("JSON_ARRAYAGG({})", self.format_function(inner)?))
                }
                _ => Err(CompileError::UnsupportedShape {
                    function: "jsonGroupArray",
                    message: "expected a jsonObject expression".to_string(),
                }),
            },
            Function::JsonEach(expr) => Ok(format!(
                "JSON_TABLE({}, '$[*]' COLUMNS (\"value\" NVARCHAR2(2000) PATH '$'))",
                self.format_expr(expr)?
            )),

            Function::IfNull(expr, fallback) => self.binary(expr, fallback, |a, b| format!("NVL({a}, {b})")),
            Function::Cond {
                condition,
                then,
                otherwise,
            } => Ok(format!(
                "(CASE WHEN {} THEN {} ELSE {} END)",
                self.format_where(condition)?,
                self.format_expr(then)?,
                self.format_expr(otherwise)?
            )),
            Function::Uuid => Ok(format!("REGEXP_REPLACE(SYS_GUID(), {UUID_LAYOUT})")),
            Function::ToGuid(expr) => Ok(format!(
                "REGEXP_REPLACE(STANDARD_HASH(TO_CHAR({}),'MD5'), {UUID_LAYOUT})",
                self.format_expr(expr)?
            )),

            Function::Count(expr) => Ok(format!("COUNT({})", self.format_expr(expr)?)),
            Function::Min(expr) => Ok(format!("MIN({})", self.format_expr(expr)?)),
            Function::Max(expr) => Ok(format!("MAX({})", self.format_expr(expr)?)),
            Function::Sum(expr) => Ok(format!("SUM({})", self.format_expr(expr)?)),
            Function::Avg(expr) => Ok(format!("AVG({})", self.format_expr(expr)?)),

            Function::RowIndex(order) => {
                if order.is_empty() {
                    Ok("ROW_NUMBER() OVER(ORDER BY NULL)".to_string())
                } else {
                    Ok(format!(
                        "ROW_NUMBER() OVER(ORDER BY {})",
                        self.format_order(order)?
                    ))
                }
            }
        }
    }

    fn binary(
        &self,
        left: &Expr,
        right: &Expr,
        render: impl FnOnce(String, String) -> String,
    ) -> Result<String> {
        Ok(render(self.format_expr(left)?, self.format_expr(right)?))
    }

    /// A regular expression literal. Literal text is spliced into one quoted
    /// pattern, any other expression is concatenated with the anchors.
    fn pattern(&self, expr: &Expr, prefix: &str, suffix: &str) -> Result<String> {
        if let Expr::Value(value) = expr {
            return Ok(format!("'{prefix}{}{suffix}'", value::escape(value, true)));
        }
        let mut parts = Vec::with_capacity(3);
        if !prefix.is_empty() {
            parts.push(format!("'{prefix}'"));
        }
        parts.push(self.format_expr(expr)?);
        if !suffix.is_empty() {
            parts.push(format!("'{suffix}'"));
        }
        Ok(parts.join(" || "))
    }

    /// `EXTRACT(<part> FROM ..)`. Values read from JSON documents are text
    /// and are parsed with the configured JSON date format first.
    fn extract(&self, part: &str, expr: &Expr) -> Result<String> {
        let source = self.format_expr(expr)?;
        if expr.is_json_get() {
            Ok(format!(
                "EXTRACT({part} FROM TO_TIMESTAMP_TZ({source}, '{}'))",
                self.settings().json_date_format
            ))
        } else {
            Ok(format!("EXTRACT({part} FROM {source})"))
        }
    }

    fn json_object(&self, fields: &[Field]) -> Result<String> {
        let members = fields
            .iter()
            .map(|field| {
                let key = field.output_name().ok_or_else(|| CompileError::UnsupportedShape {
                    function: "jsonObject",
                    message: "every member needs a name".to_string(),
                })?;
                Ok(format!(
                    "{}:{}",
                    value::escape_text(key, false),
                    self.format_expr(&field.expr)?
                ))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(format!("json_object({})", members.join(",")))
    }

    /// Renders `jsonArray` for its three argument shapes: a field reference,
    /// a nested select aggregated into an array of objects, or a literal.
    fn json_array(&self, expr: &Expr) -> Result<String> {
        match expr {
            Expr::Column(_) => self.format_expr(expr),
            Expr::Select(query) => {
                let aggregated = QueryExpression {
                    fields: vec![Field::new(Expr::function(Function::JsonGroupArray(
                        Expr::function(Function::JsonObject(query.fields.clone())),
                    )))],
                    ..(**query).clone()
                };
                Ok(format!("({})", self.format_select(&aggregated)?))
            }
            Expr::Value(value @ SqlValue::Array(_)) => {
                Ok(value::escape_text(&value.to_json_string(), false))
            }
            Expr::Value(value) => Ok(value::escape(value, false)),
            Expr::Function(_) => Err(CompileError::UnsupportedShape {
                function: "jsonArray",
                message: "expected a field, a select or a literal value".to_string(),
            }),
        }
    }
}

/// `JSON_VALUE("Table"."column", '$.path')` for `Table.column.path`.
fn json_get(path: &str) -> Result<String> {
    let mut parts = path.split('.');
    let (Some(table), Some(column)) = (parts.next(), parts.next()) else {
        return Err(CompileError::InvalidExpression(format!(
            "jsonGet expects table.column.path, got '{path}'"
        )));
    };
    let rest = parts.collect::<Vec<_>>();
    if rest.is_empty() {
        return Err(CompileError::InvalidExpression(format!(
            "jsonGet path '{path}' names no property"
        )));
    }
    Ok(format!(
        "JSON_VALUE({}.{}, '$.{}')",
        quote_ident(table),
        quote_ident(column),
        rest.join(".")
    ))
}

const fn current_date(kind: DateKind) -> &'static str {
    match kind {
        DateKind::Date => "TRUNC(SYSDATE)",
        DateKind::DateTime => "SYSDATE",
        DateKind::Timestamp => "CAST(SYSDATE AS TIMESTAMP WITH LOCAL TIME ZONE)",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formatter::FormatterSettings;
    use crate::query::{OrderBy, Predicate};

    fn render(function: Function) -> String {
        OracleFormatter::with_settings(
            FormatterSettings::default()
                .with_force_alias(false)
                .with_json_date_format("YYYY-MM-DD"),
        )
        .format_function(&function)
        .unwrap()
    }

    fn col(name: &str) -> Expr {
        Expr::column(name)
    }

    #[test]
    fn test_string_functions() {
        assert_eq!(
            render(Function::IndexOf(col("name"), Expr::value("a"))),
            r#"(INSTR("name",'a')-1)"#
        );
        assert_eq!(
            render(Function::Substring {
                source: col("name"),
                start: 0,
                length: Some(3)
            }),
            r#"SUBSTR("name",1,3)"#
        );
        assert_eq!(
            render(Function::Substring {
                source: col("name"),
                start: 2,
                length: None
            }),
            r#"SUBSTR("name",3)"#
        );
        assert_eq!(render(Function::Length(col("name"))), r#"LENGTH("name")"#);
        assert_eq!(render(Function::ToString(col("id"))), r#"TO_NCHAR("id")"#);
        assert_eq!(render(Function::ToLower(col("name"))), r#"LOWER("name")"#);
        assert_eq!(render(Function::ToUpper(col("name"))), r#"UPPER("name")"#);
        assert_eq!(render(Function::Trim(col("name"))), r#"TRIM("name")"#);
        assert_eq!(
            render(Function::Text(col("name"), Expr::value("x"))),
            r#"(INSTR("name",'x')-1)>=0"#
        );
    }

    #[test]
    fn test_pattern_functions() {
        assert_eq!(
            render(Function::StartsWith(col("name"), Expr::value("Mac"))),
            r#"REGEXP_COUNT("name",'^Mac', 1, 'i')"#
        );
        assert_eq!(
            render(Function::EndsWith(col("name"), Expr::value("Pro"))),
            r#"REGEXP_COUNT("name",'Pro$', 1, 'i')"#
        );
        assert_eq!(
            render(Function::Contains(col("name"), Expr::value("o'k"))),
            r#"(CASE WHEN REGEXP_COUNT("name",'o''k', 1, 'i') > 0 THEN 1 ELSE 0 END)"#
        );
        assert_eq!(
            render(Function::Regex(col("name"), Expr::value("^[A-Z]"))),
            r#"REGEXP_LIKE("name",'^[A-Z]')"#
        );
        assert_eq!(
            render(Function::StartsWith(col("name"), col("prefix"))),
            r#"REGEXP_COUNT("name",'^' || "prefix", 1, 'i')"#
        );
    }

    #[test]
    fn test_concat() {
        assert_eq!(
            render(Function::Concat(vec![col("first"), Expr::value(" "), col("last")])),
            r#"(COALESCE(TO_CHAR("first"),'') || COALESCE(TO_CHAR(' '),'') || COALESCE(TO_CHAR("last"),''))"#
        );
        let err = OracleFormatter::new()
            .format_function(&Function::Concat(vec![col("a")]))
            .unwrap_err();
        assert!(matches!(err, CompileError::InvalidArgument(_)));
    }

    #[test]
    fn test_date_functions() {
        assert_eq!(render(Function::Day(col("d"))), r#"EXTRACT(DAY FROM "d")"#);
        assert_eq!(render(Function::Month(col("d"))), r#"EXTRACT(MONTH FROM "d")"#);
        assert_eq!(render(Function::Year(col("d"))), r#"EXTRACT(YEAR FROM "d")"#);
        assert_eq!(render(Function::Hour(col("d"))), r#"EXTRACT(HOUR FROM "d")"#);
        assert_eq!(render(Function::Minute(col("d"))), r#"EXTRACT(MINUTE FROM "d")"#);
        assert_eq!(render(Function::Second(col("d"))), r#"EXTRACT(SECOND FROM "d")"#);
        assert_eq!(
            render(Function::Date(col("d"))),
            r#"TO_CHAR(TRUNC("d"), 'YYYY-MM-DD')"#
        );
        assert_eq!(
            render(Function::Now),
            "CAST(SYSDATE AS TIMESTAMP WITH LOCAL TIME ZONE)"
        );
        assert_eq!(render(Function::GetDate(DateKind::Date)), "TRUNC(SYSDATE)");
        assert_eq!(render(Function::GetDate(DateKind::DateTime)), "SYSDATE");
    }

    #[test]
    fn test_date_part_of_json_value() {
        let get = Expr::function(Function::JsonGet("Orders.payload.createdAt".to_string()));
        assert_eq!(
            render(Function::Year(get)),
            r#"EXTRACT(YEAR FROM TO_TIMESTAMP_TZ(JSON_VALUE("Orders"."payload", '$.createdAt'), 'YYYY-MM-DD'))"#
        );
    }

    #[test]
    fn test_numeric_functions() {
        assert_eq!(render(Function::Ceiling(col("p"))), r#"CEIL("p")"#);
        assert_eq!(render(Function::Floor(col("p"))), r#"FLOOR("p")"#);
        assert_eq!(render(Function::Round(col("p"), None)), r#"ROUND("p",0)"#);
        assert_eq!(
            render(Function::Round(col("p"), Some(Expr::value(2)))),
            r#"ROUND("p",2)"#
        );
        assert_eq!(
            render(Function::ToInt(col("p"))),
            r#"FLOOR(CAST("p" as DECIMAL(19,8)))"#
        );
        assert_eq!(
            render(Function::ToDouble(col("p"))),
            r#"CAST("p" AS DECIMAL(19,8))"#
        );
        assert_eq!(
            render(Function::ToDecimal {
                expr: col("p"),
                precision: Some(10),
                scale: None
            }),
            r#"CAST("p" AS DECIMAL(10,8))"#
        );
        assert_eq!(render(Function::ToLong(col("p"))), r#"CAST("p" AS NUMBER(19))"#);
        assert_eq!(
            render(Function::BitAnd(col("flags"), Expr::value(4))),
            r#"BITAND("flags", 4)"#
        );
        assert_eq!(render(Function::Add(col("a"), col("b"))), r#"("a" + "b")"#);
        assert_eq!(render(Function::Subtract(col("a"), col("b"))), r#"("a" - "b")"#);
        assert_eq!(render(Function::Multiply(col("a"), col("b"))), r#"("a" * "b")"#);
        assert_eq!(render(Function::Divide(col("a"), col("b"))), r#"("a" / "b")"#);
        assert_eq!(render(Function::Modulo(col("a"), col("b"))), r#"MOD("a", "b")"#);
    }

    #[test]
    fn test_control_functions() {
        assert_eq!(
            render(Function::IfNull(col("a"), Expr::value(0))),
            r#"NVL("a", 0)"#
        );
        assert_eq!(
            render(Function::Cond {
                condition: Predicate::gt(col("price"), Expr::value(100)),
                then: Expr::value("high"),
                otherwise: Expr::value("low"),
            }),
            r#"(CASE WHEN ("price">100) THEN 'high' ELSE 'low' END)"#
        );
        assert_eq!(
            render(Function::Uuid),
            r"REGEXP_REPLACE(SYS_GUID(), '(.{8})(.{4})(.{4})(.{4})(.{12})', '\1-\2-\3-\4-\5')"
        );
        assert_eq!(
            render(Function::ToGuid(col("id"))),
            r#"REGEXP_REPLACE(STANDARD_HASH(TO_CHAR("id"),'MD5'), '(.{8})(.{4})(.{4})(.{4})(.{12})', '\1-\2-\3-\4-\5')"#
        );
    }

    #[test]
    fn test_aggregates_and_ranking() {
        assert_eq!(render(Function::Count(col("id"))), r#"COUNT("id")"#);
        assert_eq!(render(Function::Min(col("p"))), r#"MIN("p")"#);
        assert_eq!(render(Function::Max(col("p"))), r#"MAX("p")"#);
        assert_eq!(render(Function::Sum(col("p"))), r#"SUM("p")"#);
        assert_eq!(render(Function::Avg(col("p"))), r#"AVG("p")"#);
        assert_eq!(
            render(Function::RowIndex(vec![])),
            "ROW_NUMBER() OVER(ORDER BY NULL)"
        );
        assert_eq!(
            render(Function::RowIndex(vec![OrderBy::desc(col("p"))])),
            r#"ROW_NUMBER() OVER(ORDER BY "p" DESC)"#
        );
    }

    #[test]
    fn test_json_get() {
        assert_eq!(
            render(Function::JsonGet("Orders.payload.customer.name".to_string())),
            r#"JSON_VALUE("Orders"."payload", '$.customer.name')"#
        );
        assert!(OracleFormatter::new()
            .format_function(&Function::JsonGet("Orders.payload".to_string()))
            .is_err());
    }

    #[test]
    fn test_json_object() {
        assert_eq!(
            render(Function::JsonObject(vec![
                Field::column("Customers.id"),
                Field::aliased("fullName", col("Customers.name")),
            ])),
            r#"json_object('id':"Customers"."id",'fullName':"Customers"."name")"#
        );
        let err = OracleFormatter::new()
            .format_function(&Function::JsonObject(vec![Field::new(Expr::function(
                Function::Uuid,
            ))]))
            .unwrap_err();
        assert!(matches!(err, CompileError::UnsupportedShape { .. }));
    }

    #[test]
    fn test_json_group_array_requires_object() {
        assert_eq!(
            render(Function::JsonGroupArray(Expr::function(Function::JsonObject(vec![
                Field::column("id")
            ])))),
            r#"JSON_ARRAYAGG(json_object('id':"id"))"#
        );
        assert!(OracleFormatter::new()
            .format_function(&Function::JsonGroupArray(col("id")))
            .is_err());
    }

    #[test]
    fn test_json_array_shapes() {
        assert_eq!(render(Function::JsonArray(col("Orders.tags"))), r#""Orders"."tags""#);

        let sub = QueryExpression::from_entity("OrderItems")
            .select([Field::column("OrderItems.id"), Field::column("OrderItems.price")])
            .filter(Predicate::eq(col("OrderItems.order"), col("Orders.id")));
        assert_eq!(
            render(Function::JsonArray(Expr::select(sub.clone()))),
            concat!(
                r#"(SELECT JSON_ARRAYAGG(json_object('id':"OrderItems"."id",'price':"OrderItems"."price")) "#,
                r#"FROM "OrderItems" WHERE ("OrderItems"."order"="Orders"."id"))"#
            )
        );
        assert_eq!(sub.fields.len(), 2);

        assert_eq!(
            render(Function::JsonArray(Expr::Value(SqlValue::Array(vec![
                SqlValue::Int(1),
                SqlValue::Text("a".to_string())
            ])))),
            r#"'[1,"a"]'"#
        );

        let err = OracleFormatter::new()
            .format_function(&Function::JsonArray(Expr::function(Function::Uuid)))
            .unwrap_err();
        assert!(matches!(
            err,
            CompileError::UnsupportedShape {
                function: "jsonArray",
                ..
            }
        ));
    }

    #[test]
    fn test_json_each() {
        assert_eq!(
            render(Function::JsonEach(col("Orders.tags"))),
            r#"JSON_TABLE("Orders"."tags", '$[*]' COLUMNS ("value" NVARCHAR2(2000) PATH '$'))"#
        );
    }
}
