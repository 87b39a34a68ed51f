//! SQL values and literal escaping.
//!
//! Oracle string literals only escape the single quote, by doubling it.
//! Text coming from other layers is often already escaped in the
//! backslash style (`\'`), so [`escape`] normalizes those sequences before
//! quoting. The result is that escaping twice yields the same literal as
//! escaping once.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use chrono::{DateTime, Datelike, FixedOffset, Local, Timelike, Utc};

/// A SQL value used as a literal or as a statement parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// NULL value.
    Null,
    /// Boolean value. Oracle has no boolean column type, so it renders as 1/0.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Float value.
    Float(f64),
    /// Text value.
    Text(String),
    /// An instant in time.
    DateTime(DateTime<Utc>),
    /// Binary blob value.
    Blob(Vec<u8>),
    /// A list of values.
    Array(Vec<SqlValue>),
    /// A keyed document.
    Object(BTreeMap<String, SqlValue>),
}

impl SqlValue {
    /// Returns true for `Null`.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Converts the value to its JSON representation.
    ///
    /// Datetimes become ISO 8601 strings in UTC with millisecond precision,
    /// blobs become upper-case hex strings.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value;
        match self {
            Self::Null => Value::Null,
            Self::Bool(b) => Value::Bool(*b),
            Self::Int(n) => Value::from(*n),
            Self::Float(f) => serde_json::Number::from_f64(*f).map_or(Value::Null, Value::Number),
            Self::Text(s) => Value::String(s.clone()),
            Self::DateTime(dt) => {
                Value::String(dt.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string())
            }
            Self::Blob(bytes) => Value::String(hex(bytes)),
            Self::Array(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            Self::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }

    /// Serializes the value as compact JSON text.
    #[must_use]
    pub fn to_json_string(&self) -> String {
        self.to_json().to_string()
    }
}

impl From<serde_json::Value> for SqlValue {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => n
                .as_i64()
                .map_or_else(|| Self::Float(n.as_f64().unwrap_or(f64::NAN)), Self::Int),
            Value::String(s) => Self::Text(s),
            Value::Array(items) => Self::Array(items.into_iter().map(Self::from).collect()),
            Value::Object(map) => {
                Self::Object(map.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            }
        }
    }
}

/// Trait for types that can be converted to SQL values.
pub trait ToSqlValue {
    /// Converts the value to a `SqlValue`.
    fn to_sql_value(self) -> SqlValue;
}

impl ToSqlValue for SqlValue {
    fn to_sql_value(self) -> SqlValue {
        self
    }
}

impl ToSqlValue for bool {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Bool(self)
    }
}

macro_rules! int_to_sql_value {
    ($($ty:ty),*) => {
        $(
            impl ToSqlValue for $ty {
                fn to_sql_value(self) -> SqlValue {
                    SqlValue::Int(i64::from(self))
                }
            }
        )*
    };
}

int_to_sql_value!(i8, i16, i32, i64, u8, u16, u32);

impl ToSqlValue for f64 {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Float(self)
    }
}

impl ToSqlValue for f32 {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Float(f64::from(self))
    }
}

impl ToSqlValue for String {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Text(self)
    }
}

impl ToSqlValue for &str {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Text(String::from(self))
    }
}

impl ToSqlValue for DateTime<Utc> {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::DateTime(self)
    }
}

impl ToSqlValue for Vec<u8> {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Blob(self)
    }
}

impl ToSqlValue for serde_json::Value {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::from(self)
    }
}

impl<T: ToSqlValue> ToSqlValue for Option<T> {
    fn to_sql_value(self) -> SqlValue {
        match self {
            Some(v) => v.to_sql_value(),
            None => SqlValue::Null,
        }
    }
}

/// Renders a value as an Oracle literal.
///
/// With `unquoted` set, text is escaped but not wrapped in quotes so it can
/// be spliced into a larger literal (a regular expression pattern, for
/// example).
///
/// Arrays are split on their content: a list of scalars is one JSON
/// document and becomes a single string literal, while a list holding at
/// least one object is escaped item by item and joined with `, `.
#[must_use]
pub fn escape(value: &SqlValue, unquoted: bool) -> String {
    match value {
        SqlValue::Null => "NULL".to_string(),
        SqlValue::Bool(b) => String::from(if *b { "1" } else { "0" }),
        SqlValue::Int(n) => n.to_string(),
        SqlValue::Float(f) if f.is_finite() => f.to_string(),
        SqlValue::Float(_) => "NULL".to_string(),
        SqlValue::Text(s) => escape_text(s, unquoted),
        SqlValue::DateTime(dt) => escape_date(dt),
        SqlValue::Blob(bytes) => format!("HEXTORAW('{}')", hex(bytes)),
        SqlValue::Array(items) => {
            if items.iter().any(|v| matches!(v, SqlValue::Object(_))) {
                items
                    .iter()
                    .map(|v| escape(v, unquoted))
                    .collect::<Vec<_>>()
                    .join(", ")
            } else {
                escape_text(&value.to_json_string(), unquoted)
            }
        }
        SqlValue::Object(_) => escape_text(&value.to_json_string(), unquoted),
    }
}

/// Escapes text as an Oracle string literal.
///
/// A string that already is a well-formed quoted literal is returned as is.
#[must_use]
pub fn escape_text(text: &str, unquoted: bool) -> String {
    if unquoted {
        return normalize_quotes(text);
    }
    if is_quoted_literal(text) {
        return text.to_string();
    }
    format!("'{}'", normalize_quotes(text))
}

/// Doubles single quotes and folds backslash escapes into Oracle's form.
///
/// `\'` becomes `''`, `\"` becomes `"` and `\\` becomes `\`. A quote that is
/// already doubled stays doubled.
fn normalize_quotes(text: &str) -> String {
    let mut raw = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(&next @ ('\'' | '"' | '\\')) = chars.peek() {
                raw.push(next);
                chars.next();
                continue;
            }
        }
        raw.push(c);
    }

    let mut out = String::with_capacity(raw.len() + 2);
    let mut run = 0usize;
    for c in raw.chars() {
        if c == '\'' {
            run += 1;
            continue;
        }
        push_quote_run(&mut out, run);
        run = 0;
        out.push(c);
    }
    push_quote_run(&mut out, run);
    out
}

fn push_quote_run(out: &mut String, run: usize) {
    let width = if run % 2 == 0 { run } else { run + 1 };
    out.extend(std::iter::repeat('\'').take(width));
}

/// Whether `text` is a complete literal: quoted at both ends with every
/// inner quote doubled.
fn is_quoted_literal(text: &str) -> bool {
    let Some(inner) = text
        .strip_prefix('\'')
        .and_then(|rest| rest.strip_suffix('\''))
    else {
        return false;
    };
    inner
        .split(|c| c != '\'')
        .all(|run| run.len() % 2 == 0)
}

/// Renders an instant as `TO_TIMESTAMP_TZ`, using the offset of the local
/// environment at call time.
#[must_use]
pub fn escape_date(value: &DateTime<Utc>) -> String {
    escape_date_with_offset(value, *Local::now().offset())
}

/// Renders an instant as `TO_TIMESTAMP_TZ` in the given offset.
#[must_use]
pub fn escape_date_with_offset(value: &DateTime<Utc>, offset: FixedOffset) -> String {
    let local = value.with_timezone(&offset);
    let seconds = offset.local_minus_utc();
    let sign = if seconds < 0 { '-' } else { '+' };
    let minutes = seconds.unsigned_abs() / 60;
    format!(
        "TO_TIMESTAMP_TZ('{:04}-{:02}-{:02} {:02}:{:02}:{:02}.{:03}{sign}{:02}:{:02}', 'YYYY-MM-DD HH24:MI:SS.FF3TZH:TZM')",
        local.year(),
        local.month(),
        local.day(),
        local.hour(),
        local.minute(),
        local.second(),
        local.timestamp_subsec_millis().min(999),
        minutes / 60,
        minutes % 60,
    )
}

/// Quotes each word of a dotted name: `Table.field` becomes `"Table"."field"`.
///
/// Names that already carry double quotes are returned unchanged.
#[must_use]
pub fn escape_name(name: &str) -> String {
    if name.contains('"') {
        return name.to_string();
    }
    let mut out = String::with_capacity(name.len() + 4);
    let mut word = String::new();
    for c in name.chars() {
        if c.is_alphanumeric() || c == '_' {
            word.push(c);
        } else {
            flush_word(&mut out, &mut word);
            out.push(c);
        }
    }
    flush_word(&mut out, &mut word);
    out
}

fn flush_word(out: &mut String, word: &mut String) {
    if !word.is_empty() {
        let _ = write!(out, "\"{word}\"");
        word.clear();
    }
}

/// Substitutes `?` placeholders outside string literals with escaped
/// parameters. Placeholders without a matching parameter are left in place.
#[must_use]
pub fn prepare(sql: &str, params: &[SqlValue]) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut params = params.iter();
    let mut in_literal = false;
    for c in sql.chars() {
        match c {
            '\'' => {
                in_literal = !in_literal;
                out.push(c);
            }
            '?' if !in_literal => match params.next() {
                Some(value) => out.push_str(&escape(value, false)),
                None => out.push(c),
            },
            _ => out.push(c),
        }
    }
    out
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut acc, b| {
        let _ = write!(acc, "{b:02X}");
        acc
    })
}
