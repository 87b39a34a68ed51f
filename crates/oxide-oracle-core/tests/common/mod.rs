#![allow(dead_code)]

use oxide_oracle_core::query::json::statement_from_json;
use oxide_oracle_core::{CompileError, FormatterSettings, OracleFormatter};
use serde_json::Value;

pub const JSON_DATE_FORMAT: &str = r#"YYYY-MM-DD"T"HH24:MI:SS.FF3"Z""#;

/// A formatter with a pinned JSON date format so results do not depend on
/// the host time zone.
pub fn formatter() -> OracleFormatter {
    OracleFormatter::with_settings(
        FormatterSettings::default().with_json_date_format(JSON_DATE_FORMAT),
    )
}

pub fn compile(doc: &Value) -> String {
    let statement = statement_from_json(doc)
        .unwrap_or_else(|e| panic!("Failed to read: {doc}\nError: {e:?}"));
    formatter()
        .format(&statement)
        .unwrap_or_else(|e| panic!("Failed to compile: {doc}\nError: {e:?}"))
}

pub fn compile_err(doc: &Value) -> CompileError {
    match statement_from_json(doc) {
        Ok(statement) => formatter()
            .format(&statement)
            .expect_err(&format!("Expected compile error for: {doc}")),
        Err(e) => e,
    }
}
