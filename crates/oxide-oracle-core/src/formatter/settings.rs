//! Formatter settings.

use std::sync::OnceLock;

use chrono::Utc;
use regex::Regex;

use crate::value::SqlValue;

/// Date format used when JSON timestamps are serialized in UTC (`Z`).
pub const UTC_JSON_DATE_FORMAT: &str = r#"YYYY-MM-DD"T"HH24:MI:SS.FF3"Z""#;

/// Date format used when JSON timestamps carry a numeric offset.
pub const OFFSET_JSON_DATE_FORMAT: &str = r#"YYYY-MM-DD"T"HH24:MI:SS.FF3TZH:TZM"#;

/// Options that change how SQL text is produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatterSettings {
    /// Oracle format model used to parse timestamps stored in JSON documents.
    pub json_date_format: String,
    /// Give qualified column fields an alias equal to their column name.
    pub force_alias: bool,
    /// Render aliases as `expr AS "alias"` rather than `expr "alias"`.
    pub use_alias_keyword: bool,
}

impl Default for FormatterSettings {
    fn default() -> Self {
        Self {
            json_date_format: host_json_date_format().to_string(),
            force_alias: true,
            use_alias_keyword: false,
        }
    }
}

impl FormatterSettings {
    /// Overrides the JSON date format.
    #[must_use]
    pub fn with_json_date_format(mut self, format: impl Into<String>) -> Self {
        self.json_date_format = format.into();
        self
    }

    /// Sets whether qualified columns are always aliased.
    #[must_use]
    pub const fn with_force_alias(mut self, force_alias: bool) -> Self {
        self.force_alias = force_alias;
        self
    }

    /// Sets whether aliases use the `AS` keyword.
    #[must_use]
    pub const fn with_alias_keyword(mut self, use_alias_keyword: bool) -> Self {
        self.use_alias_keyword = use_alias_keyword;
        self
    }
}

/// The JSON date format matching how this process serializes timestamps.
///
/// Probed once: the current time is serialized through
/// [`SqlValue::to_json`], the same path values take into JSON documents,
/// and the result is checked for a numeric UTC offset.
pub fn host_json_date_format() -> &'static str {
    static FORMAT: OnceLock<&'static str> = OnceLock::new();
    FORMAT.get_or_init(|| match SqlValue::DateTime(Utc::now()).to_json() {
        serde_json::Value::String(sample) => json_date_format_for(&sample),
        _ => UTC_JSON_DATE_FORMAT,
    })
}

/// Picks the JSON date format for a serialized timestamp sample.
#[must_use]
pub fn json_date_format_for(sample: &str) -> &'static str {
    static OFFSET: OnceLock<Option<Regex>> = OnceLock::new();
    let pattern = OFFSET.get_or_init(|| {
        Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(\.\d+)?[+-]\d{2}:\d{2}$").ok()
    });
    match pattern {
        Some(re) if re.is_match(sample) => OFFSET_JSON_DATE_FORMAT,
        _ => UTC_JSON_DATE_FORMAT,
    }
}
