//! Abstract field types and their Oracle column types.
//!
//! A [`FieldDescriptor`] describes a model attribute independently of any
//! database. [`native_type`] turns it into the column definition Oracle
//! expects, nullability suffix included.

use std::fmt;

use serde::{Deserialize, Serialize};

/// `Note` fields longer than this many characters are stored as `NCLOB`.
pub const NOTE_LOB_THRESHOLD: u32 = 2000;

/// The dialect-agnostic type of a field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AbstractType {
    Boolean,
    Byte,
    Float,
    Integer,
    Number,
    Decimal,
    Currency,
    Date,
    DateTime,
    Time,
    Long,
    Duration,
    Text,
    Url,
    Note,
    Json,
    Image,
    Binary,
    Guid,
    Short,
    Counter,
    /// Any type name the dialect does not know. Stored as a 19 digit integer.
    Other(String),
}

impl AbstractType {
    /// Returns the type name used by model definitions.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Boolean => "Boolean",
            Self::Byte => "Byte",
            Self::Float => "Float",
            Self::Integer => "Integer",
            Self::Number => "Number",
            Self::Decimal => "Decimal",
            Self::Currency => "Currency",
            Self::Date => "Date",
            Self::DateTime => "DateTime",
            Self::Time => "Time",
            Self::Long => "Long",
            Self::Duration => "Duration",
            Self::Text => "Text",
            Self::Url => "URL",
            Self::Note => "Note",
            Self::Json => "Json",
            Self::Image => "Image",
            Self::Binary => "Binary",
            Self::Guid => "Guid",
            Self::Short => "Short",
            Self::Counter => "Counter",
            Self::Other(name) => name,
        }
    }
}

impl Default for AbstractType {
    fn default() -> Self {
        Self::Other(String::new())
    }
}

impl From<&str> for AbstractType {
    fn from(name: &str) -> Self {
        match name {
            "Boolean" => Self::Boolean,
            "Byte" => Self::Byte,
            "Float" => Self::Float,
            "Integer" => Self::Integer,
            "Number" => Self::Number,
            "Decimal" => Self::Decimal,
            "Currency" => Self::Currency,
            "Date" => Self::Date,
            "DateTime" => Self::DateTime,
            "Time" => Self::Time,
            "Long" => Self::Long,
            "Duration" => Self::Duration,
            "Text" => Self::Text,
            "URL" | "Url" => Self::Url,
            "Note" => Self::Note,
            "Json" => Self::Json,
            "Image" => Self::Image,
            "Binary" => Self::Binary,
            "Guid" => Self::Guid,
            "Short" => Self::Short,
            "Counter" => Self::Counter,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for AbstractType {
    fn from(name: String) -> Self {
        Self::from(name.as_str())
    }
}

impl From<AbstractType> for String {
    fn from(value: AbstractType) -> Self {
        match value {
            AbstractType::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for AbstractType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A model attribute as submitted by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescriptor {
    /// Column name.
    pub name: String,
    /// Abstract type.
    #[serde(rename = "type", default)]
    pub abstract_type: AbstractType,
    /// Length or precision, depending on the type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
    /// Digits after the decimal point.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<u32>,
    /// Total number of digits.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<u32>,
    /// `None` means nullable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nullable: Option<bool>,
    /// Part of the primary key. Implies `NOT NULL`.
    #[serde(default)]
    pub primary: bool,
    /// Virtual association field with no column of its own.
    #[serde(default)]
    pub one_to_many: bool,
}

impl FieldDescriptor {
    /// Creates a nullable field with no size information.
    #[must_use]
    pub fn new(name: impl Into<String>, abstract_type: AbstractType) -> Self {
        Self {
            name: name.into(),
            abstract_type,
            ..Self::default()
        }
    }

    /// Sets the size.
    #[must_use]
    pub const fn with_size(mut self, size: u32) -> Self {
        self.size = Some(size);
        self
    }

    /// Sets the scale.
    #[must_use]
    pub const fn with_scale(mut self, scale: u32) -> Self {
        self.scale = Some(scale);
        self
    }

    /// Sets the precision.
    #[must_use]
    pub const fn with_precision(mut self, precision: u32) -> Self {
        self.precision = Some(precision);
        self
    }

    /// Marks the field as `NOT NULL`.
    #[must_use]
    pub const fn not_null(mut self) -> Self {
        self.nullable = Some(false);
        self
    }

    /// Marks the field as explicitly nullable.
    #[must_use]
    pub const fn nullable(mut self) -> Self {
        self.nullable = Some(true);
        self
    }

    /// Marks the field as the primary key.
    #[must_use]
    pub const fn primary_key(mut self) -> Self {
        self.primary = true;
        self
    }

    /// Marks the field as a virtual one-to-many association.
    #[must_use]
    pub const fn one_to_many(mut self) -> Self {
        self.one_to_many = true;
        self
    }

    /// Whether the resulting column accepts NULL.
    #[must_use]
    pub const fn is_nullable(&self) -> bool {
        if self.primary {
            return false;
        }
        !matches!(self.nullable, Some(false))
    }
}

/// Returns the Oracle column type for a field, including the nullability suffix.
///
/// The function is pure: the same descriptor always yields the same text.
#[must_use]
pub fn native_type(field: &FieldDescriptor) -> String {
    let mut sql = base_type(field);
    sql.push_str(nullability_suffix(field));
    sql
}

/// Returns `" NOT NULL"` or `" NULL"` for a field.
#[must_use]
pub const fn nullability_suffix(field: &FieldDescriptor) -> &'static str {
    if field.is_nullable() {
        " NULL"
    } else {
        " NOT NULL"
    }
}

/// Returns the Oracle column type for a field without the nullability suffix.
#[must_use]
pub fn base_type(field: &FieldDescriptor) -> String {
    let size = field.size.filter(|s| *s > 0);
    match &field.abstract_type {
        AbstractType::Boolean => "NUMBER(1,0)".to_string(),
        AbstractType::Byte => "NUMBER(3,0)".to_string(),
        AbstractType::Float | AbstractType::Time => "NUMBER(19,4)".to_string(),
        AbstractType::Counter | AbstractType::Long | AbstractType::Other(_) => {
            "NUMBER(19,0)".to_string()
        }
        AbstractType::Currency => format!("NUMBER({},4)", size.unwrap_or(19)),
        AbstractType::Number | AbstractType::Decimal => match (size, field.scale) {
            (Some(size), Some(scale)) => format!("NUMBER({size},{scale})"),
            _ => "NUMBER(19,4)".to_string(),
        },
        AbstractType::Date | AbstractType::DateTime => {
            "TIMESTAMP(6) WITH LOCAL TIME ZONE".to_string()
        }
        AbstractType::Duration => format!("NVARCHAR2({})", size.unwrap_or(48)),
        AbstractType::Integer => match size {
            Some(size) if size <= 38 => format!("NUMBER({size},0)"),
            _ => "NUMBER(19,0)".to_string(),
        },
        AbstractType::Text | AbstractType::Url => format!("NVARCHAR2({})", size.unwrap_or(255)),
        AbstractType::Note => match size {
            Some(size) if size > NOTE_LOB_THRESHOLD => "NCLOB".to_string(),
            _ => format!("NVARCHAR2({})", size.unwrap_or(NOTE_LOB_THRESHOLD)),
        },
        AbstractType::Json => "NCLOB".to_string(),
        AbstractType::Image | AbstractType::Binary => "LONG RAW".to_string(),
        AbstractType::Guid => "VARCHAR(36)".to_string(),
        AbstractType::Short => "NUMBER(5,0)".to_string(),
    }
}
