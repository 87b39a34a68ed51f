//! Descriptors of live schema objects.
//!
//! These are produced fresh by every introspection call and never cached.

use serde::{Deserialize, Serialize};

use oxide_oracle_core::formatter::quote_ident;

/// A table, view, index or sequence name with an optional owner.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QualifiedName {
    /// Owning schema; `None` means the session's current schema.
    pub owner: Option<String>,
    /// Object name.
    pub name: String,
}

impl QualifiedName {
    /// An unqualified name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            owner: None,
            name: name.into(),
        }
    }

    /// A name with an explicit owner.
    pub fn with_owner(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: Some(owner.into()),
            name: name.into(),
        }
    }

    /// Splits `owner.name`; a bare name takes `default_owner`.
    #[must_use]
    pub fn resolve(name: &str, default_owner: Option<&str>) -> Self {
        match name.split_once('.') {
            Some((owner, table)) if !owner.is_empty() && !table.is_empty() => {
                Self::with_owner(owner, table)
            }
            _ => Self {
                owner: default_owner.map(str::to_string),
                name: name.to_string(),
            },
        }
    }

    /// The quoted SQL form, `"owner"."name"` or `"name"`.
    #[must_use]
    pub fn to_sql(&self) -> String {
        match &self.owner {
            Some(owner) => format!("{}.{}", quote_ident(owner), quote_ident(&self.name)),
            None => quote_ident(&self.name),
        }
    }
}

impl std::fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.owner {
            Some(owner) => write!(f, "{owner}.{}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// A column as reported by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDescriptor {
    /// Column name.
    pub name: String,
    /// Catalog data type, e.g. `NVARCHAR2` or `TIMESTAMP(6) WITH LOCAL TIME ZONE`.
    pub native_type: String,
    /// 1-based position.
    pub ordinal: i64,
    /// Length in characters for character types, bytes otherwise.
    pub size: Option<i64>,
    /// Digits after the decimal point.
    pub scale: Option<i64>,
    /// Total number of digits.
    pub precision: Option<i64>,
    /// Whether the column accepts NULL.
    pub nullable: bool,
    /// Whether the column belongs to the primary key.
    pub primary: bool,
}

/// A secondary index. Indexes backing a primary key are never reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDescriptor {
    /// Index name.
    pub name: String,
    /// Indexed columns in position order.
    pub columns: Vec<String>,
}

/// A table listed from the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDescriptor {
    /// Owning schema.
    pub owner: String,
    /// Table name.
    pub name: String,
}

/// A view listed from the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewDescriptor {
    /// Owning schema.
    pub owner: String,
    /// View name.
    pub name: String,
}
