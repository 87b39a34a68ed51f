//! Column diffing between a requested definition and the live table.
//!
//! The live column is rendered back into the text the type mapper would
//! produce, and a column changes only when the two texts differ.

use oxide_oracle_core::{native_type, FieldDescriptor};

use crate::operations::ColumnModification;
use crate::schema::ColumnDescriptor;

/// Columns to add and columns to modify.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnPlan {
    /// Fields with no live column.
    pub add: Vec<FieldDescriptor>,
    /// Fields whose live column has a different type.
    pub change: Vec<FieldDescriptor>,
}

impl ColumnPlan {
    /// Whether the table already matches.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.change.is_empty()
    }
}

/// Renders a live column the way [`native_type`] renders a field.
#[must_use]
pub fn current_type(column: &ColumnDescriptor) -> String {
    let data_type = column.native_type.to_uppercase();
    let nullability = if column.nullable { "NULL" } else { "NOT NULL" };
    // NCLOB reports its locator length, never a declared size
    let size = column
        .size
        .filter(|s| *s > 0 && data_type != "NCLOB");

    match (column.precision, column.scale) {
        (Some(precision), Some(scale)) => {
            return format!("{data_type}({precision},{scale}) {nullability}");
        }
        _ if is_local_timestamp(&data_type) => return format!("{data_type} {nullability}"),
        _ => {}
    }
    match size {
        Some(size) => format!("{data_type}({size}) {nullability}"),
        None => format!("{data_type} {nullability}"),
    }
}

fn is_local_timestamp(data_type: &str) -> bool {
    data_type
        .strip_prefix("TIMESTAMP(")
        .and_then(|rest| rest.split_once(')'))
        .is_some_and(|(digits, tail)| {
            !digits.is_empty()
                && digits.chars().all(|c| c.is_ascii_digit())
                && tail == " WITH LOCAL TIME ZONE"
        })
}

fn requested_type(field: &FieldDescriptor) -> String {
    // the catalog reports VARCHAR columns as VARCHAR2
    let rendered = native_type(field);
    match rendered.strip_prefix("VARCHAR(") {
        Some(rest) => format!("VARCHAR2({rest}"),
        None => rendered,
    }
}

/// Splits requested fields into additions and type changes.
///
/// Fields matching a primary key column are left alone, as are fields whose
/// live column already has the requested type. One-to-many fields have no
/// column and are never planned.
#[must_use]
pub fn plan_columns(requested: &[FieldDescriptor], existing: &[ColumnDescriptor]) -> ColumnPlan {
    let mut plan = ColumnPlan::default();
    for field in requested.iter().filter(|f| !f.one_to_many) {
        match existing.iter().find(|c| c.name == field.name) {
            None => plan.add.push(field.clone()),
            Some(column) if column.primary => {}
            Some(column) => {
                if requested_type(field) != current_type(column) {
                    plan.change.push(field.clone());
                }
            }
        }
    }
    plan
}

/// Pairs each changed field with whether its nullability already matches.
#[must_use]
pub fn modifications(
    change: &[FieldDescriptor],
    existing: &[ColumnDescriptor],
) -> Vec<ColumnModification> {
    change
        .iter()
        .map(|field| ColumnModification {
            keep_nullability: existing
                .iter()
                .find(|c| c.name == field.name)
                .is_some_and(|c| c.nullable == field.is_nullable()),
            field: field.clone(),
        })
        .collect()
}
