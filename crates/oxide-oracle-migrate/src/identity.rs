//! Identity values backed by Oracle sequences.
//!
//! Each `(entity, attribute)` pair owns one sequence named
//! `entity_attribute_seq`, created on first use.

use oxide_oracle_core::formatter::quote_ident;
use tracing::{debug, info};

use crate::config::AdapterOptions;
use crate::connection::{Connection, RowExt};
use crate::dialect::{MigrationDialect, OracleDialect};
use crate::error::{MigrateError, Result};
use crate::introspect::Introspector;
use crate::operations::MigrationOperation;
use crate::schema::QualifiedName;

const SEQUENCE_SUFFIX: &str = "_seq";

/// The sequence name for an entity attribute.
///
/// Names longer than `max_len` characters fall back to the entity name cut
/// to `max_len - 4` characters followed by `_seq`.
#[must_use]
pub fn sequence_name(entity: &str, attribute: &str, max_len: usize) -> String {
    let name = format!("{entity}_{attribute}{SEQUENCE_SUFFIX}");
    if name.chars().count() <= max_len {
        return name;
    }
    let keep = max_len.saturating_sub(SEQUENCE_SUFFIX.len());
    let mut truncated: String = entity.chars().take(keep).collect();
    truncated.push_str(SEQUENCE_SUFFIX);
    truncated
}

/// Hands out and resets identity values.
pub struct IdentityAllocator<'a, C: ?Sized> {
    conn: &'a C,
    options: &'a AdapterOptions,
    dialect: OracleDialect,
}

impl<'a, C: Connection + ?Sized> IdentityAllocator<'a, C> {
    /// Creates an allocator.
    pub const fn new(conn: &'a C, options: &'a AdapterOptions) -> Self {
        Self {
            conn,
            options,
            dialect: OracleDialect::new(),
        }
    }

    fn sequence(&self, entity: &str, attribute: &str) -> String {
        sequence_name(entity, attribute, self.options.max_identifier_length())
    }

    /// Creates the sequence when it does not exist yet.
    async fn ensure_sequence(&self, name: &str) -> Result<()> {
        let introspector = Introspector::new(self.conn, self.options);
        let qualified = QualifiedName {
            owner: self.options.schema.clone(),
            name: name.to_string(),
        };
        if introspector.has_sequence(&qualified).await? {
            return Ok(());
        }
        debug!(sequence = %name, "Creating identity sequence");
        let op = MigrationOperation::CreateSequence {
            name: name.to_string(),
        };
        for sql in self.dialect.generate_sql(&op) {
            self.conn.execute(&sql, &[]).await?;
        }
        Ok(())
    }

    /// Returns the next identity value, creating the sequence if needed.
    pub async fn next_value(&self, entity: &str, attribute: &str) -> Result<i64> {
        let name = self.sequence(entity, attribute);
        self.ensure_sequence(&name).await?;

        let sql = format!(r#"SELECT {}.nextval AS "resultId" FROM DUAL"#, quote_ident(&name));
        let rows = self.conn.execute(&sql, &[]).await?;
        rows.first()
            .and_then(|row| row.int("resultId"))
            .ok_or_else(|| MigrateError::InvalidState(format!("sequence {name} returned no value")))
    }

    /// Restarts the sequence after the current maximum of the column and
    /// returns the value the sequence will hand out next.
    ///
    /// Rows inserted between reading the maximum and restarting the
    /// sequence are not accounted for.
    pub async fn reset(&self, entity: &str, attribute: &str) -> Result<i64> {
        let name = self.sequence(entity, attribute);
        self.ensure_sequence(&name).await?;

        let table = QualifiedName::resolve(entity, self.options.schema.as_deref());
        let sql = format!(
            r#"SELECT MAX({}) AS "maxValue" FROM {}"#,
            quote_ident(attribute),
            table.to_sql()
        );
        let rows = self.conn.execute(&sql, &[]).await?;
        let start = rows
            .first()
            .and_then(|row| row.int("maxValue"))
            .map_or(1, |max| max + 1);

        let op = MigrationOperation::RestartSequence {
            name: name.clone(),
            start,
        };
        for sql in self.dialect.generate_sql(&op) {
            self.conn.execute(&sql, &[]).await?;
        }
        info!(sequence = %name, start, "Identity sequence restarted");
        Ok(start)
    }
}
