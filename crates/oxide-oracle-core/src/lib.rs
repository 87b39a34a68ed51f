//! # oxide-oracle-core
//!
//! The Oracle dialect of a dialect-agnostic query representation.
//!
//! This crate provides:
//! - A table-driven mapping from abstract field types to Oracle column types
//! - Literal escaping that is safe to apply to already-escaped text
//! - A compiler from query trees to Oracle SQL, including windowed paging
//!   and JSON-shaping functions
//!
//! ## Compiling a query
//!
//! ```rust
//! use oxide_oracle_core::query::{Expr, Field, Predicate, QueryExpression};
//! use oxide_oracle_core::OracleFormatter;
//!
//! let query = QueryExpression::from_entity("Products")
//!     .select([Field::column("id"), Field::column("name")])
//!     .filter(Predicate::gt(Expr::column("price"), Expr::value(500)))
//!     .skip(10)
//!     .take(5);
//!
//! let sql = OracleFormatter::new().format_select(&query).unwrap();
//! assert!(sql.contains("BETWEEN 11 AND 15"));
//! ```
//!
//! ## Mapping a field
//!
//! ```rust
//! use oxide_oracle_core::types::{native_type, AbstractType, FieldDescriptor};
//!
//! let field = FieldDescriptor::new("id", AbstractType::Counter).primary_key();
//! assert_eq!(native_type(&field), "NUMBER(19,0) NOT NULL");
//! ```

pub mod error;
pub mod formatter;
pub mod query;
pub mod types;
pub mod value;

pub use error::{CompileError, Result};
pub use formatter::{FormatterSettings, OracleFormatter};
pub use query::{QueryExpression, Statement};
pub use types::{native_type, AbstractType, FieldDescriptor};
pub use value::{escape, escape_name, SqlValue, ToSqlValue};
