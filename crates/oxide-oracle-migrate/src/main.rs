//! oxide-oracle CLI
//!
//! Offline tooling for the Oracle dialect: compile query trees, preview
//! migration DDL and inspect type mappings without a database connection.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing::{debug, Level};
use tracing_subscriber::FmtSubscriber;

use oxide_oracle_core::query::json::statement_from_json;
use oxide_oracle_core::{native_type, OracleFormatter};
use oxide_oracle_migrate::prelude::*;

/// Oracle dialect tooling.
#[derive(Parser)]
#[command(name = "oxide-oracle")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Adapter options file (JSON).
    #[arg(short, long, env = "ORACLE_OPTIONS")]
    options: Option<PathBuf>,

    /// Default schema for unqualified names.
    #[arg(long, env = "ORACLE_SCHEMA")]
    schema: Option<String>,

    /// Longest identifier the server accepts.
    #[arg(long, env = "ORACLE_MAX_IDENTIFIER_LENGTH")]
    max_identifier_length: Option<usize>,

    /// Oracle format model for timestamps stored in JSON.
    #[arg(long, env = "ORACLE_JSON_DATE_FORMAT")]
    json_date_format: Option<String>,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a JSON query tree to Oracle SQL.
    Format {
        /// Query file.
        query: PathBuf,
    },

    /// Show the DDL that would create the table of a migration.
    SqlMigrate {
        /// Migration file.
        migration: PathBuf,
    },

    /// Show the Oracle type of one field or a list of fields.
    Type {
        /// Field file.
        field: PathBuf,
    },

    /// Show the identity sequence name of an entity attribute.
    SequenceName {
        /// Entity (table) name.
        entity: String,

        /// Attribute (column) name.
        attribute: String,
    },
}

impl Cli {
    fn adapter_options(&self) -> anyhow::Result<AdapterOptions> {
        let mut options = match &self.options {
            Some(path) => AdapterOptions::from_json_file(path)
                .with_context(|| format!("invalid options in {}", path.display()))?,
            None => AdapterOptions::default(),
        };
        if let Some(schema) = &self.schema {
            options.schema = Some(schema.clone());
        }
        if let Some(len) = self.max_identifier_length {
            options.max_identifier_length = Some(len);
        }
        if let Some(format) = &self.json_date_format {
            options.json_date_format = Some(format.clone());
        }
        Ok(options)
    }
}

async fn read(path: &Path) -> anyhow::Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("cannot read {}", path.display()))
}

async fn read_json(path: &Path) -> anyhow::Result<Value> {
    serde_json::from_str(&read(path).await?)
        .with_context(|| format!("invalid JSON in {}", path.display()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let options = cli.adapter_options()?;

    // Setup logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        options
            .log_level
            .as_deref()
            .and_then(|level| Level::from_str(level).ok())
            .unwrap_or(Level::INFO)
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Format { query } => {
            let tree = read_json(&query).await?;
            let statement = statement_from_json(&tree)?;
            let formatter = OracleFormatter::with_settings(options.formatter_settings());
            debug!(file = %query.display(), "Compiling query");
            println!("{}", formatter.format(&statement)?);
        }

        Commands::SqlMigrate { migration } => {
            let request: MigrationRequest = serde_json::from_value(read_json(&migration).await?)?;
            let table = QualifiedName::resolve(&request.applies_to, options.schema.as_deref());
            let dialect = OracleDialect::new();

            let mut statements = dialect.generate_sql(&MigrationOperation::CreateTable {
                table: table.clone(),
                fields: request.add.clone(),
            });
            for field in request
                .add
                .iter()
                .filter(|f| f.primary && f.abstract_type == AbstractType::Counter)
            {
                statements.extend(dialect.generate_sql(&MigrationOperation::CreateSequence {
                    name: sequence_name(&table.name, &field.name, options.max_identifier_length()),
                }));
            }
            for sql in statements {
                println!("{sql};");
            }
        }

        Commands::Type { field } => {
            let fields: Vec<FieldDescriptor> = match read_json(&field).await? {
                Value::Array(items) => items
                    .into_iter()
                    .map(serde_json::from_value)
                    .collect::<serde_json::Result<_>>()?,
                value => vec![serde_json::from_value(value)?],
            };
            for field in &fields {
                println!("{} {}", field.name, native_type(field));
            }
        }

        Commands::SequenceName { entity, attribute } => {
            println!(
                "{}",
                sequence_name(&entity, &attribute, options.max_identifier_length())
            );
        }
    }

    Ok(())
}
