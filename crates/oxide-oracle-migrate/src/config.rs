//! Adapter configuration.

use std::collections::BTreeMap;
use std::path::Path;

use oxide_oracle_core::FormatterSettings;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{MigrateError, Result};

/// Oracle limits identifiers to 30 bytes before 12.2.
pub const DEFAULT_MAX_IDENTIFIER_LENGTH: usize = 30;

/// Connection and dialect options, read from camelCase JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AdapterOptions {
    /// Database host.
    pub host: Option<String>,
    /// Listener port.
    pub port: Option<u16>,
    /// Service name.
    pub service: Option<String>,
    /// Instance name.
    pub instance: Option<String>,
    /// Server type (`dedicated`, `shared` or `pooled`).
    #[serde(rename = "type")]
    pub server_type: Option<String>,
    /// Full easy-connect string; wins over the individual parts.
    pub connect_string: Option<String>,
    /// User name.
    pub user: Option<String>,
    /// Password.
    #[serde(skip_serializing)]
    pub password: Option<String>,
    /// Default owner for unqualified table names.
    pub schema: Option<String>,
    /// Session parameters applied with `ALTER SESSION`.
    pub session: BTreeMap<String, Value>,
    /// Log level for the CLI (`error` .. `trace`).
    pub log_level: Option<String>,
    /// Longest identifier the server accepts.
    pub max_identifier_length: Option<usize>,
    /// Overrides the probed JSON date format.
    pub json_date_format: Option<String>,
}

impl AdapterOptions {
    /// Reads options from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| MigrateError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&text)?)
    }

    /// The easy-connect string: `connectString` when given, otherwise
    /// `host[:port][/service][:type][/instance]`.
    #[must_use]
    pub fn connect_string(&self) -> Option<String> {
        if let Some(connect_string) = &self.connect_string {
            return Some(connect_string.clone());
        }
        let mut out = self.host.clone()?;
        if let Some(port) = self.port {
            out.push_str(&format!(":{port}"));
        }
        if let Some(service) = &self.service {
            out.push('/');
            out.push_str(service);
        }
        if let Some(server_type) = &self.server_type {
            out.push(':');
            out.push_str(server_type);
        }
        if let Some(instance) = &self.instance {
            out.push('/');
            out.push_str(instance);
        }
        Some(out)
    }

    /// The identifier length limit, defaulting to 30.
    #[must_use]
    pub fn max_identifier_length(&self) -> usize {
        self.max_identifier_length
            .filter(|len| *len > 4)
            .unwrap_or(DEFAULT_MAX_IDENTIFIER_LENGTH)
    }

    /// Formatter settings derived from these options.
    #[must_use]
    pub fn formatter_settings(&self) -> FormatterSettings {
        let settings = FormatterSettings::default();
        match &self.json_date_format {
            Some(format) => settings.with_json_date_format(format.clone()),
            None => settings,
        }
    }
}
