//! Configuration schema (colineage.toml)
//!
//! A legacy `config.json` with the same keys is also accepted.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use crate::graph::FINAL_OUTPUT;

/// Default config file name looked up in the working directory
pub const CONFIG_FILE: &str = "colineage.toml";

/// Legacy JSON config file name
pub const LEGACY_CONFIG_FILE: &str = "config.json";

/// SQL dialect configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialectConfig {
    /// BigQuery SQL dialect
    BigQuery,

    /// Snowflake SQL dialect
    Snowflake,

    /// PostgreSQL SQL dialect
    Postgres,

    /// MySQL SQL dialect
    MySql,

    /// Hive SQL dialect
    Hive,

    /// Generic ANSI SQL
    #[default]
    Ansi,
}

impl std::str::FromStr for DialectConfig {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "bigquery" => Ok(Self::BigQuery),
            "snowflake" => Ok(Self::Snowflake),
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "mysql" => Ok(Self::MySql),
            "hive" => Ok(Self::Hive),
            "ansi" | "generic" => Ok(Self::Ansi),
            other => Err(ConfigError::UnknownDialect(other.to_string())),
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// SQL dialect
    #[serde(default)]
    pub dialect: DialectConfig,

    /// File or directory holding the SQL scripts
    #[serde(default = "default_sql_repo_path")]
    pub sql_repo_path: PathBuf,

    /// Where the exported lineage payload is written
    #[serde(default = "default_output_file")]
    pub output_file: PathBuf,

    /// Identity given to the result of a bare SELECT
    #[serde(default = "default_result_table")]
    pub result_table: String,

    /// Project root path (for resolving relative paths)
    #[serde(skip)]
    pub project_root: PathBuf,
}

fn default_sql_repo_path() -> PathBuf {
    PathBuf::from(".")
}

fn default_output_file() -> PathBuf {
    PathBuf::from("lineage.json")
}

fn default_result_table() -> String {
    FINAL_OUTPUT.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dialect: DialectConfig::default(),
            sql_repo_path: default_sql_repo_path(),
            output_file: default_output_file(),
            result_table: default_result_table(),
            project_root: std::env::current_dir().unwrap_or_default(),
        }
    }
}

impl Config {
    /// Load config from a TOML file, or JSON when the extension is `.json`
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        let is_json = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        let mut config = if is_json {
            Self::from_json(&contents)?
        } else {
            Self::from_toml(&contents)?
        };

        // Set project root to parent of config file
        if let Some(parent) = path.parent() {
            config.project_root = parent.to_path_buf();
        }

        Ok(config)
    }

    /// Find and load `colineage.toml` or `config.json` from a directory
    ///
    /// Returns the default config when neither exists.
    pub fn discover(dir: &Path) -> Result<Self, ConfigError> {
        for name in [CONFIG_FILE, LEGACY_CONFIG_FILE] {
            let candidate = dir.join(name);
            if candidate.is_file() {
                return Self::from_file(&candidate);
            }
        }

        Ok(Self {
            project_root: dir.to_path_buf(),
            ..Self::default()
        })
    }

    /// Load config from TOML string
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml)
            .map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Load config from JSON string
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json)
            .map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Resolve a configured path against the project root
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_root.join(path)
        }
    }

    /// Save config to TOML file
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let toml = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, toml)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }
}

/// Config error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),

    #[error("Unknown SQL dialect: {0}")]
    UnknownDialect(String),
}
