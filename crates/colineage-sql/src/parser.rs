//! SQL parsing using datafusion-sqlparser-rs
//!
//! Parses SQL into AST and provides error handling with diagnostics.

use sqlparser::ast::Statement;
use sqlparser::dialect::{
    BigQueryDialect, Dialect, GenericDialect, HiveDialect, MySqlDialect, PostgreSqlDialect,
    SnowflakeDialect,
};
use sqlparser::parser::{Parser, ParserError};
use colineage_core::{Diagnostic, DiagnosticCode, DialectConfig, Location, Severity};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// SQL parser with configurable dialect
pub struct SqlParser {
    dialect: Box<dyn Dialect>,
}

impl SqlParser {
    /// Create a new SQL parser with the default (generic) dialect
    pub fn new() -> Self {
        Self {
            dialect: Box::new(GenericDialect {}),
        }
    }

    /// Create a SQL parser for BigQuery
    pub fn bigquery() -> Self {
        Self {
            dialect: Box::new(BigQueryDialect {}),
        }
    }

    /// Create a SQL parser for PostgreSQL
    pub fn postgres() -> Self {
        Self {
            dialect: Box::new(PostgreSqlDialect {}),
        }
    }

    /// Create a SQL parser for Snowflake
    pub fn snowflake() -> Self {
        Self {
            dialect: Box::new(SnowflakeDialect {}),
        }
    }

    /// Create a SQL parser for MySQL
    pub fn mysql() -> Self {
        Self {
            dialect: Box::new(MySqlDialect {}),
        }
    }

    /// Create a SQL parser for Hive
    pub fn hive() -> Self {
        Self {
            dialect: Box::new(HiveDialect {}),
        }
    }

    /// Create a parser from a dialect config
    pub fn from_dialect(dialect: &DialectConfig) -> Self {
        match dialect {
            DialectConfig::BigQuery => Self::bigquery(),
            DialectConfig::Snowflake => Self::snowflake(),
            DialectConfig::Postgres => Self::postgres(),
            DialectConfig::MySql => Self::mysql(),
            DialectConfig::Hive => Self::hive(),
            DialectConfig::Ansi => Self::new(),
        }
    }

    /// Parse SQL string into AST
    ///
    /// Returns ParsedSql on success, or ParseError with diagnostic on failure.
    pub fn parse(&self, sql: &str, file_path: Option<&Path>) -> Result<ParsedSql, ParseError> {
        match Parser::parse_sql(&*self.dialect, sql) {
            Ok(statements) => Ok(ParsedSql {
                statements,
                file_path: file_path.map(Path::to_path_buf),
            }),
            Err(error) => Err(ParseError {
                error,
                file_path: file_path.map(Path::to_path_buf),
            }),
        }
    }
}

impl Default for SqlParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Successfully parsed SQL with AST
#[derive(Debug, Clone)]
pub struct ParsedSql {
    /// Parsed statements
    pub statements: Vec<Statement>,

    /// Source file path (if parsed from file)
    pub file_path: Option<PathBuf>,
}

impl ParsedSql {
    /// Get the first statement
    pub fn first_statement(&self) -> Option<&Statement> {
        self.statements.first()
    }

    /// Count the number of statements
    pub fn statement_count(&self) -> usize {
        self.statements.len()
    }
}

/// SQL parsing error with diagnostic information
#[derive(Debug)]
pub struct ParseError {
    /// Parser error from sqlparser
    pub error: ParserError,

    /// Source file path
    pub file_path: Option<PathBuf>,
}

impl ParseError {
    /// Line and column reported by the parser, if present in the message
    pub fn position(&self) -> Option<(usize, usize)> {
        static POSITION: OnceLock<Option<Regex>> = OnceLock::new();

        let re = POSITION
            .get_or_init(|| Regex::new(r"Line: (\d+), Column: (\d+)").ok())
            .as_ref()?;

        let message = self.error.to_string();
        let caps = re.captures(&message)?;
        let line = caps.get(1)?.as_str().parse().ok()?;
        let column = caps.get(2)?.as_str().parse().ok()?;
        Some((line, column))
    }

    /// Convert to a diagnostic
    pub fn to_diagnostic(&self) -> Diagnostic {
        let message = format!("Failed to parse SQL: {}", self.error);

        let mut diag = Diagnostic::new(
            DiagnosticCode::SqlParseError,
            Severity::Error,
            message,
        );

        if let Some(path) = &self.file_path {
            let file = path.display().to_string();
            let location = match self.position() {
                Some((line, column)) => Location::with_position(file, line, column),
                None => Location::new(file),
            };
            diag = diag.with_location(location);
        }

        diag
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.file_path {
            Some(path) => write!(f, "SQL parse error in {}: {}", path.display(), self.error),
            None => write!(f, "SQL parse error: {}", self.error),
        }
    }
}

impl std::error::Error for ParseError {}
