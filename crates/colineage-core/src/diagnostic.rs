//! Diagnostic codes and error reporting
//!
//! IMPORTANT: Diagnostic codes are versioned and stable.
//! NEVER rename or remove codes - they are part of the public API.
//! Add new codes with new names only.

use serde::{Deserialize, Serialize};

/// Diagnostic code registry (v1)
///
/// These codes are STABLE and VERSIONED.
/// Do NOT rename or remove codes - only add new ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiagnosticCode {
    // SQL input issues (1xxx)
    /// Failed to parse SQL
    SqlParseError,

    /// Statement kind carries no lineage (DDL without a query, DELETE, ...)
    SqlUnsupportedStatement,

    /// Failed to read an input file
    SqlReadError,

    // Lineage resolution (2xxx)
    /// `SELECT *` encountered; wildcard lineage is not expanded
    LineageWildcardSkipped,

    /// A column qualifier matched no table in scope and was used verbatim
    LineageUnresolvedReference,

    /// A derived table has no alias and cannot be referenced
    LineageUnaliasedSubquery,

    // General (9xxx)
    /// General informational message
    Info,

    /// General warning message
    Warning,
}

impl DiagnosticCode {
    /// Get the diagnostic code as a stable string identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SqlParseError => "SQL_PARSE_ERROR",
            Self::SqlUnsupportedStatement => "SQL_UNSUPPORTED_STATEMENT",
            Self::SqlReadError => "SQL_READ_ERROR",
            Self::LineageWildcardSkipped => "LINEAGE_WILDCARD_SKIPPED",
            Self::LineageUnresolvedReference => "LINEAGE_UNRESOLVED_REFERENCE",
            Self::LineageUnaliasedSubquery => "LINEAGE_UNALIASED_SUBQUERY",
            Self::Info => "INFO",
            Self::Warning => "WARNING",
        }
    }
}

impl std::fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Diagnostic severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational message
    Info,

    /// Warning - should be reviewed but not blocking
    Warn,

    /// Error - blocking issue that should fail CI
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Source location in a file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// File path relative to project root
    pub file: String,

    /// Optional line number (1-indexed)
    pub line: Option<usize>,

    /// Optional column number (1-indexed)
    pub column: Option<usize>,

    /// Optional end line (for ranges)
    pub end_line: Option<usize>,

    /// Optional end column (for ranges)
    pub end_column: Option<usize>,
}

impl Location {
    /// Create a new location with just a file path
    pub fn new(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            line: None,
            column: None,
            end_line: None,
            end_column: None,
        }
    }

    /// Create a location with file and line number
    pub fn with_line(file: impl Into<String>, line: usize) -> Self {
        Self {
            file: file.into(),
            line: Some(line),
            column: None,
            end_line: None,
            end_column: None,
        }
    }

    /// Create a location with file, line, and column
    pub fn with_position(file: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            file: file.into(),
            line: Some(line),
            column: Some(column),
            end_line: None,
            end_column: None,
        }
    }
}

/// A diagnostic message with structured metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Stable diagnostic code
    pub code: DiagnosticCode,

    /// Severity level
    pub severity: Severity,

    /// Human-readable message
    pub message: String,

    /// Source location (best-effort)
    pub location: Option<Location>,

    /// Table the issue was observed on, if any
    pub table: Option<String>,

    /// Tables whose lineage may be incomplete because of this issue
    pub impact: Vec<String>,
}

impl Diagnostic {
    /// Create a new diagnostic with minimal fields
    pub fn new(code: DiagnosticCode, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            code,
            severity,
            message: message.into(),
            location: None,
            table: None,
            impact: Vec::new(),
        }
    }

    /// Set the location
    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    /// Set the table the issue concerns
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Set affected tables
    pub fn with_impact(mut self, impact: Vec<String>) -> Self {
        self.impact = impact;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostic_code_stability() {
        // Ensure codes are stable strings
        assert_eq!(DiagnosticCode::SqlParseError.as_str(), "SQL_PARSE_ERROR");
        assert_eq!(
            DiagnosticCode::LineageUnresolvedReference.as_str(),
            "LINEAGE_UNRESOLVED_REFERENCE"
        );
    }

    #[test]
    fn serde_name_matches_as_str() {
        let json = serde_json::to_string(&DiagnosticCode::LineageWildcardSkipped).unwrap();
        assert_eq!(json, "\"LINEAGE_WILDCARD_SKIPPED\"");
    }

    #[test]
    fn diagnostic_serialization() {
        let diag = Diagnostic::new(
            DiagnosticCode::SqlParseError,
            Severity::Error,
            "Failed to parse SQL: Expected an SQL statement"
        )
        .with_location(Location::with_line("models/sales_summary.sql", 3))
        .with_table("sales_summary");

        let json = serde_json::to_string(&diag).unwrap();
        assert!(json.contains("SQL_PARSE_ERROR"));
        assert!(json.contains("error"));
        assert!(json.contains("sales_summary"));
    }
}
