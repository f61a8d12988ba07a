//! SQL source discovery
//!
//! A source is one SQL text paired with the output table it defines. In file
//! mode the declared output is the file stem, so `models/daily_sales.sql`
//! defines `daily_sales` whatever its statements name as their target.

use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// One SQL text to extract lineage from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlSource {
    /// File the text was read from, if any
    pub origin: Option<PathBuf>,

    /// Raw SQL text
    pub sql: String,

    /// Output table the text defines, overriding statement targets
    pub declared_output: Option<String>,
}

impl SqlSource {
    /// An in-memory source
    pub fn inline(sql: impl Into<String>, declared_output: Option<&str>) -> Self {
        Self {
            origin: None,
            sql: sql.into(),
            declared_output: declared_output.map(str::to_string),
        }
    }

    /// Read a file, declaring its stem as the output table
    pub fn from_file(path: &Path) -> Result<Self, SourceError> {
        let sql = std::fs::read_to_string(path).map_err(|source| SourceError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(Self {
            origin: Some(path.to_path_buf()),
            sql,
            declared_output: declared_name(path),
        })
    }

    /// Label used in logs and diagnostics
    pub fn label(&self) -> String {
        match &self.origin {
            Some(path) => path.display().to_string(),
            None => "<inline>".to_string(),
        }
    }
}

/// Errors raised while locating or reading SQL files
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("SQL path not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to list {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

/// The `.sql` files at `path`
///
/// A file is returned as is. A directory is scanned one level deep (no
/// recursion); matches are sorted so runs are reproducible.
pub fn discover(path: &Path) -> Result<Vec<PathBuf>, SourceError> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    if !path.is_dir() {
        return Err(SourceError::NotFound(path.to_path_buf()));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(path).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|source| SourceError::Walk {
            path: path.to_path_buf(),
            source,
        })?;

        if entry.file_type().is_file() && is_sql(entry.path()) {
            files.push(entry.into_path());
        }
    }

    files.sort();
    tracing::debug!(dir = %path.display(), files = files.len(), "discovered SQL files");
    Ok(files)
}

/// Discover and read every SQL file at `path`
pub fn load(path: &Path) -> Result<Vec<SqlSource>, SourceError> {
    discover(path)?
        .iter()
        .map(|file| SqlSource::from_file(file))
        .collect()
}

fn is_sql(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("sql"))
        .unwrap_or(false)
}

fn declared_name(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .map(str::to_string)
}
