//! Batch extraction over many SQL sources
//!
//! Owns the provenance graph for one run. Every source is an error boundary:
//! a file that cannot be read or parsed is recorded in the report and the
//! batch moves on.

use colineage_core::{
    Config, Diagnostic, DiagnosticCode, Location, ProvenanceGraph, Report, Severity, FINAL_OUTPUT,
};
use std::path::Path;

use crate::extractor::LineageExtractor;
use crate::parser::SqlParser;
use crate::sources::{SourceError, SqlSource};

/// Accumulates lineage of many sources into one graph
pub struct LineageBatch {
    parser: SqlParser,
    graph: ProvenanceGraph,
    result_table: String,
    diagnostics: Vec<Diagnostic>,
    sources_processed: usize,
    sources_failed: usize,
    statements_extracted: usize,
}

impl LineageBatch {
    pub fn new(parser: SqlParser) -> Self {
        Self {
            parser,
            graph: ProvenanceGraph::new(),
            result_table: FINAL_OUTPUT.to_string(),
            diagnostics: Vec::new(),
            sources_processed: 0,
            sources_failed: 0,
            statements_extracted: 0,
        }
    }

    /// Batch using the configured dialect and result table name
    pub fn from_config(config: &Config) -> Self {
        Self::new(SqlParser::from_dialect(&config.dialect))
            .with_result_table(config.result_table.clone())
    }

    pub fn with_result_table(mut self, name: impl Into<String>) -> Self {
        self.result_table = name.into();
        self
    }

    /// Extract one source; returns whether it parsed
    pub fn add_source(&mut self, source: &SqlSource) -> bool {
        self.sources_processed += 1;
        tracing::info!(
            source = %source.label(),
            declared = source.declared_output.as_deref().unwrap_or("-"),
            "extracting lineage"
        );

        let mut extractor =
            LineageExtractor::new(&mut self.graph).with_result_table(self.result_table.clone());
        let extracted = extractor.extract_sql(
            &self.parser,
            &source.sql,
            source.declared_output.as_deref(),
            source.origin.as_deref(),
        );
        self.diagnostics.extend(extractor.take_diagnostics());

        match extracted {
            Some(count) => {
                self.statements_extracted += count;
                true
            }
            None => {
                self.sources_failed += 1;
                false
            }
        }
    }

    /// Extract an in-memory SQL text
    pub fn add_sql(&mut self, sql: &str, declared_output: Option<&str>) -> bool {
        self.add_source(&SqlSource::inline(sql, declared_output))
    }

    /// Read and extract a file; unreadable files are recorded, not fatal
    pub fn add_file(&mut self, path: &Path) -> bool {
        match SqlSource::from_file(path) {
            Ok(source) => self.add_source(&source),
            Err(error) => {
                self.record_read_failure(path, &error);
                false
            }
        }
    }

    /// Extract every source in order; returns how many parsed
    pub fn add_sources<'a>(&mut self, sources: impl IntoIterator<Item = &'a SqlSource>) -> usize {
        sources
            .into_iter()
            .filter(|source| self.add_source(source))
            .count()
    }

    fn record_read_failure(&mut self, path: &Path, error: &SourceError) {
        tracing::warn!(path = %path.display(), %error, "skipping unreadable SQL file");

        self.sources_processed += 1;
        self.sources_failed += 1;
        self.diagnostics.push(
            Diagnostic::new(DiagnosticCode::SqlReadError, Severity::Error, error.to_string())
                .with_location(Location::new(path.display().to_string())),
        );
    }

    pub fn graph(&self) -> &ProvenanceGraph {
        &self.graph
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn sources_failed(&self) -> usize {
        self.sources_failed
    }

    /// Run report with summary counts and graph statistics
    pub fn report(&self) -> Report {
        let mut report =
            Report::from_diagnostics(self.diagnostics.clone()).with_graph_stats(self.graph.stats());
        report.summary.sources_processed = self.sources_processed;
        report.summary.sources_failed = self.sources_failed;
        report.summary.statements_extracted = self.statements_extracted;
        report
    }

    /// Finish the run, yielding the graph and its report
    pub fn finish(self) -> (ProvenanceGraph, Report) {
        let report = self.report();
        (self.graph, report)
    }
}

impl Default for LineageBatch {
    fn default() -> Self {
        Self::new(SqlParser::new())
    }
}
