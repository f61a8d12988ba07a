//! colineage core
//!
//! Lineage data model (tables, columns, flow and join edges), stable
//! diagnostics, the run report and configuration.
//! Never rename diagnostic codes - they are part of the public API.

pub mod diagnostic;
pub mod graph;
pub mod report;
pub mod config;

pub use diagnostic::{Diagnostic, DiagnosticCode, Severity, Location};
pub use graph::{
    ColumnKey, FlowEdge, GraphStats, JoinEdge, ProvenanceGraph, TableId, CALC_FIELD, FINAL_OUTPUT,
    UNKNOWN_TABLE,
};
pub use report::{Report, ReportSummary, ReportVersion};
pub use config::{Config, ConfigError, DialectConfig};
