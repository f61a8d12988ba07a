//! Provenance graph queries and export
//!
//! This crate handles:
//! - Upstream/downstream impact closures over flow and join edges
//! - Classifying tables relative to an impact root
//! - Exporting the graph as explorer elements, whole or scoped to one root
//! - Searching columns by name

pub mod impact;
pub mod export;

pub use impact::{compute_impact, Closure, Direction, Impact, LineageIndex, TableRole};
pub use export::{
    clean_id, export, export_scoped, search_columns, Element, ElementData, ExportError,
    LineagePayload,
};
