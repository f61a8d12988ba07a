//! SQL parsing and lineage extraction
//!
//! This crate handles:
//! - Parsing SQL using datafusion-sqlparser-rs
//! - Classifying statements by the lineage they carry
//! - Resolving table aliases per select scope
//! - Extracting column flow and join edges into a provenance graph
//! - Discovering SQL files and running batches over them

pub mod parser;
pub mod shape;
pub mod walk;
pub mod scope;
pub mod extractor;
pub mod sources;
pub mod batch;

pub use parser::{SqlParser, ParsedSql, ParseError};
pub use shape::StatementShape;
pub use scope::{AliasScope, Resolution};
pub use extractor::LineageExtractor;
pub use sources::{SqlSource, SourceError};
pub use batch::LineageBatch;
