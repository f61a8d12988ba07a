//! Provenance graph: the accumulated lineage data model
//!
//! The graph is append-only while statements are extracted and read-only
//! afterward. Nothing is ever removed.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Column name used for computed projections that carry no alias
pub const CALC_FIELD: &str = "calc_field";

/// Default identity of a bare `SELECT` result
pub const FINAL_OUTPUT: &str = "FINAL_OUTPUT";

/// Identity of an object name that has no usable parts
pub const UNKNOWN_TABLE: &str = "unknown_table";

/// Normalized table identity (`catalog.schema.name`, lowercase)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TableId(String);

impl TableId {
    /// Build an identity from name parts, outermost qualifier first.
    ///
    /// Empty parts are dropped, the rest are joined with `.` and case-folded.
    pub fn from_parts<'a, I>(parts: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let joined = parts
            .into_iter()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join(".");

        if joined.is_empty() {
            Self(UNKNOWN_TABLE.to_string())
        } else {
            Self(joined.to_lowercase())
        }
    }

    /// Normalize a dotted name such as `Sales.Orders`
    pub fn normalize(name: &str) -> Self {
        Self::from_parts(name.split('.'))
    }

    /// Synthetic identity kept verbatim (e.g. `FINAL_OUTPUT`)
    pub fn synthetic(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TableId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TableId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A column observed on a table
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ColumnKey {
    pub table: TableId,
    pub column: String,
}

impl ColumnKey {
    pub fn new(table: TableId, column: impl Into<String>) -> Self {
        Self {
            table,
            column: column.into(),
        }
    }
}

impl std::fmt::Display for ColumnKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.table, self.column)
    }
}

/// Directed provenance link: `target` is derived from `source`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FlowEdge {
    pub source: ColumnKey,
    pub target: ColumnKey,
}

/// Undirected join-key pairing from one equality in an `ON` condition
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JoinEdge {
    pub left: ColumnKey,
    pub right: ColumnKey,
}

impl JoinEdge {
    /// Whether this edge pairs the two columns, in either order
    pub fn connects(&self, a: &ColumnKey, b: &ColumnKey) -> bool {
        (&self.left == a && &self.right == b) || (&self.left == b && &self.right == a)
    }
}

/// Counts over the graph, used for summaries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GraphStats {
    pub tables: usize,
    pub columns: usize,
    pub flow_edges: usize,
    pub join_edges: usize,
    pub ctes: usize,
    pub defined_tables: usize,
}

/// Table catalog plus flow and join edges, accumulated across statements
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProvenanceGraph {
    tables: BTreeMap<TableId, BTreeSet<String>>,
    flow_edges: Vec<FlowEdge>,
    join_edges: Vec<JoinEdge>,
    defined_tables: BTreeSet<TableId>,
    ctes: BTreeSet<TableId>,
}

impl ProvenanceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a table with an empty column set if unseen
    pub fn ensure_table(&mut self, table: &TableId) {
        if !self.tables.contains_key(table) {
            self.tables.insert(table.clone(), BTreeSet::new());
        }
    }

    /// Register a column (and its table) if unseen
    pub fn add_column(&mut self, column: &ColumnKey) {
        self.tables
            .entry(column.table.clone())
            .or_default()
            .insert(column.column.clone());
    }

    /// Record a flow edge, registering both endpoints
    pub fn add_flow(&mut self, source: ColumnKey, target: ColumnKey) {
        self.add_column(&source);
        self.add_column(&target);
        self.flow_edges.push(FlowEdge { source, target });
    }

    /// Record a join edge, registering both endpoints
    pub fn add_join(&mut self, left: ColumnKey, right: ColumnKey) {
        self.add_column(&left);
        self.add_column(&right);
        self.join_edges.push(JoinEdge { left, right });
    }

    /// Mark a table as explicitly declared (file-backed output)
    pub fn mark_defined(&mut self, table: &TableId) {
        self.ensure_table(table);
        self.defined_tables.insert(table.clone());
    }

    /// Mark a table as ephemeral (CTE or derived table)
    pub fn mark_cte(&mut self, table: &TableId) {
        self.ensure_table(table);
        self.ctes.insert(table.clone());
    }

    pub fn contains_table(&self, table: &TableId) -> bool {
        self.tables.contains_key(table)
    }

    /// Look up a table by its normalized name
    pub fn find_table(&self, name: &str) -> Option<&TableId> {
        let wanted = TableId::normalize(name);
        self.tables
            .get_key_value(&wanted)
            .or_else(|| self.tables.get_key_value(&TableId::synthetic(name)))
            .map(|(id, _)| id)
    }

    pub fn is_cte(&self, table: &TableId) -> bool {
        self.ctes.contains(table)
    }

    pub fn is_defined(&self, table: &TableId) -> bool {
        self.defined_tables.contains(table)
    }

    /// All tables, sorted by identity
    pub fn tables(&self) -> impl Iterator<Item = &TableId> {
        self.tables.keys()
    }

    /// Columns observed on a table (empty if the table is unknown)
    pub fn columns(&self, table: &TableId) -> impl Iterator<Item = &str> {
        self.tables
            .get(table)
            .into_iter()
            .flat_map(|cols| cols.iter().map(String::as_str))
    }

    /// Column entries owned by a table
    pub fn column_keys(&self, table: &TableId) -> Vec<ColumnKey> {
        self.columns(table)
            .map(|c| ColumnKey::new(table.clone(), c))
            .collect()
    }

    pub fn has_column(&self, column: &ColumnKey) -> bool {
        self.tables
            .get(&column.table)
            .map(|cols| cols.contains(&column.column))
            .unwrap_or(false)
    }

    pub fn flow_edges(&self) -> &[FlowEdge] {
        &self.flow_edges
    }

    pub fn join_edges(&self) -> &[JoinEdge] {
        &self.join_edges
    }

    pub fn defined_tables(&self) -> impl Iterator<Item = &TableId> {
        self.defined_tables.iter()
    }

    pub fn ctes(&self) -> impl Iterator<Item = &TableId> {
        self.ctes.iter()
    }

    pub fn stats(&self) -> GraphStats {
        GraphStats {
            tables: self.tables.len(),
            columns: self.tables.values().map(BTreeSet::len).sum(),
            flow_edges: self.flow_edges.len(),
            join_edges: self.join_edges.len(),
            ctes: self.ctes.len(),
            defined_tables: self.defined_tables.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
