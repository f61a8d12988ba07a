//! Graph export for the interactive explorer
//!
//! The payload is a flat element list: table containers, column nodes that
//! name their table as `parent`, then flow and join edges. Node ids replace
//! `.` and spaces with `_` so they are safe as selectors.

use colineage_core::{ColumnKey, ProvenanceGraph, TableId};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::impact::{Impact, TableRole};

/// Node id used for a table with an empty name
pub const UNKNOWN_ID: &str = "Unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Table,
    Column,
}

/// Whether a table is persisted or only lives inside a statement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableSubtype {
    Physical,
    Cte,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    Flow,
    Join,
}

/// Data block of one element
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ElementData {
    Table {
        id: String,
        label: String,
        #[serde(rename = "type")]
        kind: NodeKind,
        subtype: TableSubtype,
    },
    Column {
        id: String,
        label: String,
        parent: String,
        #[serde(rename = "type")]
        kind: NodeKind,
    },
    Edge {
        id: String,
        source: String,
        target: String,
        #[serde(rename = "edgeType")]
        edge_type: EdgeKind,
    },
}

impl ElementData {
    pub fn id(&self) -> &str {
        match self {
            Self::Table { id, .. } | Self::Column { id, .. } | Self::Edge { id, .. } => id,
        }
    }
}

/// One node or edge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    pub data: ElementData,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classes: Option<String>,
}

impl Element {
    fn table(graph: &ProvenanceGraph, table: &TableId) -> Self {
        let subtype = if graph.is_cte(table) {
            TableSubtype::Cte
        } else {
            TableSubtype::Physical
        };

        Self {
            data: ElementData::Table {
                id: clean_id(table.as_str()),
                label: table.to_string(),
                kind: NodeKind::Table,
                subtype,
            },
            classes: Some("table_node".to_string()),
        }
    }

    fn column(column: &ColumnKey) -> Self {
        Self {
            data: ElementData::Column {
                id: column_id(column),
                label: column.column.clone(),
                parent: clean_id(column.table.as_str()),
                kind: NodeKind::Column,
            },
            classes: Some("column_node".to_string()),
        }
    }

    fn edge(kind: EdgeKind, index: usize, source: &ColumnKey, target: &ColumnKey) -> Self {
        let prefix = match kind {
            EdgeKind::Flow => "flow",
            EdgeKind::Join => "join",
        };

        Self {
            data: ElementData::Edge {
                id: format!("{}_{}", prefix, index),
                source: column_id(source),
                target: column_id(target),
                edge_type: kind,
            },
            classes: None,
        }
    }

    fn with_class(mut self, class: &str) -> Self {
        self.classes = Some(match self.classes {
            Some(existing) => format!("{} {}", existing, class),
            None => class.to_string(),
        });
        self
    }
}

/// Exported graph: elements plus the declared-table listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineagePayload {
    pub elements: Vec<Element>,

    /// Declared output tables, sorted
    pub defined_tables: Vec<String>,
}

impl LineagePayload {
    pub fn nodes(&self) -> impl Iterator<Item = &Element> {
        self.elements
            .iter()
            .filter(|e| !matches!(e.data, ElementData::Edge { .. }))
    }

    pub fn edges(&self) -> impl Iterator<Item = &Element> {
        self.elements
            .iter()
            .filter(|e| matches!(e.data, ElementData::Edge { .. }))
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write the payload as JSON, creating parent directories
    pub fn save_to_file(&self, path: &Path) -> Result<(), ExportError> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|source| ExportError::Io {
                path: dir.display().to_string(),
                source,
            })?;
        }

        let json = self.to_json()?;
        std::fs::write(path, json).map_err(|source| ExportError::Io {
            path: path.display().to_string(),
            source,
        })
    }
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Failed to write {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize lineage: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Node id for a name: `.` and spaces become `_`
pub fn clean_id(name: &str) -> String {
    if name.is_empty() {
        return UNKNOWN_ID.to_string();
    }
    name.replace(['.', ' '], "_")
}

/// Node id of a column: `<table id>_<column id>`
pub fn column_id(column: &ColumnKey) -> String {
    format!("{}_{}", clean_id(column.table.as_str()), clean_id(&column.column))
}

/// Export the whole graph
pub fn export(graph: &ProvenanceGraph) -> LineagePayload {
    let mut elements = Vec::new();

    for table in graph.tables() {
        elements.push(Element::table(graph, table));
        for column in graph.column_keys(table) {
            elements.push(Element::column(&column));
        }
    }

    for (i, edge) in graph.flow_edges().iter().enumerate() {
        elements.push(Element::edge(EdgeKind::Flow, i, &edge.source, &edge.target));
    }
    for (i, edge) in graph.join_edges().iter().enumerate() {
        elements.push(Element::edge(EdgeKind::Join, i, &edge.left, &edge.right));
    }

    tracing::debug!(elements = elements.len(), "exported lineage graph");

    LineagePayload {
        elements,
        defined_tables: defined_tables(graph),
    }
}

/// Export only what is visible for one root's impact
///
/// Tables carry a `root-node`, `upstream-node` or `downstream-node` class.
/// Edges are kept when both ends are in a closure; edge ids keep their
/// positions from the full export.
pub fn export_scoped(graph: &ProvenanceGraph, impact: &Impact) -> LineagePayload {
    let mut elements = Vec::new();

    for table in graph.tables() {
        let class = match impact.role(table) {
            TableRole::Unrelated => continue,
            TableRole::Root => "root-node",
            TableRole::Upstream => "upstream-node",
            TableRole::Downstream => "downstream-node",
        };
        elements.push(Element::table(graph, table).with_class(class));

        for column in graph.column_keys(table) {
            if impact.contains_column(&column) {
                elements.push(Element::column(&column));
            }
        }
    }

    let visible = |a: &ColumnKey, b: &ColumnKey| {
        impact.contains_column(a) && impact.contains_column(b)
    };

    for (i, edge) in graph.flow_edges().iter().enumerate() {
        if visible(&edge.source, &edge.target) {
            elements.push(Element::edge(EdgeKind::Flow, i, &edge.source, &edge.target));
        }
    }
    for (i, edge) in graph.join_edges().iter().enumerate() {
        if visible(&edge.left, &edge.right) {
            elements.push(Element::edge(EdgeKind::Join, i, &edge.left, &edge.right));
        }
    }

    LineagePayload {
        elements,
        defined_tables: defined_tables(graph),
    }
}

/// Columns whose name contains any of the search terms
///
/// Terms are split on `,` and `;`, trimmed and matched case-insensitively.
pub fn search_columns(graph: &ProvenanceGraph, query: &str) -> Vec<ColumnKey> {
    let terms: Vec<String> = query
        .split([',', ';'])
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect();

    if terms.is_empty() {
        return Vec::new();
    }

    graph
        .tables()
        .flat_map(|table| graph.column_keys(table))
        .filter(|column| {
            let name = column.column.to_lowercase();
            terms.iter().any(|term| name.contains(term.as_str()))
        })
        .collect()
}

fn defined_tables(graph: &ProvenanceGraph) -> Vec<String> {
    graph.defined_tables().map(TableId::to_string).collect()
}
