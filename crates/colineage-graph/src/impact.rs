//! Impact traversal over the provenance graph
//!
//! Flow edges are followed in their direction; join edges connect both ways.
//! Closures start from every column of the root table and grow breadth-first
//! until nothing new is reached.

use colineage_core::{ColumnKey, ProvenanceGraph, TableId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};

/// Traversal direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Toward the columns a column is derived from
    Upstream,

    /// Toward the columns derived from a column
    Downstream,
}

/// Columns reached by a traversal, with the tables owning them
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Closure {
    pub columns: BTreeSet<ColumnKey>,
    pub tables: BTreeSet<TableId>,
}

impl Closure {
    fn insert(&mut self, column: &ColumnKey) -> bool {
        if self.columns.contains(column) {
            return false;
        }
        self.tables.insert(column.table.clone());
        self.columns.insert(column.clone());
        true
    }

    pub fn contains(&self, column: &ColumnKey) -> bool {
        self.columns.contains(column)
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Union of two closures
    pub fn merge(&mut self, other: Closure) {
        self.columns.extend(other.columns);
        self.tables.extend(other.tables);
    }
}

/// Relation of a table to the root of an impact query
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableRole {
    Root,
    Upstream,
    Downstream,
    Unrelated,
}

impl TableRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Root => "root",
            Self::Upstream => "upstream",
            Self::Downstream => "downstream",
            Self::Unrelated => "unrelated",
        }
    }
}

/// Upstream and downstream closures of one root table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Impact {
    pub root: TableId,
    pub upstream: Closure,
    pub downstream: Closure,
}

impl Impact {
    /// Impact of a table that is not in the graph
    pub fn empty(root: TableId) -> Self {
        Self {
            root,
            upstream: Closure::default(),
            downstream: Closure::default(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.upstream.is_empty() && self.downstream.is_empty()
    }

    /// Classify a table relative to the root
    ///
    /// A table reached in both directions (typically through a join) is
    /// reported as downstream.
    pub fn role(&self, table: &TableId) -> TableRole {
        if *table == self.root {
            TableRole::Root
        } else if self.downstream.tables.contains(table) {
            TableRole::Downstream
        } else if self.upstream.tables.contains(table) {
            TableRole::Upstream
        } else {
            TableRole::Unrelated
        }
    }

    /// Role of every table in the graph
    pub fn classify(&self, graph: &ProvenanceGraph) -> BTreeMap<TableId, TableRole> {
        graph
            .tables()
            .map(|table| (table.clone(), self.role(table)))
            .collect()
    }

    /// Whether a column is in either closure
    pub fn contains_column(&self, column: &ColumnKey) -> bool {
        self.upstream.contains(column) || self.downstream.contains(column)
    }

    /// Tables in either closure, plus the root
    pub fn visible_tables(&self) -> BTreeSet<&TableId> {
        self.upstream
            .tables
            .iter()
            .chain(self.downstream.tables.iter())
            .chain(std::iter::once(&self.root))
            .collect()
    }

    /// Upstream tables other than the root
    pub fn upstream_tables(&self) -> impl Iterator<Item = &TableId> {
        self.upstream.tables.iter().filter(move |t| **t != self.root)
    }

    /// Downstream tables other than the root
    pub fn downstream_tables(&self) -> impl Iterator<Item = &TableId> {
        self.downstream.tables.iter().filter(move |t| **t != self.root)
    }
}

/// Column adjacency built once per graph, for repeated queries
#[derive(Debug, Clone)]
pub struct LineageIndex<'g> {
    graph: &'g ProvenanceGraph,

    /// column -> columns it is derived from (plus join partners)
    predecessors: HashMap<&'g ColumnKey, Vec<&'g ColumnKey>>,

    /// column -> columns derived from it (plus join partners)
    successors: HashMap<&'g ColumnKey, Vec<&'g ColumnKey>>,
}

impl<'g> LineageIndex<'g> {
    pub fn new(graph: &'g ProvenanceGraph) -> Self {
        let mut predecessors: HashMap<&ColumnKey, Vec<&ColumnKey>> = HashMap::new();
        let mut successors: HashMap<&ColumnKey, Vec<&ColumnKey>> = HashMap::new();

        for edge in graph.flow_edges() {
            predecessors.entry(&edge.target).or_default().push(&edge.source);
            successors.entry(&edge.source).or_default().push(&edge.target);
        }

        for edge in graph.join_edges() {
            for (a, b) in [(&edge.left, &edge.right), (&edge.right, &edge.left)] {
                predecessors.entry(a).or_default().push(b);
                successors.entry(a).or_default().push(b);
            }
        }

        Self {
            graph,
            predecessors,
            successors,
        }
    }

    pub fn graph(&self) -> &'g ProvenanceGraph {
        self.graph
    }

    /// Immediate neighbors of a column in one direction
    pub fn neighbors(&self, column: &ColumnKey, direction: Direction) -> &[&'g ColumnKey] {
        let map = match direction {
            Direction::Upstream => &self.predecessors,
            Direction::Downstream => &self.successors,
        };
        map.get(column).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Everything reachable from `seeds` in one direction, seeds included
    pub fn closure<'a>(
        &self,
        seeds: impl IntoIterator<Item = &'a ColumnKey>,
        direction: Direction,
    ) -> Closure {
        let mut closure = Closure::default();
        let mut visited: HashSet<&ColumnKey> = HashSet::new();
        let mut queue: VecDeque<ColumnKey> = seeds.into_iter().cloned().collect();

        // BFS to the fixed point
        while let Some(current) = queue.pop_front() {
            if !closure.insert(&current) {
                continue;
            }

            for next in self.neighbors(&current, direction) {
                if !closure.contains(next) && visited.insert(*next) {
                    queue.push_back((*next).clone());
                }
            }
        }

        closure
    }

    /// Upstream and downstream closures of a table
    pub fn impact(&self, root: &TableId) -> Impact {
        if !self.graph.contains_table(root) {
            tracing::debug!(root = %root, "impact root not in graph");
            return Impact::empty(root.clone());
        }

        let seeds = self.graph.column_keys(root);
        let impact = Impact {
            root: root.clone(),
            upstream: self.closure(&seeds, Direction::Upstream),
            downstream: self.closure(&seeds, Direction::Downstream),
        };

        tracing::debug!(
            root = %root,
            upstream = impact.upstream.columns.len(),
            downstream = impact.downstream.columns.len(),
            "computed impact"
        );

        impact
    }

    /// Impact of a table named as the user wrote it
    pub fn impact_of(&self, name: &str) -> Impact {
        match self.graph.find_table(name) {
            Some(table) => self.impact(table),
            None => Impact::empty(TableId::normalize(name)),
        }
    }

    /// Every column connected to `columns`, in both directions
    pub fn focus(&self, columns: &[ColumnKey]) -> Closure {
        let mut closure = self.closure(columns, Direction::Upstream);
        closure.merge(self.closure(columns, Direction::Downstream));
        closure
    }
}

/// Upstream and downstream closures of `root` in `graph`
pub fn compute_impact(graph: &ProvenanceGraph, root: &TableId) -> Impact {
    LineageIndex::new(graph).impact(root)
}
