//! Alias resolution for one SELECT scope
//!
//! Maps `alias-or-table-name` to the table identity it stands for. A scope is
//! built fresh for every select, CTE body and derived table, so aliases never
//! leak between them.

use colineage_core::TableId;
use crate::walk::ColumnIdent;

/// How a column qualifier was resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The qualifier matched an alias or table name in scope
    Bound(TableId),

    /// Unqualified column attributed to the first table registered in scope
    ///
    /// This is an approximation: with several tables in scope, an unqualified
    /// column may belong to any of them.
    Fallback(TableId),

    /// The qualifier matched nothing; its text is used as the identity
    Unresolved(TableId),

    /// Unqualified column in a scope without tables
    Unbound,
}

impl Resolution {
    pub fn into_table(self) -> Option<TableId> {
        match self {
            Self::Bound(t) | Self::Fallback(t) | Self::Unresolved(t) => Some(t),
            Self::Unbound => None,
        }
    }
}

/// Insertion-ordered alias map for one scope
#[derive(Debug, Clone, Default)]
pub struct AliasScope {
    entries: Vec<(String, TableId)>,
}

impl AliasScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a key to a table
    ///
    /// Rebinding an existing key replaces the table but keeps its position,
    /// so the fallback table is always the first key ever registered.
    pub fn bind(&mut self, key: &str, table: TableId) {
        let key = key.to_lowercase();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = table,
            None => self.entries.push((key, table)),
        }
    }

    /// Look up an alias or bare table name
    pub fn get(&self, key: &str) -> Option<&TableId> {
        let key = key.to_lowercase();
        self.entries
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, table)| table)
    }

    /// Table registered first in this scope
    pub fn first(&self) -> Option<&TableId> {
        self.entries.first().map(|(_, table)| table)
    }

    /// Resolve the table a column reference belongs to
    pub fn resolve(&self, column: &ColumnIdent<'_>) -> Resolution {
        match column.table() {
            Some(alias) => match self.get(alias) {
                Some(table) => Resolution::Bound(table.clone()),
                None => Resolution::Unresolved(TableId::from_parts(
                    column.qualifier.iter().map(|ident| ident.value.as_str()),
                )),
            },
            None => match self.first() {
                Some(table) => Resolution::Fallback(table.clone()),
                None => Resolution::Unbound,
            },
        }
    }
}
