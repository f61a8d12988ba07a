//! Statement shapes that carry lineage
//!
//! This is the only place that matches on `sqlparser` statement variants.
//! Everything downstream works with [`StatementShape`].

use sqlparser::ast::{ObjectName, Query, SetExpr, Statement, With};

/// The lineage-relevant shape of a parsed statement
#[derive(Debug, Clone, Copy)]
pub enum StatementShape<'a> {
    /// A bare query; its result has no persisted name
    Select { query: &'a Query },

    /// `INSERT INTO target <query>`
    Insert {
        target: &'a ObjectName,
        source: &'a Query,
        /// CTEs written before the INSERT keyword (`WITH c AS (...) INSERT ...`)
        outer_with: Option<&'a With>,
    },

    /// `CREATE TABLE target AS <query>` or `CREATE VIEW target AS <query>`
    CreateAs {
        target: &'a ObjectName,
        source: &'a Query,
    },

    /// Anything without a query feeding a table
    Unsupported { kind: &'static str },
}

impl<'a> StatementShape<'a> {
    /// Classify a statement
    pub fn of(statement: &'a Statement) -> Self {
        match statement {
            Statement::Query(query) => match query.body.as_ref() {
                SetExpr::Insert(inner) => match Self::of(inner) {
                    Self::Insert { target, source, .. } => Self::Insert {
                        target,
                        source,
                        outer_with: query.with.as_ref(),
                    },
                    other => other,
                },
                _ => Self::Select { query },
            },
            Statement::Insert(insert) => match &insert.source {
                Some(source) => Self::Insert {
                    target: &insert.table_name,
                    source,
                    outer_with: None,
                },
                None => Self::Unsupported { kind: "INSERT without query" },
            },
            Statement::CreateTable(create) => match &create.query {
                Some(source) => Self::CreateAs {
                    target: &create.name,
                    source,
                },
                None => Self::Unsupported { kind: "CREATE TABLE" },
            },
            Statement::CreateView { name, query, .. } => Self::CreateAs {
                target: name,
                source: query,
            },
            Statement::Update { .. } => Self::Unsupported { kind: "UPDATE" },
            Statement::Delete(_) => Self::Unsupported { kind: "DELETE" },
            Statement::Merge { .. } => Self::Unsupported { kind: "MERGE" },
            _ => Self::Unsupported { kind: "statement" },
        }
    }

    /// The query whose projections feed the target, if any
    pub fn source(&self) -> Option<&'a Query> {
        match self {
            Self::Select { query } => Some(query),
            Self::Insert { source, .. } | Self::CreateAs { source, .. } => Some(source),
            Self::Unsupported { .. } => None,
        }
    }

    /// The named target table, if the statement has one
    pub fn target(&self) -> Option<&'a ObjectName> {
        match self {
            Self::Insert { target, .. } | Self::CreateAs { target, .. } => Some(target),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::SqlParser;

    fn shape_of(sql: &str) -> String {
        let parsed = SqlParser::new().parse(sql, None).unwrap();
        let statement = parsed.first_statement().unwrap();
        match StatementShape::of(statement) {
            StatementShape::Select { .. } => "select".to_string(),
            StatementShape::Insert { target, outer_with, .. } => {
                format!("insert {} {}", target, outer_with.is_some())
            }
            StatementShape::CreateAs { target, .. } => format!("create {}", target),
            StatementShape::Unsupported { kind } => format!("unsupported {}", kind),
        }
    }

    #[test]
    fn classifies_queries() {
        assert_eq!(shape_of("SELECT 1"), "select");
        assert_eq!(shape_of("WITH c AS (SELECT 1 AS x) SELECT x FROM c"), "select");
    }

    #[test]
    fn classifies_insert() {
        assert_eq!(shape_of("INSERT INTO s.t SELECT a FROM b"), "insert s.t false");
    }

    #[test]
    fn classifies_create_as() {
        assert_eq!(shape_of("CREATE TABLE t AS SELECT a FROM b"), "create t");
        assert_eq!(shape_of("CREATE VIEW v AS SELECT a FROM b"), "create v");
    }

    #[test]
    fn plain_ddl_is_unsupported() {
        assert_eq!(shape_of("CREATE TABLE t (a INT)"), "unsupported CREATE TABLE");
        assert_eq!(shape_of("DELETE FROM t WHERE a = 1"), "unsupported DELETE");
    }

    #[test]
    fn source_and_target_accessors() {
        let parsed = SqlParser::new().parse("INSERT INTO t SELECT a FROM b", None).unwrap();
        let shape = StatementShape::of(parsed.first_statement().unwrap());

        assert!(shape.source().is_some());
        assert_eq!(shape.target().map(|t| t.to_string()), Some("t".to_string()));
    }
}
