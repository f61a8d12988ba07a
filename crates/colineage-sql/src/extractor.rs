//! Column-level lineage extraction
//!
//! Walks one parsed statement and records into a [`ProvenanceGraph`]:
//! - the tables referenced and the columns observed on them
//! - flow edges from every source column to the output column it feeds
//! - join edges for every equality in a join `ON` condition
//!
//! Resolution is syntactic and best-effort. Unqualified columns are attributed
//! to the first table of their scope, and `SELECT *` is not expanded.

use sqlparser::ast::{
    Join, JoinConstraint, JoinOperator, ObjectName, Query, Select, SelectItem, SetExpr,
    Statement, TableFactor, TableWithJoins, With,
};
use colineage_core::{
    ColumnKey, Diagnostic, DiagnosticCode, Location, ProvenanceGraph, Severity, TableId,
    CALC_FIELD, FINAL_OUTPUT,
};
use std::collections::HashSet;
use std::path::Path;

use crate::parser::SqlParser;
use crate::scope::{AliasScope, Resolution};
use crate::shape::StatementShape;
use crate::walk::{self, ColumnIdent};

/// Where the projections of a scope are written
#[derive(Debug, Clone)]
enum Sink {
    /// One target column per projection, named by alias or source column
    Table,

    /// Every projection feeds this single column (scalar subqueries)
    Column(String),

    /// Tables and joins are recorded, projections are not (filter subqueries)
    Discard,
}

/// Records lineage of parsed statements into a shared graph
pub struct LineageExtractor<'g> {
    graph: &'g mut ProvenanceGraph,

    /// Identity of a bare SELECT result
    result_table: TableId,

    /// File or label the current statement came from
    origin: Option<String>,

    diagnostics: Vec<Diagnostic>,

    /// Unresolved qualifiers already reported for the current origin
    reported: HashSet<TableId>,
}

impl<'g> LineageExtractor<'g> {
    /// Create an extractor writing into `graph`
    pub fn new(graph: &'g mut ProvenanceGraph) -> Self {
        Self {
            graph,
            result_table: TableId::synthetic(FINAL_OUTPUT),
            origin: None,
            diagnostics: Vec::new(),
            reported: HashSet::new(),
        }
    }

    /// Use a different identity for bare SELECT results
    pub fn with_result_table(mut self, name: impl Into<String>) -> Self {
        self.result_table = TableId::synthetic(name);
        self
    }

    /// Attribute subsequent diagnostics to a file
    pub fn set_origin(&mut self, origin: Option<&Path>) {
        self.origin = origin.map(|p| p.display().to_string());
        self.reported.clear();
    }

    /// Take the collected diagnostics, leaving none behind
    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    /// Parse `sql` and extract every statement it contains
    ///
    /// Returns the number of statements extracted, or `None` when the text
    /// does not parse. A parse failure is logged and recorded as a diagnostic;
    /// nothing is added to the graph for that text.
    pub fn extract_sql(
        &mut self,
        parser: &SqlParser,
        sql: &str,
        declared_output: Option<&str>,
        origin: Option<&Path>,
    ) -> Option<usize> {
        self.set_origin(origin);

        let parsed = match parser.parse(sql, origin) {
            Ok(parsed) => parsed,
            Err(error) => {
                tracing::warn!(%error, "skipping unparseable SQL");
                self.diagnostics.push(error.to_diagnostic());
                return None;
            }
        };

        for statement in &parsed.statements {
            self.extract(statement, declared_output);
        }

        Some(parsed.statement_count())
    }

    /// Extract lineage of one statement into the graph
    ///
    /// A declared output name fixes the target table regardless of the
    /// statement's own target, and marks it as a defined table.
    pub fn extract(&mut self, statement: &Statement, declared_output: Option<&str>) {
        let declared = declared_output.map(TableId::normalize);
        if let Some(table) = &declared {
            self.graph.mark_defined(table);
        }

        let shape = StatementShape::of(statement);

        let Some(source) = shape.source() else {
            if let StatementShape::Unsupported { kind } = shape {
                tracing::debug!(kind, "statement carries no lineage");
                self.report(
                    DiagnosticCode::SqlUnsupportedStatement,
                    Severity::Info,
                    format!("{} statement carries no column lineage", kind),
                    declared.as_ref(),
                );
            }
            return;
        };

        let target = match (declared, shape.target()) {
            (Some(table), _) => table,
            (None, Some(name)) => object_table(name),
            (None, None) => self.result_table.clone(),
        };
        self.graph.ensure_table(&target);

        tracing::debug!(target = %target, "extracting statement lineage");

        if let StatementShape::Insert { outer_with: Some(with), .. } = shape {
            self.analyze_ctes(with);
        }

        self.analyze_query(source, &target, &Sink::Table);
    }

    /// Register and analyze each CTE, in declaration order
    fn analyze_ctes(&mut self, with: &With) {
        for cte in &with.cte_tables {
            let name = TableId::from_parts([cte.alias.name.value.as_str()]);
            self.graph.mark_cte(&name);
            self.analyze_query(&cte.query, &name, &Sink::Table);
        }
    }

    fn analyze_query(&mut self, query: &Query, target: &TableId, sink: &Sink) {
        if let Some(with) = &query.with {
            self.analyze_ctes(with);
        }

        // set operations nest to the left, so walk them with a worklist
        let mut pending = vec![query.body.as_ref()];
        while let Some(body) = pending.pop() {
            match body {
                SetExpr::Select(select) => self.analyze_select(select, target, sink),
                SetExpr::Query(inner) => self.analyze_query(inner, target, sink),
                SetExpr::SetOperation { left, right, .. } => {
                    pending.push(right.as_ref());
                    pending.push(left.as_ref());
                }
                _ => {}
            }
        }
    }

    fn analyze_select(&mut self, select: &Select, target: &TableId, sink: &Sink) {
        let mut scope = AliasScope::new();
        let joins = self.bind_relations(&select.from, target, &mut scope);

        for item in &select.projection {
            let (expr, alias) = match item {
                SelectItem::UnnamedExpr(expr) => (expr, None),
                SelectItem::ExprWithAlias { expr, alias } => (expr, Some(alias.value.as_str())),
                _ => {
                    if !matches!(sink, Sink::Discard) {
                        self.report(
                            DiagnosticCode::LineageWildcardSkipped,
                            Severity::Info,
                            format!("`{}` is not expanded; its columns have no lineage", item),
                            Some(target),
                        );
                    }
                    continue;
                }
            };

            let refs = walk::collect_refs(expr);

            let column = match sink {
                Sink::Table => Some(output_column(expr, alias)),
                Sink::Column(name) => Some(name.clone()),
                Sink::Discard => None,
            };

            let Some(column) = column else {
                for subquery in refs.subqueries {
                    self.analyze_query(subquery, target, &Sink::Discard);
                }
                continue;
            };

            let target_key = ColumnKey::new(target.clone(), column.clone());
            self.graph.add_column(&target_key);

            for reference in &refs.columns {
                if let Some(table) = self.resolve(&scope, reference) {
                    self.graph
                        .add_flow(ColumnKey::new(table, reference.name), target_key.clone());
                }
            }

            let scalar = Sink::Column(column);
            for subquery in refs.subqueries {
                self.analyze_query(subquery, target, &scalar);
            }
        }

        for join in joins {
            self.extract_join_keys(join, &scope);
        }

        for filter in select.selection.iter().chain(select.having.iter()) {
            for subquery in walk::subqueries(filter) {
                self.analyze_query(subquery, target, &Sink::Discard);
            }
        }

        tracing::trace!(target = %target, "analyzed select scope");
    }

    /// Bind every relation of a FROM clause into `scope`
    ///
    /// Relations are bound in textual order, nested joins included, so the
    /// first table written is the fallback for unqualified columns. Returns
    /// the join clauses found. Derived tables are analyzed as their own
    /// scopes, targeting their alias or a generated `subquery_<n>` name.
    fn bind_relations<'q>(
        &mut self,
        from: &'q [TableWithJoins],
        target: &TableId,
        scope: &mut AliasScope,
    ) -> Vec<&'q Join> {
        let mut joins: Vec<&Join> = from.iter().flat_map(|item| item.joins.iter()).collect();
        let mut pending: Vec<&TableFactor> = from
            .iter()
            .rev()
            .flat_map(|item| relations(item).rev())
            .collect();

        while let Some(relation) = pending.pop() {
            match relation {
                TableFactor::Table { name, alias, .. } => {
                    let table = object_table(name);
                    let key = match alias {
                        Some(alias) => alias.name.value.as_str(),
                        None => name.0.last().map(|i| i.value.as_str()).unwrap_or_default(),
                    };
                    self.graph.ensure_table(&table);
                    scope.bind(key, table);
                }
                TableFactor::Derived { subquery, alias, .. } => {
                    let (key, table) = match alias {
                        Some(alias) => (
                            alias.name.value.clone(),
                            TableId::from_parts([alias.name.value.as_str()]),
                        ),
                        None => {
                            let table = self.anonymous_subquery();
                            self.report(
                                DiagnosticCode::LineageUnaliasedSubquery,
                                Severity::Info,
                                format!("derived table without alias; tracked as `{}`", table),
                                Some(target),
                            );
                            (table.as_str().to_string(), table)
                        }
                    };
                    self.graph.mark_cte(&table);
                    self.analyze_query(subquery, &table, &Sink::Table);
                    scope.bind(&key, table);
                }
                TableFactor::NestedJoin { table_with_joins, .. } => {
                    pending.extend(relations(table_with_joins).rev());
                    joins.extend(table_with_joins.joins.iter());
                }
                _ => {}
            }
        }

        joins
    }

    /// First `subquery_<n>` name not yet in the graph
    fn anonymous_subquery(&self) -> TableId {
        (1..)
            .map(|n| TableId::normalize(&format!("subquery_{}", n)))
            .find(|table| !self.graph.contains_table(table))
            .unwrap_or_else(|| TableId::normalize("subquery"))
    }

    /// Record one join edge per column equality in the join condition
    fn extract_join_keys(&mut self, join: &Join, scope: &AliasScope) {
        let Some(JoinConstraint::On(condition)) = join_constraint(&join.join_operator) else {
            return;
        };

        for (left, right) in walk::equalities(condition) {
            let (Some(left), Some(right)) =
                (ColumnIdent::from_expr(left), ColumnIdent::from_expr(right))
            else {
                continue;
            };

            let (Some(left_table), Some(right_table)) =
                (self.resolve(scope, &left), self.resolve(scope, &right))
            else {
                continue;
            };

            self.graph.add_join(
                ColumnKey::new(left_table, left.name),
                ColumnKey::new(right_table, right.name),
            );
        }
    }

    /// Resolve a column's table, reporting qualifiers that match nothing
    fn resolve(&mut self, scope: &AliasScope, column: &ColumnIdent<'_>) -> Option<TableId> {
        let resolution = scope.resolve(column);

        if let Resolution::Unresolved(table) = &resolution {
            if self.reported.insert(table.clone()) {
                tracing::debug!(qualifier = %table, column = column.name, "unresolved qualifier");
                self.report(
                    DiagnosticCode::LineageUnresolvedReference,
                    Severity::Info,
                    format!(
                        "qualifier `{}` matches no table in scope; treating it as a table",
                        table
                    ),
                    Some(table),
                );
            }
        }

        resolution.into_table()
    }

    fn report(
        &mut self,
        code: DiagnosticCode,
        severity: Severity,
        message: impl Into<String>,
        table: Option<&TableId>,
    ) {
        let mut diagnostic = Diagnostic::new(code, severity, message);

        if let Some(origin) = &self.origin {
            diagnostic = diagnostic.with_location(Location::new(origin.clone()));
        }
        if let Some(table) = table {
            diagnostic = diagnostic.with_table(table.as_str());
        }

        self.diagnostics.push(diagnostic);
    }
}

/// Normalized identity of an object name
pub fn object_table(name: &ObjectName) -> TableId {
    TableId::from_parts(name.0.iter().map(|ident| ident.value.as_str()))
}

/// The relation of a FROM item followed by its joined relations
fn relations(item: &TableWithJoins) -> impl DoubleEndedIterator<Item = &TableFactor> {
    std::iter::once(&item.relation).chain(item.joins.iter().map(|join| &join.relation))
}

/// Output column name: alias, else bare column name, else `calc_field`
fn output_column(expr: &sqlparser::ast::Expr, alias: Option<&str>) -> String {
    match (alias, ColumnIdent::from_expr(expr)) {
        (Some(alias), _) => alias.to_string(),
        (None, Some(column)) => column.name.to_string(),
        (None, None) => CALC_FIELD.to_string(),
    }
}

/// The constraint of a join, whatever its kind
fn join_constraint(operator: &JoinOperator) -> Option<&JoinConstraint> {
    match operator {
        JoinOperator::Inner(constraint)
        | JoinOperator::LeftOuter(constraint)
        | JoinOperator::RightOuter(constraint)
        | JoinOperator::FullOuter(constraint)
        | JoinOperator::LeftSemi(constraint)
        | JoinOperator::RightSemi(constraint)
        | JoinOperator::LeftAnti(constraint)
        | JoinOperator::RightAnti(constraint) => Some(constraint),
        JoinOperator::AsOf { constraint, .. } => Some(constraint),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn extract_into(graph: &mut ProvenanceGraph, sql: &str, declared: Option<&str>) -> Vec<Diagnostic> {
        let parsed = SqlParser::new().parse(sql, None).unwrap();
        let mut extractor = LineageExtractor::new(graph);
        for statement in &parsed.statements {
            extractor.extract(statement, declared);
        }
        extractor.take_diagnostics()
    }

    fn flows(graph: &ProvenanceGraph) -> Vec<String> {
        graph
            .flow_edges()
            .iter()
            .map(|e| format!("{} -> {}", e.source, e.target))
            .collect()
    }

    fn joins(graph: &ProvenanceGraph) -> Vec<String> {
        graph
            .join_edges()
            .iter()
            .map(|e| format!("{} = {}", e.left, e.right))
            .collect()
    }

    fn table_names(graph: &ProvenanceGraph) -> Vec<&str> {
        graph.tables().map(TableId::as_str).collect()
    }

    #[test]
    fn aliased_column_flows_to_alias() {
        let mut graph = ProvenanceGraph::new();
        extract_into(&mut graph, "SELECT a.x AS y FROM t1 a", None);

        assert_eq!(flows(&graph), vec!["t1.x -> FINAL_OUTPUT.y"]);
    }

    #[test]
    fn join_equality_yields_one_edge() {
        let mut graph = ProvenanceGraph::new();
        extract_into(
            &mut graph,
            "SELECT a.v FROM t1 a JOIN t2 b ON a.id = b.id AND b.active > 0",
            None,
        );

        assert_eq!(joins(&graph), vec!["t1.id = t2.id"]);
    }

    #[test]
    fn join_equalities_nested_under_or() {
        let mut graph = ProvenanceGraph::new();
        extract_into(
            &mut graph,
            "SELECT a.v FROM t1 a LEFT JOIN t2 b ON (a.id = b.id OR a.alt = b.alt) AND b.k = 1",
            None,
        );

        // the literal comparison has a non-column side and is skipped
        assert_eq!(joins(&graph), vec!["t1.id = t2.id", "t1.alt = t2.alt"]);
    }

    #[test]
    fn cte_lineage_propagates() {
        let mut graph = ProvenanceGraph::new();
        extract_into(&mut graph, "WITH c AS (SELECT x FROM t1) SELECT c.x FROM c", None);

        assert_eq!(flows(&graph), vec!["t1.x -> c.x", "c.x -> FINAL_OUTPUT.x"]);
        assert!(graph.is_cte(&TableId::normalize("c")));
    }

    #[test]
    fn nested_ctes_are_processed() {
        let mut graph = ProvenanceGraph::new();
        extract_into(
            &mut graph,
            "WITH outer_c AS (WITH inner_c AS (SELECT k FROM src) SELECT k FROM inner_c) \
             SELECT k FROM outer_c",
            None,
        );

        assert_eq!(
            flows(&graph),
            vec![
                "src.k -> inner_c.k",
                "inner_c.k -> outer_c.k",
                "outer_c.k -> FINAL_OUTPUT.k",
            ]
        );
    }

    #[test]
    fn declared_output_overrides_target() {
        let mut graph = ProvenanceGraph::new();
        extract_into(&mut graph, "SELECT 1 AS n", Some("t_a"));
        extract_into(&mut graph, "SELECT 1 AS n", Some("t_b"));

        assert_eq!(table_names(&graph), vec!["t_a", "t_b"]);
        assert!(graph.is_defined(&TableId::normalize("t_a")));
        assert!(graph.flow_edges().is_empty());
    }

    #[test]
    fn declared_output_replaces_insert_target() {
        let mut graph = ProvenanceGraph::new();
        extract_into(&mut graph, "INSERT INTO staging.x SELECT id FROM src", Some("Final_X"));

        assert_eq!(flows(&graph), vec!["src.id -> final_x.id"]);
        assert!(!graph.contains_table(&TableId::normalize("staging.x")));
    }

    #[test]
    fn insert_select_end_to_end() {
        let mut graph = ProvenanceGraph::new();
        extract_into(
            &mut graph,
            "INSERT INTO sales_summary SELECT o.id AS order_id, c.name AS customer \
             FROM orders o JOIN customers c ON o.cust_id = c.id",
            None,
        );

        assert_eq!(table_names(&graph), vec!["customers", "orders", "sales_summary"]);
        assert_eq!(
            flows(&graph),
            vec![
                "orders.id -> sales_summary.order_id",
                "customers.name -> sales_summary.customer",
            ]
        );
        assert_eq!(joins(&graph), vec!["orders.cust_id = customers.id"]);
    }

    #[test]
    fn create_table_as_select_targets_table() {
        let mut graph = ProvenanceGraph::new();
        extract_into(&mut graph, "CREATE TABLE Mart.Daily AS SELECT d.day FROM raw.days d", None);

        assert_eq!(flows(&graph), vec!["raw.days.day -> mart.daily.day"]);
    }

    #[test]
    fn create_view_targets_view() {
        let mut graph = ProvenanceGraph::new();
        extract_into(&mut graph, "CREATE VIEW v_users AS SELECT u.id FROM users u", None);

        assert_eq!(flows(&graph), vec!["users.id -> v_users.id"]);
    }

    #[test]
    fn with_before_insert() {
        let mut graph = ProvenanceGraph::new();
        extract_into(
            &mut graph,
            "WITH recent AS (SELECT id FROM events) INSERT INTO archive SELECT r.id FROM recent r",
            None,
        );

        assert_eq!(flows(&graph), vec!["events.id -> recent.id", "recent.id -> archive.id"]);
    }

    #[test]
    fn computed_projection_has_every_input() {
        let mut graph = ProvenanceGraph::new();
        extract_into(&mut graph, "SELECT o.qty * o.price FROM orders o", None);

        assert_eq!(
            flows(&graph),
            vec![
                "orders.qty -> FINAL_OUTPUT.calc_field",
                "orders.price -> FINAL_OUTPUT.calc_field",
            ]
        );
    }

    #[test]
    fn literal_projection_has_no_flow() {
        let mut graph = ProvenanceGraph::new();
        extract_into(&mut graph, "SELECT 'x' AS label FROM t", None);

        assert!(graph.flow_edges().is_empty());
        assert!(graph.has_column(&ColumnKey::new(TableId::synthetic(FINAL_OUTPUT), "label")));
    }

    #[test]
    fn unqualified_column_uses_first_table() {
        let mut graph = ProvenanceGraph::new();
        // `name` really lives on customers; the first-table heuristic attributes it to orders
        extract_into(
            &mut graph,
            "SELECT name FROM orders o JOIN customers c ON o.cust_id = c.id",
            None,
        );

        assert_eq!(flows(&graph), vec!["orders.name -> FINAL_OUTPUT.name"]);
    }

    #[test]
    fn unqualified_without_tables_is_dropped() {
        let mut graph = ProvenanceGraph::new();
        extract_into(&mut graph, "SELECT x AS y", None);

        assert!(graph.flow_edges().is_empty());
        assert_eq!(table_names(&graph), vec!["FINAL_OUTPUT"]);
    }

    #[test]
    fn unresolved_qualifier_becomes_table() {
        let mut graph = ProvenanceGraph::new();
        let diagnostics = extract_into(&mut graph, "SELECT ghost.x FROM t", None);

        assert_eq!(flows(&graph), vec!["ghost.x -> FINAL_OUTPUT.x"]);
        assert!(diagnostics
            .iter()
            .any(|d| d.code == DiagnosticCode::LineageUnresolvedReference));
    }

    #[test]
    fn wildcard_is_not_expanded() {
        let mut graph = ProvenanceGraph::new();
        let diagnostics = extract_into(&mut graph, "SELECT * FROM t", None);

        assert!(graph.flow_edges().is_empty());
        assert!(graph.contains_table(&TableId::normalize("t")));
        assert!(diagnostics.iter().any(|d| d.code == DiagnosticCode::LineageWildcardSkipped));
    }

    #[test]
    fn union_branches_feed_target() {
        let mut graph = ProvenanceGraph::new();
        extract_into(
            &mut graph,
            "INSERT INTO all_ids SELECT a.id FROM a UNION ALL SELECT b.id FROM b",
            None,
        );

        assert_eq!(flows(&graph), vec!["a.id -> all_ids.id", "b.id -> all_ids.id"]);
    }

    #[test]
    fn derived_table_is_its_own_scope() {
        let mut graph = ProvenanceGraph::new();
        extract_into(
            &mut graph,
            "SELECT s.total FROM (SELECT SUM(o.amount) AS total FROM orders o) s",
            None,
        );

        assert_eq!(
            flows(&graph),
            vec!["orders.amount -> s.total", "s.total -> FINAL_OUTPUT.total"]
        );
        assert!(graph.is_cte(&TableId::normalize("s")));
    }

    #[test]
    fn unaliased_derived_table_gets_generated_name() {
        let mut graph = ProvenanceGraph::new();
        let parsed = SqlParser::snowflake()
            .parse(
                "SELECT x AS y FROM (SELECT a.x FROM a), (SELECT b.k FROM b)",
                None,
            )
            .unwrap();
        let mut extractor = LineageExtractor::new(&mut graph);
        extractor.extract(&parsed.statements[0], None);
        let diagnostics = extractor.take_diagnostics();

        assert_eq!(
            flows(&graph),
            vec![
                "a.x -> subquery_1.x",
                "b.k -> subquery_2.k",
                "subquery_1.x -> FINAL_OUTPUT.y",
            ]
        );
        assert!(graph.is_cte(&TableId::normalize("subquery_1")));
        assert_eq!(
            diagnostics
                .iter()
                .filter(|d| d.code == DiagnosticCode::LineageUnaliasedSubquery)
                .count(),
            2
        );
    }

    #[test]
    fn nested_join_keeps_first_written_table() {
        let mut graph = ProvenanceGraph::new();
        extract_into(
            &mut graph,
            "SELECT v FROM (x JOIN y ON x.id = y.id) JOIN z ON z.id = x.id",
            None,
        );

        assert_eq!(flows(&graph), vec!["x.v -> FINAL_OUTPUT.v"]);
        assert_eq!(joins(&graph), vec!["z.id = x.id", "x.id = y.id"]);
    }

    #[test]
    fn scalar_subquery_feeds_projection() {
        let mut graph = ProvenanceGraph::new();
        extract_into(
            &mut graph,
            "SELECT u.id, (SELECT MAX(e.ts) FROM events e) AS last_seen FROM users u",
            None,
        );

        assert_eq!(
            flows(&graph),
            vec!["users.id -> FINAL_OUTPUT.id", "events.ts -> FINAL_OUTPUT.last_seen"]
        );
    }

    #[test]
    fn filter_subquery_registers_tables_only() {
        let mut graph = ProvenanceGraph::new();
        extract_into(
            &mut graph,
            "SELECT u.id FROM users u WHERE u.id IN (SELECT b.user_id FROM banned b)",
            None,
        );

        assert_eq!(flows(&graph), vec!["users.id -> FINAL_OUTPUT.id"]);
        assert!(graph.contains_table(&TableId::normalize("banned")));
    }

    #[test]
    fn aliases_do_not_leak_between_scopes() {
        let mut graph = ProvenanceGraph::new();
        extract_into(
            &mut graph,
            "WITH c AS (SELECT a.x FROM t1 a) SELECT a.x FROM t2 a JOIN c ON a.x = c.x",
            None,
        );

        assert_eq!(flows(&graph), vec!["t1.x -> c.x", "t2.x -> FINAL_OUTPUT.x"]);
        assert_eq!(joins(&graph), vec!["t2.x = c.x"]);
    }

    #[test]
    fn unsupported_statement_is_reported() {
        let mut graph = ProvenanceGraph::new();
        let diagnostics = extract_into(&mut graph, "DELETE FROM t WHERE id = 1", None);

        assert!(graph.is_empty());
        assert_eq!(diagnostics[0].code, DiagnosticCode::SqlUnsupportedStatement);
    }

    #[test]
    fn custom_result_table() {
        let mut graph = ProvenanceGraph::new();
        let parsed = SqlParser::new().parse("SELECT t.a FROM t", None).unwrap();
        let mut extractor = LineageExtractor::new(&mut graph).with_result_table("RESULT_GRID");
        extractor.extract(&parsed.statements[0], None);

        assert_eq!(flows(&graph), vec!["t.a -> RESULT_GRID.a"]);
    }

    #[test]
    fn unparseable_text_is_a_noop() {
        let mut graph = ProvenanceGraph::new();
        let parser = SqlParser::new();
        let mut extractor = LineageExtractor::new(&mut graph);

        let extracted =
            extractor.extract_sql(&parser, "SELEC * FRM", Some("broken"), Some(Path::new("broken.sql")));
        let diagnostics = extractor.take_diagnostics();

        assert_eq!(extracted, None);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, DiagnosticCode::SqlParseError);
        assert_eq!(diagnostics[0].severity, Severity::Error);
        assert!(graph.is_empty());
    }

    #[test]
    fn declared_name_applies_to_every_statement() {
        let mut graph = ProvenanceGraph::new();
        let parser = SqlParser::new();
        let mut extractor = LineageExtractor::new(&mut graph);

        let extracted = extractor.extract_sql(
            &parser,
            "SELECT a.x FROM a; SELECT b.y FROM b;",
            Some("model"),
            None,
        );

        assert_eq!(extracted, Some(2));
        assert_eq!(flows(&graph), vec!["a.x -> model.x", "b.y -> model.y"]);
    }

    #[test]
    fn graph_accumulates_across_statements() {
        let mut graph = ProvenanceGraph::new();
        extract_into(&mut graph, "INSERT INTO mid SELECT s.a FROM src s", None);
        extract_into(&mut graph, "INSERT INTO mart SELECT m.a FROM mid m", None);

        assert_eq!(flows(&graph), vec!["src.a -> mid.a", "mid.a -> mart.a"]);
        assert_eq!(graph.stats().tables, 3);
    }
}
