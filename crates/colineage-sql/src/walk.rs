//! Worklist traversal over expression trees
//!
//! Generated SQL can nest expressions deeply, so these walkers keep an
//! explicit stack instead of recursing. Subqueries are not entered: they are
//! separate scopes and are handed back to the caller.

use sqlparser::ast::{
    BinaryOperator, Expr, Function, FunctionArg, FunctionArgExpr, FunctionArgumentClause,
    FunctionArguments, Ident, JsonPathElem, Query, Subscript, WindowType,
};

/// A column reference as written: optional qualifier parts plus the name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnIdent<'a> {
    /// Everything before the column name (`schema.table` in `schema.table.col`)
    pub qualifier: &'a [Ident],
    pub name: &'a str,
}

impl<'a> ColumnIdent<'a> {
    /// Interpret an expression as a plain column reference
    pub fn from_expr(expr: &'a Expr) -> Option<Self> {
        match expr {
            Expr::Identifier(ident) => Some(Self {
                qualifier: &[],
                name: &ident.value,
            }),
            Expr::CompoundIdentifier(idents) => {
                let (last, qualifier) = idents.split_last()?;
                Some(Self {
                    qualifier,
                    name: &last.value,
                })
            }
            _ => None,
        }
    }

    /// The table part of the qualifier (the identifier right before the name)
    pub fn table(&self) -> Option<&'a str> {
        self.qualifier.last().map(|ident| ident.value.as_str())
    }
}

/// References found in one expression tree
#[derive(Debug, Default)]
pub struct ExprRefs<'a> {
    /// Column references in left-to-right order
    pub columns: Vec<ColumnIdent<'a>>,

    /// Subqueries reached from the expression
    pub subqueries: Vec<&'a Query>,
}

enum Node<'a> {
    Expr(&'a Expr),
    Query(&'a Query),
}

/// Collect every column reference and subquery under `root`
pub fn collect_refs(root: &Expr) -> ExprRefs<'_> {
    let mut refs = ExprRefs::default();
    let mut stack = vec![Node::Expr(root)];
    let mut children = Vec::new();

    while let Some(node) = stack.pop() {
        let expr = match node {
            Node::Expr(expr) => expr,
            Node::Query(query) => {
                refs.subqueries.push(query);
                continue;
            }
        };

        if let Some(column) = ColumnIdent::from_expr(expr) {
            refs.columns.push(column);
            continue;
        }

        push_children(expr, &mut children);

        // reversed so the stack pops them left to right
        stack.extend(children.drain(..).rev());
    }

    refs
}

/// Collect every subquery under `root`
pub fn subqueries(root: &Expr) -> Vec<&Query> {
    collect_refs(root).subqueries
}

/// Find every `=` comparison under `root`, at any depth
pub fn equalities(root: &Expr) -> Vec<(&Expr, &Expr)> {
    let mut found = Vec::new();
    let mut stack = vec![root];
    let mut children = Vec::new();

    while let Some(expr) = stack.pop() {
        if let Expr::BinaryOp { left, op: BinaryOperator::Eq, right } = expr {
            found.push((left.as_ref(), right.as_ref()));
        }

        push_children(expr, &mut children);

        for child in children.drain(..).rev() {
            if let Node::Expr(e) = child {
                stack.push(e);
            }
        }
    }

    found
}

fn push_children<'a>(expr: &'a Expr, out: &mut Vec<Node<'a>>) {
    match expr {
        Expr::BinaryOp { left, right, .. }
        | Expr::IsDistinctFrom(left, right)
        | Expr::IsNotDistinctFrom(left, right)
        | Expr::AnyOp { left, right, .. }
        | Expr::AllOp { left, right, .. } => {
            out.push(Node::Expr(left));
            out.push(Node::Expr(right));
        }
        Expr::UnaryOp { expr, .. }
        | Expr::Nested(expr)
        | Expr::Cast { expr, .. }
        | Expr::Collate { expr, .. }
        | Expr::Extract { expr, .. }
        | Expr::Ceil { expr, .. }
        | Expr::Floor { expr, .. }
        | Expr::IsNull(expr)
        | Expr::IsNotNull(expr)
        | Expr::IsTrue(expr)
        | Expr::IsNotTrue(expr)
        | Expr::IsFalse(expr)
        | Expr::IsNotFalse(expr)
        | Expr::IsUnknown(expr)
        | Expr::IsNotUnknown(expr) => out.push(Node::Expr(expr)),
        Expr::Like { expr, pattern, .. }
        | Expr::ILike { expr, pattern, .. }
        | Expr::SimilarTo { expr, pattern, .. }
        | Expr::RLike { expr, pattern, .. } => {
            out.push(Node::Expr(expr));
            out.push(Node::Expr(pattern));
        }
        Expr::Between { expr, low, high, .. } => {
            out.push(Node::Expr(expr));
            out.push(Node::Expr(low));
            out.push(Node::Expr(high));
        }
        Expr::InList { expr, list, .. } => {
            out.push(Node::Expr(expr));
            out.extend(list.iter().map(Node::Expr));
        }
        Expr::InSubquery { expr, subquery, .. } => {
            out.push(Node::Expr(expr));
            out.push(Node::Query(subquery));
        }
        Expr::Exists { subquery, .. } | Expr::Subquery(subquery) => {
            out.push(Node::Query(subquery));
        }
        Expr::AtTimeZone { timestamp, time_zone } => {
            out.push(Node::Expr(timestamp));
            out.push(Node::Expr(time_zone));
        }
        Expr::Position { expr, r#in } => {
            out.push(Node::Expr(expr));
            out.push(Node::Expr(r#in));
        }
        Expr::Substring { expr, substring_from, substring_for, .. } => {
            out.push(Node::Expr(expr));
            out.extend(substring_from.iter().map(|e| Node::Expr(e.as_ref())));
            out.extend(substring_for.iter().map(|e| Node::Expr(e.as_ref())));
        }
        Expr::Trim { expr, trim_what, .. } => {
            out.extend(trim_what.iter().map(|e| Node::Expr(e.as_ref())));
            out.push(Node::Expr(expr));
        }
        Expr::Case { operand, conditions, results, else_result } => {
            out.extend(operand.iter().map(|e| Node::Expr(e.as_ref())));
            for (condition, result) in conditions.iter().zip(results) {
                out.push(Node::Expr(condition));
                out.push(Node::Expr(result));
            }
            out.extend(else_result.iter().map(|e| Node::Expr(e.as_ref())));
        }
        Expr::Tuple(items) => out.extend(items.iter().map(Node::Expr)),
        Expr::GroupingSets(sets) | Expr::Cube(sets) | Expr::Rollup(sets) => {
            out.extend(sets.iter().flatten().map(Node::Expr));
        }
        Expr::Interval(interval) => out.push(Node::Expr(&interval.value)),
        Expr::Named { expr, .. } | Expr::OuterJoin(expr) | Expr::Prior(expr) => {
            out.push(Node::Expr(expr));
        }
        Expr::CompositeAccess { expr, .. } => out.push(Node::Expr(expr)),
        Expr::JsonAccess { value, path } => {
            out.push(Node::Expr(value));
            for elem in &path.path {
                if let JsonPathElem::Bracket { key } = elem {
                    out.push(Node::Expr(key));
                }
            }
        }
        Expr::MapAccess { column, keys } => {
            out.push(Node::Expr(column));
            out.extend(keys.iter().map(|k| Node::Expr(&k.key)));
        }
        Expr::Subscript { expr, subscript } => {
            out.push(Node::Expr(expr));
            match subscript.as_ref() {
                Subscript::Index { index } => out.push(Node::Expr(index)),
                Subscript::Slice { lower_bound, upper_bound, stride } => {
                    out.extend(
                        [lower_bound, upper_bound, stride]
                            .into_iter()
                            .flatten()
                            .map(Node::Expr),
                    );
                }
            }
        }
        Expr::InUnnest { expr, array_expr, .. } => {
            out.push(Node::Expr(expr));
            out.push(Node::Expr(array_expr));
        }
        Expr::Convert { expr, styles, .. } => {
            out.push(Node::Expr(expr));
            out.extend(styles.iter().map(Node::Expr));
        }
        Expr::Overlay { expr, overlay_what, overlay_from, overlay_for } => {
            out.push(Node::Expr(expr));
            out.push(Node::Expr(overlay_what));
            out.push(Node::Expr(overlay_from));
            out.extend(overlay_for.iter().map(|e| Node::Expr(e.as_ref())));
        }
        Expr::Array(array) => out.extend(array.elem.iter().map(Node::Expr)),
        Expr::Struct { values, .. } => out.extend(values.iter().map(Node::Expr)),
        Expr::Dictionary(fields) => {
            out.extend(fields.iter().map(|field| Node::Expr(field.value.as_ref())));
        }
        Expr::Map(map) => {
            for entry in &map.entries {
                out.push(Node::Expr(&entry.key));
                out.push(Node::Expr(&entry.value));
            }
        }
        Expr::Function(function) => push_function(function, out),
        Expr::Method(method) => {
            out.push(Node::Expr(&method.expr));
            for function in &method.method_chain {
                push_function(function, out);
            }
        }
        // literals, wildcards, lambdas and constructs without column inputs
        _ => {}
    }
}

/// Arguments, `FILTER`, `WITHIN GROUP` and window clauses of a call
fn push_function<'a>(function: &'a Function, out: &mut Vec<Node<'a>>) {
    for arguments in [&function.parameters, &function.args] {
        match arguments {
            FunctionArguments::List(list) => {
                for arg in &list.args {
                    let (FunctionArg::Named { arg, .. }
                    | FunctionArg::ExprNamed { arg, .. }
                    | FunctionArg::Unnamed(arg)) = arg;
                    if let FunctionArgExpr::Expr(e) = arg {
                        out.push(Node::Expr(e));
                    }
                }
                for clause in &list.clauses {
                    match clause {
                        FunctionArgumentClause::OrderBy(order_by) => {
                            out.extend(order_by.iter().map(|o| Node::Expr(&o.expr)));
                        }
                        FunctionArgumentClause::Limit(limit) => out.push(Node::Expr(limit)),
                        _ => {}
                    }
                }
            }
            FunctionArguments::Subquery(query) => out.push(Node::Query(query)),
            FunctionArguments::None => {}
        }
    }

    out.extend(function.filter.iter().map(|e| Node::Expr(e.as_ref())));
    out.extend(function.within_group.iter().map(|o| Node::Expr(&o.expr)));

    if let Some(WindowType::WindowSpec(window)) = &function.over {
        out.extend(window.partition_by.iter().map(Node::Expr));
        out.extend(window.order_by.iter().map(|o| Node::Expr(&o.expr)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::SqlParser;
    use sqlparser::ast::{SelectItem, SetExpr, Statement};

    /// First projection expression of a `SELECT`
    fn projection(sql: &str) -> Expr {
        projection_in(&SqlParser::new(), sql)
    }

    fn projection_in(parser: &SqlParser, sql: &str) -> Expr {
        let parsed = parser.parse(sql, None).unwrap();
        let Some(Statement::Query(query)) = parsed.first_statement() else {
            panic!("not a query");
        };
        let SetExpr::Select(select) = query.body.as_ref() else {
            panic!("not a select");
        };
        match &select.projection[0] {
            SelectItem::UnnamedExpr(e) | SelectItem::ExprWithAlias { expr: e, .. } => e.clone(),
            _ => panic!("wildcard"),
        }
    }

    fn names(refs: &ExprRefs<'_>) -> Vec<String> {
        refs.columns
            .iter()
            .map(|c| match c.table() {
                Some(t) => format!("{}.{}", t, c.name),
                None => c.name.to_string(),
            })
            .collect()
    }

    #[test]
    fn simple_and_qualified_columns() {
        let expr = projection("SELECT a.x + y FROM t a");
        let refs = collect_refs(&expr);
        assert_eq!(names(&refs), vec!["a.x", "y"]);
    }

    #[test]
    fn columns_inside_functions_and_case() {
        let expr = projection(
            "SELECT CASE WHEN o.status = 'x' THEN COALESCE(o.amount, c.credit) ELSE 0 END FROM o",
        );
        let refs = collect_refs(&expr);
        assert_eq!(names(&refs), vec!["o.status", "o.amount", "c.credit"]);
    }

    #[test]
    fn literal_has_no_columns() {
        let expr = projection("SELECT 42");
        assert!(collect_refs(&expr).columns.is_empty());
    }

    #[test]
    fn schema_qualified_column_uses_table_part() {
        let expr = projection("SELECT sales.orders.id FROM sales.orders");
        let refs = collect_refs(&expr);
        assert_eq!(refs.columns[0].table(), Some("orders"));
        assert_eq!(refs.columns[0].qualifier.len(), 2);
    }

    #[test]
    fn subqueries_are_not_entered() {
        let expr = projection("SELECT (SELECT MAX(b.v) FROM b) + a.w FROM a");
        let refs = collect_refs(&expr);
        assert_eq!(names(&refs), vec!["a.w"]);
        assert_eq!(refs.subqueries.len(), 1);
    }

    #[test]
    fn nested_equalities_are_found() {
        let expr = projection("SELECT (a.id = b.id AND (a.k = b.k OR a.z > 1)) FROM a");
        let eqs = equalities(&expr);
        assert_eq!(eqs.len(), 2);
        assert_eq!(eqs[0].0.to_string(), "a.id");
        assert_eq!(eqs[1].1.to_string(), "b.k");
    }

    #[test]
    fn columns_under_access_and_constructor_expressions() {
        let cases = [
            (SqlParser::postgres(), "SELECT t.arr[1] AS first_tag FROM t", vec!["t.arr"]),
            (SqlParser::snowflake(), "SELECT t.v:field AS f FROM t", vec!["t.v"]),
            (SqlParser::postgres(), "SELECT ARRAY[a.x, a.y] AS arr FROM a", vec!["a.x", "a.y"]),
            (SqlParser::bigquery(), "SELECT STRUCT(a.x AS k) AS s FROM a", vec!["a.x"]),
            (SqlParser::mysql(), "SELECT CONVERT(a.x, CHAR) AS c FROM a", vec!["a.x"]),
            (
                SqlParser::postgres(),
                "SELECT OVERLAY(a.x PLACING a.y FROM 1) AS o FROM a",
                vec!["a.x", "a.y"],
            ),
            (
                SqlParser::bigquery(),
                "SELECT a.x IN UNNEST(a.tags) AS hit FROM a",
                vec!["a.x", "a.tags"],
            ),
        ];

        for (parser, sql, expected) in cases {
            let expr = projection_in(&parser, sql);
            assert_eq!(names(&collect_refs(&expr)), expected, "{}", sql);
        }
    }

    #[test]
    fn columns_in_aggregate_and_window_clauses() {
        let cases = [
            (
                SqlParser::postgres(),
                "SELECT COUNT(*) FILTER (WHERE a.flag) AS n FROM a",
                vec!["a.flag"],
            ),
            (
                SqlParser::postgres(),
                "SELECT PERCENTILE_CONT(0.5) WITHIN GROUP (ORDER BY a.x) AS p FROM a",
                vec!["a.x"],
            ),
            (
                SqlParser::new(),
                "SELECT SUM(a.v) OVER (PARTITION BY a.k ORDER BY a.ts) AS running FROM a",
                vec!["a.v", "a.k", "a.ts"],
            ),
        ];

        for (parser, sql, expected) in cases {
            let expr = projection_in(&parser, sql);
            assert_eq!(names(&collect_refs(&expr)), expected, "{}", sql);
        }
    }

    #[test]
    fn deep_expressions_do_not_overflow() {
        let mut sql = String::from("SELECT ");
        for _ in 0..2000 {
            sql.push_str("x + ");
        }
        sql.push_str("x");

        let parsed = SqlParser::new().parse(&sql, None).unwrap();
        let Some(Statement::Query(query)) = parsed.first_statement() else {
            panic!("not a query");
        };
        let SetExpr::Select(select) = query.body.as_ref() else {
            panic!("not a select");
        };
        let SelectItem::UnnamedExpr(expr) = &select.projection[0] else {
            panic!("unexpected projection");
        };

        assert_eq!(collect_refs(expr).columns.len(), 2001);
    }
}
