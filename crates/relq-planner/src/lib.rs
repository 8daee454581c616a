//! Logical planner: validates a parsed SELECT against a catalog and lowers it
//! into a [`PlanNode`] chain.
//!
//! Validation runs in full before any node is built, in this order:
//! - OFFSET requires LIMIT
//! - at least one projected field
//! - FROM names a relation that exists in the catalog
//! - every projected field exists in that relation (`*` passes as-is)
//! - every identifier in WHERE resolves in the configured [`PredicateScope`]
//!
//! The plan is then assembled bottom-up:
//! `Limit → Offset → Sort → Projection → [Filter →] TableScan`, skipping the
//! layers whose clause is absent. Joins are parsed but not lowered.

mod config;
mod plan;

use relq_ast::{Expr, Ident, SelectStmt, Statement};
use relq_catalog::{Catalog, Relation};
use relq_error::{RelqError, Result};

pub use config::{PlannerConfig, PredicateScope};
pub use plan::{Iter, PlanNode};

/// Plans statements against a borrowed catalog.
pub struct Planner<'a> {
    catalog: &'a dyn Catalog,
    config: PlannerConfig,
}

impl<'a> Planner<'a> {
    #[must_use]
    pub fn new(catalog: &'a dyn Catalog) -> Self {
        Self::with_config(catalog, PlannerConfig::default())
    }

    #[must_use]
    pub fn with_config(catalog: &'a dyn Catalog, config: PlannerConfig) -> Self {
        Self { catalog, config }
    }

    #[must_use]
    pub const fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Plan any statement. Only SELECT has a planning rule.
    pub fn plan(&self, stmt: &Statement) -> Result<PlanNode> {
        match stmt {
            Statement::Select(select) => self.plan_select(select),
            _ => Err(RelqError::UnknownStatement),
        }
    }

    pub fn plan_select(&self, stmt: &SelectStmt) -> Result<PlanNode> {
        let span = tracing::debug_span!(
            target: "relq.plan",
            "plan_select",
            relation = tracing::field::Empty,
            depth = tracing::field::Empty,
        );
        let _guard = span.enter();

        let relation = self.validate(stmt).inspect_err(|err| {
            tracing::debug!(target: "relq.plan", error = %err, "statement rejected");
        })?;
        span.record("relation", relation.name.as_str());

        if !stmt.from.joins.is_empty() {
            tracing::warn!(
                target: "relq.plan",
                joins = stmt.from.joins.len(),
                "join chain is not lowered into the plan"
            );
        }

        let plan = build(stmt, &relation);
        span.record("depth", plan.depth() as u64);
        Ok(plan)
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    /// Check the statement and return the FROM relation snapshot.
    fn validate(&self, stmt: &SelectStmt) -> Result<Relation> {
        if stmt.offset.is_some() && stmt.limit.is_none() {
            return Err(RelqError::OffsetWithoutLimit);
        }
        if stmt.fields.is_empty() {
            return Err(RelqError::EmptyProjection);
        }

        let name = stmt.from.table_name().ok_or(RelqError::InvalidFromClause)?;
        let relation = self.catalog.get_relation(name)?;

        for field in &stmt.fields {
            if !projects(&relation, field) {
                return Err(RelqError::no_such_column(&field.name));
            }
        }

        if let Some(where_clause) = &stmt.where_clause {
            let scope = match self.config.predicate_scope {
                PredicateScope::Catalog => Scope::Catalog(self.catalog),
                PredicateScope::Relation => {
                    Scope::Relations(self.scope_relations(stmt, &relation)?)
                }
            };
            validate_predicate(&scope, &where_clause.predicate)?;
        }

        Ok(relation)
    }

    /// The FROM relation plus every joined relation, for relation-scoped
    /// predicate checks.
    fn scope_relations(&self, stmt: &SelectStmt, base: &Relation) -> Result<Vec<Relation>> {
        let mut relations = vec![base.clone()];
        for join in &stmt.from.joins {
            let name = join.table.as_ident().ok_or(RelqError::InvalidFromClause)?;
            relations.push(self.catalog.get_relation(&name.name)?);
        }
        Ok(relations)
    }
}

/// Plan a statement with the default configuration.
pub fn plan(stmt: &Statement, catalog: &dyn Catalog) -> Result<PlanNode> {
    Planner::new(catalog).plan(stmt)
}

/// `*`, a column of the relation, or `relation.column`.
fn projects(relation: &Relation, field: &Ident) -> bool {
    if field.is_star() || relation.has_column(&field.name) {
        return true;
    }
    match field.split_qualifier() {
        (Some(qualifier), column) => qualifier == relation.name && relation.has_column(column),
        (None, _) => false,
    }
}

enum Scope<'a> {
    Catalog(&'a dyn Catalog),
    Relations(Vec<Relation>),
}

impl Scope<'_> {
    fn resolves(&self, ident: &Ident) -> bool {
        match self {
            Self::Catalog(catalog) => catalog.has_column(&ident.name),
            Self::Relations(relations) => match ident.split_qualifier() {
                (Some(qualifier), column) => relations
                    .iter()
                    .find(|r| r.name == qualifier)
                    .map_or_else(
                        || relations.iter().any(|r| r.has_column(&ident.name)),
                        |r| r.has_column(column),
                    ),
                (None, column) => relations.iter().any(|r| r.has_column(column)),
            },
        }
    }
}

/// Every identifier must resolve in `scope`; alias nodes are not predicates.
fn validate_predicate(scope: &Scope<'_>, predicate: &Expr) -> Result<()> {
    predicate.try_for_each(&mut |node| match node {
        Expr::Ident(ident) if !scope.resolves(ident) => {
            Err(RelqError::UnknownPredicateColumn {
                name: ident.name.clone(),
            })
        }
        Expr::Alias(_) => Err(RelqError::InvalidExpression {
            context: "predicate".to_owned(),
        }),
        _ => Ok(()),
    })
}

// ---------------------------------------------------------------------------
// Construction
// ---------------------------------------------------------------------------

fn build(stmt: &SelectStmt, relation: &Relation) -> PlanNode {
    let mut node = PlanNode::TableScan {
        relation: relation.name.clone(),
    };
    if let Some(where_clause) = &stmt.where_clause {
        node = PlanNode::Filter {
            predicate: where_clause.predicate.clone(),
            from: Box::new(node),
        };
    }
    node = PlanNode::Projection {
        columns: stmt.fields.clone(),
        from: Box::new(node),
    };
    if let Some(order_by) = &stmt.order_by {
        node = PlanNode::Sort {
            keys: order_by.fields.iter().map(|f| f.name.clone()).collect(),
            from: Box::new(node),
        };
    }
    if let Some(offset) = stmt.offset {
        node = PlanNode::Offset {
            value: offset.value,
            from: Box::new(node),
        };
    }
    if let Some(limit) = stmt.limit {
        node = PlanNode::Limit {
            value: limit.value,
            from: Box::new(node),
        };
    }
    node
}

#[cfg(test)]
mod tests {
    use super::*;
    use relq_ast::{AliasExpr, BasicLit, BinaryOp, FromClause, LimitClause, OffsetClause};
    use relq_catalog::{Column, DataType, MemoryCatalog};

    fn catalog() -> MemoryCatalog {
        MemoryCatalog::new()
            .with_relation(
                Relation::new("tbl")
                    .with_column(Column::new("name", DataType::Text))
                    .with_column(Column::new("age", DataType::Integer)),
            )
            .with_relation(
                Relation::new("t1")
                    .with_column(Column::new("a", DataType::Integer))
                    .with_column(Column::new("b", DataType::Text)),
            )
            .with_relation(
                Relation::new("t2")
                    .with_column(Column::new("a", DataType::Integer))
                    .with_column(Column::new("c", DataType::Real)),
            )
    }

    fn plan_sql(sql: &str, config: PlannerConfig) -> Result<PlanNode> {
        let catalog = catalog();
        let stmt = relq_parser::parse_statement(sql)?;
        Planner::with_config(&catalog, config).plan(&stmt)
    }

    fn outline(sql: &str) -> String {
        match plan_sql(sql, PlannerConfig::default()) {
            Ok(plan) => plan.outline(),
            Err(err) => unreachable!("planning {sql:?} failed: {err}"),
        }
    }

    fn plan_err(sql: &str) -> RelqError {
        match plan_sql(sql, PlannerConfig::default()) {
            Ok(plan) => unreachable!("planning {sql:?} succeeded: {plan}"),
            Err(err) => err,
        }
    }

    fn relation_scope() -> PlannerConfig {
        PlannerConfig::default().with_predicate_scope(PredicateScope::Relation)
    }

    #[test]
    fn test_plan_projection_over_scan() {
        assert_eq!(
            outline("SELECT name FROM tbl"),
            "Projection(name) -> TableScan(tbl)"
        );
    }

    #[test]
    fn test_plan_filter_between_projection_and_scan() {
        assert_eq!(
            outline("SELECT a,b FROM t1 WHERE a = 1"),
            "Projection(a, b) -> Filter(a = 1) -> TableScan(t1)"
        );
    }

    #[test]
    fn test_plan_order_limit_offset_nesting() {
        let plan = plan_sql(
            "SELECT a FROM t1 ORDER BY a OFFSET 5 LIMIT 10",
            PlannerConfig::default(),
        )
        .expect("valid statement");
        let names: Vec<&str> = plan.iter().map(PlanNode::name).collect();
        assert_eq!(names, ["Limit", "Offset", "Sort", "Projection", "TableScan"]);
        assert_eq!(
            plan.outline(),
            "Limit(10) -> Offset(5) -> Sort(a) -> Projection(a) -> TableScan(t1)"
        );
    }

    #[test]
    fn test_plan_every_layer() {
        assert_eq!(
            outline("SELECT a, b FROM t1 WHERE b = 'x' ORDER BY b, a LIMIT 3"),
            "Limit(3) -> Sort(b, a) -> Projection(a, b) -> Filter(b = 'x') -> TableScan(t1)"
        );
    }

    #[test]
    fn test_plan_star_projection() {
        assert_eq!(outline("SELECT * FROM tbl"), "Projection(*) -> TableScan(tbl)");
    }

    #[test]
    fn test_plan_qualified_projection() {
        assert_eq!(
            outline("SELECT t1.a FROM t1"),
            "Projection(t1.a) -> TableScan(t1)"
        );
        assert!(matches!(
            plan_err("SELECT t2.a FROM t1"),
            RelqError::NoSuchColumn { ref name } if name == "t2.a"
        ));
    }

    #[test]
    fn test_plan_join_is_not_lowered() {
        assert_eq!(
            outline("SELECT a FROM t1 JOIN t2 ON t1.a = t2.a"),
            "Projection(a) -> TableScan(t1)"
        );
    }

    #[test]
    fn test_reject_offset_without_limit() {
        let stmt = SelectStmt {
            fields: vec![Ident::new("a")],
            from: FromClause::table("t1"),
            offset: Some(OffsetClause { value: 5 }),
            ..SelectStmt::default()
        };
        let catalog = catalog();
        let err = Planner::new(&catalog)
            .plan_select(&stmt)
            .expect_err("OFFSET without LIMIT");
        assert_eq!(err.to_string(), "invalid SELECT: OFFSET without LIMIT");
    }

    #[test]
    fn test_reject_offset_without_limit_before_other_checks() {
        // Even with an unknown relation the OFFSET rule fires first.
        let stmt = SelectStmt {
            fields: Vec::new(),
            from: FromClause::table("ghost"),
            offset: Some(OffsetClause { value: 1 }),
            ..SelectStmt::default()
        };
        let catalog = catalog();
        assert!(matches!(
            Planner::new(&catalog).plan_select(&stmt),
            Err(RelqError::OffsetWithoutLimit)
        ));
    }

    #[test]
    fn test_reject_empty_projection() {
        let stmt = SelectStmt {
            from: FromClause::table("t1"),
            limit: Some(LimitClause { value: 1 }),
            ..SelectStmt::default()
        };
        let catalog = catalog();
        let err = Planner::new(&catalog)
            .plan_select(&stmt)
            .expect_err("no fields");
        assert_eq!(err.to_string(), "invalid statement: no columns in select");
    }

    #[test]
    fn test_reject_non_identifier_from() {
        let stmt = SelectStmt {
            fields: vec![Ident::new("a")],
            from: FromClause {
                table: Some(Expr::BasicLit(BasicLit::int("1"))),
                joins: Vec::new(),
            },
            ..SelectStmt::default()
        };
        let catalog = catalog();
        assert!(matches!(
            Planner::new(&catalog).plan_select(&stmt),
            Err(RelqError::InvalidFromClause)
        ));

        let missing = SelectStmt {
            fields: vec![Ident::new("a")],
            ..SelectStmt::default()
        };
        assert!(matches!(
            Planner::new(&catalog).plan_select(&missing),
            Err(RelqError::InvalidFromClause)
        ));
    }

    #[test]
    fn test_reject_unknown_relation() {
        assert!(matches!(
            plan_err("SELECT a FROM t9"),
            RelqError::NoSuchRelation { ref name } if name == "t9"
        ));
    }

    #[test]
    fn test_reject_unknown_projected_column() {
        let err = plan_err("SELECT name, salary FROM tbl");
        assert_eq!(err.to_string(), "unknown column in statement: salary");
    }

    #[test]
    fn test_column_names_are_case_sensitive() {
        assert!(matches!(
            plan_err("SELECT NAME FROM tbl"),
            RelqError::NoSuchColumn { .. }
        ));
    }

    #[test]
    fn test_predicate_catalog_scope() {
        // `c` only exists in t2, which the catalog-wide check accepts.
        assert_eq!(
            outline("SELECT a FROM t1 WHERE c > 1.5"),
            "Projection(a) -> Filter(c > 1.5) -> TableScan(t1)"
        );
        let err = plan_err("SELECT a FROM t1 WHERE zzz = 1");
        assert_eq!(err.to_string(), "unknown column in predicate: zzz");
    }

    #[test]
    fn test_predicate_relation_scope() {
        let err = plan_sql("SELECT a FROM t1 WHERE c > 1.5", relation_scope())
            .expect_err("c is not in t1");
        assert!(matches!(err, RelqError::UnknownPredicateColumn { ref name } if name == "c"));

        let joined = plan_sql(
            "SELECT a FROM t1 JOIN t2 ON t1.a = t2.a WHERE c > 1.5 AND t1.b = 'x'",
            relation_scope(),
        )
        .expect("c is visible through the join");
        assert_eq!(joined.depth(), 3);

        let err = plan_sql(
            "SELECT a FROM t1 JOIN t2 ON t1.a = t2.a WHERE t1.c > 1.5",
            relation_scope(),
        )
        .expect_err("c is not a column of t1");
        assert!(matches!(err, RelqError::UnknownPredicateColumn { ref name } if name == "t1.c"));
    }

    #[test]
    fn test_relation_scope_requires_joined_relations() {
        let err = plan_sql(
            "SELECT a FROM t1 JOIN t9 ON t1.a = t9.a WHERE a = 1",
            relation_scope(),
        )
        .expect_err("t9 is not in the catalog");
        assert!(matches!(err, RelqError::NoSuchRelation { ref name } if name == "t9"));
    }

    #[test]
    fn test_reject_alias_in_predicate() {
        let stmt = SelectStmt {
            fields: vec![Ident::new("a")],
            from: FromClause::table("t1"),
            where_clause: Some(relq_ast::WhereClause {
                predicate: Expr::binary(
                    Expr::Alias(AliasExpr {
                        expr: Box::new(Expr::ident("a")),
                        alias: Ident::new("x"),
                    }),
                    BinaryOp::Eq,
                    BasicLit::int("1").into(),
                ),
            }),
            ..SelectStmt::default()
        };
        let catalog = catalog();
        let err = Planner::new(&catalog)
            .plan_select(&stmt)
            .expect_err("alias in predicate");
        assert_eq!(err.to_string(), "invalid expression in predicate");
    }

    #[test]
    fn test_predicate_reports_first_unknown_in_source_order() {
        let err = plan_err("SELECT a FROM t1 WHERE a = 1 AND x1 = y1 OR x2 = 2");
        assert!(matches!(err, RelqError::UnknownPredicateColumn { ref name } if name == "x1"));
    }

    #[test]
    fn test_reject_alias_nested_in_logical_chain() {
        // a = 1 AND (b AS x) = 'y'
        let predicate = Expr::binary(
            Expr::binary(Expr::ident("a"), BinaryOp::Eq, BasicLit::int("1").into()),
            BinaryOp::And,
            Expr::binary(
                Expr::Alias(AliasExpr {
                    expr: Box::new(Expr::ident("b")),
                    alias: Ident::new("x"),
                }),
                BinaryOp::Eq,
                BasicLit::string("'y'").into(),
            ),
        );
        let stmt = SelectStmt {
            fields: vec![Ident::new("a")],
            from: FromClause::table("t1"),
            where_clause: Some(relq_ast::WhereClause { predicate }),
            ..SelectStmt::default()
        };
        let catalog = catalog();
        let err = Planner::new(&catalog)
            .plan_select(&stmt)
            .expect_err("alias deep in predicate");
        assert!(matches!(
            err,
            RelqError::InvalidExpression { ref context } if context == "predicate"
        ));
    }

    #[test]
    fn test_free_plan_function() {
        let catalog = catalog();
        let stmt = relq_parser::parse_statement("SELECT age FROM tbl LIMIT 1").expect("valid");
        let plan = plan(&stmt, &catalog).expect("plannable");
        assert_eq!(plan.outline(), "Limit(1) -> Projection(age) -> TableScan(tbl)");
    }

    #[test]
    fn test_planner_does_not_mutate_catalog() {
        let catalog = catalog();
        let before = catalog.clone();
        let stmt = relq_parser::parse_statement("SELECT a FROM t1 WHERE a = 1").expect("valid");
        Planner::new(&catalog).plan(&stmt).expect("plannable");
        assert_eq!(catalog, before);
    }
}
