//! Logical plan tree.
//!
//! A plan is a chain: every node except [`PlanNode::TableScan`] owns exactly
//! one child, so the tree reads top to bottom as the order rows flow out of
//! it, outermost operator first.

use std::fmt;

use relq_ast::{Expr, Ident, JoinKind};

#[derive(Debug, Clone, PartialEq)]
pub enum PlanNode {
    /// Keep only the listed columns.
    Projection {
        columns: Vec<Ident>,
        from: Box<PlanNode>,
    },
    /// Full scan of a relation. Always the leaf.
    TableScan { relation: String },
    /// In-memory sort on the listed keys.
    Sort { keys: Vec<String>, from: Box<PlanNode> },
    /// Join without indexes. Not produced by the planner yet.
    NestedLoop { kind: JoinKind, from: Box<PlanNode> },
    Limit { value: u64, from: Box<PlanNode> },
    /// Discard rows from the top of the set.
    Offset { value: u64, from: Box<PlanNode> },
    /// Keep rows matching the WHERE predicate.
    Filter { predicate: Expr, from: Box<PlanNode> },
}

impl PlanNode {
    /// Operator name, as shown in EXPLAIN output.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Projection { .. } => "Projection",
            Self::TableScan { .. } => "TableScan",
            Self::Sort { .. } => "Sort",
            Self::NestedLoop { .. } => "NestedLoop",
            Self::Limit { .. } => "Limit",
            Self::Offset { .. } => "Offset",
            Self::Filter { .. } => "Filter",
        }
    }

    /// The single input of this node; `None` for the leaf.
    #[must_use]
    pub fn child(&self) -> Option<&Self> {
        match self {
            Self::TableScan { .. } => None,
            Self::Projection { from, .. }
            | Self::Sort { from, .. }
            | Self::NestedLoop { from, .. }
            | Self::Limit { from, .. }
            | Self::Offset { from, .. }
            | Self::Filter { from, .. } => Some(from),
        }
    }

    /// Walk the chain from this node down to the leaf.
    pub fn iter(&self) -> Iter<'_> {
        Iter { next: Some(self) }
    }

    /// Number of nodes in the chain.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.iter().count()
    }

    /// One-line rendering: `Limit(10) -> Offset(5) -> ... -> TableScan(t)`.
    #[must_use]
    pub fn outline(&self) -> String {
        self.iter()
            .map(|node| Header(node).to_string())
            .collect::<Vec<_>>()
            .join(" -> ")
    }
}

impl<'a> IntoIterator for &'a PlanNode {
    type Item = &'a PlanNode;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Iter<'a> {
        self.iter()
    }
}

/// Outer-to-inner iterator over a plan chain.
pub struct Iter<'a> {
    next: Option<&'a PlanNode>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a PlanNode;

    fn next(&mut self) -> Option<&'a PlanNode> {
        let node = self.next?;
        self.next = node.child();
        Some(node)
    }
}

/// `Name(detail)` for a single node, without its child.
struct Header<'a>(&'a PlanNode);

impl fmt::Display for Header<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let node = self.0;
        write!(f, "{}(", node.name())?;
        match node {
            PlanNode::Projection { columns, .. } => {
                for (i, col) in columns.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{col}")?;
                }
            }
            PlanNode::TableScan { relation } => f.write_str(relation)?,
            PlanNode::Sort { keys, .. } => f.write_str(&keys.join(", "))?,
            PlanNode::NestedLoop { kind, .. } => write!(f, "{kind}")?,
            PlanNode::Limit { value, .. } | PlanNode::Offset { value, .. } => {
                write!(f, "{value}")?;
            }
            PlanNode::Filter { predicate, .. } => write!(f, "{predicate}")?,
        }
        f.write_str(")")
    }
}

/// EXPLAIN-style rendering, one node per line, children indented.
impl fmt::Display for PlanNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (depth, node) in self.iter().enumerate() {
            if depth > 0 {
                writeln!(f)?;
            }
            write!(f, "{:indent$}{}", "", Header(node), indent = depth * 2)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relq_ast::{BasicLit, BinaryOp};

    fn sample() -> PlanNode {
        PlanNode::Limit {
            value: 10,
            from: Box::new(PlanNode::Sort {
                keys: vec!["a".to_owned(), "b".to_owned()],
                from: Box::new(PlanNode::Projection {
                    columns: vec![Ident::new("a"), Ident::new("b")],
                    from: Box::new(PlanNode::Filter {
                        predicate: Expr::binary(
                            Expr::ident("a"),
                            BinaryOp::Eq,
                            BasicLit::int("1").into(),
                        ),
                        from: Box::new(PlanNode::TableScan {
                            relation: "t1".to_owned(),
                        }),
                    }),
                }),
            }),
        }
    }

    #[test]
    fn test_iter_walks_outer_to_inner() {
        let plan = sample();
        let names: Vec<&str> = plan.iter().map(PlanNode::name).collect();
        assert_eq!(names, ["Limit", "Sort", "Projection", "Filter", "TableScan"]);
        assert_eq!(plan.depth(), 5);
    }

    #[test]
    fn test_leaf_has_no_child() {
        let scan = PlanNode::TableScan {
            relation: "t".to_owned(),
        };
        assert!(scan.child().is_none());
        assert_eq!(scan.depth(), 1);
    }

    #[test]
    fn test_outline() {
        assert_eq!(
            sample().outline(),
            "Limit(10) -> Sort(a, b) -> Projection(a, b) -> Filter(a = 1) -> TableScan(t1)"
        );
    }

    #[test]
    fn test_explain_display_indents_children() {
        let expected = "\
Limit(10)
  Sort(a, b)
    Projection(a, b)
      Filter(a = 1)
        TableScan(t1)";
        assert_eq!(sample().to_string(), expected);
    }

    #[test]
    fn test_nested_loop_header() {
        let node = PlanNode::NestedLoop {
            kind: JoinKind::LeftOuter,
            from: Box::new(PlanNode::TableScan {
                relation: "t".to_owned(),
            }),
        };
        assert_eq!(node.outline(), "NestedLoop(LEFT JOIN) -> TableScan(t)");
    }
}
