//! Abstract syntax tree for relq SELECT statements.
//!
//! The parser in `relq-parser` produces a [`SelectStmt`] wrapped in a
//! [`Statement`]; the planner in `relq-planner` consumes it. Nodes carry no
//! source positions: two parses of the same text compare equal regardless of
//! whitespace.

mod display;

use std::fmt;

// ---------------------------------------------------------------------------
// Span: source location tracking
// ---------------------------------------------------------------------------

/// Half-open byte range `start..end` into the statement text.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub const ZERO: Self = Self { start: 0, end: 0 };

    #[must_use]
    pub const fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// Smallest span covering both `self` and `other`.
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        Self {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

// ---------------------------------------------------------------------------
// Top-level statement
// ---------------------------------------------------------------------------

/// A single parsed SQL statement.
///
/// Only `SELECT` exists today. The enum is non-exhaustive so downstream
/// consumers keep a fallback arm for statement kinds they cannot handle.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum Statement {
    Select(SelectStmt),
}

impl From<SelectStmt> for Statement {
    fn from(stmt: SelectStmt) -> Self {
        Self::Select(stmt)
    }
}

// ---------------------------------------------------------------------------
// Identifiers and literals
// ---------------------------------------------------------------------------

/// A bare (`age`) or dotted (`main.users.age`) name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Ident {
    pub name: String,
}

impl Ident {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// The `*` pseudo-field of `SELECT *`.
    #[must_use]
    pub fn star() -> Self {
        Self::new("*")
    }

    #[must_use]
    pub fn is_star(&self) -> bool {
        self.name == "*"
    }

    /// Split a dotted name into `(qualifier, column)`.
    ///
    /// `t.a` → `(Some("t"), "a")`, `s.t.a` → `(Some("s.t"), "a")`,
    /// `a` → `(None, "a")`.
    #[must_use]
    pub fn split_qualifier(&self) -> (Option<&str>, &str) {
        match self.name.rsplit_once('.') {
            Some((qualifier, column)) => (Some(qualifier), column),
            None => (None, self.name.as_str()),
        }
    }

    /// Render an optional identifier; an absent one renders as `NULL`.
    #[must_use]
    pub fn display_opt(ident: Option<&Self>) -> &str {
        ident.map_or("NULL", |i| i.name.as_str())
    }
}

/// Lexical class of a literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LitKind {
    Int,
    Float,
    String,
}

/// A literal's raw source text: `42`, `-1.5e3`, `'text'` (quotes kept).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BasicLit {
    pub kind: LitKind,
    pub value: String,
}

impl BasicLit {
    #[must_use]
    pub fn new(kind: LitKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }

    #[must_use]
    pub fn int(value: impl Into<String>) -> Self {
        Self::new(LitKind::Int, value)
    }

    #[must_use]
    pub fn float(value: impl Into<String>) -> Self {
        Self::new(LitKind::Float, value)
    }

    #[must_use]
    pub fn string(value: impl Into<String>) -> Self {
        Self::new(LitKind::String, value)
    }
}

// ---------------------------------------------------------------------------
// Operators
// ---------------------------------------------------------------------------

/// Binary operators: comparisons and logical connectives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Not,
    Negate,
}

// ---------------------------------------------------------------------------
// Expressions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UnaryExpr {
    pub op: UnaryOp,
    pub operand: Box<Expr>,
}

/// `lhs op rhs`. Used for comparisons and for right-nested `AND`/`OR` chains.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BinaryExpr {
    pub lhs: Box<Expr>,
    pub op: BinaryOp,
    pub rhs: Box<Expr>,
}

impl BinaryExpr {
    #[must_use]
    pub fn new(lhs: Expr, op: BinaryOp, rhs: Expr) -> Self {
        Self {
            lhs: Box::new(lhs),
            op,
            rhs: Box::new(rhs),
        }
    }
}

/// `expr AS alias`. Not produced by the grammar yet.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AliasExpr {
    pub expr: Box<Expr>,
    pub alias: Ident,
}

/// An expression node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expr {
    Ident(Ident),
    BasicLit(BasicLit),
    Unary(UnaryExpr),
    Binary(BinaryExpr),
    Alias(AliasExpr),
}

impl Expr {
    #[must_use]
    pub fn ident(name: impl Into<String>) -> Self {
        Self::Ident(Ident::new(name))
    }

    #[must_use]
    pub fn binary(lhs: Self, op: BinaryOp, rhs: Self) -> Self {
        Self::Binary(BinaryExpr::new(lhs, op, rhs))
    }

    /// Return the identifier if this is a bare `Ident` node.
    #[must_use]
    pub const fn as_ident(&self) -> Option<&Ident> {
        match self {
            Self::Ident(id) => Some(id),
            _ => None,
        }
    }

    /// Visit every node of the tree in pre-order, left to right, stopping at
    /// the first error `f` returns.
    pub fn try_for_each<E>(&self, f: &mut impl FnMut(&Self) -> Result<(), E>) -> Result<(), E> {
        f(self)?;
        match self {
            Self::Ident(_) | Self::BasicLit(_) => Ok(()),
            Self::Unary(u) => u.operand.try_for_each(f),
            Self::Binary(b) => {
                b.lhs.try_for_each(f)?;
                b.rhs.try_for_each(f)
            }
            Self::Alias(a) => a.expr.try_for_each(f),
        }
    }
}

impl From<BinaryExpr> for Expr {
    fn from(expr: BinaryExpr) -> Self {
        Self::Binary(expr)
    }
}

impl From<Ident> for Expr {
    fn from(id: Ident) -> Self {
        Self::Ident(id)
    }
}

impl From<BasicLit> for Expr {
    fn from(lit: BasicLit) -> Self {
        Self::BasicLit(lit)
    }
}

// ---------------------------------------------------------------------------
// SELECT and its clauses
// ---------------------------------------------------------------------------

/// A SELECT statement.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SelectStmt {
    /// Projected fields in source order. `*` is stored as a field named `*`.
    pub fields: Vec<Ident>,
    pub from: FromClause,
    pub where_clause: Option<WhereClause>,
    pub group_by: Option<GroupByClause>,
    pub order_by: Option<OrderByClause>,
    pub limit: Option<LimitClause>,
    pub offset: Option<OffsetClause>,
}

/// `FROM table [join ...]`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FromClause {
    /// `None` only on a partially parsed statement.
    pub table: Option<Expr>,
    /// Joins in source order.
    pub joins: Vec<JoinSubClause>,
}

impl FromClause {
    #[must_use]
    pub fn table(name: impl Into<String>) -> Self {
        Self {
            table: Some(Expr::ident(name)),
            joins: Vec::new(),
        }
    }

    /// Name of the base relation, when the FROM target is an identifier.
    #[must_use]
    pub fn table_name(&self) -> Option<&str> {
        self.table
            .as_ref()
            .and_then(Expr::as_ident)
            .map(|id| id.name.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JoinKind {
    Inner,
    LeftOuter,
    RightOuter,
    FullOuter,
}

/// One `[kind] JOIN table ON criterion` link.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinSubClause {
    pub table: Expr,
    pub kind: JoinKind,
    pub criterion: BinaryExpr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhereClause {
    pub predicate: Expr,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GroupByClause {
    pub fields: Vec<Ident>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OrderByClause {
    pub fields: Vec<Ident>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LimitClause {
    pub value: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OffsetClause {
    pub value: u64,
}
