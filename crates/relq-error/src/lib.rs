use thiserror::Error;

/// Primary error type for relq operations.
///
/// Syntax errors come out of the parser, semantic errors out of the planner,
/// and environment errors out of whatever feeds the pipeline (config files,
/// catalog snapshots, terminals).
#[derive(Error, Debug)]
pub enum RelqError {
    // === Syntax Errors ===
    /// SQL syntax error at a byte offset of the source text.
    #[error("{detail}")]
    Syntax { offset: usize, detail: String },

    // === Planning Errors ===
    /// The statement variant has no planning rule.
    #[error("unknown statement type")]
    UnknownStatement,

    /// OFFSET was given without a LIMIT.
    #[error("invalid SELECT: OFFSET without LIMIT")]
    OffsetWithoutLimit,

    /// The SELECT list is empty.
    #[error("invalid statement: no columns in select")]
    EmptyProjection,

    /// The FROM clause does not name a relation.
    #[error("invalid expression in FROM clause")]
    InvalidFromClause,

    /// No such relation in the catalog.
    #[error("no such relation: {name}")]
    NoSuchRelation { name: String },

    /// Projected column missing from the relation schema.
    #[error("unknown column in statement: {name}")]
    NoSuchColumn { name: String },

    /// Predicate identifier not resolvable in the configured scope.
    #[error("unknown column in predicate: {name}")]
    UnknownPredicateColumn { name: String },

    /// Expression variant not allowed where it appeared.
    #[error("invalid expression in {context}")]
    InvalidExpression { context: String },

    // === Environment Errors ===
    /// Malformed configuration or catalog description.
    #[error("configuration error: {0}")]
    Config(String),

    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse classification of a [`RelqError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The statement text is malformed.
    Syntax,
    /// The statement is well formed but does not fit the catalog.
    Semantic,
    /// Failure outside the statement itself.
    Environment,
}

impl RelqError {
    /// Classify this error.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Syntax { .. } => ErrorKind::Syntax,
            Self::UnknownStatement
            | Self::OffsetWithoutLimit
            | Self::EmptyProjection
            | Self::InvalidFromClause
            | Self::NoSuchRelation { .. }
            | Self::NoSuchColumn { .. }
            | Self::UnknownPredicateColumn { .. }
            | Self::InvalidExpression { .. } => ErrorKind::Semantic,
            Self::Config(_) | Self::Io(_) => ErrorKind::Environment,
        }
    }

    /// Whether the user can likely fix this by rewriting the statement.
    pub const fn is_user_recoverable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Syntax | ErrorKind::Semantic)
            && !matches!(self, Self::UnknownStatement)
    }

    /// Human-friendly suggestion for fixing this error.
    pub const fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::OffsetWithoutLimit => Some("Add a LIMIT clause next to OFFSET"),
            Self::EmptyProjection => Some("List at least one column after SELECT"),
            Self::NoSuchRelation { .. } => Some("Check the table name against the catalog"),
            Self::NoSuchColumn { .. } | Self::UnknownPredicateColumn { .. } => {
                Some("Check the column name against the relation schema")
            }
            _ => None,
        }
    }

    /// Byte offset into the statement text, for syntax errors.
    pub const fn offset(&self) -> Option<usize> {
        match self {
            Self::Syntax { offset, .. } => Some(*offset),
            _ => None,
        }
    }

    /// Process exit code for this error (for CLI use).
    pub const fn exit_code(&self) -> i32 {
        match self.kind() {
            ErrorKind::Syntax | ErrorKind::Semantic => 1,
            ErrorKind::Environment => 3,
        }
    }

    /// Create a syntax error.
    pub fn syntax(offset: usize, detail: impl Into<String>) -> Self {
        Self::Syntax {
            offset,
            detail: detail.into(),
        }
    }

    /// Create a no-such-relation error.
    pub fn no_such_relation(name: impl Into<String>) -> Self {
        Self::NoSuchRelation { name: name.into() }
    }

    /// Create a no-such-column error.
    pub fn no_such_column(name: impl Into<String>) -> Self {
        Self::NoSuchColumn { name: name.into() }
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

/// Result type alias using `RelqError`.
pub type Result<T> = std::result::Result<T, RelqError>;
