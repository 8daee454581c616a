// SQL SELECT parser.
//
// Recursive descent driven as an explicit state machine: each grammar
// position is a `ParseState`, the driver loop runs one step at a time and a
// step hands back the next state (or `None` once the statement is complete).
// The parser holds a single lexeme of pushback over the scanner.

use std::error::Error;
use std::fmt;

use relq_ast::{
    BasicLit, BinaryExpr, BinaryOp, Expr, FromClause, GroupByClause, Ident, JoinKind,
    JoinSubClause, LimitClause, LitKind, OffsetClause, OrderByClause, SelectStmt, Span,
    WhereClause,
};

use crate::scanner::Scanner;
use crate::token::{Lexeme, Token};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// The first syntax error of a statement, with the offending source range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub message: String,
    pub span: Span,
}

impl ParseError {
    #[must_use]
    pub(crate) fn at(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
        }
    }

    /// `found "<lit>", <expectation>` positioned at the lexeme.
    fn found(lex: &Lexeme, expectation: &str) -> Self {
        Self::at(format!("found \"{}\", {expectation}", lex.lit), lex.span)
    }

    /// Byte offset of the offending lexeme.
    #[must_use]
    pub const fn offset(&self) -> usize {
        self.span.start as usize
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl Error for ParseError {}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Grammar positions of a SELECT statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    Init,
    SelectFields,
    From,
    Join,
    Where,
    GroupBy,
    GroupByFields,
    OrderBy,
    OrderByFields,
    Limit,
    Offset,
    Terminal,
}

type Step = Result<Option<ParseState>, ParseError>;

/// Single-use parser for one SELECT statement.
pub struct Parser<'a> {
    scanner: Scanner<'a>,
    /// Most recently scanned lexeme, replayed when `pending` is set.
    last: Lexeme,
    pending: bool,
    stmt: SelectStmt,
}

impl<'a> Parser<'a> {
    #[must_use]
    pub fn new(sql: &'a str) -> Self {
        Self {
            scanner: Scanner::new(sql),
            last: Lexeme::new(Token::Eof, "", Span::ZERO),
            pending: false,
            stmt: SelectStmt::default(),
        }
    }

    /// Parse the statement, returning the AST or the first syntax error.
    pub fn parse(self) -> Result<SelectStmt, ParseError> {
        let (stmt, outcome) = self.parse_partial();
        outcome.map(|()| stmt)
    }

    /// Parse the statement and return whatever was built alongside the
    /// outcome. On error the statement holds every clause completed before
    /// the failing lexeme.
    pub fn parse_partial(mut self) -> (SelectStmt, Result<(), ParseError>) {
        let span = tracing::debug_span!(
            target: "relq.parse",
            "parse_select",
            fields = tracing::field::Empty,
            joins = tracing::field::Empty,
            failed = tracing::field::Empty,
        );
        let _guard = span.enter();

        let mut outcome = Ok(());
        let mut state = Some(ParseState::Init);
        while let Some(current) = state {
            tracing::trace!(target: "relq.parse", state = ?current, "parser step");
            match self.step(current) {
                Ok(next) => state = next,
                Err(err) => {
                    tracing::debug!(
                        target: "relq.parse",
                        at = %err.span,
                        error = %err,
                        "syntax error"
                    );
                    outcome = Err(err);
                    break;
                }
            }
        }

        span.record("fields", self.stmt.fields.len() as u64);
        span.record("joins", self.stmt.from.joins.len() as u64);
        span.record("failed", outcome.is_err());
        (self.stmt, outcome)
    }

    fn step(&mut self, state: ParseState) -> Step {
        match state {
            ParseState::Init => self.parse_init(),
            ParseState::SelectFields => self.parse_select_fields(),
            ParseState::From => self.parse_from(),
            ParseState::Join => self.parse_join(),
            ParseState::Where => self.parse_where(),
            ParseState::GroupBy => self.parse_group_by(),
            ParseState::GroupByFields => self.parse_group_by_fields(),
            ParseState::OrderBy => self.parse_order_by(),
            ParseState::OrderByFields => self.parse_order_by_fields(),
            ParseState::Limit => self.parse_limit(),
            ParseState::Offset => self.parse_offset(),
            ParseState::Terminal => self.parse_terminal(),
        }
    }

    // -----------------------------------------------------------------------
    // Lexeme navigation
    // -----------------------------------------------------------------------

    fn scan(&mut self) -> Lexeme {
        if self.pending {
            self.pending = false;
            return self.last.clone();
        }
        self.last = Scanner::scan(&mut self.scanner);
        self.last.clone()
    }

    /// Push the last lexeme back; the next `scan()` returns it again.
    fn unscan(&mut self) {
        self.pending = true;
    }

    fn peek(&mut self) -> Lexeme {
        let lex = self.scan();
        self.unscan();
        lex
    }

    // -----------------------------------------------------------------------
    // States
    // -----------------------------------------------------------------------

    fn parse_init(&mut self) -> Step {
        let lex = self.scan();
        if lex.token != Token::KwSelect {
            return Err(ParseError::found(&lex, "expected SELECT"));
        }
        Ok(Some(ParseState::SelectFields))
    }

    fn parse_select_fields(&mut self) -> Step {
        loop {
            let lex = self.scan();
            let field = match lex.token {
                Token::Ident => Ident::new(lex.lit),
                Token::Asterisk => Ident::star(),
                _ => return Err(ParseError::found(&lex, "expected field")),
            };
            self.stmt.fields.push(field);

            if self.scan().token != Token::Comma {
                self.unscan();
                return Ok(Some(ParseState::From));
            }
        }
    }

    fn parse_from(&mut self) -> Step {
        let lex = self.scan();
        if lex.token != Token::KwFrom {
            return Err(ParseError::found(&lex, "expected FROM"));
        }

        let lex = self.scan();
        if lex.token != Token::Ident {
            return Err(ParseError::found(&lex, "expected table name"));
        }
        self.stmt.from = FromClause::table(lex.lit);

        self.after_table()
    }

    fn parse_join(&mut self) -> Step {
        let lex = self.scan();
        let kind = match lex.token {
            Token::KwJoin => JoinKind::Inner,
            Token::KwInner => {
                self.expect_join()?;
                JoinKind::Inner
            }
            Token::KwLeft => {
                self.skip_outer_join()?;
                JoinKind::LeftOuter
            }
            Token::KwRight => {
                self.skip_outer_join()?;
                JoinKind::RightOuter
            }
            Token::KwFull => {
                self.skip_outer_join()?;
                JoinKind::FullOuter
            }
            _ => return Err(ParseError::found(&lex, "expected JOIN")),
        };

        let lex = self.scan();
        if lex.token != Token::Ident {
            return Err(ParseError::found(&lex, "expected table name"));
        }
        let table = Expr::ident(lex.lit);

        let lex = self.scan();
        if lex.token != Token::KwOn {
            return Err(ParseError::found(&lex, "expected ON keyword"));
        }

        let criterion = self.parse_comparison()?;
        self.stmt.from.joins.push(JoinSubClause {
            table,
            kind,
            criterion,
        });

        self.after_table()
    }

    /// Dispatch after `FROM <table>` or a completed join.
    fn after_table(&mut self) -> Step {
        let next = self.peek();
        let state = match next.token {
            t if t.is_terminal() => ParseState::Terminal,
            Token::KwJoin | Token::KwInner | Token::KwLeft | Token::KwRight | Token::KwFull => {
                ParseState::Join
            }
            Token::KwWhere => ParseState::Where,
            Token::KwGroup => ParseState::GroupBy,
            Token::KwOrder => ParseState::OrderBy,
            Token::KwLimit => ParseState::Limit,
            _ => return Err(ParseError::found(&next, "invalid after FROM <table>")),
        };
        Ok(Some(state))
    }

    fn parse_where(&mut self) -> Step {
        let lex = self.scan();
        if lex.token != Token::KwWhere {
            return Err(ParseError::found(&lex, "expected WHERE"));
        }

        let predicate = self.parse_predicate()?;
        self.stmt.where_clause = Some(WhereClause { predicate });

        let next = self.peek();
        let state = match next.token {
            t if t.is_terminal() => ParseState::Terminal,
            Token::KwGroup => ParseState::GroupBy,
            Token::KwOrder => ParseState::OrderBy,
            Token::KwOffset => ParseState::Offset,
            Token::KwLimit => ParseState::Limit,
            _ => return Err(ParseError::found(&next, "invalid after WHERE <predicate>")),
        };
        Ok(Some(state))
    }

    fn parse_group_by(&mut self) -> Step {
        if self.stmt.group_by.is_some() {
            return Err(ParseError::at(
                "GROUP BY already defined in statement",
                self.peek().span,
            ));
        }
        self.expect_keyword_pair(Token::KwGroup, "expected GROUP BY")?;
        self.stmt.group_by = Some(GroupByClause::default());
        Ok(Some(ParseState::GroupByFields))
    }

    fn parse_group_by_fields(&mut self) -> Step {
        let fields = self.parse_field_list()?;
        if let Some(group_by) = &mut self.stmt.group_by {
            group_by.fields = fields;
        }

        let next = self.peek();
        let state = match next.token {
            t if t.is_terminal() => ParseState::Terminal,
            Token::KwOrder => ParseState::OrderBy,
            Token::KwOffset => ParseState::Offset,
            Token::KwLimit => ParseState::Limit,
            _ => return Err(ParseError::found(&next, "invalid after GROUP BY <fields>")),
        };
        Ok(Some(state))
    }

    fn parse_order_by(&mut self) -> Step {
        if self.stmt.order_by.is_some() {
            return Err(ParseError::at(
                "ORDER BY already defined in statement",
                self.peek().span,
            ));
        }
        self.expect_keyword_pair(Token::KwOrder, "expected ORDER BY")?;
        self.stmt.order_by = Some(OrderByClause::default());
        Ok(Some(ParseState::OrderByFields))
    }

    fn parse_order_by_fields(&mut self) -> Step {
        let fields = self.parse_field_list()?;
        if let Some(order_by) = &mut self.stmt.order_by {
            order_by.fields = fields;
        }

        let next = self.peek();
        let state = match next.token {
            t if t.is_terminal() => ParseState::Terminal,
            Token::KwOffset => ParseState::Offset,
            Token::KwLimit => ParseState::Limit,
            _ => return Err(ParseError::found(&next, "invalid after ORDER BY <fields>")),
        };
        Ok(Some(state))
    }

    fn parse_limit(&mut self) -> Step {
        if self.stmt.limit.is_some() {
            return Err(ParseError::at(
                "LIMIT already defined in statement",
                self.peek().span,
            ));
        }
        let lex = self.scan();
        if lex.token != Token::KwLimit {
            return Err(ParseError::found(&lex, "expected LIMIT"));
        }
        let value = self.parse_count("limit")?;
        self.stmt.limit = Some(LimitClause { value });

        let next = self.peek();
        let state = match next.token {
            t if t.is_terminal() => ParseState::Terminal,
            Token::KwOffset => ParseState::Offset,
            _ => return Err(ParseError::found(&next, "invalid after LIMIT <value>")),
        };
        Ok(Some(state))
    }

    fn parse_offset(&mut self) -> Step {
        if self.stmt.order_by.is_none() {
            return Err(ParseError::at(
                "OFFSET can only be defined for statement with ORDER BY",
                self.peek().span,
            ));
        }
        if self.stmt.offset.is_some() {
            return Err(ParseError::at(
                "OFFSET already defined in statement",
                self.peek().span,
            ));
        }
        let lex = self.scan();
        if lex.token != Token::KwOffset {
            return Err(ParseError::found(&lex, "expected OFFSET"));
        }
        let value = self.parse_count("offset")?;
        self.stmt.offset = Some(OffsetClause { value });

        let next = self.peek();
        let state = match next.token {
            t if t.is_terminal() => ParseState::Terminal,
            Token::KwLimit => ParseState::Limit,
            _ => return Err(ParseError::found(&next, "invalid after OFFSET <value>")),
        };
        Ok(Some(state))
    }

    fn parse_terminal(&mut self) -> Step {
        let lex = self.scan();
        if !lex.token.is_terminal() {
            return Err(ParseError::found(&lex, "expected EOF"));
        }
        Ok(None)
    }

    // -----------------------------------------------------------------------
    // Shared productions
    // -----------------------------------------------------------------------

    /// `JOIN` after `INNER`.
    fn expect_join(&mut self) -> Result<(), ParseError> {
        let lex = self.scan();
        if lex.token != Token::KwJoin {
            return Err(ParseError::found(&lex, "expected JOIN"));
        }
        Ok(())
    }

    /// `[OUTER] JOIN` after `LEFT`, `RIGHT` or `FULL`.
    fn skip_outer_join(&mut self) -> Result<(), ParseError> {
        if self.scan().token != Token::KwOuter {
            self.unscan();
        }
        self.expect_join()
    }

    /// `GROUP BY` / `ORDER BY`. The error quotes both lexemes.
    fn expect_keyword_pair(&mut self, first: Token, expectation: &str) -> Result<(), ParseError> {
        let l1 = self.scan();
        let l2 = self.scan();
        if l1.token != first || l2.token != Token::KwBy {
            return Err(ParseError::at(
                format!("found \"{} {}\", {expectation}", l1.lit, l2.lit),
                l1.span.merge(l2.span),
            ));
        }
        Ok(())
    }

    /// `ident (, ident)*`; the lexeme after the list is left unread.
    fn parse_field_list(&mut self) -> Result<Vec<Ident>, ParseError> {
        let mut fields = Vec::new();
        loop {
            let lex = self.scan();
            if lex.token != Token::Ident {
                return Err(ParseError::found(&lex, "expected field"));
            }
            fields.push(Ident::new(lex.lit));

            if self.scan().token != Token::Comma {
                self.unscan();
                return Ok(fields);
            }
        }
    }

    /// Non-negative integer operand of LIMIT or OFFSET.
    fn parse_count(&mut self, clause: &str) -> Result<u64, ParseError> {
        let lex = self.scan();
        if lex.token != Token::Int {
            return Err(ParseError::found(&lex, &format!("expected INT {clause} value")));
        }
        let value: i64 = lex.lit.parse().map_err(|_| {
            ParseError::at(
                format!("cannot parse {clause}, literal \"{}\" is not INT", lex.lit),
                lex.span,
            )
        })?;
        u64::try_from(value).map_err(|_| ParseError::found(&lex, "expected nonnegative INT"))
    }

    /// `comparison ((AND | OR) comparison)*`, nested to the right:
    /// `a AND b OR c` is `a AND (b OR c)`.
    fn parse_predicate(&mut self) -> Result<Expr, ParseError> {
        let mut links: Vec<(Expr, BinaryOp)> = Vec::new();
        let mut tail = Expr::Binary(self.parse_comparison()?);
        loop {
            let op = match self.scan().token {
                Token::KwAnd => BinaryOp::And,
                Token::KwOr => BinaryOp::Or,
                _ => {
                    self.unscan();
                    break;
                }
            };
            let next = Expr::Binary(self.parse_comparison()?);
            links.push((std::mem::replace(&mut tail, next), op));
        }
        Ok(links
            .into_iter()
            .rev()
            .fold(tail, |rhs, (lhs, op)| Expr::binary(lhs, op, rhs)))
    }

    /// `operand cmp-op operand`.
    fn parse_comparison(&mut self) -> Result<BinaryExpr, ParseError> {
        let lhs = self.parse_operand()?;

        let lex = self.scan();
        let op = comparison_op(lex.token)
            .ok_or_else(|| ParseError::found(&lex, "expected comparison operator"))?;

        let rhs = self.parse_operand()?;
        Ok(BinaryExpr::new(lhs, op, rhs))
    }

    /// Identifier or INT/FLOAT/STRING literal.
    fn parse_operand(&mut self) -> Result<Expr, ParseError> {
        let lex = self.scan();
        if lex.token == Token::Ident {
            return Ok(Expr::ident(lex.lit));
        }
        if !lex.token.is_value() {
            return Err(ParseError::found(&lex, "expected literal"));
        }
        let kind = match lex.token {
            Token::Int => LitKind::Int,
            Token::Float => LitKind::Float,
            _ => LitKind::String,
        };
        Ok(Expr::BasicLit(BasicLit::new(kind, lex.lit)))
    }
}

const fn comparison_op(token: Token) -> Option<BinaryOp> {
    match token {
        Token::Eq => Some(BinaryOp::Eq),
        Token::NotEq => Some(BinaryOp::NotEq),
        Token::Lt => Some(BinaryOp::Lt),
        Token::LtEq => Some(BinaryOp::LtEq),
        Token::Gt => Some(BinaryOp::Gt),
        Token::GtEq => Some(BinaryOp::GtEq),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
