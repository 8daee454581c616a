// SQL scanner and parser for relq SELECT statements.
//
// Hand-written scanner plus a recursive-descent parser run as a state
// machine. Produces an AST from `relq-ast`.

pub mod parser;
pub mod scanner;
pub mod token;

use relq_ast::{SelectStmt, Statement};
use relq_error::RelqError;

pub use parser::{ParseError, Parser};
pub use scanner::Scanner;
pub use token::{Lexeme, Token};

/// Parse one SELECT statement.
pub fn parse(sql: &str) -> Result<SelectStmt, ParseError> {
    Parser::new(sql).parse()
}

/// Parse one statement into the top-level [`Statement`] enum.
pub fn parse_statement(sql: &str) -> Result<Statement, ParseError> {
    parse(sql).map(Statement::Select)
}

impl From<ParseError> for RelqError {
    fn from(err: ParseError) -> Self {
        Self::syntax(err.offset(), err.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relq_error::ErrorKind;

    #[test]
    fn test_parse_statement_wraps_select() {
        let stmt = parse_statement("SELECT a FROM t").expect("valid statement");
        assert!(matches!(stmt, Statement::Select(ref s) if s.fields.len() == 1));
    }

    #[test]
    fn test_parse_error_converts_to_syntax_error() {
        let err: RelqError = parse("SELECT a FROM t OFFSET 5")
            .expect_err("OFFSET after table is rejected")
            .into();
        assert_eq!(err.kind(), ErrorKind::Syntax);
        assert_eq!(err.offset(), Some(16));
        assert_eq!(
            err.to_string(),
            "found \"OFFSET\", invalid after FROM <table>"
        );
    }
}
