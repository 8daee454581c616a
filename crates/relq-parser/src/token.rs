// Lexical categories and the (token, literal) pairs the scanner produces.
//
// Token variants are declared band by band. Band membership is a range check
// over the declaration order, so a keyword or operator added inside its band
// is classified without touching the predicates below.

use std::fmt;
use std::ops::RangeInclusive;

use relq_ast::Span;

/// One scan step: the token category, its literal source text and location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lexeme {
    pub token: Token,
    pub lit: String,
    pub span: Span,
}

impl Lexeme {
    #[must_use]
    pub fn new(token: Token, lit: impl Into<String>, span: Span) -> Self {
        Self {
            token,
            lit: lit.into(),
            span,
        }
    }
}

/// Token discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Token {
    // === Special ===
    Eof,
    Illegal,

    // === Misc ===
    Asterisk,

    // === Literal class ===
    Comma,
    Semicolon,
    Ident,
    Int,
    Float,
    String,

    // === Comparison operators ===
    Eq,    // =
    NotEq, // <>
    Lt,    // <
    LtEq,  // <=
    Gt,    // >
    GtEq,  // >=

    // === Keywords ===
    KwSelect,
    KwFrom,
    KwJoin,
    KwInner,
    KwLeft,
    KwRight,
    KwFull,
    KwOuter,
    KwOn,
    KwWhere,
    KwAnd,
    KwOr,
    KwGroup,
    KwBy,
    KwOrder,
    KwLimit,
    KwOffset,
    KwHaving,
    KwDistinct,
    KwAs,
}

impl Token {
    const MISC: RangeInclusive<Self> = Self::Asterisk..=Self::Asterisk;
    const LITERALS: RangeInclusive<Self> = Self::Comma..=Self::String;
    const OPERATORS: RangeInclusive<Self> = Self::Eq..=Self::GtEq;
    const KEYWORDS: RangeInclusive<Self> = Self::KwSelect..=Self::KwAs;

    #[must_use]
    pub fn is_misc(self) -> bool {
        Self::MISC.contains(&self)
    }

    /// Literal-class band: `,`, `;`, identifiers, numbers and strings.
    #[must_use]
    pub fn is_literal(self) -> bool {
        Self::LITERALS.contains(&self)
    }

    #[must_use]
    pub fn is_comparison_operator(self) -> bool {
        Self::OPERATORS.contains(&self)
    }

    #[must_use]
    pub fn is_keyword(self) -> bool {
        Self::KEYWORDS.contains(&self)
    }

    /// `EOF` or `;`: a statement may end here.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Eof | Self::Semicolon)
    }

    /// A literal that can stand as an operand value: INT, FLOAT or STRING.
    #[must_use]
    pub const fn is_value(self) -> bool {
        matches!(self, Self::Int | Self::Float | Self::String)
    }

    /// Look up an identifier string to see if it's a keyword.
    /// Returns the keyword variant if so, else `None`.
    #[must_use]
    pub fn lookup_keyword(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "AND" => Some(Self::KwAnd),
            "AS" => Some(Self::KwAs),
            "BY" => Some(Self::KwBy),
            "DISTINCT" => Some(Self::KwDistinct),
            "FROM" => Some(Self::KwFrom),
            "FULL" => Some(Self::KwFull),
            "GROUP" => Some(Self::KwGroup),
            "HAVING" => Some(Self::KwHaving),
            "INNER" => Some(Self::KwInner),
            "JOIN" => Some(Self::KwJoin),
            "LEFT" => Some(Self::KwLeft),
            "LIMIT" => Some(Self::KwLimit),
            "OFFSET" => Some(Self::KwOffset),
            "ON" => Some(Self::KwOn),
            "OR" => Some(Self::KwOr),
            "ORDER" => Some(Self::KwOrder),
            "OUTER" => Some(Self::KwOuter),
            "RIGHT" => Some(Self::KwRight),
            "SELECT" => Some(Self::KwSelect),
            "WHERE" => Some(Self::KwWhere),
            _ => None,
        }
    }

    /// Classify a comparison operator's text.
    #[must_use]
    pub fn lookup_operator(s: &str) -> Option<Self> {
        match s {
            "=" => Some(Self::Eq),
            "<>" => Some(Self::NotEq),
            "<" => Some(Self::Lt),
            "<=" => Some(Self::LtEq),
            ">" => Some(Self::Gt),
            ">=" => Some(Self::GtEq),
            _ => None,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Eof => "EOF",
            Self::Illegal => "ILLEGAL",
            Self::Asterisk => "ASTERISK",
            Self::Comma => "COMMA",
            Self::Semicolon => "SEMICOLON",
            Self::Ident => "IDENT",
            Self::Int => "INT",
            Self::Float => "FLOAT",
            Self::String => "STRING",
            Self::Eq => "EQ",
            Self::NotEq => "NEQ",
            Self::Lt => "LT",
            Self::LtEq => "LTE",
            Self::Gt => "GT",
            Self::GtEq => "GTE",
            Self::KwSelect => "SELECT",
            Self::KwFrom => "FROM",
            Self::KwJoin => "JOIN",
            Self::KwInner => "INNER",
            Self::KwLeft => "LEFT",
            Self::KwRight => "RIGHT",
            Self::KwFull => "FULL",
            Self::KwOuter => "OUTER",
            Self::KwOn => "ON",
            Self::KwWhere => "WHERE",
            Self::KwAnd => "AND",
            Self::KwOr => "OR",
            Self::KwGroup => "GROUP BY",
            Self::KwBy => "BY",
            Self::KwOrder => "ORDER BY",
            Self::KwLimit => "LIMIT",
            Self::KwOffset => "OFFSET",
            Self::KwHaving => "HAVING",
            Self::KwDistinct => "DISTINCT",
            Self::KwAs => "AS",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Token; 35] = [
        Token::Eof,
        Token::Illegal,
        Token::Asterisk,
        Token::Comma,
        Token::Semicolon,
        Token::Ident,
        Token::Int,
        Token::Float,
        Token::String,
        Token::Eq,
        Token::NotEq,
        Token::Lt,
        Token::LtEq,
        Token::Gt,
        Token::GtEq,
        Token::KwSelect,
        Token::KwFrom,
        Token::KwJoin,
        Token::KwInner,
        Token::KwLeft,
        Token::KwRight,
        Token::KwFull,
        Token::KwOuter,
        Token::KwOn,
        Token::KwWhere,
        Token::KwAnd,
        Token::KwOr,
        Token::KwGroup,
        Token::KwBy,
        Token::KwOrder,
        Token::KwLimit,
        Token::KwOffset,
        Token::KwHaving,
        Token::KwDistinct,
        Token::KwAs,
    ];

    #[test]
    fn test_bands_are_disjoint() {
        for tok in ALL {
            let bands = [
                tok.is_misc(),
                tok.is_literal(),
                tok.is_comparison_operator(),
                tok.is_keyword(),
            ];
            let count = bands.iter().filter(|b| **b).count();
            let special = matches!(tok, Token::Eof | Token::Illegal);
            assert_eq!(count, usize::from(!special), "{tok:?} in {count} bands");
        }
    }

    #[test]
    fn test_band_membership() {
        assert!(Token::Asterisk.is_misc());
        assert!(Token::Comma.is_literal());
        assert!(Token::String.is_literal());
        assert!(Token::NotEq.is_comparison_operator());
        assert!(!Token::KwAnd.is_comparison_operator());
        assert!(Token::KwSelect.is_keyword());
        assert!(Token::KwAs.is_keyword());
        assert!(!Token::Ident.is_keyword());
    }

    #[test]
    fn test_terminal_and_value() {
        assert!(Token::Eof.is_terminal());
        assert!(Token::Semicolon.is_terminal());
        assert!(!Token::Comma.is_terminal());
        assert!(Token::Float.is_value());
        assert!(!Token::Ident.is_value());
        assert!(!Token::Comma.is_value());
    }

    #[test]
    fn test_every_keyword_round_trips_through_lookup() {
        for tok in ALL.into_iter().filter(|t| t.is_keyword()) {
            // GROUP/ORDER display with their trailing BY.
            let text = tok.to_string();
            let word = text.split(' ').next().unwrap_or_default();
            assert_eq!(Token::lookup_keyword(word), Some(tok), "{word}");
            assert_eq!(Token::lookup_keyword(&word.to_lowercase()), Some(tok));
        }
        assert_eq!(Token::lookup_keyword("tbl"), None);
    }

    #[test]
    fn test_lookup_operator() {
        assert_eq!(Token::lookup_operator("<>"), Some(Token::NotEq));
        assert_eq!(Token::lookup_operator(">="), Some(Token::GtEq));
        assert_eq!(Token::lookup_operator("!="), None);
    }
}
