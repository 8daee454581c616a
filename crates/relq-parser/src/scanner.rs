// SQL scanner.
//
// Turns statement text into a stream of lexemes, one per `scan()` call. The
// scanner never fails: unrecognized input comes back as an `ILLEGAL` lexeme
// and the parser decides what to do with it. Uses memchr to find the closing
// quote of string literals.

use memchr::memchr2;
use relq_ast::Span;

use crate::token::{Lexeme, Token};

/// Scanner over a borrowed statement text.
pub struct Scanner<'a> {
    src: &'a str,
    /// Current byte offset into `src`, always on a char boundary.
    pos: usize,
}

impl<'a> Scanner<'a> {
    /// Create a new scanner for the given SQL source text.
    #[must_use]
    pub const fn new(source: &'a str) -> Self {
        Self {
            src: source,
            pos: 0,
        }
    }

    /// Scan the whole input into a `Vec`, ending with the `EOF` lexeme.
    #[must_use]
    pub fn tokenize(source: &str) -> Vec<Lexeme> {
        let mut scanner = Scanner::new(source);
        let mut lexemes = Vec::new();
        loop {
            let lex = Scanner::scan(&mut scanner);
            let is_eof = lex.token == Token::Eof;
            lexemes.push(lex);
            if is_eof {
                break;
            }
        }
        lexemes
    }

    /// Byte offset of the next unread character.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.pos
    }

    /// Produce the next lexeme. Once the input is exhausted every call
    /// returns `EOF`.
    pub fn scan(&mut self) -> Lexeme {
        self.skip_whitespace();

        let start = self.pos;
        let Some(ch) = self.peek() else {
            return self.lexeme(Token::Eof, start);
        };

        match ch {
            c if c.is_alphabetic() => self.scan_word(),
            '=' | '<' | '>' => self.scan_operator(),
            c if c.is_ascii_digit() || c == '+' || c == '-' => self.scan_number(),
            '\'' | '"' => self.scan_string(),
            '*' => self.single(Token::Asterisk),
            ',' => self.single(Token::Comma),
            ';' => self.single(Token::Semicolon),
            _ => self.single(Token::Illegal),
        }
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        let mut chars = self.src[self.pos..].chars();
        chars.next();
        chars.next()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn lexeme(&self, token: Token, start: usize) -> Lexeme {
        Lexeme::new(token, &self.src[start..self.pos], span(start, self.pos))
    }

    fn single(&mut self, token: Token) -> Lexeme {
        let start = self.pos;
        self.bump();
        self.lexeme(token, start)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    /// A `.` continues a name or number only when another `.` does not
    /// follow it.
    fn at_single_dot(&self) -> bool {
        self.peek() == Some('.') && self.peek_second() != Some('.')
    }

    // -----------------------------------------------------------------------
    // Lexeme classes
    // -----------------------------------------------------------------------

    /// Identifier or keyword: letters, digits, `_` and single dots, so that
    /// `db.schema.table` stays one lexeme.
    fn scan_word(&mut self) -> Lexeme {
        let start = self.pos;
        loop {
            match self.peek() {
                Some(c) if c.is_alphanumeric() || c == '_' => {
                    self.bump();
                }
                Some('.') if self.at_single_dot() => {
                    self.bump();
                }
                _ => break,
            }
        }
        let text = &self.src[start..self.pos];
        let token = Token::lookup_keyword(text).unwrap_or(Token::Ident);
        self.lexeme(token, start)
    }

    /// `=`, `<`, `<>`, `<=`, `>`, `>=`.
    fn scan_operator(&mut self) -> Lexeme {
        let start = self.pos;
        let first = self.bump();
        match (first, self.peek()) {
            (Some('<'), Some('>' | '=')) | (Some('>'), Some('=')) => {
                self.bump();
            }
            _ => {}
        }
        let token =
            Token::lookup_operator(&self.src[start..self.pos]).unwrap_or(Token::Illegal);
        self.lexeme(token, start)
    }

    /// Number with an optional leading sign, one decimal point and one
    /// exponent marker. Classified by what the text parses as.
    fn scan_number(&mut self) -> Lexeme {
        let start = self.pos;
        self.bump(); // digit or sign

        let mut seen_dot = false;
        let mut seen_exp = false;
        loop {
            match self.peek() {
                Some(c) if c.is_ascii_digit() => {
                    self.bump();
                }
                Some('.') if !seen_dot && !seen_exp && self.at_single_dot() => {
                    seen_dot = true;
                    self.bump();
                }
                Some('e' | 'E') if !seen_exp => {
                    seen_exp = true;
                    self.bump();
                    if matches!(self.peek(), Some('+' | '-')) {
                        self.bump();
                    }
                }
                _ => break,
            }
        }

        let text = &self.src[start..self.pos];
        let token = if text.parse::<i64>().is_ok() {
            Token::Int
        } else if text.parse::<f64>().is_ok() {
            Token::Float
        } else {
            Token::Illegal
        };
        self.lexeme(token, start)
    }

    /// Quoted text through the next quotation mark, delimiters kept. There
    /// are no escapes: either quote character closes the literal.
    fn scan_string(&mut self) -> Lexeme {
        let start = self.pos;
        self.bump(); // opening quote

        match memchr2(b'\'', b'"', &self.src.as_bytes()[self.pos..]) {
            Some(offset) => {
                self.pos += offset + 1;
                self.lexeme(Token::String, start)
            }
            None => {
                self.pos = self.src.len();
                self.lexeme(Token::Illegal, start)
            }
        }
    }
}

impl Iterator for Scanner<'_> {
    type Item = Lexeme;

    /// Yields lexemes up to, not including, `EOF`.
    fn next(&mut self) -> Option<Lexeme> {
        let lex = self.scan();
        (lex.token != Token::Eof).then_some(lex)
    }
}

/// Offsets past `u32::MAX` clamp to `u32::MAX`.
fn span(start: usize, end: usize) -> Span {
    let clamp = |offset: usize| u32::try_from(offset).unwrap_or(u32::MAX);
    Span::new(clamp(start), clamp(end))
}
