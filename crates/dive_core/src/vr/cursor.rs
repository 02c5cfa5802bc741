//! Positional reader over a token sequence.
//!
//! Every grammar rule is written against this API. It knows nothing about
//! scene semantics: it peeks, accepts, expects, reads typed values and skips
//! balanced blocks.

use dive_math::Vec3;

use super::parser::{ParseError, ParseResult};
use super::token::{Token, TokenKind};

pub struct TokenCursor {
    tokens: Vec<Token>,
    pos: usize,
}

impl TokenCursor {
    /// Wrap a token sequence. An `Eof` token is appended if missing.
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if !tokens.last().is_some_and(Token::is_eof) {
            let (offset, line, column) = tokens
                .last()
                .map_or((0, 1, 1), |t| (t.offset + t.text.len(), t.line, t.column + 1));
            tokens.push(Token::new(TokenKind::Eof, "", offset, line, column));
        }
        Self { tokens, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn rewind(&mut self, pos: usize) {
        self.pos = pos.min(self.tokens.len() - 1);
    }

    pub fn peek(&self) -> &Token {
        self.peek_at(0)
    }

    /// Look `offset` tokens ahead; past the end this is the `Eof` token.
    pub fn peek_at(&self, offset: usize) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[(self.pos + offset).min(last)]
    }

    /// Consume and return the current token. `Eof` is never consumed.
    pub fn next(&mut self) -> Token {
        let token = self.peek().clone();
        if !token.is_eof() {
            self.pos += 1;
        }
        token
    }

    pub fn is_eof(&self) -> bool {
        self.peek().is_eof()
    }

    /// Check the current token's kind and, optionally, its text (ASCII
    /// case-insensitive).
    pub fn check(&self, kind: TokenKind, value: Option<&str>) -> bool {
        let token = self.peek();
        token.kind == kind && value.map_or(true, |v| token.text.eq_ignore_ascii_case(v))
    }

    pub fn check_keyword(&self, keyword: &str) -> bool {
        self.peek().is_keyword(keyword)
    }

    /// Consume the current token if it matches, otherwise leave it.
    pub fn accept(&mut self, kind: TokenKind, value: Option<&str>) -> Option<Token> {
        if self.check(kind, value) {
            Some(self.next())
        } else {
            None
        }
    }

    pub fn accept_keyword(&mut self, keyword: &str) -> bool {
        self.accept(TokenKind::Identifier, Some(keyword)).is_some()
    }

    /// Consume the current token if it matches, otherwise fail without
    /// consuming.
    pub fn expect(&mut self, kind: TokenKind, value: Option<&str>) -> ParseResult<Token> {
        match self.accept(kind, value) {
            Some(token) => Ok(token),
            None => {
                let expected = match value {
                    Some(v) => format!("'{}'", v),
                    None => kind.to_string(),
                };
                Err(ParseError::unexpected(self.peek(), expected))
            }
        }
    }

    pub fn number(&mut self) -> ParseResult<f64> {
        let token = self.peek();
        if token.kind != TokenKind::Number {
            return Err(ParseError::unexpected(token, "number"));
        }
        let value = token
            .text
            .parse::<f64>()
            .map_err(|_| ParseError::InvalidNumber {
                line: token.line,
                column: token.column,
                text: token.text.clone(),
            })?;
        self.pos += 1;
        Ok(value)
    }

    pub fn f32(&mut self) -> ParseResult<f32> {
        Ok(self.number()? as f32)
    }

    /// Read a number that must be integral.
    pub fn integer(&mut self) -> ParseResult<i64> {
        let token = self.peek().clone();
        let value = self.number()?;
        if !value.is_finite() || value.fract() != 0.0 {
            return Err(ParseError::InvalidNumber {
                line: token.line,
                column: token.column,
                text: token.text,
            });
        }
        Ok(value as i64)
    }

    pub fn string(&mut self) -> ParseResult<String> {
        Ok(self.expect(TokenKind::String, None)?.text)
    }

    /// `[v] x y z`
    pub fn vector(&mut self) -> ParseResult<Vec3> {
        self.accept_keyword("v");
        Ok(Vec3::new(self.f32()?, self.f32()?, self.f32()?))
    }

    /// Skip `;` and `,` separators. Returns whether any were skipped.
    pub fn skip_separators(&mut self) -> bool {
        let mut skipped = false;
        while matches!(self.peek().kind, TokenKind::Semicolon | TokenKind::Comma) {
            self.pos += 1;
            skipped = true;
        }
        skipped
    }

    /// Skip a balanced `{...}` or `(...)` block starting at the current
    /// token. Returns false if the input ended before the block closed.
    pub fn skip_block(&mut self) -> bool {
        let mut depth = 0usize;
        loop {
            match self.next().kind {
                TokenKind::LBrace | TokenKind::LParen => depth += 1,
                TokenKind::RBrace | TokenKind::RParen => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return true;
                    }
                }
                TokenKind::Eof => return false,
                _ if depth == 0 => return true,
                _ => {}
            }
        }
    }

    /// Skip the value of an unrecognized keyword: a balanced block, a
    /// string, or a run of numbers (optionally after a `v` marker).
    /// Returns whether anything was consumed.
    pub fn skip_value(&mut self) -> bool {
        match self.peek().kind {
            TokenKind::LBrace | TokenKind::LParen => {
                self.skip_block();
                true
            }
            TokenKind::String => {
                self.pos += 1;
                true
            }
            _ => {
                let start = self.pos;
                if self.check_keyword("v") && self.peek_at(1).kind == TokenKind::Number {
                    self.pos += 1;
                }
                while self.peek().kind == TokenKind::Number {
                    self.pos += 1;
                }
                self.pos > start
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vr::lexer::tokenize;

    fn cursor(text: &str) -> TokenCursor {
        TokenCursor::new(tokenize(text))
    }

    #[test]
    fn test_peek_and_next() {
        let mut c = cursor("a b");
        assert_eq!(c.peek().text, "a");
        assert_eq!(c.peek_at(1).text, "b");
        assert!(c.peek_at(5).is_eof());
        assert_eq!(c.next().text, "a");
        assert_eq!(c.next().text, "b");
        assert!(c.next().is_eof());
        assert!(c.next().is_eof());
    }

    #[test]
    fn test_accept_and_expect() {
        let mut c = cursor("World { }");
        assert!(c.accept(TokenKind::Identifier, Some("object")).is_none());
        assert!(c.accept_keyword("world"));
        assert!(c.expect(TokenKind::RBrace, None).is_err());
        assert!(c.expect(TokenKind::LBrace, None).is_ok());
        assert!(c.expect(TokenKind::RBrace, None).is_ok());

        let err = c.expect(TokenKind::RBrace, None).unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedEof { .. }));
    }

    #[test]
    fn test_expect_reports_position() {
        let mut c = cursor("\n  42");
        let err = c.expect(TokenKind::String, None).unwrap_err();
        assert_eq!(
            err,
            ParseError::UnexpectedToken {
                line: 2,
                column: 3,
                expected: "string".to_string(),
                found: "number '42'".to_string(),
            }
        );
        // Nothing consumed
        assert_eq!(c.position(), 0);
    }

    #[test]
    fn test_typed_values() {
        let mut c = cursor("1.5 -3 \"s\" v 1 2 3 4 5 6");
        assert_eq!(c.number().unwrap(), 1.5);
        assert_eq!(c.integer().unwrap(), -3);
        assert_eq!(c.string().unwrap(), "s");
        assert_eq!(c.vector().unwrap(), Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(c.vector().unwrap(), Vec3::new(4.0, 5.0, 6.0));
    }

    #[test]
    fn test_integer_rejects_fraction() {
        let mut c = cursor("2.5");
        assert!(matches!(c.integer(), Err(ParseError::InvalidNumber { .. })));
    }

    #[test]
    fn test_skip_block_nested() {
        let mut c = cursor("{ a { b ( c ) } } next");
        assert!(c.skip_block());
        assert_eq!(c.peek().text, "next");

        let mut unclosed = cursor("{ a { b }");
        assert!(!unclosed.skip_block());
        assert!(unclosed.is_eof());
    }

    #[test]
    fn test_skip_value_forms() {
        let mut c = cursor("v 1 2 3 \"s\" { x } 4 5 keyword");
        assert!(c.skip_value());
        assert_eq!(c.peek().kind, TokenKind::String);
        assert!(c.skip_value());
        assert!(c.skip_value());
        assert!(c.skip_value());
        assert!(c.check_keyword("keyword"));
        assert!(!c.skip_value());
    }

    #[test]
    fn test_skip_separators() {
        let mut c = cursor(";, ; x");
        assert!(c.skip_separators());
        assert!(!c.skip_separators());
        assert_eq!(c.peek().text, "x");
    }
}
