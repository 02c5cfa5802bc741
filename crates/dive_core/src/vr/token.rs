//! Token types produced by the `.vr` lexer.

use std::fmt;

/// Token classification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenKind {
    LBrace,
    RBrace,
    LParen,
    RParen,
    Comma,
    Semicolon,
    /// Double-quoted string; `text` holds the unescaped contents
    String,
    Number,
    Identifier,
    /// Raw body of a `begin.tcl ... end.tcl` block
    Script,
    /// Any single character no other rule matched
    Unknown,
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TokenKind::LBrace => "'{'",
            TokenKind::RBrace => "'}'",
            TokenKind::LParen => "'('",
            TokenKind::RParen => "')'",
            TokenKind::Comma => "','",
            TokenKind::Semicolon => "';'",
            TokenKind::String => "string",
            TokenKind::Number => "number",
            TokenKind::Identifier => "identifier",
            TokenKind::Script => "script block",
            TokenKind::Unknown => "unknown character",
            TokenKind::Eof => "end of input",
        };
        f.write_str(name)
    }
}

/// A token with its source position.
///
/// `offset` is a byte offset into the original text; `line` and `column`
/// are 1-based, with columns counted in characters.
#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, offset: usize, line: usize, column: usize) -> Self {
        Self {
            kind,
            text: text.into(),
            offset,
            line,
            column,
        }
    }

    /// Check if token is EOF.
    pub fn is_eof(&self) -> bool {
        self.kind == TokenKind::Eof
    }

    /// Check for an identifier matching `keyword`, ignoring ASCII case.
    pub fn is_keyword(&self, keyword: &str) -> bool {
        self.kind == TokenKind::Identifier && self.text.eq_ignore_ascii_case(keyword)
    }

    /// Lowercased text of an identifier; `None` for every other kind.
    pub fn keyword(&self) -> Option<String> {
        (self.kind == TokenKind::Identifier).then(|| self.text.to_ascii_lowercase())
    }

    /// Human-readable form for error messages.
    pub fn describe(&self) -> String {
        match self.kind {
            TokenKind::String => format!("string \"{}\"", self.text),
            TokenKind::Number | TokenKind::Identifier | TokenKind::Unknown => {
                format!("{} '{}'", self.kind, self.text)
            }
            _ => self.kind.to_string(),
        }
    }
}
