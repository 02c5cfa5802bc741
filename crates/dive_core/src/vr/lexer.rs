//! Lexer for the `.vr` world format.
//!
//! Comments are blanked out first (offsets and line numbers survive), then
//! the text is split into tokens. The lexer never fails: characters that
//! match no rule become one-character `Unknown` tokens and the grammar
//! decides what to do with them.

use super::token::{Token, TokenKind};

const SCRIPT_BEGIN: &[u8] = b"begin.tcl";
const SCRIPT_END: &[u8] = b"end.tcl";

/// Split `text` into tokens. The last token is always `Eof`.
pub fn tokenize(text: &str) -> Vec<Token> {
    let source = elide_comments(text);
    Lexer::new(&source).run()
}

/// Replace `/* */`, `%` and `//` comments with spaces.
///
/// Newlines inside block comments are kept so line numbers stay valid.
/// Comment markers inside strings and script blocks are left alone.
pub fn elide_comments(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = bytes.to_vec();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'"' => i = string_end(bytes, i),
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                let end = find_ignore_case(bytes, i + 2, b"*/").map_or(bytes.len(), |p| p + 2);
                blank(&mut out, i, end);
                i = end;
            }
            b'%' => i = blank_line(&mut out, i),
            b'/' if bytes.get(i + 1) == Some(&b'/') => i = blank_line(&mut out, i),
            _ => match script_at(bytes, i) {
                Some(script) => i = script.end,
                None => i += 1,
            },
        }
    }

    // Only whole characters are ever blanked, so this is always valid UTF-8
    String::from_utf8_lossy(&out).into_owned()
}

fn blank(out: &mut [u8], start: usize, end: usize) {
    for b in &mut out[start..end] {
        if *b != b'\n' {
            *b = b' ';
        }
    }
}

fn blank_line(out: &mut [u8], start: usize) -> usize {
    let end = out[start..]
        .iter()
        .position(|&b| b == b'\n')
        .map_or(out.len(), |p| start + p);
    blank(out, start, end);
    end
}

/// Index just past the closing quote of the string starting at `start`.
fn string_end(bytes: &[u8], start: usize) -> usize {
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'"' => return i + 1,
            _ => i += 1,
        }
    }
    bytes.len()
}

fn find_ignore_case(bytes: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    bytes
        .get(from..)?
        .windows(needle.len())
        .position(|w| w.eq_ignore_ascii_case(needle))
        .map(|p| p + from)
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'-' || b == b'.'
}

/// Byte ranges of a `begin.tcl ... end.tcl` block.
struct ScriptSpan {
    body_start: usize,
    body_end: usize,
    end: usize,
}

fn script_at(bytes: &[u8], start: usize) -> Option<ScriptSpan> {
    if start > 0 && is_ident_byte(bytes[start - 1]) {
        return None;
    }
    let head = bytes.get(start..start + SCRIPT_BEGIN.len())?;
    if !head.eq_ignore_ascii_case(SCRIPT_BEGIN) {
        return None;
    }
    let body_start = start + SCRIPT_BEGIN.len();
    if bytes.get(body_start).is_some_and(|&b| is_ident_byte(b)) {
        return None;
    }

    Some(match find_ignore_case(bytes, body_start, SCRIPT_END) {
        Some(body_end) => ScriptSpan {
            body_start,
            body_end,
            end: body_end + SCRIPT_END.len(),
        },
        None => ScriptSpan {
            body_start,
            body_end: bytes.len(),
            end: bytes.len(),
        },
    })
}

struct Lexer<'a> {
    source: &'a str,
    pos: usize,
    line: usize,
    column: usize,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            pos: 0,
            line: 1,
            column: 1,
            tokens: Vec::new(),
        }
    }

    fn run(mut self) -> Vec<Token> {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.bump();
                continue;
            }

            let start = (self.pos, self.line, self.column);
            match c {
                '{' => self.punct(TokenKind::LBrace, start),
                '}' => self.punct(TokenKind::RBrace, start),
                '(' => self.punct(TokenKind::LParen, start),
                ')' => self.punct(TokenKind::RParen, start),
                ',' => self.punct(TokenKind::Comma, start),
                ';' => self.punct(TokenKind::Semicolon, start),
                '"' => self.string(start),
                _ if self.at_number() => self.number(start),
                _ if c.is_ascii_alphabetic() || c == '_' => {
                    match script_at(self.source.as_bytes(), self.pos) {
                        Some(script) => self.script(script, start),
                        None => self.identifier(start),
                    }
                }
                _ => {
                    self.bump();
                    self.push(TokenKind::Unknown, c.to_string(), start);
                }
            }
        }

        let end = (self.pos, self.line, self.column);
        self.push(TokenKind::Eof, "", end);
        self.tokens
    }

    fn peek(&self) -> Option<char> {
        self.source[self.pos..].chars().next()
    }

    fn byte_at(&self, ahead: usize) -> Option<u8> {
        self.source.as_bytes().get(self.pos + ahead).copied()
    }

    fn bump(&mut self) {
        if let Some(c) = self.peek() {
            self.pos += c.len_utf8();
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
    }

    fn bump_while(&mut self, pred: impl Fn(char) -> bool) {
        while self.peek().is_some_and(&pred) {
            self.bump();
        }
    }

    fn push(&mut self, kind: TokenKind, text: impl Into<String>, start: (usize, usize, usize)) {
        let (offset, line, column) = start;
        self.tokens.push(Token::new(kind, text, offset, line, column));
    }

    fn punct(&mut self, kind: TokenKind, start: (usize, usize, usize)) {
        let source = self.source;
        let text = &source[self.pos..self.pos + 1];
        self.bump();
        self.push(kind, text, start);
    }

    /// A sign only starts a number when a digit or `.digit` follows.
    fn at_number(&self) -> bool {
        let digit = |ahead| self.byte_at(ahead).is_some_and(|b: u8| b.is_ascii_digit());
        match self.byte_at(0) {
            Some(b) if b.is_ascii_digit() => true,
            Some(b'.') => digit(1),
            Some(b'+' | b'-') => digit(1) || (self.byte_at(1) == Some(b'.') && digit(2)),
            _ => false,
        }
    }

    fn number(&mut self, start: (usize, usize, usize)) {
        if matches!(self.byte_at(0), Some(b'+' | b'-')) {
            self.bump();
        }
        self.bump_while(|c| c.is_ascii_digit());
        if self.byte_at(0) == Some(b'.') {
            self.bump();
            self.bump_while(|c| c.is_ascii_digit());
        }

        let digit = |b: Option<u8>| b.is_some_and(|b| b.is_ascii_digit());
        if matches!(self.byte_at(0), Some(b'e' | b'E')) {
            let signed = matches!(self.byte_at(1), Some(b'+' | b'-'));
            if digit(self.byte_at(1)) || (signed && digit(self.byte_at(2))) {
                self.bump();
                if signed {
                    self.bump();
                }
                self.bump_while(|c| c.is_ascii_digit());
            }
        }

        let source = self.source;
        self.push(TokenKind::Number, &source[start.0..self.pos], start);
    }

    /// `\x` yields `x`; an unterminated string runs to end of input.
    fn string(&mut self, start: (usize, usize, usize)) {
        self.bump();
        let mut value = String::new();
        loop {
            match self.peek() {
                None => {
                    log::debug!("unterminated string starting at line {}", start.1);
                    break;
                }
                Some('"') => {
                    self.bump();
                    break;
                }
                Some('\\') => {
                    self.bump();
                    if let Some(c) = self.peek() {
                        value.push(c);
                        self.bump();
                    }
                }
                Some(c) => {
                    value.push(c);
                    self.bump();
                }
            }
        }
        self.push(TokenKind::String, value, start);
    }

    fn identifier(&mut self, start: (usize, usize, usize)) {
        self.bump_while(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        let source = self.source;
        self.push(TokenKind::Identifier, &source[start.0..self.pos], start);
    }

    fn script(&mut self, script: ScriptSpan, start: (usize, usize, usize)) {
        let source = self.source;
        let body = source[script.body_start..script.body_end].trim();
        self.push(TokenKind::Script, body, start);
        while self.pos < script.end {
            self.bump();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(text: &str) -> Vec<TokenKind> {
        tokenize(text).into_iter().map(|t| t.kind).collect()
    }

    fn texts(text: &str) -> Vec<String> {
        tokenize(text).into_iter().map(|t| t.text).collect()
    }

    #[test]
    fn test_punctuation_and_words() {
        use TokenKind::*;
        assert_eq!(
            kinds("world { background 0.1 0.2 0.3; } (,)"),
            vec![
                Identifier, LBrace, Identifier, Number, Number, Number, Semicolon, RBrace, LParen,
                Comma, RParen, Eof
            ]
        );
    }

    #[test]
    fn test_number_forms() {
        assert_eq!(
            texts("1 -2 +3.5 .25 -.5 1e3 2.5E-2 7."),
            vec!["1", "-2", "+3.5", ".25", "-.5", "1e3", "2.5E-2", "7.", ""]
        );
    }

    #[test]
    fn test_sign_needs_digit() {
        let tokens = tokenize("- x -y");
        assert_eq!(tokens[0].kind, TokenKind::Unknown);
        assert_eq!(tokens[0].text, "-");
        assert_eq!(tokens[1].kind, TokenKind::Identifier);
        assert_eq!(tokens[2].kind, TokenKind::Unknown);
        assert_eq!(tokens[3].text, "y");
    }

    #[test]
    fn test_dangling_exponent() {
        let tokens = tokenize("1.5e");
        assert_eq!(tokens[0].text, "1.5");
        assert_eq!(tokens[1].kind, TokenKind::Identifier);
        assert_eq!(tokens[1].text, "e");
    }

    #[test]
    fn test_identifiers() {
        assert_eq!(
            texts("indexed_poly N_POLY light-color _x v"),
            vec!["indexed_poly", "N_POLY", "light-color", "_x", "v", ""]
        );
    }

    #[test]
    fn test_string_escapes() {
        let tokens = tokenize(r#""a \"quoted\" \\ path""#);
        assert_eq!(tokens[0].kind, TokenKind::String);
        assert_eq!(tokens[0].text, r#"a "quoted" \ path"#);
    }

    #[test]
    fn test_unterminated_string() {
        let tokens = tokenize("name \"open");
        assert_eq!(tokens[1].kind, TokenKind::String);
        assert_eq!(tokens[1].text, "open");
        assert!(tokens[2].is_eof());
    }

    #[test]
    fn test_comment_forms() {
        let text = "a /* b\n c */ d % e\nf // g\nh";
        assert_eq!(texts(text), vec!["a", "d", "f", "h", ""]);
    }

    #[test]
    fn test_comment_elision_preserves_offsets() {
        let text = "x /* one\ntwo */ y";
        let elided = elide_comments(text);
        assert_eq!(elided.len(), text.len());
        assert_eq!(elided.matches('\n').count(), 1);

        let tokens = tokenize(text);
        assert_eq!(tokens[1].text, "y");
        assert_eq!(tokens[1].offset, text.find('y').unwrap());
        assert_eq!(tokens[1].line, 2);
        assert_eq!(tokens[1].column, 8);
    }

    #[test]
    fn test_comment_markers_inside_strings() {
        let tokens = tokenize(r#"info "100% // not a comment" x"#);
        assert_eq!(tokens[1].text, "100% // not a comment");
        assert_eq!(tokens[2].text, "x");
    }

    #[test]
    fn test_unterminated_block_comment() {
        assert_eq!(kinds("a /* never closed\n b"), vec![TokenKind::Identifier, TokenKind::Eof]);
    }

    #[test]
    fn test_script_block() {
        let tokens = tokenize("object { begin.tcl\n set x 50% // y\n end.tcl name \"a\" }");
        assert_eq!(tokens[2].kind, TokenKind::Script);
        assert_eq!(tokens[2].text, "set x 50% // y");
        assert!(tokens[3].is_keyword("name"));
        assert_eq!(tokens[4].text, "a");
    }

    #[test]
    fn test_unclosed_script_runs_to_end() {
        let tokens = tokenize("BEGIN.TCL puts hi");
        assert_eq!(tokens[0].kind, TokenKind::Script);
        assert_eq!(tokens[0].text, "puts hi");
        assert!(tokens[1].is_eof());
    }

    #[test]
    fn test_unknown_characters() {
        let tokens = tokenize("# @ é");
        assert_eq!(tokens.len(), 4);
        assert!(tokens[..3].iter().all(|t| t.kind == TokenKind::Unknown));
        assert_eq!(tokens[2].text, "é");
        assert_eq!(tokens[2].column, 5);
    }

    #[test]
    fn test_positions() {
        let tokens = tokenize("world\n  {\n}");
        assert_eq!((tokens[0].line, tokens[0].column), (1, 1));
        assert_eq!((tokens[1].line, tokens[1].column), (2, 3));
        assert_eq!((tokens[2].line, tokens[2].column), (3, 1));
        assert_eq!(tokens[1].offset, 8);
    }
}
