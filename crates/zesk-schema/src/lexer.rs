//! Tokenizer for schema scripts.
//!
//! Only what `CREATE TABLE` dumps need: words, quoted identifiers, string
//! and number literals, and single-character punctuation. Keywords are not
//! classified here; the parser matches words case-insensitively.

/// Byte range of a token in the script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    /// Start byte offset (inclusive).
    pub start: usize,
    /// End byte offset (exclusive).
    pub end: usize,
}

/// Token kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// Bare word: keyword or unquoted identifier.
    Word(String),
    /// Backtick or double-quote identifier, unescaped.
    Quoted(String),
    /// Single-quoted string literal, unescaped.
    Str(String),
    /// Numeric literal text.
    Number(String),
    /// Any other single character.
    Punct(char),
    /// End of input.
    Eof,
}

/// A token with its location.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// Kind and payload.
    pub kind: TokenKind,
    /// Location in the script.
    pub span: Span,
}

impl Token {
    /// Returns true when the token is the bare word `word`, ignoring case.
    #[must_use]
    pub fn is_word(&self, word: &str) -> bool {
        matches!(&self.kind, TokenKind::Word(w) if w.eq_ignore_ascii_case(word))
    }

    /// Returns true when the token is the punctuation `c`.
    #[must_use]
    pub fn is_punct(&self, c: char) -> bool {
        self.kind == TokenKind::Punct(c)
    }

    /// Identifier text of a bare or quoted word.
    #[must_use]
    pub fn identifier(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::Word(w) | TokenKind::Quoted(w) => Some(w),
            _ => None,
        }
    }
}

/// A lexer over a schema script.
pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    start: usize,
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer for the given input.
    #[must_use]
    pub const fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            start: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_next(&self) -> Option<char> {
        let mut chars = self.input[self.pos..].chars();
        chars.next();
        chars.next()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_line(&mut self) {
        while self.peek().is_some_and(|c| c != '\n') {
            self.advance();
        }
    }

    /// Skips whitespace and `--`, `#` and `/* */` comments.
    fn skip_whitespace_and_comments(&mut self) {
        loop {
            while self.peek().is_some_and(char::is_whitespace) {
                self.advance();
            }
            match (self.peek(), self.peek_next()) {
                (Some('-'), Some('-')) | (Some('#'), _) => self.skip_line(),
                (Some('/'), Some('*')) => {
                    self.advance();
                    self.advance();
                    loop {
                        match self.advance() {
                            Some('*') if self.peek() == Some('/') => {
                                self.advance();
                                break;
                            }
                            None => break,
                            _ => {}
                        }
                    }
                }
                _ => break,
            }
        }
    }

    fn make_token(&self, kind: TokenKind) -> Token {
        Token {
            kind,
            span: Span {
                start: self.start,
                end: self.pos,
            },
        }
    }

    fn error(&self, message: &str) -> crate::SchemaError {
        crate::SchemaError::Parse {
            message: message.to_string(),
            position: self.start,
        }
    }

    /// Scans text between `quote` characters, handling doubled quotes and,
    /// for string literals, backslash escapes.
    fn scan_quoted(&mut self, quote: char, backslash: bool) -> crate::Result<String> {
        self.advance();
        let mut value = String::new();
        loop {
            match self.advance() {
                Some(c) if c == quote => {
                    if self.peek() == Some(quote) {
                        value.push(quote);
                        self.advance();
                    } else {
                        return Ok(value);
                    }
                }
                Some('\\') if backslash => match self.advance() {
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some('0') => value.push('\0'),
                    Some(c) => value.push(c),
                    None => return Err(self.error("Unterminated string literal")),
                },
                Some(c) => value.push(c),
                None => {
                    return Err(self.error(if backslash {
                        "Unterminated string literal"
                    } else {
                        "Unterminated quoted identifier"
                    }))
                }
            }
        }
    }

    fn scan_number(&mut self) -> Token {
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
        if self.peek() == Some('.') && self.peek_next().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }
        if self.peek().is_some_and(|c| c == 'e' || c == 'E')
            && self
                .peek_next()
                .is_some_and(|c| c.is_ascii_digit() || c == '-' || c == '+')
        {
            self.advance();
            self.advance();
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }
        self.make_token(TokenKind::Number(self.input[self.start..self.pos].to_string()))
    }

    fn scan_word(&mut self) -> Token {
        while self
            .peek()
            .is_some_and(|c| c.is_alphanumeric() || c == '_' || c == '$')
        {
            self.advance();
        }
        self.make_token(TokenKind::Word(self.input[self.start..self.pos].to_string()))
    }

    /// Scans the next token.
    pub fn next_token(&mut self) -> crate::Result<Token> {
        self.skip_whitespace_and_comments();
        self.start = self.pos;
        let Some(c) = self.peek() else {
            return Ok(self.make_token(TokenKind::Eof));
        };
        match c {
            '\'' => {
                let value = self.scan_quoted('\'', true)?;
                Ok(self.make_token(TokenKind::Str(value)))
            }
            '`' | '"' => {
                let value = self.scan_quoted(c, false)?;
                Ok(self.make_token(TokenKind::Quoted(value)))
            }
            c if c.is_ascii_digit() => Ok(self.scan_number()),
            c if c.is_alphabetic() || c == '_' => Ok(self.scan_word()),
            c => {
                self.advance();
                Ok(self.make_token(TokenKind::Punct(c)))
            }
        }
    }

    /// Tokenizes the entire input, ending with an `Eof` token.
    pub fn tokenize(&mut self) -> crate::Result<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                return Ok(tokens);
            }
        }
    }
}
