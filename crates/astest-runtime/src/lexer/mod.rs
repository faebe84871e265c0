//! Lexical analysis (tokenization)
//!
//! The lexer converts astest script source into a stream of tokens. Each
//! token's span records 1-indexed lines and 0-indexed character columns,
//! which is the addressing the assertion rewriter hands to the recorder.

use crate::diagnostic::{error_codes, Diagnostic};
use crate::span::Span;
use crate::token::{Token, TokenKind};

mod literals;

/// Lexer state for tokenizing source code
pub struct Lexer {
    /// Original source code
    pub(super) source: String,
    /// Characters of source code
    pub(super) chars: Vec<char>,
    /// Current position in chars
    pub(super) current: usize,
    /// Current line number (1-indexed)
    pub(super) line: u32,
    /// Current column number (0-indexed)
    pub(super) column: u32,
    /// Start position of current token
    pub(super) start_pos: usize,
    /// Start line of current token
    pub(super) start_line: u32,
    /// Start column of current token
    pub(super) start_column: u32,
    /// Collected diagnostics
    pub(super) diagnostics: Vec<Diagnostic>,
    /// Offset added to every span's `start` and `end`
    pub(super) origin: usize,
}

impl Lexer {
    /// Create a new lexer for the given source code
    pub fn new(source: impl Into<String>) -> Self {
        let source = source.into();
        let chars: Vec<char> = source.chars().collect();
        Self {
            source,
            chars,
            current: 0,
            line: 1,
            column: 0,
            start_pos: 0,
            start_line: 1,
            start_column: 0,
            diagnostics: Vec::new(),
            origin: 0,
        }
    }

    /// Lexer whose span offsets start at `origin` instead of 0
    ///
    /// Lines and columns are unaffected.
    pub fn with_origin(source: impl Into<String>, origin: usize) -> Self {
        Self {
            origin,
            ..Self::new(source)
        }
    }

    /// Tokenize the source code, returning tokens and any diagnostics
    pub fn tokenize(&mut self) -> (Vec<Token>, Vec<Diagnostic>) {
        let mut tokens = Vec::new();

        loop {
            let token = self.next_token();
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }

        (tokens, std::mem::take(&mut self.diagnostics))
    }

    /// Scan the next token
    fn next_token(&mut self) -> Token {
        self.skip_whitespace_and_comments();

        self.start_pos = self.current;
        self.start_line = self.line;
        self.start_column = self.column;

        if self.is_at_end() {
            return self.make_token(TokenKind::Eof, "");
        }

        let c = self.advance();

        match c {
            '(' => self.make_token(TokenKind::LeftParen, "("),
            ')' => self.make_token(TokenKind::RightParen, ")"),
            '{' => self.make_token(TokenKind::LeftBrace, "{"),
            '}' => self.make_token(TokenKind::RightBrace, "}"),
            '[' => self.make_token(TokenKind::LeftBracket, "["),
            ']' => self.make_token(TokenKind::RightBracket, "]"),
            ';' => self.make_token(TokenKind::Semicolon, ";"),
            ',' => self.make_token(TokenKind::Comma, ","),

            '+' => self.with_equal(TokenKind::PlusEqual, "+=", TokenKind::Plus, "+"),
            '-' => self.with_equal(TokenKind::MinusEqual, "-=", TokenKind::Minus, "-"),
            '*' => self.with_equal(TokenKind::StarEqual, "*=", TokenKind::Star, "*"),
            '/' => self.with_equal(TokenKind::SlashEqual, "/=", TokenKind::Slash, "/"),
            '%' => self.with_equal(TokenKind::PercentEqual, "%=", TokenKind::Percent, "%"),
            '=' => self.with_equal(TokenKind::EqualEqual, "==", TokenKind::Equal, "="),
            '!' => self.with_equal(TokenKind::BangEqual, "!=", TokenKind::Bang, "!"),
            '<' => self.with_equal(TokenKind::LessEqual, "<=", TokenKind::Less, "<"),
            '>' => self.with_equal(TokenKind::GreaterEqual, ">=", TokenKind::Greater, ">"),
            '&' => {
                if self.match_char('&') {
                    self.make_token(TokenKind::AmpAmp, "&&")
                } else {
                    self.error_token("Unexpected character '&' (did you mean '&&'?)")
                }
            }
            '|' => {
                if self.match_char('|') {
                    self.make_token(TokenKind::PipePipe, "||")
                } else {
                    self.error_token("Unexpected character '|' (did you mean '||'?)")
                }
            }

            '"' => self.string(),
            c if c.is_ascii_digit() => self.number(),
            c if c.is_alphabetic() || c == '_' => self.identifier(),

            _ => self.error_token(&format!("Unexpected character '{}'", c)),
        }
    }

    /// Emit `compound` if the next character is `=`, otherwise `single`
    fn with_equal(
        &mut self,
        compound: TokenKind,
        compound_lexeme: &str,
        single: TokenKind,
        single_lexeme: &str,
    ) -> Token {
        if self.match_char('=') {
            self.make_token(compound, compound_lexeme)
        } else {
            self.make_token(single, single_lexeme)
        }
    }

    /// Skip whitespace and `//` comments
    fn skip_whitespace_and_comments(&mut self) {
        while !self.is_at_end() {
            match self.peek() {
                ' ' | '\r' | '\t' | '\n' => {
                    self.advance();
                }
                '/' if self.peek_next() == Some('/') => {
                    while !self.is_at_end() && self.peek() != '\n' {
                        self.advance();
                    }
                }
                _ => return,
            }
        }
    }

    // === Character navigation ===

    /// Advance to next character and return it, tracking line and column
    pub(super) fn advance(&mut self) -> char {
        let c = self.chars[self.current];
        self.current += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 0;
        } else {
            self.column += 1;
        }
        c
    }

    /// Peek at current character without advancing
    pub(super) fn peek(&self) -> char {
        if self.is_at_end() {
            '\0'
        } else {
            self.chars[self.current]
        }
    }

    /// Peek at next character (current + 1)
    pub(super) fn peek_next(&self) -> Option<char> {
        self.chars.get(self.current + 1).copied()
    }

    /// Check if current character matches expected, and advance if so
    fn match_char(&mut self, expected: char) -> bool {
        if self.is_at_end() || self.chars[self.current] != expected {
            false
        } else {
            self.advance();
            true
        }
    }

    /// Check if we've reached the end of source
    pub(super) fn is_at_end(&self) -> bool {
        self.current >= self.chars.len()
    }

    // === Token creation ===

    /// Span from the start of the current token to the current position
    pub(super) fn current_span(&self) -> Span {
        Span::new(
            self.origin + self.start_pos,
            self.origin + self.current,
            (self.start_line, self.start_column),
            (self.line, self.column),
        )
    }

    /// Create a token with the given kind and lexeme
    pub(super) fn make_token(&self, kind: TokenKind, lexeme: &str) -> Token {
        Token::new(kind, lexeme, self.current_span())
    }

    /// Create an error token and record a diagnostic with a specific code
    pub(super) fn error_token_with_code(&mut self, code: &str, message: &str) -> Token {
        let span = self.current_span();
        let snippet = self.line_snippet(self.start_line);

        self.diagnostics
            .push(Diagnostic::error_with_code(code, message, span).with_snippet(snippet));

        Token::new(TokenKind::Error, message, span)
    }

    /// Create an error token for invalid/unexpected characters
    pub(super) fn error_token(&mut self, message: &str) -> Token {
        self.error_token_with_code(error_codes::UNEXPECTED_CHAR, message)
    }

    /// Get the source line for a given line number
    fn line_snippet(&self, line: u32) -> String {
        self.source
            .lines()
            .nth(line.saturating_sub(1) as usize)
            .unwrap_or("")
            .to_string()
    }
}
