//! Parsing (tokens to AST)
//!
//! The parser converts a stream of tokens into an Abstract Syntax Tree (AST).
//! Uses Pratt parsing for expressions and recursive descent for statements.

mod expr;
mod stmt;

use crate::ast::*;
use crate::diagnostic::{error_codes, Diagnostic};
use crate::lexer::Lexer;
use crate::token::{Token, TokenKind};

/// Deepest nesting of expressions and blocks the parser accepts
pub const MAX_NESTING_DEPTH: usize = 100;

/// Parser state for building AST from tokens
pub struct Parser {
    pub(super) tokens: Vec<Token>,
    pub(super) current: usize,
    pub(super) diagnostics: Vec<Diagnostic>,
    /// Current expression/block nesting
    pub(super) depth: usize,
}

/// Operator precedence levels for Pratt parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(super) enum Precedence {
    Lowest,
    Or,         // ||
    And,        // &&
    Equality,   // == !=
    Comparison, // < <= > >=
    Term,       // + -
    Factor,     // * / %
    Unary,      // ! -
    Call,       // () []
}

impl Parser {
    /// Create a new parser for the given tokens
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            current: 0,
            diagnostics: Vec::new(),
            depth: 0,
        }
    }

    /// Parse tokens into an AST
    pub fn parse(&mut self) -> (Program, Vec<Diagnostic>) {
        let mut statements = Vec::new();

        while !self.is_at_end() {
            match self.parse_statement() {
                Ok(stmt) => statements.push(stmt),
                Err(()) => self.synchronize(),
            }
        }

        (Program { statements }, std::mem::take(&mut self.diagnostics))
    }

    // === Token navigation ===

    /// Current token
    pub(super) fn peek(&self) -> &Token {
        // The token stream always ends with Eof, and `advance` never moves past it
        &self.tokens[self.current.min(self.tokens.len() - 1)]
    }

    /// Most recently consumed token
    pub(super) fn previous(&self) -> &Token {
        &self.tokens[self.current.saturating_sub(1)]
    }

    /// Consume the current token and return it
    pub(super) fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }

    pub(super) fn is_at_end(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    /// Check whether the current token has the given kind
    pub(super) fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    /// Consume the current token if it has the given kind
    pub(super) fn match_token(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Consume a token of the given kind or record an error
    pub(super) fn consume(&mut self, kind: TokenKind, message: &str) -> Result<&Token, ()> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            self.error_at_current(message);
            Err(())
        }
    }

    /// Consume an identifier, describing what it should name on failure
    pub(super) fn consume_identifier(&mut self, what: &str) -> Result<Identifier, ()> {
        if self.check(TokenKind::Identifier) {
            let token = self.advance();
            Ok(Identifier::new(token.lexeme.clone(), token.span))
        } else {
            self.error_at_current(&format!("Expected {}", what));
            Err(())
        }
    }

    // === Errors ===

    /// Record a syntax error at the current token
    pub(super) fn error_at_current(&mut self, message: &str) {
        let token = self.peek();
        // The lexer already reported error tokens
        if token.kind == TokenKind::Error {
            return;
        }
        let found = match token.kind {
            TokenKind::Eof => "end of file".to_string(),
            TokenKind::String => "string literal".to_string(),
            _ => format!("'{}'", token.lexeme),
        };
        let diagnostic = Diagnostic::error(format!("{}, found {}", message, found), token.span);
        self.diagnostics.push(diagnostic);
    }

    /// Run `parse` one nesting level deeper, failing past [`MAX_NESTING_DEPTH`]
    pub(super) fn nested<T>(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<T, ()>,
    ) -> Result<T, ()> {
        if self.depth >= MAX_NESTING_DEPTH {
            let span = self.peek().span;
            self.diagnostics.push(Diagnostic::error_with_code(
                error_codes::NESTING_TOO_DEEP,
                format!("Nesting deeper than {} levels", MAX_NESTING_DEPTH),
                span,
            ));
            return Err(());
        }

        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    /// Skip tokens until a likely statement boundary
    fn synchronize(&mut self) {
        if !self.is_at_end() {
            self.advance();
        }

        while !self.is_at_end() {
            if matches!(
                self.previous().kind,
                TokenKind::Semicolon | TokenKind::RightBrace
            ) {
                return;
            }

            match self.peek().kind {
                TokenKind::Let
                | TokenKind::Var
                | TokenKind::Fn
                | TokenKind::If
                | TokenKind::While
                | TokenKind::For
                | TokenKind::Return
                | TokenKind::Assert => return,
                _ => {
                    self.advance();
                }
            }
        }
    }

    /// Record an invalid assignment target
    pub(super) fn invalid_assign_target(&mut self, expr: &Expr) {
        self.diagnostics.push(
            Diagnostic::error_with_code(
                error_codes::INVALID_ASSIGN_TARGET,
                "Invalid assignment target",
                expr.span(),
            )
            .with_help("only variables and `name[index]` can be assigned to"),
        );
    }
}

/// Lex and parse a complete source text
///
/// Lexer and parser diagnostics are returned together; the program is only
/// meaningful when no error diagnostics were produced.
pub fn parse_source(source: &str) -> (Program, Vec<Diagnostic>) {
    parse_source_at(source, 0)
}

/// [`parse_source`] with span offsets starting at `origin`
pub fn parse_source_at(source: &str, origin: usize) -> (Program, Vec<Diagnostic>) {
    let (tokens, mut diagnostics) = Lexer::with_origin(source, origin).tokenize();
    let (program, parse_diagnostics) = Parser::new(tokens).parse();
    diagnostics.extend(parse_diagnostics);
    (program, diagnostics)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_program() {
        let (program, diagnostics) = parse_source("// nothing here\n");
        assert!(program.statements.is_empty());
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_recovers_after_error() {
        let (program, diagnostics) = parse_source("let = 1;\nassert true;");
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains("Expected a variable name"));
        assert_eq!(program.statements.len(), 1);
        assert!(matches!(program.statements[0], Stmt::Assert(_)));
    }

    #[test]
    fn test_lexer_errors_are_not_duplicated() {
        let (_, diagnostics) = parse_source("assert @;");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, error_codes::UNEXPECTED_CHAR);
    }
}
