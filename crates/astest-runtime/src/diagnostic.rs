//! Diagnostics for lexing, parsing and compilation
//!
//! Everything detected before execution starts is a [`Diagnostic`]. Run-time
//! failures are [`RuntimeError`](crate::value::RuntimeError)s, converted to
//! diagnostics only for display.

use crate::span::Span;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Error codes, grouped by phase
pub mod error_codes {
    /// Unexpected character
    pub const UNEXPECTED_CHAR: &str = "AS1001";
    /// Unterminated string literal
    pub const UNTERMINATED_STRING: &str = "AS1002";
    /// Invalid escape sequence
    pub const INVALID_ESCAPE: &str = "AS1003";
    /// Invalid number literal
    pub const INVALID_NUMBER: &str = "AS1004";
    /// Generic syntax error
    pub const SYNTAX_ERROR: &str = "AS2001";
    /// Invalid assignment target
    pub const INVALID_ASSIGN_TARGET: &str = "AS2002";
    /// Expressions or blocks nested past the parser's limit
    pub const NESTING_TOO_DEEP: &str = "AS2003";
    /// `return` outside of a function
    pub const RETURN_OUTSIDE_FUNCTION: &str = "AS3001";
    /// `break`/`continue` outside of a loop
    pub const JUMP_OUTSIDE_LOOP: &str = "AS3002";
    /// Parameter name used twice
    pub const DUPLICATE_PARAMETER: &str = "AS3003";
    /// Error raised while the program runs
    pub const RUNTIME_ERROR: &str = "AS4001";
}

/// Severity level of a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticLevel {
    Error,
    Warning,
}

impl fmt::Display for DiagnosticLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticLevel::Error => write!(f, "error"),
            DiagnosticLevel::Warning => write!(f, "warning"),
        }
    }
}

/// A diagnostic message (error or warning)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Severity level
    pub level: DiagnosticLevel,
    /// Error code (e.g., "AS2001")
    pub code: String,
    /// Main diagnostic message
    pub message: String,
    /// File path
    pub file: String,
    /// Line number (1-based)
    pub line: usize,
    /// Column number (1-based, for display)
    pub column: usize,
    /// Length of the offending span
    pub length: usize,
    /// Source line the diagnostic points into
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub snippet: String,
    /// Suggested fix (optional)
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub help: Option<String>,
}

impl Diagnostic {
    /// Create a new error diagnostic with code
    pub fn error_with_code(code: impl Into<String>, message: impl Into<String>, span: Span) -> Self {
        Self {
            level: DiagnosticLevel::Error,
            code: code.into(),
            message: message.into(),
            file: "<unknown>".to_string(),
            line: span.line.max(1) as usize,
            column: span.column as usize + 1,
            length: span.len(),
            snippet: String::new(),
            help: None,
        }
    }

    /// Create a generic syntax error
    pub fn error(message: impl Into<String>, span: Span) -> Self {
        Self::error_with_code(error_codes::SYNTAX_ERROR, message, span)
    }

    /// Create a warning diagnostic with code
    pub fn warning_with_code(
        code: impl Into<String>,
        message: impl Into<String>,
        span: Span,
    ) -> Self {
        Self {
            level: DiagnosticLevel::Warning,
            ..Self::error_with_code(code, message, span)
        }
    }

    /// Set the file path
    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = file.into();
        self
    }

    /// Set the source line snippet
    pub fn with_snippet(mut self, snippet: impl Into<String>) -> Self {
        self.snippet = snippet.into();
        self
    }

    /// Set a suggested fix
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Fill in file and snippet from the full source text
    pub fn located_in(self, file: &str, source: &str) -> Self {
        let snippet = source
            .lines()
            .nth(self.line.saturating_sub(1))
            .unwrap_or("")
            .to_string();
        self.with_file(file).with_snippet(snippet)
    }

    /// Whether this is an error (as opposed to a warning)
    pub fn is_error(&self) -> bool {
        self.level == DiagnosticLevel::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}: {}[{}]: {}",
            self.file, self.line, self.column, self.level, self.code, self.message
        )?;
        if !self.snippet.is_empty() {
            write!(f, "\n    | {}", self.snippet)?;
            let pad = " ".repeat(self.column.saturating_sub(1));
            let carets = "^".repeat(self.length.max(1));
            write!(f, "\n    | {}{}", pad, carets)?;
        }
        if let Some(help) = &self.help {
            write!(f, "\n    = help: {}", help)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_display_with_snippet() {
        let span = Span::new(4, 5, (1, 4), (1, 5));
        let diag = Diagnostic::error("Expected ';' after expression", span)
            .located_in("t.tst", "let x 1;");
        assert_eq!(
            diag.to_string(),
            "t.tst:1:5: error[AS2001]: Expected ';' after expression\n    | let x 1;\n    |     ^"
        );
    }

    #[test]
    fn test_warning_level() {
        let diag = Diagnostic::warning_with_code("AS9999", "odd", Span::dummy());
        assert!(!diag.is_error());
        assert_eq!(diag.line, 1);
    }
}
