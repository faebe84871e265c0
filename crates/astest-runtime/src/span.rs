//! Source positions
//!
//! Every token and syntax node carries a [`Span`]. Lines are 1-indexed;
//! columns are 0-indexed character offsets within their line, and the end
//! column is exclusive. [`Location`] is the four-field view of a span that
//! instrumented assertions carry at run time.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A region of source text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    /// Start offset (in characters)
    pub start: usize,
    /// End offset (exclusive, in characters)
    pub end: usize,
    /// Line of the first character (1-indexed)
    pub line: u32,
    /// Column of the first character (0-indexed)
    pub column: u32,
    /// Line of the last character (1-indexed)
    pub end_line: u32,
    /// Column just past the last character (0-indexed)
    pub end_column: u32,
}

impl Span {
    /// Create a span from its offsets and line/column bounds
    pub fn new(
        start: usize,
        end: usize,
        (line, column): (u32, u32),
        (end_line, end_column): (u32, u32),
    ) -> Self {
        Self {
            start,
            end,
            line,
            column,
            end_line,
            end_column,
        }
    }

    /// Placeholder span for synthesised nodes
    ///
    /// Line 0 never occurs in real source, which is what [`Span::is_dummy`]
    /// keys on.
    pub fn dummy() -> Self {
        Self::default()
    }

    /// Whether this span is a placeholder
    pub fn is_dummy(&self) -> bool {
        self.line == 0
    }

    /// Span covering `self` through `other`
    pub fn merge(self, other: Span) -> Span {
        if self.is_dummy() {
            return other;
        }
        if other.is_dummy() {
            return self;
        }
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
            line: self.line,
            column: self.column,
            end_line: other.end_line,
            end_column: other.end_column,
        }
    }

    /// Number of characters covered
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Whether the span covers no characters
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The location fields of this span
    pub fn location(&self) -> Location {
        Location {
            line: self.line,
            column: self.column,
            endline: self.end_line,
            endcolumn: self.end_column,
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column + 1)
    }
}

/// Source range of an instrumented assertion
///
/// `(endline, endcolumn) >= (line, column)` in document order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub line: u32,
    pub column: u32,
    pub endline: u32,
    pub endcolumn: u32,
}

impl Location {
    pub fn new(line: u32, column: u32, endline: u32, endcolumn: u32) -> Self {
        Self {
            line,
            column,
            endline,
            endcolumn,
        }
    }

    /// Whether the end position is at or after the start position
    pub fn is_ordered(&self) -> bool {
        (self.endline, self.endcolumn) >= (self.line, self.column)
    }
}

impl From<Span> for Location {
    fn from(span: Span) -> Self {
        span.location()
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}-{}:{}",
            self.line, self.column, self.endline, self.endcolumn
        )
    }
}
