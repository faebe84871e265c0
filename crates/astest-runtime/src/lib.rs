//! astest runtime - assertion instrumentation for a small script language
//!
//! This library provides:
//! - Lexing, parsing and a tree-walking interpreter for test scripts
//! - Rewriting of `assert` statements into recording calls
//! - Outcome recording, snippet extraction and the run summary
//! - A UI-agnostic debug session for failing assertions

/// astest runtime version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod ast;
pub mod debug;
pub mod diagnostic;
pub mod executor;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod recorder;
pub mod rewriter;
pub mod runner;
pub mod snippet;
pub mod source;
pub mod span;
pub mod stdlib;
pub mod token;
pub mod value;

pub use ast::{Program, VersionedProgram};
pub use debug::{DebugFrontend, DebugSession, EvalResult, NoFrontend, SessionContext};
pub use diagnostic::{error_codes, Diagnostic, DiagnosticLevel};
pub use executor::{compile, CompileError, CompiledUnit, Executor};
pub use interpreter::Interpreter;
pub use lexer::Lexer;
pub use parser::{parse_source, parse_source_at, Parser};
pub use recorder::{RecorderOptions, TestRecorder, TestRun, WidthSource};
pub use rewriter::AssertionRewriter;
pub use runner::{RunError, RunOptions, RunSummary, Runner};
pub use source::{SourceError, SourceFile, SourceLoader};
pub use span::{Location, Span};
pub use token::{Token, TokenKind};
pub use value::{NativeFunction, RuntimeError, Snapshot, Value};
