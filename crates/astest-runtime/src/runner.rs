//! Top-level test runs
//!
//! A run loads one file, instruments its assertions, executes it once and
//! prints the summary. Every failure is reported through [`RunError`], which
//! also knows the process exit code for it.

use crate::debug::{DebugFrontend, NoFrontend};
use crate::diagnostic::Diagnostic;
use crate::executor::{compile, CompileError, CompiledUnit, Executor};
use crate::parser::parse_source;
use crate::recorder::{RecorderOptions, TestRecorder};
use crate::rewriter::AssertionRewriter;
use crate::source::{SourceError, SourceLoader};
use crate::value::RuntimeError;
use std::cell::RefCell;
use std::io::{self, Write};
use std::path::Path;
use std::rc::Rc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info};

/// Why a run did not produce a summary
#[derive(Debug, Error)]
pub enum RunError {
    #[error("'{path}' doesn't exist.")]
    FileMissing { path: String },
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error("{}", render(diagnostics))]
    Syntax {
        file: String,
        diagnostics: Vec<Diagnostic>,
    },
    #[error("{}", render(&.0.diagnostics))]
    Compile(#[from] CompileError),
    /// Error raised by the program under test
    #[error("{diagnostic}")]
    Runtime {
        error: RuntimeError,
        diagnostic: Diagnostic,
    },
    #[error("No tests ran. Make sure the code does some `assert`s.")]
    NoAssertionsFound,
    #[error("failed to write test output: {0}")]
    Output(#[source] io::Error),
}

impl RunError {
    /// Process exit status for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            RunError::FileMissing { .. } => 2,
            RunError::NoAssertionsFound => 3,
            _ => 1,
        }
    }

    /// Diagnostics carried by the error, if any
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            RunError::Syntax { diagnostics, .. } => diagnostics,
            RunError::Compile(err) => &err.diagnostics,
            RunError::Runtime { diagnostic, .. } => std::slice::from_ref(diagnostic),
            _ => &[],
        }
    }
}

fn render(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Outcome of a completed run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunSummary {
    pub test_count: usize,
    pub pass_count: usize,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn fail_count(&self) -> usize {
        self.test_count - self.pass_count
    }
}

/// Settings for a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Open a debug session on each failing assertion
    pub debug: bool,
    pub recorder: RecorderOptions,
}

/// Runs one test file
pub struct Runner {
    options: RunOptions,
    out: Box<dyn Write>,
    frontend: Rc<RefCell<dyn DebugFrontend>>,
}

impl Runner {
    /// Runner writing to stdout with no debug frontend
    pub fn new(options: RunOptions) -> Self {
        Self {
            options,
            out: Box::new(io::stdout()),
            frontend: Rc::new(RefCell::new(NoFrontend)),
        }
    }

    /// Send report output to `out` instead of stdout
    pub fn with_output(mut self, out: Box<dyn Write>) -> Self {
        self.out = out;
        self
    }

    /// Frontend used for debug sessions; only consulted in debug mode
    pub fn with_frontend(mut self, frontend: Rc<RefCell<dyn DebugFrontend>>) -> Self {
        self.frontend = frontend;
        self
    }

    /// Execute the file at `path` and print its report
    pub fn run(self, path: &Path) -> Result<RunSummary, RunError> {
        let started = Instant::now();
        let sources = Rc::new(SourceLoader::new());
        let unit = prepare(&sources, path, self.options.debug)?;

        let recorder = Rc::new(RefCell::new(TestRecorder::new(
            self.out,
            self.options.recorder,
            Rc::clone(&sources),
        )));
        let frontend: Rc<RefCell<dyn DebugFrontend>> = if self.options.debug {
            self.frontend
        } else {
            Rc::new(RefCell::new(NoFrontend))
        };

        Executor::new(Rc::clone(&recorder), frontend)
            .execute(&unit)
            .map_err(|error| runtime_failure(&sources, &unit.name, error))?;

        let summary = recorder.borrow_mut().report(started.elapsed())?;
        info!(
            file = %unit.name,
            tests = summary.test_count,
            failed = summary.fail_count(),
            "run complete"
        );
        Ok(summary)
    }

    /// Load and instrument `path` without executing it
    pub fn instrument(&self, path: &Path) -> Result<CompiledUnit, RunError> {
        prepare(&SourceLoader::new(), path, self.options.debug)
    }
}

fn prepare(sources: &SourceLoader, path: &Path, debug_mode: bool) -> Result<CompiledUnit, RunError> {
    if !path.is_file() {
        return Err(RunError::FileMissing {
            path: path.display().to_string(),
        });
    }

    let name = path.to_string_lossy().into_owned();
    let source = sources.load(path)?;

    let (program, diagnostics) = parse_source(&source.text);
    if !diagnostics.is_empty() {
        return Err(RunError::Syntax {
            diagnostics: diagnostics
                .into_iter()
                .map(|d| d.located_in(&name, &source.text))
                .collect(),
            file: name,
        });
    }

    let mut rewriter = AssertionRewriter::new(name.as_str(), debug_mode);
    let program = rewriter.rewrite(program);
    debug!(file = %name, assertions = rewriter.rewritten(), "instrumented");

    compile(program, &name).map_err(|mut err| {
        err.diagnostics = err
            .diagnostics
            .into_iter()
            .map(|d| d.located_in(&name, &source.text))
            .collect();
        RunError::Compile(err)
    })
}

fn runtime_failure(sources: &SourceLoader, name: &str, error: RuntimeError) -> RunError {
    let diagnostic = error.to_diagnostic();
    let diagnostic = match sources.load(Path::new(name)) {
        Ok(source) => diagnostic.located_in(name, &source.text),
        Err(_) => diagnostic.with_file(name),
    };
    RunError::Runtime { error, diagnostic }
}
