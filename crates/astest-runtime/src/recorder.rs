//! Assertion outcome recording and reporting
//!
//! One [`TestRecorder`] belongs to one run. It numbers assertions in the
//! order they execute, prints a line per outcome, and prints the summary.

use crate::runner::{RunError, RunSummary};
use crate::snippet;
use crate::source::{SourceError, SourceLoader};
use crate::span::Location;
use crate::value::Value;
use colored::{Color, Colorize};
use std::io::{self, IsTerminal, Write};
use std::path::Path;
use std::rc::Rc;
use std::time::Duration;
use thiserror::Error;
use tracing::trace;

/// Width used when no terminal size can be determined
pub const DEFAULT_WIDTH: usize = 80;

/// Room left after the dotted prefix for the outcome word
const OUTCOME_WIDTH: usize = 6;

/// Where the output width comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidthSource {
    Fixed(usize),
    /// Queried from the terminal each time it is needed
    Terminal,
}

impl WidthSource {
    pub fn columns(&self) -> usize {
        match self {
            WidthSource::Fixed(width) => *width,
            WidthSource::Terminal => terminal_width(),
        }
    }
}

/// Current terminal width
///
/// Falls back to `COLUMNS`, then [`DEFAULT_WIDTH`], when stdout is not a
/// terminal.
pub fn terminal_width() -> usize {
    if io::stdout().is_terminal() {
        if let Ok((columns, _)) = crossterm::terminal::size() {
            if columns > 0 {
                return usize::from(columns);
            }
        }
    }

    std::env::var("COLUMNS")
        .ok()
        .and_then(|value| value.trim().parse().ok())
        .filter(|&columns: &usize| columns > 0)
        .unwrap_or(DEFAULT_WIDTH)
}

/// Output settings for a recorder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecorderOptions {
    /// Emit ANSI colour codes
    pub color: bool,
    pub width: WidthSource,
}

impl Default for RecorderOptions {
    fn default() -> Self {
        Self {
            color: true,
            width: WidthSource::Terminal,
        }
    }
}

/// Counters of one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TestRun {
    pub test_count: usize,
    pub pass_count: usize,
}

impl TestRun {
    pub fn fail_count(&self) -> usize {
        self.test_count - self.pass_count
    }
}

/// Failure to write an outcome
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("failed to write test output: {0}")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Source(#[from] SourceError),
}

/// Records assertion outcomes for one run
pub struct TestRecorder {
    out: Box<dyn Write>,
    options: RecorderOptions,
    sources: Rc<SourceLoader>,
    run: TestRun,
}

impl TestRecorder {
    pub fn new(out: Box<dyn Write>, options: RecorderOptions, sources: Rc<SourceLoader>) -> Self {
        Self {
            out,
            options,
            sources,
            run: TestRun::default(),
        }
    }

    /// Loader serving this run's snippets
    pub fn sources(&self) -> Rc<SourceLoader> {
        Rc::clone(&self.sources)
    }

    /// Counters so far
    pub fn run(&self) -> TestRun {
        self.run
    }

    /// Record one assertion outcome; only `true` passes
    ///
    /// Returns whether the assertion passed.
    pub fn record(
        &mut self,
        condition: &Value,
        filepath: &str,
        location: Location,
    ) -> Result<bool, RecordError> {
        self.run.test_count += 1;
        let passed = condition.is_true();

        let label = format!("Test {}", self.run.test_count);
        let width = self.options.width.columns().saturating_sub(OUTCOME_WIDTH);
        write!(self.out, "{:.<width$}", label, width = width)?;

        if passed {
            self.run.pass_count += 1;
            let outcome = self.paint("PASSED", Color::Green);
            writeln!(self.out, "{}", outcome)?;
        } else {
            let outcome = self.paint("FAILED", Color::Red);
            writeln!(self.out, "{}", outcome)?;
            let source = self.sources.load(Path::new(filepath))?;
            let snippet = self.paint(&snippet::extract_lines(&source.lines, location), Color::Red);
            writeln!(self.out, "Failing test: {}", snippet)?;
        }
        self.out.flush()?;

        trace!(test = self.run.test_count, passed, %location, "recorded assertion");
        Ok(passed)
    }

    /// Print the summary line
    ///
    /// A run that recorded nothing is an error, and prints nothing.
    pub fn report(&mut self, elapsed: Duration) -> Result<RunSummary, RunError> {
        let run = self.run;
        if run.test_count == 0 {
            return Err(RunError::NoAssertionsFound);
        }

        let seconds = elapsed.as_secs_f64();
        let (text, color) = if run.fail_count() == 0 {
            (
                format!(" {} passed in {:.2} seconds ", run.pass_count, seconds),
                Color::Green,
            )
        } else {
            (
                format!(
                    " {} failed, {} passed in {:.2} seconds ",
                    run.fail_count(),
                    run.pass_count,
                    seconds
                ),
                Color::Red,
            )
        };

        let (left, right) = centered(&text, self.options.width.columns());
        let line = format!("{}{}{}", "=".repeat(left), self.paint(&text, color), "=".repeat(right));
        writeln!(self.out, "{}", line)
            .and_then(|()| self.out.flush())
            .map_err(RunError::Output)?;

        Ok(RunSummary {
            test_count: run.test_count,
            pass_count: run.pass_count,
            elapsed,
        })
    }

    fn paint(&self, text: &str, color: Color) -> String {
        if self.options.color {
            text.color(color).bold().to_string()
        } else {
            text.to_string()
        }
    }
}

/// Fill on each side to centre `text` in `width` columns; extra goes right
fn centered(text: &str, width: usize) -> (usize, usize) {
    let pad = width.saturating_sub(text.chars().count());
    let left = pad / 2;
    (left, pad - left)
}
