//! Interactive debug console
//!
//! Opened on each failing assertion when running with `--debug`. Lines are
//! evaluated against the bindings visible at the assertion; leaving the
//! console resumes the program.

use astest_runtime::{DebugFrontend, DebugSession, Value};
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::warn;

const PROMPT: &str = ">>> ";

/// What the console does after a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Stay,
    Resume,
}

/// rustyline-backed debug console
pub struct DebugConsole {
    editor: Option<DefaultEditor>,
    history: Option<PathBuf>,
    color: bool,
}

impl DebugConsole {
    pub fn new(history: Option<PathBuf>, color: bool) -> Self {
        Self {
            editor: None,
            history,
            color,
        }
    }

    /// Line editor, created on the first session
    fn editor(&mut self) -> io::Result<&mut DefaultEditor> {
        if self.editor.is_none() {
            let mut editor = DefaultEditor::new().map_err(readline_io)?;
            if let Some(ref path) = self.history {
                let _ = editor.load_history(path); // Ignore errors if file doesn't exist
            }
            self.editor = Some(editor);
        }
        self.editor
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "line editor unavailable"))
    }

    fn save_history(&mut self) {
        let (Some(path), Some(editor)) = (self.history.clone(), self.editor.as_mut()) else {
            return;
        };
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        if let Err(err) = editor.save_history(&path) {
            warn!(path = %path.display(), error = %err, "could not save debug history");
        }
    }
}

impl DebugFrontend for DebugConsole {
    fn interact(&mut self, session: &mut DebugSession) -> io::Result<()> {
        let banner = "Starting debug session:";
        if self.color {
            println!("{}", banner.red().bold());
        } else {
            println!("{}", banner);
        }
        println!("Type :help for commands, :continue to resume the tests.");

        let mut stdout = io::stdout();
        loop {
            let readline = self.editor()?.readline(PROMPT);
            match readline {
                Ok(line) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    let _ = self.editor()?.add_history_entry(trimmed);

                    if handle_line(session, trimmed, self.color, &mut stdout)? == Action::Resume {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C - Use :continue or Ctrl-D to resume the tests");
                }
                Err(ReadlineError::Eof) => {
                    println!();
                    break;
                }
                Err(err) => {
                    self.save_history();
                    return Err(readline_io(err));
                }
            }
        }

        self.save_history();
        Ok(())
    }
}

/// Run one console line: a `:` command or script input
pub fn handle_line(
    session: &mut DebugSession,
    line: &str,
    color: bool,
    out: &mut impl Write,
) -> io::Result<Action> {
    match line {
        ":quit" | ":q" | ":continue" | ":c" => return Ok(Action::Resume),
        ":help" | ":h" => print_help(out)?,
        ":vars" | ":v" => {
            let variables = session.variables();
            if variables.is_empty() {
                writeln!(out, "(no variables)")?;
            }
            for (name, value) in variables {
                writeln!(out, "{} = {}", name, value.repr())?;
            }
        }
        command if command.starts_with(':') => {
            writeln!(out, "Unknown command: '{}'. Type :help for commands.", command)?;
        }
        input => {
            let result = session.eval_line(input);
            for diag in &result.diagnostics {
                let text = diag.to_string();
                if color {
                    writeln!(out, "{}", text.red())?;
                } else {
                    writeln!(out, "{}", text)?;
                }
            }
            match result.value {
                None | Some(Value::Null) => {}
                Some(value) => writeln!(out, "{}", value.repr())?,
            }
        }
    }
    Ok(Action::Stay)
}

fn print_help(out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "Debug console commands:")?;
    writeln!(out, "  :help, :h              Show this help")?;
    writeln!(out, "  :vars, :v              List visible variables")?;
    writeln!(out, "  :continue, :c          Resume the tests (also :quit, :q, Ctrl-D)")?;
    writeln!(out)?;
    writeln!(out, "Anything else is evaluated, e.g. `x + 1` or `let y = len(items)`.")
}

fn readline_io(err: ReadlineError) -> io::Error {
    match err {
        ReadlineError::Io(err) => err,
        other => io::Error::new(io::ErrorKind::Other, other.to_string()),
    }
}
