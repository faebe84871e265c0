//! Post-failure debug sessions (UI-agnostic core)
//!
//! When debug mode is on and an assertion fails, the bindings visible at the
//! assertion are copied into a [`DebugSession`] and handed to a
//! [`DebugFrontend`], which blocks until the user leaves. The program then
//! continues after the assertion.

use crate::diagnostic::Diagnostic;
use crate::interpreter::Interpreter;
use crate::parser::parse_source_at;
use crate::source::SourceFile;
use crate::span::Span;
use crate::value::{NativeFunction, Snapshot, Value};
use std::io;
use std::rc::Rc;
use tracing::debug;

/// File name used in diagnostics for console input
const CONSOLE_FILE: &str = "<debug>";

/// Drives a debug session interactively
pub trait DebugFrontend {
    /// Run the session until the user ends it
    fn interact(&mut self, session: &mut DebugSession) -> io::Result<()>;
}

/// Frontend for runs without debug mode; returns immediately
#[derive(Debug, Default, Clone, Copy)]
pub struct NoFrontend;

impl DebugFrontend for NoFrontend {
    fn interact(&mut self, _session: &mut DebugSession) -> io::Result<()> {
        Ok(())
    }
}

/// Result of evaluating one line of console input
#[derive(Debug)]
pub struct EvalResult {
    /// Value of the last statement (None on error or empty input)
    pub value: Option<Value>,
    /// Diagnostics from lexing, parsing or evaluation
    pub diagnostics: Vec<Diagnostic>,
}

impl EvalResult {
    pub fn is_ok(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// What a session needs from the run besides the snapshot
#[derive(Clone, Default)]
pub struct SessionContext {
    /// Host capabilities, so instrumented functions stay callable
    pub natives: Vec<NativeFunction>,
    /// Script the snapshot's functions were defined in
    pub script: Option<Rc<SourceFile>>,
}

/// Interactive evaluation state seeded from a failing assertion's locals
///
/// State persists across lines and errors never end the session.
pub struct DebugSession {
    interpreter: Interpreter,
    script: Option<Rc<SourceFile>>,
    /// Span offset of console input; smaller offsets point into `script`
    origin: usize,
}

impl DebugSession {
    /// Start a session whose globals are a copy of `snapshot`
    pub fn new(snapshot: Snapshot) -> Self {
        Self::with_context(snapshot, SessionContext::default())
    }

    /// [`DebugSession::new`] plus the run's capabilities and script
    pub fn with_context(snapshot: Snapshot, context: SessionContext) -> Self {
        let mut interpreter = Interpreter::with_bindings(snapshot);
        for native in context.natives {
            interpreter.define_native(native);
        }
        let origin = context
            .script
            .as_ref()
            .map_or(0, |script| script.text.chars().count() + 1);

        Self {
            interpreter,
            script: context.script,
            origin,
        }
    }

    /// Evaluate a line of input; a trailing `;` is optional
    pub fn eval_line(&mut self, input: &str) -> EvalResult {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return EvalResult {
                value: None,
                diagnostics: Vec::new(),
            };
        }

        let source = if trimmed.ends_with(';') || trimmed.ends_with('}') {
            trimmed.to_string()
        } else {
            format!("{};", trimmed)
        };

        let (program, diagnostics) = parse_source_at(&source, self.origin);
        if !diagnostics.is_empty() {
            return EvalResult {
                value: None,
                diagnostics: diagnostics
                    .into_iter()
                    .map(|d| d.located_in(CONSOLE_FILE, &source))
                    .collect(),
            };
        }

        match self.interpreter.eval(&program) {
            Ok(value) => EvalResult {
                value: Some(value),
                diagnostics: Vec::new(),
            },
            Err(err) => {
                let span = err.span();
                EvalResult {
                    value: None,
                    diagnostics: vec![self.locate(err.to_diagnostic(), span, &source)],
                }
            }
        }
    }

    /// Render `diagnostic` against the text its span came from
    fn locate(&self, diagnostic: Diagnostic, span: Span, console_input: &str) -> Diagnostic {
        match &self.script {
            Some(script) if !span.is_dummy() && span.start < self.origin => {
                diagnostic.located_in(&script.path.to_string_lossy(), &script.text)
            }
            _ => diagnostic.located_in(CONSOLE_FILE, console_input),
        }
    }

    /// Bindings currently visible in the session, sorted by name
    pub fn variables(&self) -> Vec<(String, Value)> {
        self.interpreter.snapshot().into_iter().collect()
    }
}

/// Open a debug session if `condition` is exactly `false`
///
/// `context` is only built when a session opens. Returns whether one did.
pub fn maybe_debug(
    condition: &Value,
    snapshot: Snapshot,
    frontend: &mut dyn DebugFrontend,
    context: impl FnOnce() -> SessionContext,
) -> io::Result<bool> {
    if *condition != Value::Bool(false) {
        return Ok(false);
    }

    debug!(bindings = snapshot.len(), "entering debug session");
    let mut session = DebugSession::with_context(snapshot, context());
    frontend.interact(&mut session)?;
    debug!("debug session ended");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::error_codes;
    use pretty_assertions::assert_eq;

    fn session_with(bindings: &[(&str, Value)]) -> DebugSession {
        let snapshot = bindings
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect();
        DebugSession::new(snapshot)
    }

    #[test]
    fn test_eval_sees_snapshot() {
        let mut session = session_with(&[("x", Value::Number(41.0))]);
        let result = session.eval_line("x + 1");
        assert!(result.is_ok());
        assert_eq!(result.value, Some(Value::Number(42.0)));
    }

    #[test]
    fn test_state_persists_across_lines() {
        let mut session = session_with(&[]);
        assert!(session.eval_line("var n = 1;").is_ok());
        assert!(session.eval_line("n += 1").is_ok());
        assert_eq!(session.eval_line("n").value, Some(Value::Number(2.0)));
        let names: Vec<_> = session.variables().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["n"]);
    }

    #[test]
    fn test_snapshot_bindings_are_mutable() {
        let mut session = session_with(&[("x", Value::Number(1.0))]);
        assert!(session.eval_line("x = 5").is_ok());
        assert_eq!(session.variables(), vec![("x".to_string(), Value::Number(5.0))]);
    }

    #[test]
    fn test_errors_do_not_end_session() {
        let mut session = session_with(&[("x", Value::Number(1.0))]);

        let syntax = session.eval_line("x +");
        assert_eq!(syntax.diagnostics[0].file, "<debug>");

        let runtime = session.eval_line("missing");
        assert_eq!(runtime.diagnostics[0].code, error_codes::RUNTIME_ERROR);
        assert!(runtime.diagnostics[0].message.contains("missing"));

        assert_eq!(session.eval_line("x").value, Some(Value::Number(1.0)));
    }

    #[test]
    fn test_assert_in_session_is_native() {
        let mut session = session_with(&[("x", Value::Number(1.0))]);
        assert!(session.eval_line("assert x == 1").is_ok());
        let failed = session.eval_line("assert x == 2");
        assert!(failed.diagnostics[0].message.contains("Assertion failed"));
    }

    #[test]
    fn test_empty_line() {
        let result = session_with(&[]).eval_line("   ");
        assert!(result.is_ok());
        assert_eq!(result.value, None);
    }

    /// Frontend that counts sessions and evaluates fixed input
    struct Scripted {
        lines: Vec<&'static str>,
        sessions: usize,
        seen: Vec<Option<Value>>,
    }

    impl DebugFrontend for Scripted {
        fn interact(&mut self, session: &mut DebugSession) -> io::Result<()> {
            self.sessions += 1;
            for line in &self.lines {
                self.seen.push(session.eval_line(line).value);
            }
            Ok(())
        }
    }

    #[test]
    fn test_maybe_debug_triggers_only_on_false() {
        let mut frontend = Scripted {
            lines: vec!["y * 2"],
            sessions: 0,
            seen: Vec::new(),
        };
        let mut snapshot = Snapshot::new();
        snapshot.insert("y", Value::Number(4.0));

        for condition in [Value::Bool(true), Value::Null, Value::Number(0.0)] {
            let opened =
                maybe_debug(&condition, snapshot.clone(), &mut frontend, SessionContext::default);
            assert!(!opened.unwrap());
        }
        assert_eq!(frontend.sessions, 0);

        let opened = maybe_debug(&Value::Bool(false), snapshot, &mut frontend, SessionContext::default);
        assert!(opened.unwrap());
        assert_eq!(frontend.sessions, 1);
        assert_eq!(frontend.seen, vec![Some(Value::Number(8.0))]);
    }

    #[test]
    fn test_script_errors_are_located_in_the_script() {
        let text = "fn half(n) {\n  return n / missing;\n}\n";
        let (program, diagnostics) = crate::parser::parse_source(text);
        assert!(diagnostics.is_empty());
        let mut script = Interpreter::new();
        script.eval(&program).unwrap();

        let context = SessionContext {
            natives: Vec::new(),
            script: Some(Rc::new(SourceFile::new("lib.tst", text))),
        };
        let mut session = DebugSession::with_context(script.snapshot(), context);

        let inside = session.eval_line("half(4)");
        assert_eq!(inside.diagnostics[0].file, "lib.tst");
        assert_eq!(inside.diagnostics[0].line, 2);
        assert_eq!(inside.diagnostics[0].snippet, "  return n / missing;");

        let console = session.eval_line("nope");
        assert_eq!(console.diagnostics[0].file, "<debug>");
        assert_eq!(console.diagnostics[0].snippet, "nope;");
    }
}
