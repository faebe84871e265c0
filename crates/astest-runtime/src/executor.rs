//! Compilation and execution of instrumented programs
//!
//! [`compile`] validates a rewritten tree into a [`CompiledUnit`].
//! [`Executor::execute`] runs it once in a fresh interpreter whose only
//! injected bindings are the recording and debug capabilities.

use crate::ast::*;
use crate::debug::{self, DebugFrontend, SessionContext};
use crate::diagnostic::{error_codes, Diagnostic};
use crate::interpreter::Interpreter;
use crate::recorder::{TestRecorder, TestRun};
use crate::rewriter::{MAYBE_DEBUG_FN, RECORD_FN};
use crate::span::{Location, Span};
use crate::value::{NativeFunction, RuntimeError, Snapshot, Value};
use std::cell::RefCell;
use std::collections::HashSet;
use std::path::Path;
use std::rc::Rc;
use thiserror::Error;
use tracing::{debug, info};

/// A validated program ready to execute
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledUnit {
    /// File path the unit was compiled from, used in error reports
    pub name: String,
    pub program: Program,
}

/// Errors found while compiling
#[derive(Debug, Error)]
#[error("{name}: {} compile error(s)", diagnostics.len())]
pub struct CompileError {
    pub name: String,
    pub diagnostics: Vec<Diagnostic>,
}

/// Validate `program` and package it as a unit named `name`
pub fn compile(program: Program, name: &str) -> Result<CompiledUnit, CompileError> {
    let mut validator = Validator::default();
    for stmt in &program.statements {
        validator.stmt(stmt);
    }

    if !validator.diagnostics.is_empty() {
        return Err(CompileError {
            name: name.to_string(),
            diagnostics: validator
                .diagnostics
                .into_iter()
                .map(|d| d.with_file(name))
                .collect(),
        });
    }

    debug!(unit = name, statements = program.statements.len(), "compiled");
    Ok(CompiledUnit {
        name: name.to_string(),
        program,
    })
}

/// Structural checks the parser does not make
#[derive(Default)]
struct Validator {
    in_function: bool,
    loop_depth: usize,
    diagnostics: Vec<Diagnostic>,
}

impl Validator {
    fn stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Function(func) => {
                let mut seen = HashSet::new();
                for param in &func.params {
                    if !seen.insert(param.name.as_str()) {
                        self.diagnostics.push(Diagnostic::error_with_code(
                            error_codes::DUPLICATE_PARAMETER,
                            format!("Duplicate parameter '{}' in function '{}'", param.name, func.name.name),
                            param.span,
                        ));
                    }
                }

                let outer = (self.in_function, self.loop_depth);
                self.in_function = true;
                self.loop_depth = 0;
                self.block(&func.body);
                (self.in_function, self.loop_depth) = outer;
            }
            Stmt::If(if_stmt) => {
                self.block(&if_stmt.then_block);
                if let Some(block) = &if_stmt.else_block {
                    self.block(block);
                }
            }
            Stmt::While(WhileStmt { body, .. }) | Stmt::For(ForStmt { body, .. }) => {
                self.loop_depth += 1;
                self.block(body);
                self.loop_depth -= 1;
            }
            Stmt::Block(block) => self.block(block),
            Stmt::Return(ret) if !self.in_function => {
                self.diagnostics.push(Diagnostic::error_with_code(
                    error_codes::RETURN_OUTSIDE_FUNCTION,
                    "'return' outside of a function",
                    ret.span,
                ));
            }
            Stmt::Break(span) | Stmt::Continue(span) if self.loop_depth == 0 => {
                let keyword = if matches!(stmt, Stmt::Break(_)) { "break" } else { "continue" };
                self.diagnostics.push(Diagnostic::error_with_code(
                    error_codes::JUMP_OUTSIDE_LOOP,
                    format!("'{}' outside of a loop", keyword),
                    *span,
                ));
            }
            _ => {}
        }
    }

    fn block(&mut self, block: &Block) {
        for stmt in &block.statements {
            self.stmt(stmt);
        }
    }
}

/// Runs compiled units with the injected capabilities
pub struct Executor {
    recorder: Rc<RefCell<TestRecorder>>,
    frontend: Rc<RefCell<dyn DebugFrontend>>,
}

impl Executor {
    pub fn new(recorder: Rc<RefCell<TestRecorder>>, frontend: Rc<RefCell<dyn DebugFrontend>>) -> Self {
        Self { recorder, frontend }
    }

    /// Run `unit` top to bottom, exactly once
    ///
    /// Errors raised by the program propagate unchanged.
    pub fn execute(&self, unit: &CompiledUnit) -> Result<TestRun, RuntimeError> {
        let mut interpreter = Interpreter::new();
        for native in capabilities(&self.recorder, &self.frontend, &unit.name) {
            interpreter.define_native(native);
        }

        info!(unit = %unit.name, "executing");
        interpreter.eval(&unit.program)?;

        let run = self.recorder.borrow().run();
        debug!(tests = run.test_count, passed = run.pass_count, "execution finished");
        Ok(run)
    }
}

/// The natives instrumented code calls, bound to one run
fn capabilities(
    recorder: &Rc<RefCell<TestRecorder>>,
    frontend: &Rc<RefCell<dyn DebugFrontend>>,
    name: &str,
) -> Vec<NativeFunction> {
    vec![
        record_capability(Rc::clone(recorder)),
        debug_capability(Rc::clone(recorder), Rc::clone(frontend), name.to_string()),
    ]
}

/// `$record(condition, filepath, line, column, endline, endcolumn)`
///
/// Returns `condition` unchanged.
fn record_capability(recorder: Rc<RefCell<TestRecorder>>) -> NativeFunction {
    NativeFunction::new(RECORD_FN, move |args, span| {
        let [condition, filepath, line, column, endline, endcolumn] = args else {
            return Err(arity(RECORD_FN, 6, args.len(), span));
        };
        let Value::String(filepath) = filepath else {
            return Err(RuntimeError::type_error("filepath must be a string", span));
        };
        let location = Location::new(
            position(line, span)?,
            position(column, span)?,
            position(endline, span)?,
            position(endcolumn, span)?,
        );

        recorder
            .borrow_mut()
            .record(condition, filepath, location)
            .map_err(|err| RuntimeError::Io {
                message: err.to_string(),
                span,
            })?;
        Ok(condition.clone())
    })
}

/// `$maybe_debug(condition, locals)`
///
/// Sessions get both capabilities again, so instrumented functions called
/// from the console still record. A failure while a session is already open
/// is recorded but does not open another.
fn debug_capability(
    recorder: Rc<RefCell<TestRecorder>>,
    frontend: Rc<RefCell<dyn DebugFrontend>>,
    name: String,
) -> NativeFunction {
    NativeFunction::new(MAYBE_DEBUG_FN, move |args, span| {
        let [condition, locals] = args else {
            return Err(arity(MAYBE_DEBUG_FN, 2, args.len(), span));
        };
        let Ok(mut active) = frontend.try_borrow_mut() else {
            debug!("debug session already open");
            return Ok(Value::Null);
        };

        let snapshot = Snapshot::from_value(locals).unwrap_or_default();
        let context = || SessionContext {
            natives: capabilities(&recorder, &frontend, &name),
            script: recorder.borrow().sources().load(Path::new(&name)).ok(),
        };
        debug::maybe_debug(condition, snapshot, &mut *active, context)
            .map_err(|err| RuntimeError::io(err, span))?;
        Ok(Value::Null)
    })
}

fn arity(name: &str, expected: usize, found: usize, span: Span) -> RuntimeError {
    RuntimeError::ArityMismatch {
        name: name.to_string(),
        expected,
        found,
        span,
    }
}

fn position(value: &Value, span: Span) -> Result<u32, RuntimeError> {
    match value {
        Value::Number(n) if n.fract() == 0.0 && *n >= 0.0 && *n <= f64::from(u32::MAX) => {
            Ok(*n as u32)
        }
        other => Err(RuntimeError::type_error(
            format!("location fields must be whole numbers, found {}", other.repr()),
            span,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_source;
    use rstest::rstest;

    fn compile_source(source: &str) -> Result<CompiledUnit, CompileError> {
        let (program, diagnostics) = parse_source(source);
        assert!(diagnostics.is_empty(), "unexpected diagnostics: {:?}", diagnostics);
        compile(program, "t.tst")
    }

    #[rstest]
    #[case("return 1;", error_codes::RETURN_OUTSIDE_FUNCTION)]
    #[case("if true { break; }", error_codes::JUMP_OUTSIDE_LOOP)]
    #[case("while true { fn f() { continue; } }", error_codes::JUMP_OUTSIDE_LOOP)]
    #[case("fn f(a, a) { }", error_codes::DUPLICATE_PARAMETER)]
    fn test_compile_rejects(#[case] source: &str, #[case] code: &str) {
        let err = compile_source(source).unwrap_err();
        assert_eq!(err.diagnostics.len(), 1);
        assert_eq!(err.diagnostics[0].code, code);
        assert_eq!(err.diagnostics[0].file, "t.tst");
    }

    #[test]
    fn test_compile_accepts_valid_program() {
        let unit = compile_source(
            "fn f(a) { for x in [a] { if x { break; } } return a; }\nwhile false { continue; }",
        )
        .unwrap();
        assert_eq!(unit.name, "t.tst");
        assert_eq!(unit.program.statements.len(), 2);
    }

    #[test]
    fn test_position_rejects_fractions() {
        assert_eq!(position(&Value::Number(3.0), Span::dummy()).unwrap(), 3);
        assert!(position(&Value::Number(1.5), Span::dummy()).is_err());
        assert!(position(&Value::string("1"), Span::dummy()).is_err());
    }
}
