//! AST interpreter (tree-walking)
//!
//! Direct AST evaluation with environment-based variable storage.
//! Supports:
//! - Expression evaluation (literals, binary/unary ops, calls, indexing)
//! - Statement execution (declarations, assignments, control flow)
//! - Function calls with a fresh frame per call
//! - Block scoping with shadowing
//!
//! Functions see their own frame and the globals; enclosing locals are not
//! captured.

mod expr;
mod stmt;

use crate::ast::Program;
use crate::span::Span;
use crate::value::{NativeFunction, RuntimeError, Snapshot, Value};
use std::collections::HashMap;

/// Maximum nesting of user function calls
pub const MAX_CALL_DEPTH: usize = 128;

/// Control flow signal for handling break, continue, and return
#[derive(Debug, Clone, PartialEq)]
pub(super) enum ControlFlow {
    None,
    Break,
    Continue,
    Return(Value),
}

/// A named slot in a scope
#[derive(Debug, Clone)]
pub(super) struct Binding {
    pub(super) value: Value,
    pub(super) mutable: bool,
}

type Scope = HashMap<String, Binding>;

/// Interpreter state
pub struct Interpreter {
    /// Global variables
    pub(super) globals: Scope,
    /// Block scopes of the current frame, innermost last
    ///
    /// Empty at module level outside any block, so declarations land in
    /// `globals`.
    pub(super) scopes: Vec<Scope>,
    /// Current control flow state
    pub(super) control_flow: ControlFlow,
    /// Number of active user function calls
    pub(super) depth: usize,
}

impl Interpreter {
    /// Create a new interpreter
    pub fn new() -> Self {
        Self {
            globals: HashMap::new(),
            scopes: Vec::new(),
            control_flow: ControlFlow::None,
            depth: 0,
        }
    }

    /// Create an interpreter whose globals are a copy of `snapshot`
    ///
    /// Every seeded binding is mutable.
    pub fn with_bindings(snapshot: Snapshot) -> Self {
        let mut interpreter = Self::new();
        for (name, value) in snapshot {
            interpreter.define_global(name, value);
        }
        interpreter
    }

    /// Define (or replace) a mutable global
    pub fn define_global(&mut self, name: impl Into<String>, value: Value) {
        self.globals.insert(
            name.into(),
            Binding {
                value,
                mutable: true,
            },
        );
    }

    /// Define a host closure as a global
    pub fn define_native(&mut self, native: NativeFunction) {
        let name = native.name.to_string();
        self.globals.insert(
            name,
            Binding {
                value: Value::Native(native),
                mutable: false,
            },
        );
    }

    /// Evaluate a program, returning the value of its last statement
    ///
    /// After an error the interpreter is back at module level, so it can keep
    /// evaluating further programs against the same globals.
    pub fn eval(&mut self, program: &Program) -> Result<Value, RuntimeError> {
        let result = self.eval_statements(program);

        self.scopes.clear();
        self.control_flow = ControlFlow::None;
        self.depth = 0;

        result
    }

    fn eval_statements(&mut self, program: &Program) -> Result<Value, RuntimeError> {
        let mut last_value = Value::Null;

        for stmt in &program.statements {
            last_value = self.eval_statement(stmt)?;

            match std::mem::replace(&mut self.control_flow, ControlFlow::None) {
                ControlFlow::Return(value) => return Ok(value),
                ControlFlow::None | ControlFlow::Break | ControlFlow::Continue => {}
            }
        }

        Ok(last_value)
    }

    /// Bindings visible from the current position, innermost winning
    ///
    /// Inside a function this is the frame's locals layered over the
    /// globals, not the locals alone, so a session opened there can still
    /// reach module-level names. Names starting with `$` are host
    /// capabilities and are left out.
    pub fn snapshot(&self) -> Snapshot {
        let mut visible: HashMap<&str, &Value> = HashMap::new();
        for (name, binding) in &self.globals {
            visible.insert(name.as_str(), &binding.value);
        }
        for scope in &self.scopes {
            for (name, binding) in scope {
                visible.insert(name.as_str(), &binding.value);
            }
        }

        visible
            .into_iter()
            .filter(|(name, _)| !name.starts_with('$'))
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect()
    }

    /// Look up a global's value
    pub fn global(&self, name: &str) -> Option<&Value> {
        self.globals.get(name).map(|binding| &binding.value)
    }

    /// Get a variable value
    pub(super) fn get_variable(&self, name: &str, span: Span) -> Result<Value, RuntimeError> {
        if let Some(binding) = self.lookup(name) {
            return Ok(binding.value.clone());
        }

        if crate::stdlib::is_builtin(name) {
            return Ok(Value::Builtin(name.into()));
        }

        Err(RuntimeError::UndefinedVariable {
            name: name.to_string(),
            span,
        })
    }

    fn lookup(&self, name: &str) -> Option<&Binding> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name))
            .or_else(|| self.globals.get(name))
    }

    /// Mutable access to an existing, reassignable binding
    pub(super) fn binding_mut(&mut self, name: &str, span: Span) -> Result<&mut Binding, RuntimeError> {
        let binding = match self.scopes.iter().rposition(|scope| scope.contains_key(name)) {
            Some(index) => self.scopes[index].get_mut(name),
            None => self.globals.get_mut(name),
        };

        match binding {
            Some(binding) if binding.mutable => Ok(binding),
            Some(_) => Err(RuntimeError::ImmutableAssignment {
                name: name.to_string(),
                span,
            }),
            None => Err(RuntimeError::UndefinedVariable {
                name: name.to_string(),
                span,
            }),
        }
    }

    /// Declare a name in the innermost scope (globals at module level)
    pub(super) fn declare(&mut self, name: &str, value: Value, mutable: bool) {
        let binding = Binding { value, mutable };
        match self.scopes.last_mut() {
            Some(scope) => {
                scope.insert(name.to_string(), binding);
            }
            None => {
                self.globals.insert(name.to_string(), binding);
            }
        }
    }

    /// Push a new scope
    pub(super) fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    /// Pop the current scope
    pub(super) fn pop_scope(&mut self) {
        self.scopes.pop();
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_source;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn run(interp: &mut Interpreter, source: &str) -> Result<Value, RuntimeError> {
        let (program, diagnostics) = parse_source(source);
        assert!(diagnostics.is_empty(), "unexpected diagnostics: {:?}", diagnostics);
        interp.eval(&program)
    }

    fn eval(source: &str) -> Value {
        run(&mut Interpreter::new(), source).unwrap()
    }

    fn eval_err(source: &str) -> RuntimeError {
        run(&mut Interpreter::new(), source).unwrap_err()
    }

    #[rstest]
    #[case("1 + 2 * 3;", Value::Number(7.0))]
    #[case("7 % 4;", Value::Number(3.0))]
    #[case("\"ab\" + \"cd\";", Value::string("abcd"))]
    #[case("\"a\" < \"b\";", Value::Bool(true))]
    #[case("[1, [2]] == [1, [2]];", Value::Bool(true))]
    #[case("!(1 > 2) && true;", Value::Bool(true))]
    #[case("null == false;", Value::Bool(false))]
    #[case("let xs = [10, 20]; xs[1];", Value::Number(20.0))]
    #[case("\"héllo\"[1];", Value::string("é"))]
    fn test_expressions(#[case] source: &str, #[case] expected: Value) {
        assert_eq!(eval(source), expected);
    }

    #[test]
    fn test_functions_and_recursion() {
        let source = "
            fn fact(n) {
                if n <= 1 { return 1; }
                return n * fact(n - 1);
            }
            fact(5);
        ";
        assert_eq!(eval(source), Value::Number(120.0));
    }

    #[test]
    fn test_loops_with_break_and_continue() {
        let source = "
            var total = 0;
            for x in range(10) {
                if x == 7 { break; }
                if x % 2 == 0 { continue; }
                total += x;
            }
            var i = 0;
            while i < 3 { i += 1; }
            total + i;
        ";
        // 1 + 3 + 5 = 9, plus 3
        assert_eq!(eval(source), Value::Number(12.0));
    }

    #[test]
    fn test_block_shadowing() {
        let source = "
            let x = 1;
            var seen = 0;
            { let x = 2; seen = x; }
            [x, seen];
        ";
        assert_eq!(
            eval(source),
            Value::array(vec![Value::Number(1.0), Value::Number(2.0)])
        );
    }

    #[test]
    fn test_arrays_have_value_semantics() {
        let source = "
            var a = [1, 2];
            var b = a;
            b[0] = 9;
            [a[0], b[0]];
        ";
        assert_eq!(
            eval(source),
            Value::array(vec![Value::Number(1.0), Value::Number(9.0)])
        );
    }

    #[test]
    fn test_functions_do_not_capture_enclosing_locals() {
        let source = "
            fn outer() {
                let hidden = 1;
                fn inner() { return hidden; }
                return inner();
            }
            outer();
        ";
        assert!(matches!(
            eval_err(source),
            RuntimeError::UndefinedVariable { name, .. } if name == "hidden"
        ));
    }

    #[test]
    fn test_let_is_immutable() {
        assert!(matches!(
            eval_err("let x = 1; x = 2;"),
            RuntimeError::ImmutableAssignment { .. }
        ));
        assert!(matches!(
            eval_err("fn f(a) { a = 2; } f(1);"),
            RuntimeError::ImmutableAssignment { .. }
        ));
    }

    #[rstest]
    #[case("1 / 0;")]
    #[case("5 % 0;")]
    fn test_divide_by_zero(#[case] source: &str) {
        assert!(matches!(eval_err(source), RuntimeError::DivideByZero { .. }));
    }

    #[test]
    fn test_conditions_must_be_bool() {
        assert!(matches!(eval_err("if 1 { }"), RuntimeError::TypeError { .. }));
        assert!(matches!(eval_err("true && 1;"), RuntimeError::TypeError { .. }));
        // Short-circuit skips the right operand
        assert_eq!(eval("false && 1;"), Value::Bool(false));
    }

    #[test]
    fn test_index_errors() {
        assert!(matches!(
            eval_err("[1][3];"),
            RuntimeError::OutOfBounds { index: 3, len: 1, .. }
        ));
        assert!(matches!(
            eval_err("[1][0.5];"),
            RuntimeError::InvalidIndex { .. }
        ));
    }

    #[test]
    fn test_native_assert_raises() {
        let err = eval_err("assert 1 == 2;");
        assert!(matches!(err, RuntimeError::AssertionFailed { .. }));
        assert_eq!(err.span().column, 7);
        assert_eq!(eval("assert true; 5;"), Value::Number(5.0));
    }

    #[test]
    fn test_runtime_error_span_points_at_construct() {
        let err = eval_err("let a = 1;\nlet b = a + \"x\";");
        assert_eq!((err.span().line, err.span().column), (2, 8));
    }

    #[test]
    fn test_stack_overflow_is_an_error() {
        // Deep recursion needs more than the default test thread stack
        let handle = std::thread::Builder::new()
            .stack_size(64 * 1024 * 1024)
            .spawn(|| {
                let err = eval_err("fn down(n) { return down(n + 1); } down(0);");
                matches!(err, RuntimeError::StackOverflow { limit: MAX_CALL_DEPTH, .. })
            })
            .unwrap();
        assert!(handle.join().unwrap());
    }

    #[test]
    fn test_state_survives_errors() {
        let mut interp = Interpreter::new();
        run(&mut interp, "var x = 1;").unwrap();
        assert!(run(&mut interp, "{ let y = 2; x = y + undefined_name; }").is_err());
        run(&mut interp, "let z = x + 1;").unwrap();
        assert_eq!(interp.global("z"), Some(&Value::Number(2.0)));
    }

    #[test]
    fn test_snapshot_shadows_and_hides_host_names() {
        let mut interp = Interpreter::new();
        interp.define_global("$record", Value::Null);
        interp.define_global("x", Value::Number(1.0));
        interp.push_scope();
        interp.declare("x", Value::Number(2.0), false);
        interp.declare("y", Value::Bool(true), false);

        let snapshot = interp.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.get("x"), Some(&Value::Number(2.0)));
        assert_eq!(snapshot.get("$record"), None);
    }

    #[test]
    fn test_with_bindings_are_mutable_copies() {
        let mut snapshot = Snapshot::new();
        snapshot.insert("n", Value::Number(1.0));
        let mut interp = Interpreter::with_bindings(snapshot.clone());
        run(&mut interp, "n = n + 1;").unwrap();
        assert_eq!(interp.global("n"), Some(&Value::Number(2.0)));
        assert_eq!(snapshot.get("n"), Some(&Value::Number(1.0)));
    }
}
