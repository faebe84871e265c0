//! Runtime value representation
//!
//! - Numbers, Bools, Null: immediate values
//! - Strings: reference-counted, immutable (`Rc<str>`)
//! - Arrays and maps: copy-on-write (`Rc::make_mut`), value semantics
//! - Functions: user declarations, builtins by name, or host closures
//!
//! Values are single-threaded (`Rc`); a run never crosses threads.

use crate::ast::{Block, Identifier};
use crate::diagnostic::{error_codes, Diagnostic};
use crate::span::Span;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;
use thiserror::Error;

/// Copy-on-write array. Cheap to clone (refcount bump).
/// Mutations on a shared array clone the inner Vec first.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ValueArray(Rc<Vec<Value>>);

impl ValueArray {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_vec(v: Vec<Value>) -> Self {
        ValueArray(Rc::new(v))
    }

    pub fn as_slice(&self) -> &[Value] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.0.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.0.iter()
    }

    /// Mutating access; clones the elements if the array is shared
    pub fn push(&mut self, value: Value) {
        Rc::make_mut(&mut self.0).push(value);
    }

    /// Replace an element; false when `index` is out of bounds
    pub fn set(&mut self, index: usize, value: Value) -> bool {
        let inner = Rc::make_mut(&mut self.0);
        match inner.get_mut(index) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }
}

impl FromIterator<Value> for ValueArray {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        ValueArray::from_vec(iter.into_iter().collect())
    }
}

/// Copy-on-write, string-keyed map with sorted iteration
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ValueMap(Rc<BTreeMap<String, Value>>);

impl ValueMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        Rc::make_mut(&mut self.0).insert(key.into(), value);
    }

    pub fn iter(&self) -> std::collections::btree_map::Iter<'_, String, Value> {
        self.0.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }
}

impl From<BTreeMap<String, Value>> for ValueMap {
    fn from(map: BTreeMap<String, Value>) -> Self {
        ValueMap(Rc::new(map))
    }
}

/// A function declared in script source
#[derive(Debug)]
pub struct UserFunction {
    pub name: String,
    pub params: Vec<Identifier>,
    pub body: Block,
}

/// Signature of host closures callable from scripts
///
/// The span is the call site, for error reporting.
pub type NativeFn = Rc<dyn Fn(&[Value], Span) -> Result<Value, RuntimeError>>;

/// A named host closure
#[derive(Clone)]
pub struct NativeFunction {
    pub name: Rc<str>,
    pub func: NativeFn,
}

impl NativeFunction {
    pub fn new(
        name: &str,
        func: impl Fn(&[Value], Span) -> Result<Value, RuntimeError> + 'static,
    ) -> Self {
        Self {
            name: Rc::from(name),
            func: Rc::new(func),
        }
    }

    pub fn call(&self, args: &[Value], span: Span) -> Result<Value, RuntimeError> {
        (self.func)(args, span)
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeFunction({})", self.name)
    }
}

/// Runtime value type
#[derive(Clone, Debug)]
pub enum Value {
    Number(f64),
    String(Rc<str>),
    Bool(bool),
    Null,
    Array(ValueArray),
    Map(ValueMap),
    /// User-declared function
    Function(Rc<UserFunction>),
    /// Standard library function, looked up by name
    Builtin(Rc<str>),
    /// Host closure
    Native(NativeFunction),
}

impl Value {
    pub fn string(s: impl AsRef<str>) -> Self {
        Value::String(Rc::from(s.as_ref()))
    }

    pub fn array(values: Vec<Value>) -> Self {
        Value::Array(ValueArray::from_vec(values))
    }

    /// Name of this value's type as scripts see it (`type_of`)
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Bool(_) => "bool",
            Value::Null => "null",
            Value::Array(_) => "array",
            Value::Map(_) => "map",
            Value::Function(_) | Value::Builtin(_) | Value::Native(_) => "function",
        }
    }

    /// Whether this value is exactly `true`
    pub fn is_true(&self) -> bool {
        matches!(self, Value::Bool(true))
    }

    /// Rendering used inside containers and by the debug console:
    /// strings are quoted, everything else matches `Display`
    pub fn repr(&self) -> String {
        match self {
            Value::String(s) => format!("{:?}", s.as_ref()),
            other => other.to_string(),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Null, Value::Null) => true,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Builtin(a), Value::Builtin(b)) => a == b,
            (Value::Native(a), Value::Native(b)) => a.name == b.name,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // No trailing .0 for whole numbers
            Value::Number(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{}", s),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Null => write!(f, "null"),
            Value::Array(arr) => {
                let elements: Vec<String> = arr.iter().map(Value::repr).collect();
                write!(f, "[{}]", elements.join(", "))
            }
            Value::Map(map) => {
                let entries: Vec<String> = map
                    .iter()
                    .map(|(k, v)| format!("{:?}: {}", k, v.repr()))
                    .collect();
                write!(f, "{{{}}}", entries.join(", "))
            }
            Value::Function(func) => write!(f, "<fn {}>", func.name),
            Value::Builtin(name) => write!(f, "<builtin {}>", name),
            Value::Native(native) => write!(f, "<native {}>", native.name),
        }
    }
}

/// Copy of the bindings visible at one program point
///
/// Produced when an instrumented assertion evaluates its locals expression;
/// seeds the global scope of a debug session. Values are copied, so edits
/// made through a snapshot never reach the program it was taken from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot(BTreeMap<String, Value>);

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.0.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::collections::btree_map::Iter<'_, String, Value> {
        self.0.iter()
    }

    /// Map value handed to scripts
    pub fn to_value(&self) -> Value {
        Value::Map(ValueMap::from(self.0.clone()))
    }

    /// Recover a snapshot from a map value; `None` for any other value
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Map(map) => Some(Snapshot(
                map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            )),
            _ => None,
        }
    }
}

impl IntoIterator for Snapshot {
    type Item = (String, Value);
    type IntoIter = std::collections::btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl FromIterator<(String, Value)> for Snapshot {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Snapshot(iter.into_iter().collect())
    }
}

/// Runtime error types
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    /// Type error
    #[error("Type error: {msg}")]
    TypeError { msg: String, span: Span },
    /// Undefined variable
    #[error("Undefined variable: {name}")]
    UndefinedVariable { name: String, span: Span },
    /// Assignment to a `let` binding or parameter
    #[error("Cannot assign to immutable binding '{name}'")]
    ImmutableAssignment { name: String, span: Span },
    /// Division by zero
    #[error("Division by zero")]
    DivideByZero { span: Span },
    /// Invalid numeric result (NaN, Infinity)
    #[error("Invalid numeric result")]
    InvalidNumericResult { span: Span },
    /// Array index out of bounds
    #[error("Index {index} out of bounds for length {len}")]
    OutOfBounds { index: usize, len: usize, span: Span },
    /// Index that is not a non-negative whole number
    #[error("Invalid index: {msg}")]
    InvalidIndex { msg: String, span: Span },
    /// Missing map key
    #[error("Key not found: {key:?}")]
    KeyNotFound { key: String, span: Span },
    /// Wrong number of call arguments
    #[error("{name} expects {expected} argument(s), got {found}")]
    ArityMismatch {
        name: String,
        expected: usize,
        found: usize,
        span: Span,
    },
    /// Call of a non-function value
    #[error("Value of type {type_name} is not callable")]
    NotCallable { type_name: String, span: Span },
    /// Call depth limit exceeded
    #[error("Stack overflow: call depth exceeded {limit}")]
    StackOverflow { limit: usize, span: Span },
    /// Un-instrumented `assert` on a value other than `true`
    #[error("Assertion failed")]
    AssertionFailed { span: Span },
    /// `panic(msg)` from script code
    #[error("panic: {msg}")]
    Panic { msg: String, span: Span },
    /// I/O error (report output, debug console)
    #[error("I/O error: {message}")]
    Io { message: String, span: Span },
}

impl RuntimeError {
    /// Get the source span for this error
    pub fn span(&self) -> Span {
        match self {
            RuntimeError::TypeError { span, .. }
            | RuntimeError::UndefinedVariable { span, .. }
            | RuntimeError::ImmutableAssignment { span, .. }
            | RuntimeError::DivideByZero { span }
            | RuntimeError::InvalidNumericResult { span }
            | RuntimeError::OutOfBounds { span, .. }
            | RuntimeError::InvalidIndex { span, .. }
            | RuntimeError::KeyNotFound { span, .. }
            | RuntimeError::ArityMismatch { span, .. }
            | RuntimeError::NotCallable { span, .. }
            | RuntimeError::StackOverflow { span, .. }
            | RuntimeError::AssertionFailed { span }
            | RuntimeError::Panic { span, .. }
            | RuntimeError::Io { span, .. } => *span,
        }
    }

    pub fn type_error(msg: impl Into<String>, span: Span) -> Self {
        RuntimeError::TypeError {
            msg: msg.into(),
            span,
        }
    }

    pub fn io(err: std::io::Error, span: Span) -> Self {
        RuntimeError::Io {
            message: err.to_string(),
            span,
        }
    }

    /// Render as a diagnostic pointing at the failing construct
    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::error_with_code(error_codes::RUNTIME_ERROR, self.to_string(), self.span())
    }
}
