//! Standard library functions

use crate::span::Span;
use crate::value::{RuntimeError, Value, ValueArray};

/// Names of all builtin functions
pub const BUILTINS: &[&str] = &[
    "print", "len", "str", "type_of", "range", "push", "keys", "abs", "min", "max", "panic",
];

/// Check if a function name is a builtin
pub fn is_builtin(name: &str) -> bool {
    BUILTINS.contains(&name)
}

/// Call a builtin function
///
/// The `call_span` parameter should be the span of the function call expression
/// in the source code, used for error reporting.
pub fn call_builtin(name: &str, args: &[Value], call_span: Span) -> Result<Value, RuntimeError> {
    match name {
        "print" => {
            let parts: Vec<String> = args.iter().map(Value::to_string).collect();
            println!("{}", parts.join(" "));
            Ok(Value::Null)
        }
        "len" => {
            let [value] = expect_args::<1>(name, args, call_span)?;
            len(value, call_span)
        }
        "str" => {
            let [value] = expect_args::<1>(name, args, call_span)?;
            Ok(Value::string(value.to_string()))
        }
        "type_of" => {
            let [value] = expect_args::<1>(name, args, call_span)?;
            Ok(Value::string(value.type_name()))
        }
        "range" => range(args, call_span),
        "push" => {
            let [array, value] = expect_args::<2>(name, args, call_span)?;
            match array {
                Value::Array(arr) => {
                    let mut arr = arr.clone();
                    arr.push(value.clone());
                    Ok(Value::Array(arr))
                }
                other => Err(argument_error(name, "an array", other, call_span)),
            }
        }
        "keys" => {
            let [map] = expect_args::<1>(name, args, call_span)?;
            match map {
                Value::Map(map) => Ok(Value::Array(map.keys().map(Value::string).collect())),
                other => Err(argument_error(name, "a map", other, call_span)),
            }
        }
        "abs" => {
            let [n] = expect_args::<1>(name, args, call_span)?;
            Ok(Value::Number(number(name, n, call_span)?.abs()))
        }
        "min" | "max" => {
            let [a, b] = expect_args::<2>(name, args, call_span)?;
            let (a, b) = (number(name, a, call_span)?, number(name, b, call_span)?);
            Ok(Value::Number(if name == "min" { a.min(b) } else { a.max(b) }))
        }
        "panic" => {
            let [msg] = expect_args::<1>(name, args, call_span)?;
            Err(RuntimeError::Panic {
                msg: msg.to_string(),
                span: call_span,
            })
        }
        _ => Err(RuntimeError::UndefinedVariable {
            name: name.to_string(),
            span: call_span,
        }),
    }
}

/// Length of a string (in characters), array or map
fn len(value: &Value, span: Span) -> Result<Value, RuntimeError> {
    let length = match value {
        Value::String(s) => s.chars().count(),
        Value::Array(arr) => arr.len(),
        Value::Map(map) => map.len(),
        other => return Err(argument_error("len", "a string, array or map", other, span)),
    };
    Ok(Value::Number(length as f64))
}

/// `range(end)` or `range(start, end)`, end exclusive
fn range(args: &[Value], span: Span) -> Result<Value, RuntimeError> {
    let (start, end) = match args {
        [end] => (0.0, whole_number("range", end, span)?),
        [start, end] => (
            whole_number("range", start, span)?,
            whole_number("range", end, span)?,
        ),
        _ => {
            return Err(RuntimeError::ArityMismatch {
                name: "range".to_string(),
                expected: 2,
                found: args.len(),
                span,
            })
        }
    };

    let mut values = ValueArray::new();
    let mut n = start;
    while n < end {
        values.push(Value::Number(n));
        n += 1.0;
    }
    Ok(Value::Array(values))
}

fn expect_args<'a, const N: usize>(
    name: &str,
    args: &'a [Value],
    span: Span,
) -> Result<&'a [Value; N], RuntimeError> {
    args.try_into().map_err(|_| RuntimeError::ArityMismatch {
        name: name.to_string(),
        expected: N,
        found: args.len(),
        span,
    })
}

fn number(name: &str, value: &Value, span: Span) -> Result<f64, RuntimeError> {
    match value {
        Value::Number(n) => Ok(*n),
        other => Err(argument_error(name, "a number", other, span)),
    }
}

fn whole_number(name: &str, value: &Value, span: Span) -> Result<f64, RuntimeError> {
    let n = number(name, value, span)?;
    if n.fract() == 0.0 {
        Ok(n)
    } else {
        Err(argument_error(name, "a whole number", value, span))
    }
}

fn argument_error(name: &str, expected: &str, found: &Value, span: Span) -> RuntimeError {
    RuntimeError::type_error(
        format!("{} expects {}, found {}", name, expected, found.type_name()),
        span,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn call(name: &str, args: &[Value]) -> Result<Value, RuntimeError> {
        call_builtin(name, args, Span::dummy())
    }

    fn nums(values: &[f64]) -> Value {
        Value::array(values.iter().map(|n| Value::Number(*n)).collect())
    }

    #[rstest]
    #[case("len", vec![Value::string("héllo")], Value::Number(5.0))]
    #[case("len", vec![nums(&[1.0, 2.0])], Value::Number(2.0))]
    #[case("str", vec![Value::Number(3.0)], Value::string("3"))]
    #[case("type_of", vec![Value::Null], Value::string("null"))]
    #[case("type_of", vec![Value::Builtin("len".into())], Value::string("function"))]
    #[case("range", vec![Value::Number(3.0)], nums(&[0.0, 1.0, 2.0]))]
    #[case("range", vec![Value::Number(2.0), Value::Number(4.0)], nums(&[2.0, 3.0]))]
    #[case("range", vec![Value::Number(5.0), Value::Number(1.0)], nums(&[]))]
    #[case("abs", vec![Value::Number(-4.0)], Value::Number(4.0))]
    #[case("min", vec![Value::Number(1.0), Value::Number(2.0)], Value::Number(1.0))]
    #[case("max", vec![Value::Number(1.0), Value::Number(2.0)], Value::Number(2.0))]
    fn test_builtins(#[case] name: &str, #[case] args: Vec<Value>, #[case] expected: Value) {
        assert_eq!(call(name, &args).unwrap(), expected);
    }

    #[test]
    fn test_push_returns_new_array() {
        let original = nums(&[1.0]);
        let pushed = call("push", &[original.clone(), Value::Number(2.0)]).unwrap();
        assert_eq!(pushed, nums(&[1.0, 2.0]));
        assert_eq!(original, nums(&[1.0]));
    }

    #[test]
    fn test_arity_is_checked() {
        assert_eq!(
            call("len", &[]).unwrap_err().to_string(),
            "len expects 1 argument(s), got 0"
        );
    }

    #[test]
    fn test_panic_carries_message() {
        assert_eq!(
            call("panic", &[Value::string("boom")]).unwrap_err().to_string(),
            "panic: boom"
        );
    }

    #[test]
    fn test_argument_types_are_checked() {
        assert!(matches!(
            call("abs", &[Value::string("x")]),
            Err(RuntimeError::TypeError { .. })
        ));
        assert!(matches!(
            call("range", &[Value::Number(1.5)]),
            Err(RuntimeError::TypeError { .. })
        ));
    }
}
