//! Expression evaluation

use crate::ast::*;
use crate::interpreter::{Binding, ControlFlow, Interpreter, MAX_CALL_DEPTH};
use crate::span::Span;
use crate::value::{RuntimeError, UserFunction, Value};
use std::collections::HashMap;

impl Interpreter {
    /// Evaluate an expression
    pub(super) fn eval_expr(&mut self, expr: &Expr) -> Result<Value, RuntimeError> {
        match expr {
            Expr::Literal(lit, _) => Ok(eval_literal(lit)),
            Expr::Identifier(id) => self.get_variable(&id.name, id.span),
            Expr::Binary(binary) => self.eval_binary(binary),
            Expr::Unary(unary) => self.eval_unary(unary),
            Expr::Call(call) => self.eval_call(call),
            Expr::Index(index) => self.eval_index(index),
            Expr::Array(arr) => {
                let elements: Result<Vec<Value>, _> =
                    arr.elements.iter().map(|e| self.eval_expr(e)).collect();
                Ok(Value::array(elements?))
            }
            Expr::Group(group) => self.eval_expr(&group.expr),
            Expr::Locals(_) => Ok(self.snapshot().to_value()),
        }
    }

    /// Evaluate a binary expression
    fn eval_binary(&mut self, binary: &BinaryExpr) -> Result<Value, RuntimeError> {
        // Short-circuit evaluation for && and ||
        if let BinaryOp::And | BinaryOp::Or = binary.op {
            let left = self.eval_logical_operand(&binary.left, binary.op)?;
            let short_circuit = match binary.op {
                BinaryOp::And => !left,
                _ => left,
            };
            if short_circuit {
                return Ok(Value::Bool(left));
            }
            let right = self.eval_logical_operand(&binary.right, binary.op)?;
            return Ok(Value::Bool(right));
        }

        let left = self.eval_expr(&binary.left)?;
        let right = self.eval_expr(&binary.right)?;
        binary_values(binary.op, &left, &right, binary.span)
    }

    fn eval_logical_operand(&mut self, expr: &Expr, op: BinaryOp) -> Result<bool, RuntimeError> {
        match self.eval_expr(expr)? {
            Value::Bool(b) => Ok(b),
            other => Err(RuntimeError::type_error(
                format!("Expected bool for {}, found {}", op.as_str(), other.type_name()),
                expr.span(),
            )),
        }
    }

    /// Evaluate a unary expression
    fn eval_unary(&mut self, unary: &UnaryExpr) -> Result<Value, RuntimeError> {
        let operand = self.eval_expr(&unary.operand)?;

        match (unary.op, operand) {
            (UnaryOp::Negate, Value::Number(n)) => Ok(Value::Number(-n)),
            (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
            (UnaryOp::Negate, other) => Err(RuntimeError::type_error(
                format!("Expected number for -, found {}", other.type_name()),
                unary.span,
            )),
            (UnaryOp::Not, other) => Err(RuntimeError::type_error(
                format!("Expected bool for !, found {}", other.type_name()),
                unary.span,
            )),
        }
    }

    /// Evaluate a function call
    fn eval_call(&mut self, call: &CallExpr) -> Result<Value, RuntimeError> {
        let callee = self.eval_expr(&call.callee)?;

        let args: Result<Vec<Value>, _> = call.args.iter().map(|arg| self.eval_expr(arg)).collect();
        let args = args?;

        match callee {
            Value::Function(func) => self.call_user_function(&func, args, call.span),
            Value::Builtin(name) => crate::stdlib::call_builtin(&name, &args, call.span),
            Value::Native(native) => native.call(&args, call.span),
            other => Err(RuntimeError::NotCallable {
                type_name: other.type_name().to_string(),
                span: call.callee.span(),
            }),
        }
    }

    /// Call a user-defined function in a fresh frame
    fn call_user_function(
        &mut self,
        func: &UserFunction,
        args: Vec<Value>,
        span: Span,
    ) -> Result<Value, RuntimeError> {
        if args.len() != func.params.len() {
            return Err(RuntimeError::ArityMismatch {
                name: func.name.clone(),
                expected: func.params.len(),
                found: args.len(),
                span,
            });
        }

        if self.depth >= MAX_CALL_DEPTH {
            return Err(RuntimeError::StackOverflow {
                limit: MAX_CALL_DEPTH,
                span,
            });
        }

        // Parameters are immutable, like `let`
        let params: HashMap<String, Binding> = func
            .params
            .iter()
            .zip(args)
            .map(|(param, value)| {
                (
                    param.name.clone(),
                    Binding {
                        value,
                        mutable: false,
                    },
                )
            })
            .collect();

        let caller_scopes = std::mem::replace(&mut self.scopes, vec![params]);
        self.depth += 1;

        let result = self.eval_block(&func.body);

        self.depth -= 1;
        self.scopes = caller_scopes;
        result?;

        match std::mem::replace(&mut self.control_flow, ControlFlow::None) {
            ControlFlow::Return(value) => Ok(value),
            _ => Ok(Value::Null),
        }
    }

    /// Evaluate indexing into an array, string or map
    fn eval_index(&mut self, index: &IndexExpr) -> Result<Value, RuntimeError> {
        let target = self.eval_expr(&index.target)?;
        let idx = self.eval_expr(&index.index)?;

        match (&target, &idx) {
            (Value::Array(arr), _) => {
                let i = array_index(&idx, arr.len(), index.span)?;
                Ok(arr.as_slice()[i].clone())
            }
            (Value::String(s), _) => {
                let chars: Vec<char> = s.chars().collect();
                let i = array_index(&idx, chars.len(), index.span)?;
                Ok(Value::string(chars[i].to_string()))
            }
            (Value::Map(map), Value::String(key)) => {
                map.get(key).cloned().ok_or_else(|| RuntimeError::KeyNotFound {
                    key: key.to_string(),
                    span: index.span,
                })
            }
            (Value::Map(_), other) => Err(RuntimeError::InvalidIndex {
                msg: format!("map keys are strings, found {}", other.type_name()),
                span: index.index.span(),
            }),
            (other, _) => Err(RuntimeError::type_error(
                format!("Cannot index into {}", other.type_name()),
                index.target.span(),
            )),
        }
    }
}

/// Evaluate a literal
pub(super) fn eval_literal(lit: &Literal) -> Value {
    match lit {
        Literal::Number(n) => Value::Number(*n),
        Literal::String(s) => Value::string(s),
        Literal::Bool(b) => Value::Bool(*b),
        Literal::Null => Value::Null,
    }
}

/// Validate `index` as a position within a sequence of `len` elements
pub(super) fn array_index(index: &Value, len: usize, span: Span) -> Result<usize, RuntimeError> {
    match index {
        Value::Number(n) if n.fract() == 0.0 && *n >= 0.0 => {
            let i = *n as usize;
            if i < len {
                Ok(i)
            } else {
                Err(RuntimeError::OutOfBounds { index: i, len, span })
            }
        }
        other => Err(RuntimeError::InvalidIndex {
            msg: format!("expected a non-negative whole number, found {}", other.repr()),
            span,
        }),
    }
}

/// Apply a non-short-circuiting binary operator to two evaluated operands
pub(super) fn binary_values(
    op: BinaryOp,
    left: &Value,
    right: &Value,
    span: Span,
) -> Result<Value, RuntimeError> {
    match op {
        BinaryOp::Add => match (left, right) {
            (Value::Number(a), Value::Number(b)) => checked(a + b, span),
            (Value::String(a), Value::String(b)) => Ok(Value::string(format!("{}{}", a, b))),
            _ => Err(operand_error(op, left, right, span)),
        },
        BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
            let (Value::Number(a), Value::Number(b)) = (left, right) else {
                return Err(operand_error(op, left, right, span));
            };
            let (a, b) = (*a, *b);
            let result = match op {
                BinaryOp::Sub => a - b,
                BinaryOp::Mul => a * b,
                BinaryOp::Div | BinaryOp::Mod if b == 0.0 => {
                    return Err(RuntimeError::DivideByZero { span })
                }
                BinaryOp::Div => a / b,
                _ => a % b,
            };
            checked(result, span)
        }
        BinaryOp::Eq => Ok(Value::Bool(left == right)),
        BinaryOp::Ne => Ok(Value::Bool(left != right)),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let ordering = match (left, right) {
                (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
                (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
                _ => return Err(operand_error(op, left, right, span)),
            };
            let result = ordering.is_some_and(|ord| match op {
                BinaryOp::Lt => ord.is_lt(),
                BinaryOp::Le => ord.is_le(),
                BinaryOp::Gt => ord.is_gt(),
                _ => ord.is_ge(),
            });
            Ok(Value::Bool(result))
        }
        BinaryOp::And | BinaryOp::Or => match (left, right) {
            (Value::Bool(a), Value::Bool(b)) => Ok(Value::Bool(if op == BinaryOp::And {
                *a && *b
            } else {
                *a || *b
            })),
            _ => Err(operand_error(op, left, right, span)),
        },
    }
}

/// Reject NaN and infinite results
fn checked(result: f64, span: Span) -> Result<Value, RuntimeError> {
    if result.is_finite() {
        Ok(Value::Number(result))
    } else {
        Err(RuntimeError::InvalidNumericResult { span })
    }
}

fn operand_error(op: BinaryOp, left: &Value, right: &Value, span: Span) -> RuntimeError {
    RuntimeError::type_error(
        format!(
            "Invalid operands for {}: {} and {}",
            op.as_str(),
            left.type_name(),
            right.type_name()
        ),
        span,
    )
}
