//! Statement execution

use crate::ast::*;
use crate::interpreter::{ControlFlow, Interpreter};
use crate::span::Span;
use crate::value::{RuntimeError, UserFunction, Value};
use std::rc::Rc;

impl Interpreter {
    /// Execute a statement
    pub(super) fn eval_statement(&mut self, stmt: &Stmt) -> Result<Value, RuntimeError> {
        match stmt {
            Stmt::Let(decl) => {
                let value = self.eval_expr(&decl.init)?;
                self.declare(&decl.name.name, value, decl.mutable);
                Ok(Value::Null)
            }
            Stmt::Function(func) => {
                let value = Value::Function(Rc::new(UserFunction {
                    name: func.name.name.clone(),
                    params: func.params.clone(),
                    body: func.body.clone(),
                }));
                self.declare(&func.name.name, value, false);
                Ok(Value::Null)
            }
            Stmt::Assert(assert) => {
                // Only reached when the assertion was not instrumented
                let condition = self.eval_expr(&assert.test)?;
                if condition.is_true() {
                    Ok(Value::Null)
                } else {
                    Err(RuntimeError::AssertionFailed {
                        span: assert.test.span(),
                    })
                }
            }
            Stmt::If(if_stmt) => self.eval_if(if_stmt),
            Stmt::While(while_stmt) => self.eval_while(while_stmt),
            Stmt::For(for_stmt) => self.eval_for(for_stmt),
            Stmt::Return(ret) => {
                let value = match &ret.value {
                    Some(expr) => self.eval_expr(expr)?,
                    None => Value::Null,
                };
                self.control_flow = ControlFlow::Return(value);
                Ok(Value::Null)
            }
            Stmt::Break(_) => {
                self.control_flow = ControlFlow::Break;
                Ok(Value::Null)
            }
            Stmt::Continue(_) => {
                self.control_flow = ControlFlow::Continue;
                Ok(Value::Null)
            }
            Stmt::Block(block) => self.eval_block(block),
            Stmt::Assign(assign) => self.eval_assign(assign),
            Stmt::Expr(expr_stmt) => self.eval_expr(&expr_stmt.expr),
        }
    }

    /// Execute a block in its own scope
    pub(super) fn eval_block(&mut self, block: &Block) -> Result<Value, RuntimeError> {
        self.push_scope();
        let result = self.eval_block_statements(block);
        self.pop_scope();
        result
    }

    fn eval_block_statements(&mut self, block: &Block) -> Result<Value, RuntimeError> {
        let mut last_value = Value::Null;

        for stmt in &block.statements {
            last_value = self.eval_statement(stmt)?;

            if self.control_flow != ControlFlow::None {
                break;
            }
        }

        Ok(last_value)
    }

    fn eval_if(&mut self, if_stmt: &IfStmt) -> Result<Value, RuntimeError> {
        let cond = self.eval_condition(&if_stmt.cond, "if")?;

        if cond {
            self.eval_block(&if_stmt.then_block)
        } else if let Some(else_block) = &if_stmt.else_block {
            self.eval_block(else_block)
        } else {
            Ok(Value::Null)
        }
    }

    fn eval_while(&mut self, while_stmt: &WhileStmt) -> Result<Value, RuntimeError> {
        while self.eval_condition(&while_stmt.cond, "while")? {
            self.eval_block(&while_stmt.body)?;
            if self.take_loop_exit() {
                break;
            }
        }

        Ok(Value::Null)
    }

    fn eval_for(&mut self, for_stmt: &ForStmt) -> Result<Value, RuntimeError> {
        let iterable = self.eval_expr(&for_stmt.iterable)?;

        let items: Vec<Value> = match &iterable {
            Value::Array(arr) => arr.iter().cloned().collect(),
            Value::String(s) => s.chars().map(|c| Value::string(c.to_string())).collect(),
            Value::Map(map) => map.keys().map(Value::string).collect(),
            other => {
                return Err(RuntimeError::type_error(
                    format!("Cannot iterate over {}", other.type_name()),
                    for_stmt.iterable.span(),
                ))
            }
        };

        for item in items {
            self.push_scope();
            self.declare(&for_stmt.variable.name, item, false);
            let result = self.eval_block(&for_stmt.body);
            self.pop_scope();
            result?;

            if self.take_loop_exit() {
                break;
            }
        }

        Ok(Value::Null)
    }

    /// Consume a pending `break`/`continue`; true when the loop must stop
    fn take_loop_exit(&mut self) -> bool {
        match self.control_flow {
            ControlFlow::Break => {
                self.control_flow = ControlFlow::None;
                true
            }
            ControlFlow::Continue => {
                self.control_flow = ControlFlow::None;
                false
            }
            ControlFlow::Return(_) => true,
            ControlFlow::None => false,
        }
    }

    /// Evaluate a condition that must be a bool
    pub(super) fn eval_condition(&mut self, expr: &Expr, context: &str) -> Result<bool, RuntimeError> {
        match self.eval_expr(expr)? {
            Value::Bool(b) => Ok(b),
            other => Err(RuntimeError::type_error(
                format!("{} condition must be bool, found {}", context, other.type_name()),
                expr.span(),
            )),
        }
    }

    /// Evaluate an assignment
    fn eval_assign(&mut self, assign: &Assign) -> Result<Value, RuntimeError> {
        let value = self.eval_expr(&assign.value)?;

        match &assign.target {
            AssignTarget::Name(id) => {
                let binding = self.binding_mut(&id.name, id.span)?;
                let new_value = match assign.op.binary_op() {
                    Some(op) => super::expr::binary_values(op, &binding.value, &value, assign.span)?,
                    None => value,
                };
                binding.value = new_value;
            }
            AssignTarget::Index { name, index, span } => {
                let index = self.eval_expr(index)?;
                let op = assign.op.binary_op();
                let binding = self.binding_mut(&name.name, name.span)?;
                assign_at_index(&mut binding.value, index, value, op, *span)?;
            }
        }

        Ok(Value::Null)
    }
}

/// Store into `container[index]`, applying a compound operator if present
fn assign_at_index(
    container: &mut Value,
    index: Value,
    value: Value,
    op: Option<BinaryOp>,
    span: Span,
) -> Result<(), RuntimeError> {
    match (container, index) {
        (Value::Array(arr), index) => {
            let i = super::expr::array_index(&index, arr.len(), span)?;
            let new_value = match (op, arr.get(i)) {
                (Some(op), Some(current)) => super::expr::binary_values(op, current, &value, span)?,
                _ => value,
            };
            arr.set(i, new_value);
            Ok(())
        }
        (Value::Map(map), Value::String(key)) => {
            let new_value = match op {
                Some(op) => {
                    let current = map.get(&key).ok_or_else(|| RuntimeError::KeyNotFound {
                        key: key.to_string(),
                        span,
                    })?;
                    super::expr::binary_values(op, current, &value, span)?
                }
                None => value,
            };
            map.insert(&*key, new_value);
            Ok(())
        }
        (Value::Map(_), other) => Err(RuntimeError::InvalidIndex {
            msg: format!("map keys are strings, found {}", other.type_name()),
            span,
        }),
        (other, _) => Err(RuntimeError::type_error(
            format!("Cannot assign into {}", other.type_name()),
            span,
        )),
    }
}
