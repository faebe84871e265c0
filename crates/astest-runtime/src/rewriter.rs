//! Assertion instrumentation
//!
//! Rewrites every `assert <test>;` into a call that reports the outcome
//! together with the test expression's source location:
//!
//! ```text
//! assert x == 1;
//! // becomes
//! $record(x == 1, "file.tst", line, column, endline, endcolumn);
//! // or, in debug mode
//! $maybe_debug($record(x == 1, "file.tst", ...), <locals>);
//! ```
//!
//! The test expression is moved, not evaluated. Nodes created here start
//! with placeholder spans; [`fix_missing_spans`] then gives each one the span
//! of its nearest enclosing real node.

use crate::ast::*;
use crate::span::Span;
use tracing::debug;

/// Name of the injected recording capability
pub const RECORD_FN: &str = "$record";
/// Name of the injected debug trigger
pub const MAYBE_DEBUG_FN: &str = "$maybe_debug";

/// Rewrites assertion statements into instrumented calls
#[derive(Debug)]
pub struct AssertionRewriter {
    filepath: String,
    debug: bool,
    rewritten: usize,
}

impl AssertionRewriter {
    pub fn new(filepath: impl Into<String>, debug: bool) -> Self {
        Self {
            filepath: filepath.into(),
            debug,
            rewritten: 0,
        }
    }

    /// Instrument every assertion in `program`
    pub fn rewrite(&mut self, program: Program) -> Program {
        let statements = program
            .statements
            .into_iter()
            .map(|stmt| self.rewrite_stmt(stmt))
            .collect();

        let mut program = Program { statements };
        fix_missing_spans(&mut program);

        debug!(
            file = %self.filepath,
            sites = self.rewritten,
            debug = self.debug,
            "instrumented assertions"
        );
        program
    }

    /// Number of assertion sites rewritten so far
    pub fn rewritten(&self) -> usize {
        self.rewritten
    }

    fn rewrite_stmt(&mut self, stmt: Stmt) -> Stmt {
        match stmt {
            Stmt::Assert(assert) => self.instrument(assert),
            Stmt::Function(mut func) => {
                func.body = self.rewrite_block(func.body);
                Stmt::Function(func)
            }
            Stmt::If(mut if_stmt) => {
                if_stmt.then_block = self.rewrite_block(if_stmt.then_block);
                if_stmt.else_block = if_stmt.else_block.map(|block| self.rewrite_block(block));
                Stmt::If(if_stmt)
            }
            Stmt::While(mut while_stmt) => {
                while_stmt.body = self.rewrite_block(while_stmt.body);
                Stmt::While(while_stmt)
            }
            Stmt::For(mut for_stmt) => {
                for_stmt.body = self.rewrite_block(for_stmt.body);
                Stmt::For(for_stmt)
            }
            Stmt::Block(block) => Stmt::Block(self.rewrite_block(block)),
            other => other,
        }
    }

    fn rewrite_block(&mut self, block: Block) -> Block {
        Block {
            statements: block
                .statements
                .into_iter()
                .map(|stmt| self.rewrite_stmt(stmt))
                .collect(),
            span: block.span,
        }
    }

    fn instrument(&mut self, assert: AssertStmt) -> Stmt {
        self.rewritten += 1;

        let location = assert.test.span().location();
        let record = synthetic_call(
            RECORD_FN,
            vec![
                assert.test,
                Expr::Literal(Literal::String(self.filepath.clone()), Span::dummy()),
                number(location.line),
                number(location.column),
                number(location.endline),
                number(location.endcolumn),
            ],
        );

        let expr = if self.debug {
            synthetic_call(MAYBE_DEBUG_FN, vec![record, Expr::Locals(Span::dummy())])
        } else {
            record
        };

        Stmt::Expr(ExprStmt {
            expr,
            span: assert.span,
        })
    }
}

fn synthetic_call(name: &str, args: Vec<Expr>) -> Expr {
    Expr::Call(CallExpr {
        callee: Box::new(Expr::Identifier(Identifier::new(name, Span::dummy()))),
        args,
        span: Span::dummy(),
    })
}

fn number(n: u32) -> Expr {
    Expr::Literal(Literal::Number(f64::from(n)), Span::dummy())
}

/// Give every placeholder span the span of its nearest enclosing real node
pub fn fix_missing_spans(program: &mut Program) {
    for stmt in &mut program.statements {
        fix_stmt(stmt, Span::dummy());
    }
}

fn fix_stmt(stmt: &mut Stmt, parent: Span) {
    let here = if stmt.span().is_dummy() {
        parent
    } else {
        stmt.span()
    };
    match stmt {
        Stmt::Let(decl) => fix_expr(&mut decl.init, here),
        Stmt::Function(func) => fix_block(&mut func.body, here),
        Stmt::Assert(assert) => fix_expr(&mut assert.test, here),
        Stmt::If(if_stmt) => {
            fix_expr(&mut if_stmt.cond, here);
            fix_block(&mut if_stmt.then_block, here);
            if let Some(block) = &mut if_stmt.else_block {
                fix_block(block, here);
            }
        }
        Stmt::While(while_stmt) => {
            fix_expr(&mut while_stmt.cond, here);
            fix_block(&mut while_stmt.body, here);
        }
        Stmt::For(for_stmt) => {
            fix_expr(&mut for_stmt.iterable, here);
            fix_block(&mut for_stmt.body, here);
        }
        Stmt::Return(ret) => {
            if let Some(value) = &mut ret.value {
                fix_expr(value, here);
            }
        }
        Stmt::Break(_) | Stmt::Continue(_) => {}
        Stmt::Block(block) => fix_block(block, here),
        Stmt::Assign(assign) => {
            if let AssignTarget::Index { index, .. } = &mut assign.target {
                fix_expr(index, here);
            }
            fix_expr(&mut assign.value, here);
        }
        Stmt::Expr(expr_stmt) => {
            if expr_stmt.span.is_dummy() {
                expr_stmt.span = parent;
            }
            fix_expr(&mut expr_stmt.expr, expr_stmt.span);
        }
    }
}

fn fix_block(block: &mut Block, parent: Span) {
    if block.span.is_dummy() {
        block.span = parent;
    }
    for stmt in &mut block.statements {
        fix_stmt(stmt, block.span);
    }
}

fn fix_expr(expr: &mut Expr, parent: Span) {
    if expr.span().is_dummy() {
        *expr.span_mut() = parent;
    }
    let here = expr.span();

    match expr {
        Expr::Literal(..) | Expr::Identifier(_) | Expr::Locals(_) => {}
        Expr::Unary(unary) => fix_expr(&mut unary.operand, here),
        Expr::Binary(binary) => {
            fix_expr(&mut binary.left, here);
            fix_expr(&mut binary.right, here);
        }
        Expr::Call(call) => {
            fix_expr(&mut call.callee, here);
            for arg in &mut call.args {
                fix_expr(arg, here);
            }
        }
        Expr::Index(index) => {
            fix_expr(&mut index.target, here);
            fix_expr(&mut index.index, here);
        }
        Expr::Array(array) => {
            for element in &mut array.elements {
                fix_expr(element, here);
            }
        }
        Expr::Group(group) => fix_expr(&mut group.expr, here),
    }
}
