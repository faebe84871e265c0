//! Statement parsing

use crate::ast::*;
use crate::parser::{Parser, Precedence};
use crate::token::TokenKind;

impl Parser {
    /// Parse a statement
    pub(super) fn parse_statement(&mut self) -> Result<Stmt, ()> {
        match self.peek().kind {
            TokenKind::Let | TokenKind::Var => Ok(Stmt::Let(self.parse_let()?)),
            TokenKind::Fn => Ok(Stmt::Function(self.parse_function()?)),
            TokenKind::Assert => Ok(Stmt::Assert(self.parse_assert()?)),
            TokenKind::If => Ok(Stmt::If(self.parse_if()?)),
            TokenKind::While => Ok(Stmt::While(self.parse_while()?)),
            TokenKind::For => Ok(Stmt::For(self.parse_for()?)),
            TokenKind::Return => Ok(Stmt::Return(self.parse_return()?)),
            TokenKind::Break => {
                let start = self.advance().span;
                let end = self.consume(TokenKind::Semicolon, "Expected ';' after 'break'")?.span;
                Ok(Stmt::Break(start.merge(end)))
            }
            TokenKind::Continue => {
                let start = self.advance().span;
                let end = self
                    .consume(TokenKind::Semicolon, "Expected ';' after 'continue'")?
                    .span;
                Ok(Stmt::Continue(start.merge(end)))
            }
            TokenKind::LeftBrace => Ok(Stmt::Block(self.parse_block()?)),
            _ => self.parse_expression_statement(),
        }
    }

    /// Parse `let name = init;` / `var name = init;`
    fn parse_let(&mut self) -> Result<LetStmt, ()> {
        let keyword = self.advance().clone();
        let mutable = keyword.kind == TokenKind::Var;

        let name = self.consume_identifier("a variable name")?;
        self.consume(TokenKind::Equal, "Expected '=' after variable name")?;
        let init = self.parse_expression()?;
        let end = self
            .consume(TokenKind::Semicolon, "Expected ';' after variable declaration")?
            .span;

        Ok(LetStmt {
            name,
            mutable,
            init,
            span: keyword.span.merge(end),
        })
    }

    /// Parse a function declaration
    fn parse_function(&mut self) -> Result<FunctionDecl, ()> {
        let fn_span = self.consume(TokenKind::Fn, "Expected 'fn'")?.span;
        let name = self.consume_identifier("a function name")?;

        self.consume(TokenKind::LeftParen, "Expected '(' after function name")?;
        let mut params = Vec::new();
        if !self.check(TokenKind::RightParen) {
            loop {
                params.push(self.consume_identifier("a parameter name")?);
                if !self.match_token(TokenKind::Comma) || self.check(TokenKind::RightParen) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RightParen, "Expected ')' after parameters")?;

        let body = self.parse_block()?;
        let span = fn_span.merge(body.span);

        Ok(FunctionDecl {
            name,
            params,
            body,
            span,
        })
    }

    /// Parse `assert test;`
    fn parse_assert(&mut self) -> Result<AssertStmt, ()> {
        let start = self.consume(TokenKind::Assert, "Expected 'assert'")?.span;
        let test = self.parse_expression()?;
        let end = self
            .consume(TokenKind::Semicolon, "Expected ';' after assertion")?
            .span;

        Ok(AssertStmt {
            test,
            span: start.merge(end),
        })
    }

    /// Parse an `if` statement with optional `else` / `else if`
    fn parse_if(&mut self) -> Result<IfStmt, ()> {
        let start = self.consume(TokenKind::If, "Expected 'if'")?.span;
        let cond = self.parse_expression()?;
        let then_block = self.parse_block()?;
        let mut span = start.merge(then_block.span);

        let else_block = if self.match_token(TokenKind::Else) {
            let block = if self.check(TokenKind::If) {
                let nested = self.parse_if()?;
                Block {
                    span: nested.span,
                    statements: vec![Stmt::If(nested)],
                }
            } else {
                self.parse_block()?
            };
            span = span.merge(block.span);
            Some(block)
        } else {
            None
        };

        Ok(IfStmt {
            cond,
            then_block,
            else_block,
            span,
        })
    }

    fn parse_while(&mut self) -> Result<WhileStmt, ()> {
        let start = self.consume(TokenKind::While, "Expected 'while'")?.span;
        let cond = self.parse_expression()?;
        let body = self.parse_block()?;
        let span = start.merge(body.span);

        Ok(WhileStmt { cond, body, span })
    }

    /// Parse `for name in iterable { ... }`
    fn parse_for(&mut self) -> Result<ForStmt, ()> {
        let start = self.consume(TokenKind::For, "Expected 'for'")?.span;
        let variable = self.consume_identifier("a loop variable name")?;
        self.consume(TokenKind::In, "Expected 'in' after loop variable")?;
        let iterable = self.parse_expression()?;
        let body = self.parse_block()?;
        let span = start.merge(body.span);

        Ok(ForStmt {
            variable,
            iterable,
            body,
            span,
        })
    }

    fn parse_return(&mut self) -> Result<ReturnStmt, ()> {
        let start = self.consume(TokenKind::Return, "Expected 'return'")?.span;
        let value = if self.check(TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        let end = self
            .consume(TokenKind::Semicolon, "Expected ';' after return")?
            .span;

        Ok(ReturnStmt {
            value,
            span: start.merge(end),
        })
    }

    /// Parse a brace-delimited block
    pub(super) fn parse_block(&mut self) -> Result<Block, ()> {
        let start = self.consume(TokenKind::LeftBrace, "Expected '{'")?.span;

        let statements = self.nested(|parser| {
            let mut statements = Vec::new();
            while !parser.check(TokenKind::RightBrace) && !parser.is_at_end() {
                statements.push(parser.parse_statement()?);
            }
            Ok(statements)
        })?;

        let end = self.consume(TokenKind::RightBrace, "Expected '}' after block")?.span;

        Ok(Block {
            statements,
            span: start.merge(end),
        })
    }

    /// Parse an expression statement or an assignment
    fn parse_expression_statement(&mut self) -> Result<Stmt, ()> {
        let expr = self.parse_precedence(Precedence::Lowest)?;

        if let Some(op) = self.assign_op() {
            self.advance();
            let target = self.assign_target(expr)?;
            let value = self.parse_expression()?;
            let end = self
                .consume(TokenKind::Semicolon, "Expected ';' after assignment")?
                .span;
            let span = target_span(&target).merge(end);
            return Ok(Stmt::Assign(Assign {
                target,
                op,
                value,
                span,
            }));
        }

        let end = self
            .consume(TokenKind::Semicolon, "Expected ';' after expression")?
            .span;
        let span = expr.span().merge(end);
        Ok(Stmt::Expr(ExprStmt { expr, span }))
    }

    /// The assignment operator at the current token, if any
    fn assign_op(&self) -> Option<AssignOp> {
        match self.peek().kind {
            TokenKind::Equal => Some(AssignOp::Assign),
            TokenKind::PlusEqual => Some(AssignOp::Add),
            TokenKind::MinusEqual => Some(AssignOp::Sub),
            TokenKind::StarEqual => Some(AssignOp::Mul),
            TokenKind::SlashEqual => Some(AssignOp::Div),
            TokenKind::PercentEqual => Some(AssignOp::Mod),
            _ => None,
        }
    }

    /// Convert a parsed expression into an assignment target
    fn assign_target(&mut self, expr: Expr) -> Result<AssignTarget, ()> {
        match expr {
            Expr::Identifier(id) => Ok(AssignTarget::Name(id)),
            Expr::Index(IndexExpr {
                target,
                index,
                span,
            }) => match *target {
                Expr::Identifier(name) => Ok(AssignTarget::Index { name, index, span }),
                other => {
                    self.invalid_assign_target(&other);
                    Err(())
                }
            },
            other => {
                self.invalid_assign_target(&other);
                Err(())
            }
        }
    }
}

fn target_span(target: &AssignTarget) -> crate::span::Span {
    match target {
        AssignTarget::Name(id) => id.span,
        AssignTarget::Index { span, .. } => *span,
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::*;
    use crate::diagnostic::error_codes;
    use crate::parser::parse_source;

    fn parse_ok(source: &str) -> Program {
        let (program, diagnostics) = parse_source(source);
        assert!(diagnostics.is_empty(), "unexpected diagnostics: {:?}", diagnostics);
        program
    }

    #[test]
    fn test_assert_keeps_test_expression_span() {
        let program = parse_ok("assert 1 + 1 == 2;");
        let Stmt::Assert(assert) = &program.statements[0] else {
            panic!("expected assert, got {:?}", program.statements[0]);
        };
        let span = assert.test.span();
        assert_eq!((span.line, span.column, span.end_line, span.end_column), (1, 7, 1, 17));
        assert_eq!((assert.span.column, assert.span.end_column), (0, 18));
    }

    #[test]
    fn test_let_and_var() {
        let program = parse_ok("let a = 1; var b = 2;");
        match (&program.statements[0], &program.statements[1]) {
            (Stmt::Let(a), Stmt::Let(b)) => {
                assert!(!a.mutable);
                assert!(b.mutable);
                assert_eq!(b.name.name, "b");
            }
            other => panic!("unexpected statements: {:?}", other),
        }
    }

    #[test]
    fn test_function_declaration() {
        let program = parse_ok("fn add(a, b) { return a + b; }");
        let Stmt::Function(func) = &program.statements[0] else {
            panic!("expected function");
        };
        assert_eq!(func.name.name, "add");
        let params: Vec<_> = func.params.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(params, vec!["a", "b"]);
        assert_eq!(func.body.statements.len(), 1);
    }

    #[test]
    fn test_else_if_chain_nests() {
        let program = parse_ok("if a { } else if b { } else { assert c; }");
        let Stmt::If(outer) = &program.statements[0] else {
            panic!("expected if");
        };
        let else_block = outer.else_block.as_ref().unwrap();
        let Stmt::If(inner) = &else_block.statements[0] else {
            panic!("expected nested if");
        };
        assert!(inner.else_block.is_some());
    }

    #[test]
    fn test_for_in() {
        let program = parse_ok("for x in [1, 2, 3] { assert x > 0; }");
        let Stmt::For(stmt) = &program.statements[0] else {
            panic!("expected for");
        };
        assert_eq!(stmt.variable.name, "x");
        assert!(matches!(stmt.iterable, Expr::Array(_)));
    }

    #[test]
    fn test_assignments() {
        let program = parse_ok("x = 1; x += 2; xs[0] = 3;");
        let ops: Vec<_> = program
            .statements
            .iter()
            .map(|s| match s {
                Stmt::Assign(a) => a.op,
                other => panic!("expected assignment, got {:?}", other),
            })
            .collect();
        assert_eq!(ops, vec![AssignOp::Assign, AssignOp::Add, AssignOp::Assign]);
        assert!(matches!(
            &program.statements[2],
            Stmt::Assign(Assign {
                target: AssignTarget::Index { .. },
                ..
            })
        ));
    }

    #[test]
    fn test_invalid_assignment_target() {
        let (_, diagnostics) = parse_source("1 + 2 = 3;");
        assert_eq!(diagnostics[0].code, error_codes::INVALID_ASSIGN_TARGET);
    }

    #[test]
    fn test_missing_semicolon() {
        let (_, diagnostics) = parse_source("assert true");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(
            diagnostics[0].message,
            "Expected ';' after assertion, found end of file"
        );
    }

    #[test]
    fn test_deeply_nested_blocks_are_rejected() {
        let source = format!("{}{}", "{".repeat(20_000), "}".repeat(20_000));
        let (_, diagnostics) = parse_source(&source);
        assert_eq!(diagnostics[0].code, error_codes::NESTING_TOO_DEEP);
    }
}
