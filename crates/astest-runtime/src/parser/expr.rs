//! Expression parsing (Pratt parsing)

use crate::ast::*;
use crate::parser::{Parser, Precedence};
use crate::token::{Token, TokenKind};

impl Parser {
    /// Parse an expression
    pub(super) fn parse_expression(&mut self) -> Result<Expr, ()> {
        self.parse_precedence(Precedence::Lowest)
    }

    /// Parse expression with given precedence
    pub(super) fn parse_precedence(&mut self, precedence: Precedence) -> Result<Expr, ()> {
        self.nested(|parser| {
            let mut left = parser.parse_prefix()?;

            while precedence < parser.current_precedence() {
                left = parser.parse_infix(left)?;
            }

            Ok(left)
        })
    }

    /// Parse prefix expression
    fn parse_prefix(&mut self) -> Result<Expr, ()> {
        match self.peek().kind {
            TokenKind::Number => self.parse_number(),
            TokenKind::String => {
                let token = self.advance();
                Ok(Expr::Literal(Literal::String(token.lexeme.clone()), token.span))
            }
            TokenKind::True | TokenKind::False => {
                let token = self.advance();
                let value = token.kind == TokenKind::True;
                Ok(Expr::Literal(Literal::Bool(value), token.span))
            }
            TokenKind::Null => {
                let span = self.advance().span;
                Ok(Expr::Literal(Literal::Null, span))
            }
            TokenKind::Identifier => {
                let token = self.advance();
                Ok(Expr::Identifier(Identifier::new(
                    token.lexeme.clone(),
                    token.span,
                )))
            }
            TokenKind::LeftParen => self.parse_group(),
            TokenKind::LeftBracket => self.parse_array_literal(),
            TokenKind::Minus | TokenKind::Bang => self.parse_unary(),
            _ => {
                self.error_at_current("Expected expression");
                Err(())
            }
        }
    }

    /// Parse infix expression
    fn parse_infix(&mut self, left: Expr) -> Result<Expr, ()> {
        match self.peek().kind {
            TokenKind::LeftParen => self.parse_call(left),
            TokenKind::LeftBracket => self.parse_index(left),
            _ => self.parse_binary(left),
        }
    }

    /// Get current token precedence
    pub(super) fn current_precedence(&self) -> Precedence {
        token_precedence(self.peek())
    }

    /// Parse number literal
    fn parse_number(&mut self) -> Result<Expr, ()> {
        let token = self.advance();
        let span = token.span;
        // The lexer only produces well-formed decimal lexemes
        let value: f64 = token.lexeme.parse().unwrap_or(0.0);
        Ok(Expr::Literal(Literal::Number(value), span))
    }

    /// Parse grouped expression
    fn parse_group(&mut self) -> Result<Expr, ()> {
        let start_span = self.consume(TokenKind::LeftParen, "Expected '('")?.span;
        let expr = self.parse_expression()?;
        let end_span = self
            .consume(TokenKind::RightParen, "Expected ')' after expression")?
            .span;

        Ok(Expr::Group(GroupExpr {
            expr: Box::new(expr),
            span: start_span.merge(end_span),
        }))
    }

    /// Parse array literal
    fn parse_array_literal(&mut self) -> Result<Expr, ()> {
        let start_span = self.consume(TokenKind::LeftBracket, "Expected '['")?.span;

        let mut elements = Vec::new();
        while !self.check(TokenKind::RightBracket) {
            elements.push(self.parse_expression()?);
            if !self.match_token(TokenKind::Comma) {
                break;
            }
        }

        let end_span = self
            .consume(TokenKind::RightBracket, "Expected ']' after array elements")?
            .span;

        Ok(Expr::Array(ArrayLiteral {
            elements,
            span: start_span.merge(end_span),
        }))
    }

    /// Parse unary expression
    fn parse_unary(&mut self) -> Result<Expr, ()> {
        let op_token = self.advance();
        let op = match op_token.kind {
            TokenKind::Minus => UnaryOp::Negate,
            _ => UnaryOp::Not,
        };
        let op_span = op_token.span;

        let operand = self.parse_precedence(Precedence::Unary)?;
        let span = op_span.merge(operand.span());

        Ok(Expr::Unary(UnaryExpr {
            op,
            operand: Box::new(operand),
            span,
        }))
    }

    /// Parse binary expression
    fn parse_binary(&mut self, left: Expr) -> Result<Expr, ()> {
        let op_token = self.advance().clone();
        let op = match binary_op(op_token.kind) {
            Some(op) => op,
            None => {
                // current_precedence only admits operator tokens here
                return Ok(left);
            }
        };

        let precedence = token_precedence(&op_token);
        let right = self.parse_precedence(precedence)?;
        let span = left.span().merge(right.span());

        Ok(Expr::Binary(BinaryExpr {
            op,
            left: Box::new(left),
            right: Box::new(right),
            span,
        }))
    }

    /// Parse function call
    fn parse_call(&mut self, callee: Expr) -> Result<Expr, ()> {
        self.consume(TokenKind::LeftParen, "Expected '('")?;

        let mut args = Vec::new();
        while !self.check(TokenKind::RightParen) {
            args.push(self.parse_expression()?);
            if !self.match_token(TokenKind::Comma) {
                break;
            }
        }

        let end_span = self
            .consume(TokenKind::RightParen, "Expected ')' after arguments")?
            .span;
        let span = callee.span().merge(end_span);

        Ok(Expr::Call(CallExpr {
            callee: Box::new(callee),
            args,
            span,
        }))
    }

    /// Parse index expression
    fn parse_index(&mut self, target: Expr) -> Result<Expr, ()> {
        self.consume(TokenKind::LeftBracket, "Expected '['")?;
        let index = self.parse_expression()?;
        let end_span = self
            .consume(TokenKind::RightBracket, "Expected ']' after index")?
            .span;
        let span = target.span().merge(end_span);

        Ok(Expr::Index(IndexExpr {
            target: Box::new(target),
            index: Box::new(index),
            span,
        }))
    }
}

/// Get precedence for a token
fn token_precedence(token: &Token) -> Precedence {
    match token.kind {
        TokenKind::PipePipe => Precedence::Or,
        TokenKind::AmpAmp => Precedence::And,
        TokenKind::EqualEqual | TokenKind::BangEqual => Precedence::Equality,
        TokenKind::Less | TokenKind::LessEqual | TokenKind::Greater | TokenKind::GreaterEqual => {
            Precedence::Comparison
        }
        TokenKind::Plus | TokenKind::Minus => Precedence::Term,
        TokenKind::Star | TokenKind::Slash | TokenKind::Percent => Precedence::Factor,
        TokenKind::LeftParen | TokenKind::LeftBracket => Precedence::Call,
        _ => Precedence::Lowest,
    }
}

fn binary_op(kind: TokenKind) -> Option<BinaryOp> {
    let op = match kind {
        TokenKind::Plus => BinaryOp::Add,
        TokenKind::Minus => BinaryOp::Sub,
        TokenKind::Star => BinaryOp::Mul,
        TokenKind::Slash => BinaryOp::Div,
        TokenKind::Percent => BinaryOp::Mod,
        TokenKind::EqualEqual => BinaryOp::Eq,
        TokenKind::BangEqual => BinaryOp::Ne,
        TokenKind::Less => BinaryOp::Lt,
        TokenKind::LessEqual => BinaryOp::Le,
        TokenKind::Greater => BinaryOp::Gt,
        TokenKind::GreaterEqual => BinaryOp::Ge,
        TokenKind::AmpAmp => BinaryOp::And,
        TokenKind::PipePipe => BinaryOp::Or,
        _ => return None,
    };
    Some(op)
}

#[cfg(test)]
mod tests {
    use crate::ast::*;
    use crate::parser::parse_source;
    use rstest::rstest;

    fn parse_expr(source: &str) -> Expr {
        let (mut program, diagnostics) = parse_source(&format!("{};", source));
        assert!(diagnostics.is_empty(), "unexpected diagnostics: {:?}", diagnostics);
        match program.statements.remove(0) {
            Stmt::Expr(stmt) => stmt.expr,
            other => panic!("expected expression statement, got {:?}", other),
        }
    }

    /// Render an expression fully parenthesised
    fn shape(expr: &Expr) -> String {
        match expr {
            Expr::Literal(Literal::Number(n), _) => n.to_string(),
            Expr::Literal(Literal::String(s), _) => format!("{:?}", s),
            Expr::Literal(Literal::Bool(b), _) => b.to_string(),
            Expr::Literal(Literal::Null, _) => "null".to_string(),
            Expr::Identifier(id) => id.name.clone(),
            Expr::Unary(u) => {
                let op = if u.op == UnaryOp::Negate { "-" } else { "!" };
                format!("({}{})", op, shape(&u.operand))
            }
            Expr::Binary(b) => format!("({} {} {})", shape(&b.left), b.op.as_str(), shape(&b.right)),
            Expr::Call(c) => {
                let args: Vec<_> = c.args.iter().map(shape).collect();
                format!("{}({})", shape(&c.callee), args.join(", "))
            }
            Expr::Index(i) => format!("{}[{}]", shape(&i.target), shape(&i.index)),
            Expr::Array(a) => {
                let elems: Vec<_> = a.elements.iter().map(shape).collect();
                format!("[{}]", elems.join(", "))
            }
            Expr::Group(g) => shape(&g.expr),
            Expr::Locals(_) => "locals".to_string(),
        }
    }

    #[rstest]
    #[case("1 + 2 * 3", "(1 + (2 * 3))")]
    #[case("1 - 2 - 3", "((1 - 2) - 3)")]
    #[case("(1 + 2) * 3", "((1 + 2) * 3)")]
    #[case("a == b && c < d || e", "(((a == b) && (c < d)) || e)")]
    #[case("-x * y", "((-x) * y)")]
    #[case("!f(1, 2)[0]", "(!f(1, 2)[0])")]
    #[case("[1, 2,]", "[1, 2]")]
    #[case("len(\"ab\") >= 2", "(len(\"ab\") >= 2)")]
    fn test_precedence(#[case] source: &str, #[case] expected: &str) {
        assert_eq!(shape(&parse_expr(source)), expected);
    }

    #[test]
    fn test_group_span_includes_parentheses() {
        let expr = parse_expr("(a + b)");
        let span = expr.span();
        assert_eq!((span.column, span.end_column), (0, 7));
    }

    #[test]
    fn test_multiline_span() {
        let expr = parse_expr("f(\n  1,\n  2\n)");
        let span = expr.span();
        assert_eq!((span.line, span.column), (1, 0));
        assert_eq!((span.end_line, span.end_column), (4, 1));
    }

    #[test]
    fn test_missing_expression() {
        let (_, diagnostics) = parse_source("assert ;");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].message, "Expected expression, found ';'");
    }

    #[test]
    fn test_deep_nesting_is_a_diagnostic() {
        let depth = 20_000;
        let source = format!("assert {}x{};", "(".repeat(depth), ")".repeat(depth));
        let (_, diagnostics) = parse_source(&source);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, crate::diagnostic::error_codes::NESTING_TOO_DEEP);
    }

    #[test]
    fn test_moderate_nesting_parses() {
        let source = format!("{}1{}", "(".repeat(50), ")".repeat(50));
        assert_eq!(shape(&parse_expr(&source)), "1");
    }
}
