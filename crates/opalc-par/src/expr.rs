//! Expression parsing using Pratt parsing (top-down operator precedence).
//!
//! Each token kind maps to a precedence level; parsing climbs while the next
//! operator binds tighter than the current minimum. Left-associative
//! operators parse their right operand at their own precedence;
//! `**` is right-associative and parses its right operand one level lower.
//!
//! # Precedence (lowest to highest)
//!
//! | Level | Operators |
//! |-------|-----------|
//! | EQUALS | `==`, `!=` |
//! | LESSGREATER | `<`, `>`, `<=`, `>=` |
//! | SUM | `+`, `-` |
//! | PRODUCT | `*`, `/`, `%` |
//! | EXPONENT | `**` (right-associative) |
//! | PREFIX | unary `-`, `not` |
//! | CALL | `(` |

use opalc_lex::TokenKind;

use crate::ast::{
    BinOp, BoolLit, CallExpr, Expr, FloatLit, Ident, InfixExpr, IntLit, PrefixExpr, PrefixOp,
    StrLit,
};
use crate::{ParseResult, Parser};

/// Operator precedence levels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
    Lowest,
    Equals,
    LessGreater,
    Sum,
    Product,
    Exponent,
    Prefix,
    Call,
}

/// The precedence a token has when it appears in infix position.
fn precedence_of(kind: TokenKind) -> Precedence {
    match kind {
        TokenKind::EqEq | TokenKind::NotEq => Precedence::Equals,
        TokenKind::Lt | TokenKind::Gt | TokenKind::LtEq | TokenKind::GtEq => {
            Precedence::LessGreater
        },
        TokenKind::Plus | TokenKind::Minus => Precedence::Sum,
        TokenKind::Star | TokenKind::Slash | TokenKind::Percent => Precedence::Product,
        TokenKind::Pow => Precedence::Exponent,
        TokenKind::LParen => Precedence::Call,
        _ => Precedence::Lowest,
    }
}

/// Maps an infix-operator token to its [`BinOp`].
fn bin_op_from(kind: TokenKind) -> Option<BinOp> {
    match kind {
        TokenKind::Plus => Some(BinOp::Add),
        TokenKind::Minus => Some(BinOp::Sub),
        TokenKind::Star => Some(BinOp::Mul),
        TokenKind::Slash => Some(BinOp::Div),
        TokenKind::Percent => Some(BinOp::Mod),
        TokenKind::Pow => Some(BinOp::Pow),
        TokenKind::EqEq => Some(BinOp::EqEq),
        TokenKind::NotEq => Some(BinOp::NotEq),
        TokenKind::Lt => Some(BinOp::Lt),
        TokenKind::Gt => Some(BinOp::Gt),
        TokenKind::LtEq => Some(BinOp::LtEq),
        TokenKind::GtEq => Some(BinOp::GtEq),
        _ => None,
    }
}

impl<'a> Parser<'a> {
    /// Parses an expression, consuming operators that bind tighter than
    /// `precedence`.
    pub(crate) fn parse_expression(&mut self, precedence: Precedence) -> ParseResult<Expr> {
        let mut left = self.parse_prefix()?;

        while self
            .peek_kind()
            .is_some_and(|k| k != TokenKind::Semicolon && precedence < precedence_of(k))
        {
            let peeked = self.peek_kind().unwrap_or(TokenKind::Eof);
            if bin_op_from(peeked).is_none() && peeked != TokenKind::LParen {
                return Ok(left);
            }

            self.advance();
            left = self.parse_infix(left)?;
        }

        Ok(left)
    }

    /// Parses the prefix position: literals, identifiers, grouped
    /// expressions and unary operators.
    fn parse_prefix(&mut self) -> ParseResult<Expr> {
        match self.current_kind() {
            TokenKind::Ident => Ok(Expr::Ident(self.parse_identifier())),
            TokenKind::Int => self.parse_int_literal(),
            TokenKind::Float => self.parse_float_literal(),
            TokenKind::Str => Ok(Expr::Str(StrLit {
                value: self.current().literal.clone(),
                span: self.current().span,
            })),
            TokenKind::True | TokenKind::False => Ok(Expr::Bool(BoolLit {
                value: self.current_kind() == TokenKind::True,
                span: self.current().span,
            })),
            TokenKind::LParen => self.parse_grouped_expression(),
            TokenKind::Minus => self.parse_prefix_expression(PrefixOp::Neg),
            TokenKind::Not => self.parse_prefix_expression(PrefixOp::Not),
            kind => {
                let span = self.current().span;
                Err(self.recover(span, format!("Expected expression, got {:?}", kind)))
            },
        }
    }

    fn parse_int_literal(&mut self) -> ParseResult<Expr> {
        let token = self.current().clone();
        match token.literal.parse::<i64>() {
            Ok(value) => Ok(Expr::Int(IntLit {
                value,
                span: token.span,
            })),
            Err(_) => Err(self.recover(
                token.span,
                format!("Integer literal '{}' out of range", token.literal),
            )),
        }
    }

    fn parse_float_literal(&mut self) -> ParseResult<Expr> {
        let token = self.current().clone();
        match token.literal.parse::<f64>() {
            Ok(value) => Ok(Expr::Float(FloatLit {
                value,
                span: token.span,
            })),
            Err(_) => Err(self.recover(
                token.span,
                format!("Invalid float literal '{}'", token.literal),
            )),
        }
    }

    /// `( expr )`
    fn parse_grouped_expression(&mut self) -> ParseResult<Expr> {
        self.advance();
        let expr = self.parse_expression(Precedence::Lowest)?;
        self.expect_peek(
            TokenKind::RParen,
            "Expected closing parenthesis ')' after expression",
        )?;
        Ok(expr)
    }

    /// `- expr` or `not expr`; the operand is parsed at PREFIX precedence.
    fn parse_prefix_expression(&mut self, op: PrefixOp) -> ParseResult<Expr> {
        let start = self.current().span;
        self.advance();
        let rhs = self.parse_expression(Precedence::Prefix)?;
        let span = start.merge(rhs.span());
        Ok(Expr::Prefix(Box::new(PrefixExpr { op, rhs, span })))
    }

    /// Parses the infix position; the current token is the operator (or `(`
    /// for a call).
    fn parse_infix(&mut self, left: Expr) -> ParseResult<Expr> {
        if self.current_kind() == TokenKind::LParen {
            return self.parse_call_expression(left);
        }

        let op = match bin_op_from(self.current_kind()) {
            Some(op) => op,
            None => {
                let span = self.current().span;
                let kind = self.current_kind();
                return Err(self.recover(span, format!("Expected operator, got {:?}", kind)));
            },
        };

        // `**` is right-associative: consume the right operand one
        // precedence level lower.
        let precedence = if op == BinOp::Pow {
            Precedence::Product
        } else {
            precedence_of(self.current_kind())
        };

        self.advance();
        let rhs = self.parse_expression(precedence)?;

        let span = left.span().merge(rhs.span());
        Ok(Expr::Infix(Box::new(InfixExpr {
            lhs: left,
            op,
            rhs,
            span,
        })))
    }

    /// `callee ( args? )`; the callee must be a plain identifier.
    fn parse_call_expression(&mut self, callee: Expr) -> ParseResult<Expr> {
        let callee = match callee {
            Expr::Ident(ident) => ident,
            other => {
                let span = other.span();
                return Err(self.recover(span, "Expected function name before '('"));
            },
        };

        let args = self.parse_expression_list(TokenKind::RParen)?;
        let span = callee.span.merge(self.current().span);
        Ok(Expr::Call(Box::new(CallExpr { callee, args, span })))
    }

    /// A comma-separated expression list; the current token is the opening
    /// `(` on entry and `end_kind` on success. Empty lists are permitted.
    fn parse_expression_list(&mut self, end_kind: TokenKind) -> ParseResult<Vec<Expr>> {
        let mut args = Vec::new();

        if self.peek_kind() == Some(end_kind) {
            self.advance();
            return Ok(args);
        }

        self.advance();
        args.push(self.parse_expression(Precedence::Lowest)?);

        while self.peek_kind() == Some(TokenKind::Comma) {
            self.advance();
            self.advance();
            args.push(self.parse_expression(Precedence::Lowest)?);
        }

        self.expect_peek(end_kind, "Expected closing parenthesis ')' after arguments")?;
        Ok(args)
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::Stmt;
    use crate::Parser;
    use opalc_lex::{sanitize, Lexer};
    use opalc_util::{FileId, Handler};

    /// Parses a single expression statement and renders the expression in
    /// fully parenthesized form.
    fn parse_expr(source: &str) -> String {
        let handler = Handler::new();
        let tokens = sanitize(Lexer::new(source, FileId(0), &handler).tokenize());
        let program = Parser::new(tokens, &handler).parse_program();
        assert!(
            !handler.has_errors(),
            "unexpected errors for {:?}: {:?}",
            source,
            handler.diagnostics()
        );
        match &program[0] {
            Stmt::Expr(s) => s.expr.to_string(),
            other => panic!("expected expression statement, got {:?}", other),
        }
    }

    #[test]
    fn test_product_binds_tighter_than_sum() {
        assert_eq!(parse_expr("2 + 3 * 4;"), "(2 + (3 * 4))");
        assert_eq!(parse_expr("2 * 3 + 4;"), "((2 * 3) + 4)");
    }

    #[test]
    fn test_left_associativity() {
        assert_eq!(parse_expr("a - b - c;"), "((a - b) - c)");
        assert_eq!(parse_expr("a / b / c;"), "((a / b) / c)");
        assert_eq!(parse_expr("a + b - c;"), "((a + b) - c)");
    }

    #[test]
    fn test_pow_is_right_associative() {
        assert_eq!(parse_expr("2 ** 3 ** 2;"), "(2 ** (3 ** 2))");
    }

    #[test]
    fn test_pow_binds_tighter_than_product() {
        assert_eq!(parse_expr("2 * 3 ** 2;"), "(2 * (3 ** 2))");
    }

    #[test]
    fn test_comparison_precedence() {
        assert_eq!(parse_expr("a + 1 < b * 2;"), "((a + 1) < (b * 2))");
        assert_eq!(parse_expr("a < b == c;"), "((a < b) == c)");
        assert_eq!(parse_expr("a == b != c;"), "((a == b) != c)");
    }

    #[test]
    fn test_prefix_operators() {
        assert_eq!(parse_expr("-a + b;"), "((-a) + b)");
        assert_eq!(parse_expr("not x == 1;"), "((not x) == 1)");
        assert_eq!(parse_expr("--a;"), "(-(-a))");
    }

    #[test]
    fn test_grouping_overrides_precedence() {
        assert_eq!(parse_expr("(2 + 3) * 4;"), "((2 + 3) * 4)");
    }

    #[test]
    fn test_call_expression() {
        assert_eq!(parse_expr("f();"), "f()");
        assert_eq!(parse_expr("f(1, 2 + 3);"), "f(1, (2 + 3))");
        assert_eq!(parse_expr("fact(n - 1) * n;"), "(fact((n - 1)) * n)");
    }

    #[test]
    fn test_call_binds_tightest() {
        assert_eq!(parse_expr("-f(1);"), "(-f(1))");
        assert_eq!(parse_expr("a + f(b) * c;"), "(a + (f(b) * c))");
    }

    #[test]
    fn test_nested_calls() {
        assert_eq!(parse_expr("f(g(1), h(2, 3));"), "f(g(1), h(2, 3))");
    }

    #[test]
    fn test_literals() {
        assert_eq!(parse_expr("3.5;"), "3.5");
        assert_eq!(parse_expr("true;"), "true");
        assert_eq!(parse_expr("\"hi\";"), "\"hi\"");
    }

    #[test]
    fn test_callee_must_be_identifier() {
        // A parenthesized expression is not a callable target.
        let handler = Handler::new();
        let tokens = sanitize(Lexer::new("(1 + 2)(3);", FileId(0), &handler).tokenize());
        Parser::new(tokens, &handler).parse_program();
        assert!(handler.has_errors());
    }

    #[test]
    fn test_unterminated_group_recovers() {
        let handler = Handler::new();
        let tokens = sanitize(Lexer::new("(1 + 2;", FileId(0), &handler).tokenize());
        let program = Parser::new(tokens, &handler).parse_program();
        assert!(handler.has_errors());
        assert!(program.is_empty());
    }

    #[test]
    fn test_and_or_are_not_expression_operators() {
        // `and`/`or` exist as tokens but have no parse rule; using them is a
        // syntax error.
        let handler = Handler::new();
        let tokens = sanitize(Lexer::new("a and b;", FileId(0), &handler).tokenize());
        Parser::new(tokens, &handler).parse_program();
        assert!(handler.has_errors());
    }

    #[test]
    fn test_huge_integer_literal_reported() {
        let handler = Handler::new();
        let tokens = sanitize(Lexer::new(
            "99999999999999999999999999;",
            FileId(0),
            &handler,
        )
        .tokenize());
        Parser::new(tokens, &handler).parse_program();
        assert!(handler.has_errors());
    }
}
