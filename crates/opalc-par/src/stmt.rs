//! Statement parsing.
//!
//! Statements are parsed by recursive descent. Simple statements are
//! terminated by `;` (possibly inserted by the sanitizer); `if`, `while` and
//! `def` open their bodies with `:` and close them with `end`. When a
//! statement inside a block fails, the block's loop records the recovery and
//! carries on with the next statement, so one bad statement costs only
//! itself.

use opalc_lex::TokenKind;

use crate::ast::{
    AssignOp, AssignStmt, Expr, ExprStmt, FnStmt, Ident, IfStmt, ImportStmt, Param, ReturnStmt,
    Stmt, Ty, VarStmt, WhileStmt,
};
use crate::expr::Precedence;
use crate::{ParseResult, Parser, Recovered};

/// Maps an assignment-operator token, if the kind is one.
fn assign_op_from(kind: TokenKind) -> Option<AssignOp> {
    match kind {
        TokenKind::Eq => Some(AssignOp::Assign),
        TokenKind::PlusEq => Some(AssignOp::AddAssign),
        TokenKind::MinusEq => Some(AssignOp::SubAssign),
        TokenKind::StarEq => Some(AssignOp::MulAssign),
        TokenKind::SlashEq => Some(AssignOp::DivAssign),
        TokenKind::PercentEq => Some(AssignOp::ModAssign),
        TokenKind::PowEq => Some(AssignOp::PowAssign),
        _ => None,
    }
}

impl<'a> Parser<'a> {
    /// Parses one statement, dispatching on the current token.
    pub(crate) fn parse_statement(&mut self) -> ParseResult<Stmt> {
        // An identifier followed by an assignment operator is an assignment;
        // anything else starting with an identifier is an expression
        // statement.
        if self.current_kind() == TokenKind::Ident
            && self.peek_kind().and_then(assign_op_from).is_some()
        {
            return self.parse_assignment();
        }

        match self.current_kind() {
            TokenKind::Var => self.parse_var(),
            TokenKind::Def => self.parse_function(),
            TokenKind::Return => self.parse_return(),
            TokenKind::If => self.parse_if(),
            TokenKind::While => self.parse_while(),
            TokenKind::Break => self.parse_break(),
            TokenKind::Continue => self.parse_continue(),
            TokenKind::Import => self.parse_import(),
            _ => self.parse_expression_statement(),
        }
    }

    /// `NAME op expr ;`
    fn parse_assignment(&mut self) -> ParseResult<Stmt> {
        let target = self.parse_identifier();
        self.advance(); // onto the operator

        let op = match assign_op_from(self.current_kind()) {
            Some(op) => op,
            None => {
                let span = self.current().span;
                return Err(self.recover(span, "Expected assignment operator"));
            },
        };
        self.advance();

        let value = self.parse_expression(Precedence::Lowest)?;
        self.expect_semicolon()?;

        let span = target.span.merge(value.span());
        Ok(Stmt::Assign(AssignStmt {
            target,
            op,
            value,
            span,
        }))
    }

    /// `var NAME : TYPE (= expr)? ;`
    fn parse_var(&mut self) -> ParseResult<Stmt> {
        let start = self.current().span;

        self.expect_peek(TokenKind::Ident, "Expected identifier after 'var'")?;
        let name = self.parse_identifier();

        self.expect_peek(TokenKind::Colon, "Expected colon ':' after identifier")?;
        let ty = self.parse_type()?;

        // Declaration without initializer.
        if self.peek_kind() == Some(TokenKind::Semicolon) {
            let span = start.merge(self.current().span);
            self.advance();
            return Ok(Stmt::Var(VarStmt {
                name,
                ty,
                init: None,
                span,
            }));
        }

        self.expect_peek(TokenKind::Eq, "Expected '=' or ';' after type")?;
        self.advance();
        let init = self.parse_expression(Precedence::Lowest)?;
        self.expect_semicolon()?;

        let span = start.merge(init.span());
        Ok(Stmt::Var(VarStmt {
            name,
            ty,
            init: Some(init),
            span,
        }))
    }

    /// `if expr : stmt* ('elif' expr ':' stmt*)* ('else' ':' stmt*)? end`
    ///
    /// `elif` is parsed by recursively parsing another `if` into the current
    /// else-body; the whole chain shares a single `end`.
    fn parse_if(&mut self) -> ParseResult<Stmt> {
        let start = self.current().span;
        self.advance();

        let cond = self.parse_expression(Precedence::Lowest)?;
        self.expect_peek(TokenKind::Colon, "Expected colon ':' after condition")?;
        self.advance();

        let mut body = Vec::new();
        while !matches!(
            self.current_kind(),
            TokenKind::Elif | TokenKind::Else | TokenKind::End | TokenKind::Eof
        ) {
            match self.parse_statement() {
                Ok(stmt) => {
                    body.push(stmt);
                    self.advance();
                },
                Err(Recovered) => {},
            }
        }

        let mut else_body = Vec::new();
        if self.current_kind() == TokenKind::Elif {
            else_body.push(self.parse_if()?);
        } else if self.current_kind() == TokenKind::Else {
            self.expect_peek(TokenKind::Colon, "Expected colon ':' after 'else'")?;
            self.advance();

            while !matches!(self.current_kind(), TokenKind::End | TokenKind::Eof) {
                match self.parse_statement() {
                    Ok(stmt) => {
                        else_body.push(stmt);
                        self.advance();
                    },
                    Err(Recovered) => {},
                }
            }
        }

        self.expect_current_is(TokenKind::End, "Expected 'end' after if block")?;

        let span = start.merge(self.current().span);
        Ok(Stmt::If(IfStmt {
            cond,
            body,
            else_body,
            span,
        }))
    }

    /// `while expr : stmt* end`
    fn parse_while(&mut self) -> ParseResult<Stmt> {
        let start = self.current().span;
        self.advance();

        let cond = self.parse_expression(Precedence::Lowest)?;
        self.expect_peek(TokenKind::Colon, "Expected colon ':' after condition")?;
        self.advance();

        let mut body = Vec::new();
        while !matches!(self.current_kind(), TokenKind::End | TokenKind::Eof) {
            match self.parse_statement() {
                Ok(stmt) => {
                    body.push(stmt);
                    self.advance();
                },
                Err(Recovered) => {},
            }
        }

        self.expect_current_is(TokenKind::End, "Expected 'end' after while block")?;

        let span = start.merge(self.current().span);
        Ok(Stmt::While(WhileStmt { cond, body, span }))
    }

    /// `break ;`
    fn parse_break(&mut self) -> ParseResult<Stmt> {
        let span = self.current().span;
        self.expect_semicolon()?;
        Ok(Stmt::Break(span))
    }

    /// `continue ;`
    fn parse_continue(&mut self) -> ParseResult<Stmt> {
        let span = self.current().span;
        self.expect_semicolon()?;
        Ok(Stmt::Continue(span))
    }

    /// `import "path" ;`
    fn parse_import(&mut self) -> ParseResult<Stmt> {
        let start = self.current().span;

        self.expect_peek(TokenKind::Str, "Expected a file path after 'import'")?;
        let path = self.current().literal.clone();
        let span = start.merge(self.current().span);

        self.expect_semicolon()?;
        Ok(Stmt::Import(ImportStmt { path, span }))
    }

    /// `def NAME ( params? ) -> TYPE : stmt* end`
    fn parse_function(&mut self) -> ParseResult<Stmt> {
        let start = self.current().span;

        self.expect_peek(TokenKind::Ident, "Expected identifier after 'def'")?;
        let name = self.parse_identifier();

        self.expect_peek(TokenKind::LParen, "Expected left parenthesis '('")?;
        let params = self.parse_function_parameters()?;

        self.expect_peek(TokenKind::Arrow, "Expected an arrow '->'")?;
        let ret = self.parse_type()?;

        self.expect_peek(TokenKind::Colon, "Expected colon ':' after type")?;
        self.advance();

        let mut body = Vec::new();
        while !matches!(self.current_kind(), TokenKind::End | TokenKind::Eof) {
            match self.parse_statement() {
                Ok(stmt) => {
                    body.push(stmt);
                    self.advance();
                },
                Err(Recovered) => {},
            }
        }

        self.expect_current_is(TokenKind::End, "Expected 'end' keyword after function body")?;

        let span = start.merge(self.current().span);
        Ok(Stmt::Function(FnStmt {
            name,
            params,
            ret,
            body,
            span,
        }))
    }

    /// `IDENT : TYPE (, IDENT : TYPE)*` inside parentheses. The current
    /// token is `(` on entry and `)` on success.
    fn parse_function_parameters(&mut self) -> ParseResult<Vec<Param>> {
        let mut params = Vec::new();

        if self.peek_kind() == Some(TokenKind::RParen) {
            self.advance();
            return Ok(params);
        }

        self.expect_peek(TokenKind::Ident, "Expected an identifier after '('")?;
        params.push(self.parse_parameter()?);

        while self.peek_kind() == Some(TokenKind::Comma) {
            self.advance();
            self.expect_peek(TokenKind::Ident, "Expected identifier after ','")?;
            params.push(self.parse_parameter()?);
        }

        self.expect_peek(TokenKind::RParen, "Expected right parenthesis ')'")?;
        Ok(params)
    }

    /// One `NAME : TYPE` parameter; the current token is the name.
    fn parse_parameter(&mut self) -> ParseResult<Param> {
        let name = self.current().literal.clone();
        let start = self.current().span;

        self.expect_peek(TokenKind::Colon, "Expected colon ':' after identifier")?;
        let ty = self.parse_type()?;

        let span = start.merge(self.current().span);
        Ok(Param { name, ty, span })
    }

    /// `return expr ;`
    fn parse_return(&mut self) -> ParseResult<Stmt> {
        let start = self.current().span;
        self.advance();

        let value = self.parse_expression(Precedence::Lowest)?;
        self.expect_semicolon()?;

        let span = start.merge(value.span());
        Ok(Stmt::Return(ReturnStmt { value, span }))
    }

    /// `expr ;`
    fn parse_expression_statement(&mut self) -> ParseResult<Stmt> {
        let expr = self.parse_expression(Precedence::Lowest)?;
        self.expect_semicolon()?;

        let span = expr.span();
        Ok(Stmt::Expr(ExprStmt { expr, span }))
    }

    /// Consumes a TYPE token (advancing onto it) and maps it to a [`Ty`].
    fn parse_type(&mut self) -> ParseResult<Ty> {
        self.expect_peek(TokenKind::Type, "Expected a type name")?;
        match Ty::from_name(&self.current().literal) {
            Some(ty) => Ok(ty),
            None => {
                let span = self.current().span;
                let message = format!("Unknown type '{}'", self.current().literal);
                Err(self.recover(span, message))
            },
        }
    }

    /// Builds an [`Ident`] from the current token.
    pub(crate) fn parse_identifier(&mut self) -> Ident {
        Ident {
            name: self.current().literal.clone(),
            span: self.current().span,
        }
    }
}
