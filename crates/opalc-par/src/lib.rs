//! opalc-par - Parser for the Opal language.
//!
//! Recursive descent for statements, Pratt precedence climbing for
//! expressions. The parser consumes the sanitized token stream (see
//! `opalc_lex::sanitize`) and produces a [`Program`].
//!
//! # Error recovery
//!
//! On a syntax error the parser records a diagnostic with the offending
//! token's range, synchronizes by skipping to the next `;` (or EOF),
//! advances past it, and resumes with the following statement. A failed
//! statement contributes no node to its parent; the running log of recovery
//! events is emitted through `log` at end-of-parse. The parser is total: it
//! terminates on every input, producing either a program or at least one
//! diagnostic.

pub mod ast;
mod expr;
mod stmt;

pub use ast::{
    AssignOp, AssignStmt, BinOp, BoolLit, CallExpr, Expr, ExprStmt, FloatLit, FnStmt, Ident,
    IfStmt, ImportStmt, InfixExpr, IntLit, Param, PrefixExpr, PrefixOp, Program, ReturnStmt,
    Stmt, StrLit, Ty, VarStmt, WhileStmt,
};
pub use expr::Precedence;

use opalc_lex::{Token, TokenKind};
use opalc_util::{Handler, Span};

/// Marker for a statement that failed to parse; the diagnostic has already
/// been recorded and the token stream synchronized.
#[derive(Debug)]
pub(crate) struct Recovered;

pub(crate) type ParseResult<T> = Result<T, Recovered>;

/// Parser for the sanitized token stream.
pub struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    handler: &'a Handler,
    recoveries: Vec<String>,
}

impl<'a> Parser<'a> {
    /// Creates a parser over a token stream. The stream is expected to be
    /// terminated by an `Eof` token, as produced by the lexer.
    pub fn new(tokens: Vec<Token>, handler: &'a Handler) -> Self {
        Self {
            tokens,
            pos: 0,
            handler,
            recoveries: Vec::new(),
        }
    }

    /// Parses the entire program, recovering after each failed statement.
    pub fn parse_program(&mut self) -> Program {
        let mut program = Vec::new();

        while self.current_kind() != TokenKind::Eof {
            match self.parse_statement() {
                Ok(stmt) => {
                    program.push(stmt);
                    // The current token is the statement terminator (`;` or
                    // `end`); step past it.
                    self.advance();
                },
                Err(Recovered) => {},
            }
        }

        if !self.recoveries.is_empty() {
            log::debug!("parser synchronized {} time(s):", self.recoveries.len());
            for note in &self.recoveries {
                log::debug!("  {}", note);
            }
        }

        program
    }

    /// Number of recovery events during the last parse.
    pub fn recovery_count(&self) -> usize {
        self.recoveries.len()
    }

    // =========================================================================
    // Token stream plumbing
    // =========================================================================

    /// The current token. Clamped to the trailing `Eof` once the stream is
    /// exhausted.
    pub(crate) fn current(&self) -> &Token {
        let idx = self.pos.min(self.tokens.len().saturating_sub(1));
        &self.tokens[idx]
    }

    pub(crate) fn current_kind(&self) -> TokenKind {
        self.current().kind
    }

    /// The next token, if any.
    pub(crate) fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos + 1)
    }

    pub(crate) fn peek_kind(&self) -> Option<TokenKind> {
        self.peek().map(|t| t.kind)
    }

    pub(crate) fn advance(&mut self) {
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
    }

    /// Skips tokens until one of `sync_kinds` (or EOF) is the current token.
    pub(crate) fn synchronize(&mut self, sync_kinds: &[TokenKind]) {
        while self.current_kind() != TokenKind::Eof && !sync_kinds.contains(&self.current_kind()) {
            self.advance();
        }
    }

    /// Records a syntax error at `span`, synchronizes to the next `;`,
    /// advances past it and returns the recovery marker.
    pub(crate) fn recover(&mut self, span: Span, message: impl Into<String>) -> Recovered {
        let message = message.into();
        self.handler.error(span, "Syntax Error", message.as_str());
        self.recoveries
            .push(format!("synchronizing after error: {}", message));
        self.synchronize(&[TokenKind::Semicolon]);
        self.advance();
        Recovered
    }

    /// Checks that the next token has the expected kind and advances onto
    /// it. On failure the error points at the offending (peeked) token.
    pub(crate) fn expect_peek(&mut self, kind: TokenKind, message: &str) -> ParseResult<()> {
        if self.peek_kind() == Some(kind) {
            self.advance();
            Ok(())
        } else {
            let span = self.peek().map(|t| t.span).unwrap_or(self.current().span);
            Err(self.recover(span, message))
        }
    }

    /// Checks that the current token has the expected kind, without
    /// advancing.
    pub(crate) fn expect_current_is(&mut self, kind: TokenKind, message: &str) -> ParseResult<()> {
        if self.current_kind() == kind {
            Ok(())
        } else {
            let span = self.current().span;
            Err(self.recover(span, message))
        }
    }

    /// Checks for the `;` terminating a simple statement. A block delimiter
    /// (`end`, `elif`, `else`) immediately after the statement also closes
    /// it, which is what lets `if n <= 1: return 1 end` sit on one line
    /// where no line break exists for the sanitizer to act on. On failure
    /// the error points at the current token (the end of whatever the
    /// statement managed to parse).
    pub(crate) fn expect_semicolon(&mut self) -> ParseResult<()> {
        match self.peek_kind() {
            Some(TokenKind::Semicolon) => {
                self.advance();
                Ok(())
            },
            Some(TokenKind::End | TokenKind::Elif | TokenKind::Else) => Ok(()),
            _ => {
                let span = self.current().span;
                Err(self.recover(span, "Expected semicolon ';' after expression"))
            },
        }
    }
}
