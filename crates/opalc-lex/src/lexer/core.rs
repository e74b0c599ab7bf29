//! Core lexer implementation.
//!
//! This module contains the main `Lexer` struct, the per-character dispatch,
//! and the shared token/error construction helpers used by the other lexer
//! submodules.

use opalc_util::{FileId, Handler, Pos, Span};

use crate::cursor::Cursor;
use crate::token::{Token, TokenKind};

/// Lexer for Opal source code.
///
/// The lexer transforms source text into a finite token sequence terminated
/// by a single `Eof` token. Errors are reported into the shared handler and
/// never stop the scan; the lexer always runs to end of input.
///
/// # Example
///
/// ```
/// use opalc_lex::{Lexer, TokenKind};
/// use opalc_util::{FileId, Handler};
///
/// let handler = Handler::new();
/// let tokens = Lexer::new("var x: int = 2;", FileId(0), &handler).tokenize();
///
/// assert_eq!(tokens.first().unwrap().kind, TokenKind::Var);
/// assert_eq!(tokens.last().unwrap().kind, TokenKind::Eof);
/// assert!(!handler.has_errors());
/// ```
pub struct Lexer<'a> {
    /// Character cursor for source traversal.
    pub(crate) cursor: Cursor<'a>,

    /// File the source belongs to.
    pub(crate) file: FileId,

    /// Error handler for reporting lexical errors.
    pub(crate) handler: &'a Handler,

    /// Position where the current token starts.
    pub(crate) token_start: Pos,
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer for the given source code.
    pub fn new(source: &'a str, file: FileId, handler: &'a Handler) -> Self {
        Self {
            cursor: Cursor::new(source),
            file,
            handler,
            token_start: Pos::START,
        }
    }

    /// Scans the whole input and returns the token sequence, terminated by
    /// `Eof`.
    pub fn tokenize(mut self) -> Vec<Token> {
        let mut tokens = Vec::new();

        loop {
            self.skip_whitespace_and_comments();
            if self.cursor.is_at_end() {
                break;
            }

            self.token_start = self.cursor.pos();
            if let Some(token) = self.scan_token() {
                tokens.push(token);
            }
        }

        let end = self.cursor.pos();
        tokens.push(Token::new(
            TokenKind::Eof,
            "",
            Span::point(end, self.file),
        ));
        tokens
    }

    /// Scans one lexeme. Returns `None` when the lexeme was consumed without
    /// producing a token (a dropped bare decimal point).
    fn scan_token(&mut self) -> Option<Token> {
        let token = match self.cursor.current_char() {
            c if c.is_ascii_alphabetic() || c == '_' => self.lex_identifier(),
            c if c.is_ascii_digit() || c == '.' => {
                if self.is_bare_decimal_point() {
                    self.report_bare_decimal_point();
                    self.cursor.advance();
                    return None;
                }
                self.lex_number()
            },
            '"' => self.lex_string(),
            '+' => self.lex_plus(),
            '-' => self.lex_minus(),
            '*' => self.lex_star(),
            '/' => self.lex_slash(),
            '%' => self.lex_percent(),
            '=' => self.lex_equals(),
            '>' => self.lex_greater(),
            '<' => self.lex_less(),
            '!' => self.lex_bang(),
            ':' => self.single_char(TokenKind::Colon),
            '(' => self.single_char(TokenKind::LParen),
            ')' => self.single_char(TokenKind::RParen),
            ',' => self.single_char(TokenKind::Comma),
            ';' => self.single_char(TokenKind::Semicolon),
            c => {
                self.report_error(format!("Unrecognized character: '{}'", c));
                self.cursor.advance();
                self.make_token(TokenKind::Illegal)
            },
        };
        Some(token)
    }

    /// Consumes a single-character token.
    pub(crate) fn single_char(&mut self, kind: TokenKind) -> Token {
        self.cursor.advance();
        self.make_token(kind)
    }

    /// Builds a token spanning from `token_start` to the current position,
    /// with the literal text taken from the source.
    pub(crate) fn make_token(&self, kind: TokenKind) -> Token {
        let literal = self.cursor.slice_from(self.token_start.byte);
        Token::new(kind, literal, self.span_from_start())
    }

    /// The span from `token_start` to the current cursor position.
    pub(crate) fn span_from_start(&self) -> Span {
        Span::new(self.token_start, self.cursor.pos(), self.file)
    }

    /// Reports a lexical error covering the current token.
    pub(crate) fn report_error(&self, message: impl Into<String>) {
        self.handler
            .error(self.span_from_start(), "Lexical Error", message);
    }
}
