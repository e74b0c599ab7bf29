//! Operator and punctuation lexing.
//!
//! Multi-character operators are disambiguated with one character of
//! lookahead: `+` may become `+=`, `-` may become `->` or `-=`, `*` may
//! become `**`, `**=` or `*=`, and so on. A bare `!` is a lexical error.

use crate::token::{Token, TokenKind};
use crate::Lexer;

impl<'a> Lexer<'a> {
    /// Lexes `+` or `+=`.
    pub(crate) fn lex_plus(&mut self) -> Token {
        self.cursor.advance();
        if self.cursor.match_char('=') {
            self.make_token(TokenKind::PlusEq)
        } else {
            self.make_token(TokenKind::Plus)
        }
    }

    /// Lexes `-`, `->` or `-=`.
    pub(crate) fn lex_minus(&mut self) -> Token {
        self.cursor.advance();
        if self.cursor.match_char('>') {
            self.make_token(TokenKind::Arrow)
        } else if self.cursor.match_char('=') {
            self.make_token(TokenKind::MinusEq)
        } else {
            self.make_token(TokenKind::Minus)
        }
    }

    /// Lexes `*`, `*=`, `**` or `**=`.
    pub(crate) fn lex_star(&mut self) -> Token {
        self.cursor.advance();
        if self.cursor.match_char('*') {
            if self.cursor.match_char('=') {
                self.make_token(TokenKind::PowEq)
            } else {
                self.make_token(TokenKind::Pow)
            }
        } else if self.cursor.match_char('=') {
            self.make_token(TokenKind::StarEq)
        } else {
            self.make_token(TokenKind::Star)
        }
    }

    /// Lexes `/` or `/=`.
    pub(crate) fn lex_slash(&mut self) -> Token {
        self.cursor.advance();
        if self.cursor.match_char('=') {
            self.make_token(TokenKind::SlashEq)
        } else {
            self.make_token(TokenKind::Slash)
        }
    }

    /// Lexes `%` or `%=`.
    pub(crate) fn lex_percent(&mut self) -> Token {
        self.cursor.advance();
        if self.cursor.match_char('=') {
            self.make_token(TokenKind::PercentEq)
        } else {
            self.make_token(TokenKind::Percent)
        }
    }

    /// Lexes `=` or `==`.
    pub(crate) fn lex_equals(&mut self) -> Token {
        self.cursor.advance();
        if self.cursor.match_char('=') {
            self.make_token(TokenKind::EqEq)
        } else {
            self.make_token(TokenKind::Eq)
        }
    }

    /// Lexes `>` or `>=`.
    pub(crate) fn lex_greater(&mut self) -> Token {
        self.cursor.advance();
        if self.cursor.match_char('=') {
            self.make_token(TokenKind::GtEq)
        } else {
            self.make_token(TokenKind::Gt)
        }
    }

    /// Lexes `<` or `<=`.
    pub(crate) fn lex_less(&mut self) -> Token {
        self.cursor.advance();
        if self.cursor.match_char('=') {
            self.make_token(TokenKind::LtEq)
        } else {
            self.make_token(TokenKind::Lt)
        }
    }

    /// Lexes `!=`. A bare `!` is an error and yields an `Illegal` token.
    pub(crate) fn lex_bang(&mut self) -> Token {
        self.cursor.advance();
        if self.cursor.match_char('=') {
            self.make_token(TokenKind::NotEq)
        } else {
            self.report_error("Invalid token: '!' must be followed by '='");
            self.make_token(TokenKind::Illegal)
        }
    }
}
