//! String literal lexing.
//!
//! A `\` escapes the following character by keeping both characters verbatim
//! in the literal text; decoding escape sequences is deferred to the lowering
//! stage. The token literal is the string contents without the surrounding
//! quotes.

use crate::token::{Token, TokenKind};
use crate::Lexer;

impl<'a> Lexer<'a> {
    /// Lexes a string literal. Reports an unterminated string at end of
    /// input.
    pub(crate) fn lex_string(&mut self) -> Token {
        let mut content = String::new();

        self.cursor.advance(); // opening quote

        while !self.cursor.is_at_end() && self.cursor.current_char() != '"' {
            let c = self.cursor.current_char();
            content.push(c);
            if c == '\\' {
                self.cursor.advance();
                if self.cursor.is_at_end() {
                    break;
                }
                content.push(self.cursor.current_char());
            }
            self.cursor.advance();
        }

        if self.cursor.is_at_end() {
            self.report_error("Unterminated string literal");
        } else {
            self.cursor.advance(); // closing quote
        }

        Token::new(TokenKind::Str, content, self.span_from_start())
    }
}
