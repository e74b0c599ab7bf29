//! Number literal lexing.
//!
//! Numbers accumulate digits and at most one decimal point. A second `.`
//! terminates the literal and is reported; the dot itself is left for the
//! next dispatch, where a bare `.` not followed by a digit is dropped with a
//! lexical error.

use crate::token::{Token, TokenKind};
use crate::Lexer;

impl<'a> Lexer<'a> {
    /// Lexes an integer or floating-point literal.
    ///
    /// Emits `Int` if no `.` was consumed, `Float` otherwise.
    pub(crate) fn lex_number(&mut self) -> Token {
        let mut decimal_count = 0;

        loop {
            let c = self.cursor.current_char();
            if c == '.' {
                if decimal_count == 0 {
                    decimal_count += 1;
                } else {
                    let number = self.cursor.slice_from(self.token_start.byte);
                    self.report_error(format!(
                        "Invalid number format: multiple decimal points in '{}.'",
                        number
                    ));
                    break;
                }
            } else if !c.is_ascii_digit() {
                break;
            }
            self.cursor.advance();
        }

        if decimal_count == 0 {
            self.make_token(TokenKind::Int)
        } else {
            self.make_token(TokenKind::Float)
        }
    }

    /// Checks whether the current `.` does not start a float literal.
    pub(crate) fn is_bare_decimal_point(&self) -> bool {
        self.cursor.current_char() == '.' && !self.cursor.peek_char().is_ascii_digit()
    }

    /// Reports a `.` that is not followed by a digit.
    pub(crate) fn report_bare_decimal_point(&self) {
        self.report_error("Invalid token: decimal point must be followed by a digit");
    }
}
