//! Identifier and keyword lexing.

use crate::token::{keyword_from_ident, Token, TokenKind};
use crate::Lexer;

/// Returns true if `c` can continue an identifier (`[A-Za-z0-9_]`).
#[inline]
pub(crate) fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

impl<'a> Lexer<'a> {
    /// Lexes an identifier or keyword.
    ///
    /// Identifiers are greedy `[A-Za-z_][A-Za-z0-9_]*`; the resulting text is
    /// run through the keyword/type lookup table.
    pub(crate) fn lex_identifier(&mut self) -> Token {
        while is_ident_continue(self.cursor.current_char()) {
            self.cursor.advance();
        }

        let text = self.cursor.slice_from(self.token_start.byte);
        let kind = keyword_from_ident(text).unwrap_or(TokenKind::Ident);
        self.make_token(kind)
    }
}
