//! Whitespace and comment skipping.
//!
//! Comments run from `#` to end of line and are skipped entirely.

use crate::Lexer;

impl<'a> Lexer<'a> {
    /// Skips all whitespace and `#`-to-end-of-line comments before the next
    /// lexeme.
    pub(crate) fn skip_whitespace_and_comments(&mut self) {
        loop {
            while !self.cursor.is_at_end() && self.cursor.current_char().is_whitespace() {
                self.cursor.advance();
            }

            if self.cursor.current_char() == '#' {
                while !self.cursor.is_at_end() && self.cursor.current_char() != '\n' {
                    self.cursor.advance();
                }
            } else {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::token::TokenKind;
    use crate::Lexer;
    use opalc_util::{FileId, Handler};

    fn kinds(source: &str) -> Vec<TokenKind> {
        let handler = Handler::new();
        Lexer::new(source, FileId(0), &handler)
            .tokenize()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_comment_to_eol() {
        assert_eq!(
            kinds("# leading comment\nx"),
            vec![TokenKind::Ident, TokenKind::Eof]
        );
    }

    #[test]
    fn test_comment_at_eof() {
        assert_eq!(kinds("x # trailing"), vec![TokenKind::Ident, TokenKind::Eof]);
    }

    #[test]
    fn test_consecutive_comment_lines() {
        assert_eq!(kinds("# one\n# two\n# three\ny"), vec![TokenKind::Ident, TokenKind::Eof]);
    }

    #[test]
    fn test_only_whitespace() {
        assert_eq!(kinds("  \t \n "), vec![TokenKind::Eof]);
    }
}
