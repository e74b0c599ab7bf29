//! opalc-lex - Lexical analysis for the Opal language.
//!
//! This crate turns source text into a stream of [`Token`]s and provides the
//! automatic-semicolon-insertion pass ([`sanitize`]) that runs between lexing
//! and parsing. The stream is always terminated by a single `Eof` token, and
//! every token carries its literal text and source span.
//!
//! Lexical errors (unrecognized characters, bad decimal points, unterminated
//! strings, a bare `!`) accumulate in the shared
//! [`Handler`](opalc_util::Handler); the lexer always runs to end of input.

pub mod cursor;
pub mod lexer;
pub mod sanitizer;
pub mod token;

pub use cursor::Cursor;
pub use lexer::Lexer;
pub use sanitizer::sanitize;
pub use token::{keyword_from_ident, Token, TokenKind};

#[cfg(test)]
mod edge_cases;
