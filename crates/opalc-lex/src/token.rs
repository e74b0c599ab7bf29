//! Token definitions for the Opal language.
//!
//! Each token records its kind, the literal text it was lexed from, and its
//! source span. Keywords and type names are distinguished from identifiers
//! at lex time through [`keyword_from_ident`].

use opalc_util::Span;

/// The closed set of token kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Identifiers and literals
    /// Identifier (variable or function name)
    Ident,
    /// Integer literal
    Int,
    /// Floating point literal
    Float,
    /// String literal (escape sequences kept verbatim; decoding happens at
    /// lowering)
    Str,
    /// "true"
    True,
    /// "false"
    False,

    // Arithmetic operators
    /// "+"
    Plus,
    /// "-"
    Minus,
    /// "*"
    Star,
    /// "/"
    Slash,
    /// "%"
    Percent,
    /// "**"
    Pow,

    // Assignment operators
    /// "="
    Eq,
    /// "+="
    PlusEq,
    /// "-="
    MinusEq,
    /// "*="
    StarEq,
    /// "/="
    SlashEq,
    /// "%="
    PercentEq,
    /// "**="
    PowEq,

    // Comparison operators
    /// "=="
    EqEq,
    /// "!="
    NotEq,
    /// "<"
    Lt,
    /// ">"
    Gt,
    /// "<="
    LtEq,
    /// ">="
    GtEq,

    // Delimiters
    /// "("
    LParen,
    /// ")"
    RParen,
    /// ":"
    Colon,
    /// ","
    Comma,
    /// ";"
    Semicolon,

    // Keywords
    /// "and"
    And,
    /// "or"
    Or,
    /// "not"
    Not,
    /// "var"
    Var,
    /// "def"
    Def,
    /// "return"
    Return,
    /// "if"
    If,
    /// "elif"
    Elif,
    /// "else"
    Else,
    /// "while"
    While,
    /// "continue"
    Continue,
    /// "break"
    Break,
    /// "import"
    Import,
    /// "end"
    End,

    /// A type name: `int`, `float`, `bool`, `str` or `void`
    Type,

    /// "->"
    Arrow,

    /// End of file marker
    Eof,

    /// Unrecognized input, kept for error recovery
    Illegal,
}

/// A lexical unit: kind, literal text and source span.
#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    /// The token kind.
    pub kind: TokenKind,
    /// The literal text (for strings: the contents without quotes, escapes
    /// verbatim).
    pub literal: String,
    /// Where the token sits in the source.
    pub span: Span,
}

impl Token {
    /// Create a new token.
    pub fn new(kind: TokenKind, literal: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            literal: literal.into(),
            span,
        }
    }
}

/// Looks up an identifier in the fixed keyword/type table.
///
/// Returns the keyword or `Type` kind, or `None` for a plain identifier.
pub fn keyword_from_ident(ident: &str) -> Option<TokenKind> {
    let kind = match ident {
        "and" => TokenKind::And,
        "or" => TokenKind::Or,
        "not" => TokenKind::Not,
        "var" => TokenKind::Var,
        "def" => TokenKind::Def,
        "return" => TokenKind::Return,
        "if" => TokenKind::If,
        "elif" => TokenKind::Elif,
        "else" => TokenKind::Else,
        "true" => TokenKind::True,
        "false" => TokenKind::False,
        "while" => TokenKind::While,
        "continue" => TokenKind::Continue,
        "break" => TokenKind::Break,
        "import" => TokenKind::Import,
        "end" => TokenKind::End,
        "int" | "float" | "bool" | "str" | "void" => TokenKind::Type,
        _ => return None,
    };
    Some(kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_lookup() {
        assert_eq!(keyword_from_ident("var"), Some(TokenKind::Var));
        assert_eq!(keyword_from_ident("def"), Some(TokenKind::Def));
        assert_eq!(keyword_from_ident("end"), Some(TokenKind::End));
        assert_eq!(keyword_from_ident("true"), Some(TokenKind::True));
        assert_eq!(keyword_from_ident("not"), Some(TokenKind::Not));
    }

    #[test]
    fn test_type_lookup() {
        for ty in ["int", "float", "bool", "str", "void"] {
            assert_eq!(keyword_from_ident(ty), Some(TokenKind::Type));
        }
    }

    #[test]
    fn test_plain_identifier() {
        assert_eq!(keyword_from_ident("x"), None);
        assert_eq!(keyword_from_ident("variable"), None);
        assert_eq!(keyword_from_ident("ends"), None);
        assert_eq!(keyword_from_ident("integer"), None);
    }
}
