//! Automatic semicolon insertion.
//!
//! The grammar requires `;` to terminate simple statements, but the language
//! permits omitting them where a line break makes intent unambiguous. This
//! pass rewrites the token stream after lexing, inserting synthetic
//! `Semicolon` tokens at significant line breaks. It only ever inserts;
//! token order is preserved, and running the pass twice changes nothing.

use std::collections::HashSet;

use opalc_util::Span;

use crate::token::{Token, TokenKind};

/// Token kinds that can end an expression.
fn is_expression_closer(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::RParen
            | TokenKind::Ident
            | TokenKind::Str
            | TokenKind::Int
            | TokenKind::Float
            | TokenKind::False
            | TokenKind::True
    )
}

/// Token kinds that can start a statement.
fn is_statement_starter(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::LParen
            | TokenKind::Ident
            | TokenKind::Str
            | TokenKind::Int
            | TokenKind::Float
            | TokenKind::False
            | TokenKind::True
            | TokenKind::Def
            | TokenKind::Return
            | TokenKind::If
            | TokenKind::Elif
            | TokenKind::Else
            | TokenKind::End
            | TokenKind::Var
            | TokenKind::While
            | TokenKind::Break
            | TokenKind::Continue
    )
}

/// Statement-starter keywords that may follow a value-less `return` on the
/// next line.
fn follows_bare_return(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Break
            | TokenKind::Continue
            | TokenKind::Def
            | TokenKind::Elif
            | TokenKind::Else
            | TokenKind::End
            | TokenKind::If
            | TokenKind::Return
            | TokenKind::Var
            | TokenKind::While
    )
}

/// Rewrites the token stream, inserting semicolons at significant line
/// breaks and before EOF.
///
/// A semicolon is inserted after `prev` when `prev` and `cur` sit on
/// different lines and either
///
/// 1. `prev` closes an expression and `cur` starts a statement, or
/// 2. `prev` is `break`/`continue` (these terminate unconditionally), or
/// 3. `prev` is `return` and `cur` is a statement-starter keyword.
///
/// A final semicolon is inserted before EOF when the last real token can end
/// a statement. Inserted tokens carry a synthetic range at the end of
/// `prev`.
pub fn sanitize(tokens: Vec<Token>) -> Vec<Token> {
    let mut insert_positions: HashSet<usize> = HashSet::new();

    let mut prev: Option<&Token> = None;
    for cur in &tokens {
        if let Some(prev) = prev {
            if cur.kind != TokenKind::Eof && prev.span.end.line != cur.span.start.line {
                if is_expression_closer(prev.kind) && is_statement_starter(cur.kind) {
                    insert_positions.insert(prev.span.end.byte);
                } else if matches!(prev.kind, TokenKind::Break | TokenKind::Continue) {
                    insert_positions.insert(prev.span.end.byte);
                } else if prev.kind == TokenKind::Return && follows_bare_return(cur.kind) {
                    insert_positions.insert(prev.span.end.byte);
                }
            } else if cur.kind == TokenKind::Eof
                && (is_expression_closer(prev.kind)
                    || matches!(
                        prev.kind,
                        TokenKind::Break | TokenKind::Continue | TokenKind::Return
                    ))
            {
                insert_positions.insert(prev.span.end.byte);
            }
        }
        prev = Some(cur);
    }

    let mut sanitized = Vec::with_capacity(tokens.len() + insert_positions.len());
    for token in tokens {
        let insert_here =
            token.kind != TokenKind::Eof && insert_positions.contains(&token.span.end.byte);
        let file = token.span.file;
        let at = token.span.end;
        sanitized.push(token);
        if insert_here {
            let span = Span::new(at, at.advanced_over(';'), file);
            sanitized.push(Token::new(TokenKind::Semicolon, ";", span));
        }
    }

    sanitized
}
