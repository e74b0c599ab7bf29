//! Edge cases and property tests for the lexer and sanitizer.

use proptest::prelude::*;

use crate::sanitizer::sanitize;
use crate::token::{Token, TokenKind};
use crate::Lexer;
use opalc_util::{FileId, Handler};

fn lex(source: &str) -> Vec<Token> {
    let handler = Handler::new();
    Lexer::new(source, FileId(0), &handler).tokenize()
}

/// Reconstructs a lexeme's surface form from its token.
fn surface(token: &Token) -> String {
    match token.kind {
        TokenKind::Str => format!("\"{}\"", token.literal),
        _ => token.literal.clone(),
    }
}

/// One syntactically valid lexeme.
fn lexeme() -> impl Strategy<Value = String> {
    prop_oneof![
        proptest::string::string_regex("[a-z_][a-z0-9_]{0,8}").unwrap(),
        proptest::string::string_regex("[0-9]{1,6}").unwrap(),
        proptest::string::string_regex("[0-9]{1,4}\\.[0-9]{1,4}").unwrap(),
        proptest::string::string_regex("\"[ a-z0-9]{0,10}\"").unwrap(),
        prop_oneof![
            Just("+"), Just("-"), Just("*"), Just("/"), Just("%"), Just("**"),
            Just("="), Just("+="), Just("-="), Just("*="), Just("/="), Just("%="), Just("**="),
            Just("=="), Just("!="), Just("<"), Just(">"), Just("<="), Just(">="),
            Just("("), Just(")"), Just(":"), Just(","), Just(";"), Just("->"),
        ]
        .prop_map(|s| s.to_string()),
    ]
}

proptest! {
    /// Concatenating the literal text of all tokens, whitespace-separated,
    /// re-lexes to an equivalent token sequence.
    #[test]
    fn prop_token_round_trip(lexemes in proptest::collection::vec(lexeme(), 0..24)) {
        let source = lexemes.join(" ");
        let tokens = lex(&source);

        let rebuilt: Vec<String> = tokens
            .iter()
            .filter(|t| t.kind != TokenKind::Eof)
            .map(surface)
            .collect();
        let relexed = lex(&rebuilt.join(" "));

        let a: Vec<_> = tokens.iter().map(|t| (t.kind, t.literal.clone())).collect();
        let b: Vec<_> = relexed.iter().map(|t| (t.kind, t.literal.clone())).collect();
        prop_assert_eq!(a, b);
    }

    /// Successive tokens never overlap: `t[i].end <= t[i+1].start` by byte
    /// index, for arbitrary (including invalid) input.
    #[test]
    fn prop_position_monotonicity(source in ".*") {
        let tokens = lex(&source);
        for pair in tokens.windows(2) {
            prop_assert!(pair[0].span.end.byte <= pair[1].span.start.byte);
        }
    }

    /// `sanitize(sanitize(T)) == sanitize(T)` for arbitrary input.
    #[test]
    fn prop_asi_idempotence(source in ".*") {
        let once = sanitize(lex(&source));
        let twice = sanitize(once.clone());
        prop_assert_eq!(once, twice);
    }

    /// The lexer terminates with exactly one trailing EOF for any input.
    #[test]
    fn prop_single_eof(source in ".*") {
        let tokens = lex(&source);
        prop_assert_eq!(tokens.last().map(|t| t.kind), Some(TokenKind::Eof));
        let eofs = tokens.iter().filter(|t| t.kind == TokenKind::Eof).count();
        prop_assert_eq!(eofs, 1);
    }
}

#[test]
fn lexes_program_with_every_construct() {
    let source = r#"
import "lib.opal";

def weight(n: int, scale: float) -> float:
    var acc: float = 0.0;
    while n > 0:
        if n % 2 == 0: acc += scale end
        n -= 1;
    end
    return acc ** 2;
end

var message: str = "total: %f\n";
print(message, weight(10, 1.5));
"#;
    let handler = Handler::new();
    let tokens = Lexer::new(source, FileId(0), &handler).tokenize();
    assert!(!handler.has_errors());
    assert!(tokens.iter().any(|t| t.kind == TokenKind::Import));
    assert!(tokens.iter().any(|t| t.kind == TokenKind::Arrow));
    assert!(tokens.iter().any(|t| t.kind == TokenKind::PowEq || t.kind == TokenKind::Pow));
    assert!(tokens.iter().all(|t| t.kind != TokenKind::Illegal));
}

#[test]
fn errors_accumulate_across_the_whole_input() {
    let handler = Handler::new();
    let tokens = Lexer::new("@ ! $ \"open", FileId(0), &handler).tokenize();
    // Four distinct lexical errors, and the lexer still reached EOF.
    assert_eq!(handler.error_count(), 4);
    assert_eq!(tokens.last().unwrap().kind, TokenKind::Eof);
}
