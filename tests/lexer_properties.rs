//! Property tests for the line scanner.

use linescript::{KeywordKind, Scanner, Token, TokenKind, Type, Value, VariableTable};
use proptest::prelude::*;

fn scan(line: &str) -> Result<Vec<Token>, linescript::Error> {
    let mut variables = VariableTable::new(4096);
    Scanner::analyse(line, 0, &mut variables)
}

fn kinds(line: &str) -> Option<Vec<TokenKind>> {
    scan(line)
        .ok()
        .map(|tokens| tokens.into_iter().map(|t| t.kind).collect())
}

fn is_reserved(word: &str) -> bool {
    KeywordKind::from_lexeme(word).is_some()
        || Type::from_name(word).is_some()
        || matches!(word, "True" | "False" | "std")
}

proptest! {
    #[test]
    fn integer_literals_round_trip(n in 0i64..=i64::MAX) {
        let tokens = scan(&format!("x = {}", n)).unwrap();
        prop_assert_eq!(&tokens[2].kind, &TokenKind::Value(Value::Int(n)));
    }

    #[test]
    fn float_literals_parse_like_f64(a in 0u32..100_000u32, b in 0u32..1000u32) {
        let text = format!("{}.{:03}", a, b);
        let expected: f64 = text.parse().unwrap();
        let tokens = scan(&format!("x = {}", text)).unwrap();
        prop_assert_eq!(&tokens[2].kind, &TokenKind::Value(Value::Float(expected)));
    }

    #[test]
    fn arbitrary_printable_input_never_panics(line in "[ -~]{0,60}") {
        let _ = scan(&line);
    }

    #[test]
    fn arbitrary_unicode_input_never_panics(line in "\\PC{0,40}") {
        let _ = scan(&line);
    }

    #[test]
    fn valid_identifiers_become_variables(
        word in "[a-zA-Z_]{0,3}[a-zA-Z][a-zA-Z0-9_]{0,8}"
            .prop_filter("reserved word", |w| !is_reserved(w))
    ) {
        let tokens = scan(&word).unwrap();
        prop_assert_eq!(tokens.len(), 1);
        prop_assert_eq!(&tokens[0].kind, &TokenKind::Variable(word.clone()));
    }

    #[test]
    fn whitespace_does_not_change_token_kinds(
        a in 0i64..1000,
        b in 0i64..1000,
        op in prop::sample::select(vec!["+", "*", "/", "%", "-"]),
    ) {
        let tight = format!("x={}{}{}", a, op, b);
        let spaced = format!("x = {} {} {}", a, op, b);
        prop_assert_eq!(kinds(&tight).unwrap(), kinds(&spaced).unwrap());
    }

    #[test]
    fn safe_string_literals_round_trip(text in "[a-zA-Z0-9 ]{0,24}") {
        let tokens = scan(&format!("s = \"{}\"", text)).unwrap();
        prop_assert_eq!(&tokens[2].kind, &TokenKind::Value(Value::Str(text.clone())));
    }

    #[test]
    fn comments_are_invisible_to_the_token_stream(comment in "[ -~]{0,30}") {
        prop_assert_eq!(
            kinds(&format!("x = 1 # {}", comment)).unwrap(),
            kinds("x = 1").unwrap()
        );
    }

    #[test]
    fn scanning_is_deterministic(line in "[ -~]{0,40}") {
        let first = kinds(&line);
        let second = kinds(&line);
        prop_assert_eq!(first, second);
    }
}
