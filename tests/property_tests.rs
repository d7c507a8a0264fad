// tests/property_tests.rs
//
// Property tests for normalization and the arity and shadowing rules.

mod common;

use common::{check, kinds};
use proptest::prelude::*;
use wqb_validator::syntax::normalize;
use wqb_validator::ErrorKind;

// -- Strategy helpers --

/// Text built from the characters the scanner treats specially, plus ordinary code.
fn arb_raw_text() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop_oneof![
            Just("#".to_string()),
            Just("/*".to_string()),
            Just("*/".to_string()),
            "[/*]",
            Just("\"".to_string()),
            Just("'".to_string()),
            Just("\\".to_string()),
            Just("\n".to_string()),
            Just("é".to_string()),
            "[a-z0-9_(), =+-]{1,6}",
        ],
        0..24,
    )
    .prop_map(|parts| parts.concat())
}

fn arb_field() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just("close"), Just("open"), Just("volume"), Just("returns")]
}

proptest! {
    #[test]
    fn normalization_is_idempotent(raw in arb_raw_text()) {
        let (once, _) = normalize(&raw);
        prop_assert_eq!(once.text.len(), raw.len());
        prop_assert_eq!(once.text.matches('\n').count(), raw.matches('\n').count());

        let (twice, _) = normalize(&once.text);
        prop_assert_eq!(&twice.text, &once.text);
        prop_assert_eq!(twice.disallowed, once.disallowed);
    }

    #[test]
    fn arity_holds_for_bounded_operator(args in prop::collection::vec(arb_field(), 0..6)) {
        let expression = format!("f({})", args.join(", "));
        let result = check(&expression);
        let arity_error = result.has_kind(ErrorKind::Arity);
        prop_assert_eq!(arity_error, args.is_empty() || args.len() > 3, "{}", expression);
        if (1..=3).contains(&args.len()) {
            prop_assert!(result.ok, "{}: {:?}", expression, result.errors);
        }
    }

    #[test]
    fn assigning_to_a_field_always_shadows(
        field in arb_field(),
        value in prop_oneof![Just("rank(close)"), Just("rank(cloze, 2)"), Just("bogus_op(1)")],
    ) {
        let expression = format!("{} = {}\n{}", field, value, field);
        let result = check(&expression);
        prop_assert!(kinds(&result).contains(&ErrorKind::Shadowing), "{}", expression);
    }
}
