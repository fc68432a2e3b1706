//! Property-based tests for matcher invariants.
//!
//! Verifies:
//! 1. A literal matches exactly when the input starts with it, consuming
//!    exactly its length.
//! 2. A failed attempt never moves the cursor, through any combinator.
//! 3. A sequence of two integers yields both values, in order.
//! 4. Zero-or-more over input it cannot match succeeds empty without moving.
//! 5. Integers within range round through the `int_` primitive.
//! 6. A failed attempt never moves the cursor when the matcher calls rules of
//!    a grammar, including recursive ones and omitted subtrees.

use proptest::prelude::*;
use quill::attribute::Attribute;
use quill::cursor::Cursor;
use quill::driver::match_at;
use quill::prelude::*;

// ── Strategy helpers ──────────────────────────────────────────────────

fn arb_matcher() -> impl Strategy<Value = Matcher> {
    let leaf = prop_oneof![
        "[a-c]{1,3}".prop_map(lit),
        Just(int_()),
        Just(real()),
        Just(alpha()),
        Just(digit()),
        Just(quoted('"')),
    ];
    leaf.prop_recursive(4, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 1..4).prop_map(sequence_of),
            prop::collection::vec(inner.clone(), 1..4).prop_map(any_of),
            inner.clone().prop_map(zero_or_more),
            inner.clone().prop_map(one_or_more),
            inner.clone().prop_map(optional),
            inner.clone().prop_map(lexeme),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| except(a, b)),
            (inner.clone(), inner).prop_map(|(a, b)| separated(a, b)),
        ]
    })
}

/// num = int; pair = '(' num ',' num ')'; nest = '(' -nest ')'; word = lexeme[+alpha]
fn rule_grammar() -> Grammar {
    let i32_ = Shape::Int(IntWidth::I32);
    let mut g = GrammarBuilder::new("rules");
    let num = g.define("num", i32_.clone(), int_()).unwrap();
    g.define(
        "pair",
        Shape::Tuple(vec![i32_.clone(), i32_]),
        lit("(").then(num.clone()).then(lit(",")).then(num).then(lit(")")),
    )
    .unwrap();
    let nest = g.declare("nest", Shape::Unused).unwrap();
    g.bind("nest", lit("(").then(optional(nest)).then(lit(")")))
        .unwrap();
    g.define("word", Shape::Text, lexeme(one_or_more(alpha())))
        .unwrap();
    g.entry("pair");
    g.build().unwrap()
}

fn arb_rule_matcher() -> impl Strategy<Value = Matcher> {
    let leaf = prop_oneof![
        Just(rule("num")),
        Just(rule("pair")),
        Just(rule("nest")),
        Just(rule("word")),
        prop_oneof![Just("("), Just(")"), Just(",")].prop_map(lit),
        Just(int_()),
        Just(alpha()),
    ];
    leaf.prop_recursive(4, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 1..4).prop_map(sequence_of),
            prop::collection::vec(inner.clone(), 1..4).prop_map(any_of),
            inner.clone().prop_map(zero_or_more),
            inner.clone().prop_map(one_or_more),
            inner.clone().prop_map(optional),
            inner.clone().prop_map(omit),
            (inner.clone(), inner).prop_map(|(a, b)| except(a, b)),
        ]
    })
}

fn arb_skip() -> impl Strategy<Value = Skipper> {
    prop_oneof![Just(Skipper::Nothing), Just(Skipper::Whitespace)]
}

// ── Properties ────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn literal_matches_iff_prefix(text in "[ab]{1,4}", input in "[ab]{0,6}") {
        let mut cursor = Cursor::new(&input);
        let value = match_at(&lit(text.clone()), &mut cursor, &Skipper::Nothing).unwrap();
        if input.starts_with(&text) {
            prop_assert_eq!(value, Some(Attribute::Unused));
            prop_assert_eq!(cursor.position(), text.len());
        } else {
            prop_assert_eq!(value, None);
            prop_assert_eq!(cursor.position(), 0);
        }
    }

    #[test]
    fn failure_never_moves_the_cursor(
        matcher in arb_matcher(),
        skip in arb_skip(),
        input in "[a-c0-9 .\"+-]{0,12}",
        start in 0usize..4,
    ) {
        let mut cursor = Cursor::new(&input);
        cursor.advance(start.min(input.len()));
        let before = cursor.position();
        // Overflow aborts are not match failures; only NoMatch is checked.
        if let Ok(None) = match_at(&matcher, &mut cursor, &skip) {
            prop_assert_eq!(cursor.position(), before);
        }
    }

    #[test]
    fn failure_through_rules_never_moves_the_cursor(
        matcher in arb_rule_matcher(),
        skip in arb_skip(),
        input in "[a-c0-9 (),]{0,12}",
        start in 0usize..4,
    ) {
        let grammar = rule_grammar();
        let mut cursor = Cursor::new(&input);
        cursor.advance(start);
        let before = cursor.position();
        if let Ok(None) = grammar.match_at(&matcher, &mut cursor, &skip) {
            prop_assert_eq!(cursor.position(), before);
        }
    }

    #[test]
    fn sequence_yields_both_values(a in -1000i32..1000, b in -1000i32..1000, gap in "[ \t]{0,3}") {
        let input = format!("{a}{gap},{gap}{b}");
        let pair = int_().then(lit(",")).then(int_());
        let mut cursor = Cursor::new(&input);
        let value = match_at(&pair, &mut cursor, &Skipper::Whitespace).unwrap();
        prop_assert_eq!(
            value,
            Some(Attribute::Tuple(vec![
                Attribute::Int(i64::from(a)),
                Attribute::Int(i64::from(b)),
            ]))
        );
        prop_assert!(cursor.at_end());
    }

    #[test]
    fn zero_or_more_without_matches_is_empty(input in "[a-z]{0,8}") {
        let mut cursor = Cursor::new(&input);
        let value = match_at(&zero_or_more(int_()), &mut cursor, &Skipper::Whitespace).unwrap();
        prop_assert_eq!(value, Some(Attribute::Seq(vec![])));
        prop_assert_eq!(cursor.position(), 0);

        let mut cursor = Cursor::new(&input);
        let value = match_at(&one_or_more(int_()), &mut cursor, &Skipper::Whitespace).unwrap();
        prop_assert_eq!(value, None);
        prop_assert_eq!(cursor.position(), 0);
    }

    #[test]
    fn in_range_integers_parse(n in any::<i32>()) {
        let input = n.to_string();
        let mut cursor = Cursor::new(&input);
        let value = match_at(&int_(), &mut cursor, &Skipper::Nothing).unwrap();
        prop_assert_eq!(value, Some(Attribute::Int(i64::from(n))));
    }
}
