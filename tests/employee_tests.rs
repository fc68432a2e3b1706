// tests/employee_tests.rs
//
// End-to-end runs of the employee grammar.

use quill::attribute::Attribute;
use quill::cursor::Cursor;
use quill::employee::{employee_grammar, parse_employee, Employee};
use quill::prelude::*;

fn mary() -> Employee {
    Employee {
        age: 23,
        surname: "Turner".into(),
        forename: "Mary".into(),
        salary: 5000.0,
    }
}

#[test]
fn complete_record_parses() {
    let grammar = employee_grammar().unwrap();
    let input = r#"employee{23, "Turner", "Mary", 5000.00}"#;

    let outcome = grammar.parse(input).unwrap();
    assert!(outcome.success);
    assert_eq!(outcome.consumed_end, input.len());
    assert_eq!(
        outcome.value,
        Some(Attribute::Tuple(vec![
            Attribute::Int(23),
            Attribute::Text("Turner".into()),
            Attribute::Text("Mary".into()),
            Attribute::Real(5000.0),
        ]))
    );

    assert_eq!(parse_employee(&grammar, input).unwrap(), Some(mary()));
}

#[test]
fn missing_salary_fails() {
    let grammar = employee_grammar().unwrap();
    let outcome = grammar.parse(r#"employee{23, "Turner", "Mary"}"#).unwrap();
    assert!(!outcome.success);
    assert_eq!(outcome.value, None);
}

#[test]
fn trailing_whitespace_is_consumed() {
    let grammar = employee_grammar().unwrap();
    let input = "employee{23,\"Turner\",\"Mary\",5000.00} ";
    let outcome = grammar.parse(input).unwrap();
    assert!(outcome.success);
    assert_eq!(outcome.consumed_end, input.len());
}

#[test]
fn trailing_text_fails_the_parse() {
    let grammar = employee_grammar().unwrap();
    let input = r#"employee{23, "Turner", "Mary", 5000.00} extra"#;
    let outcome = grammar.parse(input).unwrap();
    assert!(!outcome.success);
    assert_eq!(outcome.consumed_end, input.len() - "extra".len());
    assert_eq!(parse_employee(&grammar, input).unwrap(), None);
}

#[test]
fn quoted_string_keeps_interior_spaces() {
    let grammar = employee_grammar().unwrap();
    let mut cursor = Cursor::new(r#"  "a b" "#);
    let value = grammar
        .match_at(&rule("quoted_string"), &mut cursor, &Skipper::Whitespace)
        .unwrap();
    assert_eq!(value, Some(Attribute::Text("a b".into())));
    assert_eq!(cursor.position(), 7);
}

#[test]
fn names_with_spaces_survive_in_records() {
    let grammar = employee_grammar().unwrap();
    let employee = parse_employee(&grammar, r#"employee{41, "van Dyke", "Mary Ann", 12.5}"#)
        .unwrap()
        .unwrap();
    assert_eq!(employee.surname, "van Dyke");
    assert_eq!(employee.forename, "Mary Ann");
}

#[test]
fn whitespace_anywhere_between_tokens() {
    let grammar = employee_grammar().unwrap();
    let input = "\t employee {\n 23 ,\"Turner\" , \"Mary\",\n5000 }";
    assert_eq!(parse_employee(&grammar, input).unwrap(), Some(mary()));
}

#[test]
fn non_ascii_spaces_are_not_skipped() {
    let grammar = employee_grammar().unwrap();
    let input = "employee{23,\u{00a0}\"T\",\"M\",1}";
    assert!(!grammar.parse(input).unwrap().success);
    assert!(grammar.parse("employee{23,\x0c\"T\",\"M\",1}").unwrap().success);
}

#[test]
fn empty_name_does_not_match() {
    let grammar = employee_grammar().unwrap();
    let outcome = grammar.parse(r#"employee{23, "", "Mary", 1.0}"#).unwrap();
    assert!(!outcome.success);
}

#[test]
fn age_overflow_aborts_with_a_diagnostic() {
    let grammar = employee_grammar().unwrap();
    let err = grammar
        .parse(r#"employee{99999999999, "Turner", "Mary", 1.0}"#)
        .unwrap_err();
    assert!(matches!(err, QuillError::NumericOverflow { target: "i32", .. }));
    assert_eq!(err.category(), quill::ErrorCategory::Parse);
}

#[test]
fn employee_serializes_to_json() {
    let json = serde_json::to_value(mary()).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "age": 23,
            "surname": "Turner",
            "forename": "Mary",
            "salary": 5000.0
        })
    );
}

#[test]
fn grammar_listing_names_both_rules() {
    let listing = employee_grammar().unwrap().to_string();
    assert!(listing.contains("quoted_string<text> %= lexeme["));
    assert!(listing.contains("start<(i32, text, text, real)> (entry) %= \"employee\" >> \"{\" >> int_"));
}
