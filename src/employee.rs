//! The employee record and its grammar.
//!
//! ```text
//! employee{age, "surname", "forename", salary}
//! ```
//!
//! `quoted_string` is written out with `lexeme` so the whitespace skipper
//! cannot eat spaces inside the quotes.

use serde::Serialize;
use std::fmt;

use crate::adapt_struct;
use crate::aggregate::FromAttribute;
use crate::errors::QuillError;
use crate::grammar::{Grammar, GrammarBuilder};
use crate::matcher::{any_char, char_lit, except, int_, lexeme, lit, one_or_more, real};
use crate::shape::Shape;
use crate::skip::Skipper;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Employee {
    pub age: i32,
    pub surname: String,
    pub forename: String,
    pub salary: f64,
}

adapt_struct!(Employee {
    age: i32,
    surname: String,
    forename: String,
    salary: f64,
});

impl fmt::Display for Employee {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {}, {}, {}]",
            self.age, self.surname, self.forename, self.salary
        )
    }
}

/// Builds the employee grammar with a whitespace skipper.
pub fn employee_grammar() -> Result<Grammar, QuillError> {
    let mut g = GrammarBuilder::new("employee");

    let quoted_string = g.define(
        "quoted_string",
        Shape::Text,
        lexeme(
            char_lit('"')
                .then(one_or_more(except(any_char(), char_lit('"'))))
                .then(char_lit('"')),
        ),
    )?;

    g.define(
        "start",
        Employee::shape(),
        lit("employee")
            .then(char_lit('{'))
            .then(int_())
            .then(char_lit(','))
            .then(quoted_string.clone())
            .then(char_lit(','))
            .then(quoted_string)
            .then(char_lit(','))
            .then(real())
            .then(char_lit('}')),
    )?;

    g.entry("start").skip(Skipper::Whitespace);
    g.build_for::<Employee>()
}

/// Parses one line. `Ok(None)` is an ordinary parse failure.
pub fn parse_employee(grammar: &Grammar, line: &str) -> Result<Option<Employee>, QuillError> {
    grammar.parse_as::<Employee>(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grammar_builds_and_targets_employee() {
        let grammar = employee_grammar().unwrap();
        assert_eq!(grammar.shape(), &Employee::shape());
        assert_eq!(grammar.rules().count(), 2);
    }

    #[test]
    fn display_matches_tuple_printer() {
        let employee = Employee {
            age: 23,
            surname: "Turner".into(),
            forename: "Mary".into(),
            salary: 5000.0,
        };
        assert_eq!(employee.to_string(), "[23, Turner, Mary, 5000]");
    }

    #[test]
    fn parses_a_record() {
        let grammar = employee_grammar().unwrap();
        let employee = parse_employee(&grammar, r#"employee{23, "Turner", "Mary", 5000.00}"#)
            .unwrap()
            .unwrap();
        assert_eq!(employee.age, 23);
        assert_eq!(employee.surname, "Turner");
    }
}
