//! The matching interpreter.
//!
//! `Engine::attempt` walks a matcher tree over a [`Cursor`]. Its result is
//! three-way:
//!
//! - `Ok(Some(attr))`: matched, cursor advanced past the match.
//! - `Ok(None)`: no match, cursor exactly where it was before the call.
//! - `Err(_)`: the whole parse is aborted (numeric overflow, nesting limit).
//!
//! The skipper is an explicit parameter. Primitives pre-skip inside their
//! own checkpoint, so a failed primitive also gives back the skipped input.

use tracing::trace;

use crate::attribute::Attribute;
use crate::cursor::Cursor;
use crate::driver::ParseConfig;
use crate::errors::{input_source, span, QuillError};
use crate::grammar::Grammar;
use crate::matcher::{CharClass, Matcher};
use crate::shape::IntWidth;

/// Errors are boxed so every frame of the recursive walk stays small.
pub(crate) type Step = Result<Option<Attribute>, Box<QuillError>>;

pub(crate) struct Engine<'g> {
    grammar: Option<&'g Grammar>,
    max_depth: usize,
    depth: usize,
    source: &'g str,
}

impl<'g> Engine<'g> {
    pub(crate) fn new(grammar: Option<&'g Grammar>, config: &ParseConfig, source: &'g str) -> Self {
        Self {
            grammar,
            max_depth: config.max_depth,
            depth: 0,
            source,
        }
    }

    /// Applies `skip` until it stops matching or stops making progress.
    pub(crate) fn skip_over(
        &mut self,
        cursor: &mut Cursor<'_>,
        skip: Option<&Matcher>,
    ) -> Result<(), Box<QuillError>> {
        let Some(skipper) = skip else {
            return Ok(());
        };
        while !cursor.at_end() {
            let before = cursor.position();
            if self.attempt(skipper, cursor, None)?.is_none() || cursor.position() == before {
                break;
            }
        }
        Ok(())
    }

    pub(crate) fn attempt(
        &mut self,
        matcher: &Matcher,
        cursor: &mut Cursor<'_>,
        skip: Option<&Matcher>,
    ) -> Step {
        match matcher {
            Matcher::Literal(_)
            | Matcher::Char(_)
            | Matcher::Int(_)
            | Matcher::Real
            | Matcher::Quoted { .. } => self.token(matcher, cursor, skip),
            Matcher::Sequence(items) => self.sequence(items, cursor, skip),
            Matcher::Alternation(arms) => self.alternation(matcher, arms, cursor, skip),
            Matcher::Repeat { inner, min } => self.repeat(inner, None, *min, cursor, skip),
            Matcher::Separated { item, separator } => {
                self.repeat(item, Some(separator.as_ref()), 1, cursor, skip)
            }
            Matcher::Optional(inner) => self.optional(inner, cursor, skip),
            Matcher::Lexeme(inner) => self.lexeme(inner, cursor, skip),
            Matcher::Except { matcher, excluded } => self.except(matcher, excluded, cursor, skip),
            Matcher::Omit(inner) => Ok(self.attempt(inner, cursor, skip)?.map(|_| Attribute::Unused)),
            Matcher::Rule(name) => self.invoke(name, cursor, skip),
        }
    }

    /// Runs a named rule and converts its body's value to the declared shape.
    pub(crate) fn invoke(&mut self, name: &str, cursor: &mut Cursor<'_>, skip: Option<&Matcher>) -> Step {
        let Some(rule) = self.grammar.and_then(|g| g.rule(name)) else {
            return Err(Box::new(QuillError::UnknownRule {
                rule: name.to_string(),
            }));
        };
        if self.depth >= self.max_depth {
            return Err(self.recursion_limit(name, cursor.position()));
        }

        trace_enter(name, cursor.position(), self.depth);
        self.depth += 1;
        let result = self.attempt(rule.body(), cursor, skip);
        self.depth -= 1;
        let result = result?;
        trace_leave(name, cursor.position(), result.is_some());
        Ok(result.map(|value| rule.shape().coerce(value)))
    }

    fn recursion_limit(&self, rule: &str, at: usize) -> Box<QuillError> {
        Box::new(QuillError::RecursionLimit {
            rule: rule.to_string(),
            limit: self.max_depth,
            src: input_source(self.source),
            span: span(at, at),
        })
    }

    // ------------------------------------------------------------------------
    // Combinators
    // ------------------------------------------------------------------------

    /// A primitive with its leading skip. Both are given back on failure.
    fn token(&mut self, matcher: &Matcher, cursor: &mut Cursor<'_>, skip: Option<&Matcher>) -> Step {
        let mark = cursor.checkpoint();
        self.skip_over(cursor, skip)?;
        let result = self.primitive(matcher, cursor)?;
        if result.is_none() {
            cursor.restore(mark);
        }
        Ok(result)
    }

    fn optional(&mut self, inner: &Matcher, cursor: &mut Cursor<'_>, skip: Option<&Matcher>) -> Step {
        let found = self.attempt(inner, cursor, skip)?;
        if self.is_silent(inner) {
            return Ok(Some(Attribute::Unused));
        }
        Ok(Some(Attribute::Optional(found.map(Box::new))))
    }

    fn lexeme(&mut self, inner: &Matcher, cursor: &mut Cursor<'_>, skip: Option<&Matcher>) -> Step {
        let mark = cursor.checkpoint();
        self.skip_over(cursor, skip)?;
        let result = self.attempt(inner, cursor, None)?;
        if result.is_none() {
            cursor.restore(mark);
        }
        Ok(result)
    }

    fn except(
        &mut self,
        matcher: &Matcher,
        excluded: &Matcher,
        cursor: &mut Cursor<'_>,
        skip: Option<&Matcher>,
    ) -> Step {
        let mark = cursor.checkpoint();
        if self.attempt(excluded, cursor, skip)?.is_some() {
            cursor.restore(mark);
            return Ok(None);
        }
        self.attempt(matcher, cursor, skip)
    }

    fn sequence(&mut self, items: &[Matcher], cursor: &mut Cursor<'_>, skip: Option<&Matcher>) -> Step {
        let mark = cursor.checkpoint();
        let mut values = Vec::new();
        for item in items {
            match self.attempt(item, cursor, skip)? {
                Some(value) => {
                    if !self.is_silent(item) {
                        values.push(value);
                    }
                }
                None => {
                    cursor.restore(mark);
                    return Ok(None);
                }
            }
        }
        Ok(Some(match values.len() {
            0 => Attribute::Unused,
            1 => values.remove(0),
            _ => Attribute::Tuple(values),
        }))
    }

    fn alternation(
        &mut self,
        whole: &Matcher,
        arms: &[Matcher],
        cursor: &mut Cursor<'_>,
        skip: Option<&Matcher>,
    ) -> Step {
        for (index, arm) in arms.iter().enumerate() {
            if let Some(value) = self.attempt(arm, cursor, skip)? {
                if self.is_silent(whole) {
                    return Ok(Some(Attribute::Unused));
                }
                return Ok(Some(Attribute::variant(index, value)));
            }
        }
        Ok(None)
    }

    /// Repetition and separated lists. A failed separator or item is given
    /// back, leaving the cursor just after the last complete item.
    fn repeat(
        &mut self,
        item: &Matcher,
        separator: Option<&Matcher>,
        min: usize,
        cursor: &mut Cursor<'_>,
        skip: Option<&Matcher>,
    ) -> Step {
        let start = cursor.checkpoint();
        let mut values = Vec::new();
        let mut count = 0;
        loop {
            let mark = cursor.checkpoint();
            if count > 0 {
                if let Some(separator) = separator {
                    if self.attempt(separator, cursor, skip)?.is_none() {
                        break;
                    }
                }
            }
            match self.attempt(item, cursor, skip)? {
                Some(value) => {
                    count += 1;
                    values.push(value);
                    // zero-width iterations would never terminate
                    if cursor.checkpoint() == mark {
                        break;
                    }
                }
                None => {
                    cursor.restore(mark);
                    break;
                }
            }
        }
        if count < min {
            cursor.restore(start);
            return Ok(None);
        }
        if self.is_silent(item) {
            Ok(Some(Attribute::Unused))
        } else {
            Ok(Some(Attribute::Seq(values)))
        }
    }

    /// True when `matcher` never produces an attribute. Mirrors the `Unused`
    /// cases of shape inference.
    fn is_silent(&self, matcher: &Matcher) -> bool {
        match matcher {
            Matcher::Literal(_) | Matcher::Omit(_) => true,
            Matcher::Char(_) | Matcher::Int(_) | Matcher::Real | Matcher::Quoted { .. } => false,
            Matcher::Sequence(items) | Matcher::Alternation(items) => {
                items.iter().all(|m| self.is_silent(m))
            }
            Matcher::Repeat { inner, .. }
            | Matcher::Separated { item: inner, .. }
            | Matcher::Optional(inner)
            | Matcher::Lexeme(inner) => self.is_silent(inner),
            Matcher::Except { matcher, .. } => self.is_silent(matcher),
            Matcher::Rule(name) => self
                .grammar
                .and_then(|g| g.rule(name))
                .map_or(true, |rule| rule.shape().is_unused()),
        }
    }

    // ------------------------------------------------------------------------
    // Primitives
    // ------------------------------------------------------------------------

    fn primitive(&mut self, matcher: &Matcher, cursor: &mut Cursor<'_>) -> Step {
        match matcher {
            Matcher::Literal(text) => Ok(cursor.eat(text).then_some(Attribute::Unused)),
            Matcher::Char(class) => Ok(match_char(class, cursor)),
            Matcher::Int(width) => self.integer(*width, cursor),
            Matcher::Real => self.real(cursor),
            Matcher::Quoted { delimiter } => Ok(quoted(*delimiter, cursor)),
            _ => Ok(None),
        }
    }

    fn integer(&self, width: IntWidth, cursor: &mut Cursor<'_>) -> Step {
        let mark = cursor.checkpoint();
        let negative = eat_sign(cursor);
        let mut magnitude: Option<i128> = Some(0);
        let mut digits = 0;
        while let Some(d) = cursor.peek().and_then(|c| c.to_digit(10)) {
            cursor.bump();
            digits += 1;
            magnitude = magnitude
                .and_then(|m| m.checked_mul(10))
                .and_then(|m| m.checked_add(i128::from(d)));
        }
        if digits == 0 {
            cursor.restore(mark);
            return Ok(None);
        }
        let value = magnitude.map(|m| if negative { -m } else { m });
        match value {
            Some(v) if width.contains(v) => Ok(Some(Attribute::Int(v as i64))),
            _ => Err(Box::new(QuillError::NumericOverflow {
                literal: cursor.since(mark).to_string(),
                target: width.name(),
                src: input_source(self.source),
                span: span(mark.offset(), cursor.position()),
            })),
        }
    }

    fn real(&self, cursor: &mut Cursor<'_>) -> Step {
        let mark = cursor.checkpoint();
        eat_sign(cursor);

        for special in ["infinity", "inf", "nan"] {
            let rest = cursor.remaining();
            if rest.len() >= special.len()
                && rest.is_char_boundary(special.len())
                && rest[..special.len()].eq_ignore_ascii_case(special)
            {
                cursor.advance(special.len());
                return Ok(Some(Attribute::Real(parse_f64(cursor.since(mark)))));
            }
        }

        let whole = eat_digits(cursor);
        let fraction = if cursor.eat(".") { eat_digits(cursor) } else { 0 };
        if whole == 0 && fraction == 0 {
            cursor.restore(mark);
            return Ok(None);
        }

        let before_exponent = cursor.checkpoint();
        if cursor.eat("e") || cursor.eat("E") {
            eat_sign(cursor);
            if eat_digits(cursor) == 0 {
                cursor.restore(before_exponent);
            }
        }

        let text = cursor.since(mark);
        let value = parse_f64(text);
        if value.is_infinite() {
            return Err(Box::new(QuillError::NumericOverflow {
                literal: text.to_string(),
                target: "f64",
                src: input_source(self.source),
                span: span(mark.offset(), cursor.position()),
            }));
        }
        Ok(Some(Attribute::Real(value)))
    }
}

fn trace_enter(rule: &str, at: usize, depth: usize) {
    trace!(rule, at, depth, "enter");
}

fn trace_leave(rule: &str, at: usize, matched: bool) {
    trace!(rule, at, matched, "leave");
}

fn match_char(class: &CharClass, cursor: &mut Cursor<'_>) -> Option<Attribute> {
    let c = cursor.peek().filter(|c| class.matches(*c))?;
    cursor.bump();
    Some(Attribute::Char(c))
}

/// Delimited text. Backslash escapes the delimiter and itself; `\n`, `\t`
/// and `\r` are translated; any other escaped character is kept as is.
fn quoted(delimiter: char, cursor: &mut Cursor<'_>) -> Option<Attribute> {
    let mark = cursor.checkpoint();
    if cursor.bump() != Some(delimiter) {
        cursor.restore(mark);
        return None;
    }
    let mut text = String::new();
    loop {
        match cursor.bump() {
            None => {
                cursor.restore(mark);
                return None;
            }
            Some(c) if c == delimiter => return Some(Attribute::Text(text)),
            Some('\\') => match cursor.bump() {
                None => {
                    cursor.restore(mark);
                    return None;
                }
                Some('n') => text.push('\n'),
                Some('t') => text.push('\t'),
                Some('r') => text.push('\r'),
                Some(other) => text.push(other),
            },
            Some(c) => text.push(c),
        }
    }
}

/// Consumes an optional `+`/`-`; returns true for `-`.
fn eat_sign(cursor: &mut Cursor<'_>) -> bool {
    if cursor.eat("-") {
        true
    } else {
        cursor.eat("+");
        false
    }
}

fn eat_digits(cursor: &mut Cursor<'_>) -> usize {
    let mut count = 0;
    while cursor.peek().is_some_and(|c| c.is_ascii_digit()) {
        cursor.bump();
        count += 1;
    }
    count
}

fn parse_f64(text: &str) -> f64 {
    text.parse::<f64>().unwrap_or(f64::NAN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::quoted;
    use crate::matcher::*;

    fn run(
        matcher: &Matcher,
        input: &str,
        skip: Option<&Matcher>,
    ) -> (Result<Option<Attribute>, QuillError>, usize) {
        let config = ParseConfig::default();
        let mut engine = Engine::new(None, &config, input);
        let mut cursor = Cursor::new(input);
        let result = engine.attempt(matcher, &mut cursor, skip).map_err(|e| *e);
        (result, cursor.position())
    }

    fn ok(matcher: &Matcher, input: &str) -> (Option<Attribute>, usize) {
        let (result, pos) = run(matcher, input, None);
        (result.unwrap(), pos)
    }

    #[test]
    fn literal_consumes_exactly_its_text() {
        assert_eq!(ok(&lit("emp"), "employee"), (Some(Attribute::Unused), 3));
        assert_eq!(ok(&lit("employee"), "emp"), (None, 0));
        assert_eq!(ok(&lit("empire"), "employee"), (None, 0));
    }

    #[test]
    fn integers() {
        assert_eq!(ok(&int_(), "23,"), (Some(Attribute::Int(23)), 2));
        assert_eq!(ok(&int_(), "-7"), (Some(Attribute::Int(-7)), 2));
        assert_eq!(ok(&int_(), "+7"), (Some(Attribute::Int(7)), 2));
        assert_eq!(ok(&int_(), "-x"), (None, 0));
        assert_eq!(ok(&int_(), "- 7"), (None, 0));
        assert_eq!(ok(&int_(), "-2147483648"), (Some(Attribute::Int(-2147483648)), 11));
    }

    #[test]
    fn integer_overflow_aborts() {
        let (result, _) = run(&int_(), "2147483648", None);
        assert!(matches!(result, Err(QuillError::NumericOverflow { target: "i32", .. })));

        let (result, _) = run(&long_(), "99999999999999999999999999999999999999999", None);
        assert!(matches!(result, Err(QuillError::NumericOverflow { target: "i64", .. })));
    }

    #[test]
    fn reals() {
        assert_eq!(ok(&real(), "5000.00}"), (Some(Attribute::Real(5000.0)), 7));
        assert_eq!(ok(&real(), ".5"), (Some(Attribute::Real(0.5)), 2));
        assert_eq!(ok(&real(), "5."), (Some(Attribute::Real(5.0)), 2));
        assert_eq!(ok(&real(), "-1.5e3"), (Some(Attribute::Real(-1500.0)), 6));
        assert_eq!(ok(&real(), "12"), (Some(Attribute::Real(12.0)), 2));
        assert_eq!(ok(&real(), "inf"), (Some(Attribute::Real(f64::INFINITY)), 3));
    }

    #[test]
    fn real_never_partially_consumes() {
        assert_eq!(ok(&real(), "."), (None, 0));
        assert_eq!(ok(&real(), "-."), (None, 0));
        assert_eq!(ok(&real(), "+"), (None, 0));
        // a dangling exponent marker is left for the next matcher
        assert_eq!(ok(&real(), "2e"), (Some(Attribute::Real(2.0)), 1));
        assert_eq!(ok(&real(), "2e+"), (Some(Attribute::Real(2.0)), 1));
    }

    #[test]
    fn real_overflow_aborts() {
        let (result, _) = run(&real(), "1e999", None);
        assert!(matches!(result, Err(QuillError::NumericOverflow { target: "f64", .. })));
    }

    #[test]
    fn quoted_strings() {
        assert_eq!(
            ok(&quoted('"'), r#""a b" rest"#),
            (Some(Attribute::Text("a b".into())), 5)
        );
        assert_eq!(
            ok(&quoted('"'), r#""say \"hi\"""#),
            (Some(Attribute::Text("say \"hi\"".into())), 12)
        );
        assert_eq!(ok(&quoted('"'), r#""open"#), (None, 0));
        assert_eq!(ok(&quoted('\''), "'x'"), (Some(Attribute::Text("x".into())), 3));
    }

    #[test]
    fn sequence_restores_on_failure() {
        let m = sequence_of([lit("a"), lit("b"), lit("c")]);
        assert_eq!(ok(&m, "abx"), (None, 0));
        assert_eq!(ok(&m, "abc"), (Some(Attribute::Unused), 3));
    }

    #[test]
    fn sequence_skips_between_elements() {
        let ws = space();
        let m = sequence_of([int_(), lit(","), real()]);
        let (result, pos) = run(&m, " 1 ,  2.5", Some(&ws));
        assert_eq!(
            result.unwrap(),
            Some(Attribute::Tuple(vec![Attribute::Int(1), Attribute::Real(2.5)]))
        );
        assert_eq!(pos, 9);
    }

    #[test]
    fn alternation_commits_to_first_success() {
        let m = any_of([int_(), real()]);
        assert_eq!(
            ok(&m, "5.5"),
            (Some(Attribute::variant(0, Attribute::Int(5))), 1)
        );
        assert_eq!(
            ok(&m, ".5"),
            (Some(Attribute::variant(1, Attribute::Real(0.5))), 2)
        );
        assert_eq!(ok(&m, "x"), (None, 0));
    }

    #[test]
    fn overflow_is_not_retried_by_alternation() {
        let m = any_of([int_(), long_()]);
        let (result, _) = run(&m, "3000000000", None);
        assert!(result.is_err());
    }

    #[test]
    fn repetition_gives_back_trailing_skip() {
        let ws = space();
        let m = zero_or_more(int_());
        let (result, pos) = run(&m, "1 2 3  x", Some(&ws));
        assert_eq!(
            result.unwrap(),
            Some(Attribute::Seq(vec![
                Attribute::Int(1),
                Attribute::Int(2),
                Attribute::Int(3)
            ]))
        );
        assert_eq!(pos, 5);
    }

    #[test]
    fn repetition_bounds() {
        assert_eq!(ok(&zero_or_more(digit()), "x"), (Some(Attribute::Seq(vec![])), 0));
        assert_eq!(ok(&one_or_more(digit()), "x"), (None, 0));
        assert_eq!(ok(&zero_or_more(lit("ab")), "ababa"), (Some(Attribute::Unused), 4));
    }

    #[test]
    fn zero_width_repetition_terminates() {
        let m = zero_or_more(optional(lit("x")));
        assert_eq!(ok(&m, "yyy"), (Some(Attribute::Unused), 0));
    }

    #[test]
    fn separated_list_leaves_dangling_separator() {
        let m = separated(int_(), lit(","));
        assert_eq!(
            ok(&m, "1,2,"),
            (Some(Attribute::Seq(vec![Attribute::Int(1), Attribute::Int(2)])), 3)
        );
        assert_eq!(ok(&m, ",1"), (None, 0));
    }

    #[test]
    fn optional_never_fails() {
        assert_eq!(
            ok(&optional(int_()), "x"),
            (Some(Attribute::Optional(None)), 0)
        );
        assert_eq!(
            ok(&optional(int_()), "4"),
            (Some(Attribute::Optional(Some(Box::new(Attribute::Int(4))))), 1)
        );
    }

    #[test]
    fn lexeme_disables_skip_inside() {
        let ws = space();
        let word = lexeme(one_or_more(alpha()));
        let (result, pos) = run(&word, "  ab cd", Some(&ws));
        assert_eq!(
            result.unwrap(),
            Some(Attribute::Seq(vec![Attribute::Char('a'), Attribute::Char('b')]))
        );
        assert_eq!(pos, 4);

        let spread = one_or_more(alpha());
        let (result, _) = run(&spread, "  ab cd", Some(&ws));
        assert!(matches!(result.unwrap(), Some(Attribute::Seq(chars)) if chars.len() == 4));
    }

    #[test]
    fn except_blocks_excluded_input() {
        let m = one_or_more(except(any_char(), char_lit('"')));
        assert_eq!(
            ok(&m, "ab\"c"),
            (Some(Attribute::Seq(vec![Attribute::Char('a'), Attribute::Char('b')])), 2)
        );
        assert_eq!(ok(&m, "\"c"), (None, 0));
    }

    #[test]
    fn omit_discards_attribute() {
        assert_eq!(ok(&omit(int_()), "12"), (Some(Attribute::Unused), 2));
    }

    #[test]
    fn rule_without_grammar_is_an_error() {
        let (result, _) = run(&rule("start"), "x", None);
        assert!(matches!(result, Err(QuillError::UnknownRule { .. })));
    }
}
