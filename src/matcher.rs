//! Matcher trees and the combinator construction API.
//!
//! A [`Matcher`] is plain data: composite matchers own their children, and
//! recursion only ever happens through [`Matcher::Rule`], a by-name reference
//! resolved against a [`Grammar`](crate::grammar::Grammar) at parse time.
//!
//! ```rust
//! use quill::matcher::*;
//! let pair = lit("(").then(int_()).then(lit(",")).then(int_()).then(lit(")"));
//! assert_eq!(pair.to_string(), r#""(" >> int_ >> "," >> int_ >> ")""#);
//! ```

use std::fmt;

use crate::shape::IntWidth;

// ============================================================================
// CHARACTER CLASSES
// ============================================================================

#[derive(Debug, Clone)]
pub enum CharClass {
    Any,
    Alpha,
    Digit,
    Alnum,
    /// ASCII whitespace: space, `\t`, `\n`, vertical tab, form feed, `\r`.
    Space,
    Exact(char),
    Set(String),
    /// Inclusive range.
    Range(char, char),
    Predicate {
        name: &'static str,
        test: fn(char) -> bool,
    },
}

impl CharClass {
    pub fn matches(&self, c: char) -> bool {
        match self {
            CharClass::Any => true,
            CharClass::Alpha => c.is_alphabetic(),
            CharClass::Digit => c.is_ascii_digit(),
            CharClass::Alnum => c.is_alphanumeric(),
            CharClass::Space => c.is_ascii_whitespace() || c == '\x0b',
            CharClass::Exact(expected) => c == *expected,
            CharClass::Set(set) => set.contains(c),
            CharClass::Range(lo, hi) => (*lo..=*hi).contains(&c),
            CharClass::Predicate { test, .. } => test(c),
        }
    }
}

impl fmt::Display for CharClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CharClass::Any => write!(f, "char_"),
            CharClass::Alpha => write!(f, "alpha"),
            CharClass::Digit => write!(f, "digit"),
            CharClass::Alnum => write!(f, "alnum"),
            CharClass::Space => write!(f, "space"),
            CharClass::Exact(c) => write!(f, "char_({c:?})"),
            CharClass::Set(set) => write!(f, "char_({set:?})"),
            CharClass::Range(lo, hi) => write!(f, "char_({lo:?}, {hi:?})"),
            CharClass::Predicate { name, .. } => write!(f, "{name}"),
        }
    }
}

// ============================================================================
// MATCHER TREE
// ============================================================================

#[derive(Debug, Clone)]
pub enum Matcher {
    /// Fixed text. Structural only: produces no attribute.
    Literal(String),
    /// One character from a class. Produces the character.
    Char(CharClass),
    /// Optional sign and decimal digits, range-checked against the width.
    Int(IntWidth),
    /// Optional sign, mantissa, optional fraction and exponent.
    Real,
    /// Delimited text with backslash escapes. The ambient skip never applies
    /// inside the delimiters.
    Quoted { delimiter: char },
    Sequence(Vec<Matcher>),
    /// Ordered, committed choice.
    Alternation(Vec<Matcher>),
    /// `min` is 0 for zero-or-more and 1 for one-or-more.
    Repeat { inner: Box<Matcher>, min: usize },
    /// One or more `item`s separated by `separator`.
    Separated {
        item: Box<Matcher>,
        separator: Box<Matcher>,
    },
    Optional(Box<Matcher>),
    /// Runs the inner matcher with the ambient skip disabled.
    Lexeme(Box<Matcher>),
    /// Matches `matcher` only where `excluded` does not match.
    Except {
        matcher: Box<Matcher>,
        excluded: Box<Matcher>,
    },
    /// Matches like the inner matcher but discards its attribute.
    Omit(Box<Matcher>),
    Rule(String),
}

impl Matcher {
    /// Sequences `self` with `next`, flattening nested sequences.
    pub fn then(self, next: Matcher) -> Matcher {
        match self {
            Matcher::Sequence(mut items) => {
                items.push(next);
                Matcher::Sequence(items)
            }
            first => Matcher::Sequence(vec![first, next]),
        }
    }

    /// Adds `other` as a further alternative, flattening nested alternations.
    pub fn or(self, other: Matcher) -> Matcher {
        match self {
            Matcher::Alternation(mut arms) => {
                arms.push(other);
                Matcher::Alternation(arms)
            }
            first => Matcher::Alternation(vec![first, other]),
        }
    }

    /// Calls `f` on this matcher and every matcher nested beneath it,
    /// without following rule references.
    pub fn walk<'a>(&'a self, f: &mut dyn FnMut(&'a Matcher)) {
        f(self);
        match self {
            Matcher::Sequence(items) | Matcher::Alternation(items) => {
                for item in items {
                    item.walk(f);
                }
            }
            Matcher::Repeat { inner, .. }
            | Matcher::Optional(inner)
            | Matcher::Lexeme(inner)
            | Matcher::Omit(inner) => inner.walk(f),
            Matcher::Separated { item, separator } => {
                item.walk(f);
                separator.walk(f);
            }
            Matcher::Except { matcher, excluded } => {
                matcher.walk(f);
                excluded.walk(f);
            }
            Matcher::Literal(_)
            | Matcher::Char(_)
            | Matcher::Int(_)
            | Matcher::Real
            | Matcher::Quoted { .. }
            | Matcher::Rule(_) => {}
        }
    }
}

// ============================================================================
// CONSTRUCTION API
// ============================================================================

pub fn lit(text: impl Into<String>) -> Matcher {
    Matcher::Literal(text.into())
}

/// Single-character literal; produces no attribute. Use [`char_`] to keep
/// the character.
pub fn char_lit(c: char) -> Matcher {
    Matcher::Literal(c.to_string())
}

pub fn any_char() -> Matcher {
    Matcher::Char(CharClass::Any)
}

pub fn char_(c: char) -> Matcher {
    Matcher::Char(CharClass::Exact(c))
}

pub fn char_in(set: impl Into<String>) -> Matcher {
    Matcher::Char(CharClass::Set(set.into()))
}

pub fn char_range(lo: char, hi: char) -> Matcher {
    Matcher::Char(CharClass::Range(lo, hi))
}

pub fn char_where(name: &'static str, test: fn(char) -> bool) -> Matcher {
    Matcher::Char(CharClass::Predicate { name, test })
}

pub fn alpha() -> Matcher {
    Matcher::Char(CharClass::Alpha)
}

pub fn digit() -> Matcher {
    Matcher::Char(CharClass::Digit)
}

pub fn alnum() -> Matcher {
    Matcher::Char(CharClass::Alnum)
}

pub fn space() -> Matcher {
    Matcher::Char(CharClass::Space)
}

/// Signed integer in the `i32` range.
pub fn int_() -> Matcher {
    Matcher::Int(IntWidth::I32)
}

/// Signed integer in the `i64` range.
pub fn long_() -> Matcher {
    Matcher::Int(IntWidth::I64)
}

pub fn int_of(width: IntWidth) -> Matcher {
    Matcher::Int(width)
}

pub fn real() -> Matcher {
    Matcher::Real
}

pub fn quoted(delimiter: char) -> Matcher {
    Matcher::Quoted { delimiter }
}

pub fn sequence_of(items: impl IntoIterator<Item = Matcher>) -> Matcher {
    Matcher::Sequence(items.into_iter().collect())
}

pub fn any_of(arms: impl IntoIterator<Item = Matcher>) -> Matcher {
    Matcher::Alternation(arms.into_iter().collect())
}

pub fn zero_or_more(inner: Matcher) -> Matcher {
    Matcher::Repeat {
        inner: Box::new(inner),
        min: 0,
    }
}

pub fn one_or_more(inner: Matcher) -> Matcher {
    Matcher::Repeat {
        inner: Box::new(inner),
        min: 1,
    }
}

pub fn separated(item: Matcher, separator: Matcher) -> Matcher {
    Matcher::Separated {
        item: Box::new(item),
        separator: Box::new(separator),
    }
}

pub fn optional(inner: Matcher) -> Matcher {
    Matcher::Optional(Box::new(inner))
}

pub fn lexeme(inner: Matcher) -> Matcher {
    Matcher::Lexeme(Box::new(inner))
}

pub fn except(matcher: Matcher, excluded: Matcher) -> Matcher {
    Matcher::Except {
        matcher: Box::new(matcher),
        excluded: Box::new(excluded),
    }
}

pub fn omit(inner: Matcher) -> Matcher {
    Matcher::Omit(Box::new(inner))
}

pub fn rule(name: impl Into<String>) -> Matcher {
    Matcher::Rule(name.into())
}

// ============================================================================
// DISPLAY
// ============================================================================

fn write_operand(f: &mut fmt::Formatter<'_>, m: &Matcher) -> fmt::Result {
    match m {
        Matcher::Sequence(items) if items.len() > 1 => write!(f, "({m})"),
        Matcher::Alternation(arms) if arms.len() > 1 => write!(f, "({m})"),
        Matcher::Except { .. } | Matcher::Separated { .. } => write!(f, "({m})"),
        _ => write!(f, "{m}"),
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, items: &[Matcher], sep: &str) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, "{sep}")?;
        }
        write_operand(f, item)?;
    }
    Ok(())
}

/// EBNF-flavoured rendering using the usual combinator operators
/// (`>>`, `|`, `*`, `+`, `-`, `%`).
impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Matcher::Literal(text) => write!(f, "{text:?}"),
            Matcher::Char(class) => write!(f, "{class}"),
            Matcher::Int(IntWidth::I32) => write!(f, "int_"),
            Matcher::Int(IntWidth::I64) => write!(f, "long_"),
            Matcher::Int(width) => write!(f, "int_<{}>", width.name()),
            Matcher::Real => write!(f, "double_"),
            Matcher::Quoted { delimiter } => write!(f, "quoted({delimiter:?})"),
            Matcher::Sequence(items) => write_joined(f, items, " >> "),
            Matcher::Alternation(arms) => write_joined(f, arms, " | "),
            Matcher::Repeat { inner, min } => {
                write!(f, "{}", if *min == 0 { "*" } else { "+" })?;
                write_operand(f, inner)
            }
            Matcher::Separated { item, separator } => {
                write_operand(f, item)?;
                write!(f, " % ")?;
                write_operand(f, separator)
            }
            Matcher::Optional(inner) => {
                write!(f, "-")?;
                write_operand(f, inner)
            }
            Matcher::Lexeme(inner) => write!(f, "lexeme[{inner}]"),
            Matcher::Except { matcher, excluded } => {
                write_operand(f, matcher)?;
                write!(f, " - ")?;
                write_operand(f, excluded)
            }
            Matcher::Omit(inner) => write!(f, "omit[{inner}]"),
            Matcher::Rule(name) => write!(f, "{name}"),
        }
    }
}
