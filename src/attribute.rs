//! Attribute values produced by matchers.
//!
//! Every successful match yields an [`Attribute`]. Its structure always
//! follows the [`Shape`](crate::shape::Shape) inferred for the matcher that
//! produced it: literals yield `Unused`, sequences yield tuples with the
//! `Unused` members elided, repetitions yield `Seq`, and so on.

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(untagged)]
pub enum Attribute {
    /// Produced by structural matchers (literals, `omit`, silent rules).
    #[default]
    Unused,
    Int(i64),
    Real(f64),
    Char(char),
    Text(String),
    Tuple(Vec<Attribute>),
    Variant {
        index: usize,
        value: Box<Attribute>,
    },
    Seq(Vec<Attribute>),
    Optional(Option<Box<Attribute>>),
}

impl Attribute {
    pub fn is_unused(&self) -> bool {
        matches!(self, Attribute::Unused)
    }

    pub fn variant(index: usize, value: Attribute) -> Self {
        Attribute::Variant {
            index,
            value: Box::new(value),
        }
    }

    /// Strips any number of `Variant` wrappers.
    pub fn into_inner_variant(self) -> Attribute {
        match self {
            Attribute::Variant { value, .. } => value.into_inner_variant(),
            other => other,
        }
    }

    pub fn as_real(&self) -> Option<f64> {
        match self {
            Attribute::Real(x) => Some(*x),
            _ => None,
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[Attribute]) -> fmt::Result {
    write!(f, "[")?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{item}")?;
    }
    write!(f, "]")
}

/// Renders values the way a tuple printer would: `[23, Turner, Mary, 5000]`.
/// Text is written raw, without quotes.
impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Attribute::Unused => write!(f, "unused"),
            Attribute::Int(n) => write!(f, "{n}"),
            Attribute::Real(x) => write!(f, "{x}"),
            Attribute::Char(c) => write!(f, "{c}"),
            Attribute::Text(s) => write!(f, "{s}"),
            Attribute::Tuple(items) | Attribute::Seq(items) => write_list(f, items),
            Attribute::Variant { value, .. } => write!(f, "{value}"),
            Attribute::Optional(Some(value)) => write!(f, "{value}"),
            Attribute::Optional(None) => write!(f, "none"),
        }
    }
}
