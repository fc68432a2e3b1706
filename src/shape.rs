//! Attribute shapes: inference from matcher trees and unification against
//! declared rule types.
//!
//! Inference is purely structural. Sequences drop members whose shape is
//! `Unused` and collapse to the single remaining member when only one is
//! left. Unification is directional: a *declared* shape accepts an *inferred*
//! one when every value of the inferred shape can be converted losslessly by
//! [`Shape::coerce`]. There is no numeric coercion between `Int` and `Real`.

use std::fmt;

use crate::attribute::Attribute;
use crate::matcher::Matcher;

/// Integer width of an `Int` attribute. Ordered from narrowest to widest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IntWidth {
    I8,
    I16,
    I32,
    I64,
}

impl IntWidth {
    pub const fn min(self) -> i64 {
        match self {
            IntWidth::I8 => i8::MIN as i64,
            IntWidth::I16 => i16::MIN as i64,
            IntWidth::I32 => i32::MIN as i64,
            IntWidth::I64 => i64::MIN,
        }
    }

    pub const fn max(self) -> i64 {
        match self {
            IntWidth::I8 => i8::MAX as i64,
            IntWidth::I16 => i16::MAX as i64,
            IntWidth::I32 => i32::MAX as i64,
            IntWidth::I64 => i64::MAX,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            IntWidth::I8 => "i8",
            IntWidth::I16 => "i16",
            IntWidth::I32 => "i32",
            IntWidth::I64 => "i64",
        }
    }

    pub fn contains(self, value: i128) -> bool {
        (self.min() as i128..=self.max() as i128).contains(&value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Shape {
    Unused,
    Int(IntWidth),
    Real,
    Char,
    Text,
    Tuple(Vec<Shape>),
    Variant(Vec<Shape>),
    Seq(Box<Shape>),
    Optional(Box<Shape>),
}

impl Shape {
    pub fn seq(inner: Shape) -> Self {
        Shape::Seq(Box::new(inner))
    }

    pub fn optional(inner: Shape) -> Self {
        Shape::Optional(Box::new(inner))
    }

    pub fn is_unused(&self) -> bool {
        matches!(self, Shape::Unused)
    }

    /// Whether a rule declared with `self` may be bound to a body producing
    /// `inferred`.
    pub fn accepts(&self, inferred: &Shape) -> bool {
        if self == inferred {
            return true;
        }
        match (self, inferred) {
            (Shape::Unused, _) => true,
            (_, Shape::Unused) => false,
            (Shape::Int(declared), Shape::Int(found)) => found <= declared,
            (Shape::Text, Shape::Seq(inner)) => Shape::Char.accepts(inner),
            (Shape::Tuple(declared), Shape::Tuple(found)) => {
                declared.len() == found.len()
                    && declared.iter().zip(found).all(|(d, f)| d.accepts(f))
            }
            (Shape::Tuple(declared), found) if declared.len() == 1 => declared[0].accepts(found),
            (Shape::Seq(declared), Shape::Seq(found)) => declared.accepts(found),
            (Shape::Optional(declared), Shape::Optional(found)) => declared.accepts(found),
            (Shape::Variant(declared), Shape::Variant(found)) if declared.len() == found.len() => {
                declared.iter().zip(found).all(|(d, f)| d.accepts(f))
            }
            (Shape::Optional(declared), Shape::Variant(arms)) => arms
                .iter()
                .all(|arm| arm.is_unused() || declared.accepts(arm)),
            (declared, Shape::Variant(arms)) => arms.iter().all(|arm| declared.accepts(arm)),
            (Shape::Optional(declared), found) => declared.accepts(found),
            _ => false,
        }
    }

    /// Converts a value produced under an accepted inferred shape into this
    /// shape. Values that already fit are returned unchanged.
    pub fn coerce(&self, value: Attribute) -> Attribute {
        match (self, value) {
            (Shape::Unused, _) => Attribute::Unused,
            (Shape::Variant(arms), Attribute::Variant { index, value }) => match arms.get(index) {
                Some(arm) => Attribute::variant(index, arm.coerce(*value)),
                None => Attribute::Variant { index, value },
            },
            (Shape::Optional(inner), Attribute::Optional(found)) => {
                Attribute::Optional(found.map(|v| Box::new(inner.coerce(*v))))
            }
            (Shape::Optional(_), Attribute::Variant { value, .. }) => {
                if value.is_unused() {
                    Attribute::Optional(None)
                } else {
                    self.coerce(*value)
                }
            }
            (Shape::Optional(_), Attribute::Unused) => Attribute::Optional(None),
            (Shape::Optional(inner), found) => Attribute::Optional(Some(Box::new(inner.coerce(found)))),
            (shape, Attribute::Variant { value, .. }) => shape.coerce(*value),
            (Shape::Text, Attribute::Seq(chars)) => Attribute::Text(
                chars
                    .into_iter()
                    .filter_map(|c| match c.into_inner_variant() {
                        Attribute::Char(c) => Some(c),
                        _ => None,
                    })
                    .collect(),
            ),
            (Shape::Tuple(fields), Attribute::Tuple(items)) if fields.len() == items.len() => {
                Attribute::Tuple(fields.iter().zip(items).map(|(f, v)| f.coerce(v)).collect())
            }
            (Shape::Tuple(fields), found) if fields.len() == 1 => {
                Attribute::Tuple(vec![fields[0].coerce(found)])
            }
            (Shape::Seq(inner), Attribute::Seq(items)) => {
                Attribute::Seq(items.into_iter().map(|v| inner.coerce(v)).collect())
            }
            (_, found) => found,
        }
    }
}

/// Shape of a rule referenced by name, as seen during inference.
pub trait RuleShapes {
    fn rule_shape(&self, name: &str) -> Option<&Shape>;
}

/// Infers the attribute shape of `matcher`.
///
/// Referenced rules contribute their declared shape. Returns the name of the
/// first rule that `rules` cannot resolve.
pub fn infer(matcher: &Matcher, rules: &dyn RuleShapes) -> Result<Shape, String> {
    let shape = match matcher {
        Matcher::Literal(_) | Matcher::Omit(_) => Shape::Unused,
        Matcher::Char(_) => Shape::Char,
        Matcher::Int(width) => Shape::Int(*width),
        Matcher::Real => Shape::Real,
        Matcher::Quoted { .. } => Shape::Text,
        Matcher::Sequence(items) => {
            let mut fields = items
                .iter()
                .map(|m| infer(m, rules))
                .filter(|s| !matches!(s, Ok(Shape::Unused)))
                .collect::<Result<Vec<_>, _>>()?;
            match fields.len() {
                0 => Shape::Unused,
                1 => fields.remove(0),
                _ => Shape::Tuple(fields),
            }
        }
        Matcher::Alternation(arms) => {
            let arms = arms
                .iter()
                .map(|m| infer(m, rules))
                .collect::<Result<Vec<_>, _>>()?;
            if arms.iter().all(Shape::is_unused) {
                Shape::Unused
            } else {
                Shape::Variant(arms)
            }
        }
        Matcher::Repeat { inner, .. } | Matcher::Separated { item: inner, .. } => {
            match infer(inner, rules)? {
                Shape::Unused => Shape::Unused,
                shape => Shape::seq(shape),
            }
        }
        Matcher::Optional(inner) => match infer(inner, rules)? {
            Shape::Unused => Shape::Unused,
            shape => Shape::optional(shape),
        },
        Matcher::Lexeme(inner) => infer(inner, rules)?,
        Matcher::Except { matcher, .. } => infer(matcher, rules)?,
        Matcher::Rule(name) => rules.rule_shape(name).cloned().ok_or_else(|| name.clone())?,
    };
    Ok(shape)
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Unused => write!(f, "unused"),
            Shape::Int(width) => write!(f, "{}", width.name()),
            Shape::Real => write!(f, "real"),
            Shape::Char => write!(f, "char"),
            Shape::Text => write!(f, "text"),
            Shape::Tuple(fields) => {
                write!(f, "(")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{field}")?;
                }
                write!(f, ")")
            }
            Shape::Variant(arms) => {
                write!(f, "variant<")?;
                for (i, arm) in arms.iter().enumerate() {
                    if i > 0 {
                        write!(f, " | ")?;
                    }
                    write!(f, "{arm}")?;
                }
                write!(f, ">")
            }
            Shape::Seq(inner) => write!(f, "[{inner}]"),
            Shape::Optional(inner) => write!(f, "{inner}?"),
        }
    }
}
