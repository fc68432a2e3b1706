//! Binding attributes to caller-defined types.
//!
//! [`FromAttribute`] pairs a Rust type with the attribute [`Shape`] it can be
//! built from. Structs map their fields positionally onto a tuple shape with
//! [`adapt_struct!`](crate::adapt_struct), so a grammar's entry shape can be
//! checked against the target type before any input is parsed.
//!
//! ```rust
//! use quill::adapt_struct;
//! use quill::aggregate::FromAttribute;
//! use quill::shape::{IntWidth, Shape};
//!
//! struct Point { x: i32, y: i32 }
//! adapt_struct!(Point { x: i32, y: i32 });
//!
//! assert_eq!(
//!     Point::shape(),
//!     Shape::Tuple(vec![Shape::Int(IntWidth::I32), Shape::Int(IntWidth::I32)])
//! );
//! ```

use crate::attribute::Attribute;
use crate::shape::{IntWidth, Shape};

pub trait FromAttribute: Sized {
    /// The shape this type is populated from.
    fn shape() -> Shape;

    /// Builds a value from an attribute already coerced to [`Self::shape`].
    /// Returns `None` when the attribute does not have that shape.
    fn from_attribute(attr: Attribute) -> Option<Self>;
}

macro_rules! int_from_attribute {
    ($($ty:ty => $width:expr),* $(,)?) => {
        $(
            impl FromAttribute for $ty {
                fn shape() -> Shape {
                    Shape::Int($width)
                }

                fn from_attribute(attr: Attribute) -> Option<Self> {
                    match attr {
                        Attribute::Int(n) => <$ty>::try_from(n).ok(),
                        _ => None,
                    }
                }
            }
        )*
    };
}

int_from_attribute! {
    i8 => IntWidth::I8,
    i16 => IntWidth::I16,
    i32 => IntWidth::I32,
    i64 => IntWidth::I64,
}

impl FromAttribute for f64 {
    fn shape() -> Shape {
        Shape::Real
    }

    fn from_attribute(attr: Attribute) -> Option<Self> {
        attr.as_real()
    }
}

impl FromAttribute for char {
    fn shape() -> Shape {
        Shape::Char
    }

    fn from_attribute(attr: Attribute) -> Option<Self> {
        match attr {
            Attribute::Char(c) => Some(c),
            _ => None,
        }
    }
}

impl FromAttribute for String {
    fn shape() -> Shape {
        Shape::Text
    }

    fn from_attribute(attr: Attribute) -> Option<Self> {
        match attr {
            Attribute::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl<T: FromAttribute> FromAttribute for Option<T> {
    fn shape() -> Shape {
        Shape::optional(T::shape())
    }

    fn from_attribute(attr: Attribute) -> Option<Self> {
        match attr {
            Attribute::Optional(None) => Some(None),
            Attribute::Optional(Some(inner)) => T::from_attribute(*inner).map(Some),
            _ => None,
        }
    }
}

impl<T: FromAttribute> FromAttribute for Vec<T> {
    fn shape() -> Shape {
        Shape::seq(T::shape())
    }

    fn from_attribute(attr: Attribute) -> Option<Self> {
        match attr {
            Attribute::Seq(items) => items.into_iter().map(T::from_attribute).collect(),
            _ => None,
        }
    }
}

macro_rules! tuple_from_attribute {
    ($(($($name:ident),+)),* $(,)?) => {
        $(
            impl<$($name: FromAttribute),+> FromAttribute for ($($name,)+) {
                fn shape() -> Shape {
                    Shape::Tuple(vec![$($name::shape()),+])
                }

                fn from_attribute(attr: Attribute) -> Option<Self> {
                    let Attribute::Tuple(items) = attr else {
                        return None;
                    };
                    let mut items = items.into_iter();
                    let value = ($($name::from_attribute(items.next()?)?,)+);
                    items.next().is_none().then_some(value)
                }
            }
        )*
    };
}

tuple_from_attribute! {
    (A, B),
    (A, B, C),
    (A, B, C, D),
    (A, B, C, D, E),
    (A, B, C, D, E, F),
}

/// Adapts a struct so its fields are populated, in declaration order, from a
/// tuple attribute.
#[macro_export]
macro_rules! adapt_struct {
    ($ty:ident { $($field:ident : $fty:ty),+ $(,)? }) => {
        impl $crate::aggregate::FromAttribute for $ty {
            fn shape() -> $crate::shape::Shape {
                $crate::shape::Shape::Tuple(vec![
                    $(<$fty as $crate::aggregate::FromAttribute>::shape()),+
                ])
            }

            fn from_attribute(attr: $crate::attribute::Attribute) -> Option<Self> {
                let $crate::attribute::Attribute::Tuple(items) = attr else {
                    return None;
                };
                let mut items = items.into_iter();
                let value = $ty {
                    $($field: <$fty as $crate::aggregate::FromAttribute>::from_attribute(items.next()?)?,)+
                };
                items.next().is_none().then_some(value)
            }
        }
    };
}
