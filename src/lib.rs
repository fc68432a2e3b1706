//! Quill: a grammar-combinator parsing engine.
//!
//! Grammars are built from primitive matchers and combinators, bound to named
//! rules with a declared attribute shape, and checked for shape agreement
//! before any input is parsed.

pub use crate::driver::{parse, parse_as, parse_unskipped, parse_with, Outcome, ParseConfig};
pub use crate::errors::{print_error, ErrorCategory, QuillError};
pub use crate::grammar::{Grammar, GrammarBuilder};

pub mod aggregate;
pub mod attribute;
pub mod cli;
pub mod cursor;
pub mod driver;
pub mod employee;
mod engine;
pub mod errors;
pub mod grammar;
pub mod matcher;
pub mod repl;
pub mod shape;
pub mod skip;

/// Everything needed to write a grammar.
pub mod prelude {
    pub use crate::aggregate::FromAttribute;
    pub use crate::attribute::Attribute;
    pub use crate::cursor::Cursor;
    pub use crate::driver::{Outcome, ParseConfig};
    pub use crate::errors::QuillError;
    pub use crate::grammar::{Grammar, GrammarBuilder};
    pub use crate::matcher::{
        alnum, alpha, any_char, any_of, char_, char_in, char_lit, char_range, char_where, digit,
        except, int_, int_of, lexeme, lit, long_, omit, one_or_more, optional, quoted, real, rule,
        separated, sequence_of, space, zero_or_more, CharClass, Matcher,
    };
    pub use crate::shape::{IntWidth, Shape};
    pub use crate::skip::Skipper;
}
