//! The skip policy: insignificant input absorbed between tokens.
//!
//! The skipper is threaded explicitly through matching as an
//! `Option<&Matcher>`. Primitive matchers pre-skip before they consume and
//! never skip inside their own input window; `lexeme` pre-skips once and then
//! runs its body with the skipper switched off.

use once_cell::sync::Lazy;

use crate::matcher::{space, Matcher};

static WHITESPACE: Lazy<Matcher> = Lazy::new(space);

#[derive(Debug, Clone, Default)]
pub enum Skipper {
    /// Nothing is skipped; every character is significant.
    Nothing,
    /// Any run of ASCII whitespace. Other Unicode spaces are significant.
    #[default]
    Whitespace,
    /// A custom matcher, applied repeatedly until it stops matching. Rule
    /// references inside it resolve against the grammar being parsed.
    Custom(Matcher),
}

impl Skipper {
    pub fn custom(matcher: Matcher) -> Self {
        Skipper::Custom(matcher)
    }

    pub fn matcher(&self) -> Option<&Matcher> {
        match self {
            Skipper::Nothing => None,
            Skipper::Whitespace => Some(&*WHITESPACE),
            Skipper::Custom(matcher) => Some(matcher),
        }
    }
}
