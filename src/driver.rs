//! Top-level parse entry points.
//!
//! A parse is successful only when the entry rule matched *and* nothing but
//! skippable input follows it. A grammar that matches a proper prefix gives
//! the same failed [`Outcome`] as one that does not match at all.

use serde::Serialize;
use tracing::debug;

use crate::aggregate::FromAttribute;
use crate::attribute::Attribute;
use crate::cursor::Cursor;
use crate::engine::Engine;
use crate::errors::QuillError;
use crate::grammar::Grammar;
use crate::matcher::Matcher;
use crate::skip::Skipper;

/// Default rule nesting limit. Each level costs several engine frames, and
/// this bound keeps an unoptimized build inside a 2 MiB thread stack.
pub const DEFAULT_MAX_DEPTH: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseConfig {
    /// Maximum rule nesting before the parse is aborted with
    /// [`QuillError::RecursionLimit`].
    pub max_depth: usize,
}

impl Default for ParseConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outcome {
    pub success: bool,
    /// Byte offset the parse reached: the end of input on success, the
    /// position after the entry rule's match (and trailing skip) on an
    /// incomplete parse, and the position after the leading skip when
    /// nothing matched.
    pub consumed_end: usize,
    /// Present only on success.
    pub value: Option<Attribute>,
}

impl Outcome {
    fn failed(consumed_end: usize) -> Self {
        Self {
            success: false,
            consumed_end,
            value: None,
        }
    }

    pub fn into_value(self) -> Option<Attribute> {
        self.value
    }
}

pub fn parse(input: &str, grammar: &Grammar, skip: &Skipper) -> Result<Outcome, QuillError> {
    parse_with(input, grammar, skip, &ParseConfig::default())
}

/// Parses with no skip policy: every character must be matched explicitly.
pub fn parse_unskipped(input: &str, grammar: &Grammar) -> Result<Outcome, QuillError> {
    parse(input, grammar, &Skipper::Nothing)
}

pub fn parse_with(
    input: &str,
    grammar: &Grammar,
    skip: &Skipper,
    config: &ParseConfig,
) -> Result<Outcome, QuillError> {
    run(input, grammar, skip, config).map_err(|e| *e)
}

fn run(
    input: &str,
    grammar: &Grammar,
    skip: &Skipper,
    config: &ParseConfig,
) -> Result<Outcome, Box<QuillError>> {
    let entry = grammar.entry_rule().name();
    let skipper = skip.matcher();
    let mut cursor = Cursor::new(input);
    let mut engine = Engine::new(Some(grammar), config, input);

    engine.skip_over(&mut cursor, skipper)?;
    let Some(value) = engine.invoke(entry, &mut cursor, skipper)? else {
        debug!(grammar = grammar.name(), at = cursor.position(), "no match");
        return Ok(Outcome::failed(cursor.position()));
    };

    engine.skip_over(&mut cursor, skipper)?;
    if !cursor.at_end() {
        debug!(
            grammar = grammar.name(),
            at = cursor.position(),
            remaining = cursor.remaining().len(),
            "incomplete parse"
        );
        return Ok(Outcome::failed(cursor.position()));
    }

    debug!(grammar = grammar.name(), "parse succeeded");
    Ok(Outcome {
        success: true,
        consumed_end: cursor.position(),
        value: Some(value),
    })
}

/// Parses and populates `T` from the entry rule's attribute.
///
/// `Ok(None)` means the parse failed. Call [`Grammar::check_target`] (or
/// build with [`GrammarBuilder::build_for`](crate::grammar::GrammarBuilder::build_for))
/// to rule out shape mismatches before parsing.
pub fn parse_as<T: FromAttribute>(
    input: &str,
    grammar: &Grammar,
    skip: &Skipper,
) -> Result<Option<T>, QuillError> {
    let outcome = parse(input, grammar, skip)?;
    Ok(outcome
        .into_value()
        .and_then(|value| T::from_attribute(T::shape().coerce(value))))
}

/// Runs a standalone matcher (one without rule references) at the cursor.
pub fn match_at(
    matcher: &Matcher,
    cursor: &mut Cursor<'_>,
    skip: &Skipper,
) -> Result<Option<Attribute>, QuillError> {
    let config = ParseConfig::default();
    let mut engine = Engine::new(None, &config, cursor.input());
    engine
        .attempt(matcher, cursor, skip.matcher())
        .map_err(|e| *e)
}
