//! Quill error handling.
//!
//! Ordinary match failures are not errors: they surface as a failed
//! [`Outcome`](crate::driver::Outcome). `QuillError` covers the two things
//! that must stop a caller outright:
//!
//! - **Definition errors**, raised while a grammar is assembled and never
//!   while input is being parsed.
//! - **Parse aborts**, raised mid-parse when continuing would be wrong
//!   (numeric overflow) or unsafe (runaway rule recursion).
//!
//! Every variant carries a `quill::<phase>::<kind>` diagnostic code and
//! renders through `miette`.

use std::sync::Arc;

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

use crate::shape::Shape;

pub type SourceArc = Arc<NamedSource<String>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Definition,
    Parse,
    Io,
}

#[derive(Error, Diagnostic, Debug)]
pub enum QuillError {
    // ------------------------------------------------------------------------
    // Definition phase
    // ------------------------------------------------------------------------
    #[error("Definition error: rule '{rule}' declares {declared} but its body produces {inferred}")]
    #[diagnostic(
        code(quill::definition::shape_mismatch),
        help("change the rule's declared shape or restructure its body; values are never coerced")
    )]
    ShapeMismatch {
        rule: String,
        declared: Shape,
        inferred: Shape,
    },

    #[error("Definition error: '{target}' expects {expected} but grammar '{grammar}' produces {found}")]
    #[diagnostic(code(quill::definition::target_mismatch))]
    TargetMismatch {
        grammar: String,
        target: &'static str,
        expected: Shape,
        found: Shape,
    },

    #[error("Definition error: rule '{rule}' referenced from '{referenced_from}' is not declared")]
    #[diagnostic(code(quill::definition::undefined_rule))]
    UndefinedRule {
        rule: String,
        referenced_from: String,
    },

    #[error("Definition error: rule '{rule}' is declared twice")]
    #[diagnostic(code(quill::definition::duplicate_rule))]
    DuplicateRule { rule: String },

    #[error("Definition error: rule '{rule}' already has a body")]
    #[diagnostic(code(quill::definition::already_bound))]
    AlreadyBound { rule: String },

    #[error("Definition error: rule '{rule}' is declared but never given a body")]
    #[diagnostic(code(quill::definition::unbound_rule))]
    UnboundRule { rule: String },

    #[error("Definition error: grammar '{grammar}' has no entry rule")]
    #[diagnostic(
        code(quill::definition::missing_entry),
        help("designate the start rule with GrammarBuilder::entry")
    )]
    MissingEntry { grammar: String },

    #[error("Definition error: empty {combinator} in rule '{rule}'")]
    #[diagnostic(code(quill::definition::empty_combinator))]
    EmptyCombinator {
        rule: String,
        combinator: &'static str,
    },

    #[error("Definition error: empty literal in rule '{rule}'")]
    #[diagnostic(code(quill::definition::empty_literal))]
    EmptyLiteral { rule: String },

    #[error("Definition error: rule '{rule}' is left-recursive ({cycle})")]
    #[diagnostic(
        code(quill::definition::left_recursion),
        help("make the recursive reference consume input before it is reached")
    )]
    LeftRecursion { rule: String, cycle: String },

    // ------------------------------------------------------------------------
    // Parse phase
    // ------------------------------------------------------------------------
    #[error("Parse error: numeric literal '{literal}' does not fit in {target}")]
    #[diagnostic(code(quill::parse::numeric_overflow))]
    NumericOverflow {
        literal: String,
        target: &'static str,
        #[source_code]
        src: SourceArc,
        #[label("value out of range")]
        span: SourceSpan,
    },

    #[error("Parse error: rule nesting exceeded {limit} levels in '{rule}'")]
    #[diagnostic(
        code(quill::parse::recursion_limit),
        help("raise ParseConfig::max_depth or simplify the input")
    )]
    RecursionLimit {
        rule: String,
        limit: usize,
        #[source_code]
        src: SourceArc,
        #[label("nesting limit reached here")]
        span: SourceSpan,
    },

    #[error("Parse error: rule '{rule}' is not part of this grammar")]
    #[diagnostic(code(quill::parse::unknown_rule))]
    UnknownRule { rule: String },

    // ------------------------------------------------------------------------
    // I/O
    // ------------------------------------------------------------------------
    #[error("I/O error: failed to read '{path}'")]
    #[diagnostic(code(quill::io::read))]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl QuillError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ShapeMismatch { .. }
            | Self::TargetMismatch { .. }
            | Self::UndefinedRule { .. }
            | Self::DuplicateRule { .. }
            | Self::AlreadyBound { .. }
            | Self::UnboundRule { .. }
            | Self::MissingEntry { .. }
            | Self::EmptyCombinator { .. }
            | Self::EmptyLiteral { .. }
            | Self::LeftRecursion { .. } => ErrorCategory::Definition,

            Self::NumericOverflow { .. } | Self::RecursionLimit { .. } | Self::UnknownRule { .. } => {
                ErrorCategory::Parse
            }

            Self::Io { .. } => ErrorCategory::Io,
        }
    }

    pub fn is_definition_error(&self) -> bool {
        self.category() == ErrorCategory::Definition
    }
}

/// Wraps parse input for use as a diagnostic source.
pub fn input_source(input: &str) -> SourceArc {
    Arc::new(NamedSource::new("<input>", input.to_string()))
}

pub fn span(start: usize, end: usize) -> SourceSpan {
    SourceSpan::from(start..end)
}

/// Prints a QuillError with full miette diagnostics to stderr.
pub fn print_error(error: QuillError) {
    let report = miette::Report::new(error);
    eprintln!("{report:?}");
}
