//! Rules and grammars.
//!
//! A grammar is an arena of named rules. Rules are declared with a fixed
//! attribute shape, then bound to a body (`bind`, the `%=` of combinator
//! libraries). Bodies refer to other rules, or to themselves, through
//! [`Matcher::Rule`] handles that are looked up by name while parsing, so a
//! rule can be used before its body exists.
//!
//! Every shape and reference problem is reported by `bind` or `build`. A
//! built [`Grammar`] is immutable and can be shared across threads and
//! reused for any number of independent parses.
//!
//! ```rust
//! use quill::grammar::GrammarBuilder;
//! use quill::matcher::*;
//! use quill::shape::{IntWidth, Shape};
//!
//! let mut g = GrammarBuilder::new("pair");
//! g.define("start", Shape::Tuple(vec![Shape::Int(IntWidth::I32); 2]),
//!     lit("(").then(int_()).then(lit(",")).then(int_()).then(lit(")"))).unwrap();
//! g.entry("start");
//! let grammar = g.build().unwrap();
//! assert!(grammar.parse("( 1 , 2 )").unwrap().success);
//! ```

use std::collections::{HashMap, HashSet};
use std::fmt;

use tracing::debug;

use crate::aggregate::FromAttribute;
use crate::attribute::Attribute;
use crate::cursor::Cursor;
use crate::driver::{self, Outcome, ParseConfig};
use crate::engine::Engine;
use crate::errors::QuillError;
use crate::matcher::Matcher;
use crate::shape::{self, RuleShapes, Shape};
use crate::skip::Skipper;

/// Pseudo rule name used in diagnostics about the skip matcher.
const SKIP_RULE: &str = "<skip>";

// ============================================================================
// RULE DEFINITIONS
// ============================================================================

#[derive(Debug, Clone)]
pub struct RuleDef {
    name: String,
    shape: Shape,
    body: Matcher,
}

impl RuleDef {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn body(&self) -> &Matcher {
        &self.body
    }
}

#[derive(Debug)]
struct PendingRule {
    name: String,
    shape: Shape,
    body: Option<Matcher>,
}

// ============================================================================
// BUILDER
// ============================================================================

#[derive(Debug)]
pub struct GrammarBuilder {
    name: String,
    rules: Vec<PendingRule>,
    index: HashMap<String, usize>,
    entry: Option<String>,
    skip: Skipper,
}

impl RuleShapes for GrammarBuilder {
    fn rule_shape(&self, name: &str) -> Option<&Shape> {
        self.index.get(name).map(|&i| &self.rules[i].shape)
    }
}

impl GrammarBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rules: Vec::new(),
            index: HashMap::new(),
            entry: None,
            skip: Skipper::default(),
        }
    }

    /// Declares a rule with a fixed attribute shape and returns a reference
    /// to it for use in bodies.
    pub fn declare(&mut self, name: impl Into<String>, shape: Shape) -> Result<Matcher, QuillError> {
        let name = name.into();
        if self.index.contains_key(&name) {
            return Err(QuillError::DuplicateRule { rule: name });
        }
        self.index.insert(name.clone(), self.rules.len());
        self.rules.push(PendingRule {
            name: name.clone(),
            shape,
            body: None,
        });
        Ok(Matcher::Rule(name))
    }

    /// Binds a body to a declared rule, unifying the body's inferred shape
    /// with the declared one.
    ///
    /// References to rules that are not declared yet are accepted here and
    /// checked again by [`build`](Self::build).
    pub fn bind(&mut self, name: &str, body: Matcher) -> Result<(), QuillError> {
        let Some(&slot) = self.index.get(name) else {
            return Err(QuillError::UndefinedRule {
                rule: name.to_string(),
                referenced_from: "bind".to_string(),
            });
        };
        if self.rules[slot].body.is_some() {
            return Err(QuillError::AlreadyBound {
                rule: name.to_string(),
            });
        }
        check_structure(name, &body, None)?;
        if let Ok(inferred) = shape::infer(&body, &*self) {
            check_unifies(name, &self.rules[slot].shape, inferred)?;
        }
        self.rules[slot].body = Some(body);
        Ok(())
    }

    /// Declares and binds in one step.
    pub fn define(
        &mut self,
        name: impl Into<String>,
        shape: Shape,
        body: Matcher,
    ) -> Result<Matcher, QuillError> {
        let name = name.into();
        let handle = self.declare(name.clone(), shape)?;
        self.bind(&name, body)?;
        Ok(handle)
    }

    pub fn entry(&mut self, name: impl Into<String>) -> &mut Self {
        self.entry = Some(name.into());
        self
    }

    pub fn skip(&mut self, skip: Skipper) -> &mut Self {
        self.skip = skip;
        self
    }

    pub fn build(self) -> Result<Grammar, QuillError> {
        let entry_name = self.entry.clone().ok_or_else(|| QuillError::MissingEntry {
            grammar: self.name.clone(),
        })?;
        let Some(&entry) = self.index.get(&entry_name) else {
            return Err(QuillError::UndefinedRule {
                rule: entry_name,
                referenced_from: "entry".to_string(),
            });
        };

        let mut rules = Vec::with_capacity(self.rules.len());
        for pending in &self.rules {
            let body = pending.body.clone().ok_or_else(|| QuillError::UnboundRule {
                rule: pending.name.clone(),
            })?;
            check_structure(&pending.name, &body, Some(&self.index))?;
            let inferred = shape::infer(&body, &self).map_err(|missing| QuillError::UndefinedRule {
                rule: missing,
                referenced_from: pending.name.clone(),
            })?;
            check_unifies(&pending.name, &pending.shape, inferred)?;
            rules.push(RuleDef {
                name: pending.name.clone(),
                shape: pending.shape.clone(),
                body,
            });
        }
        if let Some(skip) = self.skip.matcher() {
            check_structure(SKIP_RULE, skip, Some(&self.index))?;
        }
        check_left_recursion(&rules)?;

        debug!(
            grammar = %self.name,
            rules = rules.len(),
            entry = %entry_name,
            "grammar built"
        );
        Ok(Grammar {
            name: self.name,
            rules,
            index: self.index,
            entry,
            skip: self.skip,
        })
    }

    /// Builds the grammar and checks that its entry rule populates `T`.
    pub fn build_for<T: FromAttribute>(self) -> Result<Grammar, QuillError> {
        let grammar = self.build()?;
        grammar.check_target::<T>()?;
        Ok(grammar)
    }
}

// ============================================================================
// GRAMMAR
// ============================================================================

#[derive(Debug, Clone)]
pub struct Grammar {
    name: String,
    rules: Vec<RuleDef>,
    index: HashMap<String, usize>,
    entry: usize,
    skip: Skipper,
}

impl RuleShapes for Grammar {
    fn rule_shape(&self, name: &str) -> Option<&Shape> {
        self.rule(name).map(RuleDef::shape)
    }
}

impl Grammar {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rule(&self, name: &str) -> Option<&RuleDef> {
        self.index.get(name).map(|&i| &self.rules[i])
    }

    pub fn rules(&self) -> impl Iterator<Item = &RuleDef> {
        self.rules.iter()
    }

    pub fn entry_rule(&self) -> &RuleDef {
        &self.rules[self.entry]
    }

    /// Declared shape of the entry rule.
    pub fn shape(&self) -> &Shape {
        self.entry_rule().shape()
    }

    /// The designated skip policy used by [`Grammar::parse`].
    pub fn skipper(&self) -> &Skipper {
        &self.skip
    }

    /// Checks at definition time that the entry rule's attribute can
    /// populate `T`.
    pub fn check_target<T: FromAttribute>(&self) -> Result<(), QuillError> {
        let expected = T::shape();
        if expected.accepts(self.shape()) {
            Ok(())
        } else {
            Err(QuillError::TargetMismatch {
                grammar: self.name.clone(),
                target: std::any::type_name::<T>(),
                expected,
                found: self.shape().clone(),
            })
        }
    }

    /// Parses `input` with the grammar's own skip policy.
    pub fn parse(&self, input: &str) -> Result<Outcome, QuillError> {
        driver::parse(input, self, &self.skip)
    }

    pub fn parse_as<T: FromAttribute>(&self, input: &str) -> Result<Option<T>, QuillError> {
        driver::parse_as(input, self, &self.skip)
    }

    /// Runs a single matcher at the cursor, resolving rule references against
    /// this grammar. On `Ok(None)` the cursor is where it started.
    pub fn match_at(
        &self,
        matcher: &Matcher,
        cursor: &mut Cursor<'_>,
        skip: &Skipper,
    ) -> Result<Option<Attribute>, QuillError> {
        let config = ParseConfig::default();
        let mut engine = Engine::new(Some(self), &config, cursor.input());
        engine
            .attempt(matcher, cursor, skip.matcher())
            .map_err(|e| *e)
    }
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for rule in &self.rules {
            let marker = if rule.name == self.entry_rule().name {
                " (entry)"
            } else {
                ""
            };
            writeln!(f, "{}<{}>{} %= {};", rule.name, rule.shape, marker, rule.body)?;
        }
        Ok(())
    }
}

// ============================================================================
// DEFINITION-TIME CHECKS
// ============================================================================

fn check_unifies(rule: &str, declared: &Shape, inferred: Shape) -> Result<(), QuillError> {
    if declared.accepts(&inferred) {
        Ok(())
    } else {
        Err(QuillError::ShapeMismatch {
            rule: rule.to_string(),
            declared: declared.clone(),
            inferred,
        })
    }
}

/// Rejects empty literals and combinators. With `index`, every rule
/// reference must resolve.
fn check_structure(
    rule: &str,
    body: &Matcher,
    index: Option<&HashMap<String, usize>>,
) -> Result<(), QuillError> {
    let mut problem = None;
    body.walk(&mut |m| {
        if problem.is_some() {
            return;
        }
        problem = match m {
            Matcher::Literal(text) if text.is_empty() => Some(QuillError::EmptyLiteral {
                rule: rule.to_string(),
            }),
            Matcher::Sequence(items) if items.is_empty() => Some(QuillError::EmptyCombinator {
                rule: rule.to_string(),
                combinator: "sequence",
            }),
            Matcher::Alternation(arms) if arms.is_empty() => Some(QuillError::EmptyCombinator {
                rule: rule.to_string(),
                combinator: "alternation",
            }),
            Matcher::Rule(name) if index.is_some_and(|idx| !idx.contains_key(name)) => {
                Some(QuillError::UndefinedRule {
                    rule: name.clone(),
                    referenced_from: rule.to_string(),
                })
            }
            _ => None,
        };
    });
    problem.map_or(Ok(()), Err)
}

fn is_nullable(m: &Matcher, nullable: &HashSet<&str>) -> bool {
    match m {
        Matcher::Literal(text) => text.is_empty(),
        Matcher::Char(_) | Matcher::Int(_) | Matcher::Real | Matcher::Quoted { .. } => false,
        Matcher::Sequence(items) => items.iter().all(|i| is_nullable(i, nullable)),
        Matcher::Alternation(arms) => arms.iter().any(|a| is_nullable(a, nullable)),
        Matcher::Repeat { inner, min } => *min == 0 || is_nullable(inner, nullable),
        Matcher::Optional(_) => true,
        Matcher::Separated { item, .. } => is_nullable(item, nullable),
        Matcher::Lexeme(inner) | Matcher::Omit(inner) => is_nullable(inner, nullable),
        Matcher::Except { matcher, .. } => is_nullable(matcher, nullable),
        Matcher::Rule(name) => nullable.contains(name.as_str()),
    }
}

/// Rules that may be entered at `m`'s starting position before any input
/// has been consumed.
fn leading_rules<'a>(m: &'a Matcher, nullable: &HashSet<&str>, out: &mut Vec<&'a str>) {
    match m {
        Matcher::Rule(name) => out.push(name),
        Matcher::Sequence(items) => {
            for item in items {
                leading_rules(item, nullable, out);
                if !is_nullable(item, nullable) {
                    break;
                }
            }
        }
        Matcher::Alternation(arms) => {
            for arm in arms {
                leading_rules(arm, nullable, out);
            }
        }
        Matcher::Repeat { inner, .. }
        | Matcher::Optional(inner)
        | Matcher::Lexeme(inner)
        | Matcher::Omit(inner) => leading_rules(inner, nullable, out),
        Matcher::Separated { item, separator } => {
            leading_rules(item, nullable, out);
            if is_nullable(item, nullable) {
                leading_rules(separator, nullable, out);
            }
        }
        Matcher::Except { matcher, excluded } => {
            leading_rules(excluded, nullable, out);
            leading_rules(matcher, nullable, out);
        }
        Matcher::Literal(_) | Matcher::Char(_) | Matcher::Int(_) | Matcher::Real | Matcher::Quoted { .. } => {}
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Visit {
    InProgress,
    Done,
}

fn find_cycle<'a>(
    name: &'a str,
    graph: &HashMap<&'a str, Vec<&'a str>>,
    state: &mut HashMap<&'a str, Visit>,
    path: &mut Vec<&'a str>,
) -> Option<Vec<&'a str>> {
    match state.get(name) {
        Some(Visit::Done) => return None,
        Some(Visit::InProgress) => {
            let start = path.iter().position(|n| *n == name).unwrap_or(0);
            let mut cycle = path[start..].to_vec();
            cycle.push(name);
            return Some(cycle);
        }
        None => {}
    }
    state.insert(name, Visit::InProgress);
    path.push(name);
    for next in graph.get(name).into_iter().flatten() {
        if let Some(cycle) = find_cycle(next, graph, state, path) {
            return Some(cycle);
        }
    }
    path.pop();
    state.insert(name, Visit::Done);
    None
}

fn check_left_recursion(rules: &[RuleDef]) -> Result<(), QuillError> {
    let mut nullable = HashSet::new();
    loop {
        let before = nullable.len();
        for rule in rules {
            if !nullable.contains(rule.name.as_str()) && is_nullable(&rule.body, &nullable) {
                nullable.insert(rule.name.as_str());
            }
        }
        if nullable.len() == before {
            break;
        }
    }

    let graph: HashMap<&str, Vec<&str>> = rules
        .iter()
        .map(|rule| {
            let mut out = Vec::new();
            leading_rules(&rule.body, &nullable, &mut out);
            (rule.name.as_str(), out)
        })
        .collect();

    let mut state = HashMap::new();
    for rule in rules {
        let mut path = Vec::new();
        if let Some(cycle) = find_cycle(&rule.name, &graph, &mut state, &mut path) {
            return Err(QuillError::LeftRecursion {
                rule: cycle[0].to_string(),
                cycle: cycle.join(" -> "),
            });
        }
    }
    Ok(())
}
