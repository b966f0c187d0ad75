//! Equivalence checker.
//!
//! Strategies run in a fixed order and the first success wins:
//!
//! 1. coordinate pairs, compared component by component;
//! 2. exact symbolic equality of canonical forms;
//! 3. numeric equality within an absolute tolerance, at sample points when
//!    free symbols are present.
//!
//! Every failure inside a strategy (parse, canonicalization, evaluation) is
//! logged and treated as "no match". Nothing here returns an error.

use num_traits::{CheckedSub, Signed};
use serde::{Deserialize, Serialize};

use crate::canonical::Canonicalizer;
use crate::config::VerifierConfig;
use crate::eval::{evaluate, Bindings};
use crate::expr::{Expr, Number};
use crate::normalize::normalize;
use crate::parser::parse;

/// Sample magnitudes for free symbols, away from common poles.
const SAMPLE_VALUES: [f64; 8] = [0.37, 1.41, 2.23, 0.61, 3.17, 0.89, 1.73, 2.71];
/// Rounds binding every symbol to a positive value.
const POSITIVE_ROUNDS: usize = 3;
/// Later rounds each negate exactly one symbol, in turn.
const SIGNED_ROUNDS: usize = 3;
const MIN_DEFINED_SAMPLES: usize = 3;

/// Which strategy established equivalence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    Coordinate,
    Symbolic,
    Numeric,
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Strategy::Coordinate => write!(f, "coordinate"),
            Strategy::Symbolic => write!(f, "symbolic"),
            Strategy::Numeric => write!(f, "numeric"),
        }
    }
}

/// One side of a comparison: raw notation or an already-parsed expression.
#[derive(Debug, Clone, Copy)]
pub enum Operand<'a> {
    Raw(&'a str),
    Parsed(&'a Expr),
}

impl<'a> From<&'a str> for Operand<'a> {
    fn from(raw: &'a str) -> Self {
        Operand::Raw(raw)
    }
}

impl<'a> From<&'a String> for Operand<'a> {
    fn from(raw: &'a String) -> Self {
        Operand::Raw(raw)
    }
}

impl<'a> From<&'a Expr> for Operand<'a> {
    fn from(expr: &'a Expr) -> Self {
        Operand::Parsed(expr)
    }
}

/// An operand resolved to either a pair of components or a single value.
enum Shape {
    Pair(Option<Expr>, Option<Expr>),
    Scalar(Option<Expr>),
}

/// Decides whether two math expressions mean the same value.
#[derive(Debug, Clone)]
pub struct EquivalenceChecker {
    tolerance: f64,
    sample_free_symbols: bool,
    canonicalizer: Canonicalizer,
}

impl Default for EquivalenceChecker {
    fn default() -> Self {
        Self::new(&VerifierConfig::default())
    }
}

impl EquivalenceChecker {
    pub fn new(config: &VerifierConfig) -> Self {
        Self {
            tolerance: config.tolerance,
            sample_free_symbols: config.sample_free_symbols,
            canonicalizer: Canonicalizer::new(config.max_expansion_terms),
        }
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    pub fn equivalent<'a, 'b>(
        &self,
        a: impl Into<Operand<'a>>,
        b: impl Into<Operand<'b>>,
    ) -> bool {
        self.compare(a, b).is_some()
    }

    /// Like [`equivalent`](Self::equivalent), but reports the strategy that
    /// matched.
    pub fn compare<'a, 'b>(
        &self,
        a: impl Into<Operand<'a>>,
        b: impl Into<Operand<'b>>,
    ) -> Option<Strategy> {
        let outcome = match (shape(a.into()), shape(b.into())) {
            (Shape::Pair(a1, a2), Shape::Pair(b1, b2)) => {
                let first = self.compare_scalars(a1.as_ref(), b1.as_ref());
                let second = self.compare_scalars(a2.as_ref(), b2.as_ref());
                (first.is_some() && second.is_some()).then_some(Strategy::Coordinate)
            }
            (Shape::Scalar(a), Shape::Scalar(b)) => self.compare_scalars(a.as_ref(), b.as_ref()),
            _ => {
                tracing::trace!("pair compared with non-pair");
                None
            }
        };
        tracing::trace!(?outcome, "comparison finished");
        outcome
    }

    fn compare_scalars(&self, a: Option<&Expr>, b: Option<&Expr>) -> Option<Strategy> {
        let (a, b) = (a?, b?);
        if self.symbolic_equal(a, b) {
            return Some(Strategy::Symbolic);
        }
        if self.numeric_equal(a, b) {
            return Some(Strategy::Numeric);
        }
        None
    }

    fn symbolic_equal(&self, a: &Expr, b: &Expr) -> bool {
        let canonical = |e: &Expr| {
            self.canonicalizer
                .canonicalize(e)
                .map_err(|err| tracing::debug!(expr = %e, error = %err, "no canonical form"))
                .ok()
        };
        match (canonical(a), canonical(b)) {
            (Some(ca), Some(cb)) => ca == cb,
            _ => false,
        }
    }

    fn numeric_equal(&self, a: &Expr, b: &Expr) -> bool {
        let mut symbols = a.free_symbols();
        symbols.extend(b.free_symbols());
        if symbols.is_empty() {
            if let Some(close) = self.exact_within_tolerance(a, b) {
                return close;
            }
            return match (self.eval(a, &Bindings::new()), self.eval(b, &Bindings::new())) {
                (Some(x), Some(y)) => self.within_tolerance(x, y),
                _ => false,
            };
        }
        if !self.sample_free_symbols {
            return false;
        }

        let mut defined = 0;
        for round in 0..POSITIVE_ROUNDS + SIGNED_ROUNDS {
            let negated = round
                .checked_sub(POSITIVE_ROUNDS)
                .map(|k| k % symbols.len());
            let bindings: Bindings = symbols
                .iter()
                .enumerate()
                .map(|(j, name)| {
                    let value = SAMPLE_VALUES[(round + 3 * j) % SAMPLE_VALUES.len()];
                    let value = if negated == Some(j) { -value } else { value };
                    (name.clone(), value)
                })
                .collect();
            match (self.eval(a, &bindings), self.eval(b, &bindings)) {
                (Some(x), Some(y)) if self.within_tolerance(x, y) => defined += 1,
                (None, None) => {}
                _ => return false,
            }
        }
        defined >= MIN_DEFINED_SAMPLES
    }

    fn eval(&self, expr: &Expr, bindings: &Bindings) -> Option<f64> {
        evaluate(expr, bindings)
            .map_err(|err| tracing::debug!(expr = %expr, error = %err, "evaluation failed"))
            .ok()
    }

    /// Tolerance check on exact rationals, when both sides reduce to one.
    /// `2.02` against `2` sits exactly on a `0.02` tolerance.
    fn exact_within_tolerance(&self, a: &Expr, b: &Expr) -> Option<bool> {
        let constant = |e: &Expr| self.canonicalizer.canonicalize(e).ok()?.as_constant();
        let gap = constant(a)?.checked_sub(&constant(b)?)?.abs();
        Some(Number::Exact(gap).to_f64() <= self.tolerance)
    }

    /// Inclusive, with a few ulps of slack for rounding in `x - y`.
    fn within_tolerance(&self, x: f64, y: f64) -> bool {
        let scale = x.abs().max(y.abs()).max(1.0);
        (x - y).abs() <= self.tolerance + 16.0 * f64::EPSILON * scale
    }
}

/// Check two operands with the default configuration.
pub fn equivalent<'a, 'b>(a: impl Into<Operand<'a>>, b: impl Into<Operand<'b>>) -> bool {
    EquivalenceChecker::default().equivalent(a, b)
}

fn shape(operand: Operand<'_>) -> Shape {
    match operand {
        Operand::Parsed(Expr::Pair(x, y)) => {
            Shape::Pair(Some(x.as_ref().clone()), Some(y.as_ref().clone()))
        }
        Operand::Parsed(expr) => Shape::Scalar(Some(expr.clone())),
        Operand::Raw(raw) => {
            let normalized = normalize(raw);
            match split_pair(&normalized) {
                Some((x, y)) => Shape::Pair(parse_logged(x), parse_logged(y)),
                // `((2,3))` or `{(2,3)}` only reveal a pair once parsed
                None => match parse_logged(&normalized) {
                    Some(Expr::Pair(x, y)) => Shape::Pair(Some(*x), Some(*y)),
                    other => Shape::Scalar(other),
                },
            }
        }
    }
}

fn parse_logged(src: &str) -> Option<Expr> {
    parse(src)
        .map_err(|err| tracing::debug!(input = src, error = %err, "parse failed"))
        .ok()
}

/// Split `(x, y)` or `[x, y]` on its single top-level comma.
fn split_pair(src: &str) -> Option<(&str, &str)> {
    let inner = src
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .or_else(|| src.strip_prefix('[').and_then(|s| s.strip_suffix(']')))?;

    let mut depth = 0i32;
    let mut comma = None;
    for (i, c) in inner.char_indices() {
        match c {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => {
                depth -= 1;
                // `(1)+(2)` is not a wrapper around the whole string
                if depth < 0 {
                    return None;
                }
            }
            ',' if depth == 0 => {
                if comma.is_some() {
                    return None;
                }
                comma = Some(i);
            }
            _ => {}
        }
    }
    let at = comma?;
    Some((inner[..at].trim(), inner[at + 1..].trim()))
}
