//! Error types for parsing, canonicalization, and numeric evaluation.
//!
//! None of these escape a verification call: the equivalence checker
//! downgrades each of them to "this strategy did not match". They are typed
//! so that the fail-closed policy is visible in every signature.

use thiserror::Error;

/// Malformed math-notation input.
///
/// Every variant carries the offending substring so callers can point at it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Nothing to parse after normalization.
    #[error("empty expression")]
    Empty,

    /// A grouping bracket was never closed, or closed by the wrong bracket.
    #[error("unbalanced grouping in `{fragment}`")]
    Unbalanced { fragment: String },

    /// A `\command` or word that names no known function or constant.
    #[error("unknown function `{name}`")]
    UnknownFunction { name: String },

    /// A token that cannot appear where it was found.
    #[error("unexpected `{fragment}` at offset {offset}")]
    Unexpected { fragment: String, offset: usize },

    /// Input ended while an operand was still expected.
    #[error("unexpected end of input after `{fragment}`")]
    UnexpectedEnd { fragment: String },

    /// Characters the tokenizer does not recognize at all.
    #[error("unrecognized input `{fragment}` at offset {offset}")]
    InvalidToken { fragment: String, offset: usize },

    /// Grouping, signs or radicals nested past the parser's depth limit.
    #[error("nesting deeper than {limit} levels at `{fragment}`")]
    TooDeep { fragment: String, limit: usize },

    /// More tokens than one answer field may hold.
    #[error("expression longer than {limit} tokens")]
    TooLong { limit: usize },
}

impl ParseError {
    /// The substring of the input the error refers to.
    pub fn fragment(&self) -> &str {
        match self {
            ParseError::Empty | ParseError::TooLong { .. } => "",
            ParseError::Unbalanced { fragment }
            | ParseError::Unexpected { fragment, .. }
            | ParseError::UnexpectedEnd { fragment }
            | ParseError::InvalidToken { fragment, .. }
            | ParseError::TooDeep { fragment, .. } => fragment,
            ParseError::UnknownFunction { name } => name,
        }
    }
}

/// Failure while evaluating an expression to a real number.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("division by zero")]
    DivisionByZero,

    /// A function was applied outside its real domain (e.g. `ln(-1)`).
    #[error("{function} is undefined at {value}")]
    Domain { function: String, value: f64 },

    /// A free symbol with no sample value bound to it.
    #[error("symbol `{0}` has no value")]
    UnboundSymbol(String),

    /// An ordered pair appeared where a single number was required.
    #[error("ordered pair is not a scalar")]
    NotScalar,

    /// The result overflowed or was otherwise not a finite real.
    #[error("result is not a finite real number")]
    NonFinite,
}

/// Failure while reducing an expression to canonical form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CanonicalError {
    /// Exact rational arithmetic overflowed `i64`.
    #[error("exact arithmetic overflowed")]
    Overflow,

    /// Expansion would exceed the configured term cap.
    #[error("expansion exceeds {limit} terms")]
    TooLarge { limit: usize },

    /// The expression is undefined exactly (e.g. `1/0`).
    #[error("expression is undefined: {0}")]
    Undefined(&'static str),

    /// A construct with no exact canonical form (approximate literal, pair, ...).
    #[error("no exact canonical form for {0}")]
    Unsupported(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fragment_points_at_offending_text() {
        let err = ParseError::Unbalanced {
            fragment: "(x+1".into(),
        };
        assert_eq!(err.fragment(), "(x+1");
        assert_eq!(err.to_string(), "unbalanced grouping in `(x+1`");

        let err = ParseError::UnknownFunction {
            name: "foo".into(),
        };
        assert_eq!(err.fragment(), "foo");
        assert_eq!(ParseError::Empty.fragment(), "");
    }

    #[test]
    fn eval_error_messages() {
        let err = EvalError::Domain {
            function: "ln".into(),
            value: -1.0,
        };
        assert_eq!(err.to_string(), "ln is undefined at -1");
        assert_eq!(
            CanonicalError::TooLarge { limit: 8 }.to_string(),
            "expansion exceeds 8 terms"
        );
    }
}
