//! Build-time error taxonomy. Matching never fails: a non-matching input
//! is an ordinary `false`, not an error (spec §7).

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PatternError {
    #[error("operator '{operator}' applied to an empty fragment stack")]
    StackUnderflow { operator: &'static str },

    #[error("fragment stack exceeded its capacity of {capacity}")]
    StackOverflow { capacity: usize },

    #[error("malformed quantifier: {0}")]
    MalformedQuantifier(String),

    #[error("unbalanced capturing group")]
    UnbalancedGroup,

    #[error("expected exactly one fragment at end of input, found {0}")]
    TrailingFragments(usize),
}

pub type PatternResult<T> = Result<T, PatternError>;
