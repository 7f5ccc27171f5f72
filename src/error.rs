use crate::hypergraph::StateId;
use std::io;

/// Everything that can go wrong while building or searching a hypergraph.
///
/// Algorithms check their storage prerequisites before they start, so an
/// error is reported before any partial result is written.
#[derive(Debug, thiserror::Error)]
pub enum HgError {
    /// The input does not have the shape or storage the operation needs.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("unimplemented: {0}")]
    Unimplemented(String),

    /// A contradictory combination of options or properties.
    #[error("configuration error: {0}")]
    Config(String),

    #[error("negative-cost cycle through state {state}")]
    NegativeCycle { state: StateId },

    #[error("cyclic derivation through state {state}")]
    CyclicDerivation { state: StateId },

    #[error("{what} limit of {limit} exceeded")]
    LimitExceeded { what: &'static str, limit: usize },

    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, HgError>;

impl HgError {
    pub(crate) fn invalid<S: Into<String>>(message: S) -> Self {
        HgError::InvalidInput(message.into())
    }
}
