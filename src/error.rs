//! Error type shared by every primitive in the crate.
//!
//! Primitives validate all of their inputs before computing anything, so an
//! `Err` always means no output was produced.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, RecurrentError>;

#[derive(Debug, Error)]
pub enum RecurrentError {
    /// A tensor has the right rank but inconsistent dimensions.
    #[error("shape mismatch for `{name}`: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        name: &'static str,
        expected: Vec<usize>,
        got: Vec<usize>,
    },

    /// A tensor has the wrong number of axes.
    #[error("`{name}` must have rank {expected}, got shape {got:?}")]
    RankMismatch {
        name: &'static str,
        expected: usize,
        got: Vec<usize>,
    },

    /// An integer index (word id or class label) lies outside `[0, bound)`.
    #[error("`{name}` contains index {index}, outside [0, {bound})")]
    IndexOutOfRange {
        name: &'static str,
        index: usize,
        bound: usize,
    },

    #[error("sequence length must be at least 1")]
    EmptySequence,

    /// The cache sequence handed to a backward driver does not cover every timestep.
    #[error("expected {expected} cached timesteps, got {got}")]
    CacheMismatch { expected: usize, got: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl RecurrentError {
    pub(crate) fn shape(name: &'static str, expected: &[usize], got: &[usize]) -> Self {
        RecurrentError::ShapeMismatch {
            name,
            expected: expected.to_vec(),
            got: got.to_vec(),
        }
    }
}
