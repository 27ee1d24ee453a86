//! Error types for metric construction and evaluation.

/// Error type for metric operations.
///
/// Construction errors are raised by the validating constructors, indexing
/// errors by [`Metric::at`](crate::Metric::at) and [`Metric::last`](crate::Metric::last),
/// and snapshot errors by [`Metric::restore`](crate::Metric::restore).
/// Numeric edge cases (division by zero, NaN operands) are never errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MetricError {
    /// Weighted choice with a weight list of the wrong length
    #[error("weights should be of same length as choices ({choices} choices, {weights} weights)")]
    WeightsMismatch { choices: usize, weights: usize },

    /// Weighted choice without any choices
    #[error("choices must not be empty")]
    EmptyChoices,

    /// Weights that cannot form a probability distribution
    #[error("invalid weights: {0}")]
    InvalidWeights(String),

    /// Distribution parameter out of range
    #[error("invalid parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    /// Unsupported downsample aggregation
    #[error("invalid method \"{0}\"")]
    UnknownMethod(String),

    /// Repeat/cycle window with a non-positive period
    #[error("invalid window: end ({end}) must be greater than start ({start})")]
    InvalidWindow { start: u64, end: u64 },

    /// Window or sample size of zero
    #[error("{name} must be at least 1")]
    InvalidSize { name: &'static str },

    /// N-ary combinator without operands
    #[error("{0} requires at least one operand")]
    EmptyOperands(&'static str),

    /// Piecewise-linear ramp without points
    #[error("lines requires at least one point")]
    EmptyPoints,

    /// Negative index passed to `at`
    #[error("does not support negative indexing (got {0})")]
    NegativeIndex(i64),

    /// Index before the current cursor passed to `at`
    #[error("cannot go backward: requested index {requested}, cursor is at {cursor}")]
    Backward { requested: u64, cursor: u64 },

    /// `last` called before any step
    #[error("no value has been produced yet")]
    NotStarted,

    /// Snapshot taken from a structurally different node
    #[error("snapshot mismatch: expected {expected}, found {found}")]
    SnapshotMismatch { expected: String, found: String },
}

impl MetricError {
    pub(crate) fn mismatch(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::SnapshotMismatch {
            expected: expected.into(),
            found: found.into(),
        }
    }
}
