//! Error types for expression compilation.

use metric_core::MetricError;

/// Error type for [`compile`](crate::compile).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CompileError {
    /// Identifier outside the allowed vocabulary
    #[error("invalid name: {0}")]
    Syntax(String),

    /// `$name` reference without a binding
    #[error("metric {0} not found")]
    UnknownMetric(String),

    /// Character sequence that is not a token
    #[error("unexpected input {fragment:?} at offset {position}")]
    Lex { position: usize, fragment: String },

    /// Token sequence that is not an expression
    #[error("parse error at offset {position}: {message}")]
    Parse { position: usize, message: String },

    /// Operation applied to values of the wrong kind
    #[error("type error: {0}")]
    Type(String),

    /// Bad call arguments
    #[error("{function}(): {message}")]
    Argument { function: String, message: String },

    /// Rejected by a metric constructor
    #[error(transparent)]
    Metric(#[from] MetricError),
}

impl CompileError {
    pub(crate) fn argument(function: &str, message: impl Into<String>) -> Self {
        Self::Argument {
            function: function.to_string(),
            message: message.into(),
        }
    }
}
