//! Aggregation error types

use thiserror::Error;

/// Errors raised by the aggregation engine.
///
/// Both variants signal a bug in the calling code rather than a runtime
/// condition, so callers propagate them instead of retrying.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AggregationError {
    #[error("{strategy} requires at least one candidate")]
    EmptyInput { strategy: String },

    #[error("window_size must be positive, got {0}")]
    InvalidWindowSize(usize),
}
