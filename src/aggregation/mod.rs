//! Answer aggregation.
//!
//! This module turns a pool of proposer samples into a single consensus
//! answer by majority vote, either over the whole pool or window by window.

pub mod aggregator;
pub mod error;

pub use aggregator::{aggregate_flat, aggregate_windowed, rank_votes};
pub use error::AggregationError;
