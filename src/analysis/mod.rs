//! Marks aggregation engine.
//!
//! Pure queries over a loaded [`crate::models::Table`]: derived columns,
//! per-subject statistics, rankings, performance buckets and
//! cross-tabulations.

pub mod aggregator;
pub mod stats;

pub use aggregator::*;
