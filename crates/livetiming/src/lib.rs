//! Live-timing aggregation.
//!
//! Fuses the per-driver OpenF1 streams into one ordered snapshot per
//! session.

pub mod aggregator;
pub mod format;

pub use aggregator::TimingAggregator;
