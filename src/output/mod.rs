//! Run reporting
//!
//! Counters collected during a harvest and the summary logged at its end.

pub mod stats;

pub use stats::{ExtractionSource, RunStats};
