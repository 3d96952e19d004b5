//! Stats module - weighted averages and benchmark gaps

mod aggregator;

pub use aggregator::{round1, Aggregator, SummaryResult, DEFAULT_BENCHMARK};
