//! Runtime counters and their periodic reporter.

mod counters;
mod reporter;

pub use counters::{CounterSnapshot, RuntimeCounters};
pub use reporter::StatsReporter;
