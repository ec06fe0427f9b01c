//! Retention Statistics Module
//!
//! Counts of what a retention cache holds and has let go.

use serde::Serialize;

// == Retention Stats ==
/// Occupancy and eviction counters for one retention cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RetentionStats {
    /// Objects currently retained
    pub retained: usize,
    /// Objects dropped to stay under the count ceiling
    pub evictions: u64,
    /// Objects dropped because they aged out
    pub expirations: u64,
}

impl RetentionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_evictions(&mut self, count: usize) {
        self.evictions += count as u64;
    }

    pub fn record_expirations(&mut self, count: usize) {
        self.expirations += count as u64;
    }

    pub fn set_retained(&mut self, count: usize) {
        self.retained = count;
    }
}
