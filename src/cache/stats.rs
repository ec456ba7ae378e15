//! Cache Statistics Module
//!
//! Tracks lookup outcomes, evictions and persistence results.

use serde::Serialize;

// == Cache Stats ==
/// Counters describing cache activity since the engine was opened.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Lookups that returned a value
    pub hits: u64,
    /// Lookups for absent or expired keys
    pub misses: u64,
    /// Entries removed because their sliding window elapsed
    pub evictions: u64,
    /// Snapshots written successfully
    pub saves: u64,
    /// Snapshot writes that failed
    pub persist_failures: u64,
    /// Current number of live entries
    pub total_entries: usize,
    /// Expiry deadlines held by the scheduler, at most one per key
    pub pending_expiries: usize,
}

impl CacheStats {
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Returns hits / (hits + misses), or 0.0 if nothing was looked up.
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            return 0.0;
        }
        self.hits as f64 / lookups as f64
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }
}
