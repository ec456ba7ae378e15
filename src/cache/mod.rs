//! Cache Module
//!
//! Provides the sliding-expiration cache engine and its persisted snapshot form.

mod engine;
mod entry;
mod snapshot;
mod stats;
mod table;


// Re-export public types
pub use engine::{CacheEngine, CacheEvent};
pub use snapshot::{wall_clock_now, CacheEntrySnapshot, CREATED_AT_FORMAT};
pub use stats::CacheStats;

pub(crate) use entry::CacheEntry;
