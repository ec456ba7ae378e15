//! snapcache - An embeddable key/value cache
//!
//! Provides sliding expiration with full-snapshot persistence so cached
//! values survive process restarts.

pub mod cache;
pub mod config;
pub mod error;
pub mod store;
mod tasks;

pub use cache::{CacheEngine, CacheEntrySnapshot, CacheEvent, CacheStats};
pub use config::Config;
pub use error::{CacheError, Result};
pub use store::{CacheStore, FileCacheStore, MemoryCacheStore};
