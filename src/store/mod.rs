//! Store Module
//!
//! Durable storage of full cache snapshots. A store only knows how to load
//! the last snapshot and replace it wholesale; it never sees single-entry
//! updates.

mod file;
mod memory;

pub use file::FileCacheStore;
pub use memory::MemoryCacheStore;

use crate::cache::CacheEntrySnapshot;
use crate::error::Result;

// == Cache Store Trait ==
/// Load/replace storage for the complete set of live entries.
///
/// Calls are blocking; the engine runs them on tokio's blocking pool.
pub trait CacheStore: Send + Sync + 'static {
    /// Returns the most recently saved snapshot, or an empty one if nothing
    /// was saved yet.
    ///
    /// # Errors
    /// `StoreUnavailable` if the medium exists but cannot be read or decoded.
    fn load(&self) -> Result<Vec<CacheEntrySnapshot>>;

    /// Atomically replaces the persisted snapshot with `entries`.
    ///
    /// # Errors
    /// `StoreUnavailable` if the write cannot complete. The previous snapshot
    /// must be left intact in that case.
    fn save(&self, entries: &[CacheEntrySnapshot]) -> Result<()>;
}
