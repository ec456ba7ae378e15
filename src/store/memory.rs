//! Memory Cache Store
//!
//! Keeps the last snapshot in process memory. Nothing survives a restart.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::cache::CacheEntrySnapshot;
use crate::error::Result;
use crate::store::CacheStore;

#[derive(Debug, Default)]
struct Saved {
    entries: Vec<CacheEntrySnapshot>,
    save_count: u64,
}

// == Memory Cache Store ==
/// A `CacheStore` holding its snapshot in memory. Saves never fail.
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    saved: Mutex<Saved>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store whose first `load` returns `entries`.
    pub fn with_entries(entries: Vec<CacheEntrySnapshot>) -> Self {
        Self {
            saved: Mutex::new(Saved {
                entries,
                save_count: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Saved> {
        // The guarded data is replaced wholesale, so a poisoned lock is still consistent
        self.saved.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The most recently saved (or seeded) snapshot.
    pub fn entries(&self) -> Vec<CacheEntrySnapshot> {
        self.lock().entries.clone()
    }

    /// Number of successful saves so far.
    pub fn save_count(&self) -> u64 {
        self.lock().save_count
    }
}

impl CacheStore for MemoryCacheStore {
    fn load(&self) -> Result<Vec<CacheEntrySnapshot>> {
        Ok(self.entries())
    }

    fn save(&self, entries: &[CacheEntrySnapshot]) -> Result<()> {
        let mut saved = self.lock();
        saved.entries = entries.to_vec();
        saved.save_count += 1;
        Ok(())
    }
}
