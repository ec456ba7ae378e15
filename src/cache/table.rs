//! Cache Table Module
//!
//! Synchronous key → entry map with sliding deadlines. The engine wraps it in
//! a lock and forwards the tickets it hands out to the expiry scheduler.
//!
//! Reads only move an entry's deadline forward. A ticket is issued when the
//! scheduler needs an earlier deadline than it already holds for the key, or
//! when a due ticket finds the entry still alive and it must be re-armed.

use std::collections::HashMap;

use chrono::NaiveDateTime;
use tokio::time::Instant;

use crate::cache::{CacheEntry, CacheEntrySnapshot, CacheStats};
use crate::tasks::ExpiryTicket;

// == Expiry Outcome ==
/// What a due ticket found in the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expiry {
    /// The entry's window had elapsed and it was removed
    Evicted,
    /// The entry was touched since the ticket was issued; re-arm with this ticket
    Rescheduled(ExpiryTicket),
    /// No entry under that key
    Absent,
}

// == Cache Table ==
/// In-memory table of live entries.
#[derive(Debug, Default)]
pub struct CacheTable {
    /// Key-value storage
    entries: HashMap<String, CacheEntry>,
    /// Lookup and eviction counters
    stats: CacheStats,
}

impl CacheTable {
    pub fn new() -> Self {
        Self::default()
    }

    // == Set ==
    /// Inserts or overwrites `key` with a fresh window of `ttl_seconds`.
    ///
    /// Overwriting replaces the previous entry outright, so the table never
    /// holds more than one entry per key. A pending ticket that fires no later
    /// than the new deadline is kept.
    ///
    /// # Returns
    /// A ticket to schedule, or None if the pending one already covers the
    /// new window.
    pub fn set(
        &mut self,
        key: String,
        value: String,
        ttl_seconds: u64,
        now: Instant,
    ) -> Option<ExpiryTicket> {
        let mut entry = CacheEntry::new(value, ttl_seconds, now);
        let ticket = match self.entries.get(&key) {
            Some(previous) if previous.scheduled_at <= entry.expires_at => {
                entry.scheduled_at = previous.scheduled_at;
                None
            }
            _ => Some(ExpiryTicket {
                deadline: entry.expires_at,
                key: key.clone(),
            }),
        };
        self.entries.insert(key, entry);
        ticket
    }

    // == Get ==
    /// Looks up `key` and slides its window on a hit.
    ///
    /// An entry whose deadline already passed is a miss and is left for the
    /// scheduler to evict.
    pub fn get(&mut self, key: &str, now: Instant) -> Option<String> {
        match self.entries.get_mut(key) {
            Some(entry) if !entry.is_expired_at(now) => {
                entry.touch(now);
                self.stats.record_hit();
                Some(entry.value.clone())
            }
            _ => {
                self.stats.record_miss();
                None
            }
        }
    }

    // == Expire ==
    /// Handles a due ticket for `key`.
    ///
    /// Removes the entry if its window has elapsed. If reads pushed the
    /// deadline out, the entry is re-armed at its current deadline instead.
    pub fn expire(&mut self, key: &str, now: Instant) -> Expiry {
        let Some(entry) = self.entries.get_mut(key) else {
            return Expiry::Absent;
        };

        if entry.is_expired_at(now) {
            self.entries.remove(key);
            self.stats.record_eviction();
            return Expiry::Evicted;
        }

        entry.scheduled_at = entry.expires_at;
        Expiry::Rescheduled(ExpiryTicket {
            deadline: entry.expires_at,
            key: key.to_string(),
        })
    }

    // == Snapshot ==
    /// Builds the full persisted view of all live entries.
    ///
    /// Every entry is stamped with `wall_now` as its window start and its own
    /// TTL. Entries already past their deadline are left out. The result is
    /// sorted by key.
    pub fn snapshot(&self, wall_now: NaiveDateTime, now: Instant) -> Vec<CacheEntrySnapshot> {
        let mut snapshot: Vec<CacheEntrySnapshot> = self
            .entries
            .iter()
            .filter(|(_, entry)| !entry.is_expired_at(now))
            .map(|(key, entry)| {
                CacheEntrySnapshot::new(key.clone(), entry.value.clone(), wall_now, entry.ttl_seconds)
            })
            .collect();
        snapshot.sort_by(|a, b| a.key.cmp(&b.key));
        snapshot
    }

    /// Returns current lookup and eviction statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.total_entries = self.entries.len();
        stats
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
