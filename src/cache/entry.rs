//! Cache Entry Module
//!
//! Defines a live in-memory entry with a sliding expiration deadline.

use std::time::Duration;

use tokio::time::Instant;

/// Cap applied when `now + ttl` does not fit in an `Instant` (~30 years).
const FAR_FUTURE: Duration = Duration::from_secs(60 * 60 * 24 * 365 * 30);

// == Cache Entry ==
/// A live cache entry with its sliding window.
///
/// `expires_at` moves forward on every touch. `scheduled_at` is the deadline
/// of the expiry ticket handed to the scheduler and never lies after
/// `expires_at`, so the ticket always fires in time to re-check the entry.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The stored value
    pub value: String,
    /// Sliding window length in seconds
    pub ttl_seconds: u64,
    /// Instant at which the entry expires unless touched again
    pub expires_at: Instant,
    /// Deadline of the pending expiry ticket for this key
    pub scheduled_at: Instant,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new entry whose window starts at `now`.
    ///
    /// # Arguments
    /// * `value` - The value to store
    /// * `ttl_seconds` - Sliding window length in seconds
    /// * `now` - Start of the window
    pub fn new(value: String, ttl_seconds: u64, now: Instant) -> Self {
        let expires_at = deadline_after(now, ttl_seconds);
        Self {
            value,
            ttl_seconds,
            expires_at,
            scheduled_at: expires_at,
        }
    }

    // == Touch ==
    /// Restarts the sliding window at `now`. The pending ticket stays as is.
    pub fn touch(&mut self, now: Instant) {
        self.expires_at = deadline_after(now, self.ttl_seconds);
    }

    // == Is Expired ==
    /// An entry is expired once `now >= expires_at`.
    pub fn is_expired_at(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Computes `now + ttl_seconds`, saturating at a far-future deadline.
fn deadline_after(now: Instant, ttl_seconds: u64) -> Instant {
    now.checked_add(Duration::from_secs(ttl_seconds))
        .unwrap_or(now + FAR_FUTURE)
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_creation() {
        let now = Instant::now();
        let entry = CacheEntry::new("test_value".to_string(), 60, now);

        assert_eq!(entry.value, "test_value");
        assert_eq!(entry.ttl_seconds, 60);
        assert_eq!(entry.expires_at, now + Duration::from_secs(60));
        assert_eq!(entry.scheduled_at, entry.expires_at);
        assert!(!entry.is_expired_at(now));
    }

    #[test]
    fn test_expiration_boundary_condition() {
        let now = Instant::now();
        let entry = CacheEntry::new("test".to_string(), 10, now);

        assert!(!entry.is_expired_at(now + Duration::from_millis(9_999)));
        // Expired exactly when the window has fully elapsed
        assert!(entry.is_expired_at(now + Duration::from_secs(10)));
    }

    #[test]
    fn test_touch_slides_window_but_not_ticket() {
        let start = Instant::now();
        let mut entry = CacheEntry::new("v".to_string(), 10, start);

        entry.touch(start + Duration::from_secs(9));

        assert_eq!(entry.scheduled_at, start + Duration::from_secs(10));
        assert!(!entry.is_expired_at(start + Duration::from_secs(18)));
        assert!(entry.is_expired_at(start + Duration::from_secs(19)));
    }

    #[test]
    fn test_huge_ttl_does_not_overflow() {
        let now = Instant::now();
        let entry = CacheEntry::new("v".to_string(), u64::MAX, now);

        assert!(entry.expires_at > now + Duration::from_secs(60 * 60 * 24 * 365));
        assert!(!entry.is_expired_at(now));
    }
}
