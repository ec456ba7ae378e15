//! Cache Entry Snapshot Module
//!
//! The persisted form of one cached item. A sequence of these is what a
//! `CacheStore` loads and saves.

use chrono::{Local, NaiveDateTime, TimeDelta, Timelike};
use serde::{Deserialize, Serialize};

/// Fixed, human-readable format of `createdAt` in persisted snapshots.
pub const CREATED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// == Cache Entry Snapshot ==
/// One persisted entry: key, value, start of its current window, and window length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntrySnapshot {
    pub key: String,
    pub value: String,
    /// Local wall-clock time the entry's current expiration window began
    #[serde(with = "created_at_format")]
    pub created_at: NaiveDateTime,
    /// Sliding expiration window length
    pub ttl_seconds: u64,
}

impl CacheEntrySnapshot {
    pub fn new(
        key: impl Into<String>,
        value: impl Into<String>,
        created_at: NaiveDateTime,
        ttl_seconds: u64,
    ) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            created_at,
            ttl_seconds,
        }
    }

    // == Validity ==
    /// Checks whether the entry is still inside its window at `now`.
    ///
    /// Valid means `now - created_at < ttl_seconds`. Entries stamped in the
    /// future (clock moved backwards) are valid. A TTL too large to represent
    /// never runs out.
    pub fn is_valid_at(&self, now: NaiveDateTime) -> bool {
        let elapsed = now.signed_duration_since(self.created_at);
        match i64::try_from(self.ttl_seconds)
            .ok()
            .and_then(TimeDelta::try_seconds)
        {
            Some(ttl) => elapsed < ttl,
            None => true,
        }
    }
}

// == Utility Functions ==
/// Current local time truncated to the persisted resolution.
pub fn wall_clock_now() -> NaiveDateTime {
    let now = Local::now().naive_local();
    now.with_nanosecond(0).unwrap_or(now)
}

/// Serde adapter for `createdAt` using [`CREATED_AT_FORMAT`].
mod created_at_format {
    use chrono::NaiveDateTime;
    use serde::{self, Deserialize, Deserializer, Serializer};

    use super::CREATED_AT_FORMAT;

    pub fn serialize<S>(date: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let s = date.format(CREATED_AT_FORMAT).to_string();
        serializer.serialize_str(&s)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&s, CREATED_AT_FORMAT).map_err(serde::de::Error::custom)
    }
}
