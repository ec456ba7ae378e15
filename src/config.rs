//! Configuration Module
//!
//! Resolves where the cache file lives and which default TTL the engine uses.
//! The engine itself never computes paths; the host passes them in.

use std::env;
use std::path::PathBuf;

/// Default file name of the snapshot inside the `caches` directory.
pub const DEFAULT_CACHE_FILE_NAME: &str = "cachesData.data";

/// Default sliding TTL in seconds.
pub const DEFAULT_TTL_SECONDS: u64 = 10;

/// Name of the directory under the application directory holding snapshots.
pub const CACHE_DIR_NAME: &str = "caches";

/// Host configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Application directory; snapshots go to `<app_dir>/caches/`
    pub app_dir: PathBuf,
    /// Snapshot file name
    pub cache_file_name: String,
    /// Default TTL in seconds for entries stored without an explicit TTL
    pub default_ttl: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_APP_DIR` - Application directory (default: executable directory)
    /// - `CACHE_FILE_NAME` - Snapshot file name (default: cachesData.data)
    /// - `DEFAULT_TTL` - Default TTL in seconds (default: 10, zero is ignored)
    pub fn from_env() -> Self {
        Self {
            app_dir: env::var("CACHE_APP_DIR")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(application_dir),
            cache_file_name: env::var("CACHE_FILE_NAME")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_CACHE_FILE_NAME.to_string()),
            default_ttl: env::var("DEFAULT_TTL")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|ttl: &u64| *ttl > 0)
                .unwrap_or(DEFAULT_TTL_SECONDS),
        }
    }

    /// Directory holding the snapshot file.
    pub fn cache_dir(&self) -> PathBuf {
        self.app_dir.join(CACHE_DIR_NAME)
    }

    /// Full path of the snapshot file: `<app_dir>/caches/<cache_file_name>`.
    pub fn cache_file_path(&self) -> PathBuf {
        self.cache_dir().join(&self.cache_file_name)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_dir: application_dir(),
            cache_file_name: DEFAULT_CACHE_FILE_NAME.to_string(),
            default_ttl: DEFAULT_TTL_SECONDS,
        }
    }
}

/// Directory of the running executable, or the working directory if unknown.
fn application_dir() -> PathBuf {
    env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("."))
}
