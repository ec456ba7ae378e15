//! File Cache Store
//!
//! Keeps the snapshot as a pretty-printed JSON array in a single file.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::cache::CacheEntrySnapshot;
use crate::error::{CacheError, Result};
use crate::store::CacheStore;

// == File Cache Store ==
/// A `CacheStore` backed by one JSON file.
///
/// Saves go through a temporary file in the same directory which is then
/// renamed over the target, so readers see either the old or the new
/// snapshot and never a partial one.
#[derive(Debug, Clone)]
pub struct FileCacheStore {
    path: PathBuf,
}

impl FileCacheStore {
    /// Creates a store for `path`. Nothing is touched on disk until the first
    /// load or save; the parent directory must exist by then.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn parent_dir(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }
}

impl CacheStore for FileCacheStore {
    fn load(&self) -> Result<Vec<CacheEntrySnapshot>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("No snapshot at {}, starting empty", self.path.display());
                return Ok(Vec::new());
            }
            Err(err) => return Err(CacheError::store_io(&self.path, "read", err)),
        };

        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }

        // A literal `null` counts as an empty snapshot
        let entries: Option<Vec<CacheEntrySnapshot>> = serde_json::from_str(&raw)
            .map_err(|err| CacheError::store_io(&self.path, "decode", err))?;
        Ok(entries.unwrap_or_default())
    }

    fn save(&self, entries: &[CacheEntrySnapshot]) -> Result<()> {
        let json = serde_json::to_string_pretty(entries)
            .map_err(|err| CacheError::store_io(&self.path, "encode", err))?;

        let mut tmp = NamedTempFile::new_in(self.parent_dir())
            .map_err(|err| CacheError::store_io(&self.path, "create temp file for", err))?;
        tmp.write_all(json.as_bytes())
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|err| CacheError::store_io(&self.path, "write", err))?;
        tmp.persist(&self.path)
            .map_err(|err| CacheError::store_io(&self.path, "replace", err.error))?;
        // Make the rename itself durable
        #[cfg(unix)]
        fs::File::open(self.parent_dir())
            .and_then(|dir| dir.sync_all())
            .map_err(|err| CacheError::store_io(&self.path, "sync directory of", err))?;

        debug!(
            "Saved {} entries to {}",
            entries.len(),
            self.path.display()
        );
        Ok(())
    }
}
