//! Persistence backends for the cache map.
//!
//! A backend only ever sees the whole map: [`CacheStore::save`] replaces
//! everything that was persisted before, there are no per-entry writes.

use crate::error::{ErrorKind, Result};
use crate::key::{CacheEntry, CacheKey};
use exn::ResultExt;
use std::collections::HashMap;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub type Entries = HashMap<CacheKey, CacheEntry>;

/// Swappable persistence for [`Cache`](crate::Cache).
pub trait CacheStore: Send + Sync {
    /// Read the persisted map. A store that has never been written returns an
    /// empty map, not an error.
    fn load(&self) -> Result<Entries>;
    /// Replace the persisted map with `entries`.
    fn save(&self, entries: &Entries) -> Result<()>;
    /// Delete the persisted map entirely.
    fn remove(&self) -> Result<()>;
}

/// Stores the map as a single JSON object on disk.
///
/// ```json
/// {"<fingerprint>": {"streamIndices": [2, 3], "timestamp": 1700000000000}}
/// ```
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}
impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CacheStore for JsonFileStore {
    fn load(&self) -> Result<Entries> {
        let contents = match std::fs::read(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Entries::new()),
            Err(e) => return Err(e).or_raise(|| ErrorKind::Persist(self.path.clone())),
        };
        serde_json::from_slice(&contents).or_raise(|| ErrorKind::Corrupt(self.path.clone()))
    }

    fn save(&self, entries: &Entries) -> Result<()> {
        let persist = || ErrorKind::Persist(self.path.clone());
        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(parent).or_raise(persist)?;
        // Write next to the target then rename over it, so a reader never
        // observes a half-written map.
        let mut tmp = tempfile::NamedTempFile::new_in(parent).or_raise(persist)?;
        {
            let mut writer = BufWriter::new(tmp.as_file_mut());
            serde_json::to_writer(&mut writer, entries).or_raise(persist)?;
            writer.flush().or_raise(persist)?;
        }
        tmp.persist(&self.path).or_raise(persist)?;
        Ok(())
    }

    fn remove(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).or_raise(|| ErrorKind::Persist(self.path.clone())),
        }
    }
}

/// A store that persists nothing; every load starts empty.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryStore;

impl CacheStore for MemoryStore {
    fn load(&self) -> Result<Entries> {
        Ok(Entries::new())
    }

    fn save(&self, _entries: &Entries) -> Result<()> {
        Ok(())
    }

    fn remove(&self) -> Result<()> {
        Ok(())
    }
}
