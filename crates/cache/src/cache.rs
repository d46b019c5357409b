use crate::error::Result;
use crate::key::{CacheEntry, CacheKey, now_ms};
use crate::store::{CacheStore, Entries, JsonFileStore, MemoryStore};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::time::Duration;
use tracing::instrument;

/// Entries older than this are treated as missing and pruned on load.
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// In-memory map of detection results backed by a [`CacheStore`].
///
/// Reads never touch the store. Every write replaces the whole persisted map;
/// if that fails the error is logged and the in-memory map stays
/// authoritative for the rest of the run.
///
/// The map's lock is held while the store is written, so two writers in this
/// process can never interleave their flushes. Separate processes sharing one
/// file get last-writer-wins; the atomic rename in [`JsonFileStore`] keeps
/// the file itself intact.
///
/// Writes are synchronous `std::fs` I/O: [`put`](Self::put),
/// [`expire`](Self::expire) and [`clear`](Self::clear) block the calling
/// thread for the length of the flush. On a multi-threaded runtime, call them
/// through `spawn_blocking` if that matters.
pub struct Cache {
    store: Box<dyn CacheStore>,
    entries: Mutex<Entries>,
    max_age: Duration,
}

impl Cache {
    /// Build a cache over `store`, loading whatever it already holds.
    pub fn new(store: impl CacheStore + 'static, max_age: Duration) -> Self {
        let cache = Self {
            store: Box::new(store),
            entries: Mutex::new(Entries::new()),
            max_age,
        };
        cache.load();
        cache
    }

    /// Cache persisted as JSON at `path`.
    pub fn open(path: impl Into<PathBuf>, max_age: Duration) -> Self {
        Self::new(JsonFileStore::new(path), max_age)
    }

    /// Cache that lives for this process only.
    pub fn in_memory() -> Self {
        Self::new(MemoryStore, DEFAULT_MAX_AGE)
    }

    /// (Re)load the map from the store, discarding the in-memory state. A
    /// missing or corrupt store yields an empty cache.
    #[instrument(skip_all)]
    pub fn load(&self) {
        let loaded = match self.store.load() {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(error = ?e, "Unable to load detection cache; starting empty");
                Entries::new()
            },
        };
        let mut entries = self.entries.lock();
        *entries = loaded;
        let pruned = Self::prune(&mut entries, self.max_age, now_ms());
        tracing::debug!(entries = entries.len(), pruned, "Detection cache loaded");
    }

    /// Cached stream indices for `key`, if present and not expired.
    pub fn get(&self, key: &CacheKey) -> Option<Vec<u32>> {
        let entries = self.entries.lock();
        let entry = entries.get(key)?;
        if entry.is_older_than(Self::millis(self.max_age), now_ms()) {
            return None;
        }
        Some(entry.stream_indices.clone())
    }

    /// Insert or replace `key` with a fresh timestamp, then persist the map.
    pub fn put(&self, key: CacheKey, stream_indices: Vec<u32>) {
        let mut entries = self.entries.lock();
        entries.insert(key, CacheEntry::new(stream_indices, now_ms()));
        self.persist(&entries);
    }

    /// Remove every entry older than `max_age`, then persist. Returns how many
    /// entries were removed.
    #[instrument(skip(self))]
    pub fn expire(&self, max_age: Duration) -> usize {
        let mut entries = self.entries.lock();
        let removed = Self::prune(&mut entries, max_age, now_ms());
        self.persist(&entries);
        removed
    }

    /// Empty the map and delete the backing store.
    #[instrument(skip_all)]
    pub fn clear(&self) {
        let mut entries = self.entries.lock();
        entries.clear();
        if let Err(e) = self.store.remove() {
            tracing::warn!(error = ?e, "Unable to delete detection cache file");
        }
    }

    /// Write the current map to the store, reporting failure to the caller.
    pub fn flush(&self) -> Result<()> {
        let entries = self.entries.lock();
        self.store.save(&entries)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    fn persist(&self, entries: &Entries) {
        if let Err(e) = self.store.save(entries) {
            tracing::warn!(error = ?e, "Unable to persist detection cache; keeping results in memory");
        }
    }

    fn prune(entries: &mut Entries, max_age: Duration, now: i64) -> usize {
        let before = entries.len();
        let max_age = Self::millis(max_age);
        entries.retain(|_, entry| !entry.is_older_than(max_age, now));
        before - entries.len()
    }

    fn millis(duration: Duration) -> i64 {
        i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
    }
}
