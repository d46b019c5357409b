//! Fingerprint cache for subtitle stream detection.
//!
//! Probing a video with external tools is slow; the answer only changes when
//! the file (or the tools) change. This crate remembers the stream indices
//! found for each video, keyed by a [`CacheKey`] derived from the video's
//! path, size and modification time plus an identifier of the active tool
//! configuration.
//!
//! # Architecture
//! - [`Cache`]: the in-memory map callers talk to. Lookups are synchronous
//!   and never fail; writes persist the entire map after every change.
//! - [`CacheStore`]: swappable persistence. [`JsonFileStore`] keeps a single
//!   JSON object on disk, [`MemoryStore`] keeps nothing.

mod cache;
pub mod error;
mod key;
mod store;

pub use crate::cache::{Cache, DEFAULT_MAX_AGE};
pub use crate::key::{CacheEntry, CacheKey};
pub use crate::store::{CacheStore, Entries, JsonFileStore, MemoryStore};
