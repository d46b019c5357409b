use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use serde::{Deserialize, Serialize};
use std::path::Path;
use time::OffsetDateTime;

/// Opaque fingerprint of (video path, size, modification time, tool
/// configuration).
///
/// The fingerprint is a BLAKE3 digest, so it is stable across runs and safe to
/// use as a JSON object key. Content is deliberately NOT hashed: touching a
/// file (new mtime) is enough to force re-detection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(path: &Path, size: u64, modified: OffsetDateTime, tools: &str) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(path.as_os_str().as_encoded_bytes());
        hasher.update(&[0]);
        hasher.update(&size.to_le_bytes());
        hasher.update(&modified.unix_timestamp_nanos().to_le_bytes());
        hasher.update(&[0]);
        hasher.update(tools.as_bytes());
        Self(hasher.finalize().to_hex().to_string())
    }

    /// Fingerprint a file on disk, reading its size and modification time.
    pub fn for_file(path: &Path, tools: &str) -> Result<Self> {
        let metadata = std::fs::metadata(path).or_raise(|| ErrorKind::Fingerprint(path.to_path_buf()))?;
        let modified = metadata.modified().or_raise(|| ErrorKind::Fingerprint(path.to_path_buf()))?;
        Ok(Self::new(path, metadata.len(), OffsetDateTime::from(modified), tools))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// The cached detection result for one fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub stream_indices: Vec<u32>,
    /// Unix epoch, in milliseconds, at which the entry was written.
    pub timestamp: i64,
}
impl CacheEntry {
    pub fn new(stream_indices: Vec<u32>, timestamp: i64) -> Self {
        Self { stream_indices, timestamp }
    }

    pub fn is_older_than(&self, max_age_ms: i64, now_ms: i64) -> bool {
        now_ms.saturating_sub(self.timestamp) > max_age_ms
    }
}

/// Milliseconds since the Unix epoch.
pub(crate) fn now_ms() -> i64 {
    let nanos = OffsetDateTime::now_utc().unix_timestamp_nanos();
    i64::try_from(nanos / 1_000_000).unwrap_or(i64::MAX)
}
