//! Cache Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.
//!
//! None of these escape [`Cache`](crate::Cache)'s read/write operations: the
//! cache logs them and carries on in memory. They are surfaced by the
//! explicit lifecycle calls ([`flush`](crate::Cache::flush)) and by
//! [`CacheKey::for_file`](crate::CacheKey::for_file).

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A cache error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for cache operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The video's size or modification time could not be read, so no
    /// fingerprint can be derived.
    #[display("cannot fingerprint: {}", _0.display())]
    Fingerprint(#[error(not(source))] PathBuf),
    /// The backing file exists but does not contain a valid cache map.
    #[display("corrupt cache file: {}", _0.display())]
    Corrupt(#[error(not(source))] PathBuf),
    /// Reading, writing or removing the backing file failed.
    #[display("cache persistence failed: {}", _0.display())]
    Persist(#[error(not(source))] PathBuf),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Persist(_))
    }
}
