//! Tool Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use crate::locate::Tool;
use derive_more::{Display, Error};
use std::path::PathBuf;
use std::time::Duration;

/// A tool error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for tool operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// No executable could be found for the tool (override, bundled or `PATH`).
    #[display("{_0} not detected on your system")]
    Unresolved(#[error(not(source))] Tool),
    /// The process could not be started at all.
    #[display("failed to spawn {}", _0.display())]
    Spawn(#[error(not(source))] PathBuf),
    /// The process outlived its deadline and was killed.
    #[display("process killed after {}ms", _0.as_millis())]
    Timeout(#[error(not(source))] Duration),
    /// The process exited with a non-zero code, or was killed by a signal
    /// (`None`).
    #[display("process exited with code: {_0:?}")]
    Exit(#[error(not(source))] Option<i32>),
    Io,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}
