//! Extraction Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// An extraction error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for extraction operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// No transcoding tool is configured.
    #[display("transcoding tool unavailable")]
    ToolUnavailable,
    /// The transcoding tool could not be run to completion before its deadline.
    #[display("transcoding process failed")]
    Process,
    /// The tool ran but rejected the stream (wrong index, bitmap subtitles
    /// that cannot become text, unreadable input...).
    #[display("stream {index} could not be converted: {reason}")]
    Rejected {
        index: u32,
        reason: String,
    },
    /// The output path has no usable parent directory or file stem.
    #[display("invalid output location: {}", _0.display())]
    InvalidPath(#[error(not(source))] PathBuf),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Process)
    }
}
