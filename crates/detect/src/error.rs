//! Detection Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.
//!
//! [`Detector::detect`](crate::Detector::detect) never returns these; they
//! describe why a strategy was abandoned and end up in the logs.

use derive_more::{Display, Error};

/// A detection error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for detection operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The required executable could not be resolved.
    #[display("tool unavailable")]
    ToolUnavailable,
    /// The external process failed to run, timed out, or exited non-zero.
    #[display("probe process failed")]
    Process,
    /// The probe tool's structured output could not be parsed.
    #[display("malformed probe output")]
    MalformedOutput,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Process)
    }
}
