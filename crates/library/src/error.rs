//! Library Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A library error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Nothing with a video extension exists under the requested root. This
    /// is the only error a batch run returns to its caller.
    #[display("no video files found in {}", _0.display())]
    NoVideoFiles(#[error(not(source))] PathBuf),
    /// A single video could not be processed; the batch carries on without it.
    #[display("unable to process {}", _0.display())]
    File(#[error(not(source))] PathBuf),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::NoVideoFiles(_) => false,
            Self::File(_) => true,
        }
    }
}
