//! Batch runs over a directory tree.
//!
//! [`Orchestrator::events`] discovers every video under a root, then feeds
//! them through a fixed-width pool where each video is detected and its
//! subtitle streams extracted by [`process_file`]. Nothing short of finding
//! no videos at all stops a run.

mod file;
mod stream;

pub use self::file::process_file;
pub use self::stream::{DEFAULT_CONCURRENCY, Orchestrator, Progress, Summary};
