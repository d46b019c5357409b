//! Batch subtitle extraction for a local video library.
//!
//! Ties [detection](subdig_detect), [extraction](subdig_extract) and the
//! [cache](subdig_cache) together:
//! - [`discover`] walks a directory tree for videos,
//! - [`Orchestrator`] runs every video through a bounded pool and reports
//!   [`Progress`],
//! - [`Pipeline`] wires all of it from a [`Config`](subdig_config::Config)
//!   and exposes the operations front ends call.

pub mod batch;
mod discover;
pub mod error;
mod pipeline;

pub use crate::batch::{DEFAULT_CONCURRENCY, Orchestrator, Progress, Summary};
pub use crate::discover::{VideoFile, discover};
pub use crate::pipeline::Pipeline;
