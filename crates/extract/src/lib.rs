//! Subtitle stream extraction.
//!
//! One call, one stream: [`Extractor::extract`] asks the transcoding tool to
//! copy stream `N` of a video into a WebVTT file and reports whether the tool
//! exited cleanly. Deciding *which* streams to extract and whether an output
//! already exists is left to the caller.

pub mod error;
mod extract;

pub use crate::extract::{DEFAULT_EXTRACT_TIMEOUT, ExtractionOutcome, Extractor, extract_args, subtitle_path};
