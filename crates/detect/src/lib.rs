//! Subtitle stream detection.
//!
//! [`Detector::detect`] answers one question: which streams of this video are
//! subtitles? It asks the [`Cache`](subdig_cache::Cache) first, then the
//! probe tool (`ffprobe`, JSON output), then parses the transcoding tool's
//! free-text banner with an ordered cascade of [`matchers`]. MP4/QuickTime
//! files get one extra look, see [`under_reports_subtitles`].
//!
//! Detection never fails from the caller's point of view; the
//! [`error`] types only travel as far as the logs.

mod consts;
mod container;
mod detector;
pub mod error;
pub mod matchers;
mod probe;
mod stream;

pub use crate::container::under_reports_subtitles;
pub use crate::detector::{DEFAULT_FALLBACK_TIMEOUT, DEFAULT_PROBE_TIMEOUT, Detector, Timeouts};
pub use crate::stream::SubtitleStream;
