//! External tool plumbing.
//!
//! Two concerns live here:
//! - **Discovery**: [`ToolLocator`] finds `ffprobe`/`ffmpeg` with a fixed
//!   priority (explicit override, bundled package directory, `PATH`) and
//!   reports [`Resolution::Unresolved`] instead of guessing.
//! - **Execution**: [`run_process`] (behind the [`ProcessRunner`] trait) runs
//!   a program with a hard deadline and kills it when the deadline passes.

pub mod error;
mod locate;
#[cfg(any(test, feature = "mock"))]
mod mock;
mod process;

pub use crate::locate::{Resolution, Source, Tool, ToolConfig, ToolLocator, ToolOverrides};
#[cfg(any(test, feature = "mock"))]
pub use crate::mock::{Call, MockRunner};
pub use crate::process::{Output, ProcessRunner, RunnerHandle, SystemRunner, run_process};
