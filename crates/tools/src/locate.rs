use crate::error::{ErrorKind, Result};
use derive_more::Display;
use exn::OptionExt;
use std::path::{Path, PathBuf};

/// The two external programs the pipeline drives.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tool {
    /// Stream inspection with structured output (`ffprobe`).
    #[display("ffprobe")]
    Probe,
    /// General purpose transcoder (`ffmpeg`).
    #[display("ffmpeg")]
    Transcode,
}
impl Tool {
    /// Platform-specific file name of the executable.
    pub fn file_name(&self) -> String {
        format!("{self}{}", std::env::consts::EXE_SUFFIX)
    }
}

/// Where a resolved executable came from.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    #[display("override")]
    Override,
    #[display("bundled")]
    Bundled,
    #[display("PATH")]
    Path,
}

/// Outcome of looking for a single tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved { path: PathBuf, source: Source },
    Unresolved(Tool),
}
impl Resolution {
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Resolved { path, .. } => Some(path),
            Self::Unresolved(_) => None,
        }
    }
}

/// Caller-supplied executable paths that take priority over any discovery.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOverrides {
    pub ffprobe: Option<PathBuf>,
    pub ffmpeg: Option<PathBuf>,
}
impl ToolOverrides {
    fn get(&self, tool: Tool) -> Option<&Path> {
        match tool {
            Tool::Probe => self.ffprobe.as_deref(),
            Tool::Transcode => self.ffmpeg.as_deref(),
        }
    }

    /// Fields set in `other` win over fields set in `self`.
    pub fn merged_with(&self, other: &ToolOverrides) -> ToolOverrides {
        ToolOverrides {
            ffprobe: other.ffprobe.clone().or_else(|| self.ffprobe.clone()),
            ffmpeg: other.ffmpeg.clone().or_else(|| self.ffmpeg.clone()),
        }
    }
}

/// The resolved pair of executables used for one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolConfig {
    probe: Resolution,
    transcode: Resolution,
}
impl ToolConfig {
    pub fn new(probe: Resolution, transcode: Resolution) -> Self {
        Self { probe, transcode }
    }

    /// Shorthand for tests and callers that already know both paths.
    pub fn from_paths(ffprobe: impl Into<PathBuf>, ffmpeg: impl Into<PathBuf>) -> Self {
        Self {
            probe: Resolution::Resolved { path: ffprobe.into(), source: Source::Override },
            transcode: Resolution::Resolved { path: ffmpeg.into(), source: Source::Override },
        }
    }

    pub fn probe(&self) -> Result<&Path> {
        self.probe.path().ok_or_raise(|| ErrorKind::Unresolved(Tool::Probe))
    }

    pub fn transcode(&self) -> Result<&Path> {
        self.transcode.path().ok_or_raise(|| ErrorKind::Unresolved(Tool::Transcode))
    }

    pub fn resolution(&self, tool: Tool) -> &Resolution {
        match tool {
            Tool::Probe => &self.probe,
            Tool::Transcode => &self.transcode,
        }
    }

    /// Identifier of this configuration, mixed into cache fingerprints so that
    /// switching binaries invalidates earlier detection results.
    pub fn fingerprint(&self) -> String {
        let describe = |r: &Resolution| match r {
            Resolution::Resolved { path, .. } => path.display().to_string(),
            Resolution::Unresolved(tool) => format!("<{tool}>"),
        };
        format!("{}|{}", describe(&self.probe), describe(&self.transcode))
    }
}

/// Resolves tool executables with a fixed priority:
/// explicit override, then bundled package directories, then `PATH`.
#[derive(Debug, Clone, Default)]
pub struct ToolLocator {
    overrides: ToolOverrides,
    bundled_dirs: Vec<PathBuf>,
}
impl ToolLocator {
    pub fn new(bundled_dirs: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        Self {
            overrides: ToolOverrides::default(),
            bundled_dirs: bundled_dirs.into_iter().map(Into::into).collect(),
        }
    }

    pub fn with_overrides(mut self, overrides: ToolOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn locate(&self, tool: Tool) -> Resolution {
        if let Some(path) = self.overrides.get(tool) {
            if path.is_file() {
                return Resolution::Resolved { path: path.to_path_buf(), source: Source::Override };
            }
            tracing::warn!(tool = %tool, path = %path.display(), "Configured override does not exist; falling back to discovery");
        }
        let file_name = tool.file_name();
        for dir in &self.bundled_dirs {
            let candidate = dir.join(&file_name);
            if candidate.is_file() {
                return Resolution::Resolved { path: candidate, source: Source::Bundled };
            }
        }
        if let Ok(path) = which::which(&file_name) {
            return Resolution::Resolved { path, source: Source::Path };
        }
        tracing::info!(tool = %tool, "Executable not found in overrides, bundled directories or PATH");
        Resolution::Unresolved(tool)
    }

    /// Resolve both tools at once.
    pub fn resolve(&self) -> ToolConfig {
        ToolConfig::new(self.locate(Tool::Probe), self.locate(Tool::Transcode))
    }
}
