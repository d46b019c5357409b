use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use subdig_tools::{ToolLocator, ToolOverrides};
use tracing::instrument;

/// Prefix of environment variables that override configuration values.
/// Nested keys are separated by a double underscore, for example
/// `SUBDIG_PIPELINE__CONCURRENCY=4`.
pub const ENV_PREFIX: &str = "SUBDIG_";

/// Container extensions treated as videos unless configured otherwise.
pub const DEFAULT_EXTENSIONS: [&str; 14] = [
    "mkv", "mp4", "m4v", "mov", "avi", "wmv", "flv", "webm", "ts", "m2ts", "mpg", "mpeg", "ogv", "3gp",
];

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "subdig")
}

/// `config.toml` in the platform configuration directory.
pub fn default_config_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join("config.toml"))
}

/// `streams.json` in the platform cache directory.
pub fn default_cache_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.cache_dir().join("streams.json"))
}

/// Directories searched for bundled `ffprobe`/`ffmpeg` builds: next to the
/// running executable, its `bin/` sibling, then the platform data directory.
pub fn default_bundled_dirs() -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    if let Some(exe_dir) = std::env::current_exe().ok().and_then(|exe| exe.parent().map(Path::to_path_buf)) {
        dirs.push(exe_dir.join("bin"));
        dirs.insert(0, exe_dir);
    }
    if let Some(project) = project_dirs() {
        dirs.push(project.data_dir().join("bin"));
    }
    dirs
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub tools: ToolsConfig,
    pub cache: CacheConfig,
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub ffprobe: Option<PathBuf>,
    pub ffmpeg: Option<PathBuf>,
    pub bundled_dirs: Vec<PathBuf>,
}
impl Default for ToolsConfig {
    fn default() -> Self {
        Self { ffprobe: None, ffmpeg: None, bundled_dirs: default_bundled_dirs() }
    }
}
impl ToolsConfig {
    pub fn overrides(&self) -> ToolOverrides {
        ToolOverrides { ffprobe: self.ffprobe.clone(), ffmpeg: self.ffmpeg.clone() }
    }

    /// A locator honouring the configured overrides and bundled directories.
    pub fn locator(&self) -> ToolLocator {
        ToolLocator::new(self.bundled_dirs.iter().cloned()).with_overrides(self.overrides())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Falls back to [`default_cache_path`] when unset.
    pub path: Option<PathBuf>,
    pub max_age_days: u64,
    pub enabled: bool,
}
impl Default for CacheConfig {
    fn default() -> Self {
        Self { path: None, max_age_days: 30, enabled: true }
    }
}
impl CacheConfig {
    /// Resolved cache file, or `None` when caching is disabled or no
    /// platform cache directory exists.
    pub fn file(&self) -> Option<PathBuf> {
        if !self.enabled {
            return None;
        }
        self.path.clone().or_else(default_cache_path)
    }

    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_days.saturating_mul(24 * 60 * 60))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub concurrency: usize,
    pub extensions: Vec<String>,
    pub probe_timeout_secs: u64,
    pub fallback_timeout_secs: u64,
    pub extract_timeout_secs: u64,
}
impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            concurrency: 3,
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            probe_timeout_secs: 10,
            fallback_timeout_secs: 15,
            extract_timeout_secs: 30,
        }
    }
}
impl PipelineConfig {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn fallback_timeout(&self) -> Duration {
        Duration::from_secs(self.fallback_timeout_secs)
    }

    pub fn extract_timeout(&self) -> Duration {
        Duration::from_secs(self.extract_timeout_secs)
    }
}

impl Config {
    /// Layered load: built-in defaults, the platform `config.toml`, the
    /// `explicit` file (if any), then `SUBDIG_*` environment variables.
    #[instrument(skip_all, fields(explicit = ?explicit))]
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = default_config_path() {
            tracing::debug!(path = %path.display(), "Merging platform configuration file, if present");
            figment = figment.merge(Toml::file(path));
        }
        if let Some(path) = explicit {
            figment = merge_file(figment, path)?;
        }
        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
        Self::extract(figment)
    }

    /// Defaults overlaid with a single file; no platform file, no environment.
    pub fn from_file(path: &Path) -> Result<Self> {
        Self::extract(merge_file(Figment::from(Serialized::defaults(Self::default())), path)?)
    }

    fn extract(figment: Figment) -> Result<Self> {
        let config: Self = figment.extract().or_raise(|| ErrorKind::Parse)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let pipeline = &self.pipeline;
        if pipeline.concurrency == 0 {
            exn::bail!(ErrorKind::Validation("pipeline.concurrency must be at least 1".into()));
        }
        for (name, secs) in [
            ("probe_timeout_secs", pipeline.probe_timeout_secs),
            ("fallback_timeout_secs", pipeline.fallback_timeout_secs),
            ("extract_timeout_secs", pipeline.extract_timeout_secs),
        ] {
            if secs == 0 {
                exn::bail!(ErrorKind::Validation(format!("pipeline.{name} must be at least 1")));
            }
        }
        Ok(())
    }
}

fn merge_file(figment: Figment, path: &Path) -> Result<Figment> {
    if !path.is_file() {
        exn::bail!(ErrorKind::NotFound(path.to_path_buf()));
    }
    let extension = path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase);
    tracing::debug!(path = %path.display(), "Merging configuration file");
    Ok(match extension.as_deref() {
        Some("toml") => figment.merge(Toml::file(path)),
        Some("yaml" | "yml") => figment.merge(Yaml::file(path)),
        Some("json") => figment.merge(Json::file(path)),
        _ => exn::bail!(ErrorKind::UnsupportedFormat(path.to_path_buf())),
    })
}
