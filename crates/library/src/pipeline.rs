use crate::batch::{Orchestrator, Progress, Summary};
use crate::error::Result;
use std::path::Path;
use std::sync::Arc;
use subdig_cache::{Cache, MemoryStore};
use subdig_config::Config;
use subdig_detect::{Detector, SubtitleStream, Timeouts};
use subdig_extract::Extractor;
use subdig_tools::{Resolution, RunnerHandle, SystemRunner, Tool, ToolConfig, ToolOverrides};
use tracing::instrument;

/// The four operations exposed to front ends, wired from one [`Config`].
pub struct Pipeline {
    config: Config,
    cache: Arc<Cache>,
    orchestrator: Orchestrator,
}

impl Pipeline {
    /// A pipeline that spawns real processes.
    pub fn new(config: Config) -> Self {
        Self::with_runner(config, Arc::new(SystemRunner))
    }

    pub fn with_runner(config: Config, runner: RunnerHandle) -> Self {
        let cache = Arc::new(match config.cache.file() {
            Some(path) => {
                tracing::debug!(path = %path.display(), "Using persistent detection cache");
                Cache::open(path, config.cache.max_age())
            },
            None => Cache::new(MemoryStore, config.cache.max_age()),
        });
        let pipeline = &config.pipeline;
        let detector = Detector::new(cache.clone(), runner.clone())
            .with_timeouts(Timeouts { probe: pipeline.probe_timeout(), fallback: pipeline.fallback_timeout() });
        let extractor = Extractor::new(runner).with_timeout(pipeline.extract_timeout());
        let orchestrator = Orchestrator::new(detector, extractor)
            .with_concurrency(pipeline.concurrency)
            .with_extensions(pipeline.extensions.iter().cloned());
        Self { config, cache, orchestrator }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn cache(&self) -> &Arc<Cache> {
        &self.cache
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    /// Resolve both tools, letting `overrides` win over configured paths.
    pub fn tools(&self, overrides: Option<&ToolOverrides>) -> ToolConfig {
        let mut locator = self.config.tools.locator();
        if let Some(overrides) = overrides {
            locator = locator.with_overrides(self.config.tools.overrides().merged_with(overrides));
        }
        let tools = locator.resolve();
        for tool in [Tool::Probe, Tool::Transcode] {
            match tools.resolution(tool) {
                Resolution::Resolved { path, source } => {
                    tracing::debug!(%tool, path = %path.display(), ?source, "Tool resolved");
                },
                Resolution::Unresolved(_) => tracing::warn!(%tool, "Tool not found; dependent steps will fail"),
            }
        }
        tools
    }

    /// Detect and extract every subtitle stream under `root`.
    ///
    /// Returns an error only when `root` holds no videos.
    #[instrument(skip_all, fields(root = %root.display()))]
    pub async fn extract_folder(
        &self,
        root: &Path,
        overrides: Option<ToolOverrides>,
        on_progress: impl FnMut(&Progress),
    ) -> Result<Summary> {
        let tools = self.tools(overrides.as_ref());
        self.orchestrator.run(root, &tools, on_progress).await
    }

    /// Forget every detection result, in memory and on disk.
    pub fn clear_cache(&self) {
        self.cache.clear();
        tracing::info!("Detection cache cleared");
    }

    /// Subtitle streams of a single video, always probed afresh.
    pub async fn stream_info(&self, video: &Path) -> Vec<SubtitleStream> {
        let tools = self.tools(None);
        self.orchestrator.detector().describe(video, &tools).await
    }

    /// Extract one stream to `output`, overwriting it if it exists.
    pub async fn extract_single_stream(&self, video: &Path, index: u32, output: &Path) -> bool {
        let tools = self.tools(None);
        self.orchestrator.extractor().extract(video, index, output, &tools).await
    }
}
