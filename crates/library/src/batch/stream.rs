use crate::batch::file::process_file;
use crate::discover::{VideoFile, discover};
use crate::error::{ErrorKind, Result};
use async_stream::stream;
use futures::stream::FuturesUnordered;
use futures::{Stream, StreamExt};
use std::path::{Path, PathBuf};
use subdig_config::DEFAULT_EXTENSIONS;
use subdig_detect::Detector;
use subdig_extract::Extractor;
use subdig_tools::ToolConfig;
use tracing::instrument;

/// Files processed at the same time, unless configured otherwise.
pub const DEFAULT_CONCURRENCY: usize = 3;

/// Progress of a batch run.
///
/// A successful run yields exactly one [`Scanning`](Self::Scanning), one
/// [`Processing`](Self::Processing) per video in completion order, then one
/// [`Completed`](Self::Completed). A run that finds no videos yields a single
/// [`Error`](Self::Error) instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Progress {
    Scanning { total: usize },
    Processing { current: usize, total: usize, current_file: PathBuf },
    Completed { processed: usize, success: usize },
    Error { message: String },
}

/// Totals of a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    /// Videos attempted, whether or not anything was extracted from them.
    pub processed: usize,
    /// Subtitle files written during this run.
    pub success: usize,
}

/// Drives detection and extraction over every video under a root directory.
#[derive(Clone)]
pub struct Orchestrator {
    detector: Detector,
    extractor: Extractor,
    concurrency: usize,
    extensions: Vec<String>,
}

impl Orchestrator {
    pub fn new(detector: Detector, extractor: Extractor) -> Self {
        Self {
            detector,
            extractor,
            concurrency: DEFAULT_CONCURRENCY,
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_extensions(mut self, extensions: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    pub fn detector(&self) -> &Detector {
        &self.detector
    }

    pub fn extractor(&self) -> &Extractor {
        &self.extractor
    }

    pub async fn discover(&self, root: &Path) -> Vec<VideoFile> {
        discover(root, &self.extensions).await
    }

    /// Streams [`Progress`] for a batch run over `root`.
    ///
    /// At most `concurrency` videos are in flight; as soon as one settles the
    /// next is started. Per-file problems are logged and count as zero
    /// successes for that file. The only `Err` item is the "no video files"
    /// precondition, which follows its [`Progress::Error`] event and ends the
    /// stream.
    pub fn events<'a>(&'a self, root: &'a Path, tools: &'a ToolConfig) -> impl Stream<Item = Result<Progress>> + 'a {
        stream!({
            let files = self.discover(root).await;
            if files.is_empty() {
                let kind = ErrorKind::NoVideoFiles(root.to_path_buf());
                tracing::warn!(root = %root.display(), "No video files found");
                yield Ok(Progress::Error { message: kind.to_string() });
                yield Err(exn::Exn::from(kind));
                return;
            }
            let total = files.len();
            tracing::info!(total, concurrency = self.concurrency, "Processing videos");
            yield Ok(Progress::Scanning { total });

            let mut pending = files.iter().map(move |video| async move { (video, self.process(video, tools).await) });
            let mut processing = FuturesUnordered::new();
            processing.extend(pending.by_ref().take(self.concurrency));
            let (mut current, mut success) = (0, 0);
            while let Some((video, extracted)) = processing.next().await {
                current += 1;
                success += extracted;
                yield Ok(Progress::Processing { current, total, current_file: video.path.clone() });
                // Pop-n-push, in discovery order.
                if let Some(next) = pending.next() {
                    processing.push(next);
                }
            }

            tracing::info!(processed = current, success, "Batch complete");
            yield Ok(Progress::Completed { processed: current, success });
        })
    }

    /// Run a batch to completion, handing every event to `on_progress`.
    #[instrument(skip_all, fields(root = %root.display()))]
    pub async fn run(&self, root: &Path, tools: &ToolConfig, mut on_progress: impl FnMut(&Progress)) -> Result<Summary> {
        let mut events = std::pin::pin!(self.events(root, tools));
        let mut summary = Summary::default();
        while let Some(event) = events.next().await {
            let event = event?;
            on_progress(&event);
            if let Progress::Completed { processed, success } = event {
                summary = Summary { processed, success };
            }
        }
        Ok(summary)
    }

    /// Successful extractions for one video; failures are logged, never
    /// propagated.
    async fn process(&self, video: &VideoFile, tools: &ToolConfig) -> usize {
        match process_file(&self.detector, &self.extractor, video, tools).await {
            Ok(outcomes) => {
                let success = outcomes.iter().filter(|o| o.success).count();
                let skipped = outcomes.iter().filter(|o| o.skipped).count();
                tracing::info!(
                    path = %video.path.display(),
                    streams = outcomes.len(),
                    success,
                    skipped,
                    failed = outcomes.len() - success - skipped,
                    "Video processed"
                );
                success
            },
            Err(e) => {
                tracing::warn!(error = ?e, path = %video.path.display(), "Video could not be processed");
                0
            },
        }
    }
}
