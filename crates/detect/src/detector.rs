use crate::container::under_reports_subtitles;
use crate::error::{ErrorKind, Result};
use crate::matchers::match_subtitle_streams;
use crate::probe::{self, ProbeReport};
use crate::stream::SubtitleStream;
use exn::ResultExt;
use std::ffi::OsString;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use subdig_cache::{Cache, CacheKey};
use subdig_tools::{RunnerHandle, ToolConfig};
use tracing::instrument;

pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_FALLBACK_TIMEOUT: Duration = Duration::from_secs(15);

/// Deadlines for the two detection strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Applies to every probe tool invocation, including the MP4 re-check.
    pub probe: Duration,
    pub fallback: Duration,
}
impl Default for Timeouts {
    fn default() -> Self {
        Self { probe: DEFAULT_PROBE_TIMEOUT, fallback: DEFAULT_FALLBACK_TIMEOUT }
    }
}

/// Finds the subtitle streams of a video.
///
/// Strategies, in order:
/// 1. the [`Cache`], keyed on the file's fingerprint and the tool paths;
/// 2. the probe tool restricted to subtitle streams, with JSON output;
/// 3. only if the probe *failed* (not if it found nothing): the transcoding
///    tool's banner, parsed by the matcher cascade;
/// 4. only for the MP4/QuickTime family and only when nothing was found so
///    far: the probe tool over every stream (see
///    [`under_reports_subtitles`](crate::under_reports_subtitles)).
///
/// The outcome of 2-4, empty or not, is written back to the cache.
#[derive(Clone)]
pub struct Detector {
    cache: Arc<Cache>,
    runner: RunnerHandle,
    timeouts: Timeouts,
}

impl Detector {
    pub fn new(cache: Arc<Cache>, runner: RunnerHandle) -> Self {
        Self { cache, runner, timeouts: Timeouts::default() }
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn cache(&self) -> &Arc<Cache> {
        &self.cache
    }

    /// Indices of the subtitle streams in `video`. Never fails: anything that
    /// goes wrong is logged and yields an empty list.
    #[instrument(skip_all, fields(path = %video.display()))]
    pub async fn detect(&self, video: &Path, tools: &ToolConfig) -> Vec<u32> {
        let key = match CacheKey::for_file(video, &tools.fingerprint()) {
            Ok(key) => key,
            Err(e) => {
                tracing::warn!(error = ?e, "Unable to fingerprint video; assuming no subtitles");
                return vec![];
            },
        };
        if let Some(streams) = self.cache.get(&key) {
            tracing::debug!(streams = ?streams, "Detection cache hit");
            return streams;
        }
        let streams = self.detect_uncached(video, tools).await;
        tracing::debug!(streams = ?streams, "Subtitle streams detected");
        self.cache.put(key, streams.clone());
        streams
    }

    async fn detect_uncached(&self, video: &Path, tools: &ToolConfig) -> Vec<u32> {
        let mut streams = match self.probe(video, tools).await {
            Ok(streams) => streams,
            Err(e) => {
                tracing::debug!(error = ?e, "Probe failed; parsing diagnostic output instead");
                self.fallback(video, tools).await.unwrap_or_else(|e| {
                    tracing::warn!(error = ?e, "Both detection strategies failed");
                    vec![]
                })
            },
        };
        if streams.is_empty() && under_reports_subtitles(video) {
            match self.probe_all_streams(video, tools).await {
                Ok(report) => streams = report.subtitle_like(),
                Err(e) => tracing::debug!(error = ?e, "Timed-text re-check failed"),
            }
        }
        streams
    }

    /// Subtitle streams of `video` with whatever metadata the probe tool
    /// reports. Bypasses the cache. Falls back the same way [`detect`]
    /// does, returning index-only descriptors from the fallback strategy.
    ///
    /// [`detect`]: Detector::detect
    #[instrument(skip_all, fields(path = %video.display()))]
    pub async fn describe(&self, video: &Path, tools: &ToolConfig) -> Vec<SubtitleStream> {
        let mut streams = match self.run_probe(tools, probe::describe_args(video)).await {
            Ok(report) => report.streams.iter().map(SubtitleStream::from_probe).collect(),
            Err(e) => {
                tracing::debug!(error = ?e, "Probe failed; parsing diagnostic output instead");
                match self.fallback(video, tools).await {
                    Ok(indices) => indices.into_iter().map(SubtitleStream::from_index).collect(),
                    Err(e) => {
                        tracing::warn!(error = ?e, "Both detection strategies failed");
                        vec![]
                    },
                }
            },
        };
        if streams.is_empty() && under_reports_subtitles(video) {
            match self.probe_all_streams(video, tools).await {
                Ok(report) => {
                    streams = report
                        .streams
                        .iter()
                        .filter(|s| s.is_subtitle_like())
                        .map(SubtitleStream::from_probe)
                        .collect();
                },
                Err(e) => tracing::debug!(error = ?e, "Timed-text re-check failed"),
            }
        }
        streams
    }

    async fn probe(&self, video: &Path, tools: &ToolConfig) -> Result<Vec<u32>> {
        Ok(self.run_probe(tools, probe::subtitle_args(video)).await?.indices())
    }

    async fn probe_all_streams(&self, video: &Path, tools: &ToolConfig) -> Result<ProbeReport> {
        tracing::debug!("Re-checking MP4-family container for timed-text tracks");
        self.run_probe(tools, probe::all_streams_args(video)).await
    }

    async fn run_probe(&self, tools: &ToolConfig, args: Vec<OsString>) -> Result<ProbeReport> {
        let program = tools.probe().or_raise(|| ErrorKind::ToolUnavailable)?;
        let output = self
            .runner
            .run(program, &args, self.timeouts.probe)
            .await
            .or_raise(|| ErrorKind::Process)?
            .into_success()
            .or_raise(|| ErrorKind::Process)?;
        ProbeReport::parse(&output.stdout)
    }

    /// `ffmpeg -i <video>` without an output exits non-zero by design, so the
    /// exit code is ignored and only the banner on stderr matters.
    async fn fallback(&self, video: &Path, tools: &ToolConfig) -> Result<Vec<u32>> {
        let program = tools.transcode().or_raise(|| ErrorKind::ToolUnavailable)?;
        let args = [OsString::from("-hide_banner"), OsString::from("-i"), video.as_os_str().to_owned()];
        let output = self
            .runner
            .run(program, &args, self.timeouts.fallback)
            .await
            .or_raise(|| ErrorKind::Process)?;
        Ok(match_subtitle_streams(&output.stderr_lossy()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use subdig_tools::error::ErrorKind as ToolErrorKind;
    use subdig_tools::{Call, MockRunner, Output};
    use tempfile::TempDir;

    const MKV_PROBE: &str = r#"{"streams": [{"index": 2}, {"index": 3}]}"#;
    const EMPTY_PROBE: &str = r#"{"streams": []}"#;
    const MP4_ALL_STREAMS: &str = r#"{"streams": [
        {"index": 0, "codec_type": "video", "codec_name": "h264"},
        {"index": 1, "codec_type": "audio", "codec_name": "aac"},
        {"index": 2, "codec_type": "data", "codec_tag_string": "tx3g", "tags": {"handler_name": "SubtitleHandler"}}
    ]}"#;
    const BANNER: &str = "Input #0, avi, from 'c.avi':\n  Stream #0:0: Video: mpeg4\n  Stream #0:1(eng): Subtitle: subrip\nAt least one output file must be specified\n";

    fn tools() -> ToolConfig {
        ToolConfig::from_paths("/opt/ff/ffprobe", "/opt/ff/ffmpeg")
    }

    fn video(dir: &TempDir, name: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, b"not really a video").unwrap();
        path
    }

    fn detector(runner: &Arc<MockRunner>) -> Detector {
        Detector::new(Arc::new(Cache::in_memory()), runner.clone())
    }

    fn is_probe(call: &Call) -> bool {
        call.program_name() == "ffprobe"
    }

    /// ffprobe answers `probe` to subtitle-only queries and `all` to
    /// `-show_streams`; ffmpeg prints `banner`.
    fn scripted(probe: Option<&'static str>, all: &'static str, banner: &'static str) -> Arc<MockRunner> {
        Arc::new(MockRunner::new(move |call| {
            if !is_probe(call) {
                return Ok(Output::exited(1, "", banner));
            }
            if call.has_arg("-show_streams") {
                return Ok(Output::exited(0, all, ""));
            }
            match probe {
                Some(json) => Ok(Output::exited(0, json, "")),
                None => Ok(Output::exited(1, "", "Invalid data found when processing input")),
            }
        }))
    }

    #[tokio::test]
    async fn test_probe_result_is_cached() {
        let dir = tempfile::tempdir().unwrap();
        let path = video(&dir, "a.mkv");
        let runner = scripted(Some(MKV_PROBE), EMPTY_PROBE, "");
        let detector = detector(&runner);

        assert_eq!(detector.detect(&path, &tools()).await, vec![2, 3]);
        assert_eq!(runner.call_count(), 1);
        assert_eq!(detector.detect(&path, &tools()).await, vec![2, 3]);
        assert_eq!(runner.call_count(), 1, "second detection must be served from the cache");
    }

    #[tokio::test]
    async fn test_empty_result_is_cached() {
        let dir = tempfile::tempdir().unwrap();
        let path = video(&dir, "a.mkv");
        let runner = scripted(Some(EMPTY_PROBE), EMPTY_PROBE, "");
        let detector = detector(&runner);

        assert!(detector.detect(&path, &tools()).await.is_empty());
        assert!(detector.detect(&path, &tools()).await.is_empty());
        assert_eq!(runner.call_count(), 1);
    }

    #[tokio::test]
    async fn test_changed_size_forces_redetection() {
        let dir = tempfile::tempdir().unwrap();
        let path = video(&dir, "a.mkv");
        let runner = scripted(Some(MKV_PROBE), EMPTY_PROBE, "");
        let detector = detector(&runner);

        detector.detect(&path, &tools()).await;
        std::fs::write(&path, b"a different, longer payload").unwrap();
        detector.detect(&path, &tools()).await;
        assert_eq!(runner.call_count(), 2);
    }

    #[tokio::test]
    async fn test_changed_mtime_forces_redetection() {
        let dir = tempfile::tempdir().unwrap();
        let path = video(&dir, "a.mkv");
        let runner = scripted(Some(MKV_PROBE), EMPTY_PROBE, "");
        let detector = detector(&runner);

        detector.detect(&path, &tools()).await;
        let file = std::fs::File::options().write(true).open(&path).unwrap();
        file.set_modified(std::time::SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000)).unwrap();
        detector.detect(&path, &tools()).await;
        assert_eq!(runner.call_count(), 2);
    }

    #[tokio::test]
    async fn test_changed_tools_force_redetection() {
        let dir = tempfile::tempdir().unwrap();
        let path = video(&dir, "a.mkv");
        let runner = scripted(Some(MKV_PROBE), EMPTY_PROBE, "");
        let detector = detector(&runner);

        detector.detect(&path, &tools()).await;
        detector.detect(&path, &ToolConfig::from_paths("/usr/bin/ffprobe", "/usr/bin/ffmpeg")).await;
        assert_eq!(runner.call_count(), 2);
    }

    #[tokio::test]
    async fn test_probe_failure_uses_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let path = video(&dir, "c.avi");
        let runner = scripted(None, EMPTY_PROBE, BANNER);
        let detector = detector(&runner);

        assert_eq!(detector.detect(&path, &tools()).await, vec![1]);
        let programs: Vec<_> = runner.calls().iter().map(|c| c.program_name().to_string()).collect();
        assert_eq!(programs, ["ffprobe", "ffmpeg"]);
    }

    #[tokio::test]
    async fn test_each_strategy_gets_its_own_deadline() {
        let dir = tempfile::tempdir().unwrap();
        let runner = scripted(None, EMPTY_PROBE, BANNER);
        detector(&runner).detect(&video(&dir, "c.avi"), &tools()).await;
        let timeouts: Vec<_> = runner.calls().iter().map(|c| c.timeout).collect();
        assert_eq!(timeouts, [Duration::from_secs(10), Duration::from_secs(15)]);

        let runner = scripted(Some(EMPTY_PROBE), MP4_ALL_STREAMS, "");
        detector(&runner).detect(&video(&dir, "b.mp4"), &tools()).await;
        let timeouts: Vec<_> = runner.calls().iter().map(|c| c.timeout).collect();
        assert_eq!(timeouts, [Duration::from_secs(10), Duration::from_secs(10)]);
    }

    #[tokio::test]
    async fn test_configured_timeouts_are_passed_through() {
        let dir = tempfile::tempdir().unwrap();
        let runner = scripted(None, MP4_ALL_STREAMS, "");
        let custom = Timeouts { probe: Duration::from_secs(3), fallback: Duration::from_secs(7) };
        detector(&runner).with_timeouts(custom).detect(&video(&dir, "b.mp4"), &tools()).await;
        let calls: Vec<_> = runner.calls().iter().map(|c| (c.program_name().to_string(), c.timeout)).collect();
        assert_eq!(
            calls,
            [
                ("ffprobe".to_string(), Duration::from_secs(3)),
                ("ffmpeg".to_string(), Duration::from_secs(7)),
                ("ffprobe".to_string(), Duration::from_secs(3)),
            ]
        );
    }

    #[tokio::test]
    async fn test_probe_finding_nothing_skips_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let path = video(&dir, "a.mkv");
        let runner = scripted(Some(EMPTY_PROBE), EMPTY_PROBE, BANNER);
        let detector = detector(&runner);

        assert!(detector.detect(&path, &tools()).await.is_empty());
        assert!(runner.calls().iter().all(is_probe));
    }

    #[tokio::test]
    async fn test_malformed_probe_output_uses_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let path = video(&dir, "c.avi");
        let runner = scripted(Some("{\"streams\": ["), EMPTY_PROBE, BANNER);
        assert_eq!(detector(&runner).detect(&path, &tools()).await, vec![1]);
    }

    #[tokio::test]
    async fn test_probe_timeout_uses_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let path = video(&dir, "c.avi");
        let runner = Arc::new(MockRunner::new(|call| {
            if is_probe(call) {
                return Err(exn::Exn::from(ToolErrorKind::Timeout(DEFAULT_PROBE_TIMEOUT)));
            }
            Ok(Output::exited(1, "", BANNER))
        }));
        assert_eq!(detector(&runner).detect(&path, &tools()).await, vec![1]);
    }

    #[tokio::test]
    async fn test_mp4_recheck_recovers_timed_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = video(&dir, "b.mp4");
        let runner = scripted(Some(EMPTY_PROBE), MP4_ALL_STREAMS, "");
        let detector = detector(&runner);

        assert_eq!(detector.detect(&path, &tools()).await, vec![2]);
        assert!(runner.calls().last().unwrap().has_arg("-show_streams"));
    }

    #[tokio::test]
    async fn test_recheck_is_limited_to_mp4_family() {
        let dir = tempfile::tempdir().unwrap();
        let path = video(&dir, "b.mkv");
        let runner = scripted(Some(EMPTY_PROBE), MP4_ALL_STREAMS, "");
        let detector = detector(&runner);

        assert!(detector.detect(&path, &tools()).await.is_empty());
        assert!(!runner.calls().iter().any(|c| c.has_arg("-show_streams")));
    }

    #[tokio::test]
    async fn test_unresolved_tools_yield_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = video(&dir, "a.mkv");
        let runner = scripted(Some(MKV_PROBE), EMPTY_PROBE, BANNER);
        let unresolved = ToolConfig::new(
            subdig_tools::Resolution::Unresolved(subdig_tools::Tool::Probe),
            subdig_tools::Resolution::Unresolved(subdig_tools::Tool::Transcode),
        );

        assert!(detector(&runner).detect(&path, &unresolved).await.is_empty());
        assert_eq!(runner.call_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_file_is_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let runner = scripted(Some(MKV_PROBE), EMPTY_PROBE, "");
        let detector = detector(&runner);

        assert!(detector.detect(&dir.path().join("gone.mkv"), &tools()).await.is_empty());
        assert_eq!(runner.call_count(), 0);
        assert!(detector.cache().is_empty());
    }

    #[tokio::test]
    async fn test_describe_bypasses_cache() {
        let dir = tempfile::tempdir().unwrap();
        let path = video(&dir, "a.mkv");
        let runner = Arc::new(MockRunner::new(|_| {
            Ok(Output::exited(
                0,
                r#"{"streams": [{"index": 2, "codec_name": "ass", "tags": {"language": "eng"}, "disposition": {"default": 1, "forced": 0}}]}"#,
                "",
            ))
        }));
        let detector = detector(&runner);

        let streams = detector.describe(&path, &tools()).await;
        assert_eq!(streams.len(), 1);
        assert_eq!(streams[0].codec.as_deref(), Some("ass"));
        assert_eq!(streams[0].language.as_deref(), Some("eng"));
        assert!(streams[0].default);
        detector.describe(&path, &tools()).await;
        assert_eq!(runner.call_count(), 2);
        assert!(detector.cache().is_empty());
    }

    #[tokio::test]
    async fn test_describe_falls_back_to_index_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = video(&dir, "c.avi");
        let runner = scripted(None, EMPTY_PROBE, BANNER);
        assert_eq!(detector(&runner).describe(&path, &tools()).await, vec![SubtitleStream::from_index(1)]);
    }
}
