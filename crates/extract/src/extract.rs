use crate::error::{ErrorKind, Result};
use exn::{OptionExt, ResultExt};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;
use subdig_tools::{RunnerHandle, ToolConfig};
use tracing::instrument;

pub const DEFAULT_EXTRACT_TIMEOUT: Duration = Duration::from_secs(30);

/// Where the subtitle for stream `index` of `video` is written:
/// `<dir>/<stem>.<index>.vtt`, next to the video.
pub fn subtitle_path(video: &Path, index: u32) -> Result<PathBuf> {
    let stem = video.file_stem().ok_or_raise(|| ErrorKind::InvalidPath(video.to_path_buf()))?;
    let mut name = stem.to_os_string();
    name.push(format!(".{index}.vtt"));
    Ok(video.with_file_name(name))
}

/// Arguments for converting stream `index` of `video` to WebVTT at `output`.
///
/// `-map 0:<index>` selects by container-absolute index, which is what the
/// detector reports. `-y` is always passed; skipping existing outputs is the
/// caller's job.
pub fn extract_args(video: &Path, index: u32, output: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = ["-hide_banner", "-loglevel", "error", "-nostdin", "-y", "-i"]
        .into_iter()
        .map(OsString::from)
        .collect();
    args.push(video.as_os_str().to_owned());
    args.extend(["-map".into(), format!("0:{index}").into(), "-c:s".into(), "webvtt".into()]);
    args.push(output.as_os_str().to_owned());
    args
}

/// What happened to one (video, stream) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionOutcome {
    pub output: PathBuf,
    pub success: bool,
    /// The output already existed, so the tool was never invoked.
    pub skipped: bool,
}
impl ExtractionOutcome {
    pub fn extracted(output: PathBuf, success: bool) -> Self {
        Self { output, success, skipped: false }
    }

    pub fn skipped(output: PathBuf) -> Self {
        Self { output, success: false, skipped: true }
    }
}

/// Runs the transcoding tool to turn one subtitle stream into a file.
#[derive(Clone)]
pub struct Extractor {
    runner: RunnerHandle,
    timeout: Duration,
}

impl Extractor {
    pub fn new(runner: RunnerHandle) -> Self {
        Self { runner, timeout: DEFAULT_EXTRACT_TIMEOUT }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Extract stream `index` of `video` into `output`. Never fails: returns
    /// `true` only when the tool exited with code 0.
    #[instrument(skip_all, fields(path = %video.display(), index))]
    pub async fn extract(&self, video: &Path, index: u32, output: &Path, tools: &ToolConfig) -> bool {
        match self.try_extract(video, index, output, tools).await {
            Ok(()) => {
                tracing::debug!(output = %output.display(), "Subtitle stream extracted");
                true
            },
            Err(e) => {
                tracing::warn!(error = ?e, output = %output.display(), "Subtitle extraction failed");
                false
            },
        }
    }

    /// Same as [`extract`](Self::extract), but reports why it failed.
    pub async fn try_extract(&self, video: &Path, index: u32, output: &Path, tools: &ToolConfig) -> Result<()> {
        let program = tools.transcode().or_raise(|| ErrorKind::ToolUnavailable)?;
        let result = self
            .runner
            .run(program, &extract_args(video, index, output), self.timeout)
            .await
            .or_raise(|| ErrorKind::Process)?;
        if !result.success() {
            let reason = result.stderr_tail().unwrap_or_else(|| format!("exit code {:?}", result.code));
            exn::bail!(ErrorKind::Rejected { index, reason });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::sync::Arc;
    use subdig_tools::error::ErrorKind as ToolErrorKind;
    use subdig_tools::{MockRunner, Output, Resolution, Tool};

    fn tools() -> ToolConfig {
        ToolConfig::from_paths("/opt/ff/ffprobe", "/opt/ff/ffmpeg")
    }

    #[rstest]
    #[case("/videos/show.mkv", 2, "/videos/show.2.vtt")]
    #[case("/videos/show.s01e01.mp4", 0, "/videos/show.s01e01.0.vtt")]
    #[case("relative/clip.AVI", 11, "relative/clip.11.vtt")]
    #[case("noext", 3, "noext.3.vtt")]
    fn test_subtitle_path(#[case] video: &str, #[case] index: u32, #[case] expected: &str) {
        assert_eq!(subtitle_path(Path::new(video), index).unwrap(), PathBuf::from(expected));
    }

    #[test]
    fn test_subtitle_path_requires_file_name() {
        let err = subtitle_path(Path::new("/"), 1).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidPath(_)));
    }

    #[test]
    fn test_extract_args() {
        let args = extract_args(Path::new("/v/a.mkv"), 3, Path::new("/v/a.3.vtt"));
        let args: Vec<_> = args.iter().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(
            args,
            [
                "-hide_banner",
                "-loglevel",
                "error",
                "-nostdin",
                "-y",
                "-i",
                "/v/a.mkv",
                "-map",
                "0:3",
                "-c:s",
                "webvtt",
                "/v/a.3.vtt"
            ]
        );
    }

    #[tokio::test]
    async fn test_exit_zero_is_success() {
        let runner = Arc::new(MockRunner::new(|_| Ok(Output::exited(0, "", ""))));
        let extractor = Extractor::new(runner.clone());
        assert!(extractor.extract(Path::new("a.mkv"), 2, Path::new("a.2.vtt"), &tools()).await);
        let calls = runner.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].program_name(), "ffmpeg");
        assert!(calls[0].has_arg("0:2"));
        assert_eq!(calls[0].timeout, Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_configured_timeout_is_passed_through() {
        let runner = Arc::new(MockRunner::new(|_| Ok(Output::exited(0, "", ""))));
        let extractor = Extractor::new(runner.clone()).with_timeout(Duration::from_secs(90));
        extractor.extract(Path::new("a.mkv"), 2, Path::new("a.2.vtt"), &tools()).await;
        assert_eq!(runner.calls()[0].timeout, Duration::from_secs(90));
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_failure() {
        let runner = Arc::new(MockRunner::new(|_| {
            Ok(Output::exited(1, "", "Subtitle encoding currently only possible from text to text or bitmap to bitmap\n"))
        }));
        let extractor = Extractor::new(runner);
        let err = extractor.try_extract(Path::new("a.mkv"), 4, Path::new("a.4.vtt"), &tools()).await.unwrap_err();
        match &*err {
            ErrorKind::Rejected { index, reason } => {
                assert_eq!(*index, 4);
                assert!(reason.starts_with("Subtitle encoding"));
            },
            other => panic!("unexpected error: {other}"),
        }
        assert!(!extractor.extract(Path::new("a.mkv"), 4, Path::new("a.4.vtt"), &tools()).await);
    }

    #[tokio::test]
    async fn test_timeout_is_failure() {
        let runner = Arc::new(MockRunner::new(|_| Err(exn::Exn::from(ToolErrorKind::Timeout(DEFAULT_EXTRACT_TIMEOUT)))));
        let extractor = Extractor::new(runner);
        let err = extractor.try_extract(Path::new("a.mkv"), 2, Path::new("a.2.vtt"), &tools()).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Process));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_unresolved_tool_never_spawns() {
        let runner = Arc::new(MockRunner::new(|_| Ok(Output::exited(0, "", ""))));
        let extractor = Extractor::new(runner.clone());
        let tools = ToolConfig::new(
            Resolution::Unresolved(Tool::Probe),
            Resolution::Unresolved(Tool::Transcode),
        );
        assert!(!extractor.extract(Path::new("a.mkv"), 2, Path::new("a.2.vtt"), &tools).await);
        assert_eq!(runner.call_count(), 0);
    }
}
