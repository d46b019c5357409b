use crate::discover::VideoFile;
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use subdig_detect::Detector;
use subdig_extract::{ExtractionOutcome, Extractor, subtitle_path};
use subdig_tools::ToolConfig;
use tokio::fs;
use tracing::instrument;

/// Detect the subtitle streams of one video and extract each one that does
/// not already have an output file.
///
/// Detection and extraction failures are absorbed by [`Detector`] and
/// [`Extractor`]; an `Err` here means the output location itself could not
/// be worked out or checked.
#[instrument(skip_all, fields(path = %video.path.display()))]
pub async fn process_file(
    detector: &Detector,
    extractor: &Extractor,
    video: &VideoFile,
    tools: &ToolConfig,
) -> Result<Vec<ExtractionOutcome>> {
    let streams = detector.detect(&video.path, tools).await;
    let mut outcomes = Vec::with_capacity(streams.len());
    for index in streams {
        let output = subtitle_path(&video.path, index).or_raise(|| ErrorKind::File(video.path.clone()))?;
        if fs::try_exists(&output).await.or_raise(|| ErrorKind::File(video.path.clone()))? {
            tracing::debug!(index, output = %output.display(), "Subtitle already extracted");
            outcomes.push(ExtractionOutcome::skipped(output));
            continue;
        }
        let success = extractor.extract(&video.path, index, &output, tools).await;
        if success && !fs::try_exists(&output).await.unwrap_or(false) {
            tracing::debug!(index, output = %output.display(), "Tool reported success but wrote no file");
        }
        outcomes.push(ExtractionOutcome::extracted(output, success));
    }
    Ok(outcomes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use subdig_cache::Cache;
    use subdig_tools::{MockRunner, Output};

    #[tokio::test]
    async fn test_existing_output_is_not_regenerated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.mkv");
        std::fs::write(&path, b"video").unwrap();
        std::fs::write(dir.path().join("a.2.vtt"), b"WEBVTT\n").unwrap();
        let runner = Arc::new(MockRunner::new(|call| match call.program_name() {
            "ffprobe" => Ok(Output::exited(0, r#"{"streams": [{"index": 2}, {"index": 3}]}"#, "")),
            _ => Ok(Output::exited(0, "", "")),
        }));
        let detector = Detector::new(Arc::new(Cache::in_memory()), runner.clone());
        let extractor = Extractor::new(runner.clone());
        let video = VideoFile { path: path.clone(), extension: "mkv".into() };
        let tools = ToolConfig::from_paths("/opt/ff/ffprobe", "/opt/ff/ffmpeg");

        let outcomes = process_file(&detector, &extractor, &video, &tools).await.unwrap();
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes[0].skipped);
        assert!(!outcomes[1].skipped && outcomes[1].success);
        assert_eq!(outcomes[1].output, dir.path().join("a.3.vtt"));
        let extractions: Vec<_> = runner.calls().into_iter().filter(|c| c.program_name() == "ffmpeg").collect();
        assert_eq!(extractions.len(), 1);
        assert!(extractions[0].has_arg("0:3"));
    }
}
