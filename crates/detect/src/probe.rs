//! Structured output of the probe tool (`ffprobe -of json`).

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use serde::Deserialize;
use std::collections::HashMap;
use std::ffi::OsString;
use std::path::Path;

/// Timed-text codecs that MP4/QuickTime containers carry for subtitles and
/// closed captions.
const TIMED_TEXT_CODECS: [&str; 5] = ["mov_text", "tx3g", "eia_608", "c608", "wvtt"];

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ProbeReport {
    #[serde(default)]
    pub streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProbeStream {
    pub index: u32,
    #[serde(default)]
    pub codec_name: Option<String>,
    #[serde(default)]
    pub codec_type: Option<String>,
    #[serde(default)]
    pub codec_tag_string: Option<String>,
    #[serde(default)]
    pub tags: HashMap<String, String>,
    #[serde(default)]
    pub disposition: HashMap<String, i64>,
}

impl ProbeReport {
    pub fn parse(stdout: &[u8]) -> Result<Self> {
        serde_json::from_slice(stdout).or_raise(|| ErrorKind::MalformedOutput)
    }

    /// Indices of every reported stream, unique and in report order.
    pub fn indices(&self) -> Vec<u32> {
        unique(self.streams.iter().map(|s| s.index))
    }

    /// Indices of streams that look like subtitle tracks, for reports that
    /// were NOT restricted to subtitle streams.
    pub fn subtitle_like(&self) -> Vec<u32> {
        unique(self.streams.iter().filter(|s| s.is_subtitle_like()).map(|s| s.index))
    }
}

impl ProbeStream {
    pub fn is_subtitle_like(&self) -> bool {
        if self.codec_type.as_deref() == Some("subtitle") {
            return true;
        }
        let timed_text = |value: &Option<String>| {
            value.as_deref().is_some_and(|v| TIMED_TEXT_CODECS.iter().any(|c| v.eq_ignore_ascii_case(c)))
        };
        if timed_text(&self.codec_name) || timed_text(&self.codec_tag_string) {
            return true;
        }
        self.tag("handler_name").is_some_and(|handler| {
            let handler = handler.to_ascii_lowercase();
            handler.contains("subtitle") || handler.contains("caption")
        })
    }

    /// Tag lookup ignoring case; Matroska muxers disagree on `title` vs `TITLE`.
    pub fn tag(&self, name: &str) -> Option<&str> {
        self.tags.iter().find(|(k, _)| k.eq_ignore_ascii_case(name)).map(|(_, v)| v.as_str())
    }

    pub fn flag(&self, name: &str) -> bool {
        self.disposition.get(name).is_some_and(|v| *v != 0)
    }
}

fn unique(indices: impl Iterator<Item = u32>) -> Vec<u32> {
    let mut found = Vec::new();
    for index in indices {
        if !found.contains(&index) {
            found.push(index);
        }
    }
    found
}

fn with_input(mut args: Vec<OsString>, video: &Path) -> Vec<OsString> {
    args.push(video.as_os_str().to_owned());
    args
}

fn strings(args: &[&str]) -> Vec<OsString> {
    args.iter().map(OsString::from).collect()
}

/// Subtitle streams only, index field only.
pub(crate) fn subtitle_args(video: &Path) -> Vec<OsString> {
    let args = strings(&["-v", "error", "-select_streams", "s", "-show_entries", "stream=index", "-of", "json"]);
    with_input(args, video)
}

/// Subtitle streams with the metadata shown to users.
pub(crate) fn describe_args(video: &Path) -> Vec<OsString> {
    let args = strings(&[
        "-v",
        "error",
        "-select_streams",
        "s",
        "-show_entries",
        "stream=index,codec_name:stream_tags=language,title:stream_disposition=default,forced",
        "-of",
        "json",
    ]);
    with_input(args, video)
}

/// Every stream, every field.
pub(crate) fn all_streams_args(video: &Path) -> Vec<OsString> {
    with_input(strings(&["-v", "error", "-show_streams", "-of", "json"]), video)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_parse_subtitle_only_report() {
        let json = br#"{"programs": [], "streams": [{"index": 2}, {"index": 3}]}"#;
        assert_eq!(ProbeReport::parse(json).unwrap().indices(), vec![2, 3]);
    }

    #[rstest]
    #[case::empty_object(b"{}".as_slice())]
    #[case::empty_streams(br#"{"streams": []}"#.as_slice())]
    fn test_parse_no_streams(#[case] json: &[u8]) {
        assert!(ProbeReport::parse(json).unwrap().indices().is_empty());
    }

    #[rstest]
    #[case::truncated(br#"{"streams": [{"index": 2"#.as_slice())]
    #[case::not_json(b"Invalid data found when processing input".as_slice())]
    #[case::empty(b"".as_slice())]
    fn test_parse_malformed(#[case] json: &[u8]) {
        let err = ProbeReport::parse(json).unwrap_err();
        assert!(matches!(&*err, ErrorKind::MalformedOutput));
    }

    #[test]
    fn test_subtitle_like_streams() {
        let json = br#"{"streams": [
            {"index": 0, "codec_type": "video", "codec_name": "h264", "tags": {"handler_name": "VideoHandler"}},
            {"index": 1, "codec_type": "audio", "codec_name": "aac", "tags": {"handler_name": "SoundHandler"}},
            {"index": 2, "codec_type": "data", "codec_tag_string": "tx3g"},
            {"index": 3, "codec_type": "data", "codec_tag_string": "text", "tags": {"handler_name": "Closed Captions"}},
            {"index": 4, "codec_type": "data", "codec_name": "bin_data", "tags": {"handler_name": "TimecodeHandler"}},
            {"index": 5, "codec_type": "subtitle", "codec_name": "mov_text"}
        ]}"#;
        assert_eq!(ProbeReport::parse(json).unwrap().subtitle_like(), vec![2, 3, 5]);
    }

    #[test]
    fn test_tags_and_disposition() {
        let json = br#"{"streams": [{"index": 2, "codec_name": "ass",
            "tags": {"LANGUAGE": "eng", "title": "Signs"},
            "disposition": {"default": 0, "forced": 1}}]}"#;
        let report = ProbeReport::parse(json).unwrap();
        let stream = &report.streams[0];
        assert_eq!(stream.tag("language"), Some("eng"));
        assert_eq!(stream.tag("title"), Some("Signs"));
        assert!(!stream.flag("default"));
        assert!(stream.flag("forced"));
        assert!(!stream.flag("missing"));
    }

    #[test]
    fn test_video_path_is_last_argument() {
        let args = subtitle_args(Path::new("/videos/a.mkv"));
        assert_eq!(args.last(), Some(&OsString::from("/videos/a.mkv")));
        assert!(args.contains(&OsString::from("s")));
        assert!(!all_streams_args(Path::new("a.mp4")).contains(&OsString::from("-select_streams")));
    }
}
