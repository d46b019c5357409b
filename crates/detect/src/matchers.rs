//! Recognise subtitle stream declarations in free-text tool output.
//!
//! Each matcher is a pure `text -> indices` function. They are tried in order,
//! most specific first, and the first one to find anything wins. The
//! data-stream heuristic is kept out of the cascade and only consulted when
//! every matcher in it came up empty.

use crate::consts;
use regex::Regex;

/// A pure function from diagnostic text to stream indices.
pub type Matcher = fn(&str) -> Vec<u32>;

/// The ordered matcher cascade, most to least specific.
pub const CASCADE: [(&str, Matcher); 4] = [
    ("declaration", declaration),
    ("annotated", annotated),
    ("relaxed", relaxed),
    ("codec", codec),
];

/// Run the cascade, then the data-stream heuristic as a last resort.
///
/// Returned indices are unique and in order of first appearance.
pub fn match_subtitle_streams(text: &str) -> Vec<u32> {
    for (name, matcher) in CASCADE {
        let found = matcher(text);
        if !found.is_empty() {
            tracing::debug!(matcher = name, streams = ?found, "Subtitle streams matched in diagnostic output");
            return found;
        }
    }
    let found = data_streams(text);
    if !found.is_empty() {
        tracing::debug!(streams = ?found, "Treating data streams as subtitle streams");
    }
    found
}

pub fn declaration(text: &str) -> Vec<u32> {
    indices(&consts::DECLARATION_REGEX, text)
}

pub fn annotated(text: &str) -> Vec<u32> {
    indices(&consts::ANNOTATED_REGEX, text)
}

pub fn relaxed(text: &str) -> Vec<u32> {
    indices(&consts::RELAXED_REGEX, text)
}

pub fn codec(text: &str) -> Vec<u32> {
    indices(&consts::CODEC_REGEX, text)
}

/// Last-resort heuristic: streams declared as generic `Data`.
pub fn data_streams(text: &str) -> Vec<u32> {
    indices(&consts::DATA_STREAM_REGEX, text)
}

fn indices(regex: &Regex, text: &str) -> Vec<u32> {
    let mut found = Vec::new();
    for captures in regex.captures_iter(text) {
        if let Some(index) = captures.get(1).and_then(|m| m.as_str().parse::<u32>().ok())
            && !found.contains(&index)
        {
            found.push(index);
        }
    }
    found
}
