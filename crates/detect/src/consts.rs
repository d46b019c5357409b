use regex::Regex;
use std::sync::LazyLock;

macro_rules! regex {
    ($name:ident, $regex:expr) => {
        pub(crate) static $name: LazyLock<Regex> = LazyLock::new(|| Regex::new($regex).unwrap());
    };
}

// Canonical ffmpeg banner line: `  Stream #0:2[0x3](eng): Subtitle: ass (default)`
regex!(DECLARATION_REGEX, r"(?m)^\s*Stream #\d+:(\d+)(?:\[0x[[:xdigit:]]+\])?(?:\([^)]*\))*: Subtitle: ");
// Same declaration, anywhere on the line and with any annotations before the colon.
regex!(ANNOTATED_REGEX, r"(?m)Stream #\d+:(\d+)[^:\n]*: Subtitle\b");
// Older builds and other tools: `Stream #0.2`, odd spacing, any case.
regex!(RELAXED_REGEX, r"(?im)stream\s*#\s*\d+\s*[:.]\s*(\d+)[^\n]*?\bsubtitles?\b");
// No "Subtitle" label at all, but a subtitle codec name on the stream line.
regex!(
    CODEC_REGEX,
    r"(?im)stream\s*#?\s*\d+\s*[:.]\s*(\d+)[^\n]*?\b(?:ass|ssa|subrip|srt|webvtt|mov_text|tx3g|dvd_subtitle|dvdsub|hdmv_pgs_subtitle|pgssub|dvb_subtitle|dvb_teletext|eia_608|c608)\b"
);
// Some containers declare timed text as an opaque data stream.
regex!(DATA_STREAM_REGEX, r"(?m)Stream #\d+:(\d+)[^:\n]*: Data: ");
