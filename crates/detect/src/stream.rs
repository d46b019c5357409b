use crate::probe::ProbeStream;
use std::fmt;

/// One subtitle track inside a video container.
///
/// Only `index` is needed to extract the track; everything else is
/// best-effort metadata for display and is empty when it came from the
/// free-text fallback.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubtitleStream {
    /// Container-absolute stream index, as used by `-map 0:<index>`.
    pub index: u32,
    pub codec: Option<String>,
    pub language: Option<String>,
    pub title: Option<String>,
    pub default: bool,
    pub forced: bool,
}

impl SubtitleStream {
    pub fn from_index(index: u32) -> Self {
        Self { index, ..Self::default() }
    }

    pub(crate) fn from_probe(stream: &ProbeStream) -> Self {
        Self {
            index: stream.index,
            codec: stream.codec_name.clone(),
            language: stream.tag("language").map(str::to_string),
            title: stream.tag("title").map(str::to_string),
            default: stream.flag("default"),
            forced: stream.flag("forced"),
        }
    }
}

impl fmt::Display for SubtitleStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.index)?;
        if let Some(codec) = &self.codec {
            write!(f, " {codec}")?;
        }
        if let Some(language) = &self.language {
            write!(f, " [{language}]")?;
        }
        if let Some(title) = &self.title {
            write!(f, " \"{title}\"")?;
        }
        if self.default {
            f.write_str(" (default)")?;
        }
        if self.forced {
            f.write_str(" (forced)")?;
        }
        Ok(())
    }
}
