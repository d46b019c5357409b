use std::path::Path;

/// Extensions of the MP4/QuickTime family.
const UNDER_REPORTING: [&str; 3] = ["mp4", "m4v", "mov"];

/// Whether `video` belongs to a container family whose timed-text tracks the
/// subtitle-only probe can miss.
///
/// MP4 and QuickTime files frequently store subtitles as `tx3g`/`mov_text`
/// or CEA-608 tracks which ffprobe reports as `data` streams, so
/// `-select_streams s` returns nothing. For these files an empty answer from
/// both strategies is re-checked by reading every stream and classifying
/// timed-text tracks by codec and handler name. No other container gets this
/// treatment.
pub fn under_reports_subtitles(video: &Path) -> bool {
    video
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| UNDER_REPORTING.iter().any(|u| e.eq_ignore_ascii_case(u)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("movie.mp4", true)]
    #[case("movie.M4V", true)]
    #[case("clip.mov", true)]
    #[case("show.mkv", false)]
    #[case("old.avi", false)]
    #[case("mp4", false)]
    fn test_under_reports_subtitles(#[case] path: &str, #[case] expected: bool) {
        assert_eq!(under_reports_subtitles(Path::new(path)), expected);
    }
}
