use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tokio::fs::{self, DirEntry};
use tracing::instrument;

/// A file under the library root whose extension is on the allow-list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoFile {
    pub path: PathBuf,
    /// Lower-cased, without the leading dot.
    pub extension: String,
}

impl VideoFile {
    fn from_path(path: PathBuf, extensions: &[String]) -> Option<Self> {
        let extension = path.extension().and_then(OsStr::to_str)?.to_ascii_lowercase();
        extensions
            .iter()
            .any(|allowed| allowed.trim_start_matches('.').eq_ignore_ascii_case(&extension))
            .then_some(Self { path, extension })
    }
}

enum WalkEntry {
    File(PathBuf),
    Descend(PathBuf),
    Skip,
}

async fn classify(entry: &DirEntry) -> std::io::Result<WalkEntry> {
    let path = entry.path();
    let file_type = entry.file_type().await?;
    if file_type.is_dir() {
        return Ok(WalkEntry::Descend(path));
    }
    if file_type.is_file() {
        return Ok(WalkEntry::File(path));
    }
    // Linked files are kept; linked directories are never descended, so a
    // link back to an ancestor cannot loop or yield the same video twice.
    if file_type.is_symlink() && fs::metadata(&path).await?.is_file() {
        return Ok(WalkEntry::File(path));
    }
    Ok(WalkEntry::Skip)
}

/// Every video under `root`, depth first.
///
/// Entries of each directory are visited in name order, so the result is
/// stable between runs. Directories that cannot be read are logged and
/// skipped; a root that does not exist yields nothing.
#[instrument(skip(extensions), fields(root = %root.display()))]
pub async fn discover(root: &Path, extensions: &[String]) -> Vec<VideoFile> {
    let mut videos = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(current) = stack.pop() {
        let mut entries = match fs::read_dir(&current).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => {
                tracing::warn!(error = %e, path = %current.display(), "Skipping unreadable directory");
                continue;
            },
        };
        let mut listed = Vec::new();
        loop {
            match entries.next_entry().await {
                Ok(Some(entry)) => listed.push(entry),
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(error = %e, path = %current.display(), "Directory listing interrupted");
                    break;
                },
            }
        }
        listed.sort_by_key(DirEntry::path);

        let mut subdirs = Vec::new();
        for entry in listed {
            match classify(&entry).await {
                Ok(WalkEntry::File(path)) => videos.extend(VideoFile::from_path(path, extensions)),
                Ok(WalkEntry::Descend(dir)) => subdirs.push(dir),
                Ok(WalkEntry::Skip) => {},
                // Most likely a broken symlink.
                Err(e) => tracing::debug!(error = %e, "Skipping entry"),
            }
        }
        // Reversed so the alphabetically first directory is popped first.
        stack.extend(subdirs.into_iter().rev());
    }
    tracing::debug!(videos = videos.len(), "Discovery complete");
    videos
}
