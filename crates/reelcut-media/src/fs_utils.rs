//! Filesystem helpers for pipeline artifacts.

use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

use crate::error::MediaResult;

/// Create `dir` and its parents if missing.
pub async fn ensure_dir(dir: impl AsRef<Path>) -> MediaResult<()> {
    let dir = dir.as_ref();
    if !dir.exists() {
        fs::create_dir_all(dir).await?;
    }
    Ok(())
}

/// Where the extracted audio of `video` goes: `<basename>.mp3` next to it.
pub fn audio_path_for(video: &Path) -> PathBuf {
    let audio = video.with_extension("mp3");
    if audio == video {
        video.with_extension("audio.mp3")
    } else {
        audio
    }
}

/// Remove a file, logging instead of failing.
///
/// Returns `true` when the file is gone afterwards (including when it never existed).
pub async fn remove_file_best_effort(path: impl AsRef<Path>) -> bool {
    let path = path.as_ref();
    match fs::remove_file(path).await {
        Ok(()) => {
            debug!("Removed {}", path.display());
            true
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => true,
        Err(e) => {
            warn!("Failed to remove {}: {}", path.display(), e);
            false
        }
    }
}
