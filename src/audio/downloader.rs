//! Audio download via yt-dlp.

use crate::error::{Result, VidragError};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{info, instrument};

/// Downloads the audio track of `url` into `output_dir`.
///
/// yt-dlp picks the container; the returned path is whatever file it produced.
#[instrument(skip(output_dir), fields(video_id = %video_id))]
pub async fn download_audio(url: &str, video_id: &str, output_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)?;

    info!("Downloading audio from {}", url);

    let template = output_dir.join(format!("{}.%(ext)s", video_id));

    let result = Command::new("yt-dlp")
        .arg("--format").arg("bestaudio")
        .arg("--extract-audio")
        .arg("--output").arg(&template)
        .arg("--no-playlist")
        .arg("--quiet")
        .arg("--no-warnings")
        .arg(url)
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await;

    let output = match result {
        Ok(o) => o,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(VidragError::ToolNotFound("yt-dlp".into()));
        }
        Err(e) => {
            return Err(VidragError::AudioDownload(format!("yt-dlp execution failed: {e}")));
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(VidragError::AudioDownload(format!("yt-dlp failed: {stderr}")));
    }

    find_audio_file(output_dir, video_id)
}

/// Locates a downloaded audio file by video ID.
fn find_audio_file(dir: &Path, video_id: &str) -> Result<PathBuf> {
    for ext in &["m4a", "webm", "opus", "mp3", "ogg", "mp4"] {
        let candidate = dir.join(format!("{}.{}", video_id, ext));
        if candidate.exists() {
            return Ok(candidate);
        }
    }

    let entries = std::fs::read_dir(dir)
        .map_err(|e| VidragError::AudioDownload(format!("Cannot read directory: {e}")))?;

    for entry in entries.flatten() {
        let name = entry.file_name();
        if name.to_string_lossy().starts_with(video_id) {
            return Ok(entry.path());
        }
    }

    Err(VidragError::AudioDownload("Audio file not found after download".into()))
}
