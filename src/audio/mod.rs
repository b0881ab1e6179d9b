//! Audio acquisition.
//!
//! Downloads the audio track of a video and enforces the upload size ceiling
//! of the speech-to-text service before any transcription happens.

mod downloader;

pub use downloader::download_audio;

use crate::error::{Result, VidragError};
use std::path::Path;
use tracing::info;

/// Return the size of `path`, or `SizeLimit` if it exceeds `max_bytes`.
pub fn check_audio_size(path: &Path, max_bytes: u64) -> Result<u64> {
    let size = std::fs::metadata(path)?.len();
    info!("Audio file size: {} bytes", size);

    if size > max_bytes {
        return Err(VidragError::SizeLimit {
            size,
            limit: max_bytes,
        });
    }
    Ok(size)
}
