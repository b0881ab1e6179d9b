//! Speech-to-text.
//!
//! The transcriber turns an audio file into a caption blob (WebVTT) that the
//! caption merger consumes.

mod whisper;

pub use whisper::WhisperTranscriber;

use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// Trait for transcription services.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe an audio file into WebVTT captions.
    async fn transcribe(&self, audio_path: &Path) -> Result<String>;
}
