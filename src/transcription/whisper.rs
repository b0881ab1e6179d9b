//! OpenAI Whisper transcription.

use super::Transcriber;
use crate::error::{Result, VidragError};
use crate::retry::RetryPolicy;
use async_openai::config::OpenAIConfig;
use async_openai::types::{AudioInput, AudioResponseFormat, CreateTranscriptionRequestArgs};
use async_trait::async_trait;
use std::path::Path;
use tracing::{debug, info, instrument};

/// Whisper-based transcriber producing WebVTT captions.
pub struct WhisperTranscriber {
    client: async_openai::Client<OpenAIConfig>,
    model: String,
    retry: RetryPolicy,
}

impl WhisperTranscriber {
    /// Create a transcriber for `model` using an existing client.
    pub fn new(client: async_openai::Client<OpenAIConfig>, model: &str) -> Self {
        Self {
            client,
            model: model.to_string(),
            retry: RetryPolicy::none(),
        }
    }

    /// Set the retry policy for the transcription call.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn request_vtt(&self, file_name: &str, bytes: Vec<u8>) -> Result<String> {
        let request = CreateTranscriptionRequestArgs::default()
            .file(AudioInput::from_vec_u8(file_name.to_string(), bytes))
            .model(&self.model)
            .response_format(AudioResponseFormat::Vtt)
            .build()
            .map_err(|e| VidragError::Transcription(format!("Failed to build request: {}", e)))?;

        let raw = self
            .client
            .audio()
            .transcribe_raw(request)
            .await
            .map_err(|e| VidragError::OpenAI(format!("Whisper API error: {}", e)))?;

        String::from_utf8(raw.to_vec())
            .map_err(|e| VidragError::Transcription(format!("Captions are not valid UTF-8: {}", e)))
    }
}

#[async_trait]
impl Transcriber for WhisperTranscriber {
    #[instrument(skip(self), fields(audio_path = %audio_path.display()))]
    async fn transcribe(&self, audio_path: &Path) -> Result<String> {
        let bytes = tokio::fs::read(audio_path).await?;
        let file_name = audio_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio.m4a")
            .to_string();

        debug!("Uploading {} bytes to {}", bytes.len(), self.model);

        let captions = self
            .retry
            .run("transcription", || self.request_vtt(&file_name, bytes.clone()))
            .await?;

        info!("Transcription done ({} bytes of captions)", captions.len());
        Ok(captions)
    }
}
