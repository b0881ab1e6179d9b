//! Error types for vidrag.

use thiserror::Error;

/// Library-level error type for vidrag operations.
#[derive(Error, Debug)]
pub enum VidragError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Caption format error on line {line}: {message}")]
    CaptionFormat { line: usize, message: String },

    #[error("Media too large: {size} bytes exceeds the {limit} byte limit")]
    SizeLimit { size: u64, limit: u64 },

    #[error("Video source error: {0}")]
    VideoSource(String),

    #[error("Audio download failed: {0}")]
    AudioDownload(String),

    #[error("Transcription failed: {0}")]
    Transcription(String),

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Chat completion failed: {0}")]
    Chat(String),

    #[error("Vector store error: {0}")]
    VectorStore(String),

    #[error("Index provisioning failed: {0}")]
    IndexProvisioning(String),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),

    #[error("Transcript not found: {0}")]
    TranscriptNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("External tool not found: {0}. Please install it and ensure it's in your PATH.")]
    ToolNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl VidragError {
    /// Whether the error came from a call to an external service.
    ///
    /// Only these are candidates for a configured retry.
    pub fn is_service_error(&self) -> bool {
        matches!(
            self,
            VidragError::Embedding(_)
                | VidragError::Chat(_)
                | VidragError::VectorStore(_)
                | VidragError::OpenAI(_)
                | VidragError::Http(_)
        )
    }
}

/// Result type alias for vidrag operations.
pub type Result<T> = std::result::Result<T, VidragError>;
