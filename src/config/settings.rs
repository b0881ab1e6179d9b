//! Configuration settings for vidrag.

use crate::vector_store::Metric;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub ingestion: IngestionSettings,
    pub transcription: TranscriptionSettings,
    pub embedding: EmbeddingSettings,
    pub index: IndexSettings,
    pub rag: RagSettings,
    pub service: ServiceSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data (transcripts, local index).
    pub data_dir: String,
    /// Directory for temporary files.
    pub temp_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.vidrag".to_string(),
            temp_dir: "/tmp/vidrag".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Caption merging, chunking and upload batching.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestionSettings {
    /// Minimum duration of a merged caption block, in seconds.
    pub merge_seconds: u64,
    /// Number of merged blocks per indexed chunk.
    pub stride: usize,
    /// Number of chunks embedded and upserted per call.
    pub upload_batch_size: usize,
    /// Hard ceiling on the downloaded audio size, in bytes.
    pub max_audio_bytes: u64,
}

impl Default for IngestionSettings {
    fn default() -> Self {
        Self {
            merge_seconds: 8,
            stride: 3,
            upload_batch_size: 64,
            max_audio_bytes: 24 * 1024 * 1024,
        }
    }
}

/// Speech-to-text settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionSettings {
    /// Whisper model to use.
    pub model: String,
}

impl Default for TranscriptionSettings {
    fn default() -> Self {
        Self {
            model: "whisper-1".to_string(),
        }
    }
}

/// Embedding generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Embedding model to use.
    pub model: String,
    /// Embedding dimensions.
    pub dimensions: u32,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            model: "text-embedding-3-small".to_string(),
            dimensions: 1536,
        }
    }
}

/// Vector index backend.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IndexBackend {
    /// Hosted Pinecone index.
    Pinecone,
    /// Local SQLite file.
    #[default]
    Sqlite,
    /// In-process, lost on exit.
    Memory,
}

impl std::str::FromStr for IndexBackend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pinecone" => Ok(IndexBackend::Pinecone),
            "sqlite" => Ok(IndexBackend::Sqlite),
            "memory" => Ok(IndexBackend::Memory),
            _ => Err(format!("Unknown index provider: {}", s)),
        }
    }
}

impl std::fmt::Display for IndexBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IndexBackend::Pinecone => write!(f, "pinecone"),
            IndexBackend::Sqlite => write!(f, "sqlite"),
            IndexBackend::Memory => write!(f, "memory"),
        }
    }
}

/// Vector index settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexSettings {
    /// Backend holding the index.
    pub provider: IndexBackend,
    /// Index name, created on first use if absent.
    pub name: String,
    /// Vector dimension of a newly created index.
    pub dimension: usize,
    /// Similarity metric of a newly created index.
    pub metric: Metric,
    /// Serverless cloud for Pinecone index creation.
    pub cloud: String,
    /// Serverless region for Pinecone index creation.
    pub region: String,
    /// Path to the SQLite database (sqlite provider).
    pub sqlite_path: String,
    /// Environment variable holding the Pinecone API key.
    pub pinecone_api_key_env: String,
    /// Pinecone control plane URL.
    pub pinecone_control_url: String,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            provider: IndexBackend::Sqlite,
            name: "docker-genai".to_string(),
            dimension: 1536,
            metric: Metric::Cosine,
            cloud: "aws".to_string(),
            region: "us-west-2".to_string(),
            sqlite_path: "~/.vidrag/index.db".to_string(),
            pinecone_api_key_env: "PINECONE_API_KEY".to_string(),
            pinecone_control_url: "https://api.pinecone.io".to_string(),
        }
    }
}

/// Retrieval-augmented answering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagSettings {
    /// Chat model for answer generation.
    pub model: String,
    /// Number of nearest chunks supplied as context.
    pub top_k: usize,
    /// Number of recent conversation turns shown to the user.
    pub history_display_turns: usize,
}

impl Default for RagSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4-turbo-preview".to_string(),
            top_k: 5,
            history_display_turns: 3,
        }
    }
}

/// External service call behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// HTTP timeout for embedding, chat and vector store calls.
    pub timeout_secs: u64,
    /// Retries after a failed service call (0 = fail on first error).
    pub max_retries: usize,
    /// Base backoff between retries, doubled per attempt.
    pub retry_backoff_ms: u64,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            timeout_secs: crate::openai::DEFAULT_TIMEOUT_SECS,
            max_retries: 0,
            retry_backoff_ms: 500,
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            settings.validate()?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> crate::error::Result<()> {
        use crate::error::VidragError;

        if self.ingestion.stride == 0 {
            return Err(VidragError::Config("ingestion.stride must be at least 1".into()));
        }
        if self.ingestion.upload_batch_size == 0 {
            return Err(VidragError::Config(
                "ingestion.upload_batch_size must be at least 1".into(),
            ));
        }
        if self.rag.top_k == 0 {
            return Err(VidragError::Config("rag.top_k must be at least 1".into()));
        }
        if self.embedding.dimensions as usize != self.index.dimension {
            return Err(VidragError::Config(format!(
                "embedding.dimensions ({}) does not match index.dimension ({})",
                self.embedding.dimensions, self.index.dimension
            )));
        }
        Ok(())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::VidragError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("vidrag")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Get the expanded temp directory path.
    pub fn temp_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.temp_dir)
    }

    /// Directory holding persisted transcript artifacts.
    pub fn transcripts_dir(&self) -> PathBuf {
        self.data_dir().join("transcripts")
    }

    /// Get the expanded SQLite database path.
    pub fn sqlite_path(&self) -> PathBuf {
        Self::expand_path(&self.index.sqlite_path)
    }
}
