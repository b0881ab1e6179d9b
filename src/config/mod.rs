//! Configuration module for vidrag.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{Prompts, RagPrompts};
pub use settings::{
    EmbeddingSettings, GeneralSettings, IndexBackend, IndexSettings, IngestionSettings,
    PromptSettings, RagSettings, ServiceSettings, Settings, TranscriptionSettings,
};
