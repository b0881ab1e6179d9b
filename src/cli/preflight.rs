//! Pre-flight checks before expensive operations.
//!
//! Validates that required tools and configuration are available
//! before starting operations that would otherwise fail midway.

use crate::config::{IndexBackend, Settings};
use crate::error::{Result, VidragError};
use std::process::Command;

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Full ingestion needs yt-dlp, OpenAI and the index.
    Ingest,
    /// Indexing a caption file needs OpenAI and the index.
    Index,
    /// Answering questions needs OpenAI and the index.
    Ask,
    /// Reading stored transcripts needs nothing external.
    Transcripts,
}

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(operation: Operation, settings: &Settings) -> Result<()> {
    match operation {
        Operation::Ingest => {
            check_api_key()?;
            check_index_credentials(settings)?;
            check_tool("yt-dlp")?;
        }
        Operation::Index | Operation::Ask => {
            check_api_key()?;
            check_index_credentials(settings)?;
        }
        Operation::Transcripts => {}
    }
    Ok(())
}

/// Check if OpenAI API key is configured.
fn check_api_key() -> Result<()> {
    check_env("OPENAI_API_KEY", "sk-...")
}

/// Check the Pinecone key when the Pinecone provider is selected.
fn check_index_credentials(settings: &Settings) -> Result<()> {
    match settings.index.provider {
        IndexBackend::Pinecone => check_env(&settings.index.pinecone_api_key_env, "..."),
        IndexBackend::Sqlite | IndexBackend::Memory => Ok(()),
    }
}

fn check_env(name: &str, example: &str) -> Result<()> {
    match std::env::var(name) {
        Ok(key) if !key.is_empty() => Ok(()),
        Ok(_) => Err(VidragError::Config(format!(
            "{} is empty. Set it with: export {}='{}'",
            name, name, example
        ))),
        Err(_) => Err(VidragError::Config(format!(
            "{} not set. Set it with: export {}='{}'",
            name, name, example
        ))),
    }
}

/// Check if an external tool is available.
fn check_tool(name: &str) -> Result<()> {
    match Command::new(name).arg("--version").output() {
        Ok(output) if output.status.success() => Ok(()),
        Ok(_) => Err(VidragError::ToolNotFound(format!(
            "{} is installed but not working correctly",
            name
        ))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(VidragError::ToolNotFound(name.to_string()))
        }
        Err(e) => Err(VidragError::ToolNotFound(format!("{}: {}", name, e))),
    }
}
