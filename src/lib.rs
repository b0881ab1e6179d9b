//! vidrag - Chat with your videos
//!
//! Turns spoken-word videos into a searchable knowledge base and answers
//! questions with links to the moment in the video where the answer is.
//!
//! # Overview
//!
//! vidrag allows you to:
//! - Transcribe YouTube videos into WebVTT captions
//! - Merge captions into time-bounded blocks and index them as vectors
//! - Ask questions and get grounded answers with timestamped references
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Configuration management
//! - `source` - Video lookup (YouTube)
//! - `audio` - Audio download and size checks
//! - `transcription` - Speech-to-text producing captions
//! - `captions` - Caption parsing and block merging
//! - `chunking` - Chunk ids, windows and upload batches
//! - `embedding` - Embedding generation
//! - `vector_store` - Vector index providers and the index gateway
//! - `rag` - Answer composition and conversation history
//! - `transcripts` - Stored transcript artifacts
//! - `orchestrator` - Pipeline coordination
//!
//! # Example
//!
//! ```rust,no_run
//! use vidrag::config::Settings;
//! use vidrag::orchestrator::Orchestrator;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Orchestrator::new(settings)?;
//!
//!     let report = orchestrator.ingest("dQw4w9WgXcQ").await?;
//!     println!("Indexed {} chunks", report.chunks);
//!
//!     let answer = orchestrator.answer("What is this video about?").await?;
//!     println!("{}", answer.answer);
//!
//!     Ok(())
//! }
//! ```

pub mod audio;
pub mod captions;
pub mod chunking;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod openai;
pub mod orchestrator;
pub mod rag;
pub mod retry;
pub mod source;
pub mod transcription;
pub mod transcripts;
pub mod vector_store;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{Result, VidragError};
