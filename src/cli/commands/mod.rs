//! CLI command implementations.

mod ask;
mod chat;
mod config;
mod index;
mod ingest;
mod serve;
mod transcript;

pub use ask::run_ask;
pub use chat::run_chat;
pub use config::run_config;
pub use index::run_index;
pub use ingest::run_ingest;
pub use serve::run_serve;
pub use transcript::{run_transcript, run_transcripts};
