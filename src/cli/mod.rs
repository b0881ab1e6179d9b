//! CLI module for vidrag.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// vidrag - Chat with your videos
///
/// Transcribes videos, indexes their transcripts as vectors and answers
/// questions with links to the exact moment in the video.
#[derive(Parser, Debug)]
#[command(name = "vidrag")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download, transcribe and index a YouTube video
    Ingest {
        /// YouTube URL or video ID
        input: String,
    },

    /// Index an existing caption file (WebVTT) without downloading
    Index {
        /// Path to the caption file
        captions: String,

        /// Video ID used for chunk ids and the stored transcript
        #[arg(long)]
        video_id: String,

        /// Video title
        #[arg(long)]
        title: String,

        /// Thumbnail URL
        #[arg(long, default_value = "")]
        thumbnail: String,

        /// Watch URL (defaults to the YouTube watch URL of the video ID)
        #[arg(long)]
        url: Option<String>,
    },

    /// Ask a question and get an answer from your video library
    Ask {
        /// The question to ask
        question: String,

        /// Chat model to use for the answer
        #[arg(short, long)]
        model: Option<String>,

        /// Number of transcript chunks to retrieve
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },

    /// Start an interactive chat session
    Chat {
        /// Chat model to use
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Print a stored transcript
    Transcript {
        /// Video ID
        video_id: String,

        /// Output file (stdout if not specified)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// List stored transcripts
    Transcripts,

    /// Start HTTP API server
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,
}
