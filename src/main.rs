//! vidrag CLI entry point.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use vidrag::cli::{commands, Cli, Commands};
use vidrag::config::Settings;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("vidrag={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Load configuration
    let settings = match &cli.config {
        Some(path) => Settings::load_from(Some(&Settings::expand_path(path)))?,
        None => Settings::load()?,
    };

    // Ensure data directories exist
    std::fs::create_dir_all(settings.data_dir())?;
    std::fs::create_dir_all(settings.temp_dir())?;

    // Execute command
    match &cli.command {
        Commands::Ingest { input } => {
            commands::run_ingest(input, settings).await?;
        }

        Commands::Index {
            captions,
            video_id,
            title,
            thumbnail,
            url,
        } => {
            commands::run_index(captions, video_id, title, thumbnail, url.clone(), settings).await?;
        }

        Commands::Ask {
            question,
            model,
            top_k,
        } => {
            commands::run_ask(question, model.clone(), *top_k, settings).await?;
        }

        Commands::Chat { model } => {
            commands::run_chat(model.clone(), settings).await?;
        }

        Commands::Transcript { video_id, output } => {
            commands::run_transcript(video_id, output.clone(), settings)?;
        }

        Commands::Transcripts => {
            commands::run_transcripts(settings)?;
        }

        Commands::Serve { host, port } => {
            commands::run_serve(host, *port, settings).await?;
        }

        Commands::Config { action } => {
            commands::run_config(action, cli.config.as_deref(), settings)?;
        }
    }

    Ok(())
}
