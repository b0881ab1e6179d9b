//! Index command: ingest an existing caption file.

use super::ingest::print_report;
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use crate::source::{Video, YoutubeSource};
use anyhow::{Context, Result};

/// Run the index command.
pub async fn run_index(
    captions_path: &str,
    video_id: &str,
    title: &str,
    thumbnail: &str,
    url: Option<String>,
    settings: Settings,
) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Index, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let path = Settings::expand_path(captions_path);
    let captions = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read caption file {:?}", path))?;

    let watch_url = url.unwrap_or_else(|| YoutubeSource::watch_url(video_id));
    let video = Video::new(video_id, title, thumbnail, watch_url);

    let orchestrator = Orchestrator::new(settings)?;
    let spinner = Output::spinner("Chunking and indexing captions...");
    let result = orchestrator.ingest_captions(&video, &captions).await;
    spinner.finish_and_clear();

    match result {
        Ok(report) => {
            print_report(&report);
            Ok(())
        }
        Err(e) => {
            Output::error(&format!("Indexing failed: {}", e));
            Err(e.into())
        }
    }
}
