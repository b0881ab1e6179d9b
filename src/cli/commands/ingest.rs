//! Ingest command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::error::VidragError;
use crate::orchestrator::{IngestReport, Orchestrator};
use anyhow::Result;

/// Run the ingest command.
pub async fn run_ingest(input: &str, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Ingest, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let orchestrator = Orchestrator::new(settings)?;
    let spinner = Output::spinner(&format!("Ingesting {}...", input));

    match orchestrator.ingest(input).await {
        Ok(report) => {
            spinner.finish_and_clear();
            print_report(&report);
            Ok(())
        }
        Err(e @ VidragError::SizeLimit { .. }) => {
            spinner.finish_and_clear();
            Output::warning(&format!("{}", e));
            Output::info("Try a shorter video.");
            Err(e.into())
        }
        Err(e) => {
            spinner.finish_and_clear();
            Output::error(&format!("Ingestion failed: {}", e));
            Err(e.into())
        }
    }
}

/// Print the outcome of an ingestion.
pub(crate) fn print_report(report: &IngestReport) {
    Output::success(&format!("Indexed '{}'", report.video.title));
    Output::kv("Video ID", &report.video.video_id);
    Output::kv("Blocks", &report.blocks.to_string());
    Output::kv("Chunks", &report.chunks.to_string());
    Output::kv("Batches", &report.batches.len().to_string());
}
