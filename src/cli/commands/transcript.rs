//! Transcript artifact commands.

use crate::cli::Output;
use crate::config::Settings;
use crate::error::VidragError;
use crate::transcripts::TranscriptStore;
use anyhow::Result;

/// Print or save the stored transcript of a video.
pub fn run_transcript(video_id: &str, output: Option<String>, settings: Settings) -> Result<()> {
    let store = TranscriptStore::new(settings.transcripts_dir());

    let captions = match store.load(video_id) {
        Ok(captions) => captions,
        Err(e @ VidragError::TranscriptNotFound(_)) => {
            Output::error(&format!("No transcript stored for video ID: {}", video_id));
            Output::info("Use 'vidrag transcripts' to see stored transcripts.");
            return Err(e.into());
        }
        Err(e) => return Err(e.into()),
    };

    match output {
        Some(path) => {
            let path = Settings::expand_path(&path);
            std::fs::write(&path, captions)?;
            Output::success(&format!("Transcript written to {:?}", path));
        }
        None => print!("{}", captions),
    }

    Ok(())
}

/// List stored transcripts.
pub fn run_transcripts(settings: Settings) -> Result<()> {
    let store = TranscriptStore::new(settings.transcripts_dir());
    let transcripts = store.list()?;

    if transcripts.is_empty() {
        Output::info("No transcripts stored yet.");
        Output::info("Use 'vidrag ingest <url>' to add a video.");
        return Ok(());
    }

    Output::header(&format!("Stored transcripts ({})", transcripts.len()));
    for transcript in &transcripts {
        let saved_at = transcript
            .saved_at
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string());
        Output::transcript_info(&transcript.video_id, transcript.size_bytes, saved_at.as_deref());
    }

    Ok(())
}
