//! Plain-text transcript artifacts, one file per ingested video.

use crate::error::{Result, VidragError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// A stored transcript as listed by [`TranscriptStore::list`].
#[derive(Debug, Clone, Serialize)]
pub struct StoredTranscript {
    pub video_id: String,
    pub path: PathBuf,
    pub size_bytes: u64,
    pub saved_at: Option<DateTime<Utc>>,
}

/// Directory of `<video_id>.txt` files holding the raw captions.
#[derive(Debug, Clone)]
pub struct TranscriptStore {
    root: PathBuf,
}

impl TranscriptStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the artifact for `video_id`.
    ///
    /// Ids containing path separators or starting with a dot are rejected.
    pub fn path_for(&self, video_id: &str) -> Result<PathBuf> {
        if video_id.is_empty()
            || video_id.starts_with('.')
            || video_id.contains(['/', '\\'])
        {
            return Err(VidragError::InvalidInput(format!(
                "Invalid video id: {:?}",
                video_id
            )));
        }
        Ok(self.root.join(format!("{}.txt", video_id)))
    }

    /// Write the captions of `video_id`, replacing any earlier artifact.
    pub fn save(&self, video_id: &str, captions: &str) -> Result<PathBuf> {
        let path = self.path_for(video_id)?;
        std::fs::create_dir_all(&self.root)?;
        std::fs::write(&path, captions)?;
        info!("Saved transcript to {:?}", path);
        Ok(path)
    }

    /// Read the captions of `video_id`.
    pub fn load(&self, video_id: &str) -> Result<String> {
        let path = self.path_for(video_id)?;
        match std::fs::read_to_string(&path) {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(VidragError::TranscriptNotFound(video_id.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// All stored artifacts, sorted by video id.
    pub fn list(&self) -> Result<Vec<StoredTranscript>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let mut transcripts = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("txt") {
                continue;
            }
            let Some(video_id) = path.file_stem().and_then(|s| s.to_str()).map(String::from) else {
                continue;
            };

            let metadata = std::fs::metadata(&path)?;
            transcripts.push(StoredTranscript {
                video_id,
                size_bytes: metadata.len(),
                saved_at: metadata.modified().ok().map(DateTime::<Utc>::from),
                path,
            });
        }

        transcripts.sort_by(|a, b| a.video_id.cmp(&b.video_id));
        debug!("Found {} stored transcripts", transcripts.len());
        Ok(transcripts)
    }
}
