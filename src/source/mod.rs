//! Video sources.
//!
//! Resolves user input (URL or bare id) into the `Video` record that every
//! indexed chunk of that video refers to.

mod youtube;

pub use youtube::YoutubeSource;

use serde::{Deserialize, Serialize};

/// A video being ingested. Read-only once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Video {
    /// Source-assigned identifier (e.g. the YouTube video id).
    pub video_id: String,
    /// Video title.
    pub title: String,
    /// Thumbnail URL (empty when unknown).
    pub thumbnail_url: String,
    /// Canonical watch URL.
    pub watch_url: String,
}

impl Video {
    /// Create a video record.
    pub fn new(
        video_id: impl Into<String>,
        title: impl Into<String>,
        thumbnail_url: impl Into<String>,
        watch_url: impl Into<String>,
    ) -> Self {
        Self {
            video_id: video_id.into(),
            title: title.into(),
            thumbnail_url: thumbnail_url.into(),
            watch_url: watch_url.into(),
        }
    }

    /// Watch URL that starts playback at `seconds`.
    pub fn url_at(&self, seconds: u64) -> String {
        match url::Url::parse(&self.watch_url) {
            Ok(mut url) => {
                url.query_pairs_mut()
                    .append_pair("t", &format!("{}s", seconds));
                url.to_string()
            }
            Err(_) => format!("{}&t={}s", self.watch_url, seconds),
        }
    }
}
