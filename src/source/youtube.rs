//! YouTube video source.

use super::Video;
use crate::error::{Result, VidragError};
use regex::Regex;
use tracing::{debug, instrument};

/// YouTube video source backed by `yt-dlp`.
pub struct YoutubeSource {
    video_id_regex: Regex,
}

impl YoutubeSource {
    pub fn new() -> Self {
        // Matches various YouTube URL formats and bare video IDs
        let video_id_regex = Regex::new(
            r"(?x)
            (?:
                (?:https?://)?
                (?:www\.|m\.)?
                (?:youtube\.com/watch\?(?:.*&)?v=|youtu\.be/|youtube\.com/embed/|youtube\.com/shorts/|youtube\.com/v/)
                ([a-zA-Z0-9_-]{11})
            )
            |
            ^([a-zA-Z0-9_-]{11})$
        ",
        )
        .expect("Invalid regex");

        Self { video_id_regex }
    }

    /// Extract video ID from a YouTube URL or bare ID.
    pub fn extract_video_id(&self, input: &str) -> Option<String> {
        let caps = self.video_id_regex.captures(input.trim())?;

        caps.get(1)
            .or_else(|| caps.get(2))
            .map(|m| m.as_str().to_string())
    }

    /// Canonical watch URL for a video id.
    pub fn watch_url(video_id: &str) -> String {
        format!("https://www.youtube.com/watch?v={}", video_id)
    }

    /// Resolve input into a `Video`, fetching title and thumbnail via yt-dlp.
    #[instrument(skip(self))]
    pub async fn fetch_video(&self, input: &str) -> Result<Video> {
        let video_id = self.extract_video_id(input).ok_or_else(|| {
            VidragError::InvalidInput(format!("Please enter a valid YouTube URL: {}", input))
        })?;
        let url = Self::watch_url(&video_id);

        let output = tokio::process::Command::new("yt-dlp")
            .args([
                "--dump-json",
                "--no-download",
                "--no-warnings",
                "--no-playlist",
                &url,
            ])
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    VidragError::ToolNotFound("yt-dlp".to_string())
                } else {
                    VidragError::VideoSource(format!("Failed to run yt-dlp: {}", e))
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(VidragError::VideoSource(format!(
                "Video {} not found or unavailable: {}",
                video_id, stderr
            )));
        }

        let json: serde_json::Value = serde_json::from_slice(&output.stdout).map_err(|e| {
            VidragError::VideoSource(format!("Failed to parse yt-dlp output: {}", e))
        })?;

        let video = video_from_json(&video_id, &url, &json);
        debug!("Resolved video '{}'", video.title);
        Ok(video)
    }
}

impl Default for YoutubeSource {
    fn default() -> Self {
        Self::new()
    }
}

/// Build a `Video` from yt-dlp `--dump-json` output.
fn video_from_json(video_id: &str, url: &str, json: &serde_json::Value) -> Video {
    let title = json["title"].as_str().unwrap_or("Unknown Title");
    let thumbnail = json["thumbnail"].as_str().unwrap_or_default();
    Video::new(video_id, title, thumbnail, url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_video_id() {
        let source = YoutubeSource::new();

        assert_eq!(
            source.extract_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
        assert_eq!(
            source.extract_video_id("https://youtu.be/dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
        assert_eq!(
            source.extract_video_id("https://www.youtube.com/watch?feature=share&v=dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
        assert_eq!(
            source.extract_video_id("dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );

        assert_eq!(source.extract_video_id("not-a-video-id"), None);
        assert_eq!(source.extract_video_id(""), None);
    }

    #[test]
    fn test_video_from_json() {
        let json = serde_json::json!({
            "title": "Getting started with Docker",
            "thumbnail": "https://i.ytimg.com/vi/8CY2aq3tcXA/hq.jpg",
        });
        let url = YoutubeSource::watch_url("8CY2aq3tcXA");
        let video = video_from_json("8CY2aq3tcXA", &url, &json);

        assert_eq!(video.title, "Getting started with Docker");
        assert_eq!(video.thumbnail_url, "https://i.ytimg.com/vi/8CY2aq3tcXA/hq.jpg");
        assert_eq!(video.watch_url, "https://www.youtube.com/watch?v=8CY2aq3tcXA");
    }

    #[test]
    fn test_video_from_sparse_json() {
        let video = video_from_json("abc", "u", &serde_json::json!({}));
        assert_eq!(video.title, "Unknown Title");
        assert!(video.thumbnail_url.is_empty());
    }
}
