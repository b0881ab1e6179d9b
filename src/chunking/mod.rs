//! Grouping merged caption blocks into indexable chunks.
//!
//! Blocks are partitioned into consecutive windows of `stride` blocks. Each
//! window becomes one [`ChunkRecord`] whose id is derived from the video id
//! and the window's start time, so re-running over the same blocks produces
//! the same ids and re-upserts overwrite instead of duplicating.

use crate::captions::MergedBlock;
use crate::embedding::Embedder;
use crate::error::{Result, VidragError};
use crate::source::Video;
use crate::vector_store::{EntryMetadata, IndexEntry, VectorIndex};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};

/// One indexable window of merged blocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkRecord {
    /// `<video_id>-t<initial_time>`.
    pub id: String,
    /// Space-joined text of the window.
    pub text: String,
    /// Start time of the first block in the window, in seconds.
    pub initial_time: u64,
}

/// Build the id of the chunk starting at `initial_time`.
pub fn chunk_id(video_id: &str, initial_time: u64) -> String {
    format!("{}-t{}", video_id, initial_time)
}

/// Partition `blocks` into non-overlapping windows of `stride` blocks.
///
/// The last window may be shorter. A stride of zero is treated as one.
pub fn build_chunks(video_id: &str, blocks: &[MergedBlock], stride: usize) -> Vec<ChunkRecord> {
    blocks
        .chunks(stride.max(1))
        .map(|window| {
            let initial_time = window[0].initial_time;
            let text = window
                .iter()
                .map(|b| b.text.as_str())
                .collect::<Vec<_>>()
                .join(" ")
                .replace('\n', " ");

            ChunkRecord {
                id: chunk_id(video_id, initial_time),
                text,
                initial_time,
            }
        })
        .collect()
}

/// Summary of one chunk-and-index run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexReport {
    /// Number of chunks built and upserted.
    pub chunks: usize,
    /// Size of every flushed batch, in flush order.
    pub batches: Vec<usize>,
}

/// Chunks merged blocks, embeds them in batches and upserts them.
pub struct ChunkBatcher {
    embedder: Arc<dyn Embedder>,
    stride: usize,
    upload_batch_size: usize,
}

impl ChunkBatcher {
    pub fn new(embedder: Arc<dyn Embedder>, stride: usize, upload_batch_size: usize) -> Self {
        Self {
            embedder,
            stride: stride.max(1),
            upload_batch_size: upload_batch_size.max(1),
        }
    }

    /// Chunk `blocks` and write them to `index`.
    ///
    /// Records are buffered and flushed once the buffer holds
    /// `upload_batch_size` of them; the remainder is flushed at the end. Each
    /// flush makes one embedding call and one upsert call. A failure aborts
    /// the run and leaves earlier batches in place.
    #[instrument(skip(self, index, video, blocks), fields(video_id = %video.video_id, blocks = blocks.len()))]
    pub async fn chunk_and_index(
        &self,
        index: &dyn VectorIndex,
        video: &Video,
        blocks: &[MergedBlock],
    ) -> Result<IndexReport> {
        let chunks = build_chunks(&video.video_id, blocks, self.stride);
        let mut report = IndexReport {
            chunks: chunks.len(),
            batches: Vec::new(),
        };

        let mut buffer: Vec<ChunkRecord> = Vec::with_capacity(self.upload_batch_size);
        for chunk in chunks {
            buffer.push(chunk);
            if buffer.len() >= self.upload_batch_size {
                let flushed = self.flush(index, video, &buffer).await?;
                report.batches.push(flushed);
                buffer.clear();
            }
        }

        if !buffer.is_empty() {
            let flushed = self.flush(index, video, &buffer).await?;
            report.batches.push(flushed);
        }

        info!(
            "Indexed {} chunks for {} in {} batches",
            report.chunks,
            video.video_id,
            report.batches.len()
        );
        Ok(report)
    }

    async fn flush(&self, index: &dyn VectorIndex, video: &Video, batch: &[ChunkRecord]) -> Result<usize> {
        let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
        let vectors = self.embedder.embed_batch(&texts).await?;

        if vectors.len() != batch.len() {
            return Err(VidragError::Embedding(format!(
                "Received {} embeddings for {} chunks",
                vectors.len(),
                batch.len()
            )));
        }

        let entries: Vec<IndexEntry> = batch
            .iter()
            .zip(vectors)
            .map(|(chunk, vector)| IndexEntry {
                id: chunk.id.clone(),
                vector,
                metadata: EntryMetadata {
                    initial_time: chunk.initial_time,
                    title: video.title.clone(),
                    thumbnail: video.thumbnail_url.clone(),
                    video_url: video.url_at(chunk.initial_time),
                    text: chunk.text.clone(),
                },
            })
            .collect();

        index.upsert(&entries).await?;
        info!("Upserted batch of {} chunks", entries.len());
        Ok(entries.len())
    }
}
