//! Vector store abstraction for vidrag.
//!
//! A store is split into a control plane (`IndexProvider`: list and create
//! named indexes) and a data plane (`VectorIndex`: upsert and query one
//! index). `IndexGateway` sits in front of a provider and hands out memoized
//! index handles, creating the index on first use.

mod gateway;
mod memory;
mod pinecone;
mod sqlite;

pub use gateway::IndexGateway;
pub use memory::MemoryProvider;
pub use pinecone::PineconeProvider;
pub use sqlite::SqliteProvider;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Payload stored next to each vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryMetadata {
    /// Chunk start, in seconds.
    pub initial_time: u64,
    /// Source video title.
    pub title: String,
    /// Source video thumbnail.
    pub thumbnail: String,
    /// Watch URL that starts playback at `initial_time`.
    pub video_url: String,
    /// Chunk text.
    pub text: String,
}

/// A vector with its id and metadata. Upserting an existing id overwrites it.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    pub id: String,
    pub vector: Vec<f32>,
    pub metadata: EntryMetadata,
}

/// A nearest-neighbour result.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalMatch {
    pub id: String,
    /// Similarity score (higher is better).
    pub score: f32,
    /// Present when the query asked for metadata.
    pub metadata: Option<EntryMetadata>,
}

/// Similarity metric of an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    #[default]
    Cosine,
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Metric::Cosine => write!(f, "cosine"),
        }
    }
}

/// Parameters for creating an index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    pub name: String,
    pub dimension: usize,
    pub metric: Metric,
    /// Serverless placement, used by hosted providers.
    pub cloud: String,
    pub region: String,
}

/// Data plane of a single index.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Name of the index.
    fn name(&self) -> &str;

    /// Insert or overwrite entries by id. Returns the number written.
    async fn upsert(&self, entries: &[IndexEntry]) -> Result<usize>;

    /// Return up to `top_k` matches ordered by descending score.
    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        include_metadata: bool,
    ) -> Result<Vec<RetrievalMatch>>;

    /// Number of stored entries.
    async fn count(&self) -> Result<usize>;
}

/// Control plane of a vector store.
#[async_trait]
pub trait IndexProvider: Send + Sync {
    /// Names of existing indexes.
    async fn list_indexes(&self) -> Result<Vec<String>>;

    /// Create a new index.
    async fn create_index(&self, spec: &IndexSpec) -> Result<()>;

    /// Open a handle on an existing index.
    async fn open_index(&self, name: &str) -> Result<Arc<dyn VectorIndex>>;
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Score `entries` against `query` and keep the best `top_k`.
pub(crate) fn rank_entries<'a, I>(
    query: &[f32],
    entries: I,
    top_k: usize,
    include_metadata: bool,
) -> Vec<RetrievalMatch>
where
    I: IntoIterator<Item = &'a IndexEntry>,
{
    let mut scored: Vec<(f32, &IndexEntry)> = entries
        .into_iter()
        .map(|entry| (cosine_similarity(query, &entry.vector), entry))
        .collect();

    // Ties broken by id so results are stable across runs.
    scored.sort_by(|a, b| {
        b.0.partial_cmp(&a.0)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.1.id.cmp(&b.1.id))
    });
    scored.truncate(top_k);

    scored
        .into_iter()
        .map(|(score, entry)| RetrievalMatch {
            id: entry.id.clone(),
            score,
            metadata: include_metadata.then(|| entry.metadata.clone()),
        })
        .collect()
}

/// Reject vectors that do not match the index dimension.
pub(crate) fn check_dimension(index: &str, expected: usize, vector: &[f32]) -> Result<()> {
    if vector.len() != expected {
        return Err(crate::error::VidragError::VectorStore(format!(
            "Vector dimension {} does not match index '{}' dimension {}",
            vector.len(),
            index,
            expected
        )));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) fn test_entry(id: &str, vector: Vec<f32>) -> IndexEntry {
    IndexEntry {
        id: id.to_string(),
        vector,
        metadata: EntryMetadata {
            initial_time: 0,
            title: format!("Title {}", id),
            thumbnail: String::new(),
            video_url: format!("https://www.youtube.com/watch?v={}&t=0s", id),
            text: format!("text of {}", id),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 0.001);

        let c = vec![0.0, 1.0, 0.0];
        assert!((cosine_similarity(&a, &c)).abs() < 0.001);

        let d = vec![-1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &d) + 1.0).abs() < 0.001);
    }

    #[test]
    fn test_rank_entries_orders_and_truncates() {
        let entries = vec![
            test_entry("far", vec![0.0, 1.0]),
            test_entry("exact", vec![1.0, 0.0]),
            test_entry("near", vec![0.9, 0.1]),
        ];

        let matches = rank_entries(&[1.0, 0.0], &entries, 2, true);
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].id, "exact");
        assert_eq!(matches[1].id, "near");
        assert!(matches[0].score >= matches[1].score);
        assert!(matches[0].metadata.is_some());

        let bare = rank_entries(&[1.0, 0.0], &entries, 10, false);
        assert_eq!(bare.len(), 3);
        assert!(bare.iter().all(|m| m.metadata.is_none()));
    }

    #[test]
    fn test_metadata_serializes_flat() {
        let entry = test_entry("v-t0", vec![1.0]);
        let json = serde_json::to_value(&entry.metadata).unwrap();
        assert_eq!(json["initial_time"], 0);
        assert_eq!(json["title"], "Title v-t0");
        assert!(json["video_url"].as_str().unwrap().ends_with("&t=0s"));
    }
}
