//! In-memory vector store implementation.
//!
//! Useful for testing and one-off sessions.

use super::{check_dimension, rank_entries, IndexEntry, IndexProvider, IndexSpec, RetrievalMatch, VectorIndex};
use crate::error::{Result, VidragError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

fn lock_error<E: std::fmt::Display>(e: E) -> VidragError {
    VidragError::VectorStore(format!("Failed to acquire lock: {}", e))
}

/// In-memory index provider.
pub struct MemoryProvider {
    indexes: RwLock<HashMap<String, Arc<MemoryIndex>>>,
}

impl MemoryProvider {
    /// Create an empty provider.
    pub fn new() -> Self {
        Self {
            indexes: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IndexProvider for MemoryProvider {
    async fn list_indexes(&self) -> Result<Vec<String>> {
        let indexes = self.indexes.read().map_err(lock_error)?;
        Ok(indexes.keys().cloned().collect())
    }

    async fn create_index(&self, spec: &IndexSpec) -> Result<()> {
        let mut indexes = self.indexes.write().map_err(lock_error)?;
        if indexes.contains_key(&spec.name) {
            return Err(VidragError::IndexProvisioning(format!(
                "Index '{}' already exists",
                spec.name
            )));
        }
        indexes.insert(
            spec.name.clone(),
            Arc::new(MemoryIndex {
                name: spec.name.clone(),
                dimension: spec.dimension,
                entries: RwLock::new(HashMap::new()),
            }),
        );
        Ok(())
    }

    async fn open_index(&self, name: &str) -> Result<Arc<dyn VectorIndex>> {
        let indexes = self.indexes.read().map_err(lock_error)?;
        let index = indexes
            .get(name)
            .cloned()
            .ok_or_else(|| VidragError::IndexProvisioning(format!("Index '{}' not found", name)))?;
        Ok(index)
    }
}

/// A single in-memory index.
pub struct MemoryIndex {
    name: String,
    dimension: usize,
    entries: RwLock<HashMap<String, IndexEntry>>,
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    fn name(&self) -> &str {
        &self.name
    }

    async fn upsert(&self, entries: &[IndexEntry]) -> Result<usize> {
        for entry in entries {
            check_dimension(&self.name, self.dimension, &entry.vector)?;
        }

        let mut store = self.entries.write().map_err(lock_error)?;
        for entry in entries {
            store.insert(entry.id.clone(), entry.clone());
        }
        Ok(entries.len())
    }

    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        include_metadata: bool,
    ) -> Result<Vec<RetrievalMatch>> {
        check_dimension(&self.name, self.dimension, vector)?;
        let store = self.entries.read().map_err(lock_error)?;
        Ok(rank_entries(vector, store.values(), top_k, include_metadata))
    }

    async fn count(&self) -> Result<usize> {
        let store = self.entries.read().map_err(lock_error)?;
        Ok(store.len())
    }
}
