//! In-process stand-ins for the embedding, chat and vector services.

use crate::embedding::Embedder;
use crate::error::{Result, VidragError};
use crate::rag::{ChatMessage, ChatModel};
use crate::vector_store::{IndexEntry, RetrievalMatch, VectorIndex};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Deterministic embedder: equal texts map to equal vectors.
pub struct FakeEmbedder {
    dimensions: usize,
    batch_sizes: Mutex<Vec<usize>>,
    fail_on_call: Option<usize>,
    fail_single: bool,
}

impl FakeEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            batch_sizes: Mutex::new(Vec::new()),
            fail_on_call: None,
            fail_single: false,
        }
    }

    /// Fail every single-text `embed` call.
    pub fn failing_embed(mut self) -> Self {
        self.fail_single = true;
        self
    }

    /// Fail the given batch call (1-based).
    pub fn failing_on_call(mut self, call: usize) -> Self {
        self.fail_on_call = Some(call);
        self
    }

    /// Sizes of every successful or failed `embed_batch` call.
    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batch_sizes.lock().unwrap().clone()
    }

    pub fn vector_for(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        for (i, byte) in text.bytes().enumerate() {
            let slot = (i * 31 + byte as usize) % self.dimensions;
            vector[slot] += 1.0 + (byte % 7) as f32;
        }
        vector
    }
}

#[async_trait]
impl Embedder for FakeEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if self.fail_single {
            return Err(VidragError::Embedding("service unavailable".into()));
        }
        Ok(self.vector_for(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let call = {
            let mut sizes = self.batch_sizes.lock().unwrap();
            sizes.push(texts.len());
            sizes.len()
        };
        if self.fail_on_call == Some(call) {
            return Err(VidragError::Embedding("service unavailable".into()));
        }
        Ok(texts.iter().map(|t| self.vector_for(t)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

/// Chat model returning a fixed reply and recording every prompt.
pub struct FakeChat {
    reply: String,
    fail: bool,
    prompts: Mutex<Vec<Vec<ChatMessage>>>,
}

impl FakeChat {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            fail: false,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new("")
        }
    }

    pub fn prompts(&self) -> Vec<Vec<ChatMessage>> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatModel for FakeChat {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        self.prompts.lock().unwrap().push(messages.to_vec());
        if self.fail {
            return Err(VidragError::Chat("model overloaded".into()));
        }
        Ok(self.reply.clone())
    }
}

/// Wraps an index and fails chosen operations with a vector store error.
pub struct FailingIndex {
    inner: Arc<dyn VectorIndex>,
    fail_upsert_on: Option<usize>,
    fail_query: bool,
    upserts: AtomicUsize,
}

impl FailingIndex {
    pub fn new(inner: Arc<dyn VectorIndex>) -> Self {
        Self {
            inner,
            fail_upsert_on: None,
            fail_query: false,
            upserts: AtomicUsize::new(0),
        }
    }

    /// Fail the given upsert call (1-based).
    pub fn failing_upsert_on(mut self, call: usize) -> Self {
        self.fail_upsert_on = Some(call);
        self
    }

    pub fn failing_query(mut self) -> Self {
        self.fail_query = true;
        self
    }
}

#[async_trait]
impl VectorIndex for FailingIndex {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn upsert(&self, entries: &[IndexEntry]) -> Result<usize> {
        let call = self.upserts.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_upsert_on == Some(call) {
            return Err(VidragError::VectorStore("upsert rejected".into()));
        }
        self.inner.upsert(entries).await
    }

    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        include_metadata: bool,
    ) -> Result<Vec<RetrievalMatch>> {
        if self.fail_query {
            return Err(VidragError::VectorStore("query timed out".into()));
        }
        self.inner.query(vector, top_k, include_metadata).await
    }

    async fn count(&self) -> Result<usize> {
        self.inner.count().await
    }
}
