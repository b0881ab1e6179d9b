//! OpenAI embeddings implementation.

use super::Embedder;
use crate::error::{Result, VidragError};
use crate::retry::RetryPolicy;
use async_openai::config::OpenAIConfig;
use async_openai::types::{CreateEmbeddingRequestArgs, EmbeddingInput};
use async_trait::async_trait;
use tracing::{debug, instrument};

/// OpenAI-based embedder.
pub struct OpenAIEmbedder {
    client: async_openai::Client<OpenAIConfig>,
    model: String,
    dimensions: usize,
    retry: RetryPolicy,
}

impl OpenAIEmbedder {
    /// Create a new OpenAI embedder with custom model and dimensions.
    pub fn with_config(
        client: async_openai::Client<OpenAIConfig>,
        model: &str,
        dimensions: usize,
    ) -> Self {
        Self {
            client,
            model: model.to_string(),
            dimensions,
            retry: RetryPolicy::none(),
        }
    }

    /// Set the retry policy for embedding calls.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn request(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let request = CreateEmbeddingRequestArgs::default()
            .model(&self.model)
            .input(EmbeddingInput::StringArray(texts.to_vec()))
            .dimensions(self.dimensions as u32)
            .build()
            .map_err(|e| VidragError::Embedding(format!("Failed to build request: {}", e)))?;

        let response = self
            .client
            .embeddings()
            .create(request)
            .await
            .map_err(|e| VidragError::Embedding(format!("Embedding API error: {}", e)))?;

        let mut data = response.data;
        data.sort_by_key(|e| e.index);

        if data.len() != texts.len() {
            return Err(VidragError::Embedding(format!(
                "Received {} embeddings for {} inputs",
                data.len(),
                texts.len()
            )));
        }

        Ok(data.into_iter().map(|e| e.embedding).collect())
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    #[instrument(skip(self, text))]
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let embeddings = self.embed_batch(&[text.to_string()]).await?;
        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| VidragError::Embedding("Empty embedding response".to_string()))
    }

    #[instrument(skip(self, texts), fields(count = texts.len()))]
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Generating embeddings for {} texts", texts.len());
        let embeddings = self.retry.run("embedding", || self.request(texts)).await?;
        debug!("Generated {} embeddings", embeddings.len());

        Ok(embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedder_creation() {
        let client = async_openai::Client::with_config(OpenAIConfig::default());
        let embedder = OpenAIEmbedder::with_config(client.clone(), "text-embedding-3-small", 1536);
        assert_eq!(embedder.dimensions(), 1536);

        let embedder = OpenAIEmbedder::with_config(client, "text-embedding-3-large", 3072);
        assert_eq!(embedder.dimensions(), 3072);
    }

    #[tokio::test]
    async fn test_empty_batch_makes_no_request() {
        let client = async_openai::Client::with_config(OpenAIConfig::default());
        let embedder = OpenAIEmbedder::with_config(client, "text-embedding-3-small", 1536);
        assert!(embedder.embed_batch(&[]).await.unwrap().is_empty());
    }
}
