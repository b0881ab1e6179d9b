//! Pinecone serverless vector store over its REST API.
//!
//! The control plane (`api.pinecone.io`) lists, creates and describes
//! indexes. Each index has its own data-plane host, resolved once when the
//! index is opened.

use super::{
    EntryMetadata, IndexEntry, IndexProvider, IndexSpec, RetrievalMatch, VectorIndex,
};
use crate::error::{Result, VidragError};
use crate::retry::RetryPolicy;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};

const API_VERSION: &str = "2024-07";
const READY_POLL_ATTEMPTS: usize = 60;
const READY_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Pinecone control-plane client.
pub struct PineconeProvider {
    client: Client,
    control_url: String,
    retry: RetryPolicy,
}

impl PineconeProvider {
    /// Build a client authenticated with `api_key`.
    pub fn new(api_key: &str, control_url: &str, timeout: Duration) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(VidragError::Config("Missing Pinecone API key".to_string()));
        }

        let mut headers = HeaderMap::new();
        headers.insert(
            "Api-Key",
            HeaderValue::from_str(api_key.trim())
                .map_err(|e| VidragError::Config(format!("Invalid Pinecone API key: {}", e)))?,
        );
        headers.insert("X-Pinecone-API-Version", HeaderValue::from_static(API_VERSION));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| VidragError::Config(format!("Failed to build Pinecone client: {}", e)))?;

        Ok(Self {
            client,
            control_url: control_url.trim_end_matches('/').to_string(),
            retry: RetryPolicy::none(),
        })
    }

    /// Set the retry policy for data-plane calls.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn describe(&self, name: &str) -> Result<IndexDescription> {
        let response = self
            .client
            .get(format!("{}/indexes/{}", self.control_url, name))
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    /// Wait for a freshly created index to accept traffic.
    async fn wait_until_ready(&self, name: &str) -> Result<IndexDescription> {
        for attempt in 1..=READY_POLL_ATTEMPTS {
            let description = self.describe(name).await?;
            if description.status.ready {
                return Ok(description);
            }
            debug!(
                "Index '{}' not ready yet ({}), attempt {}",
                name, description.status.state, attempt
            );
            tokio::time::sleep(READY_POLL_INTERVAL).await;
        }
        Err(VidragError::IndexProvisioning(format!(
            "Index '{}' did not become ready",
            name
        )))
    }
}

#[async_trait]
impl IndexProvider for PineconeProvider {
    async fn list_indexes(&self) -> Result<Vec<String>> {
        let response = self
            .client
            .get(format!("{}/indexes", self.control_url))
            .send()
            .await?;
        let list: IndexList = check(response).await?.json().await?;
        Ok(list.indexes.into_iter().map(|i| i.name).collect())
    }

    #[instrument(skip(self))]
    async fn create_index(&self, spec: &IndexSpec) -> Result<()> {
        let request = CreateIndexRequest {
            name: &spec.name,
            dimension: spec.dimension,
            metric: spec.metric.to_string(),
            spec: ServerlessSpec {
                serverless: ServerlessPlacement {
                    cloud: &spec.cloud,
                    region: &spec.region,
                },
            },
        };

        let response = self
            .client
            .post(format!("{}/indexes", self.control_url))
            .json(&request)
            .send()
            .await?;
        check(response).await?;

        self.wait_until_ready(&spec.name).await?;
        info!("Pinecone index '{}' is ready", spec.name);
        Ok(())
    }

    async fn open_index(&self, name: &str) -> Result<Arc<dyn VectorIndex>> {
        let description = self.describe(name).await?;
        Ok(Arc::new(PineconeIndex {
            client: self.client.clone(),
            name: name.to_string(),
            host: data_plane_url(&description.host),
            retry: self.retry,
        }))
    }
}

/// Data-plane handle on one Pinecone index.
pub struct PineconeIndex {
    client: Client,
    name: String,
    host: String,
    retry: RetryPolicy,
}

impl PineconeIndex {
    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R>
    where
        B: Serialize + Sync,
        R: DeserializeOwned + Send,
    {
        let response = self
            .client
            .post(format!("{}{}", self.host, path))
            .json(body)
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }
}

#[async_trait]
impl VectorIndex for PineconeIndex {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(skip(self, entries), fields(index = %self.name, count = entries.len()))]
    async fn upsert(&self, entries: &[IndexEntry]) -> Result<usize> {
        let request = UpsertRequest {
            vectors: entries
                .iter()
                .map(|e| WireVector {
                    id: &e.id,
                    values: &e.vector,
                    metadata: &e.metadata,
                })
                .collect(),
        };

        let response: UpsertResponse = self
            .retry
            .run("pinecone upsert", || self.post("/vectors/upsert", &request))
            .await?;
        Ok(response.upserted_count)
    }

    #[instrument(skip(self, vector), fields(index = %self.name))]
    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        include_metadata: bool,
    ) -> Result<Vec<RetrievalMatch>> {
        let request = QueryRequest {
            vector,
            top_k,
            include_metadata,
            include_values: false,
        };

        let response: QueryResponse = self
            .retry
            .run("pinecone query", || self.post("/query", &request))
            .await?;
        Ok(response.into_matches(top_k))
    }

    async fn count(&self) -> Result<usize> {
        let filter = serde_json::json!({});
        let stats: IndexStats = self
            .retry
            .run("pinecone stats", || self.post("/describe_index_stats", &filter))
            .await?;
        Ok(stats.total_vector_count)
    }
}

/// Turn a non-success status into a vector store error carrying the body.
async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<body unavailable>".to_string());
    Err(VidragError::VectorStore(format!(
        "Pinecone request failed ({}): {}",
        status, body
    )))
}

fn data_plane_url(host: &str) -> String {
    let host = host.trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}

#[derive(Serialize)]
struct CreateIndexRequest<'a> {
    name: &'a str,
    dimension: usize,
    metric: String,
    spec: ServerlessSpec<'a>,
}

#[derive(Serialize)]
struct ServerlessSpec<'a> {
    serverless: ServerlessPlacement<'a>,
}

#[derive(Serialize)]
struct ServerlessPlacement<'a> {
    cloud: &'a str,
    region: &'a str,
}

#[derive(Debug, Deserialize)]
struct IndexList {
    #[serde(default)]
    indexes: Vec<IndexDescription>,
}

#[derive(Debug, Deserialize)]
struct IndexDescription {
    name: String,
    #[serde(default)]
    host: String,
    #[serde(default)]
    status: IndexStatus,
}

#[derive(Debug, Default, Deserialize)]
struct IndexStatus {
    #[serde(default)]
    ready: bool,
    #[serde(default)]
    state: String,
}

#[derive(Serialize)]
struct UpsertRequest<'a> {
    vectors: Vec<WireVector<'a>>,
}

#[derive(Serialize)]
struct WireVector<'a> {
    id: &'a str,
    values: &'a [f32],
    metadata: &'a EntryMetadata,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    #[serde(default)]
    upserted_count: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
    include_values: bool,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<WireMatch>,
}

impl QueryResponse {
    fn into_matches(self, top_k: usize) -> Vec<RetrievalMatch> {
        let mut matches: Vec<RetrievalMatch> = self
            .matches
            .into_iter()
            .map(|m| RetrievalMatch {
                id: m.id,
                score: m.score,
                metadata: m.metadata,
            })
            .collect();
        matches.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        matches.truncate(top_k);
        matches
    }
}

#[derive(Debug, Deserialize)]
struct WireMatch {
    id: String,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    metadata: Option<EntryMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IndexStats {
    #[serde(default)]
    total_vector_count: usize,
}
