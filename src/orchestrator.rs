//! Pipeline orchestrator for vidrag.
//!
//! Coordinates the whole process from video lookup to indexing, and hands
//! out the answering engine over the same index.

use crate::audio::{check_audio_size, download_audio};
use crate::captions;
use crate::chunking::ChunkBatcher;
use crate::config::{IndexBackend, Prompts, Settings};
use crate::embedding::{Embedder, OpenAIEmbedder};
use crate::error::{Result, VidragError};
use crate::openai::create_client_with_timeout;
use crate::rag::{Answer, ChatModel, OpenAIChatModel, RagEngine};
use crate::retry::RetryPolicy;
use crate::source::{Video, YoutubeSource};
use crate::transcription::{Transcriber, WhisperTranscriber};
use crate::transcripts::TranscriptStore;
use crate::vector_store::{
    IndexGateway, IndexProvider, MemoryProvider, PineconeProvider, SqliteProvider, VectorIndex,
};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Result of ingesting one video.
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    /// The ingested video.
    pub video: Video,
    /// Number of merged caption blocks.
    pub blocks: usize,
    /// Number of chunks upserted.
    pub chunks: usize,
    /// Size of each upload batch, in order.
    pub batches: Vec<usize>,
}

/// The main orchestrator for the vidrag pipeline.
pub struct Orchestrator {
    settings: Settings,
    prompts: Prompts,
    source: YoutubeSource,
    transcriber: Arc<dyn Transcriber>,
    embedder: Arc<dyn Embedder>,
    chat: Arc<dyn ChatModel>,
    gateway: IndexGateway,
    transcripts: TranscriptStore,
    temp_dir: PathBuf,
}

impl Orchestrator {
    /// Create a new orchestrator backed by the configured services.
    pub fn new(settings: Settings) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        let timeout = Duration::from_secs(settings.service.timeout_secs);
        let retry = RetryPolicy::from_settings(&settings.service);
        let client = create_client_with_timeout(timeout)?;

        let transcriber = Arc::new(
            WhisperTranscriber::new(client.clone(), &settings.transcription.model).with_retry(retry),
        );
        let embedder = Arc::new(
            OpenAIEmbedder::with_config(
                client.clone(),
                &settings.embedding.model,
                settings.embedding.dimensions as usize,
            )
            .with_retry(retry),
        );
        let chat = Arc::new(OpenAIChatModel::new(client, &settings.rag.model).with_retry(retry));
        let provider = create_provider(&settings, timeout, retry)?;

        Self::with_components(settings, prompts, transcriber, embedder, chat, provider)
    }

    /// Create an orchestrator with custom components.
    pub fn with_components(
        settings: Settings,
        prompts: Prompts,
        transcriber: Arc<dyn Transcriber>,
        embedder: Arc<dyn Embedder>,
        chat: Arc<dyn ChatModel>,
        provider: Arc<dyn IndexProvider>,
    ) -> Result<Self> {
        let temp_dir = settings.temp_dir();
        std::fs::create_dir_all(&temp_dir)?;

        let gateway = IndexGateway::from_settings(provider, &settings.index);
        let transcripts = TranscriptStore::new(settings.transcripts_dir());

        Ok(Self {
            settings,
            prompts,
            source: YoutubeSource::new(),
            transcriber,
            embedder,
            chat,
            gateway,
            transcripts,
            temp_dir,
        })
    }

    /// Get the settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Get the transcript artifact store.
    pub fn transcripts(&self) -> &TranscriptStore {
        &self.transcripts
    }

    /// The configured index, created on first use.
    pub async fn index(&self) -> Result<Arc<dyn VectorIndex>> {
        self.gateway.get_or_create_index(&self.settings.index.name).await
    }

    /// Download, transcribe and index a video.
    ///
    /// Audio above `ingestion.max_audio_bytes` aborts the run before
    /// transcription.
    #[instrument(skip(self), fields(input = %input))]
    pub async fn ingest(&self, input: &str) -> Result<IngestReport> {
        let video = self.source.fetch_video(input).await?;
        info!("Ingesting '{}' ({})", video.title, video.video_id);

        let work_dir = tempfile::Builder::new()
            .prefix("vidrag-")
            .tempdir_in(&self.temp_dir)?;

        let audio_path = download_audio(&video.watch_url, &video.video_id, work_dir.path()).await?;

        match check_audio_size(&audio_path, self.settings.ingestion.max_audio_bytes) {
            Ok(size) => info!("Downloaded {} bytes of audio", size),
            Err(e @ VidragError::SizeLimit { .. }) => {
                warn!("Skipping {}: {}", video.video_id, e);
                return Err(e);
            }
            Err(e) => return Err(e),
        }

        let captions = self.transcriber.transcribe(&audio_path).await?;
        self.ingest_captions(&video, &captions).await
    }

    /// Merge, chunk and index an existing caption stream, then store it.
    #[instrument(skip(self, video, captions), fields(video_id = %video.video_id))]
    pub async fn ingest_captions(&self, video: &Video, captions: &str) -> Result<IngestReport> {
        let blocks = captions::merge(captions, self.settings.ingestion.merge_seconds)?;
        info!("Merged captions into {} blocks", blocks.len());

        let index = self.index().await?;
        let batcher = ChunkBatcher::new(
            self.embedder.clone(),
            self.settings.ingestion.stride,
            self.settings.ingestion.upload_batch_size,
        );
        let indexed = batcher.chunk_and_index(index.as_ref(), video, &blocks).await?;

        self.transcripts.save(&video.video_id, captions)?;

        Ok(IngestReport {
            video: video.clone(),
            blocks: blocks.len(),
            chunks: indexed.chunks,
            batches: indexed.batches,
        })
    }

    /// Build an answering engine over the configured index.
    pub async fn rag_engine(&self) -> Result<RagEngine> {
        let index = self.index().await?;
        Ok(RagEngine::new(self.embedder.clone(), index, self.chat.clone())
            .with_prompts(self.prompts.clone())
            .with_top_k(self.settings.rag.top_k))
    }

    /// Answer a single question.
    pub async fn answer(&self, question: &str) -> Result<Answer> {
        self.rag_engine().await?.answer(question).await
    }
}

/// Build the index provider selected in settings.
pub fn create_provider(
    settings: &Settings,
    timeout: Duration,
    retry: RetryPolicy,
) -> Result<Arc<dyn IndexProvider>> {
    let provider: Arc<dyn IndexProvider> = match settings.index.provider {
        IndexBackend::Sqlite => Arc::new(SqliteProvider::new(&settings.sqlite_path())?),
        IndexBackend::Memory => Arc::new(MemoryProvider::new()),
        IndexBackend::Pinecone => {
            let key_env = &settings.index.pinecone_api_key_env;
            let api_key = std::env::var(key_env)
                .map_err(|_| VidragError::Config(format!("{} is not set", key_env)))?;
            Arc::new(
                PineconeProvider::new(&api_key, &settings.index.pinecone_control_url, timeout)?
                    .with_retry(retry),
            )
        }
    };
    info!("Using {} vector store", settings.index.provider);
    Ok(provider)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeChat, FakeEmbedder};
    use async_trait::async_trait;
    use std::path::Path;
    use tempfile::TempDir;

    struct NoTranscriber;

    #[async_trait]
    impl Transcriber for NoTranscriber {
        async fn transcribe(&self, _audio_path: &Path) -> Result<String> {
            Err(VidragError::Transcription("not available in tests".into()))
        }
    }

    const CAPTIONS: &str = "WEBVTT

00:00:00.000 --> 00:00:05.000
Docker packages applications

00:00:05.000 --> 00:00:10.000
into portable containers.

00:00:10.000 --> 00:00:19.500
Images are built from a Dockerfile

00:00:19.500 --> 00:00:27.000
and pushed to a registry.
";

    fn orchestrator(dir: &TempDir, chat: Arc<FakeChat>) -> Orchestrator {
        let mut settings = Settings::default();
        settings.general.data_dir = dir.path().join("data").to_string_lossy().into_owned();
        settings.general.temp_dir = dir.path().join("tmp").to_string_lossy().into_owned();
        settings.index.provider = IndexBackend::Memory;
        settings.index.dimension = 16;
        settings.embedding.dimensions = 16;
        settings.ingestion.stride = 1;

        Orchestrator::with_components(
            settings,
            Prompts::default(),
            Arc::new(NoTranscriber),
            Arc::new(FakeEmbedder::new(16)),
            chat,
            Arc::new(MemoryProvider::new()),
        )
        .unwrap()
    }

    fn video() -> Video {
        Video::new(
            "abc123def45",
            "Docker explained",
            "https://i.ytimg.com/vi/abc123def45/hqdefault.jpg",
            "https://www.youtube.com/watch?v=abc123def45",
        )
    }

    #[tokio::test]
    async fn test_ingest_captions_indexes_and_stores() {
        let dir = TempDir::new().unwrap();
        let orchestrator = orchestrator(&dir, Arc::new(FakeChat::new("ok")));

        let report = orchestrator.ingest_captions(&video(), CAPTIONS).await.unwrap();

        assert_eq!(report.blocks, 3);
        assert_eq!(report.chunks, 3);
        assert_eq!(report.batches, vec![3]);
        assert_eq!(orchestrator.index().await.unwrap().count().await.unwrap(), 3);
        assert_eq!(orchestrator.transcripts().load("abc123def45").unwrap(), CAPTIONS);
    }

    #[tokio::test]
    async fn test_reingest_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let orchestrator = orchestrator(&dir, Arc::new(FakeChat::new("ok")));

        orchestrator.ingest_captions(&video(), CAPTIONS).await.unwrap();
        orchestrator.ingest_captions(&video(), CAPTIONS).await.unwrap();

        assert_eq!(orchestrator.index().await.unwrap().count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_malformed_captions_store_nothing() {
        let dir = TempDir::new().unwrap();
        let orchestrator = orchestrator(&dir, Arc::new(FakeChat::new("ok")));

        let bad = "WEBVTT\n\n00:00 --> 00:05\nhello\n";
        let result = orchestrator.ingest_captions(&video(), bad).await;

        assert!(matches!(result, Err(VidragError::CaptionFormat { .. })));
        assert!(orchestrator.transcripts().load("abc123def45").is_err());
    }

    #[tokio::test]
    async fn test_answer_after_ingest() {
        let dir = TempDir::new().unwrap();
        let chat = Arc::new(FakeChat::new("Containers are portable."));
        let orchestrator = orchestrator(&dir, chat.clone());

        orchestrator.ingest_captions(&video(), CAPTIONS).await.unwrap();
        let answer = orchestrator.answer("what does docker do?").await.unwrap();

        assert_eq!(answer.references.len(), 3);
        assert!(answer.answer.starts_with("Containers are portable."));
        assert!(answer
            .references
            .iter()
            .all(|url| url.starts_with("https://www.youtube.com/watch?v=abc123def45&t=")));
        assert_eq!(chat.prompts().len(), 1);
    }
}
