//! RAG answer composition.

use super::context::{build_context, build_references, reference_urls};
use super::{Answer, ChatMessage, ChatModel, ConversationStore};
use crate::config::Prompts;
use crate::embedding::Embedder;
use crate::error::Result;
use crate::vector_store::{RetrievalMatch, VectorIndex};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// RAG engine for question answering.
pub struct RagEngine {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    chat: Arc<dyn ChatModel>,
    prompts: Prompts,
    top_k: usize,
}

impl RagEngine {
    /// Create a new RAG engine retrieving five chunks per question.
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        chat: Arc<dyn ChatModel>,
    ) -> Self {
        Self {
            embedder,
            index,
            chat,
            prompts: Prompts::default(),
            top_k: 5,
        }
    }

    /// Set custom prompts (with user-defined variables).
    pub fn with_prompts(mut self, prompts: Prompts) -> Self {
        self.prompts = prompts;
        self
    }

    /// Set how many chunks are retrieved per question.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    /// Embed `question` and fetch the nearest chunks with metadata.
    pub async fn retrieve(&self, question: &str) -> Result<Vec<RetrievalMatch>> {
        let vector = self.embedder.embed(question).await?;
        let matches = self.index.query(&vector, self.top_k, true).await?;
        debug!("Retrieved {} matches", matches.len());
        Ok(matches)
    }

    /// The system, context and question messages for a question.
    pub fn compose_messages(&self, question: &str, matches: &[RetrievalMatch]) -> Vec<ChatMessage> {
        vec![
            ChatMessage::system(self.prompts.rag.system.clone()),
            ChatMessage::user(build_context(&self.prompts, self.top_k, matches)),
            ChatMessage::user(question),
        ]
    }

    /// Answer a single question.
    ///
    /// The chat model is called once even when nothing was retrieved. The
    /// index is only read.
    #[instrument(skip(self), fields(question = %question))]
    pub async fn answer(&self, question: &str) -> Result<Answer> {
        info!("Processing question: {}", question);

        let matches = self.retrieve(question).await?;
        let messages = self.compose_messages(question, &matches);
        let completion = self.chat.complete(&messages).await?;

        let references = reference_urls(&matches);
        let mut answer = completion;
        answer.push_str(&self.prompts.rag.references_preamble);
        answer.push_str(&build_references(&references));

        Ok(Answer { answer, references })
    }

    /// Answer a question and record the exchange in `history`.
    ///
    /// A failed answer leaves `history` untouched.
    pub async fn converse(&self, question: &str, history: &mut ConversationStore) -> Result<Answer> {
        let answer = self.answer(question).await?;
        history.record(question, answer.answer.clone());
        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VidragError;
    use crate::rag::ChatRole;
    use crate::testing::{FailingIndex, FakeChat, FakeEmbedder};
    use crate::vector_store::{
        EntryMetadata, IndexEntry, IndexProvider, IndexSpec, MemoryProvider, Metric,
    };

    const DIMS: usize = 16;

    async fn seeded_index(embedder: &FakeEmbedder, texts: &[(&str, &str, u64)]) -> Arc<dyn VectorIndex> {
        let provider = MemoryProvider::new();
        provider
            .create_index(&IndexSpec {
                name: "videos".into(),
                dimension: DIMS,
                metric: Metric::Cosine,
                cloud: String::new(),
                region: String::new(),
            })
            .await
            .unwrap();
        let index = provider.open_index("videos").await.unwrap();

        let entries: Vec<IndexEntry> = texts
            .iter()
            .map(|(title, text, t)| IndexEntry {
                id: format!("vid-t{}", t),
                vector: embedder.vector_for(text),
                metadata: EntryMetadata {
                    initial_time: *t,
                    title: title.to_string(),
                    thumbnail: String::new(),
                    video_url: format!("https://www.youtube.com/watch?v=vid&t={}s", t),
                    text: text.to_string(),
                },
            })
            .collect();
        index.upsert(&entries).await.unwrap();
        index
    }

    #[tokio::test]
    async fn test_answer_appends_references() {
        let embedder = Arc::new(FakeEmbedder::new(DIMS));
        let index = seeded_index(
            &embedder,
            &[
                ("Docker basics", "what is a container", 0),
                ("Docker basics", "volumes persist data", 24),
            ],
        )
        .await;
        let chat = Arc::new(FakeChat::new("A container is a process."));
        let engine = RagEngine::new(embedder, index, chat.clone()).with_top_k(1);

        let answer = engine.answer("what is a container").await.unwrap();

        assert_eq!(answer.references, vec!["https://www.youtube.com/watch?v=vid&t=0s"]);
        assert_eq!(
            answer.answer,
            "A container is a process.\n Click on the following for more information: \n - https://www.youtube.com/watch?v=vid&t=0s\n"
        );
    }

    #[tokio::test]
    async fn test_prompt_has_three_messages() {
        let embedder = Arc::new(FakeEmbedder::new(DIMS));
        let index = seeded_index(&embedder, &[("Intro", "hello world", 8)]).await;
        let chat = Arc::new(FakeChat::new("ok"));
        let engine = RagEngine::new(embedder, index, chat.clone());

        engine.answer("say hello").await.unwrap();

        let prompts = chat.prompts();
        assert_eq!(prompts.len(), 1);
        let messages = &prompts[0];
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].role, ChatRole::System);
        assert_eq!(messages[1].role, ChatRole::User);
        assert!(messages[1].content.contains("Title: Intro\nTranscription: hello world\n"));
        assert_eq!(messages[2], ChatMessage::user("say hello"));
    }

    #[tokio::test]
    async fn test_empty_index_still_calls_chat() {
        let embedder = Arc::new(FakeEmbedder::new(DIMS));
        let index = seeded_index(&embedder, &[]).await;
        let chat = Arc::new(FakeChat::new("I don't know."));
        let engine = RagEngine::new(embedder, index, chat.clone());

        let answer = engine.answer("anything?").await.unwrap();

        assert!(answer.references.is_empty());
        assert_eq!(
            answer.answer,
            "I don't know.\n Click on the following for more information: "
        );
        assert_eq!(chat.prompts().len(), 1);
    }

    #[tokio::test]
    async fn test_chat_failure_leaves_history_untouched() {
        let embedder = Arc::new(FakeEmbedder::new(DIMS));
        let index = seeded_index(&embedder, &[("Intro", "hello", 0)]).await;
        let engine = RagEngine::new(embedder, index, Arc::new(FakeChat::failing()));
        let mut history = ConversationStore::new();

        let result = engine.converse("hello?", &mut history).await;

        assert!(matches!(result, Err(VidragError::Chat(_))));
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn test_converse_records_turns() {
        let embedder = Arc::new(FakeEmbedder::new(DIMS));
        let index = seeded_index(&embedder, &[("Intro", "hello", 0)]).await;
        let engine = RagEngine::new(embedder, index, Arc::new(FakeChat::new("hi")));
        let mut history = ConversationStore::new();

        for q in ["one", "two", "three", "four"] {
            engine.converse(q, &mut history).await.unwrap();
        }

        assert_eq!(history.len(), 4);
        let recent = history.recent(3);
        assert_eq!(recent[0].question, "two");
        assert!(recent[2].answer.starts_with("hi"));
    }

    #[tokio::test]
    async fn test_embedding_failure_skips_chat() {
        let seed = FakeEmbedder::new(DIMS);
        let index = seeded_index(&seed, &[("Intro", "hello", 0)]).await;
        let chat = Arc::new(FakeChat::new("unused"));
        let engine = RagEngine::new(
            Arc::new(FakeEmbedder::new(DIMS).failing_embed()),
            index,
            chat.clone(),
        );

        let result = engine.answer("hello?").await;

        assert!(matches!(result, Err(VidragError::Embedding(_))));
        assert!(chat.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_query_failure_skips_chat() {
        let embedder = Arc::new(FakeEmbedder::new(DIMS));
        let inner = seeded_index(&embedder, &[("Intro", "hello", 0)]).await;
        let index = Arc::new(FailingIndex::new(inner).failing_query());
        let chat = Arc::new(FakeChat::new("unused"));
        let engine = RagEngine::new(embedder, index, chat.clone());
        let mut history = ConversationStore::new();

        let result = engine.converse("hello?", &mut history).await;

        assert!(matches!(result, Err(VidragError::VectorStore(_))));
        assert!(chat.prompts().is_empty());
        assert!(history.is_empty());
    }
}
