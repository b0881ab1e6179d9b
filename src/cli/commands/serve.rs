//! HTTP API server for integration with other systems.
//!
//! Provides REST endpoints for ingestion, grounded answers, session history
//! and transcript download.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::error::VidragError;
use crate::orchestrator::{IngestReport, Orchestrator};
use crate::rag::{ConversationStore, ConversationTurn};
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};
use uuid::Uuid;

/// Shared application state.
struct AppState {
    orchestrator: Orchestrator,
    /// Set while an ingestion is running.
    processing: AtomicBool,
    sessions: Mutex<HashMap<Uuid, ConversationStore>>,
    history_display_turns: usize,
}

impl AppState {
    fn new(orchestrator: Orchestrator) -> Self {
        let history_display_turns = orchestrator.settings().rag.history_display_turns;
        Self {
            orchestrator,
            processing: AtomicBool::new(false),
            sessions: Mutex::new(HashMap::new()),
            history_display_turns,
        }
    }
}

/// Clears the processing flag when dropped.
struct ProcessingGuard<'a>(&'a AtomicBool);

impl<'a> ProcessingGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for ProcessingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Run the HTTP API server.
pub async fn run_serve(host: &str, port: u16, settings: Settings) -> anyhow::Result<()> {
    if let Err(e) = preflight::check(Operation::Ask, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let orchestrator = Orchestrator::new(settings)?;
    let app = router(Arc::new(AppState::new(orchestrator)));

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("vidrag API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET  /health");
    Output::kv("Ingest", "POST /ingest");
    Output::kv("Ask (RAG)", "POST /ask");
    Output::kv("History", "GET  /sessions/:id/history");
    Output::kv("Transcript", "GET  /transcripts/:video_id");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app).await?;

    Ok(())
}

fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/ingest", post(ingest))
        .route("/ask", post(ask))
        .route("/sessions/{id}/history", get(session_history))
        .route("/transcripts/{video_id}", get(transcript))
        .layer(cors)
        .with_state(state)
}

// === Request/Response Types ===

#[derive(Deserialize)]
struct IngestRequest {
    /// YouTube URL or video ID
    input: String,
}

#[derive(Deserialize)]
struct AskRequest {
    question: String,
    #[serde(default)]
    session_id: Option<Uuid>,
}

#[derive(Serialize)]
struct AskResponse {
    answer: String,
    references: Vec<String>,
    session_id: Uuid,
}

#[derive(Serialize)]
struct HistoryResponse {
    session_id: Uuid,
    total_turns: usize,
    turns: Vec<ConversationTurn>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

fn status_for(e: &VidragError) -> StatusCode {
    match e {
        VidragError::CaptionFormat { .. }
        | VidragError::InvalidInput(_)
        | VidragError::VideoSource(_) => StatusCode::BAD_REQUEST,
        VidragError::SizeLimit { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        VidragError::TranscriptNotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

// === Handlers ===

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn ingest(
    State(state): State<Arc<AppState>>,
    Json(req): Json<IngestRequest>,
) -> Response {
    let Some(_guard) = ProcessingGuard::acquire(&state.processing) else {
        warn!("Rejecting ingestion of {}: another ingestion is running", req.input);
        return error_response(StatusCode::CONFLICT, "An ingestion is already in progress");
    };

    match state.orchestrator.ingest(&req.input).await {
        Ok(report) => Json::<IngestReport>(report).into_response(),
        Err(e) => error_response(status_for(&e), e.to_string()),
    }
}

async fn ask(State(state): State<Arc<AppState>>, Json(req): Json<AskRequest>) -> Response {
    let engine = match state.orchestrator.rag_engine().await {
        Ok(engine) => engine,
        Err(e) => return error_response(status_for(&e), e.to_string()),
    };

    let session_id = req.session_id.unwrap_or_else(Uuid::new_v4);

    // The sessions lock is not held while the model is answering.
    match engine.answer(&req.question).await {
        Ok(answer) => {
            state
                .sessions
                .lock()
                .await
                .entry(session_id)
                .or_default()
                .record(req.question.as_str(), answer.answer.clone());
            info!("Answered question for session {}", session_id);
            Json(AskResponse {
                answer: answer.answer,
                references: answer.references,
                session_id,
            })
            .into_response()
        }
        Err(e) => error_response(status_for(&e), e.to_string()),
    }
}

async fn session_history(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Response {
    let sessions = state.sessions.lock().await;
    match sessions.get(&id) {
        Some(history) => Json(HistoryResponse {
            session_id: id,
            total_turns: history.len(),
            turns: history.recent(state.history_display_turns).to_vec(),
        })
        .into_response(),
        None => error_response(StatusCode::NOT_FOUND, format!("Session not found: {}", id)),
    }
}

async fn transcript(
    State(state): State<Arc<AppState>>,
    Path(video_id): Path<String>,
) -> Response {
    match state.orchestrator.transcripts().load(&video_id) {
        Ok(captions) => (
            [
                (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}.txt\"", video_id),
                ),
            ],
            captions,
        )
            .into_response(),
        Err(e) => error_response(status_for(&e), e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{IndexBackend, Prompts};
    use crate::source::Video;
    use crate::rag::{ChatMessage, ChatModel};
    use crate::testing::{FakeChat, FakeEmbedder};
    use crate::transcription::Transcriber;
    use std::time::Duration;
    use tokio::sync::Notify;
    use crate::vector_store::MemoryProvider;
    use async_trait::async_trait;
    use tempfile::TempDir;

    struct NoTranscriber;

    #[async_trait]
    impl Transcriber for NoTranscriber {
        async fn transcribe(&self, _audio_path: &std::path::Path) -> crate::error::Result<String> {
            Err(VidragError::Transcription("not available in tests".into()))
        }
    }

    /// Chat model that blocks until released.
    #[derive(Default)]
    struct GatedChat {
        entered: Notify,
        release: Notify,
    }

    #[async_trait]
    impl ChatModel for GatedChat {
        async fn complete(&self, _messages: &[ChatMessage]) -> crate::error::Result<String> {
            self.entered.notify_one();
            self.release.notified().await;
            Ok("late answer".to_string())
        }
    }

    fn state(dir: &TempDir) -> Arc<AppState> {
        state_with_chat(dir, Arc::new(FakeChat::new("answer")))
    }

    fn state_with_chat(dir: &TempDir, chat: Arc<dyn ChatModel>) -> Arc<AppState> {
        let mut settings = Settings::default();
        settings.general.data_dir = dir.path().join("data").to_string_lossy().into_owned();
        settings.general.temp_dir = dir.path().join("tmp").to_string_lossy().into_owned();
        settings.index.provider = IndexBackend::Memory;
        settings.index.dimension = 8;
        settings.embedding.dimensions = 8;

        let orchestrator = Orchestrator::with_components(
            settings,
            Prompts::default(),
            Arc::new(NoTranscriber),
            Arc::new(FakeEmbedder::new(8)),
            chat,
            Arc::new(MemoryProvider::new()),
        )
        .unwrap();
        Arc::new(AppState::new(orchestrator))
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_concurrent_ingest_conflicts() {
        let dir = TempDir::new().unwrap();
        let state = state(&dir);
        state.processing.store(true, Ordering::SeqCst);

        let response = ingest(
            State(state.clone()),
            Json(IngestRequest {
                input: "abc123def45".into(),
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert!(state.processing.load(Ordering::SeqCst));
    }

    #[test]
    fn test_processing_guard_releases() {
        let flag = AtomicBool::new(false);
        {
            let _guard = ProcessingGuard::acquire(&flag).unwrap();
            assert!(ProcessingGuard::acquire(&flag).is_none());
        }
        assert!(!flag.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_ask_tracks_session_history() {
        let dir = TempDir::new().unwrap();
        let state = state(&dir);

        let first = ask(
            State(state.clone()),
            Json(AskRequest {
                question: "q1".into(),
                session_id: None,
            }),
        )
        .await;
        assert_eq!(first.status(), StatusCode::OK);
        let body = body_json(first).await;
        let session_id: Uuid = body["session_id"].as_str().unwrap().parse().unwrap();

        for q in ["q2", "q3", "q4"] {
            let response = ask(
                State(state.clone()),
                Json(AskRequest {
                    question: q.into(),
                    session_id: Some(session_id),
                }),
            )
            .await;
            assert_eq!(response.status(), StatusCode::OK);
        }

        let response = session_history(State(state.clone()), Path(session_id)).await;
        let body = body_json(response).await;
        assert_eq!(body["total_turns"], 4);
        let turns = body["turns"].as_array().unwrap();
        assert_eq!(turns.len(), 3);
        assert_eq!(turns[0]["question"], "q2");
    }

    #[tokio::test]
    async fn test_sessions_stay_available_while_answering() {
        let dir = TempDir::new().unwrap();
        let chat = Arc::new(GatedChat::default());
        let state = state_with_chat(&dir, chat.clone());
        let session_id = Uuid::new_v4();

        let pending = tokio::spawn(ask(
            State(state.clone()),
            Json(AskRequest {
                question: "slow question".into(),
                session_id: Some(session_id),
            }),
        ));
        chat.entered.notified().await;

        let other = tokio::time::timeout(
            Duration::from_secs(5),
            session_history(State(state.clone()), Path(Uuid::new_v4())),
        )
        .await
        .expect("history blocked by an in-flight answer");
        assert_eq!(other.status(), StatusCode::NOT_FOUND);

        chat.release.notify_one();
        let response = pending.await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let sessions = state.sessions.lock().await;
        assert_eq!(sessions[&session_id].len(), 1);
    }

    #[tokio::test]
    async fn test_failed_answer_records_nothing() {
        let dir = TempDir::new().unwrap();
        let state = state_with_chat(&dir, Arc::new(FakeChat::failing()));
        let session_id = Uuid::new_v4();

        let response = ask(
            State(state.clone()),
            Json(AskRequest {
                question: "q".into(),
                session_id: Some(session_id),
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(state.sessions.lock().await.get(&session_id).is_none());
    }

    #[tokio::test]
    async fn test_unknown_session_is_not_found() {
        let dir = TempDir::new().unwrap();
        let response = session_history(State(state(&dir)), Path(Uuid::new_v4())).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_transcript_download() {
        let dir = TempDir::new().unwrap();
        let state = state(&dir);

        let missing = transcript(State(state.clone()), Path("abc123def45".into())).await;
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let video = Video::new("abc123def45", "Talk", "", "https://www.youtube.com/watch?v=abc123def45");
        let captions = "WEBVTT\n\n00:00:00.000 --> 00:00:09.000\nhello there\n";
        state.orchestrator.ingest_captions(&video, captions).await.unwrap();

        let found = transcript(State(state), Path("abc123def45".into())).await;
        assert_eq!(found.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(found.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], captions.as_bytes());
    }
}
