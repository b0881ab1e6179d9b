//! RAG (Retrieval-Augmented Generation) for question answering with sources.
//!
//! A question is embedded, the nearest transcript chunks are pulled from the
//! index, and the chat model answers with those chunks as context. The
//! answer ends with the timestamped links of every chunk that was used.

mod chat;
pub mod context;
mod history;
mod response;

pub use chat::OpenAIChatModel;
pub use context::{build_context, build_references, reference_urls};
pub use history::{ConversationStore, ConversationTurn};
pub use response::RagEngine;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// A single message sent to the chat model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Chat completion service.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Return the text of the first candidate completion.
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String>;
}

/// A grounded answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    /// Completion text followed by the reference list.
    pub answer: String,
    /// Timestamped URLs of the retrieved chunks, in match order.
    pub references: Vec<String>,
}
