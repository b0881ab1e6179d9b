//! OpenAI chat completions.

use super::{ChatMessage, ChatModel, ChatRole};
use crate::error::{Result, VidragError};
use crate::retry::RetryPolicy;
use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;
use tracing::{debug, instrument};

/// Chat model backed by the OpenAI chat completions API.
pub struct OpenAIChatModel {
    client: async_openai::Client<OpenAIConfig>,
    model: String,
    retry: RetryPolicy,
}

impl OpenAIChatModel {
    pub fn new(client: async_openai::Client<OpenAIConfig>, model: &str) -> Self {
        Self {
            client,
            model: model.to_string(),
            retry: RetryPolicy::none(),
        }
    }

    /// Set the retry policy for completion calls.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Name of the model used for completions.
    pub fn model(&self) -> &str {
        &self.model
    }

    async fn request(&self, messages: &[ChatMessage]) -> Result<String> {
        let messages = messages
            .iter()
            .map(to_request_message)
            .collect::<Result<Vec<_>>>()?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .build()
            .map_err(|e| VidragError::Chat(e.to_string()))?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            VidragError::OpenAI(format!("Failed to generate response: {}", e))
        })?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| VidragError::Chat("Empty response from model".to_string()))
    }
}

fn to_request_message(message: &ChatMessage) -> Result<ChatCompletionRequestMessage> {
    let content = message.content.clone();
    let built: ChatCompletionRequestMessage = match message.role {
        ChatRole::System => ChatCompletionRequestSystemMessageArgs::default()
            .content(content)
            .build()
            .map_err(|e| VidragError::Chat(e.to_string()))?
            .into(),
        ChatRole::User => ChatCompletionRequestUserMessageArgs::default()
            .content(content)
            .build()
            .map_err(|e| VidragError::Chat(e.to_string()))?
            .into(),
        ChatRole::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
            .content(content)
            .build()
            .map_err(|e| VidragError::Chat(e.to_string()))?
            .into(),
    };
    Ok(built)
}

#[async_trait]
impl ChatModel for OpenAIChatModel {
    #[instrument(skip(self, messages), fields(model = %self.model, messages = messages.len()))]
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let answer = self.retry.run("chat completion", || self.request(messages)).await?;
        debug!("Received completion of {} chars", answer.len());
        Ok(answer)
    }
}
