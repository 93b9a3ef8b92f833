//! Chat-completion adapter.
//!
//! Turns the conversation plus a new user message into one OpenAI-compatible
//! `/chat/completions` request and pulls the reply text back out. The HTTP
//! transport sits behind [`ChatEndpoint`] so it can be swapped for a mock.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::Config;
use crate::state::Message;

/// Reply used when the endpoint answers without any content.
pub const FALLBACK_REPLY: &str = "Sorry, I could not generate a response.";

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("request interrupted: {0}")]
    Interrupted(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireMessage {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<WireMessage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatResponse {
    pub choices: Vec<Choice>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Choice {
    #[serde(default)]
    pub message: Option<ResponseMessage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponseMessage {
    #[serde(default)]
    pub content: Option<String>,
}

impl ChatResponse {
    pub fn with_content(content: &str) -> Self {
        Self {
            choices: vec![Choice {
                message: Some(ResponseMessage {
                    content: Some(content.to_string()),
                }),
            }],
        }
    }
}

/// Transport for a single completion round trip.
#[async_trait]
pub trait ChatEndpoint: Send + Sync {
    async fn create(
        &self,
        request: &ChatRequest,
        credential: &str,
    ) -> Result<ChatResponse, CompletionError>;
}

/// Groq (or any OpenAI-compatible) HTTP endpoint.
#[derive(Clone)]
pub struct GroqEndpoint {
    client: Client,
    base_url: String,
}

impl GroqEndpoint {
    pub fn new(base_url: &str, timeout: std::time::Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ChatEndpoint for GroqEndpoint {
    async fn create(
        &self,
        request: &ChatRequest,
        credential: &str,
    ) -> Result<ChatResponse, CompletionError> {
        let url = format!("{}/chat/completions", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(credential)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(CompletionError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(serde_json::from_str(&body)?)
    }
}

/// Stateless adapter: each call is fully described by its inputs.
#[derive(Clone)]
pub struct CompletionClient {
    endpoint: Arc<dyn ChatEndpoint>,
    model: String,
}

impl CompletionClient {
    pub fn new(endpoint: Arc<dyn ChatEndpoint>, model: impl Into<String>) -> Self {
        Self {
            endpoint,
            model: model.into(),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let endpoint = GroqEndpoint::new(config.base_url(), config.request_timeout())?;
        Ok(Self::new(Arc::new(endpoint), config.model()))
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub async fn complete(
        &self,
        history: &[Message],
        new_text: &str,
        credential: &str,
    ) -> Result<String, CompletionError> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: build_messages(history, new_text),
        };

        tracing::debug!(model = %self.model, messages = request.messages.len(), "sending completion request");
        let response = self.endpoint.create(&request, credential).await?;
        Ok(extract_reply(response))
    }
}

/// Maps history to roles in order, then appends `new_text` as the final user turn.
pub fn build_messages(history: &[Message], new_text: &str) -> Vec<WireMessage> {
    history
        .iter()
        .map(|msg| WireMessage {
            role: if msg.is_bot { Role::Assistant } else { Role::User },
            content: msg.content.clone(),
        })
        .chain(std::iter::once(WireMessage {
            role: Role::User,
            content: new_text.to_string(),
        }))
        .collect()
}

pub fn extract_reply(response: ChatResponse) -> String {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message)
        .and_then(|message| message.content)
        .filter(|content| !content.is_empty())
        .unwrap_or_else(|| FALLBACK_REPLY.to_string())
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Scripted endpoint that records every request it receives.
    #[derive(Default)]
    pub struct MockEndpoint {
        replies: Mutex<VecDeque<Result<ChatResponse, CompletionError>>>,
        pub requests: Mutex<Vec<(ChatRequest, String)>>,
    }

    impl MockEndpoint {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn reply(self, content: &str) -> Self {
            self.push(Ok(ChatResponse::with_content(content)))
        }

        pub fn reply_empty(self) -> Self {
            self.push(Ok(ChatResponse::default()))
        }

        pub fn fail(self) -> Self {
            self.push(Err(CompletionError::Status {
                status: 502,
                body: "bad gateway".to_string(),
            }))
        }

        fn push(self, reply: Result<ChatResponse, CompletionError>) -> Self {
            self.replies.lock().unwrap().push_back(reply);
            self
        }

        pub fn recorded(&self) -> Vec<(ChatRequest, String)> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChatEndpoint for MockEndpoint {
        async fn create(
            &self,
            request: &ChatRequest,
            credential: &str,
        ) -> Result<ChatResponse, CompletionError> {
            self.requests
                .lock()
                .unwrap()
                .push((request.clone(), credential.to_string()));
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(CompletionError::Interrupted("no scripted reply".to_string())))
        }
    }
}
