//! Cliente chat OpenAI-compatible.
//!
//! Un POST a `/chat/completions` con temperatura 0 (salida determinista
//! dentro de lo que el proveedor permite) y un único mensaje de usuario.
//! El deadline por llamada viaja como timeout del request.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use order_core::errors::LlmError;
use order_core::providers::LlmClient;

pub struct OpenAiChatClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiChatClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self { http: reqwest::Client::new(),
               base_url: base_url.into(),
               api_key: api_key.into(),
               model: model.into() }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReplyMessage,
}

#[derive(Deserialize)]
struct ChatReplyMessage {
    content: String,
}

#[async_trait]
impl LlmClient for OpenAiChatClient {
    async fn complete(&self, prompt: &str, timeout: Duration) -> Result<String, LlmError> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let body = ChatRequest { model: &self.model,
                                 temperature: 0.0,
                                 messages: vec![ChatMessage { role: "user", content: prompt }] };
        debug!(model = %self.model, "llm request");

        let response = self.http
                           .post(&url)
                           .bearer_auth(&self.api_key)
                           .timeout(timeout)
                           .json(&body)
                           .send()
                           .await
                           .map_err(|e| {
                               if e.is_timeout() {
                                   LlmError::Timeout { secs: timeout.as_secs() }
                               } else {
                                   LlmError::Transport { detail: e.to_string() }
                               }
                           })?;

        if !response.status().is_success() {
            return Err(LlmError::Api { detail: format!("status {}", response.status()) });
        }
        let parsed: ChatResponse = response.json()
                                           .await
                                           .map_err(|e| LlmError::Api { detail: format!("invalid response body: {e}") })?;
        parsed.choices
              .into_iter()
              .next()
              .map(|c| c.message.content)
              .ok_or_else(|| LlmError::Api { detail: "empty choices".into() })
    }
}
