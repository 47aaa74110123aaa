//! HTTP chat-completions backend.
//!
//! Sends `POST <generation.url>` with a bearer token and the
//! [`ChatRequest`] body, then interprets the reply:
//!
//! - 2xx with choices → first choice's content, verbatim
//! - 2xx without usable choices → sentinel text (not an error)
//! - non-2xx → [`BackendError::Status`] carrying status and body
//! - transport failure → [`BackendError::Network`] or [`BackendError::Timeout`]
//!
//! No retries: a failed turn is reported to the caller immediately.

use std::time::Duration;

use async_trait::async_trait;
use docchat_core::generate::{interpret_response, AnswerGenerator, ChatRequest};
use docchat_core::models::ChatMessage;
use docchat_core::BackendError;
use tracing::{debug, warn};

use crate::config::GenerationConfig;

pub struct HttpGenerator {
    client: reqwest::Client,
    url: String,
    model: String,
    max_tokens: u32,
    api_key: Option<String>,
    timeout_secs: u64,
}

impl HttpGenerator {
    /// Build a generator from configuration, reading the bearer token from
    /// `generation.api_key_env`.
    pub fn from_config(config: &GenerationConfig) -> anyhow::Result<Self> {
        let api_key = config.api_key();
        if api_key.is_none() {
            warn!(
                var = %config.api_key_env,
                "no API key in environment; requests will be sent unauthenticated"
            );
        }
        Self::new(config, api_key)
    }

    pub fn new(config: &GenerationConfig, api_key: Option<String>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            url: config.url.clone(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            api_key,
            timeout_secs: config.timeout_secs,
        })
    }

    fn transport_error(&self, err: reqwest::Error) -> BackendError {
        if err.is_timeout() {
            BackendError::Timeout(self.timeout_secs)
        } else {
            BackendError::Network(err.to_string())
        }
    }
}

#[async_trait]
impl AnswerGenerator for HttpGenerator {
    async fn generate_turn(
        &self,
        history: &[ChatMessage],
        question: &str,
        context_chunks: &[String],
    ) -> Result<String, BackendError> {
        let body = ChatRequest::new(
            &self.model,
            self.max_tokens,
            history,
            question,
            context_chunks,
        );
        debug!(
            model = %self.model,
            messages = body.messages.len(),
            context = context_chunks.len(),
            "sending chat completion request"
        );

        let mut request = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| self.transport_error(e))?;
        let status = response.status();
        let text = response.text().await.map_err(|e| self.transport_error(e))?;

        if !status.is_success() {
            warn!(status = status.as_u16(), "generation backend returned an error");
            return Err(BackendError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        interpret_response(&text)
    }
}
