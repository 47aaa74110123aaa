//! Answer generation contract and chat-completions wire format.
//!
//! An [`AnswerGenerator`] turns a question plus retrieved context into
//! answer text. The request layout matches the chat-completions shape the
//! backend expects:
//!
//! ```json
//! {
//!   "messages": [
//!     {"role": "user", "content": "<earlier turn>"},
//!     {"role": "assistant", "content": "<earlier reply>"},
//!     {"role": "user", "content": "<question>"},
//!     {"role": "system", "content": "<most relevant chunk>"},
//!     {"role": "system", "content": "<next chunk>"}
//!   ],
//!   "model": "deepseek-chat",
//!   "max_tokens": 2048
//! }
//! ```
//!
//! Each retrieved chunk travels as its own `system` message, in ranking
//! order, after the question.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::BackendError;
use crate::models::{ChatMessage, Role};

/// Returned when the backend answers successfully but without a usable choice.
pub const NO_ANSWER: &str = "No valid choices in response.";

/// Returned when the first choice carries no message content.
pub const NO_CONTENT: &str = "No response received.";

/// Produces answer text from a question and its retrieved context.
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    /// Generate an answer, sending `history` ahead of the question.
    async fn generate_turn(
        &self,
        history: &[ChatMessage],
        question: &str,
        context_chunks: &[String],
    ) -> Result<String, BackendError>;

    /// Generate an answer with no prior conversation.
    async fn generate(
        &self,
        question: &str,
        context_chunks: &[String],
    ) -> Result<String, BackendError> {
        self.generate_turn(&[], question, context_chunks).await
    }
}

/// Request body for a chat-completions call.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub model: String,
    pub max_tokens: u32,
}

/// Response body of a chat-completions call.
///
/// Every level is optional so that a partially malformed body still
/// deserializes and is interpreted instead of failing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Choice {
    #[serde(default)]
    pub message: Option<ChoiceMessage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

/// Assemble the message list: history, the question, then one system
/// message per context chunk.
pub fn build_messages(
    history: &[ChatMessage],
    question: &str,
    context_chunks: &[String],
) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() + 1 + context_chunks.len());
    messages.extend(history.iter().cloned());
    messages.push(ChatMessage::new(Role::User, question));
    messages.extend(
        context_chunks
            .iter()
            .map(|chunk| ChatMessage::new(Role::System, chunk.as_str())),
    );
    messages
}

impl ChatRequest {
    pub fn new(
        model: &str,
        max_tokens: u32,
        history: &[ChatMessage],
        question: &str,
        context_chunks: &[String],
    ) -> Self {
        Self {
            messages: build_messages(history, question, context_chunks),
            model: model.to_string(),
            max_tokens,
        }
    }
}

/// Extract the answer text from a successful response body.
///
/// The body is parsed leniently: anything that is not a JSON object with
/// a non-empty `choices` list yields [`NO_ANSWER`], and a first choice
/// without content yields [`NO_CONTENT`]. Only unparseable JSON is an
/// error.
pub fn interpret_response(body: &str) -> Result<String, BackendError> {
    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|e| BackendError::Decode(e.to_string()))?;
    let response: ChatResponse = serde_json::from_value(value).unwrap_or_default();

    Ok(match response.choices.into_iter().next() {
        None => NO_ANSWER.to_string(),
        Some(choice) => choice
            .message
            .and_then(|m| m.content)
            .unwrap_or_else(|| NO_CONTENT.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_put_question_before_context() {
        let history = vec![
            ChatMessage::new(Role::User, "earlier"),
            ChatMessage::new(Role::Assistant, "reply"),
        ];
        let chunks = vec!["best".to_string(), "second".to_string()];
        let msgs = build_messages(&history, "what now?", &chunks);

        let flat: Vec<(Role, &str)> = msgs.iter().map(|m| (m.role, m.content.as_str())).collect();
        assert_eq!(
            flat,
            vec![
                (Role::User, "earlier"),
                (Role::Assistant, "reply"),
                (Role::User, "what now?"),
                (Role::System, "best"),
                (Role::System, "second"),
            ]
        );
    }

    #[test]
    fn empty_context_sends_only_question() {
        let msgs = build_messages(&[], "hello", &[]);
        assert_eq!(msgs, vec![ChatMessage::new(Role::User, "hello")]);
    }

    #[test]
    fn request_serializes_wire_shape() {
        let req = ChatRequest::new("deepseek-chat", 2048, &[], "q", &["c".to_string()]);
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["model"], "deepseek-chat");
        assert_eq!(json["max_tokens"], 2048);
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][1]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "c");
    }

    #[test]
    fn well_formed_response_returns_content_verbatim() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"  42\n"}}]}"#;
        assert_eq!(interpret_response(body).unwrap(), "  42\n");
    }

    #[test]
    fn empty_or_malformed_choices_yield_sentinel() {
        assert_eq!(interpret_response(r#"{"choices":[]}"#).unwrap(), NO_ANSWER);
        assert_eq!(interpret_response(r#"{"id":"x"}"#).unwrap(), NO_ANSWER);
        assert_eq!(interpret_response(r#"{"choices":"nope"}"#).unwrap(), NO_ANSWER);
        assert_eq!(interpret_response("[1,2]").unwrap(), NO_ANSWER);
    }

    #[test]
    fn choice_without_content_yields_placeholder() {
        assert_eq!(interpret_response(r#"{"choices":[{}]}"#).unwrap(), NO_CONTENT);
        assert_eq!(
            interpret_response(r#"{"choices":[{"message":{}}]}"#).unwrap(),
            NO_CONTENT
        );
    }

    #[test]
    fn non_json_body_is_decode_error() {
        assert!(matches!(
            interpret_response("<html>"),
            Err(BackendError::Decode(_))
        ));
    }
}
