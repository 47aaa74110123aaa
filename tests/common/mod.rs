//! Shared fixtures: a deterministic embedder and a mock chat-completions
//! server bound to an ephemeral local port.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::Router;
use docchat_core::embedding::Embedder;
use docchat_core::models::Embedding;
use docchat_core::Result;
use serde_json::Value;

/// Embeds text as its a–z letter histogram. Similar spellings score high,
/// and text without ASCII letters embeds to the zero vector.
pub struct LetterEmbedder;

#[async_trait]
impl Embedder for LetterEmbedder {
    fn model_name(&self) -> &str {
        "letters"
    }

    fn dims(&self) -> usize {
        26
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        Ok(texts
            .iter()
            .map(|text| {
                let mut v = vec![0.0f32; 26];
                for c in text.chars().filter(|c| c.is_ascii_alphabetic()) {
                    v[(c.to_ascii_lowercase() as u8 - b'a') as usize] += 1.0;
                }
                v
            })
            .collect())
    }
}

/// One request as seen by the mock backend.
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub authorization: Option<String>,
    pub body: Value,
}

pub struct MockBackend {
    pub url: String,
    reply: Arc<Mutex<(u16, String)>>,
    seen: Arc<Mutex<Vec<SeenRequest>>>,
}

#[derive(Clone)]
struct MockState {
    reply: Arc<Mutex<(u16, String)>>,
    seen: Arc<Mutex<Vec<SeenRequest>>>,
}

async fn complete(
    State(state): State<MockState>,
    headers: HeaderMap,
    body: String,
) -> (StatusCode, String) {
    let authorization = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = serde_json::from_str(&body).unwrap_or(Value::Null);
    state.seen.lock().unwrap().push(SeenRequest {
        authorization,
        body,
    });
    let (status, reply) = state.reply.lock().unwrap().clone();
    (StatusCode::from_u16(status).unwrap(), reply)
}

impl MockBackend {
    /// Start a server answering every request with `status` and `body`.
    pub async fn start(status: u16, body: &str) -> Self {
        let reply = Arc::new(Mutex::new((status, body.to_string())));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let app = Router::new()
            .route("/chat/completions", post(complete))
            .with_state(MockState {
                reply: reply.clone(),
                seen: seen.clone(),
            });

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            url: format!("http://{}/chat/completions", addr),
            reply,
            seen,
        }
    }

    /// Start a server that answers with a single choice carrying `content`.
    pub async fn answering(content: &str) -> Self {
        Self::start(200, &completion(content)).await
    }

    pub fn set_reply(&self, status: u16, body: &str) {
        *self.reply.lock().unwrap() = (status, body.to_string());
    }

    pub fn requests(&self) -> Vec<SeenRequest> {
        self.seen.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> SeenRequest {
        self.requests()
            .pop()
            .expect("mock backend received no request")
    }
}

/// A minimal successful chat-completions body.
pub fn completion(content: &str) -> String {
    serde_json::json!({
        "id": "cmpl-1",
        "choices": [{"index": 0, "message": {"role": "assistant", "content": content}}]
    })
    .to_string()
}

/// `(role, content)` pairs of a captured request body.
pub fn roles_and_contents(body: &Value) -> Vec<(String, String)> {
    body["messages"]
        .as_array()
        .map(|msgs| {
            msgs.iter()
                .map(|m| {
                    (
                        m["role"].as_str().unwrap_or_default().to_string(),
                        m["content"].as_str().unwrap_or_default().to_string(),
                    )
                })
                .collect()
        })
        .unwrap_or_default()
}
