#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use serde_json::{json, Value};

use pdf_bot::config::{GeminiConfig, SpeechConfig, SpeechEngineKind};
use pdf_bot::extractor;
pub use pdf_bot::extractor::fixture::pdf_with_pages;
use pdf_bot::gemini::GeminiClient;
use pdf_bot::history::InteractionLog;
use pdf_bot::session::Session;
use pdf_bot::speech::SpeechSynthesizer;

/// How the fake Gemini endpoint answers.
#[derive(Clone)]
pub enum Behavior {
    Reply(String),
    NoCandidates,
    Status(StatusCode, String),
    Slow(Duration),
}

/// One request seen by the fake endpoint.
#[derive(Debug, Clone)]
pub struct Seen {
    pub path: String,
    /// `x-goog-api-key` header.
    pub key: Option<String>,
    pub query: HashMap<String, String>,
    pub body: Value,
}

impl Seen {
    pub fn prompt(&self) -> &str {
        self.body["contents"][0]["parts"][0]["text"].as_str().unwrap_or_default()
    }
}

#[derive(Clone)]
struct MockState {
    behavior: Behavior,
    seen: Arc<Mutex<Vec<Seen>>>,
}

pub struct MockGemini {
    pub url: String,
    seen: Arc<Mutex<Vec<Seen>>>,
}

impl MockGemini {
    pub fn requests(&self) -> Vec<Seen> {
        self.seen.lock().unwrap().clone()
    }
}

fn candidate(text: &str) -> Value {
    json!({ "candidates": [ { "content": { "parts": [ { "text": text } ], "role": "model" } } ] })
}

async fn generate(
    State(state): State<MockState>,
    uri: Uri,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> Response {
    state.seen.lock().unwrap().push(Seen {
        path: uri.path().to_string(),
        key: headers
            .get("x-goog-api-key")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        query,
        body,
    });

    match state.behavior {
        Behavior::Reply(text) => Json(candidate(&text)).into_response(),
        Behavior::NoCandidates => Json(json!({ "candidates": [] })).into_response(),
        Behavior::Status(code, message) => {
            (code, Json(json!({ "error": { "code": code.as_u16(), "message": message } }))).into_response()
        }
        Behavior::Slow(delay) => {
            tokio::time::sleep(delay).await;
            Json(candidate("too late")).into_response()
        }
    }
}

/// Serve a fake `generateContent` endpoint on a random local port.
pub async fn spawn_gemini(behavior: Behavior) -> MockGemini {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let state = MockState {
        behavior,
        seen: seen.clone(),
    };
    let app = Router::new().fallback(generate).with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockGemini {
        url: format!("http://{addr}"),
        seen,
    }
}

pub fn gemini_config(url: &str, timeout_secs: u64) -> GeminiConfig {
    GeminiConfig {
        host: url.to_string(),
        timeout_secs,
        ..GeminiConfig::default()
    }
}

pub fn disabled_speech() -> SpeechConfig {
    SpeechConfig {
        engine: SpeechEngineKind::Disabled,
        ..SpeechConfig::default()
    }
}

/// Session over a generated PDF in `dir`, talking to `url`.
pub fn session_in(dir: &Path, url: &str, timeout_secs: u64, speech: SpeechConfig) -> Session {
    let pdf = dir.join("science.pdf");
    std::fs::write(&pdf, pdf_with_pages(&["Water boils at 100 degrees Celsius."])).unwrap();
    let document = extractor::load_document(&pdf).unwrap();

    let gemini = GeminiClient::new(gemini_config(url, timeout_secs), Some("test-key".into())).unwrap();
    Session::new(
        document,
        gemini,
        SpeechSynthesizer::new(speech),
        InteractionLog::new(dir.join("chat_log.xlsx")),
    )
}
