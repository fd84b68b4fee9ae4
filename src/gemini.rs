//! Gemini `generateContent` client.
//!
//! Sends the composed prompt and pulls the first candidate's first text part
//! out of the response. Every failure is folded into a [`QueryResult`] so the
//! caller always has something to show and log.

use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::config::GeminiConfig;
use crate::prompt::{compose_prompt, Tone};

pub const NO_REPLY: &str = "No reply available.";
const ERROR_PREFIX: &str = "⚠️ Error occurred: ";

/// Outcome of one question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryResult {
    Reply(String),
    ServiceError(String),
    EmptyResponse,
}

impl QueryResult {
    /// Text shown to the user and written to the log.
    pub fn display_text(&self) -> String {
        match self {
            Self::Reply(text) => text.clone(),
            Self::ServiceError(detail) => format!("{ERROR_PREFIX}{detail}"),
            Self::EmptyResponse => NO_REPLY.to_string(),
        }
    }

    pub fn is_reply(&self) -> bool {
        matches!(self, Self::Reply(_))
    }
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ApiError,
}

#[derive(Deserialize)]
struct ApiError {
    message: String,
}

#[derive(Clone)]
pub struct GeminiClient {
    config: GeminiConfig,
    api_key: Option<String>,
    client: Client,
}

impl GeminiClient {
    /// Build a client. A missing key is not an error here; each call reports it.
    pub fn new(config: GeminiConfig, api_key: Option<String>) -> Result<Self, reqwest::Error> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        if api_key.is_none() {
            warn!("{} is not set; questions will fail until it is", config.api_key_env);
        }

        Ok(Self {
            config,
            api_key,
            client,
        })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Compose the tone-conditioned prompt and send it.
    pub async fn query(&self, document: &str, question: &str, tone: Tone) -> QueryResult {
        let prompt = compose_prompt(document, question, tone.as_str());
        self.generate(&prompt).await
    }

    /// Single attempt, no retries.
    pub async fn generate(&self, prompt: &str) -> QueryResult {
        let Some(api_key) = self.api_key.as_deref() else {
            return QueryResult::ServiceError(format!(
                "API key not configured (set {})",
                self.config.api_key_env
            ));
        };

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.host.trim_end_matches('/'),
            self.config.model
        );
        let body = json!({
            "contents": [
                { "parts": [ { "text": prompt } ] }
            ]
        });

        debug!("Sending {} char prompt to Gemini model '{}'", prompt.len(), self.config.model);

        let resp = match self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => return QueryResult::ServiceError(describe_transport_error(e)),
        };

        let status = resp.status();
        let text = match resp.text().await {
            Ok(text) => text,
            Err(e) => return QueryResult::ServiceError(describe_transport_error(e)),
        };

        if !status.is_success() {
            let detail = serde_json::from_str::<ErrorEnvelope>(&text)
                .map(|env| env.error.message)
                .unwrap_or(text);
            warn!("Gemini returned status {status}: {detail}");
            return QueryResult::ServiceError(format!("{status}: {detail}"));
        }

        match serde_json::from_str::<GenerateResponse>(&text) {
            Ok(data) => {
                let result = parse_reply(data);
                match &result {
                    QueryResult::Reply(reply) => info!("Gemini replied with {} chars", reply.len()),
                    _ => warn!("Gemini returned no candidates"),
                }
                result
            }
            Err(e) => {
                warn!("Failed to parse Gemini response: {e}");
                QueryResult::ServiceError(format!("invalid response: {e}"))
            }
        }
    }
}

fn parse_reply(data: GenerateResponse) -> QueryResult {
    let Some(candidate) = data.candidates.into_iter().next() else {
        return QueryResult::EmptyResponse;
    };
    candidate
        .content
        .and_then(|c| c.parts.into_iter().next())
        .and_then(|p| p.text)
        .map(QueryResult::Reply)
        .unwrap_or(QueryResult::EmptyResponse)
}

/// The request URL is stripped so nothing about the endpoint reaches the
/// reply text, the log or the speech output.
fn describe_transport_error(e: reqwest::Error) -> String {
    let e = e.without_url();
    if e.is_timeout() {
        warn!("Gemini request timed out");
        format!("timeout: {e}")
    } else if e.is_connect() {
        warn!("Cannot connect to Gemini: {e}");
        format!("connection failed: {e}")
    } else {
        warn!("Gemini request failed: {e}");
        e.to_string()
    }
}
