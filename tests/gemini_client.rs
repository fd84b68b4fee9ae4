mod common;

use std::time::Duration;

use axum::http::StatusCode;
use common::{gemini_config, spawn_gemini, Behavior};
use pdf_bot::gemini::{GeminiClient, QueryResult};
use pdf_bot::prompt::Tone;

const DOC: &str = "water boils at 100 degrees celsius.";

#[tokio::test]
async fn sends_prompt_and_key_and_returns_first_part() {
    let mock = spawn_gemini(Behavior::Reply("It boils at **100 °C**.".into())).await;
    let client = GeminiClient::new(gemini_config(&mock.url, 10), Some("secret".into())).unwrap();

    let result = client.query(DOC, "At what temperature does water boil?", Tone::Friendly).await;
    assert_eq!(result, QueryResult::Reply("It boils at **100 °C**.".into()));

    let requests = mock.requests();
    assert_eq!(requests.len(), 1);
    let seen = &requests[0];
    assert_eq!(seen.path, "/v1beta/models/gemini-2.0-flash-lite:generateContent");
    assert_eq!(seen.key.as_deref(), Some("secret"));
    assert!(seen.query.is_empty(), "{:?}", seen.query);
    assert!(seen.prompt().contains(DOC));
    assert!(seen.prompt().contains("At what temperature does water boil?"));
    assert!(seen.prompt().contains("warm and friendly tone"));
}

#[tokio::test]
async fn zero_candidates_is_an_empty_response() {
    let mock = spawn_gemini(Behavior::NoCandidates).await;
    let client = GeminiClient::new(gemini_config(&mock.url, 10), Some("k".into())).unwrap();

    let result = client.query(DOC, "anything", Tone::Formal).await;
    assert_eq!(result, QueryResult::EmptyResponse);
    assert_eq!(result.display_text(), "No reply available.");
}

#[tokio::test]
async fn error_status_carries_the_service_message() {
    let mock = spawn_gemini(Behavior::Status(StatusCode::BAD_REQUEST, "API key not valid".into())).await;
    let client = GeminiClient::new(gemini_config(&mock.url, 10), Some("bad".into())).unwrap();

    match client.query(DOC, "q", Tone::Formal).await {
        QueryResult::ServiceError(detail) => {
            assert!(detail.contains("400"), "{detail}");
            assert!(detail.contains("API key not valid"), "{detail}");
        }
        other => panic!("expected ServiceError, got {other:?}"),
    }
}

#[tokio::test]
async fn slow_service_times_out() {
    let mock = spawn_gemini(Behavior::Slow(Duration::from_secs(5))).await;
    let client = GeminiClient::new(gemini_config(&mock.url, 1), Some("SUPERSECRETKEY123".into())).unwrap();

    let result = client.query(DOC, "q", Tone::Formal).await;
    let text = result.display_text();
    assert!(text.starts_with("⚠️ Error occurred: "), "{text}");
    assert!(text.contains("timeout"), "{text}");
    assert!(!text.contains("SUPERSECRETKEY123"), "{text}");
    assert!(!text.contains("generateContent"), "{text}");
}

#[tokio::test]
async fn unreachable_host_is_a_service_error() {
    // Bind then drop to get a port nothing listens on
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let client = GeminiClient::new(gemini_config(&url, 5), Some("SUPERSECRETKEY123".into())).unwrap();
    match client.query(DOC, "q", Tone::Formal).await {
        QueryResult::ServiceError(detail) => assert!(!detail.contains("SUPERSECRETKEY123"), "{detail}"),
        other => panic!("expected ServiceError, got {other:?}"),
    }
}
