//! Chat API integration tests.
//!
//! These run fully offline: the CDP probe points at a loopback port nobody
//! listens on and the Chrome path points at a nonexistent binary, so a chat
//! turn deterministically fails inside the executor and exercises the
//! error boundary. Tests needing a live Chrome or the Gemini API are out of
//! scope here.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use std::path::PathBuf;
use tower::util::ServiceExt;
use webpilot::api;
use webpilot::config::Settings;
use webpilot::session::{ChatMessage, Role};
use webpilot::state::AppState;

/// Reserve a loopback port and free it, so connecting gets refused fast.
fn unreachable_cdp_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{}", port)
}

fn offline_settings(user_data_dir: PathBuf) -> Settings {
    Settings {
        chrome_path: PathBuf::from("/nonexistent/webpilot-test-chrome"),
        user_data_dir,
        cdp_url: unreachable_cdp_url(),
        ..Settings::default()
    }
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn chat_request(session_id: Option<&str>, profile: &str, task: &str) -> Request<Body> {
    let body = serde_json::json!({
        "session_id": session_id,
        "profile": profile,
        "task": task,
    });
    Request::builder()
        .method("POST")
        .uri("/api/chat")
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

#[tokio::test]
async fn failing_turn_appends_one_error_message_and_preserves_history() {
    let root = tempfile::tempdir().unwrap();
    let state = AppState::new(offline_settings(root.path().to_path_buf()), "k".to_string());

    // Seed a prior turn
    state.sessions.append("s1", ChatMessage::user("earlier task"));
    state
        .sessions
        .append("s1", ChatMessage::assistant("earlier reply"));
    let before = state.sessions.messages("s1");

    let app = api::app(state.clone());
    let response = app
        .oneshot(chat_request(Some("s1"), "Default", "open example.com"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["session_id"], "s1");
    assert_eq!(json["message"]["role"], "assistant");
    assert_eq!(json["message"]["error"], true);
    let content = json["message"]["content"].as_str().unwrap();
    assert!(content.starts_with("Error: "), "got: {}", content);

    // Prior messages untouched; exactly user + one error message appended
    let after = state.sessions.messages("s1");
    assert_eq!(after.len(), before.len() + 2);
    for (a, b) in before.iter().zip(after.iter()) {
        assert_eq!(a.content, b.content);
        assert_eq!(a.role, b.role);
    }
    assert_eq!(after[before.len()].role, Role::User);
    assert_eq!(after[before.len()].content, "open example.com");
    let error_msg = &after[before.len() + 1];
    assert!(error_msg.error);
    assert!(error_msg.content.contains("Error: "));
    assert_eq!(
        after.iter().filter(|m| m.error).count(),
        1,
        "exactly one error message expected"
    );
}

#[tokio::test]
async fn chat_without_session_id_creates_session() {
    let root = tempfile::tempdir().unwrap();
    let state = AppState::new(offline_settings(root.path().to_path_buf()), "k".to_string());

    let app = api::app(state.clone());
    let response = app
        .oneshot(chat_request(None, "Default", "do something"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let session_id = json["session_id"].as_str().unwrap().to_string();
    assert!(!session_id.is_empty());

    // The transcript holds the user message and the error reply
    let messages = state.sessions.messages(&session_id);
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, Role::User);
    assert_eq!(messages[1].role, Role::Assistant);
    assert!(messages[1].error);
}

#[tokio::test]
async fn session_transcript_readable_over_api() {
    let root = tempfile::tempdir().unwrap();
    let state = AppState::new(offline_settings(root.path().to_path_buf()), "k".to_string());
    state.sessions.append("s9", ChatMessage::user("hello"));

    let app = api::app(state);
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/sessions/s9/messages")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let messages = json.as_array().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["role"], "user");
    assert_eq!(messages[0]["content"], "hello");
}

#[tokio::test]
async fn profiles_endpoint_falls_back_to_default() {
    let state = AppState::new(
        offline_settings(PathBuf::from("/nonexistent/chrome-user-data")),
        "k".to_string(),
    );

    let app = api::app(state);
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/profiles")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, serde_json::json!(["Default"]));
}
