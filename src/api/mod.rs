//! Local HTTP chat API.
//!
//! The chat handler is the recoverable-error boundary: anything a task run
//! raises is rendered into the transcript as an error message and the
//! session stays usable. Everything above it (startup) is fail-fast.

use crate::error::Result;
use crate::executor;
use crate::profiles::{self, DEFAULT_PROFILE};
use crate::session::ChatMessage;
use crate::state::AppState;
use axum::{
    extract::{Path as AxumPath, State},
    http::StatusCode,
    response::Html,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

pub type ApiState = Arc<AppState>;
pub type ApiResult<T> = std::result::Result<T, (StatusCode, String)>;

const CHAT_PAGE: &str = include_str!("../../assets/index.html");

/// Success marker appended to every completed turn's reply.
pub const SUCCESS_MARKER: &str = "Task completed successfully.";

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    /// Omitted or empty: a new session is created
    #[serde(default)]
    pub session_id: Option<String>,
    /// Omitted or empty: the default profile
    #[serde(default)]
    pub profile: Option<String>,
    /// Free-form natural-language task; passed through unvalidated
    pub task: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub session_id: String,
    pub message: ChatMessage,
}

async fn chat_page() -> Html<&'static str> {
    Html(CHAT_PAGE)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn list_profiles(State(state): State<ApiState>) -> Json<Vec<String>> {
    Json(profiles::list_profiles(&state.settings.user_data_dir))
}

async fn session_messages(
    State(state): State<ApiState>,
    AxumPath(id): AxumPath<String>,
) -> Json<Vec<ChatMessage>> {
    Json(state.sessions.messages(&id))
}

/// One chat turn: append the user message, run the task, append the reply
/// (log tail + success marker) or an error marker, return the reply.
async fn chat(
    State(state): State<ApiState>,
    Json(req): Json<ChatRequest>,
) -> ApiResult<Json<ChatResponse>> {
    let session_id = req
        .session_id
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let profile = req
        .profile
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| DEFAULT_PROFILE.to_string());

    // One task at a time; later turns queue here.
    let _turn = state.turn_lock.lock().await;

    state
        .sessions
        .append(&session_id, ChatMessage::user(req.task.clone()));

    tracing::info!("Running task for session {} on profile {:?}", session_id, profile);
    let message =
        match executor::execute_task(&state.settings, &state.api_key, &req.task, &profile).await {
            Ok(summary) => {
                let content = if summary.is_empty() {
                    SUCCESS_MARKER.to_string()
                } else {
                    format!("{}\n{}", summary, SUCCESS_MARKER)
                };
                ChatMessage::assistant(content)
            }
            Err(e) => {
                tracing::error!("Task failed: {}", e);
                ChatMessage::assistant_error(format!("Error: {}", e))
            }
        };
    state.sessions.append(&session_id, message.clone());

    Ok(Json(ChatResponse {
        session_id,
        message,
    }))
}

pub fn router() -> Router<ApiState> {
    Router::new()
        .route("/", get(chat_page))
        .route("/api/health", get(health))
        .route("/api/profiles", get(list_profiles))
        .route("/api/sessions/:id/messages", get(session_messages))
        .route("/api/chat", post(chat))
}

/// Build the full app (router + CORS + concurrency limit).
pub fn app(state: ApiState) -> Router {
    use tower::limit::ConcurrencyLimitLayer;
    router()
        .with_state(state)
        .layer(ConcurrencyLimitLayer::new(32))
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
                .allow_headers([axum::http::header::CONTENT_TYPE]),
        )
}

pub async fn run_server(state: ApiState, port: u16) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
    let app = app(state);
    tracing::info!("webpilot chat listening on http://127.0.0.1:{}", port);
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use axum::body::Body;
    use axum::http::Request;
    use tower::util::ServiceExt;

    fn make_state(settings: Settings) -> ApiState {
        AppState::new(settings, "test-key".to_string())
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let app = app(make_state(Settings::default()));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_profiles_listing_sorted() {
        let root = tempfile::tempdir().unwrap();
        for name in ["Default", "Work", "Alpha"] {
            std::fs::create_dir(root.path().join(name)).unwrap();
        }
        let settings = Settings {
            user_data_dir: root.path().to_path_buf(),
            ..Settings::default()
        };

        let app = app(make_state(settings));
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
        assert_eq!(
            body_json(response).await,
            serde_json::json!(["Alpha", "Default", "Work"])
        );
    }

    #[tokio::test]
    async fn test_unknown_session_is_empty() {
        let app = app(make_state(Settings::default()));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/sessions/nope/messages")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_chat_page_served() {
        let app = app(make_state(Settings::default()));
        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
