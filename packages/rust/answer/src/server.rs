//! HTTP surface for the answer service.
//!
//! `POST /chat` takes `{"query_text": "..."}` and returns
//! `{"response": "..."}`. CORS is wide open: the expected consumer is a
//! public web widget.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use tramitero_shared::{Result, TramiteroError};

use crate::service::AnswerService;

#[derive(Clone)]
struct AppState {
    service: Arc<AnswerService>,
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ChatQuery {
    query_text: String,
}

#[derive(Debug, Serialize)]
struct ChatReply {
    response: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    sources: Vec<String>,
}

#[derive(Debug, Serialize)]
struct Welcome {
    message: &'static str,
}

// ---------------------------------------------------------------------------
// Router / serve
// ---------------------------------------------------------------------------

/// Build the HTTP router over an answer service.
pub fn router(service: Arc<AnswerService>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/chat", post(chat))
        .layer(CorsLayer::permissive())
        .with_state(AppState { service })
}

/// Bind and serve until the process is stopped.
pub async fn serve(addr: SocketAddr, service: Arc<AnswerService>) -> Result<()> {
    let app = router(service);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| TramiteroError::Network(format!("bind {addr}: {e}")))?;

    info!(%addr, "answer service listening");

    axum::serve(listener, app)
        .await
        .map_err(|e| TramiteroError::Network(format!("server error: {e}")))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn root() -> Json<Welcome> {
    Json(Welcome {
        message: "Bienvenido al Asistente Inteligente de Trámites. Usa el endpoint /chat.",
    })
}

async fn chat(
    State(state): State<AppState>,
    Json(query): Json<ChatQuery>,
) -> std::result::Result<Json<ChatReply>, (StatusCode, String)> {
    match state.service.answer(&query.query_text).await {
        Ok(answer) => Ok(Json(ChatReply {
            response: answer.response,
            sources: answer.sources,
        })),
        Err(e) => {
            error!(error = %e, "chat request failed");
            Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    use tramitero_index::MemoryIndex;
    use tramitero_llm::CompletionClient;

    use crate::prompts::NOT_FOUND_MESSAGE;

    fn test_router() -> Router {
        // Completion endpoint points at a closed port: the rewrite call fails
        // (degrading to the raw question) and the empty index short-circuits
        // before any answer completion is attempted.
        let llm = CompletionClient::new("http://127.0.0.1:9", "test-key", "llama3-8b-8192")
            .expect("client");
        let service = AnswerService::new(Arc::new(MemoryIndex::new()), llm, 4);
        router(Arc::new(service))
    }

    #[tokio::test]
    async fn root_returns_welcome() {
        let response = test_router()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn chat_round_trips_json() {
        let request = Request::builder()
            .method("POST")
            .uri("/chat")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"query_text": "¿cómo saco la cédula?"}"#))
            .unwrap();

        let response = test_router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let reply: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(reply["response"], NOT_FOUND_MESSAGE);
    }

    #[tokio::test]
    async fn chat_rejects_malformed_payload() {
        let request = Request::builder()
            .method("POST")
            .uri("/chat")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"wrong_field": true}"#))
            .unwrap();

        let response = test_router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
