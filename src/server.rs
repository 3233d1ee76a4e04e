//! HTTP chat server.
//!
//! Exposes the session registry as a small JSON API so a web or mobile
//! front end can hold conversations with Solace.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/sessions/{id}/messages` | Submit `{ "text": ... }`, get the reply |
//! | `POST` | `/sessions/{id}/reset` | Reset state and transcript |
//! | `DELETE` | `/sessions/{id}` | End the session and drop it |
//! | `GET`  | `/sessions/{id}/transcript` | Ordered transcript entries |
//! | `GET`  | `/sessions/{id}/state` | Conversation state snapshot |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! Sessions are created by their first message and live until ended or
//! idle for longer than `[server].session_idle_secs`.
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "text must not be empty" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted to support browser-based
//! clients.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};

use solace_core::ConversationState;

use crate::config::Config;
use crate::session::{SessionRegistry, TranscriptEntry, TurnOutcome};

/// Longest accepted message, in characters.
const MAX_MESSAGE_CHARS: usize = 4000;

/// Starts the HTTP server on `[server].bind` and runs until the process is
/// terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let registry = Arc::new(SessionRegistry::from_config(config)?);
    if !registry.responder_available() {
        tracing::info!("external responder disabled; replies are rule-based only");
    }

    let sweep = registry.clone();
    let every = Duration::from_secs(config.server.session_idle_secs.div_ceil(4).max(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            sweep.evict_idle().await;
        }
    });

    let app = router(registry);

    let bind_addr = &config.server.bind;
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    println!("Solace listening on http://{}", bind_addr);
    tracing::info!(bind = %bind_addr, "server started");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Build the application router over an existing registry.
pub fn router(registry: Arc<SessionRegistry>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/sessions/{id}", delete(handle_end))
        .route("/sessions/{id}/messages", post(handle_message))
        .route("/sessions/{id}/reset", post(handle_reset))
        .route("/sessions/{id}/transcript", get(handle_transcript))
        .route("/sessions/{id}/state", get(handle_state))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(registry)
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found".to_string(),
        message: message.into(),
    }
}

fn unknown_session(id: &str) -> AppError {
    not_found(format!("no session with id: {}", id))
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    external_responder: bool,
}

async fn handle_health(State(registry): State<Arc<SessionRegistry>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        external_responder: registry.responder_available(),
    })
}

// ============ POST /sessions/{id}/messages ============

#[derive(Deserialize)]
struct MessageRequest {
    text: String,
}

/// Returns `400` for blank or oversized text. The reply is always produced;
/// external failures only add a `notice`.
async fn handle_message(
    State(registry): State<Arc<SessionRegistry>>,
    Path(id): Path<String>,
    Json(req): Json<MessageRequest>,
) -> Result<Json<TurnOutcome>, AppError> {
    if req.text.trim().is_empty() {
        return Err(bad_request("text must not be empty"));
    }
    if req.text.chars().count() > MAX_MESSAGE_CHARS {
        return Err(bad_request(format!(
            "text must be at most {} characters",
            MAX_MESSAGE_CHARS
        )));
    }

    Ok(Json(registry.submit_message(&id, &req.text).await))
}

// ============ POST /sessions/{id}/reset ============

#[derive(Serialize)]
struct ResetResponse {
    reset: bool,
}

async fn handle_reset(
    State(registry): State<Arc<SessionRegistry>>,
    Path(id): Path<String>,
) -> Result<Json<ResetResponse>, AppError> {
    if registry.reset_session(&id).await {
        Ok(Json(ResetResponse { reset: true }))
    } else {
        Err(unknown_session(&id))
    }
}

// ============ DELETE /sessions/{id} ============

#[derive(Serialize)]
struct EndResponse {
    ended: bool,
}

async fn handle_end(
    State(registry): State<Arc<SessionRegistry>>,
    Path(id): Path<String>,
) -> Result<Json<EndResponse>, AppError> {
    if registry.end_session(&id).await {
        Ok(Json(EndResponse { ended: true }))
    } else {
        Err(unknown_session(&id))
    }
}

// ============ GET /sessions/{id}/transcript ============

#[derive(Serialize)]
struct TranscriptResponse {
    entries: Vec<TranscriptEntry>,
}

async fn handle_transcript(
    State(registry): State<Arc<SessionRegistry>>,
    Path(id): Path<String>,
) -> Result<Json<TranscriptResponse>, AppError> {
    let entries = registry
        .transcript(&id)
        .await
        .ok_or_else(|| unknown_session(&id))?;
    Ok(Json(TranscriptResponse { entries }))
}

// ============ GET /sessions/{id}/state ============

async fn handle_state(
    State(registry): State<Arc<SessionRegistry>>,
    Path(id): Path<String>,
) -> Result<Json<ConversationState>, AppError> {
    registry
        .state(&id)
        .await
        .map(Json)
        .ok_or_else(|| unknown_session(&id))
}
