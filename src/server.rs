//! JSON HTTP surface for the chat front end.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Status, version and whether RAG is ready |
//! | `POST` | `/answer` | Answer a question grounded on the index |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "query must not be empty" } }
//! ```
//!
//! Error codes: `bad_request` (400, also for a body that is not a valid
//! request), `rag_unavailable` (503).
//!
//! A query that fails after validation (backend down, timeout) is not an
//! HTTP error: the response is `200` with the localized apology as the
//! answer and `"fallback": true`.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::answer::{fallback_message, SourceRef};
use crate::app::AppContext;
use crate::config::Config;

/// Shared state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
struct AppState {
    ctx: Arc<AppContext>,
}

/// Build the router around an initialized [`AppContext`].
///
/// Separate from [`run_server`] so tests can bind an ephemeral port.
pub fn router(ctx: Arc<AppContext>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/answer", post(handle_answer))
        .layer(cors)
        .with_state(AppState { ctx })
}

/// Starts the HTTP server on `[server].bind`.
///
/// A missing or unreadable snapshot does not stop the server; `/answer`
/// then reports `rag_unavailable`.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let ctx = Arc::new(AppContext::init(config.clone()));
    let app = router(ctx);

    info!("listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    /// Machine-readable error code (e.g., `"bad_request"`).
    code: String,
    message: String,
}

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

fn rag_unavailable(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::SERVICE_UNAVAILABLE,
        code: "rag_unavailable".to_string(),
        message: message.into(),
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    /// `"ready"` or `"unavailable"`.
    rag: String,
    chunks: usize,
}

async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
    let (rag, chunks) = match state.ctx.assistant() {
        Some(rag) => ("ready", rag.index().len()),
        None => ("unavailable", 0),
    };
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        rag: rag.to_string(),
        chunks,
    })
}

// ============ POST /answer ============

#[derive(Deserialize)]
struct AnswerRequest {
    query: String,
    #[serde(default = "default_language")]
    language: String,
}

fn default_language() -> String {
    "en".to_string()
}

#[derive(Serialize)]
struct AnswerResponse {
    answer: String,
    sources: Vec<SourceRef>,
    fallback: bool,
}

async fn handle_answer(
    State(state): State<AppState>,
    payload: Result<Json<AnswerRequest>, JsonRejection>,
) -> Result<Json<AnswerResponse>, AppError> {
    let Json(req) = payload.map_err(|rejection| bad_request(rejection.body_text()))?;
    if req.query.trim().is_empty() {
        return Err(bad_request("query must not be empty"));
    }

    let rag = state
        .ctx
        .assistant()
        .ok_or_else(|| rag_unavailable("no index snapshot is loaded"))?;

    let response = match rag.answer(&req.query, &req.language).await {
        Ok(answer) => AnswerResponse {
            answer: answer.text,
            sources: answer.sources,
            fallback: false,
        },
        Err(e) => {
            warn!("answer failed: {}", e);
            AnswerResponse {
                answer: fallback_message(&req.language).to_string(),
                sources: Vec::new(),
                fallback: true,
            }
        }
    };

    Ok(Json(response))
}
