//! HTTP service for random cards and attempt recording.
//!
//! Routes:
//! - `GET /`              front-end page
//! - `GET /api`           endpoint listing
//! - `GET /card`          one random card from the cached set
//! - `POST /cards/reload` drop the cache and fetch again
//! - `POST /attempt`      append `{card_id, correct}` to the attempt log
//! - `GET /static/*`      files from the configured static directory

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::services::ServeDir;

use crate::cards::{choose_random, Card, CardSourceError};
use crate::config::Config;
use crate::AppState;

const INDEX_HTML: &str = include_str!("../static/index.html");

/// Body of `POST /attempt`.
#[derive(Debug, Deserialize)]
pub struct AttemptRequest {
    pub card_id: String,
    pub correct: bool,
}

#[derive(Debug, Serialize)]
pub struct AttemptResponse {
    pub message: String,
    pub card_id: String,
    pub correct: bool,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Errors surfaced to HTTP clients as `{"detail": "..."}`.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("No cards available")]
    NoCards,

    #[error("{0}")]
    FetchCard(CardSourceError),

    #[error("Error reloading cards: {0}")]
    Reload(CardSourceError),

    #[error("Error recording attempt: {0}")]
    RecordAttempt(String),

    #[error("{0}")]
    InvalidBody(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::NoCards => StatusCode::NOT_FOUND,
            ApiError::InvalidBody(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::FetchCard(_) | ApiError::Reload(_) | ApiError::RecordAttempt(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidBody(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

/// Build the application router.
pub fn router(state: Arc<AppState>, static_dir: &Path) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api", get(api_info))
        .route("/card", get(random_card))
        .route("/cards/reload", post(reload_cards))
        .route("/attempt", post(record_attempt))
        .nest_service("/static", ServeDir::new(static_dir))
        .with_state(state)
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn api_info() -> Json<serde_json::Value> {
    Json(json!({
        "message": "German Learning Cards API",
        "endpoints": {
            "/card": "Get a random learning card",
            "/cards/reload": "Reload cards from Google Sheets",
            "/attempt": "Record whether a card was answered correctly",
        }
    }))
}

async fn random_card(State(state): State<Arc<AppState>>) -> Result<Json<Card>, ApiError> {
    let cards = state.cards.get_cards().await.map_err(|e| {
        log::error!("Failed to load cards: {}", e);
        ApiError::FetchCard(e)
    })?;

    let card = choose_random(&cards).cloned().ok_or(ApiError::NoCards)?;
    Ok(Json(card))
}

async fn reload_cards(State(state): State<Arc<AppState>>) -> Result<Json<MessageResponse>, ApiError> {
    let cards = state.cards.reload().await.map_err(|e| {
        log::error!("Failed to reload cards: {}", e);
        ApiError::Reload(e)
    })?;

    log::info!("Reloaded {} cards", cards.len());
    Ok(Json(MessageResponse {
        message: format!("Successfully reloaded {} cards", cards.len()),
    }))
}

async fn record_attempt(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AttemptRequest>, JsonRejection>,
) -> Result<Json<AttemptResponse>, ApiError> {
    let Json(attempt) = payload?;

    let attempts = Arc::clone(&state.attempts);
    let card_id = attempt.card_id.clone();
    let correct = attempt.correct;

    let record = tokio::task::spawn_blocking(move || attempts.record_attempt(&card_id, correct))
        .await
        .map_err(|e| ApiError::RecordAttempt(e.to_string()))?
        .map_err(|e| {
            log::error!("Failed to record attempt for card {}: {}", attempt.card_id, e);
            ApiError::RecordAttempt(e.to_string())
        })?;

    log::info!(
        "Recorded attempt {} for card {} (correct: {})",
        record.id,
        record.card_id,
        record.correct
    );

    Ok(Json(AttemptResponse {
        message: "Attempt recorded successfully".to_string(),
        card_id: record.card_id,
        correct: record.correct,
    }))
}

/// Handle for a running server.
pub struct CardServer {
    pub addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl CardServer {
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Ask the server to stop accepting connections.
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }

    /// Wait until the server task has finished.
    pub async fn wait(self) {
        if let Err(e) = self.task.await {
            log::error!("Card server task failed: {}", e);
        }
    }
}

/// Bind the configured address and start serving in a background task.
pub async fn start_server(
    config: &Config,
    state: Arc<AppState>,
) -> Result<CardServer, Box<dyn std::error::Error + Send + Sync>> {
    let app = router(state, &config.static_dir);

    let listener = TcpListener::bind(config.bind_address()).await?;
    let addr = listener.local_addr()?;
    log::info!("Card server listening on http://{}", addr);

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let task = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                log::info!("Card server shutting down");
            })
            .await
            .ok();
    });

    Ok(CardServer {
        addr,
        shutdown_tx: Some(shutdown_tx),
        task,
    })
}
