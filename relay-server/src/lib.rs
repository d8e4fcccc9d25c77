//! HTTP surface of the placement relay.
//!
//! `POST /analyse` forwards a scoring request to the model and answers with
//! the JSON it found; `POST /save` appends finished results to the store.
//! Errors are always `{"error": "<message>"}`.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use placement_core::{AnalyseRequest, Relay, RelayError, ResultsSummary};
use serde_json::json;
use tracing::{info, warn};

pub fn app(relay: Arc<Relay>, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/analyse", post(analyse))
        .route("/save", post(save))
        .route("/healthz", get(healthz))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .with_state(relay)
}

pub async fn serve(relay: Arc<Relay>, bind: &str, max_body_bytes: usize) -> anyhow::Result<()> {
    let addr: SocketAddr = bind
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid bind address {bind}: {e}"))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "placement relay listening");
    axum::serve(listener, app(relay, max_body_bytes)).await?;
    Ok(())
}

async fn analyse(State(relay): State<Arc<Relay>>, body: Bytes) -> Response {
    let request = match AnalyseRequest::from_slice(&body) {
        Ok(r) => r,
        Err(err) => return error_response(&err),
    };
    match relay.analyse(request).await {
        Ok(value) => (StatusCode::OK, Json(value)).into_response(),
        Err(err) => error_response(&err),
    }
}

async fn save(State(relay): State<Arc<Relay>>, body: Bytes) -> Response {
    let results: ResultsSummary = match serde_json::from_slice(&body) {
        Ok(r) => r,
        Err(e) => {
            return error_response(&RelayError::BadRequest(format!("results record: {e}")));
        }
    };
    match relay.save(results).await {
        Ok(stored) => (StatusCode::OK, Json(json!({ "id": stored.id }))).into_response(),
        Err(err) => error_response(&err),
    }
}

async fn healthz() -> &'static str {
    "ok"
}

fn error_response(err: &RelayError) -> Response {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    warn!(status = status.as_u16(), error = %err, "request failed");
    (status, Json(json!({ "error": err.user_message() }))).into_response()
}
