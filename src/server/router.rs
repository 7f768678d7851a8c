//! Axum router construction for the log relay

use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderValue, Method, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use log::{error, warn};
use serde::Deserialize;

use super::AppState;
use crate::events::LogRecord;

/// Build the complete router
///
/// - `POST /log`: persist a batch (array) or a single record
/// - `OPTIONS` anywhere: CORS preflight
/// - anything else: static file under the root, `/` -> `/index.html`
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/log",
            post(ingest).options(preflight).fallback(static_or_preflight),
        )
        .fallback(static_or_preflight)
        .with_state(state)
}

/// A body is either one record or an array of them
#[derive(Deserialize)]
#[serde(untagged)]
enum Batch {
    Many(Vec<LogRecord>),
    One(LogRecord),
}

/// Normalize an ingestion body to a batch
pub fn parse_batch(body: &[u8]) -> Result<Vec<LogRecord>, serde_json::Error> {
    Ok(match serde_json::from_slice(body)? {
        Batch::Many(records) => records,
        Batch::One(record) => vec![record],
    })
}

async fn ingest(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let records = match parse_batch(&body) {
        Ok(records) => records,
        Err(e) => {
            warn!("Rejected log batch: {}", e);
            return (StatusCode::BAD_REQUEST, "Bad Request").into_response();
        }
    };

    if let Err(e) = state.store.persist(&records).await {
        error!("Failed to persist {} events: {}", records.len(), e);
    }
    "ok".into_response()
}

async fn preflight() -> Response {
    (
        StatusCode::NO_CONTENT,
        [
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
            (header::ACCESS_CONTROL_ALLOW_METHODS, "POST,GET,OPTIONS"),
            (header::ACCESS_CONTROL_ALLOW_HEADERS, "Content-Type"),
        ],
    )
        .into_response()
}

async fn static_or_preflight(
    State(state): State<Arc<AppState>>,
    method: Method,
    uri: Uri,
) -> Response {
    if method == Method::OPTIONS {
        return preflight().await;
    }
    serve_static(&state.root, uri.path()).await
}

/// Map a request path onto the root with `..` sequences stripped
pub fn resolve_static_path(root: &Path, request_path: &str) -> PathBuf {
    let path = if request_path == "/" {
        "/index.html".to_string()
    } else {
        request_path.replace("..", "")
    };
    root.join(path.trim_start_matches('/'))
}

/// Content type by extension
pub fn content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("html") => "text/html",
        Some("js") => "application/javascript",
        _ => "application/octet-stream",
    }
}

async fn serve_static(root: &Path, request_path: &str) -> Response {
    let path = resolve_static_path(root, request_path);
    match tokio::fs::read(&path).await {
        Ok(bytes) => (
            [(
                header::CONTENT_TYPE,
                HeaderValue::from_static(content_type(&path)),
            )],
            bytes,
        )
            .into_response(),
        Err(_) => (StatusCode::NOT_FOUND, "Not Found").into_response(),
    }
}
