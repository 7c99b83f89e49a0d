//! HTTP surface: single-page UI, metadata endpoint, and the audio download stream.
//!
//! Runs on WEB_HOST:WEB_PORT (default 0.0.0.0:3000).

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::{
    Router,
    body::Body,
    extract::{Query, State, rejection::JsonRejection},
    http::{HeaderValue, StatusCode, header},
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::timeout::TimeoutLayer;

use yt2m4a_core::extractor::filename::content_disposition;
use yt2m4a_core::{AppError, AudioDownload, AudioRelay, ExtractorConfig, MetadataFetcher, ValidatedUrl, WebConfig};

const INDEX_HTML: &str = include_str!("../static/index.html");

/// Client text for unclassified metadata failures
const INFO_FALLBACK_MESSAGE: &str = "Failed to fetch video info. Please try again.";

/// Client text for download failures before the first byte
const DOWNLOAD_FALLBACK_MESSAGE: &str = "Download failed";

/// Shared state for the web server.
#[derive(Clone)]
pub struct WebState {
    fetcher: MetadataFetcher,
    relay: AudioRelay,
}

impl WebState {
    pub fn new(config: Arc<ExtractorConfig>) -> Self {
        Self {
            fetcher: MetadataFetcher::new(Arc::clone(&config)),
            relay: AudioRelay::new(config),
        }
    }
}

#[derive(Debug, Deserialize)]
struct InfoRequest {
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DownloadQuery {
    url: Option<String>,
}

/// Builds the application router.
///
/// `request_timeout` bounds how long a handler may take to produce its response.
/// A download body that is already streaming is not cut by it.
pub fn router(state: WebState, request_timeout: Duration) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/api/info", post(info_handler))
        .route("/api/download", get(download_handler))
        .route("/health", get(health_handler))
        .layer(TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, request_timeout))
        .with_state(state)
}

/// Start the web server and serve until Ctrl-C or SIGTERM.
pub async fn start_web_server(config: &WebConfig, state: WebState) -> anyhow::Result<()> {
    let addr = config.bind_addr();
    let app = router(state, config.request_timeout);

    log::info!("Starting web server on http://{}", addr);
    log::info!("  /              - UI (HTML)");
    log::info!("  /api/info      - Video metadata (JSON)");
    log::info!("  /api/download  - Audio stream (audio/mp4)");
    log::info!("  /health        - Health check");

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log::info!("Web server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                log::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    log::info!("Shutting down gracefully...");
}

/// GET / - the single-page UI.
async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// POST /api/info - `{ url }` → video metadata.
async fn info_handler(State(state): State<WebState>, payload: Result<Json<InfoRequest>, JsonRejection>) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            log::warn!("Rejected /api/info body: {}", rejection.body_text());
            return json_error(StatusCode::BAD_REQUEST, "Invalid request body");
        }
    };

    let url = match ValidatedUrl::parse(request.url.as_deref().unwrap_or_default()) {
        Ok(url) => url,
        Err(e) => return info_error(&e),
    };

    match state.fetcher.fetch(&url).await {
        Ok(metadata) => Json(metadata).into_response(),
        Err(e) => {
            log::error!("Info error for {} (input {:?}): {}", url, url.raw(), e);
            info_error(&e)
        }
    }
}

/// GET /api/download?url=... - streams the audio as an attachment.
async fn download_handler(State(state): State<WebState>, Query(query): Query<DownloadQuery>) -> Response {
    let candidate = query.url.unwrap_or_default();

    match state.relay.open(&candidate).await {
        Ok(download) => audio_response(download),
        Err(e) => {
            if !matches!(e, AppError::InvalidInput(_)) {
                log::error!("Download error for {}: {}", candidate.trim(), e);
            }
            (status_of(&e), e.client_message(DOWNLOAD_FALLBACK_MESSAGE)).into_response()
        }
    }
}

/// GET /health - simple health check.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

fn audio_response(download: AudioDownload) -> Response {
    let disposition = match HeaderValue::from_str(&content_disposition(&download.filename)) {
        Ok(value) => value,
        Err(e) => {
            // Percent-encoding keeps the value ASCII, so this should not happen.
            log::error!("Invalid Content-Disposition for {:?}: {}", download.filename, e);
            HeaderValue::from_static("attachment; filename=\"audio.m4a\"")
        }
    };

    (
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("audio/mp4")),
            (header::CONTENT_DISPOSITION, disposition),
            (header::CACHE_CONTROL, HeaderValue::from_static("no-cache, no-store, must-revalidate")),
            (header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff")),
        ],
        Body::from_stream(download.body),
    )
        .into_response()
}

fn info_error(err: &AppError) -> Response {
    json_error(status_of(err), &err.client_message(INFO_FALLBACK_MESSAGE))
}

fn json_error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

fn status_of(err: &AppError) -> StatusCode {
    StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}
