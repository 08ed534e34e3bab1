use std::any::Any;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::{rejection::FormRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde_json::json;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};
use url::Url;

mod analyze;
mod config;
mod extract;
mod models;
#[cfg(test)]
mod test_support;

use analyze::GroqAnalyzer;
use config::AppConfig;
use extract::Extractor;
use models::{AnalysisOutcome, AnalyzeForm, ErrorBody};

const NO_URL: &str = "No URL provided";
const INVALID_URL: &str = "Invalid URL format. URL must start with http:// or https://";
const EXTRACTION_FAILED: &str = "Failed to extract article content";

/// Shared, read-only context handed to every request.
struct AppState {
    extractor: Extractor,
    analyzer: GroqAnalyzer,
}

impl AppState {
    fn new(config: &AppConfig) -> Self {
        Self {
            extractor: Extractor::new(config),
            analyzer: GroqAnalyzer::new(config),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = AppConfig::from_env()?;
    let state = Arc::new(AppState::new(&config));

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app(state)).await?;
    Ok(())
}

fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/analyze", post(analyze_endpoint))
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(handle_panic))
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

async fn analyze_endpoint(
    State(state): State<Arc<AppState>>,
    form: Result<Form<AnalyzeForm>, FormRejection>,
) -> Response {
    let url = match form {
        Ok(Form(AnalyzeForm { url: Some(url) })) if !url.is_empty() => url,
        _ => return bad_request(NO_URL),
    };
    if !is_valid_url(&url) {
        return bad_request(INVALID_URL);
    }

    let article = state.extractor.extract(&url).await;
    if article.is_empty() {
        return bad_request(EXTRACTION_FAILED);
    }

    match state.analyzer.analyze(&article.title, &article.body).await {
        AnalysisOutcome::Success(result) => (StatusCode::OK, Json(result)).into_response(),
        AnalysisOutcome::Failure(failure) => {
            (StatusCode::INTERNAL_SERVER_ERROR, Json(failure)).into_response()
        }
    }
}

fn is_valid_url(url: &str) -> bool {
    (url.starts_with("http://") || url.starts_with("https://")) && Url::parse(url).is_ok()
}

fn bad_request(message: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(ErrorBody::new(message))).into_response()
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown error".to_string()
    };
    tracing::error!(error = %message, "error in analysis endpoint");
    (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorBody::new(message))).into_response()
}
