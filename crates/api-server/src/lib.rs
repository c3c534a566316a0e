use std::sync::Arc;

use analysis_core::{AnalysisError, AnalysisResult, Indicators, Valuation};
use analysis_orchestrator::{AnalysisCache, AnalysisOrchestrator};
use anyhow::Context;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use quote_client::YahooClient;
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;

pub mod config;
mod request_id;
mod security_headers;
mod stock_routes;

pub use config::ServerConfig;
use request_id::request_id_middleware;
use security_headers::security_headers_middleware;
pub use security_headers::SecurityHeaders;

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<AnalysisOrchestrator>,
}

/// JSON error payload: `{ "error": "..." }`.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug)]
pub enum AppError {
    MissingTicker,
    Analysis(AnalysisError),
}

impl From<AnalysisError> for AppError {
    fn from(err: AnalysisError) -> Self {
        AppError::Analysis(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::MissingTicker => (StatusCode::BAD_REQUEST, "Ticker symbol is required".to_string()),
            AppError::Analysis(err) if err.is_not_found() => (StatusCode::NOT_FOUND, err.to_string()),
            AppError::Analysis(err) => {
                // Details stay in the logs
                tracing::error!("Analysis failed: {}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
            }
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(stock_routes::analyze_stock),
    components(schemas(AnalysisResult, Indicators, Valuation, ErrorBody)),
    tags((name = "Stocks", description = "Fundamental valuation of listed stocks"))
)]
pub struct ApiDoc;

/// Assemble the application router with its middleware stack.
pub fn build_router(state: AppState, security: SecurityHeaders) -> Router {
    Router::new()
        .merge(stock_routes::stock_routes())
        .route("/health", get(health))
        .route("/api-docs/openapi.json", get(openapi_json))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(CorsLayer::permissive())
                .map_response(IntoResponse::into_response)
                .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                    )
                }))
                .layer(middleware::from_fn(request_id_middleware))
                .layer(middleware::from_fn_with_state(security, security_headers_middleware)),
        )
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

pub fn init_tracing() {
    let json_logging = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    if json_logging {
        tracing_subscriber::fmt().json().with_env_filter(env_filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }
}

/// Periodically drop expired cache entries that are never read again.
fn spawn_cache_sweeper(cache: Arc<AnalysisCache>) {
    let period = cache.ttl();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.tick().await;
        loop {
            interval.tick().await;
            let removed = cache.purge_expired();
            if removed > 0 {
                tracing::debug!("Purged {} expired analyses ({} cached)", removed, cache.len());
            }
        }
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
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
    tracing::info!("Shutdown signal received");
}

pub async fn run_server() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ServerConfig::from_env()?;
    tracing::info!("Starting stock analysis API");
    tracing::info!("  Cache TTL: {}s", config.cache_ttl.as_secs());
    tracing::info!("  Quote provider: {}", config.quote_client.base_url);
    tracing::info!(
        "  Upstream pacing: {}ms between calls, 1 in flight",
        config.quote_client.min_interval.as_millis()
    );

    let quote_client = YahooClient::new(config.quote_client.clone())
        .context("failed to build quote client")?;

    let cache = Arc::new(AnalysisCache::new(config.cache_ttl));
    spawn_cache_sweeper(Arc::clone(&cache));

    let state = AppState {
        orchestrator: Arc::new(AnalysisOrchestrator::new(Arc::new(quote_client), cache)),
    };
    let app = build_router(state, SecurityHeaders { hsts: config.enable_hsts });

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}
