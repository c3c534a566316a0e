//! Stock Valuation API Routes

use analysis_core::AnalysisResult;
use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};

use crate::{AppError, AppState, ErrorBody};

pub fn stock_routes() -> Router<AppState> {
    Router::new()
        .route("/api/stocks/analyze/:ticker", get(analyze_stock))
        .route("/api/stocks/analyze", get(missing_ticker))
        .route("/api/stocks/analyze/", get(missing_ticker))
}

#[utoipa::path(
    get,
    path = "/api/stocks/analyze/{ticker}",
    params(("ticker" = String, Path, description = "Stock ticker symbol (case-insensitive)")),
    responses(
        (status = 200, description = "Valuation analysis", body = AnalysisResult),
        (status = 400, description = "Ticker symbol missing", body = ErrorBody),
        (status = 404, description = "Ticker unknown to the quote provider", body = ErrorBody),
        (status = 500, description = "Upstream or data failure", body = ErrorBody),
    ),
    tag = "Stocks"
)]
pub async fn analyze_stock(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
) -> Result<Json<AnalysisResult>, AppError> {
    if ticker.is_empty() {
        return Err(AppError::MissingTicker);
    }

    let result = state.orchestrator.perform_analysis(&ticker).await?;
    Ok(Json(AnalysisResult::clone(&result)))
}

async fn missing_ticker() -> AppError {
    AppError::MissingTicker
}
