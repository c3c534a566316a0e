use analysis_core::{AnalysisError, AnalysisResult, QuoteProvider, DEFAULT_CURRENCY};
use chrono::Utc;
use fundamental_analysis::{format_decimal, to_decimal, FundamentalAnalysisEngine};
use std::sync::Arc;

pub mod cache;
pub use cache::{AnalysisCache, DEFAULT_CACHE_TTL};

/// Runs the valuation pipeline for a ticker: cache lookup, upstream fetch,
/// field normalization, ratio computation and cache population.
pub struct AnalysisOrchestrator {
    quote_provider: Arc<dyn QuoteProvider>,
    fundamental_analyzer: FundamentalAnalysisEngine,
    cache: Arc<AnalysisCache>,
}

impl AnalysisOrchestrator {
    pub fn new(quote_provider: Arc<dyn QuoteProvider>, cache: Arc<AnalysisCache>) -> Self {
        Self {
            quote_provider,
            fundamental_analyzer: FundamentalAnalysisEngine::new(),
            cache,
        }
    }

    pub fn cache(&self) -> &Arc<AnalysisCache> {
        &self.cache
    }

    /// Analyze a ticker, serving from cache when a fresh result exists.
    ///
    /// Upstream failures other than "not found" are returned unchanged.
    pub async fn perform_analysis(&self, ticker: &str) -> Result<Arc<AnalysisResult>, AnalysisError> {
        let ticker = ticker.to_uppercase();

        if let Some(cached) = self.cache.get(&ticker) {
            tracing::debug!("Cache hit for {}", ticker);
            return Ok(cached);
        }

        tracing::debug!("Cache miss for {}, fetching quote summary", ticker);
        let record = self
            .quote_provider
            .fetch_quote(&ticker)
            .await?
            .ok_or_else(|| AnalysisError::NotFound(ticker.clone()))?;

        let price = record
            .current_price()
            .and_then(to_decimal)
            .filter(|p| p.is_sign_positive() && !p.is_zero())
            .ok_or_else(|| AnalysisError::InsufficientData(ticker.clone()))?;

        let currency = record.currency().unwrap_or(DEFAULT_CURRENCY).to_string();
        let eps = record.trailing_eps().and_then(to_decimal);
        let price_to_book = record.price_to_book().and_then(to_decimal);

        let valuation = self.fundamental_analyzer.evaluate(price, eps, price_to_book);

        let result = Arc::new(AnalysisResult {
            ticker: ticker.clone(),
            currency,
            price: format_decimal(price),
            analysis: valuation.analysis,
            indicators: valuation.indicators,
            generated_at: Utc::now(),
        });

        tracing::info!(
            "Analyzed {}: price={} pe={} -> {}",
            ticker,
            result.price,
            result.indicators.pe_ratio,
            result.analysis
        );

        self.cache.set(ticker, Arc::clone(&result));
        Ok(result)
    }
}
