use async_trait::async_trait;
use crate::{AnalysisError, RawQuoteRecord};

/// Source of raw quote summaries.
///
/// `Ok(None)` means the provider does not know the ticker. Implementations
/// are responsible for their own outbound pacing.
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    async fn fetch_quote(&self, ticker: &str) -> Result<Option<RawQuoteRecord>, AnalysisError>;
}
