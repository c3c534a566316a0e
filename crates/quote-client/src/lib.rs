use analysis_core::{AnalysisError, QuoteProvider, RawQuoteRecord};
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use std::sync::Mutex;
use std::time::Duration;

mod rate_limiter;

pub use rate_limiter::{RateLimitSlot, RateLimiter};

const DEFAULT_BASE_URL: &str = "https://query2.finance.yahoo.com";
const DEFAULT_COOKIE_URL: &str = "https://fc.yahoo.com";
const SUMMARY_MODULES: &str = "financialData,defaultKeyStatistics,summaryDetail";
const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

#[derive(Debug, Clone)]
pub struct QuoteClientConfig {
    /// Root of the quote API (`/v10/finance/quoteSummary`, `/v1/test/getcrumb`).
    pub base_url: String,
    /// Page visited to obtain the session cookie.
    pub cookie_url: String,
    /// Minimum spacing between the starts of two upstream calls.
    pub min_interval: Duration,
    pub request_timeout: Duration,
}

impl Default for QuoteClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            cookie_url: DEFAULT_COOKIE_URL.to_string(),
            min_interval: Duration::from_millis(333),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Yahoo Finance `quoteSummary` client.
///
/// Yahoo requires a session cookie plus a matching crumb token on every
/// summary request. Both are fetched lazily and the crumb is cached until the
/// API rejects it.
pub struct YahooClient {
    client: Client,
    base_url: Url,
    cookie_url: String,
    crumb: Mutex<Option<String>>,
    rate_limiter: RateLimiter,
}

impl YahooClient {
    pub fn new(config: QuoteClientConfig) -> Result<Self, AnalysisError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| AnalysisError::ApiError(format!("invalid base url {}: {}", config.base_url, e)))?;

        let client = Client::builder()
            .timeout(config.request_timeout)
            .cookie_store(true)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| AnalysisError::ApiError(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            cookie_url: config.cookie_url,
            crumb: Mutex::new(None),
            rate_limiter: RateLimiter::new(config.min_interval),
        })
    }

    fn cached_crumb(&self) -> Option<String> {
        self.crumb.lock().ok().and_then(|c| c.clone())
    }

    fn store_crumb(&self, crumb: Option<String>) {
        if let Ok(mut cached) = self.crumb.lock() {
            *cached = crumb;
        }
    }

    /// Fetch a fresh cookie + crumb pair.
    async fn refresh_crumb(&self) -> Result<String, AnalysisError> {
        // The cookie page itself answers 404; only the Set-Cookie header matters.
        if let Err(e) = self.client.get(&self.cookie_url).send().await {
            tracing::debug!("Cookie request to {} failed: {}", self.cookie_url, e);
        }

        let url = self
            .base_url
            .join("v1/test/getcrumb")
            .map_err(|e| AnalysisError::ApiError(e.to_string()))?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AnalysisError::ApiError(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AnalysisError::ApiError(e.to_string()))?;
        let crumb = body.trim();

        if !status.is_success() || crumb.is_empty() || crumb.contains(char::is_whitespace) || crumb.contains('<') {
            return Err(AnalysisError::ApiError(format!(
                "Failed to obtain Yahoo crumb (HTTP {})",
                status
            )));
        }

        tracing::debug!("Obtained new Yahoo crumb");
        self.store_crumb(Some(crumb.to_string()));
        Ok(crumb.to_string())
    }

    async fn crumb(&self) -> Result<String, AnalysisError> {
        match self.cached_crumb() {
            Some(crumb) => Ok(crumb),
            None => self.refresh_crumb().await,
        }
    }

    fn summary_url(&self, ticker: &str, crumb: &str) -> Result<Url, AnalysisError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| AnalysisError::ApiError(format!("base url {} cannot hold a path", self.base_url)))?
            .pop_if_empty()
            .extend(["v10", "finance", "quoteSummary", ticker]);
        url.query_pairs_mut()
            .append_pair("modules", SUMMARY_MODULES)
            .append_pair("crumb", crumb);
        Ok(url)
    }

    async fn request_summary(&self, ticker: &str, crumb: &str) -> Result<(StatusCode, String), AnalysisError> {
        let url = self.summary_url(ticker, crumb)?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AnalysisError::ApiError(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AnalysisError::ApiError(e.to_string()))?;
        Ok((status, body))
    }

    /// Get the quote summary for a ticker; `None` when Yahoo does not know it.
    pub async fn get_quote_summary(&self, ticker: &str) -> Result<Option<RawQuoteRecord>, AnalysisError> {
        let _slot = self.rate_limiter.acquire().await;

        let crumb = self.crumb().await?;
        let (mut status, mut body) = self.request_summary(ticker, &crumb).await?;

        // A stale crumb is answered with 401; re-authenticate once.
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            tracing::debug!("Yahoo rejected crumb (HTTP {}), refreshing", status);
            self.store_crumb(None);
            let crumb = self.refresh_crumb().await?;
            (status, body) = self.request_summary(ticker, &crumb).await?;
        }

        let record = parse_quote_summary(status, &body)?;
        if record.is_none() {
            tracing::warn!("Ticker {} not found by quote provider", ticker);
        }
        Ok(record)
    }
}

#[async_trait]
impl QuoteProvider for YahooClient {
    async fn fetch_quote(&self, ticker: &str) -> Result<Option<RawQuoteRecord>, AnalysisError> {
        self.get_quote_summary(ticker).await
    }
}

/// Interpret a `quoteSummary` response.
///
/// A 404, a `"Not Found"` error code, or an empty result set all mean the
/// ticker is unknown. Any other failure is an [`AnalysisError::ApiError`].
pub fn parse_quote_summary(status: StatusCode, body: &str) -> Result<Option<RawQuoteRecord>, AnalysisError> {
    let envelope: Option<QuoteSummaryResponse> = serde_json::from_str(body).ok();

    if let Some(error) = envelope.as_ref().and_then(|e| e.quote_summary.error.as_ref()) {
        if status == StatusCode::NOT_FOUND || error.is_not_found() {
            return Ok(None);
        }
        return Err(AnalysisError::ApiError(format!(
            "HTTP {}: {} ({})",
            status,
            error.description.as_deref().unwrap_or("no description"),
            error.code.as_deref().unwrap_or("no code"),
        )));
    }

    if status == StatusCode::NOT_FOUND {
        return Ok(None);
    }

    if !status.is_success() {
        return Err(AnalysisError::ApiError(format!("HTTP {}: {}", status, body)));
    }

    let envelope = envelope.ok_or_else(|| {
        AnalysisError::ApiError("Malformed quoteSummary response".to_string())
    })?;

    Ok(envelope
        .quote_summary
        .result
        .and_then(|results| results.into_iter().next()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteSummaryResponse {
    quote_summary: QuoteSummary,
}

#[derive(Debug, Deserialize)]
struct QuoteSummary {
    #[serde(default)]
    result: Option<Vec<RawQuoteRecord>>,
    #[serde(default)]
    error: Option<QuoteSummaryError>,
}

#[derive(Debug, Deserialize)]
struct QuoteSummaryError {
    code: Option<String>,
    description: Option<String>,
}

impl QuoteSummaryError {
    fn is_not_found(&self) -> bool {
        self.code
            .as_deref()
            .is_some_and(|c| c.eq_ignore_ascii_case("not found"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_success() {
        let body = r#"{"quoteSummary":{"result":[{
            "financialData":{"currentPrice":{"raw":189.5,"fmt":"189.50"},"financialCurrency":"USD"},
            "defaultKeyStatistics":{"trailingEps":{"raw":6.43},"priceToBook":{"raw":47.1}},
            "summaryDetail":{"marketCap":{"raw":2.9e12}}
        }],"error":null}}"#;

        let record = parse_quote_summary(StatusCode::OK, body).unwrap().unwrap();
        assert_eq!(record.current_price(), Some(189.5));
        assert_eq!(record.trailing_eps(), Some(6.43));
        assert_eq!(record.price_to_book(), Some(47.1));
        assert!(record.summary_detail.is_some());
    }

    #[test]
    fn test_parse_not_found_envelope() {
        let body = r#"{"quoteSummary":{"result":null,"error":{
            "code":"Not Found","description":"Quote not found for symbol: ZZZZ"}}}"#;

        assert!(parse_quote_summary(StatusCode::NOT_FOUND, body).unwrap().is_none());
        assert!(parse_quote_summary(StatusCode::OK, body).unwrap().is_none());
    }

    #[test]
    fn test_parse_bare_404() {
        assert!(parse_quote_summary(StatusCode::NOT_FOUND, "Not Found").unwrap().is_none());
    }

    #[test]
    fn test_parse_empty_result() {
        let body = r#"{"quoteSummary":{"result":[],"error":null}}"#;
        assert!(parse_quote_summary(StatusCode::OK, body).unwrap().is_none());
    }

    #[test]
    fn test_parse_upstream_error() {
        let body = r#"{"quoteSummary":{"result":null,"error":{
            "code":"Unauthorized","description":"Invalid Crumb"}}}"#;
        let err = parse_quote_summary(StatusCode::UNAUTHORIZED, body).unwrap_err();
        assert!(matches!(err, AnalysisError::ApiError(msg) if msg.contains("Invalid Crumb")));
    }

    #[test]
    fn test_parse_server_error_and_garbage() {
        let err = parse_quote_summary(StatusCode::TOO_MANY_REQUESTS, "Too Many Requests").unwrap_err();
        assert!(matches!(err, AnalysisError::ApiError(_)));

        let err = parse_quote_summary(StatusCode::OK, "<html></html>").unwrap_err();
        assert!(matches!(err, AnalysisError::ApiError(_)));
    }

    #[test]
    fn test_summary_url_encodes_ticker() {
        let client = YahooClient::new(QuoteClientConfig::default()).unwrap();
        let url = client.summary_url("A/B", "abc/def").unwrap();
        assert_eq!(url.path(), "/v10/finance/quoteSummary/A%2FB");
        let query = url.query().unwrap();
        assert!(query.contains("modules=financialData%2CdefaultKeyStatistics%2CsummaryDetail"));
        assert!(query.contains("crumb=abc%2Fdef"));
    }

    #[test]
    fn test_invalid_base_url_is_rejected() {
        let config = QuoteClientConfig {
            base_url: "not a url".to_string(),
            ..QuoteClientConfig::default()
        };
        assert!(YahooClient::new(config).is_err());
    }
}
