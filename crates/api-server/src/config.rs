use anyhow::{bail, Context, Result};
use quote_client::QuoteClientConfig;
use std::time::Duration;

/// Server settings, read from the environment (`.env` is honoured).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// How long an analysis stays cached.
    pub cache_ttl: Duration,
    pub quote_client: QuoteClientConfig,
    /// Emit `Strict-Transport-Security`; only meaningful behind TLS.
    pub enable_hsts: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            cache_ttl: Duration::from_secs(600),
            quote_client: QuoteClientConfig::default(),
            enable_hsts: false,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let host = lookup("HOST").unwrap_or(defaults.host);
        let port = parse_or(&lookup, "PORT", defaults.port)?;

        let cache_ttl_secs: u64 = parse_or(&lookup, "ANALYSIS_CACHE_TTL_SECS", defaults.cache_ttl.as_secs())?;
        if cache_ttl_secs == 0 {
            bail!("ANALYSIS_CACHE_TTL_SECS must be greater than zero");
        }

        let min_interval_ms: u64 = parse_or(
            &lookup,
            "QUOTE_MIN_INTERVAL_MS",
            defaults.quote_client.min_interval.as_millis() as u64,
        )?;
        let timeout_secs: u64 = parse_or(
            &lookup,
            "QUOTE_REQUEST_TIMEOUT_SECS",
            defaults.quote_client.request_timeout.as_secs(),
        )?;
        if timeout_secs == 0 {
            bail!("QUOTE_REQUEST_TIMEOUT_SECS must be greater than zero");
        }

        let quote_client = QuoteClientConfig {
            base_url: lookup("QUOTE_BASE_URL").unwrap_or(defaults.quote_client.base_url),
            cookie_url: lookup("QUOTE_COOKIE_URL").unwrap_or(defaults.quote_client.cookie_url),
            min_interval: Duration::from_millis(min_interval_ms),
            request_timeout: Duration::from_secs(timeout_secs),
        };

        let enable_hsts = lookup("ENABLE_HSTS")
            .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
            .unwrap_or(defaults.enable_hsts);

        Ok(Self {
            host,
            port,
            cache_ttl: Duration::from_secs(cache_ttl_secs),
            quote_client,
            enable_hsts,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid value for {}: {:?}", key, raw)),
        None => Ok(default),
    }
}
