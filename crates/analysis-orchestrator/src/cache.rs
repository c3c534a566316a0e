use analysis_core::AnalysisResult;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Default time-to-live for cached analyses.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(600);

/// Internal cache entry with timestamp
struct CacheEntry<T> {
    data: T,
    cached_at: Instant,
}

impl<T> CacheEntry<T> {
    fn is_fresh(&self, now: Instant, ttl: Duration) -> bool {
        now.duration_since(self.cached_at) < ttl
    }
}

/// In-memory analysis cache keyed by normalized ticker.
///
/// Entries expire a fixed duration after insertion. There is no capacity
/// limit and no way to evict a live entry; expired entries are dropped when
/// read or by [`AnalysisCache::purge_expired`].
pub struct AnalysisCache {
    entries: DashMap<String, CacheEntry<Arc<AnalysisResult>>>,
    ttl: Duration,
}

impl AnalysisCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn get(&self, key: &str) -> Option<Arc<AnalysisResult>> {
        let now = Instant::now();
        {
            let entry = self.entries.get(key)?;
            if entry.is_fresh(now, self.ttl) {
                return Some(Arc::clone(&entry.data));
            }
        }

        // The read guard must be released before removing.
        self.entries
            .remove_if(key, |_, entry| !entry.is_fresh(now, self.ttl));
        None
    }

    /// Store a result; always succeeds.
    pub fn set(&self, key: impl Into<String>, value: Arc<AnalysisResult>) -> bool {
        self.entries.insert(
            key.into(),
            CacheEntry {
                data: value,
                cached_at: Instant::now(),
            },
        );
        true
    }

    /// Drop every expired entry, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_fresh(now, self.ttl));
        before.saturating_sub(self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for AnalysisCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL)
    }
}
