use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

struct CacheEntry<T> {
    value: Arc<T>,
    /// `None` when the TTL reaches past what `Instant` can represent.
    expires_at: Option<Instant>,
}

impl<T> CacheEntry<T> {
    fn remaining(&self, now: Instant) -> Duration {
        self.expires_at
            .map_or(Duration::MAX, |at| at.saturating_duration_since(now))
    }
}

/// Freshness snapshot of a cached value, for status reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStatus {
    pub valid: bool,
    pub ttl_remaining_secs: u64,
}

/// Memoizes the result of an async producer for a fixed time-to-live.
///
/// Readers always observe a whole value: the entry is swapped under a lock that
/// is never held across an await. Refreshes are serialized, so callers racing
/// past an expired entry share one producer invocation.
pub struct TtlCache<T> {
    name: &'static str,
    ttl: Duration,
    entry: RwLock<Option<CacheEntry<T>>>,
    refresh: Mutex<()>,
}

impl<T> TtlCache<T> {
    pub fn new(name: &'static str, ttl: Duration) -> Self {
        Self {
            name,
            ttl,
            entry: RwLock::new(None),
            refresh: Mutex::new(()),
        }
    }

    fn fresh(&self) -> Option<Arc<T>> {
        let entry = self.entry.read().unwrap_or_else(PoisonError::into_inner);
        entry
            .as_ref()
            .filter(|e| !e.remaining(Instant::now()).is_zero())
            .map(|e| Arc::clone(&e.value))
    }

    /// Returns the cached value while it is fresh, otherwise runs `producer`.
    ///
    /// A failed refresh leaves the previous entry untouched and hands the error
    /// back to the caller.
    pub async fn get_or_refresh<F, Fut, E>(&self, producer: F) -> Result<Arc<T>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(value) = self.fresh() {
            debug!(cache = self.name, "Cache HIT");
            return Ok(value);
        }

        let _refreshing = self.refresh.lock().await;
        if let Some(value) = self.fresh() {
            debug!(cache = self.name, "Cache HIT after concurrent refresh");
            return Ok(value);
        }

        debug!(cache = self.name, "Cache MISS");
        let value = Arc::new(producer().await?);
        let expires_at = Instant::now().checked_add(self.ttl);

        let mut entry = self.entry.write().unwrap_or_else(PoisonError::into_inner);
        *entry = Some(CacheEntry {
            value: Arc::clone(&value),
            expires_at,
        });
        debug!(cache = self.name, ttl = ?self.ttl, "Cache PUT");
        Ok(value)
    }

    /// Last successfully produced value, expired or not.
    pub fn stale(&self) -> Option<Arc<T>> {
        let entry = self.entry.read().unwrap_or_else(PoisonError::into_inner);
        entry.as_ref().map(|e| Arc::clone(&e.value))
    }

    pub fn status(&self) -> CacheStatus {
        let entry = self.entry.read().unwrap_or_else(PoisonError::into_inner);
        let remaining = entry
            .as_ref()
            .map(|e| e.remaining(Instant::now()))
            .unwrap_or_default();
        CacheStatus {
            valid: !remaining.is_zero(),
            ttl_remaining_secs: remaining.as_secs(),
        }
    }
}
