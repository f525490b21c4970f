//! Short-lived snapshot cache keyed by scope.
//!
//! Entries are immutable `Arc`s replaced wholesale after a successful refresh;
//! a failed refresh never touches the previous entry. Freshness is judged
//! against an injectable [`Clock`] so tests can move time by hand.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::Mutex as AsyncMutex;
use tracing::debug;

/// Source of "now" for cache freshness
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Hand-driven clock for tests and replays
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(start) }
    }

    pub fn advance(&self, by: Duration) {
        let step = chrono::Duration::from_std(by).unwrap_or(chrono::Duration::MAX);
        let mut now = self.now.lock();
        *now = now.checked_add_signed(step).unwrap_or(*now);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}

/// One cached snapshot
#[derive(Debug)]
pub struct CacheEntry<T> {
    pub scope_key: String,
    pub snapshot: Arc<T>,
    pub captured_at: DateTime<Utc>,
}

impl<T> Clone for CacheEntry<T> {
    fn clone(&self) -> Self {
        Self {
            scope_key: self.scope_key.clone(),
            snapshot: Arc::clone(&self.snapshot),
            captured_at: self.captured_at,
        }
    }
}

impl<T> CacheEntry<T> {
    /// Fresh while `now - captured_at < ttl`
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        match chrono::Duration::from_std(ttl) {
            Ok(ttl) => now.signed_duration_since(self.captured_at) < ttl,
            Err(_) => true,
        }
    }
}

/// Scope-keyed TTL cache with per-scope single-flight refresh
pub struct SnapshotCache<T, C: Clock = SystemClock> {
    entries: DashMap<String, CacheEntry<T>>,
    refresh_locks: DashMap<String, Arc<AsyncMutex<()>>>,
    ttl: Duration,
    clock: C,
}

impl<T> SnapshotCache<T, SystemClock> {
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, SystemClock)
    }
}

impl<T, C: Clock> SnapshotCache<T, C> {
    pub fn with_clock(ttl: Duration, clock: C) -> Self {
        Self {
            entries: DashMap::new(),
            refresh_locks: DashMap::new(),
            ttl,
            clock,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Entry for the scope if it is still fresh
    pub fn get_fresh(&self, scope: &str) -> Option<CacheEntry<T>> {
        let now = self.clock.now();
        self.entries
            .get(scope)
            .filter(|entry| entry.is_fresh(now, self.ttl))
            .map(|entry| entry.value().clone())
    }

    /// Last entry for the scope regardless of age
    pub fn peek(&self, scope: &str) -> Option<CacheEntry<T>> {
        self.entries.get(scope).map(|entry| entry.value().clone())
    }

    /// Replace the scope's entry
    pub fn store(&self, scope: &str, snapshot: T, captured_at: DateTime<Utc>) -> CacheEntry<T> {
        let entry = CacheEntry {
            scope_key: scope.to_string(),
            snapshot: Arc::new(snapshot),
            captured_at,
        };
        self.entries.insert(scope.to_string(), entry.clone());
        debug!("💾 Cached snapshot for scope {}", scope);
        entry
    }

    pub fn invalidate(&self, scope: &str) {
        self.entries.remove(scope);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn refresh_lock(&self, scope: &str) -> Arc<AsyncMutex<()>> {
        self.refresh_locks
            .entry(scope.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .value()
            .clone()
    }

    /// Serve a fresh entry, or run `refresh` to build one.
    ///
    /// Concurrent callers for the same scope queue up behind one refresh and
    /// reuse its result. Returns the entry and whether it came from the cache.
    /// On error nothing is stored and the previous entry stays in place.
    pub async fn get_or_refresh<F, Fut, E>(&self, scope: &str, refresh: F) -> Result<(CacheEntry<T>, bool), E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(entry) = self.get_fresh(scope) {
            return Ok((entry, true));
        }

        let lock = self.refresh_lock(scope);
        let _guard = lock.lock().await;

        if let Some(entry) = self.get_fresh(scope) {
            debug!("🔁 Scope {} refreshed by a concurrent request", scope);
            return Ok((entry, true));
        }

        let snapshot = refresh().await?;
        let captured_at = self.clock.now();
        Ok((self.store(scope, snapshot, captured_at), false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache() -> (SnapshotCache<u32, Arc<ManualClock>>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        (SnapshotCache::with_clock(Duration::from_secs(10), clock.clone()), clock)
    }

    #[tokio::test]
    async fn test_hit_within_ttl_and_miss_after() {
        let (cache, clock) = cache();

        let (first, cached) = cache.get_or_refresh("Soporte", || async { Ok::<_, ()>(1) }).await.unwrap();
        assert!(!cached);
        assert_eq!(*first.snapshot, 1);

        clock.advance(Duration::from_secs(9));
        let (second, cached) = cache.get_or_refresh("Soporte", || async { Ok::<_, ()>(2) }).await.unwrap();
        assert!(cached);
        assert_eq!(*second.snapshot, 1);
        assert_eq!(second.captured_at, first.captured_at);

        clock.advance(Duration::from_secs(1));
        let (third, cached) = cache.get_or_refresh("Soporte", || async { Ok::<_, ()>(3) }).await.unwrap();
        assert!(!cached);
        assert_eq!(*third.snapshot, 3);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_entry() {
        let (cache, clock) = cache();
        cache.get_or_refresh("Movil", || async { Ok::<_, &str>(7) }).await.unwrap();
        clock.advance(Duration::from_secs(30));

        let err = cache.get_or_refresh("Movil", || async { Err::<u32, _>("down") }).await.unwrap_err();
        assert_eq!(err, "down");
        assert!(cache.get_fresh("Movil").is_none());
        assert_eq!(*cache.peek("Movil").unwrap().snapshot, 7);

        let err = cache.get_or_refresh("Nuevo", || async { Err::<u32, _>("down") }).await.unwrap_err();
        assert_eq!(err, "down");
        assert!(cache.peek("Nuevo").is_none());
    }

    #[tokio::test]
    async fn test_scopes_are_independent() {
        let (cache, _clock) = cache();
        cache.store("A", 1, cache.now());
        cache.store("B", 2, cache.now());
        cache.invalidate("A");
        assert!(cache.peek("A").is_none());
        assert_eq!(*cache.get_fresh("B").unwrap().snapshot, 2);
        assert_eq!(cache.len(), 1);
    }
}
