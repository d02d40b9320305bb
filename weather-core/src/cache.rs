//! In-memory TTL cache with single-flight loading.
//!
//! A miss starts one resilient fetch per city on its own task; concurrent
//! callers for the same city await that fetch instead of issuing another.
//! Only successes are stored. When full, expired entries are swept first and
//! then the oldest-inserted entry is evicted.

use futures::future::{BoxFuture, FutureExt, Shared};
use std::{collections::HashMap, panic::AssertUnwindSafe, sync::Arc, time::Duration};
use tokio::{sync::Mutex, time::Instant};
use tracing::{debug, info, warn};

use crate::{FetchError, PolicyError, ResilientFetcher, WeatherData};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheSettings {
    capacity: usize,
    ttl: Duration,
}

impl CacheSettings {
    pub fn new(capacity: usize, ttl: Duration) -> Result<Self, PolicyError> {
        if capacity == 0 {
            return Err(PolicyError::NonPositive { field: "capacity" });
        }
        if ttl.is_zero() {
            return Err(PolicyError::NonPositive { field: "ttl" });
        }

        Ok(Self { capacity, ttl })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

impl Default for CacheSettings {
    /// 100 entries, 15 minutes.
    fn default() -> Self {
        Self {
            capacity: 100,
            ttl: Duration::from_secs(15 * 60),
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    key: String,
    value: WeatherData,
    inserted_at: Instant,
    expires_at: Instant,
    /// Tie-breaker for entries inserted at the same instant.
    seq: u64,
}

impl CacheEntry {
    fn is_valid(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Stand-in expiry for TTLs too large to add to the current instant.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

type PendingFetch = Shared<BoxFuture<'static, Result<WeatherData, FetchError>>>;

#[derive(Default)]
struct CacheState {
    entries: HashMap<String, CacheEntry>,
    in_flight: HashMap<String, PendingFetch>,
    next_seq: u64,
}

impl CacheState {
    fn purge_expired(&mut self, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_valid(now));
        before - self.entries.len()
    }

    fn evict_oldest(&mut self) {
        let oldest = self
            .entries
            .values()
            .min_by_key(|entry| (entry.inserted_at, entry.seq))
            .map(|entry| entry.key.clone());

        if let Some(key) = oldest {
            info!(city = %key, "evicting oldest cache entry");
            self.entries.remove(&key);
        }
    }

    fn insert(&mut self, key: &str, value: WeatherData, settings: &CacheSettings, now: Instant) {
        self.entries.remove(key);

        if self.entries.len() >= settings.capacity {
            let swept = self.purge_expired(now);
            if swept > 0 {
                debug!(swept, "swept expired cache entries");
            }
        }
        while self.entries.len() >= settings.capacity {
            self.evict_oldest();
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        let expires_at = now
            .checked_add(settings.ttl)
            .unwrap_or_else(|| now + FAR_FUTURE);
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                key: key.to_string(),
                value,
                inserted_at: now,
                expires_at,
                seq,
            },
        );
    }
}

struct Inner {
    settings: CacheSettings,
    fetcher: ResilientFetcher,
    state: Mutex<CacheState>,
}

impl Inner {
    /// Publishes the outcome of a fetch and clears its in-flight marker.
    async fn complete(&self, key: &str, result: &Result<WeatherData, FetchError>) {
        let mut state = self.state.lock().await;
        state.in_flight.remove(key);

        match result {
            Ok(value) => state.insert(key, *value, &self.settings, Instant::now()),
            Err(err) => debug!(city = key, error = %err, "fetch failed, nothing cached"),
        }
    }
}

/// Cloneable handle to a shared weather cache.
#[derive(Clone)]
pub struct WeatherCache {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for WeatherCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeatherCache")
            .field("settings", &self.inner.settings)
            .field("fetcher", &self.inner.fetcher)
            .finish_non_exhaustive()
    }
}

impl WeatherCache {
    pub fn new(settings: CacheSettings, fetcher: ResilientFetcher) -> Self {
        Self {
            inner: Arc::new(Inner {
                settings,
                fetcher,
                state: Mutex::new(CacheState::default()),
            }),
        }
    }

    pub fn settings(&self) -> &CacheSettings {
        &self.inner.settings
    }

    /// Returns the cached value for `city`, or loads it.
    ///
    /// Expired entries behave exactly like misses. Failures are returned to
    /// every caller waiting on the same fetch and are never cached.
    pub async fn get(&self, city: &str) -> Result<WeatherData, FetchError> {
        let pending = {
            let mut state = self.inner.state.lock().await;
            let now = Instant::now();

            match state.entries.get(city) {
                Some(entry) if entry.is_valid(now) => {
                    debug!(city, "cache hit");
                    return Ok(entry.value);
                }
                Some(_) => {
                    debug!(city, "cache entry expired");
                    state.entries.remove(city);
                }
                None => {}
            }

            match state.in_flight.get(city) {
                Some(pending) => {
                    debug!(city, "joining in-flight fetch");
                    pending.clone()
                }
                None => {
                    debug!(city, "cache miss, starting fetch");
                    let pending = self.spawn_fetch(city);
                    state.in_flight.insert(city.to_string(), pending.clone());
                    pending
                }
            }
        };

        pending.await
    }

    /// Drops the entry for `city`. Returns whether one was present.
    pub async fn invalidate(&self, city: &str) -> bool {
        self.inner.state.lock().await.entries.remove(city).is_some()
    }

    /// Removes every expired entry, returning how many were dropped.
    pub async fn purge_expired(&self) -> usize {
        self.inner.state.lock().await.purge_expired(Instant::now())
    }

    /// Resident entries, including expired ones not yet swept.
    pub async fn len(&self) -> usize {
        self.inner.state.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Number of fetches currently pending.
    pub async fn in_flight(&self) -> usize {
        self.inner.state.lock().await.in_flight.len()
    }

    // Runs on its own task so a dropped caller never cancels the fetch for
    // other waiters. Must be called with the state lock held.
    fn spawn_fetch(&self, city: &str) -> PendingFetch {
        let inner = Arc::clone(&self.inner);
        let key = city.to_string();

        let task = tokio::spawn(async move {
            let result = AssertUnwindSafe(inner.fetcher.fetch(&key))
                .catch_unwind()
                .await
                .unwrap_or_else(|_| {
                    warn!(city = %key, "weather fetch panicked");
                    Err(FetchError::unknown())
                });
            inner.complete(&key, &result).await;
            result
        });

        async move {
            task.await.unwrap_or_else(|err| {
                warn!(error = %err, "weather fetch task did not complete");
                Err(FetchError::unknown())
            })
        }
        .boxed()
        .shared()
    }
}
