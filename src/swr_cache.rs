//! Stale-while-revalidate cache for slow network-backed lookups.
//!
//! The cache itself lives on the search thread. Fetches run on worker
//! threads, raced against a timeout, and hand their settlement back through
//! a channel; the search thread applies settlements at the start of every
//! lookup, so entries are only ever mutated from one place.
//!
//! ```text
//! lookup(key)
//!   no entry, nothing in flight  -> start fetch, Pending
//!   fresh entry                  -> Ready / Failed
//!   stale entry                  -> start fetch (once), Ready / Failed marked stale
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::clock::SharedClock;
use crate::error::{failure_reason, HopError};

/// Network call injected by the host. Runs on a worker thread.
pub type FetchFn<T> = Arc<dyn Fn(&str) -> anyhow::Result<T> + Send + Sync>;

/// Wake-up signal for the host when cached data changes. May be called from
/// a worker thread; the host should re-run the search on its own thread.
pub type UpdateCallback = Arc<dyn Fn() + Send + Sync>;

/// One cached lookup result. Exactly one of `payload`/`error` is set.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry<T> {
    pub payload: Option<T>,
    pub error: Option<String>,
    pub updated_at_ms: u64,
}

/// What a lookup returns to the provider.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheView<T> {
    /// First request for this key, fetch started
    Pending,
    Ready { payload: T, stale: bool },
    Failed { reason: String, stale: bool },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub fresh_hits: u64,
    pub stale_hits: u64,
    pub misses: u64,
    pub fetches_started: u64,
    pub failures: u64,
}

struct Settlement<T> {
    key: String,
    outcome: std::result::Result<T, String>,
}

pub struct SwrCache<T> {
    name: &'static str,
    ttl_ms: u64,
    timeout: Duration,
    fetch: FetchFn<T>,
    clock: SharedClock,
    entries: HashMap<String, CacheEntry<T>>,
    in_flight: HashSet<String>,
    settled_tx: async_channel::Sender<Settlement<T>>,
    settled_rx: async_channel::Receiver<Settlement<T>>,
    on_update: Arc<Mutex<Option<UpdateCallback>>>,
    stats: CacheStats,
}

impl<T> SwrCache<T>
where
    T: Clone + Send + 'static,
{
    /// `name` prefixes log events and the timeout reason (`"<name> timeout"`).
    pub fn new(
        name: &'static str,
        ttl_ms: u64,
        timeout: Duration,
        fetch: FetchFn<T>,
        clock: SharedClock,
    ) -> Self {
        let (settled_tx, settled_rx) = async_channel::unbounded();
        SwrCache {
            name,
            ttl_ms,
            timeout,
            fetch,
            clock,
            entries: HashMap::new(),
            in_flight: HashSet::new(),
            settled_tx,
            settled_rx,
            on_update: Arc::new(Mutex::new(None)),
            stats: CacheStats::default(),
        }
    }

    pub fn set_update_callback(&mut self, callback: Option<UpdateCallback>) {
        *self.on_update.lock() = callback;
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    pub fn is_in_flight(&self, key: &str) -> bool {
        self.in_flight.contains(key)
    }

    pub fn entry(&self, key: &str) -> Option<&CacheEntry<T>> {
        self.entries.get(key)
    }

    fn is_stale(&self, entry: &CacheEntry<T>) -> bool {
        self.clock.now_ms().saturating_sub(entry.updated_at_ms) > self.ttl_ms
    }

    /// Serve `key` from cache, starting a fetch when missing or stale.
    pub fn lookup(&mut self, key: &str) -> CacheView<T> {
        self.drain_settled();

        let Some(entry) = self.entries.get(key) else {
            self.stats.misses += 1;
            self.start_fetch(key);
            return CacheView::Pending;
        };

        let stale = self.is_stale(entry);
        let view = match (&entry.payload, &entry.error) {
            (Some(payload), _) => CacheView::Ready {
                payload: payload.clone(),
                stale,
            },
            (None, error) => CacheView::Failed {
                reason: error.clone().unwrap_or_else(|| "request failed".to_string()),
                stale,
            },
        };

        if stale {
            self.stats.stale_hits += 1;
            self.start_fetch(key);
        } else {
            self.stats.fresh_hits += 1;
        }
        view
    }

    /// Apply every settlement delivered so far. Returns how many were applied.
    pub fn drain_settled(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(settlement) = self.settled_rx.try_recv() {
            self.apply(settlement);
            applied += 1;
        }
        applied
    }

    /// Block until every in-flight fetch has settled or `deadline` passes.
    /// Returns true when nothing is left in flight.
    pub fn wait_until_settled(&mut self, deadline: Duration) -> bool {
        let until = Instant::now() + deadline;
        loop {
            self.drain_settled();
            if self.in_flight.is_empty() {
                return true;
            }
            if Instant::now() >= until {
                return false;
            }
            thread::sleep(Duration::from_millis(2));
        }
    }

    fn apply(&mut self, settlement: Settlement<T>) {
        let Settlement { key, outcome } = settlement;
        self.in_flight.remove(&key);
        let updated_at_ms = self.clock.now_ms();

        let entry = match outcome {
            Ok(payload) => {
                debug!(cache = self.name, key = %key, "Fetch settled");
                CacheEntry {
                    payload: Some(payload),
                    error: None,
                    updated_at_ms,
                }
            }
            Err(reason) => {
                self.stats.failures += 1;
                info!(cache = self.name, key = %key, reason = %reason, "Fetch failed");
                CacheEntry {
                    payload: None,
                    error: Some(reason),
                    updated_at_ms,
                }
            }
        };
        self.entries.insert(key, entry);
    }

    fn start_fetch(&mut self, key: &str) {
        if !self.in_flight.insert(key.to_string()) {
            return;
        }
        self.stats.fetches_started += 1;

        let name = self.name;
        let timeout = self.timeout;
        let fetch = Arc::clone(&self.fetch);
        let settled_tx = self.settled_tx.clone();
        let on_update = Arc::clone(&self.on_update);
        let owned_key = key.to_string();

        let spawned = thread::Builder::new()
            .name(format!("{}-fetch", name))
            .spawn(move || {
                let outcome = race_fetch(name, &owned_key, fetch, timeout);
                if settled_tx
                    .send_blocking(Settlement {
                        key: owned_key,
                        outcome,
                    })
                    .is_ok()
                {
                    let callback = on_update.lock().clone();
                    if let Some(callback) = callback {
                        callback();
                    }
                }
            });

        if let Err(e) = spawned {
            warn!(cache = name, key = %key, error = %e, "Failed to spawn fetch thread");
            self.apply(Settlement {
                key: key.to_string(),
                outcome: Err("request failed".to_string()),
            });
        }
    }
}

/// Run `fetch` on its own thread and wait at most `timeout` for it.
/// A fetch that outlives the timeout keeps running detached; its late result
/// is dropped.
fn race_fetch<T: Send + 'static>(
    name: &'static str,
    key: &str,
    fetch: FetchFn<T>,
    timeout: Duration,
) -> std::result::Result<T, String> {
    let (result_tx, result_rx) = mpsc::channel();
    let fetch_key = key.to_string();

    let spawned = thread::Builder::new()
        .name(format!("{}-request", name))
        .spawn(move || {
            let _ = result_tx.send(fetch(&fetch_key));
        });
    if let Err(e) = spawned {
        return Err(format!("request failed: {}", e));
    }

    match result_rx.recv_timeout(timeout) {
        Ok(Ok(payload)) => Ok(payload),
        Ok(Err(error)) => Err(failure_reason(&error)),
        Err(RecvTimeoutError::Timeout) => Err(HopError::Timeout(name.to_string()).user_message()),
        // The fetch panicked before sending
        Err(RecvTimeoutError::Disconnected) => Err("request failed".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const TTL: u64 = 10 * 60 * 1000;
    const WAIT: Duration = Duration::from_secs(5);

    fn counting_fetch(calls: Arc<AtomicUsize>) -> FetchFn<String> {
        Arc::new(move |key: &str| {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(format!("{}#{}", key, n))
        })
    }

    fn cache_with(fetch: FetchFn<String>, clock: Arc<ManualClock>) -> SwrCache<String> {
        SwrCache::new("weather", TTL, Duration::from_secs(2), fetch, clock)
    }

    #[test]
    fn test_first_lookup_is_pending_then_ready_without_refetch() {
        let calls = Arc::new(AtomicUsize::new(0));
        let clock = ManualClock::new(1_000);
        let mut cache = cache_with(counting_fetch(calls.clone()), clock);

        assert_eq!(cache.lookup("berlin"), CacheView::Pending);
        assert!(cache.wait_until_settled(WAIT));

        assert_eq!(
            cache.lookup("berlin"),
            CacheView::Ready {
                payload: "berlin#1".into(),
                stale: false
            }
        );
        assert_eq!(
            cache.lookup("berlin"),
            CacheView::Ready {
                payload: "berlin#1".into(),
                stale: false
            }
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.stats().fresh_hits, 2);
    }

    #[test]
    fn test_concurrent_lookups_share_one_fetch() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let fetch: FetchFn<String> = Arc::new(move |key: &str| {
            counter.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(50));
            Ok(key.to_string())
        });
        let mut cache = cache_with(fetch, ManualClock::new(0));

        assert_eq!(cache.lookup("tokyo"), CacheView::Pending);
        assert_eq!(cache.lookup("tokyo"), CacheView::Pending);
        assert!(cache.is_in_flight("tokyo"));
        assert!(cache.wait_until_settled(WAIT));

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.stats().fetches_started, 1);
    }

    #[test]
    fn test_stale_entry_is_served_while_one_refresh_runs() {
        let calls = Arc::new(AtomicUsize::new(0));
        let clock = ManualClock::new(0);
        let mut cache = cache_with(counting_fetch(calls.clone()), clock.clone());

        cache.lookup("paris");
        assert!(cache.wait_until_settled(WAIT));

        clock.advance(TTL + 1);
        assert_eq!(
            cache.lookup("paris"),
            CacheView::Ready {
                payload: "paris#1".into(),
                stale: true
            }
        );
        // The settlement may not have been applied yet; either way the old
        // payload or the refreshed one is served, and no extra fetch starts.
        let second = cache.lookup("paris");
        assert!(matches!(second, CacheView::Ready { .. }));
        assert!(cache.wait_until_settled(WAIT));
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        assert_eq!(
            cache.lookup("paris"),
            CacheView::Ready {
                payload: "paris#2".into(),
                stale: false
            }
        );
    }

    #[test]
    fn test_business_failure_is_cached_as_error() {
        let fetch: FetchFn<String> =
            Arc::new(|_key: &str| Err(anyhow::Error::new(HopError::LocationNotFound)));
        let mut cache = cache_with(fetch, ManualClock::new(0));

        assert_eq!(cache.lookup("atlantis"), CacheView::Pending);
        assert!(cache.wait_until_settled(WAIT));
        assert_eq!(
            cache.lookup("atlantis"),
            CacheView::Failed {
                reason: "location not found".into(),
                stale: false
            }
        );
        assert_eq!(cache.stats().failures, 1);
    }

    #[test]
    fn test_timeout_is_cached_as_error() {
        let fetch: FetchFn<String> = Arc::new(|key: &str| {
            thread::sleep(Duration::from_millis(500));
            Ok(key.to_string())
        });
        let mut cache = SwrCache::new(
            "weather",
            TTL,
            Duration::from_millis(20),
            fetch,
            ManualClock::new(0),
        );

        cache.lookup("slow");
        assert!(cache.wait_until_settled(WAIT));
        assert_eq!(
            cache.lookup("slow"),
            CacheView::Failed {
                reason: "weather timeout".into(),
                stale: false
            }
        );
    }

    #[test]
    fn test_panicking_fetch_becomes_error() {
        let fetch: FetchFn<String> = Arc::new(|_key: &str| panic!("boom"));
        let mut cache = cache_with(fetch, ManualClock::new(0));

        cache.lookup("x");
        assert!(cache.wait_until_settled(WAIT));
        assert!(matches!(cache.lookup("x"), CacheView::Failed { .. }));
    }

    #[test]
    fn test_failed_refresh_replaces_stale_payload() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let fetch: FetchFn<String> = Arc::new(move |key: &str| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Ok(key.to_string())
            } else {
                Err(anyhow::anyhow!("weather http 503"))
            }
        });
        let clock = ManualClock::new(0);
        let mut cache = cache_with(fetch, clock.clone());

        cache.lookup("oslo");
        assert!(cache.wait_until_settled(WAIT));
        clock.advance(TTL + 1);
        cache.lookup("oslo");
        assert!(cache.wait_until_settled(WAIT));

        assert_eq!(
            cache.lookup("oslo"),
            CacheView::Failed {
                reason: "weather http 503".into(),
                stale: false
            }
        );
    }

    #[test]
    fn test_update_callback_fires_on_settlement() {
        let calls = Arc::new(AtomicUsize::new(0));
        let updates = Arc::new(AtomicUsize::new(0));
        let mut cache = cache_with(counting_fetch(calls), ManualClock::new(0));
        let counter = updates.clone();
        cache.set_update_callback(Some(Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })));

        cache.lookup("rome");
        assert!(cache.wait_until_settled(WAIT));
        // The callback runs right after the settlement is queued
        let deadline = Instant::now() + WAIT;
        while updates.load(Ordering::SeqCst) == 0 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(2));
        }
        assert_eq!(updates.load(Ordering::SeqCst), 1);
    }
}
