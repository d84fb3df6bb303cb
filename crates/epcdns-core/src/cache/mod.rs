//! The query cache.
//!
//! A [`Cache`] maps [`QueryKey`]s to resolved answers and de-duplicates
//! concurrent misses: the first miss for a key creates a resolution attempt
//! and enqueues it for the worker pool, later misses join that attempt. When
//! the attempt completes every waiter (blocked callers and registered
//! callbacks) receives the same outcome.
//!
//! # Example
//!
//! ```
//! use std::net::Ipv4Addr;
//! use epcdns_core::{Cache, CacheConfig, QueryKey, RData, RecordType, ResolveError, ResourceRecord, Response};
//!
//! let cache = Cache::new(
//!     |key: &QueryKey| -> Result<Response, ResolveError> {
//!         Ok(Response::with_answers(vec![ResourceRecord::new(
//!             key.domain(),
//!             300,
//!             RData::A(Ipv4Addr::new(10, 0, 0, 1)),
//!         )]))
//!     },
//!     CacheConfig::default().workers(2),
//! )?;
//!
//! let first = cache.query(RecordType::A, "node1.example", false)?;
//! assert!(!first.cache_hit);
//! let second = cache.query(RecordType::A, "NODE1.example.", false)?;
//! assert!(second.cache_hit);
//!
//! cache.shutdown();
//! # Ok::<(), epcdns_core::CacheError>(())
//! ```
//!
//! # Locking
//!
//! All entry state, including waiter sets, lives behind one mutex. Callbacks
//! are collected under the lock and invoked after it is released, so they may
//! call back into the cache.

mod entry;

pub use entry::{CachedAnswer, Lookup, QueryCallback, QueryResult};
pub(crate) use entry::saturating_add;

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crossbeam_channel::{Sender, unbounded};
use parking_lot::Mutex;

use crate::config::CacheConfig;
use crate::error::{CacheError, PersistenceError, ResolveError, Result};
use crate::key::QueryKey;
use crate::logging::targets;
use crate::processor::{QueryProcessor, WorkItem};
use crate::record::{RecordType, Response};
use crate::refresher::{RefreshList, Refresher};
use crate::resolver::Resolve;
use crate::timer::IntervalTimer;

use entry::{Attempt, CacheEntry, Outcome, Pending};

/// Counters describing cache activity since creation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups served from the cache (including cached failures).
    pub hits: u64,
    /// Lookups that needed a resolution.
    pub misses: u64,
    /// Misses that joined an attempt already in flight.
    pub joined: u64,
    /// Attempts completed with an answer.
    pub resolutions: u64,
    /// Attempts completed with a failure, including timeouts.
    pub failures: u64,
    /// Attempts failed because they exceeded the query timeout.
    pub timeouts: u64,
    /// Worker results dropped because their attempt was no longer current.
    pub discarded: u64,
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    joined: AtomicU64,
    resolutions: AtomicU64,
    failures: AtomicU64,
    timeouts: AtomicU64,
    discarded: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            joined: self.joined.load(Ordering::Relaxed),
            resolutions: self.resolutions.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
        }
    }
}

struct CacheState {
    entries: HashMap<QueryKey, CacheEntry>,
    running: bool,
    next_attempt: u64,
    new_queries: usize,
}

/// A completed attempt whose callbacks still have to run.
struct Delivery {
    key: QueryKey,
    outcome: std::result::Result<Arc<CachedAnswer>, ResolveError>,
    callbacks: Vec<QueryCallback>,
}

impl Delivery {
    fn deliver(self) {
        for callback in self.callbacks {
            let result = self.outcome.clone().map(|answer| Lookup {
                answer,
                cache_hit: false,
            });
            invoke(callback, result, &self.key);
        }
    }
}

fn invoke(callback: QueryCallback, result: QueryResult, key: &QueryKey) {
    if panic::catch_unwind(AssertUnwindSafe(move || callback(result))).is_err() {
        tracing::error!(target: targets::CACHE, key = %key, "query callback panicked");
    }
}

/// State shared by the cache handle, its workers, watchdog and refresher.
pub(crate) struct CacheShared {
    config: CacheConfig,
    state: Mutex<CacheState>,
    work: Sender<WorkItem>,
    counters: Counters,
    pub(crate) refresh_list: RefreshList,
}

impl CacheShared {
    pub(crate) fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub(crate) fn work_sender(&self) -> &Sender<WorkItem> {
        &self.work
    }

    /// Find the attempt `key` should wait on, starting one if none is in
    /// flight.
    fn pending_for<'s>(
        &self,
        state: &'s mut CacheState,
        key: &QueryKey,
        now: Instant,
    ) -> std::result::Result<&'s mut Pending, ResolveError> {
        if !state.running {
            return Err(ResolveError::Shutdown);
        }

        let first_time = !state.entries.contains_key(key);
        let next_id = state.next_attempt + 1;
        let entry = state.entries.entry(key.clone()).or_default();

        let pending = match entry.pending.take() {
            Some(pending) => {
                Counters::bump(&self.counters.joined);
                tracing::trace!(target: targets::CACHE, key = %key, attempt = pending.attempt.id, "joined in-flight attempt");
                pending
            }
            None => {
                let item = WorkItem::Resolve {
                    key: key.clone(),
                    attempt: next_id,
                };
                if self.work.send(item).is_err() {
                    if first_time {
                        state.entries.remove(key);
                    }
                    tracing::error!(target: targets::CACHE, key = %key, "work queue disconnected");
                    return Err(ResolveError::Shutdown);
                }
                state.next_attempt = next_id;
                if first_time {
                    state.new_queries += 1;
                    if self.config.track_new_queries {
                        self.refresh_list.register(key.clone());
                    }
                }
                tracing::debug!(target: targets::CACHE, key = %key, attempt = next_id, "enqueued resolution");
                Pending::new(Attempt::new(next_id, now))
            }
        };

        let entry = state.entries.entry(key.clone()).or_default();
        Ok(entry.pending.insert(pending))
    }

    /// Complete attempt `attempt_id` of `key` if it is still current.
    fn finish_locked(
        &self,
        state: &mut CacheState,
        key: &QueryKey,
        attempt_id: u64,
        result: std::result::Result<Response, ResolveError>,
    ) -> Option<Delivery> {
        let entry = state.entries.get_mut(key)?;
        if !entry.pending.as_ref().is_some_and(|p| p.attempt.id == attempt_id) {
            return None;
        }
        let now = Instant::now();

        let outcome = match result {
            Ok(response) => {
                let answer = Arc::new(CachedAnswer::new(
                    key.clone(),
                    response,
                    now,
                    self.config.max_positive_ttl,
                    self.config.negative_ttl,
                ));
                entry.last = Some(Outcome::Resolved(answer.clone()));
                Counters::bump(&self.counters.resolutions);
                Ok(answer)
            }
            Err(error) => {
                // A failed refresh leaves an unexpired answer in service.
                let keep = matches!(&entry.last, Some(Outcome::Resolved(answer)) if !answer.is_expired_at(now));
                if !keep {
                    entry.last = Some(Outcome::Failed {
                        error: error.clone(),
                        retry_after: saturating_add(now, self.config.negative_ttl),
                    });
                }
                Counters::bump(&self.counters.failures);
                if error == ResolveError::Timeout {
                    Counters::bump(&self.counters.timeouts);
                }
                Err(error)
            }
        };

        // The waiter set leaves the entry only once the outcome is built.
        let pending = entry.pending.take()?;
        tracing::debug!(
            target: targets::CACHE,
            key = %key,
            attempt = attempt_id,
            ok = outcome.is_ok(),
            blocked = pending.blocked,
            callbacks = pending.callbacks.len(),
            "attempt completed"
        );

        pending.attempt.complete(key, outcome.clone());
        Some(Delivery {
            key: key.clone(),
            outcome,
            callbacks: pending.callbacks,
        })
    }

    pub(crate) fn query(&self, key: QueryKey, ignore_cache: bool) -> Result<Lookup> {
        let mut state = self.state.lock();
        let now = Instant::now();

        if !ignore_cache {
            if let Some(result) = state.entries.get(&key).and_then(|e| e.fresh(now)) {
                drop(state);
                Counters::bump(&self.counters.hits);
                tracing::trace!(target: targets::CACHE, key = %key, "cache hit");
                return result.map_err(CacheError::from);
            }
        }

        Counters::bump(&self.counters.misses);
        let attempt = {
            let pending = self.pending_for(&mut state, &key, now)?;
            pending.blocked += 1;
            pending.attempt.clone()
        };
        let deadline = saturating_add(attempt.started, self.config.query_timeout);

        loop {
            if let Some(outcome) = attempt.outcome() {
                let result = outcome.clone();
                drop(state);
                return result
                    .map(|answer| Lookup {
                        answer,
                        cache_hit: false,
                    })
                    .map_err(CacheError::from);
            }

            if attempt.condvar.wait_until(&mut state, deadline).timed_out()
                && attempt.outcome().is_none()
            {
                let delivery =
                    self.finish_locked(&mut state, &key, attempt.id, Err(ResolveError::Timeout));
                drop(state);
                tracing::warn!(
                    target: targets::CACHE,
                    key = %key,
                    attempt = attempt.id,
                    timeout_ms = self.config.query_timeout.as_millis() as u64,
                    "query timed out"
                );
                if let Some(delivery) = delivery {
                    delivery.deliver();
                }
                return Err(ResolveError::Timeout.into());
            }
        }
    }

    pub(crate) fn query_with(&self, key: QueryKey, ignore_cache: bool, callback: QueryCallback) {
        let mut state = self.state.lock();
        let now = Instant::now();

        if !ignore_cache {
            if let Some(result) = state.entries.get(&key).and_then(|e| e.fresh(now)) {
                drop(state);
                Counters::bump(&self.counters.hits);
                tracing::trace!(target: targets::CACHE, key = %key, "cache hit");
                invoke(callback, result, &key);
                return;
            }
        }

        Counters::bump(&self.counters.misses);
        let rejected = match self.pending_for(&mut state, &key, now) {
            Ok(pending) => {
                pending.callbacks.push(callback);
                None
            }
            Err(error) => Some((error, callback)),
        };
        drop(state);

        if let Some((error, callback)) = rejected {
            invoke(callback, Err(error), &key);
        }
    }

    /// Whether `attempt` is still the in-flight attempt for `key`.
    pub(crate) fn is_current(&self, key: &QueryKey, attempt: u64) -> bool {
        self.state
            .lock()
            .entries
            .get(key)
            .and_then(|e| e.pending.as_ref())
            .is_some_and(|p| p.attempt.id == attempt)
    }

    /// Record a worker's result and deliver it.
    pub(crate) fn complete(
        &self,
        key: &QueryKey,
        attempt: u64,
        result: std::result::Result<Response, ResolveError>,
    ) {
        let delivery = {
            let mut state = self.state.lock();
            self.finish_locked(&mut state, key, attempt, result)
        };
        match delivery {
            Some(delivery) => delivery.deliver(),
            None => {
                Counters::bump(&self.counters.discarded);
                tracing::debug!(target: targets::CACHE, key = %key, attempt, "discarding late result");
            }
        }
    }

    /// Fail every attempt that has been in flight for longer than the query
    /// timeout.
    pub(crate) fn expire_overdue(&self) -> usize {
        let now = Instant::now();
        let timeout = self.config.query_timeout;
        let deliveries: Vec<Delivery> = {
            let mut state = self.state.lock();
            let overdue: Vec<(QueryKey, u64)> = state
                .entries
                .iter()
                .filter_map(|(key, entry)| {
                    let pending = entry.pending.as_ref()?;
                    (now.saturating_duration_since(pending.attempt.started) >= timeout)
                        .then(|| (key.clone(), pending.attempt.id))
                })
                .collect();
            overdue
                .into_iter()
                .filter_map(|(key, id)| {
                    self.finish_locked(&mut state, &key, id, Err(ResolveError::Timeout))
                })
                .collect()
        };

        let count = deliveries.len();
        for delivery in deliveries {
            tracing::warn!(target: targets::CACHE, key = %delivery.key, "query timed out");
            delivery.deliver();
        }
        count
    }

    /// Stop accepting new attempts. Returns `false` if already stopped.
    fn begin_shutdown(&self) -> bool {
        std::mem::replace(&mut self.state.lock().running, false)
    }

    /// Fail every in-flight attempt with `error`.
    fn fail_pending(&self, error: ResolveError) -> usize {
        let deliveries: Vec<Delivery> = {
            let mut state = self.state.lock();
            let pending: Vec<(QueryKey, u64)> = state
                .entries
                .iter()
                .filter_map(|(key, entry)| Some((key.clone(), entry.pending.as_ref()?.attempt.id)))
                .collect();
            pending
                .into_iter()
                .filter_map(|(key, id)| self.finish_locked(&mut state, &key, id, Err(error.clone())))
                .collect()
        };

        let count = deliveries.len();
        for delivery in deliveries {
            delivery.deliver();
        }
        count
    }

    pub(crate) fn is_running(&self) -> bool {
        self.state.lock().running
    }

    pub(crate) fn lookup(&self, key: &QueryKey) -> Option<Arc<CachedAnswer>> {
        let state = self.state.lock();
        match state.entries.get(key)?.fresh(Instant::now())? {
            Ok(lookup) => Some(lookup.answer),
            Err(_) => None,
        }
    }

    pub(crate) fn keys(&self) -> Vec<QueryKey> {
        let mut keys: Vec<QueryKey> = self.state.lock().entries.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub(crate) fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub(crate) fn evict(&self, key: &QueryKey) -> bool {
        let mut state = self.state.lock();
        match state.entries.get(key) {
            None => false,
            Some(entry) if entry.pending.is_some() => {
                tracing::debug!(target: targets::CACHE, key = %key, "not evicting entry with attempt in flight");
                false
            }
            Some(_) => {
                state.entries.remove(key);
                tracing::debug!(target: targets::CACHE, key = %key, "evicted");
                true
            }
        }
    }

    pub(crate) fn identify_expired(&self, percent: u8) -> Vec<QueryKey> {
        let now = Instant::now();
        let state = self.state.lock();
        let mut keys: Vec<QueryKey> = state
            .entries
            .iter()
            .filter(|(_, entry)| entry.refresh_due(now, percent))
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        keys
    }

    /// Keys from `keys` that are absent, failed, or past `percent` of their
    /// lifetime, skipping those with an attempt already in flight.
    pub(crate) fn due_for_refresh(&self, keys: &[QueryKey], percent: u8) -> Vec<QueryKey> {
        let now = Instant::now();
        let state = self.state.lock();
        keys.iter()
            .filter(|key| {
                state
                    .entries
                    .get(*key)
                    .is_none_or(|entry| entry.refresh_due(now, percent))
            })
            .cloned()
            .collect()
    }

    pub(crate) fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut state = self.state.lock();
        let before = state.entries.len();
        state.entries.retain(|_, entry| !entry.is_stale(now));
        before - state.entries.len()
    }

    pub(crate) fn reset_new_query_count(&self) -> usize {
        std::mem::take(&mut self.state.lock().new_queries)
    }

    pub(crate) fn stats(&self) -> CacheStats {
        self.counters.snapshot()
    }
}

/// A thread-safe DNS query cache with its worker pool and refresher.
///
/// Create one per resolver and share it by reference or `Arc`. Dropping the
/// cache shuts it down.
pub struct Cache {
    shared: Arc<CacheShared>,
    processor: QueryProcessor,
    watchdog: IntervalTimer,
    refresher: Refresher,
    stopped: AtomicBool,
}

impl Cache {
    /// Create a cache backed by `resolver` and start its threads.
    ///
    /// If the configuration names a refresh-list file, it is loaded and
    /// every listed query is resolved in the background.
    pub fn new<R: Resolve>(resolver: R, config: CacheConfig) -> Result<Self> {
        Self::with_resolver(Arc::new(resolver), config)
    }

    /// Create a cache from a shared resolver.
    pub fn with_resolver(resolver: Arc<dyn Resolve>, config: CacheConfig) -> Result<Self> {
        let (sender, receiver) = unbounded();
        let shared = Arc::new(CacheShared {
            state: Mutex::new(CacheState {
                entries: HashMap::new(),
                running: true,
                next_attempt: 0,
                new_queries: 0,
            }),
            work: sender,
            counters: Counters::default(),
            refresh_list: RefreshList::new(config.refresh.query_file.clone()),
            config,
        });

        let config = shared.config();
        let processor = QueryProcessor::start(
            &shared,
            receiver,
            resolver,
            config.workers.max(1),
            &config.thread_name,
        )?;

        let stop_processor = |err: CacheError| {
            shared.begin_shutdown();
            processor.shutdown(shared.work_sender(), Duration::ZERO);
            shared.fail_pending(ResolveError::Shutdown);
            err
        };

        let watchdog_shared = Arc::downgrade(&shared);
        let watchdog = IntervalTimer::start(
            format!("{}-watchdog", config.thread_name),
            config.watchdog_interval,
            move || {
                if let Some(shared) = watchdog_shared.upgrade() {
                    shared.expire_overdue();
                }
            },
        )
        .map_err(stop_processor)?;

        let refresher = Refresher::start(shared.clone()).map_err(stop_processor)?;

        let cache = Self {
            shared,
            processor,
            watchdog,
            refresher,
            stopped: AtomicBool::new(false),
        };

        if let Some(path) = cache.shared.config().refresh.query_file.clone() {
            if let Err(err) = cache.refresher.load(&path) {
                tracing::warn!(target: targets::CACHE, error = %err, "could not load refresh list");
            }
        }

        tracing::info!(
            target: targets::CACHE,
            workers = cache.processor.workers(),
            "cache started"
        );
        Ok(cache)
    }

    /// The configuration the cache was created with.
    pub fn config(&self) -> &CacheConfig {
        self.shared.config()
    }

    /// Resolve `domain`, blocking until an answer or failure is available.
    ///
    /// With `ignore_cache` set a fresh resolution is performed (or joined)
    /// even if a valid answer is cached.
    pub fn query(&self, record_type: RecordType, domain: &str, ignore_cache: bool) -> Result<Lookup> {
        let key = QueryKey::new(record_type, domain)?;
        self.shared.query(key, ignore_cache)
    }

    /// Blocking lookup by key.
    pub fn query_key(&self, key: &QueryKey, ignore_cache: bool) -> Result<Lookup> {
        self.shared.query(key.clone(), ignore_cache)
    }

    /// Resolve `domain` without blocking.
    ///
    /// On a hit `callback` runs on the calling thread before this returns.
    /// Otherwise it runs on whichever thread completes the attempt (a worker,
    /// the watchdog, or the thread shutting the cache down). An invalid key
    /// is reported through the return value and the callback is not called.
    pub fn query_with<F>(
        &self,
        record_type: RecordType,
        domain: &str,
        ignore_cache: bool,
        callback: F,
    ) -> Result<()>
    where
        F: FnOnce(QueryResult) + Send + 'static,
    {
        let key = QueryKey::new(record_type, domain)?;
        self.shared.query_with(key, ignore_cache, Box::new(callback));
        Ok(())
    }

    /// Non-blocking lookup by key.
    pub fn query_key_with<F>(&self, key: &QueryKey, ignore_cache: bool, callback: F)
    where
        F: FnOnce(QueryResult) + Send + 'static,
    {
        self.shared.query_with(key.clone(), ignore_cache, Box::new(callback));
    }

    /// The cached, unexpired answer for `key`, without resolving.
    pub fn lookup(&self, key: &QueryKey) -> Option<Arc<CachedAnswer>> {
        self.shared.lookup(key)
    }

    /// Every key with cache state, sorted.
    pub fn keys(&self) -> Vec<QueryKey> {
        self.shared.keys()
    }

    /// Number of keys with cache state.
    pub fn len(&self) -> usize {
        self.shared.len()
    }

    /// True when the cache holds no state.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove the entry for `key` so the next lookup re-resolves.
    ///
    /// Entries with an attempt in flight are kept; returns whether anything
    /// was removed.
    pub fn evict(&self, key: &QueryKey) -> bool {
        self.shared.evict(key)
    }

    /// Remove the entry for `(record_type, domain)`.
    pub fn invalidate(&self, record_type: RecordType, domain: &str) -> Result<bool> {
        let key = QueryKey::new(record_type, domain)?;
        Ok(self.evict(&key))
    }

    /// Keys whose answers are expired, failed, or past `percent` of their
    /// lifetime.
    pub fn identify_expired(&self, percent: u8) -> Vec<QueryKey> {
        self.shared.identify_expired(percent)
    }

    /// Drop expired and failed entries that have nothing in flight. Returns
    /// the number removed.
    pub fn purge_expired(&self) -> usize {
        self.shared.purge_expired()
    }

    /// Number of first-time misses since the previous call.
    pub fn reset_new_query_count(&self) -> usize {
        self.shared.reset_new_query_count()
    }

    /// Activity counters.
    pub fn stats(&self) -> CacheStats {
        self.shared.stats()
    }

    /// The background refresher.
    pub fn refresher(&self) -> &Refresher {
        &self.refresher
    }

    /// Load a refresh list, register its keys and resolve them in the
    /// background. The file becomes the save target.
    pub fn load_queries(&self, path: impl AsRef<Path>) -> Result<usize> {
        Ok(self.refresher.load(path.as_ref())?)
    }

    /// Save the refresh list to `path` whenever it changed, every `interval`.
    pub fn init_save_queries(&self, path: impl AsRef<Path>, interval: Duration) {
        self.refresher.set_query_file(path.as_ref(), interval);
    }

    /// Save the refresh list now.
    pub fn save_queries(&self) -> std::result::Result<usize, PersistenceError> {
        self.refresher.save()
    }

    /// Refresh every registered key now.
    pub fn force_refresh(&self) {
        self.refresher.force_refresh();
    }

    /// Add `key` to the refresh list.
    pub fn register(&self, key: QueryKey) -> bool {
        self.refresher.register(key)
    }

    /// Remove `key` from the refresh list.
    pub fn unregister(&self, key: &QueryKey) -> bool {
        self.refresher.unregister(key)
    }

    /// Whether the cache still accepts new attempts.
    pub fn is_running(&self) -> bool {
        self.shared.is_running()
    }

    /// Stop the refresher and the worker pool.
    ///
    /// Queued and in-flight resolutions get up to the configured grace
    /// period to complete. Anything still pending afterwards fails with
    /// [`ResolveError::Shutdown`], so no caller stays blocked and no callback
    /// runs after this returns. Calling it again does nothing.
    pub fn shutdown(&self) {
        if self.stopped.swap(true, Ordering::AcqRel) {
            return;
        }
        tracing::info!(target: targets::CACHE, "cache shutting down");

        self.refresher.stop();
        self.shared.begin_shutdown();
        let drained = self
            .processor
            .shutdown(self.shared.work_sender(), self.shared.config().shutdown_grace);
        self.watchdog.cancel();
        let failed = self.shared.fail_pending(ResolveError::Shutdown);

        tracing::info!(target: targets::CACHE, drained, failed, "cache stopped");
    }
}

impl Drop for Cache {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for Cache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cache")
            .field("entries", &self.len())
            .field("running", &self.is_running())
            .field("processor", &self.processor)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{RData, ResourceRecord};
    use std::net::Ipv4Addr;
    use std::sync::atomic::AtomicUsize;

    fn counting_cache(ttl: u32) -> (Cache, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        let cache = Cache::new(
            move |key: &QueryKey| {
                calls_clone.fetch_add(1, Ordering::SeqCst);
                if key.domain().starts_with("missing") {
                    return Err(ResolveError::NxDomain);
                }
                Ok(Response::with_answers(vec![ResourceRecord::new(
                    key.domain(),
                    ttl,
                    RData::A(Ipv4Addr::new(192, 0, 2, 1)),
                )]))
            },
            CacheConfig::default().workers(2),
        )
        .unwrap();
        (cache, calls)
    }

    #[test]
    fn test_miss_then_hit() {
        let (cache, calls) = counting_cache(300);
        let first = cache.query(RecordType::A, "node1.example", false).unwrap();
        assert!(!first.cache_hit);
        let second = cache.query(RecordType::A, "node1.example", false).unwrap();
        assert!(second.cache_hit);
        assert!(Arc::ptr_eq(&first.answer, &second.answer));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.resolutions, 1);
    }

    #[test]
    fn test_ignore_cache_re_resolves() {
        let (cache, calls) = counting_cache(300);
        cache.query(RecordType::A, "node1.example", false).unwrap();
        let fresh = cache.query(RecordType::A, "node1.example", true).unwrap();
        assert!(!fresh.cache_hit);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_invalid_key_rejected() {
        let (cache, calls) = counting_cache(300);
        let err = cache.query(RecordType::A, "bad..name", false).unwrap_err();
        assert!(matches!(err, CacheError::InvalidKey(_)));
        assert!(cache.query_with(RecordType::A, "", false, |_| {}).is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_failure_not_cached_by_default() {
        let (cache, calls) = counting_cache(300);
        let err = cache.query(RecordType::A, "missing.example", false).unwrap_err();
        assert_eq!(err.resolve_error(), Some(&ResolveError::NxDomain));
        let _ = cache.query(RecordType::A, "missing.example", false);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_evict_and_lookup() {
        let (cache, calls) = counting_cache(300);
        let key = QueryKey::new(RecordType::A, "node1.example").unwrap();
        assert!(cache.lookup(&key).is_none());
        cache.query_key(&key, false).unwrap();
        assert!(cache.lookup(&key).is_some());
        assert_eq!(cache.keys(), vec![key.clone()]);

        assert!(cache.evict(&key));
        assert!(!cache.evict(&key));
        assert!(cache.lookup(&key).is_none());
        cache.query_key(&key, false).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_zero_ttl_answer_expires_immediately() {
        let (cache, calls) = counting_cache(0);
        cache.query(RecordType::A, "node1.example", false).unwrap();
        let again = cache.query(RecordType::A, "node1.example", false).unwrap();
        assert!(!again.cache_hit);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.identify_expired(80).len(), 1);
        assert_eq!(cache.purge_expired(), 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_new_query_count() {
        let (cache, _calls) = counting_cache(300);
        cache.query(RecordType::A, "a.example", false).unwrap();
        cache.query(RecordType::A, "b.example", false).unwrap();
        cache.query(RecordType::A, "a.example", false).unwrap();
        assert_eq!(cache.reset_new_query_count(), 2);
        assert_eq!(cache.reset_new_query_count(), 0);
    }

    #[test]
    fn test_query_after_shutdown() {
        let (cache, _calls) = counting_cache(300);
        cache.query(RecordType::A, "node1.example", false).unwrap();
        cache.shutdown();
        assert!(!cache.is_running());

        // Cached answers are still served.
        assert!(cache.query(RecordType::A, "node1.example", false).unwrap().cache_hit);
        let err = cache.query(RecordType::A, "node2.example", false).unwrap_err();
        assert_eq!(err.resolve_error(), Some(&ResolveError::Shutdown));
        cache.shutdown();
    }
}
