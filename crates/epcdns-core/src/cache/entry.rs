//! Cached values and in-flight attempt bookkeeping.

use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use parking_lot::Condvar;

use crate::error::ResolveError;
use crate::key::QueryKey;
use crate::record::{ResourceRecord, Response};

/// Stand-in horizon for durations that do not fit in an `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// `start + duration`, saturating to a far-future instant on overflow.
///
/// Configured durations such as `Duration::MAX` mean "never"; they must not
/// panic on a worker or caller thread.
pub(crate) fn saturating_add(start: Instant, duration: Duration) -> Instant {
    start
        .checked_add(duration)
        .or_else(|| start.checked_add(FAR_FUTURE))
        .unwrap_or(start)
}

/// What every waiter of an attempt receives.
pub type QueryResult = std::result::Result<Lookup, ResolveError>;

/// Continuation registered by [`Cache::query_with`](crate::Cache::query_with).
pub type QueryCallback = Box<dyn FnOnce(QueryResult) + Send + 'static>;

/// An immutable resolved answer.
///
/// Shared by `Arc` with every waiter of the attempt that produced it. A
/// re-resolution replaces the answer in the cache; it never mutates one that
/// callers may still hold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedAnswer {
    key: QueryKey,
    response: Response,
    ttl: Duration,
    resolved_at: Instant,
    expires_at: Instant,
}

impl CachedAnswer {
    /// Build an answer resolved at `now`.
    ///
    /// The lifetime is the smallest non-zero TTL in the response, capped at
    /// `max_ttl`. A response without any TTL lives for `fallback_ttl`.
    pub fn new(
        key: QueryKey,
        response: Response,
        now: Instant,
        max_ttl: Duration,
        fallback_ttl: Duration,
    ) -> Self {
        let ttl = response
            .min_ttl()
            .map(|secs| Duration::from_secs(u64::from(secs)).min(max_ttl))
            .unwrap_or(fallback_ttl);
        Self {
            key,
            response,
            ttl,
            resolved_at: now,
            expires_at: saturating_add(now, ttl),
        }
    }

    /// The key this answer was resolved for.
    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    /// Every section of the response.
    pub fn response(&self) -> &Response {
        &self.response
    }

    /// The answer section.
    pub fn answers(&self) -> &[ResourceRecord] {
        &self.response.answers
    }

    /// Effective lifetime of the answer.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// When the resolution completed.
    pub fn resolved_at(&self) -> Instant {
        self.resolved_at
    }

    /// When the answer stops being served.
    pub fn expires_at(&self) -> Instant {
        self.expires_at
    }

    /// Whether the answer is expired at `now`.
    pub fn is_expired_at(&self, now: Instant) -> bool {
        now >= self.expires_at
    }

    /// Whether the answer is expired now.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    /// Time left before expiry.
    pub fn remaining(&self) -> Duration {
        self.expires_at.saturating_duration_since(Instant::now())
    }

    /// Whether at least `percent` percent of the lifetime has passed.
    pub fn refresh_due(&self, now: Instant, percent: u8) -> bool {
        let fraction = f64::from(percent.min(100)) / 100.0;
        let threshold = Duration::try_from_secs_f64(self.ttl.as_secs_f64() * fraction).unwrap_or(self.ttl);
        now >= saturating_add(self.resolved_at, threshold)
    }
}

/// The result of a successful lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lookup {
    /// The answer.
    pub answer: Arc<CachedAnswer>,
    /// True when the answer was served without a resolution.
    pub cache_hit: bool,
}

impl Lookup {
    /// The answer section.
    pub fn answers(&self) -> &[ResourceRecord] {
        self.answer.answers()
    }
}

/// The last completed outcome for a key.
#[derive(Debug, Clone)]
pub(crate) enum Outcome {
    Resolved(Arc<CachedAnswer>),
    Failed {
        error: ResolveError,
        retry_after: Instant,
    },
}

/// One resolution attempt.
///
/// Blocked callers wait on `condvar` together with the cache lock, and read
/// `outcome` under that lock once woken.
pub(crate) struct Attempt {
    pub(crate) id: u64,
    pub(crate) started: Instant,
    pub(crate) condvar: Condvar,
    outcome: OnceLock<std::result::Result<Arc<CachedAnswer>, ResolveError>>,
}

impl Attempt {
    pub(crate) fn new(id: u64, started: Instant) -> Self {
        Self {
            id,
            started,
            condvar: Condvar::new(),
            outcome: OnceLock::new(),
        }
    }

    pub(crate) fn outcome(&self) -> Option<&std::result::Result<Arc<CachedAnswer>, ResolveError>> {
        self.outcome.get()
    }

    /// Record the outcome. An attempt completes exactly once.
    pub(crate) fn complete(&self, key: &QueryKey, outcome: std::result::Result<Arc<CachedAnswer>, ResolveError>) {
        if self.outcome.set(outcome).is_err() {
            panic!("attempt {} for {key} completed twice", self.id);
        }
        self.condvar.notify_all();
    }
}

/// The waiter set of an in-flight attempt.
pub(crate) struct Pending {
    pub(crate) attempt: Arc<Attempt>,
    pub(crate) callbacks: Vec<QueryCallback>,
    pub(crate) blocked: usize,
}

impl Pending {
    pub(crate) fn new(attempt: Attempt) -> Self {
        Self {
            attempt: Arc::new(attempt),
            callbacks: Vec::new(),
            blocked: 0,
        }
    }
}

/// Per-key state. A refresh may be pending while the previous answer is
/// still being served.
#[derive(Default)]
pub(crate) struct CacheEntry {
    pub(crate) last: Option<Outcome>,
    pub(crate) pending: Option<Pending>,
}

impl CacheEntry {
    /// The outcome plain lookups may be served from at `now`.
    pub(crate) fn fresh(&self, now: Instant) -> Option<QueryResult> {
        match self.last.as_ref()? {
            Outcome::Resolved(answer) if !answer.is_expired_at(now) => Some(Ok(Lookup {
                answer: answer.clone(),
                cache_hit: true,
            })),
            Outcome::Failed { error, retry_after } if now < *retry_after => Some(Err(error.clone())),
            _ => None,
        }
    }

    /// Whether nothing is pending and the last outcome can no longer be served.
    pub(crate) fn is_stale(&self, now: Instant) -> bool {
        self.pending.is_none() && self.fresh(now).is_none()
    }

    /// Whether a background refresh should run at `now`.
    pub(crate) fn refresh_due(&self, now: Instant, percent: u8) -> bool {
        if self.pending.is_some() {
            return false;
        }
        match &self.last {
            None | Some(Outcome::Failed { .. }) => true,
            Some(Outcome::Resolved(answer)) => answer.refresh_due(now, percent),
        }
    }
}
