//! Resolver worker pool.
//!
//! A fixed set of threads consume a shared FIFO queue of pending keys. The
//! cache is the only producer and enqueues a key exactly once per attempt, so
//! at most one worker resolves a given key at any moment.
//!
//! Shutdown places one [`WorkItem::Shutdown`] per worker at the tail of the
//! queue. Work queued before it is still resolved and delivered; each worker
//! exits on the first shutdown item it sees.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};
use parking_lot::{Condvar, Mutex};

use crate::cache::{CacheShared, saturating_add};
use crate::error::{CacheError, ResolveError, Result};
use crate::key::QueryKey;
use crate::logging::targets;
use crate::resolver::Resolve;

/// An item on the work queue.
#[derive(Debug)]
pub(crate) enum WorkItem {
    /// Resolve `key` for attempt `attempt`.
    Resolve { key: QueryKey, attempt: u64 },
    /// Exit the worker loop.
    Shutdown,
}

/// Tracks live workers so shutdown can wait for them with a bound.
struct PoolState {
    active: Mutex<usize>,
    exited: Condvar,
}

/// Decrements the live-worker count when a worker thread ends, even by panic.
struct ExitGuard(Arc<PoolState>);

impl Drop for ExitGuard {
    fn drop(&mut self) {
        let mut active = self.0.active.lock();
        *active = active.saturating_sub(1);
        self.0.exited.notify_all();
    }
}

/// The worker threads behind a [`Cache`](crate::Cache).
pub struct QueryProcessor {
    handles: Mutex<Vec<JoinHandle<()>>>,
    state: Arc<PoolState>,
    workers: usize,
}

impl QueryProcessor {
    /// Spawn `workers` threads consuming `receiver`.
    pub(crate) fn start(
        shared: &Arc<CacheShared>,
        receiver: Receiver<WorkItem>,
        resolver: Arc<dyn Resolve>,
        workers: usize,
        thread_name: &str,
    ) -> Result<Self> {
        let state = Arc::new(PoolState {
            active: Mutex::new(0),
            exited: Condvar::new(),
        });
        let processor = Self {
            handles: Mutex::new(Vec::with_capacity(workers)),
            state,
            workers,
        };

        for index in 0..workers {
            let name = format!("{thread_name}-worker-{index}");
            let receiver = receiver.clone();
            let worker_shared = shared.clone();
            let resolver = resolver.clone();
            let guard = ExitGuard(processor.state.clone());

            *processor.state.active.lock() += 1;
            let spawned = thread::Builder::new().name(name.clone()).spawn(move || {
                let _guard = guard;
                worker_loop(index, receiver, worker_shared, resolver);
            });

            match spawned {
                Ok(handle) => processor.handles.lock().push(handle),
                Err(source) => {
                    // The closure and its guard were dropped, which released the slot.
                    processor.shutdown(shared.work_sender(), Duration::ZERO);
                    return Err(CacheError::ThreadSpawn { name, source });
                }
            }
        }

        tracing::info!(target: targets::PROCESSOR, workers, "query processor started");
        Ok(processor)
    }

    /// Number of worker threads.
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Number of worker threads that have not exited yet.
    pub fn active_workers(&self) -> usize {
        *self.state.active.lock()
    }

    /// Ask every worker to exit once the queue ahead of it is drained, then
    /// wait up to `grace` for them.
    ///
    /// Returns `true` if every worker exited in time. Workers that are still
    /// busy are left detached; their late results are discarded by the cache.
    pub(crate) fn shutdown(&self, sender: &Sender<WorkItem>, grace: Duration) -> bool {
        let pending = self.active_workers();
        for _ in 0..pending {
            if sender.send(WorkItem::Shutdown).is_err() {
                break;
            }
        }

        let deadline = saturating_add(Instant::now(), grace);
        let mut active = self.state.active.lock();
        while *active > 0 {
            if self.state.exited.wait_until(&mut active, deadline).timed_out() {
                break;
            }
        }
        let remaining = *active;
        drop(active);

        let mut handles = self.handles.lock();
        let (finished, running): (Vec<_>, Vec<_>) =
            handles.drain(..).partition(|handle| handle.is_finished());
        *handles = running;
        drop(handles);

        for handle in finished {
            if handle.join().is_err() {
                tracing::error!(target: targets::PROCESSOR, "worker thread panicked");
            }
        }

        if remaining > 0 {
            tracing::warn!(
                target: targets::PROCESSOR,
                remaining,
                ?grace,
                "workers still busy after shutdown grace period"
            );
        }
        remaining == 0
    }
}

impl std::fmt::Debug for QueryProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryProcessor")
            .field("workers", &self.workers)
            .field("active", &self.active_workers())
            .finish()
    }
}

fn worker_loop(
    index: usize,
    receiver: Receiver<WorkItem>,
    shared: Arc<CacheShared>,
    resolver: Arc<dyn Resolve>,
) {
    tracing::debug!(target: targets::PROCESSOR, worker = index, "worker started");

    while let Ok(item) = receiver.recv() {
        let WorkItem::Resolve { key, attempt } = item else {
            break;
        };

        // The attempt may have timed out while queued.
        if !shared.is_current(&key, attempt) {
            tracing::debug!(target: targets::PROCESSOR, key = %key, attempt, "skipping stale work item");
            continue;
        }

        let started = Instant::now();
        let result = panic::catch_unwind(AssertUnwindSafe(|| resolver.resolve(&key)))
            .unwrap_or_else(|_| {
                tracing::error!(target: targets::PROCESSOR, key = %key, "resolver panicked");
                Err(ResolveError::Network("resolver panicked".to_string()))
            });

        tracing::debug!(
            target: targets::PROCESSOR,
            worker = index,
            key = %key,
            attempt,
            ok = result.is_ok(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "resolution finished"
        );

        if panic::catch_unwind(AssertUnwindSafe(|| shared.complete(&key, attempt, result))).is_err() {
            tracing::error!(target: targets::PROCESSOR, key = %key, attempt, "completing attempt panicked");
        }
    }

    tracing::debug!(target: targets::PROCESSOR, worker = index, "worker stopped");
}
