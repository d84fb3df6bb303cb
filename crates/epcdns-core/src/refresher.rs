//! Background refresh of important queries.
//!
//! The refresher keeps a set of keys that should always be warm. Its thread
//! wakes every [`RefreshConfig::interval`](crate::RefreshConfig::interval) and
//! re-queries each key whose answer is missing, failed, or past the
//! configured percentage of its lifetime. Refreshes go through the normal
//! callback path with `ignore_cache` set, so they share de-duplication with
//! foreground lookups, and at most `max_concurrent` are outstanding at once.
//!
//! The set can be persisted to a plain text file (see [`crate::persist`]). A
//! changed set is saved every save interval and once more on shutdown.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, select, tick, unbounded};
use parking_lot::{Condvar, Mutex};

use crate::cache::{CacheShared, QueryResult};
use crate::error::{CacheError, PersistenceError, Result};
use crate::key::QueryKey;
use crate::logging::targets;
use crate::persist;

/// How often a refresher blocked on the concurrency limit checks for stop.
const PERMIT_POLL: Duration = Duration::from_millis(100);

/// A counting semaphore bounding outstanding refreshes.
struct Semaphore {
    available: Mutex<usize>,
    released: Condvar,
}

/// Returned to the semaphore on drop.
struct Permit(Arc<Semaphore>);

impl Semaphore {
    fn new(permits: usize) -> Arc<Self> {
        Arc::new(Self {
            available: Mutex::new(permits),
            released: Condvar::new(),
        })
    }

    fn acquire_timeout(self: &Arc<Self>, timeout: Duration) -> Option<Permit> {
        let mut available = self.available.lock();
        while *available == 0 {
            if self.released.wait_for(&mut available, timeout).timed_out() && *available == 0 {
                return None;
            }
        }
        *available -= 1;
        Some(Permit(self.clone()))
    }
}

impl Drop for Permit {
    fn drop(&mut self) {
        *self.0.available.lock() += 1;
        self.0.released.notify_one();
    }
}

struct RefreshSet {
    keys: BTreeSet<QueryKey>,
    dirty: bool,
    file: Option<PathBuf>,
}

/// The registered keys and their save target.
pub(crate) struct RefreshList {
    inner: Mutex<RefreshSet>,
    /// Serializes writers, which share one temporary file name.
    save_lock: Mutex<()>,
}

impl RefreshList {
    pub(crate) fn new(file: Option<PathBuf>) -> Self {
        Self {
            inner: Mutex::new(RefreshSet {
                keys: BTreeSet::new(),
                dirty: false,
                file,
            }),
            save_lock: Mutex::new(()),
        }
    }

    pub(crate) fn register(&self, key: QueryKey) -> bool {
        let mut inner = self.inner.lock();
        let added = inner.keys.insert(key);
        inner.dirty |= added;
        added
    }

    fn unregister(&self, key: &QueryKey) -> bool {
        let mut inner = self.inner.lock();
        let removed = inner.keys.remove(key);
        inner.dirty |= removed;
        removed
    }

    fn contains(&self, key: &QueryKey) -> bool {
        self.inner.lock().keys.contains(key)
    }

    fn snapshot(&self) -> Vec<QueryKey> {
        self.inner.lock().keys.iter().cloned().collect()
    }

    fn len(&self) -> usize {
        self.inner.lock().keys.len()
    }

    fn is_dirty(&self) -> bool {
        self.inner.lock().dirty
    }

    fn file(&self) -> Option<PathBuf> {
        self.inner.lock().file.clone()
    }

    fn set_file(&self, path: PathBuf) {
        let mut inner = self.inner.lock();
        inner.file = Some(path);
        inner.dirty = true;
    }

    /// Register keys read from `path` and make it the save target. The set
    /// is clean afterwards unless it holds keys the file does not. Returns
    /// the number of newly registered keys.
    fn adopt(&self, path: PathBuf, keys: &[QueryKey]) -> usize {
        let mut inner = self.inner.lock();
        let before = inner.keys.len();
        inner.keys.extend(keys.iter().cloned());
        let loaded = keys.iter().collect::<BTreeSet<_>>().len();
        inner.dirty = inner.keys.len() != loaded;
        inner.file = Some(path);
        inner.keys.len() - before
    }

    fn save(&self) -> std::result::Result<usize, PersistenceError> {
        let _writer = self.save_lock.lock();
        let (path, keys) = {
            let mut inner = self.inner.lock();
            let path = inner.file.clone().ok_or(PersistenceError::NotConfigured)?;
            inner.dirty = false;
            (path, inner.keys.iter().cloned().collect::<Vec<_>>())
        };

        match persist::save_queries(&path, &keys) {
            Ok(count) => {
                tracing::info!(target: targets::REFRESHER, path = %path.display(), count, "refresh list saved");
                Ok(count)
            }
            Err(err) => {
                self.inner.lock().dirty = true;
                Err(err)
            }
        }
    }
}

enum RefreshCommand {
    /// Refresh every registered key.
    ForceRefresh,
    /// Resolve these keys unless already cached.
    Warm(Vec<QueryKey>),
    /// Change the save interval.
    SaveInterval(Duration),
    Stop,
}

/// State the refresher thread works with.
struct RefreshContext {
    shared: Arc<CacheShared>,
    permits: Arc<Semaphore>,
    stopping: Arc<AtomicBool>,
    percent: u8,
}

impl RefreshContext {
    fn acquire(&self) -> Option<Permit> {
        loop {
            if self.stopping.load(Ordering::Acquire) {
                return None;
            }
            if let Some(permit) = self.permits.acquire_timeout(PERMIT_POLL) {
                return Some(permit);
            }
        }
    }

    /// Issue one query per key, bounded by the semaphore. Returns the number
    /// issued.
    fn issue(&self, keys: Vec<QueryKey>, ignore_cache: bool) -> usize {
        let mut issued = 0;
        for key in keys {
            let Some(permit) = self.acquire() else {
                break;
            };
            let logged_key = key.clone();
            self.shared.query_with(
                key,
                ignore_cache,
                Box::new(move |result: QueryResult| {
                    drop(permit);
                    match result {
                        Ok(_) => {
                            tracing::trace!(target: targets::REFRESHER, key = %logged_key, "refreshed");
                        }
                        Err(err) => {
                            tracing::warn!(
                                target: targets::REFRESHER,
                                key = %logged_key,
                                error = %err,
                                "refresh failed, will retry"
                            );
                        }
                    }
                }),
            );
            issued += 1;
        }
        issued
    }

    fn refresh_due(&self) {
        let keys = self.shared.refresh_list.snapshot();
        if keys.is_empty() {
            return;
        }
        let due = self.shared.due_for_refresh(&keys, self.percent);
        let total = keys.len();
        let issued = self.issue(due, true);
        tracing::debug!(target: targets::REFRESHER, total, issued, "refresh pass");
    }

    fn refresh_all(&self) {
        let keys = self.shared.refresh_list.snapshot();
        let issued = self.issue(keys, true);
        tracing::info!(target: targets::REFRESHER, issued, "forced refresh");
    }

    fn save_if_dirty(&self) {
        let list = &self.shared.refresh_list;
        if !list.is_dirty() || list.file().is_none() {
            return;
        }
        if let Err(err) = list.save() {
            tracing::warn!(target: targets::REFRESHER, error = %err, "could not save refresh list");
        }
    }
}

fn refresh_loop(ctx: RefreshContext, control: Receiver<RefreshCommand>, interval: Duration, save_interval: Duration) {
    let refresh_tick = tick(interval);
    let mut save_tick = tick(save_interval);

    loop {
        let mut new_save_interval = None;
        select! {
            recv(refresh_tick) -> _ => ctx.refresh_due(),
            recv(save_tick) -> _ => ctx.save_if_dirty(),
            recv(control) -> command => match command {
                Ok(RefreshCommand::ForceRefresh) => ctx.refresh_all(),
                Ok(RefreshCommand::Warm(keys)) => {
                    let issued = ctx.issue(keys, false);
                    tracing::debug!(target: targets::REFRESHER, issued, "warm-up queries issued");
                }
                Ok(RefreshCommand::SaveInterval(interval)) => new_save_interval = Some(interval),
                Ok(RefreshCommand::Stop) | Err(_) => break,
            },
        }
        if let Some(interval) = new_save_interval {
            save_tick = tick(interval.max(Duration::from_millis(1)));
        }
    }

    tracing::debug!(target: targets::REFRESHER, "refresher stopped");
}

/// Keeps registered queries warm and persists the list.
///
/// Owned by a [`Cache`](crate::Cache); reach it through
/// [`Cache::refresher`](crate::Cache::refresher).
pub struct Refresher {
    shared: Arc<CacheShared>,
    control: Sender<RefreshCommand>,
    stopping: Arc<AtomicBool>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Refresher {
    pub(crate) fn start(shared: Arc<CacheShared>) -> Result<Self> {
        let config = shared.config().refresh.clone();
        let name = format!("{}-refresher", shared.config().thread_name);
        let (control, receiver) = unbounded();
        let stopping = Arc::new(AtomicBool::new(false));

        let ctx = RefreshContext {
            shared: shared.clone(),
            permits: Semaphore::new(config.max_concurrent.max(1)),
            stopping: stopping.clone(),
            percent: config.percent.min(100),
        };
        let interval = config.interval.max(Duration::from_millis(1));
        let save_interval = config.save_interval.max(Duration::from_millis(1));

        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || refresh_loop(ctx, receiver, interval, save_interval))
            .map_err(|source| CacheError::ThreadSpawn { name, source })?;

        tracing::info!(
            target: targets::REFRESHER,
            ?interval,
            percent = config.percent,
            max_concurrent = config.max_concurrent,
            "refresher started"
        );

        Ok(Self {
            shared,
            control,
            stopping,
            handle: Mutex::new(Some(handle)),
        })
    }

    /// Add `key` to the list. Returns `false` if it was already registered.
    pub fn register(&self, key: QueryKey) -> bool {
        let added = self.shared.refresh_list.register(key);
        if added {
            tracing::debug!(target: targets::REFRESHER, "query registered");
        }
        added
    }

    /// Remove `key` from the list. Returns `false` if it was not registered.
    pub fn unregister(&self, key: &QueryKey) -> bool {
        self.shared.refresh_list.unregister(key)
    }

    /// Whether `key` is registered.
    pub fn contains(&self, key: &QueryKey) -> bool {
        self.shared.refresh_list.contains(key)
    }

    /// Registered keys, sorted.
    pub fn keys(&self) -> Vec<QueryKey> {
        self.shared.refresh_list.snapshot()
    }

    /// Number of registered keys.
    pub fn len(&self) -> usize {
        self.shared.refresh_list.len()
    }

    /// True when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the list changed since it was last saved or loaded.
    pub fn is_dirty(&self) -> bool {
        self.shared.refresh_list.is_dirty()
    }

    /// The current save target.
    pub fn query_file(&self) -> Option<PathBuf> {
        self.shared.refresh_list.file()
    }

    /// Refresh every registered key on the refresher thread.
    pub fn force_refresh(&self) {
        let _ = self.control.send(RefreshCommand::ForceRefresh);
    }

    /// Load keys from `path`, make it the save target, and resolve the
    /// loaded keys in the background. Returns the number of keys read.
    pub fn load(&self, path: &Path) -> std::result::Result<usize, PersistenceError> {
        let keys = persist::load_queries(path)?;
        let count = keys.len();

        let added = self.shared.refresh_list.adopt(path.to_path_buf(), &keys);

        tracing::info!(target: targets::REFRESHER, path = %path.display(), count, added, "refresh list loaded");
        let _ = self.control.send(RefreshCommand::Warm(keys));
        Ok(count)
    }

    /// Save the list to `path` every `interval` when it changed.
    pub fn set_query_file(&self, path: &Path, interval: Duration) {
        self.shared.refresh_list.set_file(path.to_path_buf());
        let _ = self.control.send(RefreshCommand::SaveInterval(interval));
    }

    /// Save the list now. Returns the number of keys written.
    pub fn save(&self) -> std::result::Result<usize, PersistenceError> {
        self.shared.refresh_list.save()
    }

    /// Stop the thread and save a changed list.
    pub(crate) fn stop(&self) {
        self.stopping.store(true, Ordering::Release);
        let _ = self.control.send(RefreshCommand::Stop);

        if let Some(handle) = self.handle.lock().take() {
            if handle.thread().id() != thread::current().id() && handle.join().is_err() {
                tracing::error!(target: targets::REFRESHER, "refresher thread panicked");
            }
        }

        let list = &self.shared.refresh_list;
        if list.is_dirty() && list.file().is_some() {
            if let Err(err) = list.save() {
                tracing::warn!(target: targets::REFRESHER, error = %err, "could not save refresh list at shutdown");
            }
        }
    }
}

impl std::fmt::Debug for Refresher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Refresher")
            .field("keys", &self.len())
            .field("dirty", &self.is_dirty())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RecordType;

    #[test]
    fn test_semaphore_limits() {
        let semaphore = Semaphore::new(2);
        let a = semaphore.acquire_timeout(Duration::from_millis(10));
        let b = semaphore.acquire_timeout(Duration::from_millis(10));
        assert!(a.is_some() && b.is_some());
        assert!(semaphore.acquire_timeout(Duration::from_millis(10)).is_none());
        drop(a);
        assert!(semaphore.acquire_timeout(Duration::from_millis(10)).is_some());
    }

    #[test]
    fn test_list_dirty_tracking() {
        let list = RefreshList::new(None);
        let key = QueryKey::new(RecordType::A, "node1.example").unwrap();
        assert!(list.register(key.clone()));
        assert!(!list.register(key.clone()));
        assert!(list.is_dirty());
        assert!(matches!(list.save(), Err(PersistenceError::NotConfigured)));
        assert!(list.unregister(&key));
        assert!(!list.unregister(&key));
        assert_eq!(list.len(), 0);
    }

    #[test]
    fn test_adopt_marks_clean_only_when_matching_file() {
        let list = RefreshList::new(None);
        let keys = vec![
            QueryKey::new(RecordType::A, "a.example").unwrap(),
            QueryKey::new(RecordType::A, "b.example").unwrap(),
        ];
        assert_eq!(list.adopt(PathBuf::from("queries.txt"), &keys), 2);
        assert!(!list.is_dirty());
        assert_eq!(list.file(), Some(PathBuf::from("queries.txt")));

        list.register(QueryKey::new(RecordType::Srv, "c.example").unwrap());
        assert_eq!(list.adopt(PathBuf::from("queries.txt"), &keys), 0);
        assert!(list.is_dirty());
    }
}
