//! Repeating timers on dedicated threads.
//!
//! The cache uses one of these as its watchdog. Each timer owns a thread that
//! sleeps on a `crossbeam_channel::tick` and invokes the callback once per
//! tick. The callback runs on the timer thread, so at most one invocation is
//! in flight, and ticks that fall due while it runs are coalesced.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Sender, bounded, select, tick};
use parking_lot::Mutex;

use crate::error::{CacheError, Result};
use crate::logging::targets;

const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// A cancellable fixed-interval timer.
pub struct IntervalTimer {
    name: String,
    interval: Duration,
    /// Dropping the sender stops the timer thread.
    stop: Mutex<Option<Sender<()>>>,
    handle: Mutex<Option<JoinHandle<()>>>,
    fired: Arc<AtomicU64>,
}

impl IntervalTimer {
    /// Start a timer that calls `callback` every `interval`.
    ///
    /// The first invocation happens one interval after start.
    pub fn start<F>(name: impl Into<String>, interval: Duration, mut callback: F) -> Result<Self>
    where
        F: FnMut() + Send + 'static,
    {
        let name = name.into();
        let interval = interval.max(MIN_INTERVAL);
        let (stop_tx, stop_rx) = bounded::<()>(0);
        let fired = Arc::new(AtomicU64::new(0));
        let thread_fired = fired.clone();
        let thread_name = name.clone();

        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                let ticker = tick(interval);
                tracing::debug!(target: targets::TIMER, timer = %thread_name, ?interval, "timer started");
                loop {
                    select! {
                        recv(stop_rx) -> _ => break,
                        recv(ticker) -> _ => {
                            callback();
                            thread_fired.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                }
                tracing::debug!(target: targets::TIMER, timer = %thread_name, "timer stopped");
            })
            .map_err(|source| CacheError::ThreadSpawn {
                name: name.clone(),
                source,
            })?;

        Ok(Self {
            name,
            interval,
            stop: Mutex::new(Some(stop_tx)),
            handle: Mutex::new(Some(handle)),
            fired,
        })
    }

    /// The timer's thread name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The interval between invocations.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Number of completed callback invocations.
    pub fn fire_count(&self) -> u64 {
        self.fired.load(Ordering::Relaxed)
    }

    /// Whether the timer has not been cancelled yet.
    pub fn is_active(&self) -> bool {
        self.stop.lock().is_some()
    }

    /// Stop the timer and wait for an in-flight callback to return.
    ///
    /// Returns `false` if the timer was already cancelled. Calling this from
    /// the timer's own callback stops the timer without joining.
    pub fn cancel(&self) -> bool {
        let Some(stop) = self.stop.lock().take() else {
            return false;
        };
        drop(stop);

        if let Some(handle) = self.handle.lock().take() {
            if handle.thread().id() == thread::current().id() {
                return true;
            }
            if handle.join().is_err() {
                tracing::error!(target: targets::TIMER, timer = %self.name, "timer callback panicked");
            }
        }
        true
    }
}

impl Drop for IntervalTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for IntervalTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntervalTimer")
            .field("name", &self.name)
            .field("interval", &self.interval)
            .field("fired", &self.fire_count())
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_timer_fires_repeatedly() {
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = count.clone();
        let timer = IntervalTimer::start("test-timer", Duration::from_millis(10), move || {
            count_clone.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

        thread::sleep(Duration::from_millis(150));
        assert!(timer.cancel());
        let fired = count.load(Ordering::SeqCst);
        assert!(fired >= 2, "fired {fired} times");
        assert_eq!(timer.fire_count(), fired as u64);
    }

    #[test]
    fn test_cancel_stops_callbacks() {
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = count.clone();
        let timer = IntervalTimer::start("test-cancel", Duration::from_millis(5), move || {
            count_clone.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

        thread::sleep(Duration::from_millis(30));
        assert!(timer.cancel());
        assert!(!timer.is_active());
        let after_cancel = count.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(30));
        assert_eq!(count.load(Ordering::SeqCst), after_cancel);
        assert!(!timer.cancel());
    }

    #[test]
    fn test_zero_interval_is_clamped() {
        let timer = IntervalTimer::start("test-zero", Duration::ZERO, || {}).unwrap();
        assert_eq!(timer.interval(), MIN_INTERVAL);
    }
}
