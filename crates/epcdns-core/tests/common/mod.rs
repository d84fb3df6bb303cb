//! Shared fixtures for the cache integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use epcdns_core::{QueryKey, RData, Resolve, ResolveError, ResourceRecord, Response};
use parking_lot::{Condvar, Mutex};

/// Install a test subscriber once; honours `RUST_LOG`.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[derive(Default)]
struct Script {
    calls: HashMap<QueryKey, usize>,
    in_flight: usize,
    max_in_flight: usize,
    failing: bool,
    released: bool,
}

/// A resolver whose behaviour is chosen by the queried name.
///
/// - names starting with `nx` fail with `NxDomain`
/// - names starting with `hang` block until [`ScriptedResolver::release`]
/// - everything else answers one A record after `delay`
pub struct ScriptedResolver {
    script: Mutex<Script>,
    released: Condvar,
    delay: Duration,
    ttl: u32,
}

impl ScriptedResolver {
    pub fn new(ttl: u32, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(Script::default()),
            released: Condvar::new(),
            delay,
            ttl,
        })
    }

    /// Unblock every `hang` resolution, now and later.
    pub fn release(&self) {
        self.script.lock().released = true;
        self.released.notify_all();
    }

    /// Make every resolution fail with `ServFail`.
    pub fn set_failing(&self, failing: bool) {
        self.script.lock().failing = failing;
    }

    pub fn total_calls(&self) -> usize {
        self.script.lock().calls.values().sum()
    }

    pub fn calls_for(&self, key: &QueryKey) -> usize {
        self.script.lock().calls.get(key).copied().unwrap_or(0)
    }

    pub fn max_in_flight(&self) -> usize {
        self.script.lock().max_in_flight
    }

    /// Poll until `total_calls() >= count` or `timeout` passes.
    pub fn wait_for_calls(&self, count: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if self.total_calls() >= count {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        self.total_calls() >= count
    }
}

impl Resolve for ScriptedResolver {
    fn resolve(&self, key: &QueryKey) -> Result<Response, ResolveError> {
        let failing = {
            let mut script = self.script.lock();
            *script.calls.entry(key.clone()).or_insert(0) += 1;
            script.in_flight += 1;
            script.max_in_flight = script.max_in_flight.max(script.in_flight);
            script.failing
        };

        if key.domain().starts_with("hang") {
            let mut script = self.script.lock();
            let deadline = Instant::now() + Duration::from_secs(10);
            while !script.released {
                if self.released.wait_until(&mut script, deadline).timed_out() {
                    break;
                }
            }
        } else if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }

        self.script.lock().in_flight -= 1;

        if failing {
            return Err(ResolveError::ServFail);
        }
        if key.domain().starts_with("nx") {
            return Err(ResolveError::NxDomain);
        }
        Ok(Response::with_answers(vec![ResourceRecord::new(
            key.domain(),
            self.ttl,
            RData::A(Ipv4Addr::new(10, 0, 0, 1)),
        )]))
    }
}
