//! Background TTL sweepers.
//!
//! One sweeper thread per typed store. Each waits a randomized startup
//! delay so the four sweepers don't take their store locks in lockstep,
//! then calls `store.evict(&expiry)` once per tick. Stopping is
//! synchronous: after `stop` returns, no further eviction can occur.

use ember_storage::{ExpiryMap, Store};
use parking_lot::{Condvar, Mutex};
use rand::Rng;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::debug;

/// Lower bound of the randomized startup delay.
const MIN_STARTUP_DELAY: Duration = Duration::from_millis(500);
/// Upper bound of the randomized startup delay.
const MAX_STARTUP_DELAY: Duration = Duration::from_millis(1000);

struct SweeperShared {
    stop: Mutex<bool>,
    signal: Condvar,
}

/// Handle to one background sweeper thread.
pub(crate) struct Sweeper {
    shared: Arc<SweeperShared>,
    handle: Option<JoinHandle<()>>,
}

impl Sweeper {
    /// Spawn a sweeper over `store`, ticking every `interval`.
    ///
    /// Threads are named `ember-sweep-<type>`.
    pub fn spawn(store: Arc<dyn Store>, expiry: Arc<ExpiryMap>, interval: Duration) -> Self {
        let shared = Arc::new(SweeperShared {
            stop: Mutex::new(false),
            signal: Condvar::new(),
        });

        let thread_shared = Arc::clone(&shared);
        let handle = std::thread::Builder::new()
            .name(format!("ember-sweep-{}", store.data_type().name()))
            .spawn(move || run(&thread_shared, store, expiry, interval))
            .expect("failed to spawn sweeper thread");

        Sweeper {
            shared,
            handle: Some(handle),
        }
    }

    /// Signal the thread and join it. After this returns the sweeper can no
    /// longer touch its store.
    pub fn stop(mut self) {
        {
            let mut stopped = self.shared.stop.lock();
            *stopped = true;
            // Notify while holding the lock: the thread is either already
            // waiting (and wakes) or will observe the flag before waiting.
            self.shared.signal.notify_all();
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn run(shared: &SweeperShared, store: Arc<dyn Store>, expiry: Arc<ExpiryMap>, interval: Duration) {
    if wait_for_stop(shared, startup_delay()) {
        return;
    }
    loop {
        if wait_for_stop(shared, interval) {
            return;
        }
        debug!(store = store.data_type().name(), "sweeping expired keys");
        store.evict(&expiry);
    }
}

/// Sleep for `timeout` unless the stop flag is raised first. Returns the
/// flag's final state.
fn wait_for_stop(shared: &SweeperShared, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    let mut stopped = shared.stop.lock();
    while !*stopped {
        if shared.signal.wait_until(&mut stopped, deadline).timed_out() {
            break;
        }
    }
    *stopped
}

/// Uniform random delay in [500 ms, 1000 ms) before the first tick.
fn startup_delay() -> Duration {
    let span = (MAX_STARTUP_DELAY - MIN_STARTUP_DELAY).as_millis() as u64;
    MIN_STARTUP_DELAY + Duration::from_millis(rand::thread_rng().gen_range(0..span))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_core::{clock, DataType};
    use ember_storage::StrStore;

    #[test]
    fn test_startup_delay_bounds() {
        for _ in 0..64 {
            let d = startup_delay();
            assert!(d >= MIN_STARTUP_DELAY);
            assert!(d < MAX_STARTUP_DELAY);
        }
    }

    #[test]
    fn test_stop_before_first_tick() {
        let store = Arc::new(StrStore::new());
        let expiry = Arc::new(ExpiryMap::new());
        let sweeper = Sweeper::spawn(store, expiry, Duration::from_secs(1));
        // Stop during the startup delay; must return promptly.
        sweeper.stop();
    }

    #[test]
    fn test_sweeper_removes_expired_key_without_reads() {
        let store = Arc::new(StrStore::new());
        let expiry = Arc::new(ExpiryMap::new());

        store.insert(b"stale", "v".to_string());
        expiry.set(DataType::String, "stale", clock::unix_seconds() - 5);
        store.insert(b"fresh", "v".to_string());
        expiry.set(DataType::String, "fresh", clock::unix_seconds() + 500);

        let sweeper = Sweeper::spawn(
            store.clone() as Arc<dyn Store>,
            expiry.clone(),
            Duration::from_millis(100),
        );

        // Startup delay (< 1 s) plus a couple of ticks.
        let deadline = Instant::now() + Duration::from_secs(3);
        while store.contains(b"stale") && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(50));
        }
        sweeper.stop();

        assert!(!store.contains(b"stale"), "sweeper should drop expired key");
        assert_eq!(expiry.get(DataType::String, "stale"), None);
        assert!(store.contains(b"fresh"));
    }

    #[test]
    fn test_no_eviction_after_stop() {
        let store = Arc::new(StrStore::new());
        let expiry = Arc::new(ExpiryMap::new());

        let sweeper = Sweeper::spawn(
            store.clone() as Arc<dyn Store>,
            expiry.clone(),
            Duration::from_millis(50),
        );
        sweeper.stop();

        // Expire a key only after the sweeper is fully stopped.
        store.insert(b"k", "v".to_string());
        expiry.set(DataType::String, "k", clock::unix_seconds() - 5);
        std::thread::sleep(Duration::from_millis(200));

        assert!(store.contains(b"k"), "stopped sweeper must not evict");
    }
}
