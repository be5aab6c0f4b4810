use std::collections::HashMap;
use std::future::Future;
use std::sync::{Mutex, PoisonError};

use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};
use tracing::debug;

use crate::types::TimerKey;

/// Named one-shot timers that the controller re-arms on every firing.
///
/// At most one in-flight handle exists per key; starting a timer for a key
/// that already has one aborts the old handle first, so a restart always
/// begins the interval from zero. Aborting a sleeping timer is a quiet
/// shutdown path, never an error.
pub struct TimerSet {
    interval: Duration,
    handles: Mutex<HashMap<TimerKey, JoinHandle<()>>>,
}

impl TimerSet {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            handles: Mutex::new(HashMap::new()),
        }
    }

    fn handles(&self) -> std::sync::MutexGuard<'_, HashMap<TimerKey, JoinHandle<()>>> {
        self.handles.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Arms (or re-arms) the timer for `key`: after the configured interval,
    /// `on_fire` runs once.
    pub fn start<F, Fut>(&self, key: TimerKey, on_fire: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut handles = self.handles();
        if let Some(old) = handles.remove(&key) {
            old.abort();
        }

        let interval = self.interval;
        let interval_ms = interval.as_millis() as u64;
        debug!(timer = %key, interval_ms, "timer armed");
        handles.insert(
            key,
            tokio::spawn(async move {
                sleep(interval).await;
                debug!(timer = %key, "timer fired");
                on_fire().await;
            }),
        );
    }

    /// Cancels the timer for `key`. Returns whether one was in flight.
    pub fn cancel(&self, key: TimerKey) -> bool {
        match self.handles().remove(&key) {
            Some(handle) => {
                handle.abort();
                debug!(timer = %key, "timer canceled");
                true
            }
            None => false,
        }
    }

    /// Cancels every timer and clears the set.
    pub fn cancel_all(&self) {
        let mut handles = self.handles();
        for (key, handle) in handles.drain() {
            handle.abort();
            debug!(timer = %key, "timer canceled");
        }
    }

    /// Whether a timer for `key` is armed and still waiting or firing.
    pub fn is_armed(&self, key: TimerKey) -> bool {
        self.handles()
            .get(&key)
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for TimerSet {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
