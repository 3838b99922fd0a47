//! Per-path debouncing.
//!
//! Each path has at most one pending timer. A new change for the same path
//! cancels the pending timer and starts a fresh one, so a burst of edits fires
//! once, `delay` after the last edit. Timers are tokio tasks, so `on_change`
//! must be called from within a tokio runtime.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::AbortHandle;
use tracing::debug;

type FireFn = Arc<dyn Fn(String) + Send + Sync>;

struct PendingTimer {
    id: u64,
    task: AbortHandle,
}

pub struct Debouncer {
    delay: Duration,
    pending: Arc<Mutex<HashMap<String, PendingTimer>>>,
    on_fire: FireFn,
    next_id: AtomicU64,
}

impl fmt::Debug for Debouncer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Debouncer")
            .field("delay", &self.delay)
            .field("pending", &self.pending_count())
            .finish()
    }
}

impl Debouncer {
    /// Create a debouncer that calls `on_fire(path)` once a path has been
    /// quiet for `delay`.
    pub fn new<F>(delay: Duration, on_fire: F) -> Self
    where
        F: Fn(String) + Send + Sync + 'static,
    {
        Self {
            delay,
            pending: Arc::new(Mutex::new(HashMap::new())),
            on_fire: Arc::new(on_fire),
            next_id: AtomicU64::new(0),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Record a change to `path`, restarting its quiet period.
    pub fn on_change(&self, path: impl Into<String>) {
        let path = path.into();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        // Held across spawn and insert so the new timer cannot look itself up
        // before it is registered.
        let mut pending = self.pending.lock();

        if let Some(previous) = pending.remove(&path) {
            previous.task.abort();
            debug!("Debounce reset for {}", path);
        }

        let registry = Arc::clone(&self.pending);
        let on_fire = Arc::clone(&self.on_fire);
        let delay = self.delay;
        let key = path.clone();

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            // A timer that lost a race with a newer change must not fire.
            let current = {
                let mut pending = registry.lock();
                match pending.get(&key) {
                    Some(timer) if timer.id == id => {
                        pending.remove(&key);
                        true
                    }
                    _ => false,
                }
            };

            if current {
                debug!("Debounce fired for {}", key);
                on_fire(key);
            }
        });

        pending.insert(
            path,
            PendingTimer {
                id,
                task: handle.abort_handle(),
            },
        );
    }

    /// Cancel every pending timer without firing. Returns how many were
    /// cancelled.
    pub fn cancel_all(&self) -> usize {
        let drained: Vec<PendingTimer> = self.pending.lock().drain().map(|(_, t)| t).collect();
        for timer in &drained {
            timer.task.abort();
        }
        if !drained.is_empty() {
            debug!("Cancelled {} pending debounce timer(s)", drained.len());
        }
        drained.len()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn is_pending(&self, path: &str) -> bool {
        self.pending.lock().contains_key(path)
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
