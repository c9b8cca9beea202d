// # Tokio Scheduler
//
// Implementation of Scheduler on top of tokio timers.
//
// Each timeout is a spawned task sleeping for the delay; cancelling aborts
// the task. Must be created from within a tokio runtime.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::AbortHandle;

use crate::traits::scheduler::{Scheduler, TimerCallback, TimerHandle};

type TaskMap = Arc<Mutex<HashMap<u64, AbortHandle>>>;

fn lock(tasks: &TaskMap) -> MutexGuard<'_, HashMap<u64, AbortHandle>> {
    tasks.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Scheduler backed by tokio tasks
pub struct TokioScheduler {
    runtime: Handle,
    next_handle: AtomicU64,
    tasks: TaskMap,
}

impl TokioScheduler {
    /// Create a scheduler spawning onto the current runtime
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn new() -> Self {
        Self::with_handle(Handle::current())
    }

    pub fn with_handle(runtime: Handle) -> Self {
        Self {
            runtime,
            next_handle: AtomicU64::new(1),
            tasks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Number of timers that have neither fired nor been cancelled
    pub fn pending(&self) -> usize {
        lock(&self.tasks).len()
    }
}

impl Scheduler for TokioScheduler {
    fn set_timeout(&self, delay: Duration, callback: TimerCallback) -> TimerHandle {
        let handle = self.next_handle.fetch_add(1, Ordering::SeqCst);
        let tasks = self.tasks.clone();

        // Held across spawn so the task cannot finish before it is registered
        let mut registered = lock(&self.tasks);
        let task = self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if lock(&tasks).remove(&handle).is_some() {
                callback();
            }
        });
        registered.insert(handle, task.abort_handle());

        TimerHandle(handle)
    }

    fn clear_timeout(&self, handle: TimerHandle) {
        if let Some(task) = lock(&self.tasks).remove(&handle.0) {
            task.abort();
        }
    }
}
