// # Manual Scheduler
//
// Deterministic implementation of Scheduler.
//
// ## Purpose
//
// Time only moves when `advance()` is called, so refresh cycles can be
// stepped through one timer at a time. Timers fire in deadline order; timers
// sharing a deadline fire in the order they were scheduled.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::traits::scheduler::{Scheduler, TimerCallback, TimerHandle};

struct PendingTimer {
    deadline: Duration,
    callback: TimerCallback,
}

#[derive(Default)]
struct ManualState {
    now: Duration,
    next_handle: u64,
    timers: BTreeMap<u64, PendingTimer>,
}

/// Scheduler driven by explicit calls to [`ManualScheduler::advance`]
#[derive(Default)]
pub struct ManualScheduler {
    inner: Mutex<ManualState>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, ManualState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Time elapsed since creation
    pub fn now(&self) -> Duration {
        self.state().now
    }

    /// Number of timers waiting to fire
    pub fn pending(&self) -> usize {
        self.state().timers.len()
    }

    /// Delays, measured from now, of all pending timers in firing order
    pub fn pending_delays(&self) -> Vec<Duration> {
        let state = self.state();
        let mut deadlines: Vec<Duration> = state.timers.values().map(|t| t.deadline).collect();
        deadlines.sort();
        deadlines
            .into_iter()
            .map(|deadline| deadline.saturating_sub(state.now))
            .collect()
    }

    /// Move time forward, firing every timer that falls due
    ///
    /// Returns how many timers fired. Timers scheduled by a firing callback
    /// fire in the same call when their deadline is within the window.
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.now() + by;
        let mut fired = 0;

        loop {
            let due = {
                let mut state = self.state();
                let next = state
                    .timers
                    .iter()
                    .filter(|(_, timer)| timer.deadline <= target)
                    .min_by_key(|(handle, timer)| (timer.deadline, **handle))
                    .map(|(handle, _)| *handle);

                next.and_then(|handle| state.timers.remove(&handle)).map(|timer| {
                    state.now = timer.deadline;
                    timer.callback
                })
            };

            match due {
                Some(callback) => {
                    callback();
                    fired += 1;
                }
                None => break,
            }
        }

        self.state().now = target;
        fired
    }
}

impl Scheduler for ManualScheduler {
    fn set_timeout(&self, delay: Duration, callback: TimerCallback) -> TimerHandle {
        let mut state = self.state();
        let handle = state.next_handle;
        state.next_handle += 1;
        let deadline = state.now + delay;
        state.timers.insert(handle, PendingTimer { deadline, callback });
        TimerHandle(handle)
    }

    fn clear_timeout(&self, handle: TimerHandle) {
        self.state().timers.remove(&handle.0);
    }
}
