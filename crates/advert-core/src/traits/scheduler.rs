// # Scheduler Trait
//
// One-shot timers, the browser's `setTimeout`/`clearTimeout` pair.
//
// ## Implementations
//
// - `crate::scheduler::ManualScheduler`: deterministic, advanced by hand
// - `crate::scheduler::TokioScheduler`: spawned tokio tasks

use std::time::Duration;

/// Handle for a pending timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(pub u64);

/// Work run when a timer fires
pub type TimerCallback = Box<dyn FnOnce() + Send>;

/// Trait for timer implementations
///
/// Callbacks must not run while the implementation holds internal locks,
/// since a callback may schedule or cancel other timers.
pub trait Scheduler: Send + Sync {
    /// Run `callback` once after `delay`
    fn set_timeout(&self, delay: Duration, callback: TimerCallback) -> TimerHandle;

    /// Cancel a pending timer (no-op when it already fired or was cancelled)
    fn clear_timeout(&self, handle: TimerHandle);
}
