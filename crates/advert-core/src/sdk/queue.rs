// # Command Queue
//
// The ready queue both SDKs expose. Commands pushed before the SDK is ready
// wait in FIFO order; `mark_ready()` drains them, and from then on commands
// run as soon as they are pushed. A command pushed while the queue is being
// drained (for example by another queued command) runs after everything
// already waiting.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::traits::sdk::SdkCommand;

#[derive(Default)]
struct QueueState {
    ready: bool,
    draining: bool,
    pending: VecDeque<SdkCommand>,
}

/// FIFO queue of SDK commands
#[derive(Default)]
pub struct CommandQueue {
    inner: Mutex<QueueState>,
}

impl CommandQueue {
    /// Create a queue that holds commands until [`CommandQueue::mark_ready`]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a queue that runs commands immediately
    pub fn ready() -> Self {
        let queue = Self::new();
        queue.state().ready = true;
        queue
    }

    fn state(&self) -> MutexGuard<'_, QueueState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_ready(&self) -> bool {
        self.state().ready
    }

    /// Commands waiting to run
    pub fn len(&self) -> usize {
        self.state().pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn push(&self, command: SdkCommand) {
        {
            let mut state = self.state();
            state.pending.push_back(command);
            if !state.ready || state.draining {
                return;
            }
            state.draining = true;
        }
        self.drain();
    }

    /// Flag the SDK as loaded and run everything queued so far
    pub fn mark_ready(&self) {
        {
            let mut state = self.state();
            if state.ready {
                return;
            }
            state.ready = true;
            state.draining = true;
        }
        self.drain();
    }

    fn drain(&self) {
        loop {
            let next = {
                let mut state = self.state();
                let next = state.pending.pop_front();
                if next.is_none() {
                    state.draining = false;
                }
                next
            };

            match next {
                Some(command) => command(),
                None => break,
            }
        }
    }
}
