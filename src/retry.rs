//! Single-slot reconnect timer
//!
//! A connector owns one `RetrySlot`. Scheduling always cancels the pending
//! timer first, so at most one retry is ever in flight. When the timer fires
//! it posts a message carrying its generation into the connector's own
//! command queue. A message can already be queued when the slot is cancelled,
//! so the connector must check it with `fire` before acting on it.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::AbortHandle;

#[derive(Debug)]
pub struct RetrySlot {
    delay: Duration,
    pending: Option<AbortHandle>,
    generation: u64,
    /// Generation whose message is still honored
    armed: Option<u64>,
}

impl RetrySlot {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
            generation: 0,
            armed: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Replace any pending retry with a new one that sends `message(generation)`
    /// after the delay
    ///
    /// Must be called from within a tokio runtime.
    pub fn schedule<T, F>(&mut self, queue: &mpsc::UnboundedSender<T>, message: F)
    where
        T: Send + 'static,
        F: FnOnce(u64) -> T,
    {
        self.cancel();
        self.generation += 1;
        let generation = self.generation;
        let message = message(generation);
        let queue = queue.clone();
        let delay = self.delay;
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // The connector may be gone; nothing left to retry then
            let _ = queue.send(message);
        });
        log::debug!("Retry {} scheduled in {:?}", generation, delay);
        self.pending = Some(task.abort_handle());
        self.armed = Some(generation);
    }

    /// Cancel the pending retry, including one whose message is already queued
    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
        self.armed = None;
    }

    /// Consume a delivered retry; false if it was cancelled or replaced
    pub fn fire(&mut self, generation: u64) -> bool {
        if self.armed != Some(generation) {
            log::debug!("Ignoring stale retry {}", generation);
            return false;
        }
        self.armed = None;
        self.pending = None;
        true
    }

    pub fn is_pending(&self) -> bool {
        self.armed.is_some()
    }
}

impl Drop for RetrySlot {
    fn drop(&mut self) {
        self.cancel();
    }
}
