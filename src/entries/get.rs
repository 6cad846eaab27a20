//! # Get-requests: priority read-style work.
//!
//! A [`GetRequest`] is a one-shot unit pushed into the scheduler's single
//! global FIFO, bypassing the per-actor fairness mechanism entirely. The get
//! loop services the FIFO in strict submission order at a much shorter
//! cadence than the placement tick, so threads blocked on a synchronous
//! read-like operation are answered quickly.

use crate::core::Scheduler;

/// One-shot action serviced by the get loop.
///
/// Implemented for any `FnOnce(&Scheduler)`; actions run synchronously on the
/// get-tick context and should complete quickly (hand results back through a
/// channel, typically a `tokio::sync::oneshot`).
pub trait GetAction: Send + 'static {
    /// Runs the action on the scheduler's get-tick context.
    fn run(self: Box<Self>, scheduler: &Scheduler);
}

impl<F> GetAction for F
where
    F: FnOnce(&Scheduler) + Send + 'static,
{
    fn run(self: Box<Self>, scheduler: &Scheduler) {
        self(scheduler)
    }
}

/// A queued get-request.
pub struct GetRequest {
    action: Box<dyn GetAction>,
}

impl GetRequest {
    /// Wraps an action into a queueable request.
    pub fn new(action: impl GetAction) -> Self {
        Self {
            action: Box::new(action),
        }
    }

    pub(crate) fn run(self, scheduler: &Scheduler) {
        self.action.run(scheduler)
    }
}

impl std::fmt::Debug for GetRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GetRequest").finish_non_exhaustive()
    }
}
