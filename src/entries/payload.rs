//! # Execution seams for queued work.
//!
//! [`Payload`] is the contract for plain write entries; [`JobTask`] is the
//! contract for job entries (it additionally receives the job handle so the
//! implementation can drive the status state machine). [`PayloadFn`] wraps a
//! future-producing closure, creating a fresh future per processing attempt.
//!
//! Processing always happens on the scheduler's tick context, outside every
//! scheduler lock, so payloads may freely call back into the scheduler
//! (submit more entries, query state) without deadlocking.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::core::Scheduler;
use crate::error::ProcessError;

use super::job::JobRef;

/// # One unit of asynchronous write work.
///
/// Implementations should be cheap to construct and must not block the
/// executor; the tick loop awaits each payload sequentially.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use fairplacer::{Payload, ProcessError, Scheduler};
///
/// struct SetBlock;
///
/// #[async_trait]
/// impl Payload for SetBlock {
///     async fn process(&self, _scheduler: &Scheduler) -> Result<(), ProcessError> {
///         // apply the write...
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Payload: Send + Sync + 'static {
    /// Executes the payload on the scheduler's tick context.
    async fn process(&self, scheduler: &Scheduler) -> Result<(), ProcessError>;
}

/// # Execution contract for a job.
///
/// Receives the owning [`JobRef`] so the implementation can advance the
/// status machine. The scheduler sets `Initializing` before calling `run`;
/// if `run` returns without advancing past `Initializing`, the scheduler
/// completes the job itself (synchronous jobs need no status bookkeeping).
/// A task that moves the job to `Running` owns completion and must call
/// [`Job::complete`](super::Job::complete) when its background work finishes.
#[async_trait]
pub trait JobTask: Send + Sync + 'static {
    /// Kicks off the job on the scheduler's tick context.
    async fn run(&self, scheduler: &Scheduler, job: &JobRef) -> Result<(), ProcessError>;
}

/// Function-backed payload.
///
/// Wraps a closure that *creates* a new future per processing attempt, so no
/// shared mutable state is needed between attempts. If the closure needs the
/// scheduler or the job handle, implement [`Payload`] / [`JobTask`] directly.
///
/// ## Example
/// ```
/// use fairplacer::{PayloadFn, ProcessError};
///
/// let p = PayloadFn::arc(|| async { Ok::<_, ProcessError>(()) });
/// # let _ = p;
/// ```
pub struct PayloadFn<F> {
    f: F,
}

impl<F> PayloadFn<F> {
    /// Creates a new function-backed payload.
    pub fn new(f: F) -> Self {
        Self { f }
    }

    /// Creates the payload and returns it as a shared handle.
    pub fn arc(f: F) -> Arc<Self> {
        Arc::new(Self::new(f))
    }
}

#[async_trait]
impl<F, Fut> Payload for PayloadFn<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), ProcessError>> + Send + 'static,
{
    async fn process(&self, _scheduler: &Scheduler) -> Result<(), ProcessError> {
        (self.f)().await
    }
}

#[async_trait]
impl<F, Fut> JobTask for PayloadFn<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), ProcessError>> + Send + 'static,
{
    async fn run(&self, _scheduler: &Scheduler, _job: &JobRef) -> Result<(), ProcessError> {
        (self.f)().await
    }
}
