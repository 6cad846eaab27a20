//! # Queued entries: the tagged variant actor queues hold.
//!
//! [`Entry`] is a closed set — a plain write entry or a job entry — and every
//! capability the scheduler core needs (`job_id`, `is_demanding`, `process`,
//! target tracking) is dispatched through it. The core never inspects
//! concrete payload types.
//!
//! ## Ownership
//! An entry lives in exactly one place at a time: its actor's queue, the
//! in-flight processing batch of a tick, or nowhere (drained or removed).

use std::sync::Arc;

use crate::core::Scheduler;
use crate::error::ProcessError;

use super::job::{JobId, JobRef, JobStatus, UNGROUPED};
use super::payload::Payload;

/// A position in a world, reported to the location tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Location {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Location {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }
}

/// Target of a write entry: the world and location the write touches.
///
/// Reported to the [`LocationTracker`](crate::LocationTracker) on accept and
/// forgotten on drain, cancellation, or purge.
#[derive(Debug, Clone)]
pub struct Target {
    pub world: Arc<str>,
    pub location: Location,
}

/// One atomic write entry.
///
/// Belongs to a job via `job_id` ([`UNGROUPED`] when it belongs to none).
/// Built with the builder-style `demanding`/`with_target` modifiers:
///
/// ```
/// use fairplacer::{Location, PayloadFn, PlainEntry, ProcessError};
///
/// let entry = PlainEntry::new(0, PayloadFn::arc(|| async { Ok::<_, ProcessError>(()) }))
///     .with_target("world", Location::new(1, 64, -3))
///     .demanding();
/// assert!(entry.is_demanding());
/// ```
pub struct PlainEntry {
    job_id: JobId,
    demanding: bool,
    target: Option<Target>,
    payload: Arc<dyn Payload>,
}

impl PlainEntry {
    /// Creates a plain entry for the given job id (use [`UNGROUPED`] for none).
    pub fn new(job_id: JobId, payload: Arc<dyn Payload>) -> Self {
        Self {
            job_id,
            demanding: false,
            target: None,
            payload,
        }
    }

    /// Creates an ungrouped plain entry.
    pub fn ungrouped(payload: Arc<dyn Payload>) -> Self {
        Self::new(UNGROUPED, payload)
    }

    /// Marks the entry demanding: after it is processed, no further entries
    /// are drained by its fairness round for the rest of the tick.
    pub fn demanding(mut self) -> Self {
        self.demanding = true;
        self
    }

    /// Attaches the write target reported to the location tracker.
    pub fn with_target(mut self, world: impl Into<Arc<str>>, location: Location) -> Self {
        self.target = Some(Target {
            world: world.into(),
            location,
        });
        self
    }

    /// Id of the job this entry belongs to ([`UNGROUPED`] for none).
    #[inline]
    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    /// True if this entry halts its fairness round after processing.
    #[inline]
    pub fn is_demanding(&self) -> bool {
        self.demanding
    }

    /// The tracked write target, if any.
    #[inline]
    pub fn target(&self) -> Option<&Target> {
        self.target.as_ref()
    }
}

/// One queued unit of work.
pub enum Entry {
    /// Atomic write entry.
    Plain(PlainEntry),
    /// Job kick-off entry; also indexed in the actor's job table.
    Job(JobRef),
}

impl Entry {
    /// Id of the job this entry belongs to ([`UNGROUPED`] for plain entries
    /// outside any job; a job entry belongs to itself).
    pub fn job_id(&self) -> JobId {
        match self {
            Entry::Plain(e) => e.job_id(),
            Entry::Job(j) => j.id(),
        }
    }

    /// True if processing this entry must not be followed by another entry's
    /// processing within the same fairness round this tick.
    ///
    /// Job kick-offs are always demanding; plain entries opt in.
    pub fn is_demanding(&self) -> bool {
        match self {
            Entry::Plain(e) => e.is_demanding(),
            Entry::Job(_) => true,
        }
    }

    /// The tracked write target, if any (plain entries only).
    pub(crate) fn target(&self) -> Option<&Target> {
        match self {
            Entry::Plain(e) => e.target(),
            Entry::Job(_) => None,
        }
    }

    /// Processes the entry on the scheduler's tick context.
    ///
    /// For a job entry: advances the job to `Initializing`, runs its task,
    /// and completes the job if the task returned without taking ownership of
    /// the lifecycle (status still `Initializing`). A job whose cancellation
    /// was already requested is completed without running.
    pub(crate) async fn process(&self, scheduler: &Scheduler) -> Result<(), ProcessError> {
        match self {
            Entry::Plain(e) => e.payload.process(scheduler).await,
            Entry::Job(job) => {
                if job.is_cancelled() {
                    job.complete();
                    return Ok(());
                }
                job.set_status(JobStatus::Initializing);
                let result = job.task().clone().run(scheduler, job).await;
                match result {
                    Ok(()) => {
                        if job.status() == JobStatus::Initializing {
                            job.complete();
                        }
                        Ok(())
                    }
                    Err(err) => {
                        job.complete();
                        Err(err)
                    }
                }
            }
        }
    }
}

impl std::fmt::Debug for Entry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Entry::Plain(e) => f
                .debug_struct("Entry::Plain")
                .field("job_id", &e.job_id)
                .field("demanding", &e.demanding)
                .finish(),
            Entry::Job(j) => f.debug_struct("Entry::Job").field("id", &j.id()).finish(),
        }
    }
}
