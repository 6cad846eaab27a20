//! # Jobs: named, independently cancelable groups of entries.
//!
//! A [`Job`] is both queued (as an [`Entry::Job`](super::Entry) that kicks it
//! off) and indexed in its actor's job table. Its lifecycle:
//!
//! ```text
//! created ──► registered (job_added fired once)
//!    │
//!    ▼ drained by a placement tick
//! Waiting ──► Initializing ──► Running ──► Done
//!    │             (cancel forces Done at any point)
//!    ▼
//! removed from the job table (job_removed fired exactly once)
//! ```
//!
//! ## Rules
//! - `task_done` is a completion flag **distinct** from the status; the
//!   cancellation rendezvous waits for both (status has started *and*
//!   `task_done` set).
//! - Undo jobs ([`JobKind::Undo`]) refuse external cancellation requests.
//! - The announce/retire guards make `job_added` at-most-once and
//!   `job_removed` exactly-once per job instance, no matter how many removal
//!   paths reach the job (sweep, cancel filter, purge).

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::payload::JobTask;

/// Job identifier, unique per actor. `0` marks ungrouped plain entries.
pub type JobId = u32;

/// Job id carried by plain entries that belong to no job.
pub const UNGROUPED: JobId = 0;

/// Shared handle to a [`Job`].
pub type JobRef = Arc<Job>;

/// Job status state machine.
///
/// Ordered: `Waiting < Initializing < Running < Done`. `Waiting` and `Done`
/// are eligible for the opportunistic sweep once the owning queue is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum JobStatus {
    /// Registered but not yet drained by a placement tick.
    Waiting = 0,
    /// Kick-off in progress on the scheduler's tick context.
    Initializing = 1,
    /// Background execution owned by the job task.
    Running = 2,
    /// Finished — naturally or by (forced) cancellation.
    Done = 3,
}

impl JobStatus {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => JobStatus::Waiting,
            1 => JobStatus::Initializing,
            2 => JobStatus::Running,
            _ => JobStatus::Done,
        }
    }

    /// True once the job's kick-off has begun (`Initializing` or later).
    #[inline]
    pub fn has_started(self) -> bool {
        self >= JobStatus::Initializing
    }
}

/// Classification of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    /// Ordinary edit job; cancelable.
    Edit,
    /// Undo job; immune to external cancellation requests.
    Undo,
}

/// A named group of entries with its own lifecycle.
pub struct Job {
    id: JobId,
    name: Arc<str>,
    kind: JobKind,
    status: AtomicU8,
    task_done: AtomicBool,
    announced: AtomicBool,
    retired: AtomicBool,
    cancel: CancellationToken,
    task: Arc<dyn JobTask>,
}

impl Job {
    /// Creates a new job in `Waiting` state and returns a shared handle.
    ///
    /// Obtain `id` from [`Scheduler::next_job_id`](crate::Scheduler::next_job_id)
    /// so ids stay unique per actor.
    pub fn new(id: JobId, name: impl Into<Arc<str>>, kind: JobKind, task: Arc<dyn JobTask>) -> JobRef {
        Arc::new(Self {
            id,
            name: name.into(),
            kind,
            status: AtomicU8::new(JobStatus::Waiting as u8),
            task_done: AtomicBool::new(false),
            announced: AtomicBool::new(false),
            retired: AtomicBool::new(false),
            cancel: CancellationToken::new(),
            task,
        })
    }

    /// Job id, unique within the owning actor.
    #[inline]
    pub fn id(&self) -> JobId {
        self.id
    }

    /// Human-readable job name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Job classification.
    #[inline]
    pub fn kind(&self) -> JobKind {
        self.kind
    }

    /// True if this job refuses external cancellation (undo jobs).
    #[inline]
    pub fn is_protected(&self) -> bool {
        self.kind == JobKind::Undo
    }

    /// Current status.
    #[inline]
    pub fn status(&self) -> JobStatus {
        JobStatus::from_u8(self.status.load(Ordering::Acquire))
    }

    /// Advances the status machine.
    #[inline]
    pub fn set_status(&self, status: JobStatus) {
        self.status.store(status as u8, Ordering::Release);
    }

    /// Completion flag, distinct from [`Job::status`].
    #[inline]
    pub fn is_task_done(&self) -> bool {
        self.task_done.load(Ordering::Acquire)
    }

    /// Marks the job finished: sets `task_done` and forces status `Done`.
    pub fn complete(&self) {
        self.task_done.store(true, Ordering::Release);
        self.set_status(JobStatus::Done);
    }

    /// Requests cooperative cancellation of the job's execution.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// True once cancellation has been requested.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Token observed by long-running job tasks for cooperative cancel.
    #[inline]
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub(crate) fn task(&self) -> &Arc<dyn JobTask> {
        &self.task
    }

    /// First-registration guard; true exactly once.
    pub(crate) fn announce(&self) -> bool {
        !self.announced.swap(true, Ordering::AcqRel)
    }

    /// Final-removal guard; true exactly once.
    pub(crate) fn retire(&self) -> bool {
        !self.retired.swap(true, Ordering::AcqRel)
    }
}

impl std::fmt::Debug for Job {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Job")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("status", &self.status())
            .field("task_done", &self.is_task_done())
            .finish()
    }
}
