//! # Actor table: per-actor queue state under the scheduler's table lock.
//!
//! One [`ActorSlot`] per actor, created lazily on first submission (or job-id
//! request) and removed once its queue is empty and it holds no jobs. The
//! [`Table`] also owns the locked-queue set, the tick counters, and the
//! persistent fairness cursors.
//!
//! ## Locking
//! The table as a whole sits behind a single mutex in the scheduler. Each
//! slot's queue has its **own** mutex so producers enqueue against one actor
//! without serializing on the others. Lock order is table → queue; queue
//! locks are never held while acquiring another queue's lock.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::entries::{Entry, JobId, JobRef, JobStatus};
use crate::stats::ProgressReport;

/// Acquires a mutex, tolerating poisoning (a panicked payload must not take
/// the scheduler down with it).
pub(crate) fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Shared handle to one actor's FIFO queue.
pub(crate) type QueueRef = Arc<Mutex<VecDeque<Entry>>>;

/// Which fairness round a cursor belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Round {
    /// Base quota over the full actor snapshot.
    Base,
    /// VIP quota over the VIP subset.
    Vip,
}

/// Queue state for a single actor.
pub(crate) struct ActorSlot {
    /// FIFO work queue; insertion order is scheduling order.
    pub(crate) queue: QueueRef,
    /// Registered jobs by id.
    jobs: HashMap<JobId, JobRef>,
    /// Monotonically increasing per-actor job-id counter.
    next_job_id: JobId,
    /// Smoothed throughput estimate, entries per second.
    speed: f64,
    /// De-duplication flag for the one-time "queue full" notification.
    pub(crate) informed: bool,
}

impl ActorSlot {
    pub(crate) fn new() -> Self {
        Self {
            queue: Arc::new(Mutex::new(VecDeque::new())),
            jobs: HashMap::new(),
            next_job_id: 0,
            speed: 0.0,
            informed: false,
        }
    }

    /// Reserves the next job id for this actor (starts at 1; 0 is reserved
    /// for ungrouped entries).
    pub(crate) fn next_job_id(&mut self) -> JobId {
        self.next_job_id += 1;
        self.next_job_id
    }

    pub(crate) fn queue_len(&self) -> usize {
        lock(&self.queue).len()
    }

    pub(crate) fn has_jobs(&self) -> bool {
        !self.jobs.is_empty()
    }

    pub(crate) fn job_count(&self) -> usize {
        self.jobs.len()
    }

    pub(crate) fn job(&self, id: JobId) -> Option<JobRef> {
        self.jobs.get(&id).cloned()
    }

    pub(crate) fn add_job(&mut self, job: JobRef) {
        self.jobs.insert(job.id(), job);
    }

    pub(crate) fn remove_job(&mut self, id: JobId) -> Option<JobRef> {
        self.jobs.remove(&id)
    }

    pub(crate) fn drain_jobs(&mut self) -> Vec<JobRef> {
        self.jobs.drain().map(|(_, job)| job).collect()
    }

    /// Removes jobs eligible for the opportunistic sweep: `Waiting` or `Done`
    /// while the owning queue is empty (the caller checks queue emptiness).
    pub(crate) fn sweep_finished(&mut self) -> Vec<JobRef> {
        let finished: Vec<JobId> = self
            .jobs
            .iter()
            .filter(|(_, job)| matches!(job.status(), JobStatus::Waiting | JobStatus::Done))
            .map(|(id, _)| *id)
            .collect();
        finished
            .into_iter()
            .filter_map(|id| self.jobs.remove(&id))
            .collect()
    }

    /// Folds the entries placed this interval into the smoothed throughput
    /// estimate.
    pub(crate) fn update_speed(&mut self, placed: usize, elapsed: Duration) {
        let secs = elapsed.as_secs_f64();
        if secs <= 0.0 {
            return;
        }
        let instant = placed as f64 / secs;
        self.speed = if self.speed == 0.0 {
            instant
        } else {
            (self.speed + instant) / 2.0
        };
    }

    pub(crate) fn speed(&self) -> f64 {
        self.speed
    }

    pub(crate) fn report(&self, hard_limit: usize, bypass: bool) -> ProgressReport {
        ProgressReport {
            queued: self.queue_len(),
            jobs: self.jobs.len(),
            speed: self.speed,
            hard_limit,
            bypass,
        }
    }
}

/// Shared scheduler state behind the single table mutex.
pub(crate) struct Table {
    /// Actor slots, ordered by name so fairness snapshots are deterministic
    /// and the persistent cursors rotate meaningfully across ticks.
    pub(crate) actors: BTreeMap<String, ActorSlot>,
    /// Actors currently barred from further submission.
    pub(crate) locked: HashSet<String>,
    /// Placement ticks since the last progress announcement.
    pub(crate) run_number: u32,
    /// Wall-clock instant of the previous placement tick.
    pub(crate) last_run: Instant,
    /// Graceful drain-then-stop requested.
    pub(crate) shutdown: bool,
    cursor_base: usize,
    cursor_vip: usize,
}

impl Table {
    pub(crate) fn new() -> Self {
        Self {
            actors: BTreeMap::new(),
            locked: HashSet::new(),
            run_number: 0,
            last_run: Instant::now(),
            shutdown: false,
            cursor_base: 0,
            cursor_vip: 0,
        }
    }

    /// Returns the actor's slot, creating it lazily.
    pub(crate) fn slot_mut(&mut self, actor: &str) -> &mut ActorSlot {
        self.actors
            .entry(actor.to_string())
            .or_insert_with(ActorSlot::new)
    }

    /// Sum of all queue sizes; equals the global enqueued-entry count at any
    /// observation point made under the table lock.
    pub(crate) fn total_queued(&self) -> usize {
        self.actors.values().map(|slot| slot.queue_len()).sum()
    }

    pub(crate) fn cursor(&self, round: Round) -> usize {
        match round {
            Round::Base => self.cursor_base,
            Round::Vip => self.cursor_vip,
        }
    }

    pub(crate) fn set_cursor(&mut self, round: Round, pos: usize) {
        match round {
            Round::Base => self.cursor_base = pos,
            Round::Vip => self.cursor_vip = pos,
        }
    }
}
