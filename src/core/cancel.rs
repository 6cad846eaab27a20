//! # Job cancellation, purging, and explicit removal.
//!
//! Cancellation is synchronous from the caller's perspective: the job is
//! deregistered immediately (so no further tick advances it), then the
//! caller waits — bounded polling, hard timeout — for a rendezvous with any
//! in-flight processing of the job on the tick context, and only then are
//! the job's queued entries filtered out. The rendezvous is what makes it
//! safe to mutate the queue: without it, a `process()` call racing on the
//! scheduler's tick could observe entries being pulled out from under it.
//!
//! Timeout of the rendezvous is an anomaly (it should not happen under
//! correct use): the job is force-cancelled, force-marked `Done`, and the
//! system keeps running.

use std::collections::VecDeque;
use std::time::Instant;

use crate::entries::{Entry, JobId, JobRef, Target};

use super::scheduler::{Scheduler, MSG_QUEUE_UNLOCKED};
use super::table::lock;

const MSG_UNDO_PROTECTED: &str = "Undo jobs cannot be cancelled; ignoring.";

impl Scheduler {
    /// Cancels a job and removes every queued entry belonging to it.
    ///
    /// Returns the number of entries removed from the actor's queue. Undo
    /// jobs refuse cancellation (the actor is told; 0 is returned, nothing
    /// changes). Blocks (awaits) until the rendezvous with in-flight
    /// processing completes or [`Config::cancel_wait`](crate::Config) elapses.
    pub async fn cancel_job(&self, actor: &str, job_id: JobId) -> usize {
        let (job, queue) = {
            let mut table = lock(&self.table);
            let Some(slot) = table.actors.get_mut(actor) else {
                return 0;
            };
            let job = slot.job(job_id);
            if let Some(job) = &job {
                if job.is_protected() {
                    drop(table);
                    self.notifier.notify(actor, MSG_UNDO_PROTECTED);
                    return 0;
                }
                slot.remove_job(job_id);
            }
            (job, slot.queue.clone())
        };

        // Deregistration is announced before the rendezvous so observers see
        // the job leave as soon as the decision is made.
        if let Some(job) = &job {
            if job.retire() {
                self.listeners.notify_removed(job);
            }
            self.wait_for_job(job).await;
        }

        let mut untrack: Vec<Target> = Vec::new();
        let mut nested: Vec<JobRef> = Vec::new();
        let mut unlock = false;

        let removed = {
            let mut table = lock(&self.table);
            let new_size;
            let removed;
            {
                let mut held = lock(&queue);
                let before = held.len();
                let mut kept = VecDeque::with_capacity(before);
                for entry in held.drain(..) {
                    if entry.job_id() != job_id {
                        kept.push_back(entry);
                        continue;
                    }
                    match &entry {
                        Entry::Plain(plain) => {
                            if let Some(target) = plain.target() {
                                untrack.push(target.clone());
                            }
                        }
                        Entry::Job(job) => nested.push(job.clone()),
                    }
                }
                new_size = kept.len();
                removed = before - new_size;
                *held = kept;
            }

            if let Some(slot) = table.actors.get_mut(actor) {
                for job in &nested {
                    slot.remove_job(job.id());
                }
                if new_size == 0 && !slot.has_jobs() {
                    table.actors.remove(actor);
                }
            }

            if table.locked.contains(actor) && (new_size == 0 || new_size < self.cfg.soft_limit) {
                table.locked.remove(actor);
                unlock = new_size > 0;
            }
            removed
        };

        for target in untrack {
            self.tracker.untrack(&target.world, target.location);
        }
        for job in nested {
            if job.retire() {
                self.listeners.notify_removed(&job);
            }
        }
        if unlock {
            self.notifier.notify(actor, MSG_QUEUE_UNLOCKED);
        }
        if self.auth.can_see_progress(actor) && !self.actors().contains(&actor.to_string()) {
            self.progress_sink.clear(actor);
        }
        removed
    }

    /// Rendezvous with in-flight processing: waits until the job has started
    /// (`Initializing` or later) **and** its completion flag is set, or the
    /// configured bound elapses. On timeout the job is force-cancelled and
    /// force-completed.
    async fn wait_for_job(&self, job: &JobRef) {
        let deadline = Instant::now() + self.cfg.cancel_wait;
        loop {
            if job.status().has_started() && job.is_task_done() {
                return;
            }
            if Instant::now() >= deadline {
                break;
            }
            tokio::time::sleep(self.cfg.cancel_poll).await;
        }

        if !job.is_task_done() {
            tracing::warn!(
                job = job.id(),
                name = job.name(),
                status = ?job.status(),
                "timeout waiting for job to finish; forcing cancel"
            );
            job.cancel();
            job.complete();
        }
    }

    /// Unconditionally removes all of an actor's queued entries and jobs.
    ///
    /// Same notification obligations as cancellation (tracker forget,
    /// `job_removed` per job), without the job-id filter. Returns the number
    /// of entries removed.
    pub fn purge(&self, actor: &str) -> usize {
        let mut untrack: Vec<Target> = Vec::new();
        let mut removed_jobs: Vec<JobRef> = Vec::new();

        let removed = {
            let mut table = lock(&self.table);
            let mut removed = 0;
            if let Some(mut slot) = table.actors.remove(actor) {
                {
                    let mut queue = lock(&slot.queue);
                    removed = queue.len();
                    for entry in queue.drain(..) {
                        match entry {
                            Entry::Plain(plain) => {
                                if let Some(target) = plain.target() {
                                    untrack.push(target.clone());
                                }
                            }
                            Entry::Job(job) => removed_jobs.push(job),
                        }
                    }
                }
                removed_jobs.append(&mut slot.drain_jobs());
            }
            table.locked.remove(actor);
            removed
        };

        for target in untrack {
            self.tracker.untrack(&target.world, target.location);
        }
        for job in removed_jobs {
            if job.retire() {
                self.listeners.notify_removed(&job);
            }
        }
        if self.auth.can_see_progress(actor) {
            self.progress_sink.clear(actor);
        }
        removed
    }

    /// Purges every known actor. Returns the total number of entries removed.
    pub fn purge_all(&self) -> usize {
        self.actors().iter().map(|actor| self.purge(actor)).sum()
    }

    /// Removes a job from its actor's job table without touching the queue.
    ///
    /// Used by payloads that complete a job early. Fires `job_removed` if
    /// this was the job's final removal.
    pub fn remove_job(&self, actor: &str, job_id: JobId) -> Option<JobRef> {
        let job = {
            let mut table = lock(&self.table);
            table
                .actors
                .get_mut(actor)
                .and_then(|slot| slot.remove_job(job_id))
        };
        if let Some(job) = &job {
            if job.retire() {
                self.listeners.notify_removed(job);
            }
        }
        job
    }
}
