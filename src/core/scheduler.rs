//! # Scheduler: fair, rate-limited multiplexing of queued work onto ticks.
//!
//! The [`Scheduler`] owns the actor table and drives two periodic loops:
//!
//! - the **placement tick** ([`Scheduler::run_placement_tick`]) drains a
//!   bounded number of entries per tick, round-robin over actors, with a
//!   separate larger quota for VIP actors;
//! - the **get tick** ([`Scheduler::run_get_tick`]) services the global
//!   get-request FIFO at a much shorter cadence, parking itself when idle.
//!
//! ## Tick anatomy
//! ```text
//! run_placement_tick()
//!   ├─ [table lock]
//!   │    ├─ snapshot actor names, partition VIP subset
//!   │    ├─ base round:  drain ≤ quota     (round-robin, demanding halts)
//!   │    ├─ VIP round:   drain ≤ vip_quota (VIP subset only)
//!   │    │     └─ per visited actor: sweep Waiting/Done jobs,
//!   │    │        unlock below soft limit, drop empty actors
//!   │    └─ throughput update + progress/talk collection
//!   ├─ [no locks] process drained entries sequentially
//!   ├─ complete swept jobs, fire job_removed
//!   └─ stop if shutdown was requested and nothing was drained
//! ```
//!
//! ## Rules
//! - `submit` never blocks a tick longer than one queue-lock hold.
//! - Entry processing happens outside every lock; a failing entry is logged
//!   and never aborts the remaining entries of its tick.
//! - Within one actor, processing order equals submission order (FIFO).
//! - Notifications and listener callbacks fire after the table lock is
//!   released.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::entries::{Entry, GetRequest, JobId, JobRef};
use crate::listeners::{JobListener, ListenerSet};
use crate::services::{
    Authorizer, LocationTracker, Notifier, NullNotifier, NullProgressSink, NullTracker,
    ProgressSink, StaticAuthorizer,
};
use crate::stats::ProgressReport;

use super::table::{lock, ActorSlot, Round, Table};

const MSG_QUEUE_FULL: &str = "Your queue is full. Wait for queued entries to finish placing.";
pub(crate) const MSG_QUEUE_UNLOCKED: &str = "Your queue is unlocked. You can submit again.";
const MSG_GLOBAL_FULL: &str = "Out of space on the placement queue.";

/// State of the self-throttling get loop.
struct GetLoop {
    /// Idle ticks left before the loop parks itself.
    runs_remaining: u32,
    /// True while a loop task is spawned and live.
    running: bool,
}

/// Per-tick scratch collected under the table lock and acted on after it is
/// released.
#[derive(Default)]
struct TickScratch {
    drained: Vec<Entry>,
    placed: HashMap<String, usize>,
    finished: Vec<JobRef>,
    messages: Vec<(String, String)>,
    progress: Vec<(String, Option<ProgressReport>)>,
}

/// Builder for a [`Scheduler`] with injected collaborator services.
///
/// ## Example
/// ```
/// use fairplacer::{Config, Scheduler, StaticAuthorizer};
///
/// let scheduler = Scheduler::builder()
///     .config(Config::default())
///     .authorizer(StaticAuthorizer::new().with_vip("alice"))
///     .build();
/// # let _ = scheduler;
/// ```
pub struct SchedulerBuilder {
    cfg: Config,
    auth: Arc<dyn Authorizer>,
    notifier: Arc<dyn Notifier>,
    tracker: Arc<dyn LocationTracker>,
    progress: Arc<dyn ProgressSink>,
}

impl Default for SchedulerBuilder {
    fn default() -> Self {
        Self {
            cfg: Config::default(),
            auth: Arc::new(StaticAuthorizer::new()),
            notifier: Arc::new(NullNotifier),
            tracker: Arc::new(NullTracker),
            progress: Arc::new(NullProgressSink),
        }
    }
}

impl SchedulerBuilder {
    /// Sets the scheduler configuration.
    pub fn config(mut self, cfg: Config) -> Self {
        self.cfg = cfg;
        self
    }

    /// Sets the actor-classification service.
    pub fn authorizer(mut self, auth: impl Authorizer) -> Self {
        self.auth = Arc::new(auth);
        self
    }

    /// Sets the notification channel.
    pub fn notifier(mut self, notifier: impl Notifier) -> Self {
        self.notifier = Arc::new(notifier);
        self
    }

    /// Sets the location tracker.
    pub fn tracker(mut self, tracker: impl LocationTracker) -> Self {
        self.tracker = Arc::new(tracker);
        self
    }

    /// Sets the progress sink.
    pub fn progress_sink(mut self, progress: impl ProgressSink) -> Self {
        self.progress = Arc::new(progress);
        self
    }

    /// Builds the scheduler.
    pub fn build(self) -> Arc<Scheduler> {
        Arc::new(Scheduler {
            cfg: self.cfg,
            table: Mutex::new(Table::new()),
            gets: Mutex::new(Vec::new()),
            get_state: Mutex::new(GetLoop {
                runs_remaining: 0,
                running: false,
            }),
            listeners: ListenerSet::new(),
            auth: self.auth,
            notifier: self.notifier,
            tracker: self.tracker,
            progress_sink: self.progress,
            token: CancellationToken::new(),
            placement_started: AtomicBool::new(false),
        })
    }
}

/// Tick-driven, fair, rate-limited scheduler for concurrently submitted work.
pub struct Scheduler {
    pub(crate) cfg: Config,
    pub(crate) table: Mutex<Table>,
    gets: Mutex<Vec<GetRequest>>,
    get_state: Mutex<GetLoop>,
    pub(crate) listeners: ListenerSet,
    pub(crate) auth: Arc<dyn Authorizer>,
    pub(crate) notifier: Arc<dyn Notifier>,
    pub(crate) tracker: Arc<dyn LocationTracker>,
    pub(crate) progress_sink: Arc<dyn ProgressSink>,
    token: CancellationToken,
    placement_started: AtomicBool,
}

impl Scheduler {
    /// Starts building a scheduler with injected services.
    pub fn builder() -> SchedulerBuilder {
        SchedulerBuilder::default()
    }

    /// Creates a scheduler with the given config and null services.
    pub fn new(cfg: Config) -> Arc<Self> {
        Self::builder().config(cfg).build()
    }

    /// The active configuration.
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    // ---------------------------
    // Submission
    // ---------------------------

    /// Submits an entry to an actor's queue. Safe to call from any thread.
    ///
    /// Returns `false` without enqueueing when:
    /// - the actor's queue is locked (hard limit previously hit), or
    /// - the global cap is exceeded and the entry is not bypass-eligible
    ///   (bypass = the actor holds the bypass capability, or the entry is a
    ///   job — jobs are only ever blocked by the per-actor hard limit). The
    ///   actor is told once; the notification re-arms when space frees up.
    ///
    /// On acceptance the entry is appended, its target (if any) is reported
    /// to the location tracker, and a job entry is also registered in the job
    /// table (`job_added` fires). If the append makes the queue reach the
    /// hard limit, the actor is locked and the call returns `false` — the
    /// entry stays queued, but subsequent submissions are rejected until the
    /// queue drains below the soft limit.
    pub fn submit(&self, actor: &str, entry: Entry) -> bool {
        let mut announce: Option<JobRef> = None;
        let mut message: Option<&'static str> = None;

        let accepted = {
            let mut table = lock(&self.table);
            if table.locked.contains(actor) {
                return false;
            }

            let total = table.total_queued();
            let bypass = matches!(entry, Entry::Job(_)) || self.auth.has_bypass(actor);
            let over_cap = self
                .cfg
                .global_limit()
                .is_some_and(|max| total > max && !bypass);

            let slot = table.slot_mut(actor);
            if over_cap {
                if !slot.informed {
                    slot.informed = true;
                    message = Some(MSG_GLOBAL_FULL);
                }
                false
            } else {
                slot.informed = false;

                if let Some(target) = entry.target() {
                    self.tracker.track(&target.world, target.location);
                }
                if let Entry::Job(job) = &entry {
                    slot.add_job(job.clone());
                    if job.announce() {
                        announce = Some(job.clone());
                    }
                }

                let len = {
                    let mut queue = lock(&slot.queue);
                    queue.push_back(entry);
                    queue.len()
                };

                if len >= self.cfg.hard_limit {
                    table.locked.insert(actor.to_string());
                    message = Some(MSG_QUEUE_FULL);
                    false
                } else {
                    true
                }
            }
        };

        if let Some(job) = announce {
            self.listeners.notify_added(&job);
        }
        if let Some(msg) = message {
            self.notifier.notify(actor, msg);
        }
        accepted
    }

    /// Reserves the next job id for an actor (creates the actor lazily).
    pub fn next_job_id(&self, actor: &str) -> JobId {
        lock(&self.table).slot_mut(actor).next_job_id()
    }

    /// Registers a job in an actor's job table without queueing a kick-off
    /// entry.
    ///
    /// For jobs whose entries are produced incrementally by the host rather
    /// than through a queued [`Entry::Job`]. Fires `job_added` on first
    /// registration. The job is subject to the same sweep, cancellation, and
    /// removal rules as a submitted one.
    pub fn add_job(&self, actor: &str, job: JobRef) {
        let announce = {
            let mut table = lock(&self.table);
            table.slot_mut(actor).add_job(job.clone());
            job.announce()
        };
        if announce {
            self.listeners.notify_added(&job);
        }
    }

    // ---------------------------
    // Placement tick
    // ---------------------------

    /// Runs one placement tick. Invoked by [`Scheduler::start`]'s loop on a
    /// fixed cadence, or directly by an external periodic invoker (the host
    /// must not overlap invocations).
    pub async fn run_placement_tick(&self) {
        let now = Instant::now();
        let mut scratch = TickScratch::default();
        let mut stop_now = false;

        {
            let mut table = lock(&self.table);
            let keys: Vec<String> = table.actors.keys().cloned().collect();
            let vips: Vec<String> = keys
                .iter()
                .filter(|name| self.auth.is_vip(name))
                .cloned()
                .collect();

            let mut added = false;
            added |= self.fetch_round(&mut table, self.cfg.quota, &keys, Round::Base, &mut scratch);
            added |= self.fetch_round(&mut table, self.cfg.vip_quota, &vips, Round::Vip, &mut scratch);

            if !added && table.shutdown {
                stop_now = true;
            }

            table.run_number += 1;
            let talk = match self.cfg.talk_every() {
                Some(every) if table.run_number >= every => {
                    table.run_number = 0;
                    true
                }
                _ => false,
            };

            let elapsed = now.saturating_duration_since(table.last_run);
            table.last_run = now;

            for (name, slot) in table.actors.iter_mut() {
                let count = scratch.placed.get(name).copied().unwrap_or(0);
                slot.update_speed(count, elapsed);

                if slot.queue_len() == 0 {
                    if self.auth.can_see_progress(name) {
                        scratch.progress.push((name.clone(), None));
                    }
                } else {
                    let report = slot.report(self.cfg.hard_limit, self.auth.has_bypass(name));
                    if talk && self.auth.is_talkative(name) {
                        scratch.messages.push((name.clone(), report.message()));
                    }
                    if self.auth.can_see_progress(name) {
                        scratch.progress.push((name.clone(), Some(report)));
                    }
                }
            }
        }

        for (actor, msg) in &scratch.messages {
            self.notifier.notify(actor, msg);
        }
        for (actor, report) in &scratch.progress {
            match report {
                Some(report) => self.progress_sink.update(actor, report),
                None => self.progress_sink.clear(actor),
            }
        }

        let drained = scratch.drained.len();
        for entry in scratch.drained {
            let target = entry.target().cloned();
            if let Err(err) = entry.process(self).await {
                tracing::warn!(
                    job = entry.job_id(),
                    error = %err,
                    label = err.as_label(),
                    "entry processing failed"
                );
            }
            if let Some(target) = target {
                self.tracker.untrack(&target.world, target.location);
            }
        }

        for job in scratch.finished {
            job.complete();
            if job.retire() {
                self.listeners.notify_removed(&job);
            }
        }

        if stop_now {
            self.stop();
        }
        tracing::trace!(drained, "placement tick");
    }

    /// One fairness round: drains up to `quota` entries round-robin over
    /// `actors`, resuming from the round's persistent cursor.
    ///
    /// The cursor advances after every attempt, successful or not; an actor
    /// with an empty queue is skipped but still rotates. A full rotation with
    /// no entry drained stops the round early. A drained demanding entry
    /// halts the round for the rest of the tick.
    ///
    /// While visiting an actor, jobs eligible for the opportunistic sweep are
    /// collected, queues fallen below the soft limit are unlocked, and actors
    /// left with no queue and no jobs are removed.
    fn fetch_round(
        &self,
        table: &mut Table,
        quota: usize,
        actors: &[String],
        round: Round,
        scratch: &mut TickScratch,
    ) -> bool {
        if quota == 0 || actors.is_empty() {
            return false;
        }

        let len = actors.len();
        let mut pos = table.cursor(round) % len;
        let mut fetched = 0usize;
        let mut retry = len;
        let mut result = false;
        let mut demanding = false;

        while fetched < quota && retry > 0 && !demanding {
            let actor = &actors[pos];
            let mut got = false;

            let visited = match table.actors.get_mut(actor) {
                Some(slot) => {
                    let popped = lock(&slot.queue).pop_front();
                    match popped {
                        Some(entry) => {
                            demanding = entry.is_demanding();
                            *scratch.placed.entry(actor.clone()).or_insert(0) += 1;
                            scratch.drained.push(entry);
                            got = true;
                        }
                        None => {
                            scratch.finished.append(&mut slot.sweep_finished());
                        }
                    }
                    Some((slot.queue_len(), slot.has_jobs()))
                }
                None => None,
            };

            match visited {
                Some((size, has_jobs)) => {
                    if size < self.cfg.soft_limit && table.locked.remove(actor) {
                        scratch
                            .messages
                            .push((actor.clone(), MSG_QUEUE_UNLOCKED.to_string()));
                    }
                    if size == 0 && !has_jobs {
                        table.actors.remove(actor);
                        if self.auth.can_see_progress(actor) {
                            scratch.progress.push((actor.clone(), None));
                        }
                    }
                }
                None => {
                    if table.locked.remove(actor) {
                        scratch
                            .messages
                            .push((actor.clone(), MSG_QUEUE_UNLOCKED.to_string()));
                    }
                }
            }

            pos = (pos + 1) % len;
            if got {
                retry = len;
                result = true;
                fetched += 1;
            } else {
                retry -= 1;
            }
        }

        table.set_cursor(round, pos);
        result
    }

    // ---------------------------
    // Get requests
    // ---------------------------

    /// Submits a priority get-request and revives the get loop.
    ///
    /// Requests are serviced in strict global submission order, independent
    /// of the actor fairness mechanism. A stopped scheduler no longer
    /// services requests.
    pub fn submit_get(self: &Arc<Self>, request: GetRequest) {
        lock(&self.gets).push(request);
        self.revive_get_loop();
    }

    /// Runs one get tick: repeatedly swap-and-clear the global FIFO (bounded
    /// by the retry ceiling), process every captured request, and yield after
    /// each non-empty batch. Returns true if any request was processed.
    pub async fn run_get_tick(&self) -> bool {
        let mut processed = false;
        for _ in 0..self.cfg.get_rounds_clamped() {
            let batch: Vec<GetRequest> = {
                let mut gets = lock(&self.gets);
                if gets.is_empty() {
                    break;
                }
                std::mem::take(&mut *gets)
            };
            for request in batch {
                request.run(self);
            }
            processed = true;
            // Hand the executor back between batches so the get loop cannot
            // starve the rest of the runtime.
            tokio::task::yield_now().await;
        }
        processed
    }

    /// Resets the idle countdown and (re)spawns the get loop if parked.
    fn revive_get_loop(self: &Arc<Self>) {
        let mut state = lock(&self.get_state);
        state.runs_remaining = self.cfg.get_idle_runs.max(1);
        if state.running || self.token.is_cancelled() {
            return;
        }
        state.running = true;
        drop(state);

        let me = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(me.cfg.get_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = me.token.cancelled() => break,
                    _ = ticker.tick() => {
                        if me.run_get_tick().await {
                            continue;
                        }
                        let mut state = lock(&me.get_state);
                        state.runs_remaining = state.runs_remaining.saturating_sub(1);
                        if state.runs_remaining == 0 {
                            // A request may have slipped in after the empty
                            // swap; stay alive for it instead of parking.
                            if lock(&me.gets).is_empty() {
                                state.running = false;
                                tracing::debug!("get loop parked");
                                return;
                            }
                            state.runs_remaining = me.cfg.get_idle_runs.max(1);
                        }
                    }
                }
            }
            lock(&me.get_state).running = false;
        });
    }

    // ---------------------------
    // Lifecycle
    // ---------------------------

    /// Spawns the built-in placement loop, ticking every
    /// [`Config::interval`]. Idempotent; a stopped scheduler cannot be
    /// restarted.
    pub fn start(self: &Arc<Self>) {
        if self.placement_started.swap(true, Ordering::SeqCst) || self.token.is_cancelled() {
            return;
        }
        let me = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(me.cfg.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = me.token.cancelled() => break,
                    _ = ticker.tick() => me.run_placement_tick().await,
                }
            }
        });
    }

    /// Requests graceful drain-then-stop: the scheduler stops at the end of
    /// the first placement tick that drains nothing.
    pub fn queue_stop(&self) {
        lock(&self.table).shutdown = true;
    }

    /// Stops both periodic loops immediately. Idempotent.
    pub fn stop(&self) {
        self.token.cancel();
    }

    /// True once [`Scheduler::stop`] has taken effect.
    pub fn is_stopped(&self) -> bool {
        self.token.is_cancelled()
    }

    // ---------------------------
    // Listeners
    // ---------------------------

    /// Registers a job lifecycle listener.
    pub fn add_listener(&self, listener: Arc<dyn JobListener>) {
        self.listeners.add(listener);
    }

    /// Removes a previously registered listener (by identity).
    pub fn remove_listener(&self, listener: &Arc<dyn JobListener>) {
        self.listeners.remove(listener);
    }

    // ---------------------------
    // Introspection
    // ---------------------------

    /// Names of all actors currently holding queued work or jobs.
    pub fn actors(&self) -> Vec<String> {
        lock(&self.table).actors.keys().cloned().collect()
    }

    /// Queue size for an actor (0 when unknown).
    pub fn queued(&self, actor: &str) -> usize {
        lock(&self.table)
            .actors
            .get(actor)
            .map(ActorSlot::queue_len)
            .unwrap_or(0)
    }

    /// Sum of all actors' queue sizes.
    pub fn total_queued(&self) -> usize {
        lock(&self.table).total_queued()
    }

    /// True while the actor's queue is locked against submission.
    pub fn is_locked(&self, actor: &str) -> bool {
        lock(&self.table).locked.contains(actor)
    }

    /// Looks up a registered job.
    pub fn job(&self, actor: &str, job_id: JobId) -> Option<JobRef> {
        lock(&self.table)
            .actors
            .get(actor)
            .and_then(|slot| slot.job(job_id))
    }

    /// Number of jobs registered for an actor.
    pub fn job_count(&self, actor: &str) -> usize {
        lock(&self.table)
            .actors
            .get(actor)
            .map(ActorSlot::job_count)
            .unwrap_or(0)
    }

    /// Current progress facts for an actor, if it is known to the table.
    pub fn progress(&self, actor: &str) -> Option<ProgressReport> {
        let table = lock(&self.table);
        table
            .actors
            .get(actor)
            .map(|slot| slot.report(self.cfg.hard_limit, self.auth.has_bypass(actor)))
    }
}
