//! # fairplacer
//!
//! **fairplacer** is a tick-driven, fair, rate-limited placement scheduler
//! for Rust.
//!
//! It multiplexes write operations submitted concurrently by many
//! independent actors onto a single consumption point, enforcing per-actor
//! and global backpressure, VIP prioritization, cooperative job
//! cancellation, and lifecycle event fan-out. The crate is designed as a
//! building block for hosts that own a periodic tick (game servers,
//! simulation loops, batch appliers).
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   producer threads (any number)
//!     │ submit(actor, entry)            submit_get(request)
//!     ▼                                   ▼
//! ┌───────────────────────────────┐   ┌──────────────────┐
//! │  actor table (table mutex)    │   │  get FIFO (own   │
//! │  ┌─────────┐  ┌─────────┐     │   │  mutex, global   │
//! │  │ alice   │  │ bob     │ ... │   │  submission      │
//! │  │ queue ▣ │  │ queue ▣ │     │   │  order)          │
//! │  │ jobs    │  │ jobs    │     │   └────────┬─────────┘
//! │  │ speed   │  │ speed   │     │            │
//! │  └─────────┘  └─────────┘     │            ▼
//! │  locked set, fairness cursors │   get loop (short cadence,
//! └──────────────┬────────────────┘    parks when idle, revived
//!                │                     by new submissions)
//!                ▼
//!   placement tick (fixed cadence)
//!     ├─ base round:  ≤ quota entries, round-robin over all actors
//!     ├─ VIP round:   ≤ vip_quota entries over the VIP subset
//!     ├─ sweep Waiting/Done jobs, unlock queues below soft limit
//!     ├─ process drained entries (outside all locks)
//!     └─ throughput update + progress announcements
//! ```
//!
//! ### Lifecycle of a job
//! ```text
//! let id  = scheduler.next_job_id("alice");
//! let job = Job::new(id, "forest brush", JobKind::Edit, task);
//! scheduler.submit("alice", Entry::Job(job.clone()));   // job_added fires
//!
//! placement tick drains the job entry:
//!   Waiting ──► Initializing ──► (task runs) ──► Running ──► Done
//!                      └─ task returns without advancing → completed by
//!                         the scheduler (synchronous jobs)
//!
//! scheduler.cancel_job("alice", id).await  // rendezvous, queue filter
//!   — or —
//! next tick sweeps the Done job            // job_removed fires (once)
//! ```
//!
//! ## Backpressure
//! - **Hard limit**: an actor whose queue reaches `hard_limit` is locked;
//!   submissions are rejected until the queue drains below `soft_limit`.
//! - **Global cap**: non-bypass submissions are rejected while the total
//!   enqueued count exceeds `global_max`; jobs and bypass-capable actors are
//!   exempt (the hard limit still applies to them).
//! - A rejected actor is told once per episode; the notification re-arms
//!   when the condition clears.
//!
//! ## Example
//! ```no_run
//! use fairplacer::{Config, Entry, PayloadFn, PlainEntry, Scheduler, StaticAuthorizer};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let scheduler = Scheduler::builder()
//!         .config(Config::default())
//!         .authorizer(StaticAuthorizer::new().with_vip("alice"))
//!         .build();
//!
//!     scheduler.submit(
//!         "alice",
//!         Entry::Plain(PlainEntry::ungrouped(PayloadFn::arc(|| async {
//!             // apply one write...
//!             Ok::<_, fairplacer::ProcessError>(())
//!         }))),
//!     );
//!
//!     // Either let the built-in loops drive the ticks...
//!     scheduler.start();
//!     // ...or drive them from the host's own timer:
//!     scheduler.run_placement_tick().await;
//! }
//! ```

mod config;
mod core;
mod entries;
mod error;
mod listeners;
mod services;
mod stats;

pub use config::Config;
pub use core::{Scheduler, SchedulerBuilder};
pub use entries::{
    Entry, GetAction, GetRequest, Job, JobId, JobKind, JobRef, JobStatus, JobTask, Location,
    Payload, PayloadFn, PlainEntry, Target, UNGROUPED,
};
pub use error::ProcessError;
pub use listeners::{JobListener, ListenerSet, LogListener};
pub use services::{
    Authorizer, LocationTracker, LogNotifier, Notifier, NullNotifier, NullProgressSink,
    NullTracker, ProgressSink, StaticAuthorizer,
};
pub use stats::ProgressReport;
