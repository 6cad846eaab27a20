//! # Work-item model.
//!
//! Queued work is a closed, tagged set — the scheduler never inspects runtime
//! types:
//! - [`Entry`] — what actor queues hold: a plain write entry or a job entry
//! - [`PlainEntry`] — one atomic write with an optional tracked [`Target`]
//! - [`Job`] / [`JobRef`] — named, independently cancelable group of entries
//!   with a status state machine
//! - [`GetRequest`] — priority read-style request for the global get FIFO
//! - [`Payload`] / [`JobTask`] — async execution seams, with [`PayloadFn`] as
//!   the closure-backed adapter

mod entry;
mod get;
mod job;
mod payload;

pub use entry::{Entry, Location, PlainEntry, Target};
pub use get::{GetAction, GetRequest};
pub use job::{Job, JobId, JobKind, JobRef, JobStatus, UNGROUPED};
pub use payload::{JobTask, Payload, PayloadFn};
