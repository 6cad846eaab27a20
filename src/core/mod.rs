//! Scheduler core: actor table, fairness rounds, and cancellation.
//!
//! The only public API from this module is [`Scheduler`] (and its builder),
//! which owns the actor table, drives the placement and get ticks, and
//! orchestrates cancellation.
//!
//! Internal modules:
//! - [`scheduler`]: submission, the two tick loops, lifecycle, introspection;
//! - [`cancel`]: job cancellation rendezvous, purge, explicit removal;
//! - [`table`]: per-actor slots, locked set, fairness cursors.

mod cancel;
mod scheduler;
mod table;

pub use scheduler::{Scheduler, SchedulerBuilder};
