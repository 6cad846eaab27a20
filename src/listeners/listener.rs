//! # Job lifecycle listener trait.
//!
//! Listeners are notified synchronously from whichever context performed the
//! mutation (a submitting thread, a placement tick, a cancellation caller).
//!
//! ## Rules
//! - `job_added` fires at most once and `job_removed` exactly once per job
//!   that leaves the system, across every removal path.
//! - Callbacks run on a snapshot of the listener set taken without holding
//!   the set's lock, so a callback may add or remove listeners.
//! - Callbacks must not re-enter scheduler mutation methods (`submit`,
//!   `cancel_job`, `purge`); the firing context may still hold no lock, but
//!   re-entry breaks the ordering the fan-out guarantees.
//! - Panics are caught and logged; one panicking listener does not prevent
//!   delivery to the others.

use crate::entries::JobRef;

/// Observer of job lifecycle transitions.
///
/// # Example
/// ```
/// use fairplacer::{JobListener, JobRef};
///
/// struct Audit;
///
/// impl JobListener for Audit {
///     fn job_added(&self, job: &JobRef) {
///         println!("registered job {} ({})", job.id(), job.name());
///     }
///
///     fn job_removed(&self, job: &JobRef) {
///         println!("retired job {}", job.id());
///     }
///
///     fn name(&self) -> &'static str { "audit" }
/// }
/// ```
pub trait JobListener: Send + Sync + 'static {
    /// A job was registered in an actor's job table.
    fn job_added(&self, job: &JobRef);

    /// A job left the system (completion, cancellation, or purge).
    fn job_removed(&self, job: &JobRef);

    /// Returns the listener name used in panic logs.
    ///
    /// Prefer short, descriptive names. The default uses
    /// `type_name::<Self>()`, which can be verbose - override it when possible.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}
