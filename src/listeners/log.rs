//! # Simple logging listener for debugging and demos.
//!
//! [`LogListener`] prints job lifecycle transitions to stdout in a
//! human-readable format.
//!
//! ## Output format
//! ```text
//! [job-added] id=3 name="forest brush" status=Waiting
//! [job-removed] id=3 name="forest brush" status=Done done=true
//! ```

use crate::entries::JobRef;

use super::listener::JobListener;

/// Stdout listener; for development, debugging, and examples.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogListener;

impl LogListener {
    pub fn new() -> Self {
        Self
    }
}

impl JobListener for LogListener {
    fn job_added(&self, job: &JobRef) {
        println!(
            "[job-added] id={} name={:?} status={:?}",
            job.id(),
            job.name(),
            job.status()
        );
    }

    fn job_removed(&self, job: &JobRef) {
        println!(
            "[job-removed] id={} name={:?} status={:?} done={}",
            job.id(),
            job.name(),
            job.status(),
            job.is_task_done()
        );
    }

    fn name(&self) -> &'static str {
        "log"
    }
}
