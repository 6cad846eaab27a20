//! # ListenerSet: synchronous fan-out over registered listeners.
//!
//! ## What it guarantees
//! - Listeners observe transitions in the order the scheduler performed them
//!   (fan-out is synchronous, not queued).
//! - The set's lock is never held while callbacks run: `notify_*` snapshots
//!   the listener list first.
//! - Panics inside a listener are caught and logged (isolation).
//!
//! ## What it does **not** guarantee
//! - Ordering *between* listeners within one event is unspecified.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError};

use crate::entries::JobRef;

use super::listener::JobListener;

/// Registered job lifecycle listeners.
#[derive(Default)]
pub struct ListenerSet {
    inner: Mutex<Vec<Arc<dyn JobListener>>>,
}

impl ListenerSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener. A listener already present (by identity) is not
    /// added twice.
    pub fn add(&self, listener: Arc<dyn JobListener>) {
        let mut inner = self.lock();
        if !inner.iter().any(|l| Arc::ptr_eq(l, &listener)) {
            inner.push(listener);
        }
    }

    /// Removes a listener by identity. Unknown listeners are ignored.
    pub fn remove(&self, listener: &Arc<dyn JobListener>) {
        self.lock().retain(|l| !Arc::ptr_eq(l, listener));
    }

    /// Number of registered listeners.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// True if no listeners are registered.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Fires `job_added` on every listener.
    pub(crate) fn notify_added(&self, job: &JobRef) {
        for listener in self.snapshot() {
            Self::fire(&listener, job, JobListener::job_added);
        }
    }

    /// Fires `job_removed` on every listener.
    pub(crate) fn notify_removed(&self, job: &JobRef) {
        for listener in self.snapshot() {
            Self::fire(&listener, job, JobListener::job_removed);
        }
    }

    fn fire(listener: &Arc<dyn JobListener>, job: &JobRef, f: fn(&dyn JobListener, &JobRef)) {
        if catch_unwind(AssertUnwindSafe(|| f(listener.as_ref(), job))).is_err() {
            tracing::error!(listener = listener.name(), job = job.id(), "listener panicked");
        }
    }

    fn snapshot(&self) -> Vec<Arc<dyn JobListener>> {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Arc<dyn JobListener>>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entries::{Job, JobKind, PayloadFn};
    use crate::error::ProcessError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counter {
        added: AtomicUsize,
        removed: AtomicUsize,
    }

    impl Counter {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                added: AtomicUsize::new(0),
                removed: AtomicUsize::new(0),
            })
        }
    }

    impl JobListener for Counter {
        fn job_added(&self, _job: &JobRef) {
            self.added.fetch_add(1, Ordering::SeqCst);
        }

        fn job_removed(&self, _job: &JobRef) {
            self.removed.fetch_add(1, Ordering::SeqCst);
        }

        fn name(&self) -> &'static str {
            "counter"
        }
    }

    fn job() -> JobRef {
        Job::new(
            1,
            "j",
            JobKind::Edit,
            PayloadFn::arc(|| async { Ok::<_, ProcessError>(()) }),
        )
    }

    #[test]
    fn test_add_is_identity_deduplicated() {
        let set = ListenerSet::new();
        let counter = Counter::new();
        let dyn_listener: Arc<dyn JobListener> = counter.clone();
        set.add(dyn_listener.clone());
        set.add(dyn_listener.clone());
        assert_eq!(set.len(), 1);

        set.notify_added(&job());
        assert_eq!(counter.added.load(Ordering::SeqCst), 1);

        set.remove(&dyn_listener);
        assert!(set.is_empty());
    }

    #[test]
    fn test_panicking_listener_does_not_block_others() {
        struct Bomb;
        impl JobListener for Bomb {
            fn job_added(&self, _job: &JobRef) {
                panic!("boom");
            }
            fn job_removed(&self, _job: &JobRef) {}
            fn name(&self) -> &'static str {
                "bomb"
            }
        }

        let set = ListenerSet::new();
        let counter = Counter::new();
        set.add(Arc::new(Bomb));
        set.add(counter.clone());

        set.notify_added(&job());
        assert_eq!(counter.added.load(Ordering::SeqCst), 1);
    }
}
