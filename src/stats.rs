//! # Progress and throughput reporting.
//!
//! The scheduler produces numeric facts only; the strings built here are
//! plain-text conveniences for notifier announcements and the progress sink.
//! Rendering beyond that (bars, colors) belongs to the host.
//!
//! Throughput is a smoothed estimate recomputed every placement tick from
//! entries placed in the interval divided by elapsed wall-clock time, and the
//! time-remaining projection is `queued / throughput` (zero when throughput
//! is zero).

/// Snapshot of one actor's queue progress.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressReport {
    /// Entries currently queued for the actor.
    pub queued: usize,
    /// Jobs currently registered for the actor.
    pub jobs: usize,
    /// Smoothed placement throughput, entries per second.
    pub speed: f64,
    /// Configured per-actor hard limit (for percent-of-limit projections).
    pub hard_limit: usize,
    /// True if the actor holds the global-cap bypass (shortens the message).
    pub bypass: bool,
}

impl ProgressReport {
    /// Estimated seconds until the queue drains; zero when throughput is zero.
    pub fn eta_seconds(&self) -> f64 {
        if self.speed > 0.0 {
            self.queued as f64 / self.speed
        } else {
            0.0
        }
    }

    /// Queue fill as a percentage of the hard limit.
    pub fn percent_of_limit(&self) -> f64 {
        if self.hard_limit == 0 {
            0.0
        } else {
            100.0 * self.queued as f64 / self.hard_limit as f64
        }
    }

    /// Completion percentage against a doubling time window.
    ///
    /// The window starts at 60 s and doubles until the projected drain time
    /// fits, which keeps the displayed percentage stable for long queues
    /// instead of hovering near zero.
    pub fn percent_done(&self) -> f64 {
        let time = self.eta_seconds();
        if time <= 0.0 {
            return 100.0;
        }
        let mut max = 60.0;
        while time > max * 1.05 {
            max *= 2.0;
        }
        100.0 - (100.0 * time / max).min(100.0)
    }

    /// Human-readable queue announcement.
    ///
    /// Bypass holders get the short form (no limit percentage, since the
    /// global cap does not apply to them).
    pub fn message(&self) -> String {
        if self.bypass {
            format!(
                "{} entries queued. Placing speed: {:.2} eps, {:.2}s left.",
                self.queued,
                self.speed,
                self.eta_seconds()
            )
        } else {
            format!(
                "{} out of {} entries ({:.2}%) queued. Placing speed: {:.2} eps, {:.2}s left.",
                self.queued,
                self.hard_limit,
                self.percent_of_limit(),
                self.speed,
                self.eta_seconds()
            )
        }
    }

    /// Compact one-line summary for progress sinks.
    pub fn summary(&self) -> String {
        format!(
            "Jobs: {}, Placing speed: {:.2} eps, {:.2}s left.",
            self.jobs,
            self.speed,
            self.eta_seconds()
        )
    }
}
