//! # Scheduler configuration.
//!
//! Provides [`Config`], the centralized settings for the placement scheduler.
//!
//! ## Sentinel values
//! - `global_max = 0` → no global queue cap
//! - `talk_interval = 0` → progress announcements disabled
//!
//! All fields are public for flexibility. Prefer the helper accessors over
//! sprinkling sentinel checks (`0`) across the codebase.

use std::time::Duration;

/// Global configuration for the placement scheduler.
///
/// Defines:
/// - **Per-tick quotas**: how many entries the fairness rounds may drain
/// - **Queue limits**: per-actor hard/soft limits and the global cap
/// - **Cadences**: placement tick interval and the faster get-tick interval
/// - **Cancellation rendezvous**: wait bound and polling step
///
/// ## Field semantics
/// - `quota`: entries drained per tick by the base round (all actors)
/// - `vip_quota`: entries drained per tick by the VIP round (VIP actors only)
/// - `hard_limit`: queue size at which an actor's queue locks
/// - `soft_limit`: queue size below which a locked queue unlocks
/// - `global_max`: cap on the sum of all queue sizes (`0` = uncapped)
/// - `interval`: placement tick cadence for the built-in invoker
/// - `get_interval`: get-tick cadence (much shorter than `interval`)
/// - `talk_interval`: placement ticks between progress announcements (`0` = never)
/// - `get_idle_runs`: idle get-ticks before the get loop parks itself
/// - `get_max_rounds`: swap-and-clear rounds per get tick (retry ceiling)
/// - `cancel_wait`: hard bound on the cancellation rendezvous
/// - `cancel_poll`: polling step while waiting for the rendezvous
#[derive(Clone, Debug)]
pub struct Config {
    /// Entries drained per tick by the base fairness round.
    pub quota: usize,

    /// Entries drained per tick by the VIP fairness round.
    ///
    /// Applied as a separate round over the VIP subset, after the base round,
    /// so neither group can starve the other of its own quota.
    pub vip_quota: usize,

    /// Per-actor queue size that locks the queue against further submission.
    pub hard_limit: usize,

    /// Queue size below which a locked queue is unlocked again.
    ///
    /// Must be below `hard_limit` to be meaningful.
    pub soft_limit: usize,

    /// Maximum total enqueued entries across all actors.
    ///
    /// - `0` = uncapped
    /// - `n > 0` = non-bypass submissions are rejected while the sum of all
    ///   queue sizes exceeds `n`
    pub global_max: usize,

    /// Placement tick cadence used by [`Scheduler::start`](crate::Scheduler::start).
    pub interval: Duration,

    /// Get-tick cadence used by the self-throttling get loop.
    pub get_interval: Duration,

    /// Placement ticks between progress announcements (`0` = disabled).
    pub talk_interval: u32,

    /// Number of idle get-ticks before the get loop parks itself.
    ///
    /// A new get-request revives the loop and resets this countdown.
    pub get_idle_runs: u32,

    /// Swap-and-clear rounds a single get tick may perform.
    pub get_max_rounds: u32,

    /// Hard bound on the cancellation rendezvous wait.
    pub cancel_wait: Duration,

    /// Polling step while waiting for the cancellation rendezvous.
    pub cancel_poll: Duration,
}

impl Config {
    /// Returns the global queue cap as an `Option`.
    ///
    /// - `None` → uncapped
    /// - `Some(n)` → non-bypass submissions rejected above `n` total entries
    #[inline]
    pub fn global_limit(&self) -> Option<usize> {
        if self.global_max == 0 {
            None
        } else {
            Some(self.global_max)
        }
    }

    /// Returns the progress-announcement interval as an `Option`.
    ///
    /// - `None` → announcements disabled
    /// - `Some(n)` → announce every `n` placement ticks
    #[inline]
    pub fn talk_every(&self) -> Option<u32> {
        if self.talk_interval == 0 {
            None
        } else {
            Some(self.talk_interval)
        }
    }

    /// Returns the get-tick retry ceiling clamped to a minimum of 1.
    #[inline]
    pub fn get_rounds_clamped(&self) -> u32 {
        self.get_max_rounds.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `quota = 128`, `vip_quota = 256`
    /// - `hard_limit = 10_000`, `soft_limit = 5_000`, `global_max = 100_000`
    /// - `interval = 250ms`, `get_interval = 10ms`
    /// - `talk_interval = 10` ticks
    /// - `get_idle_runs = 200`, `get_max_rounds = 200`
    /// - `cancel_wait = 1s`, `cancel_poll = 10ms`
    fn default() -> Self {
        Self {
            quota: 128,
            vip_quota: 256,
            hard_limit: 10_000,
            soft_limit: 5_000,
            global_max: 100_000,
            interval: Duration::from_millis(250),
            get_interval: Duration::from_millis(10),
            talk_interval: 10,
            get_idle_runs: 200,
            get_max_rounds: 200,
            cancel_wait: Duration::from_secs(1),
            cancel_poll: Duration::from_millis(10),
        }
    }
}
