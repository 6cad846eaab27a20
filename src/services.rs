//! # External collaborator interfaces.
//!
//! The scheduler consumes four services, specified here as object-safe traits
//! and injected at construction:
//!
//! - [`Authorizer`] — pure predicates classifying actors (VIP, bypass,
//!   progress, talkative); called per tick and per submission.
//! - [`Notifier`] — fire-and-forget user messages; must never block or fail
//!   the caller.
//! - [`LocationTracker`] — told about write-entry targets on accept and told
//!   to forget them on drain, cancellation, or purge.
//! - [`ProgressSink`] — receives numeric progress facts for actors allowed to
//!   see progress; cleared when an actor's queue drains.
//!
//! Null implementations are provided for every seam so a scheduler can be
//! built with only the services the host actually wires up.

use crate::entries::Location;
use crate::stats::ProgressReport;

/// Pure actor-classification predicates. No side effects.
pub trait Authorizer: Send + Sync + 'static {
    /// True if the actor drains under the larger VIP quota.
    fn is_vip(&self, actor: &str) -> bool;

    /// True if the actor's submissions are exempt from the global queue cap
    /// (not from the per-actor hard limit).
    fn has_bypass(&self, actor: &str) -> bool;

    /// True if the actor receives progress-sink updates.
    fn can_see_progress(&self, actor: &str) -> bool;

    /// True if the actor receives periodic progress announcements.
    fn is_talkative(&self, actor: &str) -> bool;
}

/// Fire-and-forget notification channel toward an actor.
pub trait Notifier: Send + Sync + 'static {
    /// Delivers a message to the actor. Best effort; never blocks.
    fn notify(&self, actor: &str, message: &str);
}

/// Tracks the locations of in-flight write entries.
pub trait LocationTracker: Send + Sync + 'static {
    /// Remembers a location with a pending write.
    fn track(&self, world: &str, location: Location);

    /// Forgets a previously tracked location.
    fn untrack(&self, world: &str, location: Location);
}

/// Receives per-actor progress projections.
pub trait ProgressSink: Send + Sync + 'static {
    /// Pushes the latest numeric progress facts for an actor.
    fn update(&self, actor: &str, report: &ProgressReport);

    /// Clears any displayed progress for an actor whose queue drained.
    fn clear(&self, actor: &str);
}

/// Set-based authorizer, handy for tests and static deployments.
///
/// ## Example
/// ```
/// use fairplacer::{Authorizer, StaticAuthorizer};
///
/// let auth = StaticAuthorizer::new().with_vip("alice").with_bypass("ops");
/// assert!(auth.is_vip("alice"));
/// assert!(!auth.is_vip("bob"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct StaticAuthorizer {
    vips: std::collections::HashSet<String>,
    bypass: std::collections::HashSet<String>,
    progress: bool,
    talkative: bool,
}

impl StaticAuthorizer {
    /// Creates an authorizer granting nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Grants the VIP quota to an actor.
    pub fn with_vip(mut self, actor: impl Into<String>) -> Self {
        self.vips.insert(actor.into());
        self
    }

    /// Grants the global-cap bypass to an actor.
    pub fn with_bypass(mut self, actor: impl Into<String>) -> Self {
        self.bypass.insert(actor.into());
        self
    }

    /// Enables progress-sink updates for every actor.
    pub fn with_progress(mut self) -> Self {
        self.progress = true;
        self
    }

    /// Enables progress announcements for every actor.
    pub fn with_talkative(mut self) -> Self {
        self.talkative = true;
        self
    }
}

impl Authorizer for StaticAuthorizer {
    fn is_vip(&self, actor: &str) -> bool {
        self.vips.contains(actor)
    }

    fn has_bypass(&self, actor: &str) -> bool {
        self.bypass.contains(actor)
    }

    fn can_see_progress(&self, _actor: &str) -> bool {
        self.progress
    }

    fn is_talkative(&self, _actor: &str) -> bool {
        self.talkative
    }
}

/// Notifier that drops every message.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _actor: &str, _message: &str) {}
}

/// Notifier that prints messages to stdout; for development and demos.
///
/// Output format: `[notify] actor=<actor> <message>`
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, actor: &str, message: &str) {
        println!("[notify] actor={actor} {message}");
    }
}

/// Tracker that ignores every location.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullTracker;

impl LocationTracker for NullTracker {
    fn track(&self, _world: &str, _location: Location) {}
    fn untrack(&self, _world: &str, _location: Location) {}
}

/// Progress sink that discards every report.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullProgressSink;

impl ProgressSink for NullProgressSink {
    fn update(&self, _actor: &str, _report: &ProgressReport) {}
    fn clear(&self, _actor: &str) {}
}
