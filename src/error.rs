//! Error types used by the placement scheduler and its payloads.
//!
//! The scheduler itself has no fatal failure modes: rejected submissions are
//! reported as a `bool`, protected-job cancellations go through the notifier,
//! and a rendezvous timeout degrades to a logged anomaly. The only error type
//! crossing the API boundary is [`ProcessError`], raised by entry payloads.
//! The tick loop never lets one failing entry abort the remaining entries of
//! the same tick; failures are logged and processing continues.

use thiserror::Error;

/// # Errors produced by entry payload execution.
///
/// Raised by [`Payload::process`](crate::Payload::process) and
/// [`JobTask::run`](crate::JobTask::run). The scheduler does not retry;
/// retry/propagation policy is owned by the payload itself.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ProcessError {
    /// Payload execution failed.
    #[error("execution failed: {error}")]
    Failed {
        /// The underlying error message.
        error: String,
    },

    /// Payload observed its cancellation token and bailed out.
    #[error("payload cancelled")]
    Canceled,
}

impl ProcessError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use fairplacer::ProcessError;
    ///
    /// let err = ProcessError::Failed { error: "boom".into() };
    /// assert_eq!(err.as_label(), "process_failed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ProcessError::Failed { .. } => "process_failed",
            ProcessError::Canceled => "process_canceled",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            ProcessError::Failed { error } => format!("error: {error}"),
            ProcessError::Canceled => "payload cancelled".to_string(),
        }
    }

    /// Shorthand for a [`ProcessError::Failed`] from any displayable error.
    pub fn failed(error: impl std::fmt::Display) -> Self {
        ProcessError::Failed {
            error: error.to_string(),
        }
    }
}
