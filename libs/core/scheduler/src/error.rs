//! Error taxonomy for the scheduler core.

use thiserror::Error;

/// Errors surfaced by the scheduler core.
#[derive(Error, Debug)]
pub enum SchedulerError {
    /// Invalid task fields or invalid cron expression. Raised synchronously
    /// to the caller, never retried.
    #[error("submission rejected: {0}")]
    Submission(String),

    /// A deduplication key was already claimed by another task. Carries the
    /// id of the existing task so the caller can recover it without parsing
    /// the display message.
    #[error("duplicate submission: existing task '{0}'")]
    Duplicate(String),

    /// Rate-limit exceeded or circuit breaker open at submission time.
    #[error("admission rejected: {0}")]
    Admission(String),

    /// Transient key-value store error.
    #[error("store error: {0}")]
    Store(#[from] redis::RedisError),

    /// JSON encode/decode failure on a task hash field.
    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),

    /// No handler registered for a task's type.
    #[error("no handler registered for task type '{0}'")]
    HandlerNotFound(String),

    /// The handler panicked during execution.
    #[error("handler panicked: {0}")]
    HandlerPanic(String),

    /// The handler did not return within the task's timeout.
    #[error("task timed out after {0:?}")]
    TaskTimeout(std::time::Duration),

    /// The handler returned an application-level error.
    #[error("handler error: {0}")]
    Handler(String),

    /// Distributed lock acquire/release/extend failure. Acquire failures are
    /// expected (another worker owns the task) and are not logged as
    /// errors; release/extend failures are logged.
    #[error("lock error: {0}")]
    Lock(String),

    /// An operation was attempted against a task or scheduler in an invalid
    /// lifecycle state (double-start, mutating a cancelled task, ...).
    #[error("lifecycle error: {0}")]
    Lifecycle(String),

    /// Invalid cron expression.
    #[error("invalid cron expression '{0}': {1}")]
    InvalidCron(String, String),

    /// Internal invariant violation; should not normally occur.
    #[error("internal error: {0}")]
    Internal(String),
}

impl SchedulerError {
    /// True for errors that are expected during normal operation and should
    /// not be logged at `error` level (e.g. a lock contention miss).
    pub fn is_expected(&self) -> bool {
        matches!(self, Self::Lock(_))
    }

    /// True for a Redis "NOGROUP" style error, meaning a consumer group
    /// needs to be (re)created before the call can be retried.
    pub fn is_nogroup(&self) -> bool {
        match self {
            Self::Store(e) => e.to_string().contains("NOGROUP"),
            _ => false,
        }
    }

    /// True for connection-level Redis errors, worth a backoff before the
    /// next scan/fetch attempt.
    pub fn is_connection_error(&self) -> bool {
        match self {
            Self::Store(e) => {
                let s = e.to_string().to_lowercase();
                s.contains("connection")
                    || s.contains("disconnected")
                    || s.contains("broken pipe")
                    || s.contains("reset by peer")
                    || s.contains("refused")
                    || s.contains("eof")
            }
            _ => false,
        }
    }
}

/// Result alias used throughout the crate.
pub type SchedulerResult<T> = Result<T, SchedulerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handler_not_found_message() {
        let err = SchedulerError::HandlerNotFound("send_email".to_string());
        assert_eq!(
            err.to_string(),
            "no handler registered for task type 'send_email'"
        );
    }

    #[test]
    fn test_lock_error_is_expected() {
        let err = SchedulerError::Lock("already held".to_string());
        assert!(err.is_expected());

        let err = SchedulerError::Handler("boom".to_string());
        assert!(!err.is_expected());
    }

    #[test]
    fn test_task_timeout_display() {
        let err = SchedulerError::TaskTimeout(std::time::Duration::from_secs(5));
        assert!(err.to_string().contains("5s"));
    }
}
