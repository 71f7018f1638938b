//! Metrics: Prometheus-compatible counters/gauges/histograms for the
//! scheduler core.
//!
//! Keeps the teacher's `init_metrics`/`get_metrics_handle` exporter
//! lifecycle (`OnceLock<PrometheusHandle>` + `PrometheusBuilder`) and its
//! helper-function style, renamed to the task-oriented counters, gauges,
//! and histograms this crate emits.

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Duration;

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub mod names {
    pub const TASK_SUBMITTED: &str = "task_submitted_total";
    pub const TASK_EXECUTED: &str = "task_executed_total";
    pub const TASK_RETRY: &str = "task_retry_total";
    pub const RATE_LIMIT_REJECTED: &str = "rate_limit_rejected_total";
    pub const QUEUE_SIZE: &str = "queue_size";
    pub const WORKER_COUNT: &str = "worker_count";
    pub const DEAD_LETTER_QUEUE_SIZE: &str = "dead_letter_queue_size";
    pub const CIRCUIT_BREAKER_STATE: &str = "circuit_breaker_state";
    pub const TASK_DURATION: &str = "task_duration_seconds";
    pub const LOCK_WAIT_DURATION: &str = "lock_wait_duration_seconds";
}

/// Initialize the Prometheus metrics exporter. Call once at process
/// startup; returns the handle used to render `/metrics`.
pub fn init_metrics() -> PrometheusHandle {
    PROMETHEUS_HANDLE
        .get_or_init(|| {
            PrometheusBuilder::new()
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

pub fn get_metrics_handle() -> Option<PrometheusHandle> {
    PROMETHEUS_HANDLE.get().cloned()
}

/// A task was accepted for submission (before admission control rejects
/// it; rejections never reach this counter).
pub fn record_task_submitted(task_type: &str, priority: &str) {
    counter!(
        names::TASK_SUBMITTED,
        "type" => task_type.to_string(),
        "priority" => priority.to_string()
    )
    .increment(1);
}

/// A task finished executing, successfully or not. `status` is `"success"`
/// or `"failed"`.
pub fn record_task_executed(task_type: &str, status: &str) {
    counter!(
        names::TASK_EXECUTED,
        "type" => task_type.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// A task was scheduled for a retry attempt.
pub fn record_task_retry(task_type: &str, retry_count: u32) {
    counter!(
        names::TASK_RETRY,
        "type" => task_type.to_string(),
        "retry_count" => retry_count.to_string()
    )
    .increment(1);
}

/// A submission was rejected by the rate limiter.
pub fn record_rate_limit_rejected() {
    counter!(names::RATE_LIMIT_REJECTED).increment(1);
}

/// Set the current depth of one named queue (`delayed`, `high`, `normal`,
/// `low`).
pub fn set_queue_size(queue: &str, size: u64) {
    gauge!(names::QUEUE_SIZE, "queue" => queue.to_string()).set(size as f64);
}

pub fn set_worker_count(count: usize) {
    gauge!(names::WORKER_COUNT).set(count as f64);
}

pub fn set_dead_letter_queue_size(size: u64) {
    gauge!(names::DEAD_LETTER_QUEUE_SIZE).set(size as f64);
}

/// Set a circuit breaker's reported state: 0 = closed, 1 = half-open,
/// 2 = open, matching the ordinal the health payload uses.
pub fn set_circuit_breaker_state(name: &str, state: u8) {
    gauge!(names::CIRCUIT_BREAKER_STATE, "name" => name.to_string()).set(state as f64);
}

/// Record how long a task's handler took to run, success or failure alike.
pub fn record_task_duration(task_type: &str, duration: Duration) {
    histogram!(names::TASK_DURATION, "type" => task_type.to_string()).record(duration.as_secs_f64());
}

/// Record how long a worker waited to acquire a task's distributed lock.
pub fn record_lock_wait_duration(task_type: &str, duration: Duration) {
    histogram!(names::LOCK_WAIT_DURATION, "type" => task_type.to_string()).record(duration.as_secs_f64());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_metrics_is_idempotent() {
        let a = init_metrics();
        let b = init_metrics();
        assert_eq!(a.render(), b.render());
    }

    #[test]
    fn test_record_helpers_do_not_panic() {
        init_metrics();
        record_task_submitted("send_email", "high");
        record_task_executed("send_email", "success");
        record_task_retry("send_email", 1);
        record_rate_limit_rejected();
        set_queue_size("high", 3);
        set_worker_count(2);
        set_dead_letter_queue_size(0);
        set_circuit_breaker_state("redis", 0);
        record_task_duration("send_email", Duration::from_millis(50));
        record_lock_wait_duration("send_email", Duration::from_millis(5));
    }
}
