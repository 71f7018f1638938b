//! End-to-end coverage for submit -> execute -> outcome flows, against a
//! real Redis via `test_utils::TestRedis`. Mirrors the corpus's own
//! `libs/notifications/email/tests/integration_test.rs` style: no mocking
//! of the store, a real container per test, `#[tokio::test]` throughout.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use database::redis::RedisConfig;
use scheduler::{
    DeadLetterQueue, HandlerError, Registry, Scheduler, SchedulerConfig, SchedulerError, SubmitOptions,
    TaskPriority, TaskStatus,
};
use serde::Deserialize;
use test_utils::TestRedis;

#[derive(Debug, Deserialize)]
struct Payload {
    value: String,
}

fn test_config(redis: &TestRedis, namespace: &str) -> SchedulerConfig {
    SchedulerConfig {
        namespace: namespace.to_string(),
        redis: RedisConfig::new(redis.connection_string()),
        scan_interval: Duration::from_millis(50),
        lease_ttl: Duration::from_secs(5),
        renew_interval: Duration::from_secs(1),
        lock_timeout: Duration::from_secs(5),
        worker_count: 1,
        worker_concurrency: 4,
        dedup_default_ttl: Duration::from_secs(60),
        dlq_max_size: Some(100),
        ..SchedulerConfig::default()
    }
}

async fn build_scheduler(redis: &TestRedis, namespace: &str, registry: Arc<Registry>) -> Arc<Scheduler> {
    Arc::new(
        Scheduler::new(test_config(redis, namespace), registry)
            .await
            .expect("scheduler should connect to the test redis instance"),
    )
}

fn dlq_for(scheduler: &Scheduler) -> DeadLetterQueue {
    DeadLetterQueue::new(scheduler.redis(), scheduler.namespace().to_string(), true, Some(100))
}

/// Poll `check` every 20ms until it returns `true` or `timeout` elapses.
/// Returns whether the condition was observed.
async fn wait_until<F, Fut>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if check().await {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

#[tokio::test]
async fn test_submit_and_execute_success() {
    let redis = TestRedis::new().await;
    let executed = Arc::new(AtomicUsize::new(0));

    let registry = Registry::new();
    {
        let executed = Arc::clone(&executed);
        registry
            .register_typed("echo", move |payload: Payload| {
                let executed = Arc::clone(&executed);
                async move {
                    assert_eq!(payload.value, "hello");
                    executed.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            })
            .unwrap();
    }

    let scheduler = build_scheduler(&redis, "success", Arc::new(registry)).await;
    Arc::clone(&scheduler).start().await.unwrap();

    let task_id = scheduler
        .submit(
            "echo",
            serde_json::to_vec(&serde_json::json!({"value": "hello"})).unwrap(),
            SubmitOptions::new(),
        )
        .await
        .unwrap();

    let finished = wait_until(Duration::from_secs(5), || async {
        scheduler.get_task_info(&task_id).await.unwrap().is_none()
    })
    .await;

    assert!(finished, "task hash should be deleted once it succeeds");
    assert_eq!(executed.load(Ordering::SeqCst), 1);

    scheduler.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_failing_task_retries_then_succeeds() {
    let redis = TestRedis::new().await;
    let attempts = Arc::new(AtomicUsize::new(0));

    let registry = Registry::new();
    {
        let attempts = Arc::clone(&attempts);
        registry
            .register_typed("flaky", move |_payload: Payload| {
                let attempts = Arc::clone(&attempts);
                async move {
                    let n = attempts.fetch_add(1, Ordering::SeqCst) + 1;
                    if n < 3 {
                        return Err(HandlerError::from("not yet"));
                    }
                    Ok(())
                }
            })
            .unwrap();
    }

    let scheduler = build_scheduler(&redis, "flaky", Arc::new(registry)).await;
    Arc::clone(&scheduler).start().await.unwrap();

    let task_id = scheduler
        .submit(
            "flaky",
            serde_json::to_vec(&serde_json::json!({"value": "x"})).unwrap(),
            SubmitOptions::new().with_task_max_retry(5),
        )
        .await
        .unwrap();

    let finished = wait_until(Duration::from_secs(10), || async {
        scheduler.get_task_info(&task_id).await.unwrap().is_none()
    })
    .await;

    assert!(finished, "task should eventually succeed and its hash be deleted");
    assert_eq!(attempts.load(Ordering::SeqCst), 3);

    scheduler.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_exhausted_retries_land_in_dead_letter_queue() {
    let redis = TestRedis::new().await;
    let attempts = Arc::new(AtomicUsize::new(0));

    let registry = Registry::new();
    {
        let attempts = Arc::clone(&attempts);
        registry
            .register_typed("always_fails", move |_payload: Payload| {
                let attempts = Arc::clone(&attempts);
                async move {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    Err(HandlerError::from("boom"))
                }
            })
            .unwrap();
    }

    let scheduler = build_scheduler(&redis, "dead", Arc::new(registry)).await;
    Arc::clone(&scheduler).start().await.unwrap();
    let dlq = dlq_for(&scheduler);

    let task_id = scheduler
        .submit(
            "always_fails",
            serde_json::to_vec(&serde_json::json!({"value": "x"})).unwrap(),
            SubmitOptions::new().with_task_max_retry(1),
        )
        .await
        .unwrap();

    let dead = wait_until(Duration::from_secs(10), || {
        let dlq = dlq.clone();
        let task_id = task_id.clone();
        async move { dlq.get(0, -1).await.unwrap().contains(&task_id) }
    })
    .await;

    assert!(
        dead,
        "task with max_retry=1 should be dead-lettered only after two failed attempts"
    );
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
    assert!(scheduler.get_task_info(&task_id).await.unwrap().is_none());

    scheduler.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_cancel_delayed_task_removes_hash() {
    let redis = TestRedis::new().await;
    let registry = Registry::new();
    registry
        .register_typed("noop", |_payload: Payload| async move { Ok(()) })
        .unwrap();

    let scheduler = build_scheduler(&redis, "cancel", Arc::new(registry)).await;

    let task_id = scheduler
        .submit(
            "noop",
            serde_json::to_vec(&serde_json::json!({"value": "x"})).unwrap(),
            SubmitOptions::new().with_delay(Duration::from_secs(3600)),
        )
        .await
        .unwrap();

    let info = scheduler.get_task_info(&task_id).await.unwrap().unwrap();
    assert_eq!(info.status, TaskStatus::Pending);

    let cancelled = scheduler.cancel_task(&task_id).await.unwrap();
    assert!(cancelled);
    assert!(scheduler.get_task_info(&task_id).await.unwrap().is_none());

    let stats = scheduler.get_queue_stats().await.unwrap();
    assert_eq!(stats.delayed_count, 0);
}

#[tokio::test]
async fn test_cancelling_unknown_task_returns_false() {
    let redis = TestRedis::new().await;
    let scheduler = build_scheduler(&redis, "cancel-unknown", Arc::new(Registry::new())).await;

    let cancelled = scheduler.cancel_task("does-not-exist").await.unwrap();
    assert!(!cancelled);
}

#[tokio::test]
async fn test_duplicate_dedup_key_is_rejected() {
    let redis = TestRedis::new().await;
    let registry = Registry::new();
    registry
        .register_typed("noop", |_payload: Payload| async move { Ok(()) })
        .unwrap();

    let scheduler = build_scheduler(&redis, "dedup", Arc::new(registry)).await;

    let opts = SubmitOptions::new()
        .with_delay(Duration::from_secs(3600))
        .with_task_deduplication("order-42", Duration::from_secs(60));

    let payload = serde_json::to_vec(&serde_json::json!({"value": "x"})).unwrap();
    let first_id = scheduler.submit("noop", payload.clone(), opts.clone()).await.unwrap();

    let second = scheduler.submit("noop", payload, opts).await;
    match second {
        Err(SchedulerError::Duplicate(existing_id)) => assert_eq!(existing_id, first_id),
        other => panic!("expected SchedulerError::Duplicate, got {other:?}"),
    }
}

#[tokio::test]
async fn test_running_task_cannot_be_cancelled() {
    let redis = TestRedis::new().await;
    let registry = Registry::new();
    registry
        .register_typed("slow", |_payload: Payload| async move {
            tokio::time::sleep(Duration::from_secs(3)).await;
            Ok(())
        })
        .unwrap();

    let scheduler = build_scheduler(&redis, "running", Arc::new(registry)).await;
    Arc::clone(&scheduler).start().await.unwrap();

    let task_id = scheduler
        .submit(
            "slow",
            serde_json::to_vec(&serde_json::json!({"value": "x"})).unwrap(),
            SubmitOptions::new(),
        )
        .await
        .unwrap();

    let running = wait_until(Duration::from_secs(5), || {
        let scheduler = &scheduler;
        let task_id = task_id.clone();
        async move {
            matches!(
                scheduler.get_task_info(&task_id).await.unwrap().map(|t| t.status),
                Some(TaskStatus::Running)
            )
        }
    })
    .await;
    assert!(running, "task should reach the running state while its handler sleeps");

    let result = scheduler.cancel_task(&task_id).await;
    assert!(matches!(result, Err(SchedulerError::Lifecycle(_))));

    scheduler.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_batch_submit_returns_one_result_per_payload() {
    let redis = TestRedis::new().await;
    let registry = Registry::new();
    registry
        .register_typed("noop", |_payload: Payload| async move { Ok(()) })
        .unwrap();

    let scheduler = build_scheduler(&redis, "batch", Arc::new(registry)).await;

    let payloads = (0..5)
        .map(|i| serde_json::to_vec(&serde_json::json!({"value": format!("item-{i}")})).unwrap())
        .collect();

    let results = scheduler
        .batch_submit("noop", payloads, SubmitOptions::new().with_priority(TaskPriority::High))
        .await;

    assert_eq!(results.len(), 5);
    assert!(results.iter().all(Result::is_ok));
}

#[tokio::test]
async fn test_submit_with_unknown_handler_is_dead_lettered() {
    let redis = TestRedis::new().await;
    let scheduler = build_scheduler(&redis, "missing-handler", Arc::new(Registry::new())).await;
    Arc::clone(&scheduler).start().await.unwrap();
    let dlq = dlq_for(&scheduler);

    let task_id = scheduler
        .submit(
            "nothing_registered",
            serde_json::to_vec(&serde_json::json!({"value": "x"})).unwrap(),
            SubmitOptions::new().with_task_max_retry(1),
        )
        .await
        .unwrap();

    let dead = wait_until(Duration::from_secs(10), || {
        let dlq = dlq.clone();
        let task_id = task_id.clone();
        async move { dlq.get(0, -1).await.unwrap().contains(&task_id) }
    })
    .await;

    assert!(dead, "a task with no registered handler should exhaust retries and land in the DLQ");

    scheduler.shutdown().await.unwrap();
}
