//! Worker lifecycle: registration/heartbeat, fetch/process pipeline, and
//! per-task execution.
//!
//! Generalizes the teacher's `StreamWorker<J, P>` fetch/process split (a
//! bounded channel feeding a semaphore-gated pool) from one compiled job
//! type to the runtime-registry dispatch in [`crate::registry`]. The
//! lock-acquire -> load -> mark-running -> execute -> route-outcome sequence
//! itself has no teacher counterpart, since `consumer.rs` never combined a
//! stream with a per-item mutual-exclusion lock; it is new code grounded on
//! that file's XREADGROUP/XACK/XAUTOCLAIM call shapes reused via [`crate::queue::Queue`].

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tokio::sync::{mpsc, watch, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::cron;
use crate::dlq::DeadLetterQueue;
use crate::error::{SchedulerError, SchedulerResult};
use crate::lock::DistLock;
use crate::metrics;
use crate::queue::{Queue, ReadyItem};
use crate::registry::{Registry, TaskHandler};
use crate::retry::RetryStrategy;
use crate::task::{Task, TaskStatus, TaskStore};

/// Per-worker timing and concurrency knobs (§4.3).
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub worker_id: String,
    pub concurrency: usize,
    pub lease_ttl: Duration,
    pub renew_interval: Duration,
    pub lock_timeout: Duration,
    pub block_timeout: Duration,
    pub shutdown_grace_period: Duration,
}

impl WorkerConfig {
    pub fn new(worker_id: impl Into<String>) -> Self {
        Self {
            worker_id: worker_id.into(),
            concurrency: 5,
            lease_ttl: Duration::from_secs(30),
            renew_interval: Duration::from_secs(10),
            lock_timeout: Duration::from_secs(30),
            block_timeout: Duration::from_secs(1),
            shutdown_grace_period: Duration::from_secs(30),
        }
    }
}

/// Lease-TTL must be strictly greater than the renewal interval (§3,
/// testable property 8) so a single missed renewal tick cannot expire the
/// registration.
fn validate_lease(config: &WorkerConfig) -> SchedulerResult<()> {
    if config.lease_ttl <= config.renew_interval {
        return Err(SchedulerError::Lifecycle(format!(
            "lease_ttl ({:?}) must be strictly greater than renew_interval ({:?})",
            config.lease_ttl, config.renew_interval
        )));
    }
    Ok(())
}

/// Worker registration hash, `<namespace>:worker:<id>`, TTL = lease.
#[derive(Clone)]
struct WorkerRegistry {
    redis: ConnectionManager,
    namespace: String,
}

impl WorkerRegistry {
    fn key(&self, worker_id: &str) -> String {
        format!("{}:worker:{}", self.namespace, worker_id)
    }

    async fn register(&self, worker_id: &str, lease_ttl: Duration) -> SchedulerResult<()> {
        let mut conn = self.redis.clone();
        let now = chrono::Utc::now().timestamp();
        let fields = [
            ("id", worker_id.to_string()),
            ("start_time", now.to_string()),
            ("task_count", "0".to_string()),
            ("last_heartbeat", now.to_string()),
        ];
        conn.hset_multiple::<_, _, _, ()>(self.key(worker_id), &fields).await?;
        conn.expire::<_, ()>(self.key(worker_id), lease_ttl.as_secs().max(1) as i64)
            .await?;
        Ok(())
    }

    async fn renew(&self, worker_id: &str, lease_ttl: Duration, task_count: usize) -> SchedulerResult<()> {
        let mut conn = self.redis.clone();
        let now = chrono::Utc::now().timestamp();
        let fields = [
            ("last_heartbeat", now.to_string()),
            ("task_count", task_count.to_string()),
        ];
        conn.hset_multiple::<_, _, _, ()>(self.key(worker_id), &fields).await?;
        conn.expire::<_, ()>(self.key(worker_id), lease_ttl.as_secs().max(1) as i64)
            .await?;
        Ok(())
    }

    async fn unregister(&self, worker_id: &str) -> SchedulerResult<()> {
        let mut conn = self.redis.clone();
        conn.del::<_, ()>(self.key(worker_id)).await?;
        Ok(())
    }
}

/// A long-lived dispatch agent: one fetch loop, one lease-renewal loop, and
/// a concurrency-bounded pool of in-flight task executions (§4.3).
pub struct Worker {
    queue: Queue,
    lock: DistLock,
    tasks: TaskStore,
    registry: Arc<Registry>,
    retry_strategy: RetryStrategy,
    dlq: DeadLetterQueue,
    workers: WorkerRegistry,
    config: WorkerConfig,
    active_count: AtomicUsize,
}

impl Worker {
    pub fn new(
        redis: ConnectionManager,
        namespace: impl Into<String>,
        queue: Queue,
        registry: Arc<Registry>,
        retry_strategy: RetryStrategy,
        dlq: DeadLetterQueue,
        config: WorkerConfig,
    ) -> SchedulerResult<Self> {
        validate_lease(&config)?;
        let namespace = namespace.into();
        Ok(Self {
            lock: DistLock::new(redis.clone(), namespace.clone()),
            tasks: TaskStore::new(redis.clone(), namespace.clone()),
            workers: WorkerRegistry { redis, namespace },
            queue,
            registry,
            retry_strategy,
            dlq,
            config,
            active_count: AtomicUsize::new(0),
        })
    }

    pub fn id(&self) -> &str {
        &self.config.worker_id
    }

    /// Register, run the fetch/renew/process loops until `shutdown` fires,
    /// drain in-flight work for up to `shutdown_grace_period`, then
    /// unregister. Tasks still running past the grace deadline are
    /// abandoned; their pending stream entries are recovered later by a
    /// scan-loop reclaim.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) -> SchedulerResult<()> {
        self.workers.register(&self.config.worker_id, self.config.lease_ttl).await?;
        info!(
            worker_id = %self.config.worker_id,
            concurrency = self.config.concurrency,
            "worker registered"
        );

        let (tx, mut rx) = mpsc::channel::<ReadyItem>(10);

        let renew_handle = tokio::spawn({
            let this = Arc::clone(&self);
            let mut shutdown = shutdown.clone();
            async move {
                let mut ticker = tokio::time::interval(this.config.renew_interval);
                loop {
                    tokio::select! {
                        _ = shutdown.changed() => break,
                        _ = ticker.tick() => {
                            let count = this.active_count.load(Ordering::SeqCst);
                            if let Err(e) = this.workers.renew(&this.config.worker_id, this.config.lease_ttl, count).await {
                                warn!(worker_id = %this.config.worker_id, error = %e, "lease renewal failed");
                            }
                        }
                    }
                }
            }
        });

        let fetch_handle = tokio::spawn({
            let this = Arc::clone(&self);
            let mut shutdown = shutdown.clone();
            async move {
                loop {
                    if *shutdown.borrow() {
                        break;
                    }
                    tokio::select! {
                        _ = shutdown.changed() => break,
                        result = this.queue.pop_ready(&this.config.worker_id, this.config.block_timeout) => {
                            match result {
                                Ok(Some(item)) => {
                                    if tx.send(item).await.is_err() {
                                        break;
                                    }
                                }
                                Ok(None) => {}
                                Err(e) => {
                                    warn!(worker_id = %this.config.worker_id, error = %e, "fetch error, backing off");
                                    tokio::time::sleep(Duration::from_millis(500)).await;
                                }
                            }
                        }
                    }
                }
            }
        });

        let semaphore = Arc::new(Semaphore::new(self.config.concurrency.max(1)));
        let mut join_set: JoinSet<()> = JoinSet::new();

        while let Some(item) = rx.recv().await {
            let permit = Arc::clone(&semaphore)
                .acquire_owned()
                .await
                .expect("worker semaphore never closed");
            let this = Arc::clone(&self);
            this.active_count.fetch_add(1, Ordering::SeqCst);
            join_set.spawn(async move {
                this.execute_item(item).await;
                this.active_count.fetch_sub(1, Ordering::SeqCst);
                drop(permit);
            });
        }

        let drained = tokio::time::timeout(self.config.shutdown_grace_period, async {
            while join_set.join_next().await.is_some() {}
        })
        .await;
        if drained.is_err() {
            warn!(
                worker_id = %self.config.worker_id,
                "shutdown grace period expired with tasks still running; they will be reclaimed"
            );
            join_set.abort_all();
        }

        let _ = fetch_handle.await;
        renew_handle.abort();
        self.workers.unregister(&self.config.worker_id).await?;
        info!(worker_id = %self.config.worker_id, "worker unregistered");
        Ok(())
    }

    /// Lock -> load -> mark-running -> execute -> route outcome -> ack
    /// (§4.4). The lock is always released; the stream entry is acked
    /// unless a store error aborted the step (§7), leaving the pending
    /// entry for a later reclaim.
    async fn execute_item(&self, item: ReadyItem) {
        let acquired = match self
            .lock
            .acquire(&item.task_id, &self.config.worker_id, self.config.lock_timeout.as_secs().max(1))
            .await
        {
            Ok(acquired) => acquired,
            Err(e) => {
                warn!(task_id = %item.task_id, error = %e, "lock acquire errored, abandoning item");
                return;
            }
        };
        if !acquired {
            // Defensive: the pending entry is already owned by whichever
            // worker holds the lock. Ack it rather than risk an infinite
            // redelivery loop if the lock situation persists.
            debug!(task_id = %item.task_id, "lock already held, abandoning item defensively");
            if let Err(e) = self.queue.ack_message(item.priority, &item.entry_id).await {
                warn!(task_id = %item.task_id, error = %e, "failed to ack stream entry");
            }
            return;
        }

        let should_ack = self.execute_locked(&item).await;

        if let Err(e) = self.lock.release(&item.task_id, &self.config.worker_id).await {
            warn!(task_id = %item.task_id, error = %e, "lock release failed");
        }

        if should_ack {
            if let Err(e) = self.queue.ack_message(item.priority, &item.entry_id).await {
                warn!(task_id = %item.task_id, error = %e, "failed to ack stream entry");
            }
        }
    }

    /// Returns whether the stream entry should be acked. `false` only for a
    /// store error encountered while loading or persisting the task hash
    /// itself (§7 `StoreError`); every other path -- including a missing
    /// hash, a missing handler, a handler error, panic, or timeout -- acks.
    async fn execute_locked(&self, item: &ReadyItem) -> bool {
        let mut task = match self.tasks.get(&item.task_id).await {
            Ok(Some(task)) => task,
            Ok(None) => {
                warn!(task_id = %item.task_id, "task hash missing, treating as lost");
                return true;
            }
            Err(e) => {
                warn!(task_id = %item.task_id, error = %e, "store error loading task, abandoning without ack");
                return false;
            }
        };

        task.status = TaskStatus::Running;
        task.worker_id = Some(self.config.worker_id.clone());
        task.start_time = Some(chrono::Utc::now());
        if let Err(e) = self.tasks.save(&task).await {
            warn!(task_id = %task.id, error = %e, "store error marking task running, abandoning without ack");
            return false;
        }

        let outcome = match self.registry.resolve(&task.task_type) {
            Some(handler) => self.invoke_handler(handler, &task).await,
            None => Err(SchedulerError::HandlerNotFound(task.task_type.clone())),
        };

        match self.route_outcome(&mut task, outcome).await {
            Ok(()) => true,
            Err(e) => {
                warn!(task_id = %task.id, error = %e, "store error finalizing outcome, abandoning without ack");
                false
            }
        }
    }

    /// Execute the handler under the task's own timeout, converting panics
    /// and deadline overruns into their named error kinds (§4.4 step 6). No
    /// panic escapes this call.
    async fn invoke_handler(&self, handler: Arc<dyn TaskHandler>, task: &Task) -> Result<(), SchedulerError> {
        let started = std::time::Instant::now();
        let payload = task.payload.clone();
        let guarded = AssertUnwindSafe(async move { handler.handle(&payload).await }).catch_unwind();

        let result = match tokio::time::timeout(task.timeout, guarded).await {
            Ok(Ok(Ok(()))) => Ok(()),
            Ok(Ok(Err(handler_err))) => Err(SchedulerError::Handler(handler_err.to_string())),
            Ok(Err(panic)) => Err(SchedulerError::HandlerPanic(panic_message(&panic))),
            Err(_) => Err(SchedulerError::TaskTimeout(task.timeout)),
        };

        metrics::record_task_duration(&task.task_type, started.elapsed());
        result
    }

    /// Success: delete the hash, resubmit the next cron occurrence if any
    /// (§4.5). Failure: retry via the delayed set while `retry_count <=
    /// max_retry`, or transition to `dead` and push to the DLQ once that
    /// budget is exceeded (`max_retry + 1` total attempts).
    async fn route_outcome(&self, task: &mut Task, outcome: Result<(), SchedulerError>) -> SchedulerResult<()> {
        match outcome {
            Ok(()) => {
                self.tasks.delete(&task.id).await?;
                metrics::record_task_executed(&task.task_type, "success");

                if let Some(cron_expr) = task.cron.clone() {
                    match cron::next(&cron_expr, chrono::Utc::now()) {
                        Ok(next) => {
                            let next_task = task.next_cron_occurrence(next);
                            self.tasks.save(&next_task).await?;
                            self.queue.add_delayed(&next_task.id, next).await?;
                            info!(task_id = %task.id, next_id = %next_task.id, next_at = %next, "cron re-enqueued");
                        }
                        Err(e) => {
                            warn!(task_id = %task.id, cron = %cron_expr, error = %e, "cron resubmission failed");
                        }
                    }
                }
                Ok(())
            }
            Err(err) => {
                task.retry_count += 1;
                task.last_error = Some(err.to_string());
                metrics::record_task_executed(&task.task_type, "failed");

                if task.retry_count <= task.max_retry {
                    let delay = self.retry_strategy.next_delay(task.retry_count - 1);
                    task.status = TaskStatus::Pending;
                    task.schedule_at = chrono::Utc::now()
                        + chrono::Duration::from_std(delay).unwrap_or_else(|_| chrono::Duration::zero());
                    task.start_time = None;
                    task.finish_time = None;
                    self.tasks.save(task).await?;
                    self.queue.add_delayed(&task.id, task.schedule_at).await?;
                    metrics::record_task_retry(&task.task_type, task.retry_count);
                    debug!(task_id = %task.id, retry_count = task.retry_count, delay = ?delay, "task scheduled for retry");
                } else {
                    task.status = TaskStatus::Dead;
                    task.finish_time = Some(chrono::Utc::now());
                    self.tasks.delete(&task.id).await?;
                    self.dlq.add(&task.id).await?;
                    warn!(task_id = %task.id, retry_count = task.retry_count, "task moved to dead-letter queue");
                }
                Ok(())
            }
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked with a non-string payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lease_ttl_must_exceed_renew_interval() {
        let mut config = WorkerConfig::new("worker-1");
        config.lease_ttl = Duration::from_secs(10);
        config.renew_interval = Duration::from_secs(10);
        assert!(validate_lease(&config).is_err());

        config.lease_ttl = Duration::from_secs(30);
        config.renew_interval = Duration::from_secs(10);
        assert!(validate_lease(&config).is_ok());
    }

    #[test]
    fn test_panic_message_extracts_str_payload() {
        let result = std::panic::catch_unwind(|| -> () { panic!("boom") });
        let panic = result.unwrap_err();
        assert_eq!(panic_message(&*panic), "boom");
    }

    #[test]
    fn test_default_worker_config() {
        let config = WorkerConfig::new("worker-1");
        assert_eq!(config.concurrency, 5);
        assert!(config.lease_ttl > config.renew_interval);
    }
}
