//! The scheduler: the process-level handle most callers interact with.
//!
//! Owns the Redis connection, the queue/task/dedup/DLQ stores, the handler
//! registry, an optional admission-control layer, and the pool of workers
//! it starts. The scan loop (promote delayed ids, reclaim stale pending
//! entries) is grounded on `consumer.rs`'s own periodic-maintenance shape,
//! generalized from one stream to the three priority streams.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use redis::aio::ConnectionManager;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::config::SchedulerConfig;
use crate::dedup::DedupStore;
use crate::dlq::DeadLetterQueue;
use crate::error::{SchedulerError, SchedulerResult};
use crate::metrics;
use crate::queue::Queue;
use crate::registry::{Registry, TaskHandler};
use crate::resilience::ResilienceLayer;
use crate::retry::RetryStrategy;
use crate::task::{QueueStats, Task, TaskInfo, TaskPriority, TaskStatus, TaskStore};
use crate::worker::{Worker, WorkerConfig};

/// Options accepted by [`Scheduler::submit`], mirroring the closed set of
/// submission options (priority, scheduling, retry/timeout overrides,
/// deduplication, tagging, and context) rather than exposing `Task`'s full
/// mutable surface to callers.
#[derive(Debug, Clone, Default)]
pub struct SubmitOptions {
    id: Option<String>,
    priority: Option<TaskPriority>,
    schedule_at: Option<DateTime<Utc>>,
    delay: Option<Duration>,
    cron: Option<String>,
    timeout: Option<Duration>,
    max_retry: Option<u32>,
    dedup_key: Option<String>,
    dedup_ttl: Option<Duration>,
    tags: HashMap<String, String>,
    context: HashMap<String, serde_json::Value>,
}

impl SubmitOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_priority(mut self, priority: TaskPriority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_schedule_at(mut self, at: DateTime<Utc>) -> Self {
        self.schedule_at = Some(at);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_cron(mut self, expr: impl Into<String>) -> Self {
        self.cron = Some(expr.into());
        self
    }

    pub fn with_task_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_task_max_retry(mut self, max_retry: u32) -> Self {
        self.max_retry = Some(max_retry);
        self
    }

    pub fn with_task_deduplication(mut self, key: impl Into<String>, ttl: Duration) -> Self {
        self.dedup_key = Some(key.into());
        self.dedup_ttl = Some(ttl);
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn with_tags(mut self, tags: HashMap<String, String>) -> Self {
        self.tags.extend(tags);
        self
    }

    pub fn with_context_value(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.context.insert(key.into(), value);
        self
    }

    pub fn with_context(mut self, context: HashMap<String, serde_json::Value>) -> Self {
        self.context.extend(context);
        self
    }
}

pub struct Scheduler {
    redis: ConnectionManager,
    namespace: String,
    queue: Queue,
    tasks: TaskStore,
    dedup: DedupStore,
    dlq: DeadLetterQueue,
    registry: Arc<Registry>,
    resilience: Option<Arc<ResilienceLayer>>,
    retry_strategy: RetryStrategy,
    config: SchedulerConfig,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    workers: Mutex<Vec<Arc<Worker>>>,
    background: Mutex<JoinSet<()>>,
}

impl Scheduler {
    /// Connect to Redis (with the workspace's standard retrying connector)
    /// and assemble every collaborator. Does not start the scan loop or any
    /// workers; call [`Scheduler::start`] for that.
    pub async fn new(config: SchedulerConfig, registry: Arc<Registry>) -> SchedulerResult<Self> {
        let redis = database::redis::connect_from_config_with_retry(config.redis.clone(), None)
            .await
            .map_err(SchedulerError::Store)?;

        let namespace = config.namespace.clone();
        let queue = Queue::new(redis.clone(), namespace.clone());
        queue.ensure_all_consumer_groups().await?;

        let resilience = if config.rate_limit_enabled || config.circuit_breaker_enabled {
            let breaker_config = crate::resilience::CircuitBreakerConfig::new()
                .with_failure_threshold(config.circuit_breaker_max_failures)
                .with_timeout_secs(config.circuit_breaker_timeout.as_secs());
            let layer = if config.rate_limit_enabled {
                ResilienceLayer::with_rate_limit(breaker_config, config.rate_limit_rate)
            } else {
                ResilienceLayer::new(breaker_config)
            };
            Some(Arc::new(layer))
        } else {
            None
        };

        let retry_strategy = RetryStrategy::Exponential {
            base_delay: config.retry_base_delay,
            multiplier: config.retry_multiplier,
            max_delay: config.retry_max_delay,
            jitter: config.retry_jitter,
        };

        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Ok(Self {
            tasks: TaskStore::new(redis.clone(), namespace.clone()),
            dedup: DedupStore::new(redis.clone(), namespace.clone()),
            dlq: DeadLetterQueue::new(redis.clone(), namespace.clone(), config.dlq_enabled, config.dlq_max_size),
            redis,
            namespace,
            queue,
            registry,
            resilience,
            retry_strategy,
            config,
            shutdown_tx,
            shutdown_rx,
            workers: Mutex::new(Vec::new()),
            background: Mutex::new(JoinSet::new()),
        })
    }

    /// Submit one task for execution, applying admission control (rate
    /// limit / circuit breaker, if configured) and deduplication before
    /// persisting the task hash and enqueueing it.
    pub async fn submit(&self, task_type: impl Into<String>, payload: Vec<u8>, opts: SubmitOptions) -> SchedulerResult<String> {
        if let Some(resilience) = &self.resilience {
            resilience.check().map_err(|e| SchedulerError::Admission(e.to_string()))?;
        }

        if let Some(cron_expr) = &opts.cron {
            crate::cron::validate(cron_expr).map_err(|_| {
                SchedulerError::Submission(format!("invalid cron expression '{cron_expr}'"))
            })?;
        }

        let mut task = Task::new(task_type, payload);
        if let Some(id) = opts.id {
            task.id = id;
        }
        if let Some(priority) = opts.priority {
            task.priority = priority;
        }
        if let Some(timeout) = opts.timeout {
            task.timeout = timeout;
        }
        if let Some(max_retry) = opts.max_retry {
            task.max_retry = max_retry;
        }
        task.cron = opts.cron;
        task.tags = opts.tags;
        task.context = opts.context;

        if let Some(dedup_key) = &opts.dedup_key {
            let ttl = opts.dedup_ttl.unwrap_or(self.config.dedup_default_ttl);
            if self.config.dedup_enabled {
                if let Some(existing) = self.dedup.check(dedup_key).await? {
                    return Err(SchedulerError::Duplicate(existing));
                }
                self.dedup.set_nx(dedup_key, &task.id, ttl).await?;
            }
            task.dedup_key = Some(dedup_key.clone());
            task.dedup_ttl = Some(ttl);
        }

        task.schedule_at = match (opts.schedule_at, opts.delay) {
            (Some(at), _) => at,
            (None, Some(delay)) => Utc::now() + chrono::Duration::from_std(delay).unwrap_or_else(|_| chrono::Duration::zero()),
            (None, None) => Utc::now(),
        };

        self.tasks.save(&task).await?;

        if task.schedule_at <= Utc::now() {
            self.queue.add_ready(&task.id, task.priority).await?;
        } else {
            self.queue.add_delayed(&task.id, task.schedule_at).await?;
        }

        metrics::record_task_submitted(&task.task_type, &task.priority.to_string());
        info!(task_id = %task.id, task_type = %task.task_type, priority = %task.priority, "task submitted");
        Ok(task.id)
    }

    /// Submit many tasks, applying the same options to each. Returns the
    /// ids in submission order; a single task's rejection does not abort
    /// the rest of the batch.
    pub async fn batch_submit(
        &self,
        task_type: impl Into<String> + Clone,
        payloads: Vec<Vec<u8>>,
        opts: SubmitOptions,
    ) -> Vec<SchedulerResult<String>> {
        let mut ids = Vec::with_capacity(payloads.len());
        for payload in payloads {
            ids.push(self.submit(task_type.clone(), payload, opts.clone()).await);
        }
        ids
    }

    pub async fn get_task_info(&self, task_id: &str) -> SchedulerResult<Option<TaskInfo>> {
        Ok(self.tasks.get(task_id).await?.as_ref().map(TaskInfo::from))
    }

    pub async fn get_queue_stats(&self) -> SchedulerResult<QueueStats> {
        let depth = self.queue.stats().await?;
        Ok(QueueStats {
            delayed_count: depth.delayed,
            high_count: depth.high,
            normal_count: depth.normal,
            low_count: depth.low,
            running_count: depth.pending,
        })
    }

    /// Cancel a pending or delayed task: the stream/delayed entry is
    /// removed and the task hash deleted (cancelled tasks are not kept
    /// around; see the outcome for the other terminal states).
    pub async fn cancel_task(&self, task_id: &str) -> SchedulerResult<bool> {
        let Some(task) = self.tasks.get(task_id).await? else {
            return Ok(false);
        };
        if task.status == TaskStatus::Running {
            return Err(SchedulerError::Lifecycle(format!(
                "task '{task_id}' is already running and cannot be cancelled"
            )));
        }

        self.queue.remove_delayed(task_id).await?;
        self.queue.remove_ready(task.priority, task_id).await?;
        self.tasks.delete(task_id).await?;
        if let Some(dedup_key) = &task.dedup_key {
            self.dedup.delete(dedup_key).await?;
        }
        info!(task_id = %task_id, "task cancelled");
        Ok(true)
    }

    /// Start the scan loop and `worker_count` workers. Returns once every
    /// worker has registered; the scan loop and workers keep running in the
    /// background until [`Scheduler::shutdown`] is called.
    pub async fn start(self: Arc<Self>) -> SchedulerResult<()> {
        let mut workers = self.workers.lock().await;
        let mut background = self.background.lock().await;

        for i in 0..self.config.worker_count.max(1) {
            let worker_config = WorkerConfig {
                worker_id: format!("{}-{}-{}", self.namespace, std::process::id(), i),
                concurrency: self.config.worker_concurrency,
                lease_ttl: self.config.lease_ttl,
                renew_interval: self.config.renew_interval,
                lock_timeout: self.config.lock_timeout,
                block_timeout: Duration::from_secs(1),
                shutdown_grace_period: self.config.shutdown_grace_period,
            };
            let worker = Arc::new(Worker::new(
                self.redis.clone(),
                self.namespace.clone(),
                self.queue.clone(),
                Arc::clone(&self.registry),
                self.retry_strategy.clone(),
                self.dlq.clone(),
                worker_config,
            )?);

            let handle = Arc::clone(&worker);
            let shutdown_rx = self.shutdown_rx.clone();
            background.spawn(async move {
                if let Err(e) = handle.run(shutdown_rx).await {
                    warn!(error = %e, "worker exited with error");
                }
            });
            workers.push(worker);
        }

        let scan_self = Arc::clone(&self);
        let mut scan_shutdown = self.shutdown_rx.clone();
        background.spawn(async move {
            scan_self.scan_loop(&mut scan_shutdown).await;
        });

        info!(worker_count = workers.len(), "scheduler started");
        Ok(())
    }

    /// The scan loop (§4.2): promote due delayed ids, reclaim pending
    /// entries idle longer than the lease TTL (one reclaim per priority,
    /// run concurrently, bounded by a total 10s timeout so one slow
    /// priority cannot starve the others), and refresh queue-depth metrics.
    async fn scan_loop(&self, shutdown: &mut watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.config.scan_interval);
        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                _ = ticker.tick() => {
                    if let Err(e) = self.scan_once().await {
                        warn!(error = %e, "scan cycle failed");
                        if let Some(resilience) = &self.resilience {
                            resilience.record_failure();
                        }
                    } else if let Some(resilience) = &self.resilience {
                        resilience.record_success();
                    }
                }
            }
        }
        debug!("scan loop stopped");
    }

    async fn scan_once(&self) -> SchedulerResult<()> {
        let promoted = self.queue.move_delayed_to_ready(Utc::now(), self.config.batch_size).await?;
        if promoted > 0 {
            debug!(promoted, "promoted delayed tasks to ready");
        }

        let idle = self.config.lease_ttl;
        let reclaim = tokio::time::timeout(Duration::from_secs(10), async {
            let mut set = JoinSet::new();
            for priority in TaskPriority::all_in_preference_order() {
                let queue = self.queue.clone();
                set.spawn(async move { (priority, queue.claim_stale_messages(priority, idle).await) });
            }
            while let Some(result) = set.join_next().await {
                if let Ok((priority, Ok(ids))) = result {
                    if !ids.is_empty() {
                        info!(priority = %priority, count = ids.len(), "reclaimed stale entries");
                    }
                } else if let Ok((priority, Err(e))) = result {
                    warn!(priority = %priority, error = %e, "reclaim failed for priority");
                }
            }
        })
        .await;
        if reclaim.is_err() {
            warn!("reclaim pass exceeded its 10s budget, continuing to next scan cycle");
        }

        let stats = self.queue.stats().await?;
        metrics::set_queue_size("delayed", stats.delayed);
        metrics::set_queue_size("high", stats.high);
        metrics::set_queue_size("normal", stats.normal);
        metrics::set_queue_size("low", stats.low);
        metrics::set_worker_count(self.workers.lock().await.len());
        if let Ok(dlq_count) = self.dlq.count().await {
            metrics::set_dead_letter_queue_size(dlq_count);
        }

        Ok(())
    }

    /// Signal every worker and the scan loop to stop, then wait for them to
    /// finish (bounded by each worker's own shutdown grace period).
    pub async fn shutdown(&self) -> SchedulerResult<()> {
        info!("scheduler shutdown requested");
        let _ = self.shutdown_tx.send(true);

        let mut background = self.background.lock().await;
        while background.join_next().await.is_some() {}

        self.workers.lock().await.clear();
        info!("scheduler shutdown complete");
        Ok(())
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn register_handler(&self, task_type: impl Into<String>, handler: Arc<dyn TaskHandler>) -> Result<(), String> {
        self.registry.register(task_type, handler)
    }

    pub fn redis(&self) -> ConnectionManager {
        self.redis.clone()
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submit_options_builder_collects_tags_and_context() {
        let opts = SubmitOptions::new()
            .with_priority(TaskPriority::High)
            .with_tag("env", "prod")
            .with_context_value("trace_id", serde_json::json!("abc"));
        assert_eq!(opts.priority, Some(TaskPriority::High));
        assert_eq!(opts.tags.get("env"), Some(&"prod".to_string()));
        assert_eq!(opts.context.get("trace_id"), Some(&serde_json::json!("abc")));
    }

    #[test]
    fn test_submit_options_dedup_sets_both_key_and_ttl() {
        let opts = SubmitOptions::new().with_task_deduplication("order-42", Duration::from_secs(60));
        assert_eq!(opts.dedup_key.as_deref(), Some("order-42"));
        assert_eq!(opts.dedup_ttl, Some(Duration::from_secs(60)));
    }
}
