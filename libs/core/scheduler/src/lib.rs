//! Scheduler core — a durable, horizontally-scalable job execution engine
//! on top of a Redis-compatible store.
//!
//! Typed submissions land in a delayed sorted set or directly on one of
//! three priority streams; workers pull from those streams through a
//! shared consumer group, execute under a distributed per-task lock with a
//! timeout and panic guard, and route the outcome to a retry, a cron
//! re-submission, or a dead-letter queue.
//!
//! # Example
//!
//! ```rust,ignore
//! use scheduler::{Registry, Scheduler, SchedulerConfig, SubmitOptions, TaskPriority};
//! use std::sync::Arc;
//!
//! let registry = Arc::new(Registry::new());
//! registry.register_typed("send_email", |payload: EmailPayload| async move {
//!     send(payload).await
//! })?;
//!
//! let config = SchedulerConfig::from_env()?;
//! let scheduler = Arc::new(Scheduler::new(config, registry).await?);
//! scheduler.start().await?;
//!
//! scheduler
//!     .submit("send_email", payload_bytes, SubmitOptions::new().with_priority(TaskPriority::High))
//!     .await?;
//! ```

mod config;
mod cron;
mod dedup;
pub mod dlq;
mod error;
mod health;
mod lock;
pub mod metrics;
mod queue;
mod registry;
pub mod resilience;
mod retry;
mod scheduler;
mod task;
mod worker;

pub use config::SchedulerConfig;
pub use dedup::DedupStore;
pub use dlq::DeadLetterQueue;
pub use error::{SchedulerError, SchedulerResult};
pub use health::{health_handler, health_router, metrics_handler, ready_handler, HealthState};
pub use lock::DistLock;
pub use queue::{Queue, QueueDepth, ReadyItem};
pub use registry::{HandlerError, HandlerResult, Registry, TaskHandler};
pub use resilience::{
    CircuitBreaker, CircuitBreakerConfig, CircuitState, RateLimiter, ResilienceError, ResilienceLayer,
};
pub use retry::RetryStrategy;
pub use scheduler::{Scheduler, SubmitOptions};
pub use task::{QueueStats, Task, TaskInfo, TaskPriority, TaskStatus, TaskStore};
pub use worker::{Worker, WorkerConfig};
