//! Tasks Worker Service
//!
//! Runs a [`scheduler::Scheduler`] against the shared Redis store: submits
//! and executes typed tasks through registered handlers, with a health and
//! metrics server alongside it.

use core_config::{Environment, FromEnv};
use eyre::{Result, WrapErr};
use scheduler::{HandlerResult, HealthState, Registry, Scheduler, SchedulerConfig};
use serde::Deserialize;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};

const APP_NAME: &str = env!("CARGO_PKG_NAME");
const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Deserialize)]
struct LogMessagePayload {
    message: String,
}

/// Register the task types this process knows how to run. Kept separate
/// from `run` so tests can build a `Registry` with a different handler set.
fn build_registry() -> Arc<Registry> {
    let registry = Registry::new();
    registry
        .register_typed("log_message", |payload: LogMessagePayload| async move -> HandlerResult {
            info!(message = %payload.message, "log_message task executed");
            Ok(())
        })
        .expect("log_message is the first registration for its task type");
    Arc::new(registry)
}

async fn start_health_server(health_state: HealthState, port: u16) -> Result<()> {
    let app = scheduler::health_router(health_state);
    let addr = format!("0.0.0.0:{port}");
    let listener = TcpListener::bind(&addr)
        .await
        .wrap_err_with(|| format!("failed to bind health server to {addr}"))?;

    info!(port = %port, "health server listening");
    axum::serve(listener, app).await.wrap_err("health server failed")?;
    Ok(())
}

/// Run the tasks worker: load config, connect to Redis, start the
/// scheduler's workers and scan loop, and serve `/health`/`/ready`/`/metrics`
/// until a shutdown signal arrives.
pub async fn run() -> Result<()> {
    let environment = Environment::from_env();
    core_config::tracing::init_tracing(&environment);
    scheduler::metrics::init_metrics();

    info!(name = APP_NAME, version = APP_VERSION, "starting tasks worker service");
    info!(environment = ?environment, "environment resolved");

    let health_port: u16 = std::env::var("TASKS_WORKER_HEALTH_PORT")
        .or_else(|_| std::env::var("HEALTH_PORT"))
        .unwrap_or_else(|_| "8082".to_string())
        .parse()
        .unwrap_or(8082);

    let config = SchedulerConfig::from_env().wrap_err("failed to load scheduler configuration")?;
    let registry = build_registry();

    info!("connecting to redis...");
    let scheduler = Arc::new(
        Scheduler::new(config, registry)
            .await
            .map_err(|e| eyre::eyre!("{e}"))
            .wrap_err("failed to construct scheduler")?,
    );
    info!("connected to redis");

    let health_state = HealthState::new(
        scheduler.redis(),
        "scheduler",
        APP_NAME,
        APP_VERSION,
        scheduler_queue(&scheduler),
        scheduler_dlq(&scheduler),
    );

    tokio::spawn(async move {
        if let Err(e) = start_health_server(health_state, health_port).await {
            error!(error = %e, "health server failed");
        }
    });

    Arc::clone(&scheduler)
        .start()
        .await
        .map_err(|e| eyre::eyre!("{e}"))
        .wrap_err("failed to start scheduler")?;
    info!("scheduler started");

    shutdown_signal().await?;
    info!("shutdown signal received, stopping scheduler");
    scheduler
        .shutdown()
        .await
        .map_err(|e| eyre::eyre!("{e}"))
        .wrap_err("scheduler shutdown failed")?;

    info!("tasks worker service stopped");
    Ok(())
}

/// `HealthState` needs its own `Queue`/`DeadLetterQueue` handles rather than
/// borrowing the scheduler's; these two accessors build fresh ones against
/// the same connection and namespace so the health server stays decoupled
/// from the scheduler's internals.
fn scheduler_queue(scheduler: &Scheduler) -> scheduler::Queue {
    scheduler::Queue::new(scheduler.redis(), scheduler.namespace().to_string())
}

fn scheduler_dlq(scheduler: &Scheduler) -> scheduler::DeadLetterQueue {
    scheduler::DeadLetterQueue::new(scheduler.redis(), scheduler.namespace().to_string(), true, None)
}

async fn shutdown_signal() -> Result<()> {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl+C, initiating shutdown..."),
        _ = terminate => info!("received SIGTERM, initiating shutdown..."),
    }

    Ok(())
}
