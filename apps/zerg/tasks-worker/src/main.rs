//! Tasks Worker Service - Entry Point
//!
//! Runs the scheduler core: submits, dispatches, and executes registered
//! task handlers against Redis.

#[tokio::main]
async fn main() -> eyre::Result<()> {
    zerg_tasks_worker::run().await
}
