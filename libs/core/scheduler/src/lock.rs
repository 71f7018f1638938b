//! Distributed mutual-exclusion lock guarding per-task execution.
//!
//! Scripted primitives over Redis, grounded on the `redis::Script` +
//! `include_str!` pattern used for atomic compare-and-swap operations in
//! the apalis-redis storage reference. This crate had no prior Lua-scripted
//! primitive of its own to generalize from.

use redis::aio::ConnectionManager;
use redis::Script;

use crate::error::SchedulerResult;

/// `<namespace>:lock:<task_id> -> worker_id`, TTL = lock timeout.
#[derive(Clone)]
pub struct DistLock {
    redis: ConnectionManager,
    namespace: String,
    acquire_script: Script,
    release_script: Script,
    extend_script: Script,
}

impl DistLock {
    pub fn new(redis: ConnectionManager, namespace: impl Into<String>) -> Self {
        Self {
            redis,
            namespace: namespace.into(),
            acquire_script: Script::new(include_str!("../lua/acquire.lua")),
            release_script: Script::new(include_str!("../lua/release.lua")),
            extend_script: Script::new(include_str!("../lua/extend.lua")),
        }
    }

    fn key(&self, task_id: &str) -> String {
        format!("{}:lock:{}", self.namespace, task_id)
    }

    /// `SET key value NX EX ttl`. Returns `true` on acquisition.
    pub async fn acquire(&self, task_id: &str, worker_id: &str, ttl_secs: u64) -> SchedulerResult<bool> {
        let mut conn = self.redis.clone();
        let acquired: i64 = self
            .acquire_script
            .key(self.key(task_id))
            .arg(worker_id)
            .arg(ttl_secs)
            .invoke_async(&mut conn)
            .await?;
        Ok(acquired == 1)
    }

    /// Compare-and-delete. Returns `true` if this worker held (and released)
    /// the lock.
    pub async fn release(&self, task_id: &str, worker_id: &str) -> SchedulerResult<bool> {
        let mut conn = self.redis.clone();
        let released: i64 = self
            .release_script
            .key(self.key(task_id))
            .arg(worker_id)
            .invoke_async(&mut conn)
            .await?;
        Ok(released == 1)
    }

    /// Compare-and-expire. Returns `true` if this worker held (and
    /// extended) the lock.
    pub async fn extend(&self, task_id: &str, worker_id: &str, ttl_secs: u64) -> SchedulerResult<bool> {
        let mut conn = self.redis.clone();
        let extended: i64 = self
            .extend_script
            .key(self.key(task_id))
            .arg(worker_id)
            .arg(ttl_secs)
            .invoke_async(&mut conn)
            .await?;
        Ok(extended == 1)
    }
}

#[cfg(test)]
mod tests {
    // Exercised end-to-end (through `Worker`/`Scheduler`) in
    // `tests/scheduler_integration.rs`; the scripts themselves are trivial
    // enough that unit-level coverage without a server would just restate
    // the Lua.
}
