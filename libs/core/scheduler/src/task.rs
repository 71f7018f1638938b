//! Task data model and hash wire codec.
//!
//! A `Task` is the mutable execution record persisted as a Redis hash at
//! `<namespace>:task:<id>`. All hash fields are strings on the wire (see
//! [`Task::to_hash_fields`] / [`Task::from_hash_fields`]); this module owns
//! the marshal/unmarshal boundary so the rest of the crate only ever deals
//! in the typed struct.

use std::collections::HashMap;
use std::time::Duration;

use base64::Engine;
use chrono::{DateTime, Utc};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{SchedulerError, SchedulerResult};

/// Task priority. The underlying value doubles as the ordering weight used
/// by callers that want to sort tasks; the scheduler itself dispatches
/// purely by which of the three priority streams a task landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TaskPriority {
    Low = 1,
    Normal = 5,
    High = 10,
}

impl TaskPriority {
    /// The stream suffix this priority is routed to (`:stream:<suffix>`).
    pub fn stream_suffix(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Normal => "normal",
            Self::High => "high",
        }
    }

    /// All priorities in strict dispatch preference, high to low.
    pub fn all_in_preference_order() -> [TaskPriority; 3] {
        [Self::High, Self::Normal, Self::Low]
    }
}

impl std::fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.stream_suffix())
    }
}

impl std::str::FromStr for TaskPriority {
    type Err = SchedulerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Self::Low),
            "normal" => Ok(Self::Normal),
            "high" => Ok(Self::High),
            other => Err(SchedulerError::Submission(format!(
                "invalid priority '{other}'"
            ))),
        }
    }
}

/// Lifecycle state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    Pending,
    Ready,
    Running,
    Success,
    Failed,
    Cancelled,
    Dead,
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Ready => "ready",
            Self::Running => "running",
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
            Self::Dead => "dead",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = SchedulerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "ready" => Ok(Self::Ready),
            "running" => Ok(Self::Running),
            "success" => Ok(Self::Success),
            "failed" => Ok(Self::Failed),
            "cancelled" => Ok(Self::Cancelled),
            "dead" => Ok(Self::Dead),
            other => Err(SchedulerError::Internal(format!(
                "unknown task status '{other}'"
            ))),
        }
    }
}

/// The full mutable execution record for one task attempt chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub task_type: String,
    pub priority: TaskPriority,
    pub payload: Vec<u8>,
    pub schedule_at: DateTime<Utc>,
    pub cron: Option<String>,
    pub max_retry: u32,
    pub timeout: Duration,
    pub dedup_key: Option<String>,
    pub dedup_ttl: Option<Duration>,
    pub tags: HashMap<String, String>,
    pub context: HashMap<String, serde_json::Value>,
    pub status: TaskStatus,
    pub retry_count: u32,
    pub worker_id: Option<String>,
    pub submit_time: DateTime<Utc>,
    pub start_time: Option<DateTime<Utc>>,
    pub finish_time: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub execution_time: Option<Duration>,
}

impl Task {
    /// Mint a fresh task record at submission time, defaulting the fields
    /// §3 declares defaulted (`max_retry=3`, `timeout=5m`, `status=pending`).
    pub fn new(task_type: impl Into<String>, payload: Vec<u8>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7().to_string(),
            task_type: task_type.into(),
            priority: TaskPriority::Normal,
            payload,
            schedule_at: now,
            cron: None,
            max_retry: 3,
            timeout: Duration::from_secs(300),
            dedup_key: None,
            dedup_ttl: None,
            tags: HashMap::new(),
            context: HashMap::new(),
            status: TaskStatus::Pending,
            retry_count: 0,
            worker_id: None,
            submit_time: now,
            start_time: None,
            finish_time: None,
            last_error: None,
            execution_time: None,
        }
    }

    /// Build the re-submission for a cron occurrence: new id, same
    /// type/priority/payload/options, scheduled at `next`.
    pub fn next_cron_occurrence(&self, next: DateTime<Utc>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7().to_string(),
            task_type: self.task_type.clone(),
            priority: self.priority,
            payload: self.payload.clone(),
            schedule_at: next,
            cron: self.cron.clone(),
            max_retry: self.max_retry,
            timeout: self.timeout,
            dedup_key: self.dedup_key.clone(),
            dedup_ttl: self.dedup_ttl,
            tags: self.tags.clone(),
            context: self.context.clone(),
            status: TaskStatus::Pending,
            retry_count: 0,
            worker_id: None,
            submit_time: now,
            start_time: None,
            finish_time: None,
            last_error: None,
            execution_time: None,
        }
    }

    /// Marshal into the Redis hash field map (§6 "Task hash wire format").
    /// All values are strings; the payload is base64-encoded since it is
    /// the one field that is not already text.
    pub fn to_hash_fields(&self) -> SchedulerResult<Vec<(String, String)>> {
        let mut fields = vec![
            ("id".to_string(), self.id.clone()),
            ("type".to_string(), self.task_type.clone()),
            ("priority".to_string(), self.priority.stream_suffix().to_string()),
            (
                "payload".to_string(),
                base64::engine::general_purpose::STANDARD.encode(&self.payload),
            ),
            (
                "schedule_at".to_string(),
                self.schedule_at.timestamp().to_string(),
            ),
            ("max_retry".to_string(), self.max_retry.to_string()),
            (
                "timeout".to_string(),
                self.timeout.as_secs_f64().to_string(),
            ),
            ("tags".to_string(), serde_json::to_string(&self.tags)?),
            (
                "context".to_string(),
                serde_json::to_string(&self.context)?,
            ),
            ("status".to_string(), self.status.to_string()),
            ("retry_count".to_string(), self.retry_count.to_string()),
            (
                "submit_time".to_string(),
                self.submit_time.timestamp().to_string(),
            ),
        ];

        if let Some(cron) = &self.cron {
            fields.push(("cron".to_string(), cron.clone()));
        }
        if let Some(dedup_key) = &self.dedup_key {
            fields.push(("dedup_key".to_string(), dedup_key.clone()));
        }
        if let Some(dedup_ttl) = &self.dedup_ttl {
            fields.push(("dedup_ttl".to_string(), dedup_ttl.as_secs_f64().to_string()));
        }
        if let Some(worker_id) = &self.worker_id {
            fields.push(("worker_id".to_string(), worker_id.clone()));
        }
        if let Some(start_time) = &self.start_time {
            fields.push(("start_time".to_string(), start_time.timestamp().to_string()));
        }
        if let Some(finish_time) = &self.finish_time {
            fields.push((
                "finish_time".to_string(),
                finish_time.timestamp().to_string(),
            ));
        }
        if let Some(last_error) = &self.last_error {
            fields.push(("last_error".to_string(), last_error.clone()));
        }
        if let Some(execution_time) = &self.execution_time {
            fields.push((
                "execution_time".to_string(),
                execution_time.as_secs_f64().to_string(),
            ));
        }

        Ok(fields)
    }

    /// Unmarshal from a Redis hash field map (as returned by `HGETALL`).
    pub fn from_hash_fields(fields: &HashMap<String, String>) -> SchedulerResult<Self> {
        let get = |key: &str| -> SchedulerResult<String> {
            fields
                .get(key)
                .cloned()
                .ok_or_else(|| SchedulerError::Internal(format!("task hash missing field '{key}'")))
        };

        let id = get("id")?;
        let task_type = get("type")?;
        let priority: TaskPriority = get("priority")?.parse()?;
        let payload = base64::engine::general_purpose::STANDARD
            .decode(get("payload")?)
            .map_err(|e| SchedulerError::Internal(format!("invalid base64 payload: {e}")))?;
        let schedule_at = parse_epoch_secs(&get("schedule_at")?)?;
        let cron = fields.get("cron").cloned();
        let max_retry: u32 = get("max_retry")?
            .parse()
            .map_err(|e| SchedulerError::Internal(format!("invalid max_retry: {e}")))?;
        let timeout = parse_duration_secs(&get("timeout")?)?;
        let dedup_key = fields.get("dedup_key").cloned();
        let dedup_ttl = fields
            .get("dedup_ttl")
            .map(|s| parse_duration_secs(s))
            .transpose()?;
        let tags: HashMap<String, String> = serde_json::from_str(&get("tags")?)?;
        let context: HashMap<String, serde_json::Value> = serde_json::from_str(&get("context")?)?;
        let status: TaskStatus = get("status")?.parse()?;
        let retry_count: u32 = get("retry_count")?
            .parse()
            .map_err(|e| SchedulerError::Internal(format!("invalid retry_count: {e}")))?;
        let worker_id = fields.get("worker_id").cloned();
        let submit_time = parse_epoch_secs(&get("submit_time")?)?;
        let start_time = fields
            .get("start_time")
            .map(|s| parse_epoch_secs(s))
            .transpose()?;
        let finish_time = fields
            .get("finish_time")
            .map(|s| parse_epoch_secs(s))
            .transpose()?;
        let last_error = fields.get("last_error").cloned();
        let execution_time = fields
            .get("execution_time")
            .map(|s| parse_duration_secs(s))
            .transpose()?;

        Ok(Self {
            id,
            task_type,
            priority,
            payload,
            schedule_at,
            cron,
            max_retry,
            timeout,
            dedup_key,
            dedup_ttl,
            tags,
            context,
            status,
            retry_count,
            worker_id,
            submit_time,
            start_time,
            finish_time,
            last_error,
            execution_time,
        })
    }
}

fn parse_epoch_secs(s: &str) -> SchedulerResult<DateTime<Utc>> {
    let secs: i64 = s
        .parse()
        .map_err(|e| SchedulerError::Internal(format!("invalid epoch seconds '{s}': {e}")))?;
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| SchedulerError::Internal(format!("out-of-range epoch seconds '{s}'")))
}

fn parse_duration_secs(s: &str) -> SchedulerResult<Duration> {
    let secs: f64 = s
        .parse()
        .map_err(|e| SchedulerError::Internal(format!("invalid duration seconds '{s}': {e}")))?;
    Ok(Duration::from_secs_f64(secs.max(0.0)))
}

/// Read-only projection of a [`Task`] returned by `GetTaskInfo`, kept
/// separate from the mutable record the same way `domain_tasks::models`
/// separates its persisted entity from its response type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskInfo {
    pub id: String,
    pub task_type: String,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    pub retry_count: u32,
    pub max_retry: u32,
    pub worker_id: Option<String>,
    pub submit_time: DateTime<Utc>,
    pub start_time: Option<DateTime<Utc>>,
    pub finish_time: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl From<&Task> for TaskInfo {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id.clone(),
            task_type: task.task_type.clone(),
            priority: task.priority,
            status: task.status,
            retry_count: task.retry_count,
            max_retry: task.max_retry,
            worker_id: task.worker_id.clone(),
            submit_time: task.submit_time,
            start_time: task.start_time,
            finish_time: task.finish_time,
            last_error: task.last_error.clone(),
        }
    }
}

/// Reads and writes the task hash, `<namespace>:task:<id>`. The task hash
/// is the single source of truth per task (§5): this is the only place
/// that issues `HGETALL`/`HSET`/`DEL` against it.
#[derive(Clone)]
pub struct TaskStore {
    redis: ConnectionManager,
    namespace: String,
}

impl TaskStore {
    pub fn new(redis: ConnectionManager, namespace: impl Into<String>) -> Self {
        Self {
            redis,
            namespace: namespace.into(),
        }
    }

    pub fn key(&self, task_id: &str) -> String {
        format!("{}:task:{}", self.namespace, task_id)
    }

    pub async fn save(&self, task: &Task) -> SchedulerResult<()> {
        let mut conn = self.redis.clone();
        let fields = task.to_hash_fields()?;
        conn.hset_multiple::<_, _, _, ()>(self.key(&task.id), &fields).await?;
        Ok(())
    }

    pub async fn get(&self, task_id: &str) -> SchedulerResult<Option<Task>> {
        let mut conn = self.redis.clone();
        let fields: HashMap<String, String> = conn.hgetall(self.key(task_id)).await?;
        if fields.is_empty() {
            return Ok(None);
        }
        Ok(Some(Task::from_hash_fields(&fields)?))
    }

    pub async fn delete(&self, task_id: &str) -> SchedulerResult<()> {
        let mut conn = self.redis.clone();
        conn.del::<_, ()>(self.key(task_id)).await?;
        Ok(())
    }
}

/// Aggregate queue depth snapshot returned by `GetQueueStats`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct QueueStats {
    pub delayed_count: u64,
    pub high_count: u64,
    pub normal_count: u64,
    pub low_count: u64,
    pub running_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_roundtrip_minimal() {
        let task = Task::new("echo", b"hello".to_vec());
        let fields: HashMap<String, String> = task.to_hash_fields().unwrap().into_iter().collect();
        let restored = Task::from_hash_fields(&fields).unwrap();

        assert_eq!(restored.id, task.id);
        assert_eq!(restored.task_type, "echo");
        assert_eq!(restored.payload, b"hello".to_vec());
        assert_eq!(restored.priority, TaskPriority::Normal);
        assert_eq!(restored.status, TaskStatus::Pending);
        assert_eq!(restored.max_retry, 3);
    }

    #[test]
    fn test_hash_roundtrip_full() {
        let mut task = Task::new("send_email", vec![1, 2, 3, 255]);
        task.priority = TaskPriority::High;
        task.cron = Some("*/5 * * * *".to_string());
        task.dedup_key = Some("order:42:pay".to_string());
        task.dedup_ttl = Some(Duration::from_secs(3600));
        task.tags.insert("team".to_string(), "payments".to_string());
        task.status = TaskStatus::Running;
        task.retry_count = 1;
        task.worker_id = Some("worker-1".to_string());
        task.start_time = Some(Utc::now());
        task.last_error = Some("boom".to_string());
        task.execution_time = Some(Duration::from_millis(1500));

        let fields: HashMap<String, String> = task.to_hash_fields().unwrap().into_iter().collect();
        let restored = Task::from_hash_fields(&fields).unwrap();

        assert_eq!(restored.priority, TaskPriority::High);
        assert_eq!(restored.cron.as_deref(), Some("*/5 * * * *"));
        assert_eq!(restored.dedup_key.as_deref(), Some("order:42:pay"));
        assert_eq!(restored.dedup_ttl, Some(Duration::from_secs(3600)));
        assert_eq!(restored.tags.get("team").map(String::as_str), Some("payments"));
        assert_eq!(restored.status, TaskStatus::Running);
        assert_eq!(restored.retry_count, 1);
        assert_eq!(restored.worker_id.as_deref(), Some("worker-1"));
        assert!(restored.start_time.is_some());
        assert_eq!(restored.last_error.as_deref(), Some("boom"));
        assert_eq!(restored.execution_time, Some(Duration::from_millis(1500)));
    }

    #[test]
    fn test_priority_parse_and_display() {
        assert_eq!("high".parse::<TaskPriority>().unwrap(), TaskPriority::High);
        assert_eq!(TaskPriority::Low.to_string(), "low");
        assert!("bogus".parse::<TaskPriority>().is_err());
    }

    #[test]
    fn test_priority_preference_order() {
        let order = TaskPriority::all_in_preference_order();
        assert_eq!(order, [TaskPriority::High, TaskPriority::Normal, TaskPriority::Low]);
    }

    #[test]
    fn test_next_cron_occurrence_mints_new_id() {
        let task = Task::new("echo", b"x".to_vec());
        let next = task.next_cron_occurrence(Utc::now() + chrono::Duration::minutes(5));
        assert_ne!(next.id, task.id);
        assert_eq!(next.task_type, task.task_type);
        assert_eq!(next.status, TaskStatus::Pending);
        assert_eq!(next.retry_count, 0);
    }
}
