//! Scheduler configuration: the closed set of recognized options (§6),
//! loadable from the environment the way every other `core_config`
//! consumer in the workspace is (`ServerConfig`, `RedisConfig`, ...).

use std::str::FromStr;
use std::time::Duration;

use core_config::{env_or_default, env_required, ConfigError, FromEnv};
use database::redis::RedisConfig;

/// Full configuration for one scheduler process. Every field corresponds
/// to a named key in the closed configuration set; there is no catch-all
/// "extra options" bag.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub namespace: String,
    pub redis: RedisConfig,

    pub worker_count: usize,
    pub worker_concurrency: usize,
    pub lease_ttl: Duration,
    pub renew_interval: Duration,
    pub shutdown_grace_period: Duration,

    pub scan_interval: Duration,
    pub batch_size: isize,
    pub lock_timeout: Duration,

    pub retry_base_delay: Duration,
    pub retry_max_delay: Duration,
    pub retry_multiplier: f64,
    pub retry_jitter: bool,

    pub dedup_enabled: bool,
    pub dedup_default_ttl: Duration,

    pub dlq_enabled: bool,
    pub dlq_max_size: Option<u64>,

    pub rate_limit_enabled: bool,
    pub rate_limit_rate: u32,
    pub rate_limit_burst: u32,

    pub circuit_breaker_enabled: bool,
    pub circuit_breaker_max_failures: u32,
    pub circuit_breaker_timeout: Duration,

    pub metrics_enabled: bool,
    pub metrics_port: u16,
    pub metrics_path: String,

    pub health_enabled: bool,
    pub health_port: u16,
    pub health_path: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            namespace: "scheduler".to_string(),
            redis: RedisConfig::default(),
            worker_count: 1,
            worker_concurrency: 5,
            lease_ttl: Duration::from_secs(30),
            renew_interval: Duration::from_secs(10),
            shutdown_grace_period: Duration::from_secs(30),
            scan_interval: Duration::from_secs(1),
            batch_size: 100,
            lock_timeout: Duration::from_secs(30),
            retry_base_delay: Duration::from_millis(100),
            retry_max_delay: Duration::from_secs(30),
            retry_multiplier: 2.0,
            retry_jitter: true,
            dedup_enabled: true,
            dedup_default_ttl: Duration::from_secs(3600),
            dlq_enabled: true,
            dlq_max_size: Some(10_000),
            rate_limit_enabled: false,
            rate_limit_rate: 100,
            rate_limit_burst: 100,
            circuit_breaker_enabled: false,
            circuit_breaker_max_failures: 5,
            circuit_breaker_timeout: Duration::from_secs(30),
            metrics_enabled: true,
            metrics_port: 9090,
            metrics_path: "/metrics".to_string(),
            health_enabled: true,
            health_port: 8080,
            health_path: "/health".to_string(),
        }
    }
}

fn env_parse<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw.parse().map_err(|e: T::Err| ConfigError::ParseError {
            key: key.to_string(),
            details: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}

fn env_secs(key: &str, default_secs: u64) -> Result<Duration, ConfigError> {
    env_parse(key, default_secs).map(Duration::from_secs)
}

fn env_millis(key: &str, default_millis: u64) -> Result<Duration, ConfigError> {
    env_parse(key, default_millis).map(Duration::from_millis)
}

fn env_bool(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(raw) => matches!(raw.to_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        Err(_) => default,
    }
}

impl FromEnv for SchedulerConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let redis = RedisConfig::from_env().or_else(|_| -> Result<RedisConfig, ConfigError> {
            // Fall back to the non-required default so a scheduler can be
            // constructed against a local Redis without exporting
            // REDIS_URL; the explicit var always wins when set.
            Ok(RedisConfig::new(env_or_default(
                "SCHEDULER_REDIS_URL",
                &defaults.redis.url,
            )))
        })?;

        let dlq_max_size = match std::env::var("SCHEDULER_DLQ_MAX_SIZE") {
            Ok(raw) if raw.is_empty() => None,
            Ok(raw) => Some(raw.parse::<u64>().map_err(|e| ConfigError::ParseError {
                key: "SCHEDULER_DLQ_MAX_SIZE".to_string(),
                details: e.to_string(),
            })?),
            Err(_) => defaults.dlq_max_size,
        };

        Ok(Self {
            namespace: env_or_default("SCHEDULER_NAMESPACE", &defaults.namespace),
            redis,
            worker_count: env_parse("SCHEDULER_WORKER_COUNT", defaults.worker_count)?,
            worker_concurrency: env_parse("SCHEDULER_WORKER_CONCURRENCY", defaults.worker_concurrency)?,
            lease_ttl: env_secs("SCHEDULER_LEASE_TTL_SECS", defaults.lease_ttl.as_secs())?,
            renew_interval: env_secs("SCHEDULER_RENEW_INTERVAL_SECS", defaults.renew_interval.as_secs())?,
            shutdown_grace_period: env_secs(
                "SCHEDULER_SHUTDOWN_GRACE_PERIOD_SECS",
                defaults.shutdown_grace_period.as_secs(),
            )?,
            scan_interval: env_millis("SCHEDULER_SCAN_INTERVAL_MS", defaults.scan_interval.as_millis() as u64)?,
            batch_size: env_parse("SCHEDULER_BATCH_SIZE", defaults.batch_size)?,
            lock_timeout: env_secs("SCHEDULER_LOCK_TIMEOUT_SECS", defaults.lock_timeout.as_secs())?,
            retry_base_delay: env_millis(
                "SCHEDULER_RETRY_BASE_DELAY_MS",
                defaults.retry_base_delay.as_millis() as u64,
            )?,
            retry_max_delay: env_secs("SCHEDULER_RETRY_MAX_DELAY_SECS", defaults.retry_max_delay.as_secs())?,
            retry_multiplier: env_parse("SCHEDULER_RETRY_MULTIPLIER", defaults.retry_multiplier)?,
            retry_jitter: env_bool("SCHEDULER_RETRY_JITTER", defaults.retry_jitter),
            dedup_enabled: env_bool("SCHEDULER_DEDUP_ENABLED", defaults.dedup_enabled),
            dedup_default_ttl: env_secs(
                "SCHEDULER_DEDUP_DEFAULT_TTL_SECS",
                defaults.dedup_default_ttl.as_secs(),
            )?,
            dlq_enabled: env_bool("SCHEDULER_DLQ_ENABLED", defaults.dlq_enabled),
            dlq_max_size,
            rate_limit_enabled: env_bool("SCHEDULER_RATE_LIMIT_ENABLED", defaults.rate_limit_enabled),
            rate_limit_rate: env_parse("SCHEDULER_RATE_LIMIT_RATE", defaults.rate_limit_rate)?,
            rate_limit_burst: env_parse("SCHEDULER_RATE_LIMIT_BURST", defaults.rate_limit_burst)?,
            circuit_breaker_enabled: env_bool(
                "SCHEDULER_CIRCUIT_BREAKER_ENABLED",
                defaults.circuit_breaker_enabled,
            ),
            circuit_breaker_max_failures: env_parse(
                "SCHEDULER_CIRCUIT_BREAKER_MAX_FAILURES",
                defaults.circuit_breaker_max_failures,
            )?,
            circuit_breaker_timeout: env_secs(
                "SCHEDULER_CIRCUIT_BREAKER_TIMEOUT_SECS",
                defaults.circuit_breaker_timeout.as_secs(),
            )?,
            metrics_enabled: env_bool("SCHEDULER_METRICS_ENABLED", defaults.metrics_enabled),
            metrics_port: env_parse("SCHEDULER_METRICS_PORT", defaults.metrics_port)?,
            metrics_path: env_or_default("SCHEDULER_METRICS_PATH", &defaults.metrics_path),
            health_enabled: env_bool("SCHEDULER_HEALTH_ENABLED", defaults.health_enabled),
            health_port: env_parse("SCHEDULER_HEALTH_PORT", defaults.health_port)?,
            health_path: env_or_default("SCHEDULER_HEALTH_PATH", &defaults.health_path),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_internally_consistent() {
        let config = SchedulerConfig::default();
        assert!(config.lease_ttl > config.renew_interval);
        assert_eq!(config.namespace, "scheduler");
    }

    #[test]
    fn test_from_env_overrides_namespace_and_concurrency() {
        temp_env::with_vars(
            [
                ("SCHEDULER_NAMESPACE", Some("tenant-a")),
                ("SCHEDULER_WORKER_CONCURRENCY", Some("12")),
                ("REDIS_URL", Some("redis://localhost:6379")),
                ("REDIS_HOST", None::<&str>),
            ],
            || {
                let config = SchedulerConfig::from_env().unwrap();
                assert_eq!(config.namespace, "tenant-a");
                assert_eq!(config.worker_concurrency, 12);
                assert_eq!(config.redis.url, "redis://localhost:6379");
            },
        );
    }

    #[test]
    fn test_from_env_falls_back_to_scheduler_redis_url_without_redis_url() {
        temp_env::with_vars(
            [
                ("REDIS_URL", None::<&str>),
                ("REDIS_HOST", None::<&str>),
                ("SCHEDULER_REDIS_URL", Some("redis://scheduler-redis:6380")),
            ],
            || {
                let config = SchedulerConfig::from_env().unwrap();
                assert_eq!(config.redis.url, "redis://scheduler-redis:6380");
            },
        );
    }

    #[test]
    fn test_from_env_rejects_invalid_numeric_value() {
        temp_env::with_vars(
            [
                ("REDIS_URL", Some("redis://localhost:6379")),
                ("SCHEDULER_WORKER_COUNT", Some("not-a-number")),
            ],
            || {
                assert!(SchedulerConfig::from_env().is_err());
            },
        );
    }

    #[test]
    fn test_dlq_max_size_empty_string_disables_cap() {
        temp_env::with_vars(
            [
                ("REDIS_URL", Some("redis://localhost:6379")),
                ("SCHEDULER_DLQ_MAX_SIZE", Some("")),
            ],
            || {
                let config = SchedulerConfig::from_env().unwrap();
                assert_eq!(config.dlq_max_size, None);
            },
        );
    }
}
