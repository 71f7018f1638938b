//! Cron expression parsing: five-field grammar plus descriptor aliases.
//!
//! Thin wrapper over the `cron` crate (the same crate `tokio-cron-scheduler`
//! wraps internally for its own tick loop). This module exposes the bare
//! `next(expr, from)` contract the spec requires rather than a spawned
//! recurring job, since nothing here owns its own scheduling loop.

use chrono::{DateTime, Utc};

use crate::error::{SchedulerError, SchedulerResult};

/// Expand a descriptor alias to its five-field equivalent. Aliases not
/// listed here are passed through unchanged (covers ordinary five-field
/// expressions).
fn expand_alias(expr: &str) -> String {
    match expr {
        "@yearly" | "@annually" => "0 0 1 1 *".to_string(),
        "@monthly" => "0 0 1 * *".to_string(),
        "@weekly" => "0 0 * * 0".to_string(),
        "@daily" | "@midnight" => "0 0 * * *".to_string(),
        "@hourly" => "0 * * * *".to_string(),
        "@every5m" => "*/5 * * * *".to_string(),
        "@every10m" => "*/10 * * * *".to_string(),
        "@every15m" => "*/15 * * * *".to_string(),
        "@every30m" => "*/30 * * * *".to_string(),
        other => other.to_string(),
    }
}

/// Parse and validate a cron expression (aliases included). Used at
/// submission time so an invalid expression is rejected synchronously
/// rather than discovered at the next occurrence boundary.
pub fn validate(expr: &str) -> SchedulerResult<()> {
    parse(expr).map(|_| ())
}

fn parse(expr: &str) -> SchedulerResult<cron::Schedule> {
    let expanded = expand_alias(expr);
    // The `cron` crate's grammar is six-field (seconds-first); the spec's
    // five-field grammar omits seconds, so prefix a literal "0" for it.
    let six_field = format!("0 {expanded}");
    six_field
        .parse::<cron::Schedule>()
        .map_err(|e| SchedulerError::InvalidCron(expr.to_string(), e.to_string()))
}

/// Return the first instant strictly after `from` matching `expr`.
pub fn next(expr: &str, from: DateTime<Utc>) -> SchedulerResult<DateTime<Utc>> {
    let schedule = parse(expr)?;
    schedule
        .after(&from)
        .next()
        .ok_or_else(|| SchedulerError::InvalidCron(expr.to_string(), "no future occurrence".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_every_5_minutes() {
        let from = Utc.with_ymd_and_hms(2026, 1, 1, 12, 3, 0).unwrap();
        let n = next("*/5 * * * *", from).unwrap();
        assert_eq!(n, Utc.with_ymd_and_hms(2026, 1, 1, 12, 5, 0).unwrap());
    }

    #[test]
    fn test_daily_alias() {
        let from = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap();
        let n = next("@daily", from).unwrap();
        assert_eq!(n, Utc.with_ymd_and_hms(2026, 1, 2, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_hourly_alias() {
        let from = Utc.with_ymd_and_hms(2026, 1, 1, 12, 30, 0).unwrap();
        let n = next("@hourly", from).unwrap();
        assert_eq!(n, Utc.with_ymd_and_hms(2026, 1, 1, 13, 0, 0).unwrap());
    }

    #[test]
    fn test_weekly_alias() {
        // 2026-01-01 is a Thursday; next Sunday midnight is 2026-01-04.
        let from = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let n = next("@weekly", from).unwrap();
        assert_eq!(n, Utc.with_ymd_and_hms(2026, 1, 4, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_invalid_expression_rejected() {
        assert!(validate("not a cron expression").is_err());
    }

    #[test]
    fn test_strictly_after_not_equal() {
        // A boundary instant itself must not be returned; the next one must.
        let from = Utc.with_ymd_and_hms(2026, 1, 1, 12, 5, 0).unwrap();
        let n = next("*/5 * * * *", from).unwrap();
        assert_eq!(n, Utc.with_ymd_and_hms(2026, 1, 1, 12, 10, 0).unwrap());
    }
}
