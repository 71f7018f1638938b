//! Retry strategies: `nextDelay(retryCount) -> duration`.
//!
//! Generalizes the teacher's `error::RetryStrategy` (which only modeled
//! exponential backoff bound to an error category) into the four strategies
//! named in the spec: Exponential, Fixed, Linear, Custom.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// A retry backoff strategy. All variants expose [`RetryStrategy::next_delay`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RetryStrategy {
    /// `min(base_delay * multiplier^retry, max_delay)`, optionally jittered
    /// by a uniform factor in [-25%, +25%], clamped to >= 0.
    Exponential {
        base_delay: Duration,
        multiplier: f64,
        max_delay: Duration,
        jitter: bool,
    },
    /// A constant delay regardless of retry count.
    Fixed { delay: Duration },
    /// `min(base + retry * increment, max_delay)`.
    Linear {
        base: Duration,
        increment: Duration,
        max_delay: Duration,
    },
    /// A fixed sequence of delays; retry counts past the end reuse the
    /// last entry. An empty sequence behaves like `Fixed { delay: 0 }`.
    Custom { delays: Vec<Duration> },
}

impl Default for RetryStrategy {
    fn default() -> Self {
        Self::Exponential {
            base_delay: Duration::from_millis(100),
            multiplier: 2.0,
            max_delay: Duration::from_secs(30),
            jitter: true,
        }
    }
}

impl RetryStrategy {
    /// Compute the delay before the attempt numbered `retry_count` (1-based:
    /// the delay preceding the *next* attempt after this many failures).
    pub fn next_delay(&self, retry_count: u32) -> Duration {
        match self {
            Self::Exponential {
                base_delay,
                multiplier,
                max_delay,
                jitter,
            } => {
                let exp = multiplier.powi(retry_count as i32);
                let raw = base_delay.as_secs_f64() * exp;
                let capped = raw.min(max_delay.as_secs_f64());
                let final_secs = if *jitter {
                    apply_jitter(capped)
                } else {
                    capped
                };
                Duration::from_secs_f64(final_secs.max(0.0))
            }
            Self::Fixed { delay } => *delay,
            Self::Linear {
                base,
                increment,
                max_delay,
            } => {
                let raw = base.as_secs_f64() + increment.as_secs_f64() * retry_count as f64;
                Duration::from_secs_f64(raw.min(max_delay.as_secs_f64()))
            }
            Self::Custom { delays } => {
                if delays.is_empty() {
                    return Duration::ZERO;
                }
                let idx = (retry_count as usize).min(delays.len() - 1);
                delays[idx]
            }
        }
    }
}

/// Perturb `base_secs` by a uniformly random factor in [-25%, +25%],
/// clamped so the result never goes negative.
fn apply_jitter(base_secs: f64) -> f64 {
    let factor = rand::rng().random_range(-0.25..=0.25);
    (base_secs * (1.0 + factor)).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_strategy_constant() {
        let strategy = RetryStrategy::Fixed {
            delay: Duration::from_millis(500),
        };
        assert_eq!(strategy.next_delay(0), Duration::from_millis(500));
        assert_eq!(strategy.next_delay(10), Duration::from_millis(500));
    }

    #[test]
    fn test_exponential_no_jitter_matches_e3_scenario() {
        let strategy = RetryStrategy::Exponential {
            base_delay: Duration::from_millis(100),
            multiplier: 2.0,
            max_delay: Duration::from_secs(30),
            jitter: false,
        };
        assert_eq!(strategy.next_delay(0), Duration::from_millis(100));
        assert_eq!(strategy.next_delay(1), Duration::from_millis(200));
        assert_eq!(strategy.next_delay(2), Duration::from_millis(400));
    }

    #[test]
    fn test_exponential_caps_at_max_delay() {
        let strategy = RetryStrategy::Exponential {
            base_delay: Duration::from_millis(100),
            multiplier: 2.0,
            max_delay: Duration::from_millis(500),
            jitter: false,
        };
        assert_eq!(strategy.next_delay(10), Duration::from_millis(500));
    }

    #[test]
    fn test_exponential_jitter_stays_within_bounds() {
        let strategy = RetryStrategy::Exponential {
            base_delay: Duration::from_millis(1000),
            multiplier: 1.0,
            max_delay: Duration::from_secs(30),
            jitter: true,
        };
        for _ in 0..50 {
            let delay = strategy.next_delay(0).as_secs_f64();
            assert!((0.75..=1.25).contains(&delay), "delay {delay} out of jitter bounds");
        }
    }

    #[test]
    fn test_linear_strategy() {
        let strategy = RetryStrategy::Linear {
            base: Duration::from_secs(1),
            increment: Duration::from_secs(2),
            max_delay: Duration::from_secs(100),
        };
        assert_eq!(strategy.next_delay(0), Duration::from_secs(1));
        assert_eq!(strategy.next_delay(3), Duration::from_secs(7));
    }

    #[test]
    fn test_linear_strategy_caps() {
        let strategy = RetryStrategy::Linear {
            base: Duration::from_secs(1),
            increment: Duration::from_secs(10),
            max_delay: Duration::from_secs(5),
        };
        assert_eq!(strategy.next_delay(10), Duration::from_secs(5));
    }

    #[test]
    fn test_custom_strategy_reuses_last() {
        let strategy = RetryStrategy::Custom {
            delays: vec![
                Duration::from_secs(1),
                Duration::from_secs(5),
                Duration::from_secs(20),
            ],
        };
        assert_eq!(strategy.next_delay(0), Duration::from_secs(1));
        assert_eq!(strategy.next_delay(2), Duration::from_secs(20));
        assert_eq!(strategy.next_delay(99), Duration::from_secs(20));
    }

    #[test]
    fn test_custom_strategy_empty_is_zero() {
        let strategy = RetryStrategy::Custom { delays: vec![] };
        assert_eq!(strategy.next_delay(0), Duration::ZERO);
    }
}
