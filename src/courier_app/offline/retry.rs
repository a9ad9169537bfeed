//! # Retry Logic and Backoff Strategies
//!
//! Decides how long a drain waits after a retryable failure and when an action
//! has used up its attempts.
//!
//! ## Features
//!
//! - **Exponential Backoff**: Gradually increase retry intervals
//! - **Jitter**: Add randomness to prevent thundering herd
//! - **Max Attempts**: Retryable failures past the ceiling are dead-lettered

use crate::shared::AppConfig;
use rand::Rng;
use std::time::Duration;

/// Backoff strategy configuration
#[derive(Debug, Clone, PartialEq)]
pub enum BackoffStrategy {
    /// Fixed interval between retries
    Fixed { interval: Duration },
    /// Exponential backoff with jitter
    Exponential {
        base: Duration,
        max: Duration,
        /// Jitter factor (0.0 to 1.0)
        jitter: f64,
    },
}

impl BackoffStrategy {
    /// Delay before retry number `attempt` (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match self {
            BackoffStrategy::Fixed { interval } => *interval,
            BackoffStrategy::Exponential { base, max, jitter } => {
                let exponent = attempt.saturating_sub(1).min(16);
                let delay = base.saturating_mul(1u32 << exponent).min(*max);

                let jitter_max = delay.as_secs_f64() * jitter.clamp(0.0, 1.0);
                if jitter_max <= 0.0 {
                    return delay;
                }
                let extra = rand::thread_rng().gen_range(0.0..jitter_max);
                delay + Duration::from_secs_f64(extra)
            }
        }
    }
}

/// Attempt ceiling plus backoff
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: BackoffStrategy,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 8,
            backoff: BackoffStrategy::Exponential {
                base: Duration::from_secs(5),
                max: Duration::from_secs(300),
                jitter: 0.1,
            },
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            backoff: BackoffStrategy::Exponential {
                base: Duration::from_secs(config.backoff_base_secs),
                max: Duration::from_secs(config.backoff_max_secs),
                jitter: 0.1,
            },
        }
    }

    /// Whether an action with `attempts` failed tries should be given up on
    pub fn exhausted(&self, attempts: u32) -> bool {
        attempts >= self.max_attempts
    }

    pub fn delay_for(&self, attempts: u32) -> Duration {
        self.backoff.delay_for(attempts)
    }
}
