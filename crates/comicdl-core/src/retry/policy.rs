use std::time::Duration;

use crate::config::RetryConfig;

/// How a failed page request may be retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transient {
    /// Final answer; retrying cannot help.
    No,
    /// Network trouble or a server error: exponential backoff.
    Backoff,
    /// The server asked us to come back after this long (`Retry-After`).
    After(Duration),
}

/// Exponential backoff with an attempt cap and a delay cap.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first).
    pub max_attempts: u32,
    pub base_delay: Duration,
    /// Longest wait between attempts. A `Retry-After` above it gives up.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(cfg: &RetryConfig) -> Self {
        Self {
            max_attempts: cfg.max_attempts.max(1),
            base_delay: Duration::from_secs_f64(cfg.base_delay_secs.max(0.0)),
            max_delay: Duration::from_secs(cfg.max_delay_secs),
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Wait before retrying after failed attempt `attempt` (1-based), or
    /// `None` to give up.
    pub fn delay_after(&self, attempt: u32, transient: Transient) -> Option<Duration> {
        if attempt >= self.max_attempts {
            return None;
        }
        match transient {
            Transient::No => None,
            Transient::After(wait) => (wait <= self.max_delay).then_some(wait),
            Transient::Backoff => {
                let factor = 1u32 << (attempt - 1).min(16);
                Some(self.base_delay.saturating_mul(factor).min(self.max_delay))
            }
        }
    }
}
