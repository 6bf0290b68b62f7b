use rand::Rng;
use std::time::Duration;

/// Retry configuration for webhook delivery
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub base_delay_secs: u64,
    pub max_delay_secs: u64,
    pub max_attempts: u32,
    pub jitter_factor: f64,
    pub timeout_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            base_delay_secs: 2,
            max_delay_secs: 60,
            max_attempts: 3,
            jitter_factor: 0.1, // ±10%
            timeout_secs: 10,
        }
    }
}

impl RetryConfig {
    /// Delay before the retry following `attempt` (0-based).
    /// Formula: delay = min(base_delay × 2^attempt × (1 ± jitter), max_delay)
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        let base = self.base_delay_secs as f64;
        let exponential = base * 2_f64.powi(attempt.min(30) as i32);

        let mut rng = rand::rng();
        let jitter = 1.0 + (rng.random::<f64>() * 2.0 - 1.0) * self.jitter_factor;
        let with_jitter = exponential * jitter;

        let capped = with_jitter.min(self.max_delay_secs as f64).max(0.0);

        Duration::from_secs_f64(capped)
    }

    /// `attempts_made` counts deliveries already tried
    pub fn should_retry(&self, attempts_made: u32) -> bool {
        attempts_made < self.max_attempts.max(1)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
