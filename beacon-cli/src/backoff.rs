use std::time::Duration;

use shared::config::client::ReconnectConfig;

/// Exponential reconnect schedule: attempt `k` (0-based) waits `min(base * 2^k, max)`, and no
/// attempt is issued once `max_attempts` have failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    base: Duration,
    max: Duration,
    max_attempts: u32,
}

impl ReconnectPolicy {
    #[must_use]
    pub const fn new(base: Duration, max: Duration, max_attempts: u32) -> Self {
        Self {
            base,
            max,
            max_attempts,
        }
    }

    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay before reconnect attempt `attempt`, or `None` once the budget is spent.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Option<Duration> {
        if attempt >= self.max_attempts {
            return None;
        }
        let delay = 2u32
            .checked_pow(attempt)
            .and_then(|factor| self.base.checked_mul(factor))
            .unwrap_or(self.max);
        Some(delay.min(self.max))
    }
}

impl From<&ReconnectConfig> for ReconnectPolicy {
    fn from(config: &ReconnectConfig) -> Self {
        Self::new(config.base_delay(), config.max_delay(), config.max_attempts)
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::from(&ReconnectConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn millis(policy: &ReconnectPolicy) -> Vec<u128> {
        (0..)
            .map_while(|attempt| policy.delay_for(attempt))
            .map(|delay| delay.as_millis())
            .collect()
    }

    #[test]
    fn doubles_then_caps() {
        let policy = ReconnectPolicy::new(Duration::from_secs(1), Duration::from_secs(30), 8);

        assert_eq!(
            millis(&policy),
            vec![1_000, 2_000, 4_000, 8_000, 16_000, 30_000, 30_000, 30_000]
        );
    }

    #[test]
    fn default_budget_is_five_attempts() {
        let policy = ReconnectPolicy::default();

        assert_eq!(millis(&policy), vec![1_000, 2_000, 4_000, 8_000, 16_000]);
        assert_eq!(policy.delay_for(5), None);
    }

    #[test]
    fn huge_attempt_numbers_saturate_at_max() {
        let policy = ReconnectPolicy::new(Duration::from_secs(1), Duration::from_secs(30), u32::MAX);

        assert_eq!(policy.delay_for(40), Some(Duration::from_secs(30)));
        assert_eq!(policy.delay_for(u32::MAX - 1), Some(Duration::from_secs(30)));
    }

    #[test]
    fn zero_budget_never_retries() {
        let policy = ReconnectPolicy::new(Duration::from_secs(1), Duration::from_secs(30), 0);
        assert_eq!(policy.delay_for(0), None);
    }
}
