use std::time::Duration;

/// Delay strategy between reconnect attempts. Attempts themselves are
/// unbounded; the policy only decides how long to wait before the next one.
pub trait RetryPolicy: Send + Sync {
    /// Delay before retry number `attempt` (1-based count of failures so far).
    fn next_delay(&self, attempt: u32) -> Duration;
}

/// Retries at a fixed interval, forever. The 30 second default matches the
/// reconnect cadence of a long-lived home-automation bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedDelay(pub Duration);

impl Default for FixedDelay {
    fn default() -> Self {
        Self(Duration::from_secs(30))
    }
}

impl RetryPolicy for FixedDelay {
    fn next_delay(&self, _attempt: u32) -> Duration {
        self.0
    }
}
