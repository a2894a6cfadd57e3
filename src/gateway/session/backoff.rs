use std::time::Duration;

use super::super::constants::{BACKOFF_BASE_MS, BACKOFF_MAX_SHIFT};

/// Reconnect delays for the main gateway. Never runs out: the bot keeps
/// trying until Discord refuses the session or it is shut down.
pub(super) struct Backoff {
    failures: u32,
}

impl Backoff {
    pub(super) fn new() -> Self {
        Self { failures: 0 }
    }

    /// 1s, 2s, 4s, then 8s for every further failure.
    pub(super) fn next(&mut self) -> Duration {
        let shift = self.failures.min(BACKOFF_MAX_SHIFT);
        self.failures = self.failures.saturating_add(1);
        Duration::from_millis(BACKOFF_BASE_MS << shift)
    }

    /// Consecutive failures since the last successful session.
    pub(super) fn failures(&self) -> u32 {
        self.failures
    }

    /// Called once a connection reaches READY or RESUMED.
    pub(super) fn reset(&mut self) {
        self.failures = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doubles_then_caps() {
        let mut backoff = Backoff::new();
        let delays: Vec<u64> = (0..6).map(|_| backoff.next().as_secs()).collect();
        assert_eq!(delays, vec![1, 2, 4, 8, 8, 8]);
    }

    #[test]
    fn long_outage_stays_capped() {
        let mut backoff = Backoff::new();
        for _ in 0..1_000 {
            backoff.next();
        }
        assert_eq!(backoff.failures(), 1_000);
        assert_eq!(backoff.next(), Duration::from_secs(8));
    }

    #[test]
    fn reset_starts_over() {
        let mut backoff = Backoff::new();
        backoff.next();
        backoff.next();
        backoff.reset();
        assert_eq!(backoff.failures(), 0);
        assert_eq!(backoff.next(), Duration::from_secs(1));
    }
}
