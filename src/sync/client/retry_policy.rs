//! Retry policy for operations the server did not accept.

/// Linear backoff: the n-th retry waits `base_delay_secs * n`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub base_delay_secs: u64,
    /// Attempts an operation gets before it is marked dead.
    pub max_attempts: u32,
}

impl RetryPolicy {
    pub fn new(base_delay_secs: u64, max_attempts: u32) -> Self {
        Self {
            base_delay_secs,
            max_attempts,
        }
    }

    pub fn backoff_secs(&self, attempts: u32) -> u64 {
        self.base_delay_secs * attempts as u64
    }

    /// When to try again after `attempts` failed attempts, or None once the
    /// operation has no attempts left.
    pub fn next_attempt_at(&self, attempts: u32, now: i64) -> Option<i64> {
        if attempts >= self.max_attempts {
            return None;
        }
        Some(now + self.backoff_secs(attempts) as i64)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay_secs: 30,
            max_attempts: 3,
        }
    }
}
