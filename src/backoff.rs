//! Exponential reconnect backoff for listener transports.
//!
//! Delay doubles from `initial_backoff_ms` and is capped at
//! `max_backoff_ms` (2 s → 4 s → 8 s … 60 s with the defaults).  After
//! `max_attempts` consecutive failures the backoff is exhausted.

use crate::config::ReconnectPolicy;

#[derive(Debug, Clone)]
pub struct Backoff {
    policy: ReconnectPolicy,
    attempt: u32,
    next_delay_ms: u32,
}

impl Backoff {
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self {
            policy,
            attempt: 0,
            next_delay_ms: policy.initial_backoff_ms,
        }
    }

    /// Next `(attempt, delay_ms)`, or `None` once attempts are exhausted.
    pub fn next_delay(&mut self) -> Option<(u32, u32)> {
        if self.attempt >= self.policy.max_attempts {
            return None;
        }
        self.attempt += 1;
        let delay = self.next_delay_ms;
        self.next_delay_ms = delay.saturating_mul(2).min(self.policy.max_backoff_ms);
        Some((self.attempt, delay))
    }

    /// Call after a successful (re)subscribe.
    pub fn reset(&mut self) {
        self.attempt = 0;
        self.next_delay_ms = self.policy.initial_backoff_ms;
    }

    pub fn attempts(&self) -> u32 {
        self.attempt
    }
}
