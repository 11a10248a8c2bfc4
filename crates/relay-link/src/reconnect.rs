//! Reconnection state machine.
//!
//! ```text
//! Disconnected ──connecting()──> Connecting ──connected()──> Connected
//!      ^                              │                          │
//!      └──────────failed()────────────┴────────failed()──────────┘
//! ```
//!
//! Each failure bumps the attempt counter and yields the next backoff delay
//! until `max_attempts` is reached; a successful connect resets the counter.

use std::time::Duration;

use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl ReconnectPolicy {
    /// Delay before retry `attempt` (1-based): `min(base * 2^(attempt-1), max)`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.base_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Disconnected,
    Connecting,
    Connected,
}

#[derive(Debug)]
pub struct Reconnector {
    policy: ReconnectPolicy,
    state: LinkState,
    attempts: u32,
}

impl Reconnector {
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self {
            policy,
            state: LinkState::Disconnected,
            attempts: 0,
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    /// Consecutive failures since the last successful connect.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn policy(&self) -> &ReconnectPolicy {
        &self.policy
    }

    pub fn is_exhausted(&self) -> bool {
        self.attempts >= self.policy.max_attempts
    }

    pub fn connecting(&mut self) {
        self.state = LinkState::Connecting;
    }

    pub fn connected(&mut self) {
        if self.attempts > 0 {
            debug!("Connected after {} failed attempts", self.attempts);
        }
        self.state = LinkState::Connected;
        self.attempts = 0;
    }

    /// Record a failure or a drop. Returns the delay before the next attempt,
    /// or `None` once the policy is exhausted.
    pub fn failed(&mut self) -> Option<Duration> {
        self.state = LinkState::Disconnected;
        self.attempts = self.attempts.saturating_add(1);
        if self.attempts > self.policy.max_attempts {
            warn!("Reconnect attempts exhausted ({})", self.policy.max_attempts);
            return None;
        }
        let delay = self.policy.delay_for(self.attempts);
        debug!(
            "Reconnect attempt {}/{} in {:?}",
            self.attempts, self.policy.max_attempts, delay
        );
        Some(delay)
    }
}
