//! Bounded, fixed-delay reconnection.

use std::time::Duration;

pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 5;
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(2000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Retries allowed after consecutive failures. Zero disables reconnection.
    pub max_attempts: u32,
    /// Fixed wait before each retry.
    pub delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            delay: DEFAULT_RECONNECT_DELAY,
        }
    }
}

/// What to do after a connection failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectDecision {
    /// Retry after `delay`. `attempt` counts from 1.
    Retry { attempt: u32, delay: Duration },
    /// Stop retrying.
    Exhausted { attempts: u32 },
}

/// Reconnection progress, as published to client handles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconnectState {
    /// Consecutive failed attempts since the last successful connect.
    pub attempts: u32,
    pub exhausted: bool,
}

/// Counts consecutive failures against a [`ReconnectPolicy`].
#[derive(Debug, Clone)]
pub struct ReconnectController {
    policy: ReconnectPolicy,
    attempts: u32,
    exhausted: bool,
}

impl ReconnectController {
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self {
            policy,
            attempts: 0,
            exhausted: false,
        }
    }

    pub fn policy(&self) -> &ReconnectPolicy {
        &self.policy
    }

    /// Record a failed or lost connection and decide whether to retry.
    pub fn record_failure(&mut self) -> ReconnectDecision {
        if self.exhausted {
            return ReconnectDecision::Exhausted {
                attempts: self.policy.max_attempts,
            };
        }
        self.attempts = self.attempts.saturating_add(1);
        if self.attempts <= self.policy.max_attempts {
            ReconnectDecision::Retry {
                attempt: self.attempts,
                delay: self.policy.delay,
            }
        } else {
            self.exhausted = true;
            ReconnectDecision::Exhausted {
                attempts: self.policy.max_attempts,
            }
        }
    }

    /// Record a successful connect.
    pub fn reset(&mut self) {
        self.attempts = 0;
        self.exhausted = false;
    }

    pub fn state(&self) -> ReconnectState {
        ReconnectState {
            attempts: self.attempts.min(self.policy.max_attempts),
            exhausted: self.exhausted,
        }
    }
}
