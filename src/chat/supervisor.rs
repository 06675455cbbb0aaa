//! Reconnect Supervisor
//!
//! Decides whether and when to reconnect after a session ends. Delays grow
//! as `base_delay * 2^attempt_count` and stop at `max_attempts`, after which
//! only a manual reconnect resumes.

use crate::chat::session::NORMAL_CLOSURE;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Identifier of a scheduled timer
pub type TimerId = u64;

/// Facility for delayed callbacks
///
/// When a timer elapses the owner is notified with the returned id. A
/// cancelled timer never fires.
pub trait Scheduler {
    /// Schedule a timer that fires after `delay`
    fn schedule(&mut self, delay: Duration) -> TimerId;
    /// Cancel a pending timer; unknown ids are ignored
    fn cancel(&mut self, timer: TimerId);
}

/// Retry policy for automatic reconnects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Ceiling on consecutive automatic attempts
    pub max_attempts: u32,
    /// Delay unit; attempt `k` waits `base_delay * 2^k`
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Delay before the attempt that follows `attempt_count` failures
    pub fn delay_for(&self, attempt_count: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt_count).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }
}

/// Outcome of a session ending
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// A reconnect was scheduled
    Scheduled {
        /// Attempt number (1-based) that will run when the timer fires
        attempt: u32,
        /// Delay before the attempt
        delay: Duration,
    },
    /// Normal or user-initiated close; no reconnect
    Suppressed,
    /// Ceiling reached; manual reconnect required
    Exhausted,
}

/// Retry bookkeeping for one controller
#[derive(Debug)]
pub struct ReconnectSupervisor {
    policy: RetryPolicy,
    attempt_count: u32,
    pending: Option<TimerId>,
    exhausted: bool,
}

impl ReconnectSupervisor {
    /// Create a supervisor with the given policy
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            attempt_count: 0,
            pending: None,
            exhausted: false,
        }
    }

    /// Consecutive automatic attempts made so far
    pub fn attempt_count(&self) -> u32 {
        self.attempt_count
    }

    /// Active retry policy
    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Whether a reconnect timer is pending
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Whether automatic retries gave up
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// React to a session reaching Closed
    pub fn on_session_closed<T: Scheduler>(
        &mut self,
        code: u16,
        user_initiated: bool,
        scheduler: &mut T,
    ) -> RetryDecision {
        if user_initiated || code == NORMAL_CLOSURE {
            debug!(code, user_initiated, "Normal close, not reconnecting");
            return RetryDecision::Suppressed;
        }
        if self.attempt_count >= self.policy.max_attempts {
            self.exhausted = true;
            warn!(
                attempts = self.attempt_count,
                "Reconnect attempts exhausted, waiting for manual reconnect"
            );
            return RetryDecision::Exhausted;
        }

        let delay = self.policy.delay_for(self.attempt_count);
        if let Some(stale) = self.pending.take() {
            scheduler.cancel(stale);
        }
        self.pending = Some(scheduler.schedule(delay));
        self.attempt_count += 1;
        info!(
            code,
            attempt = self.attempt_count,
            delay_ms = delay.as_millis() as u64,
            "Scheduled reconnect"
        );
        RetryDecision::Scheduled {
            attempt: self.attempt_count,
            delay,
        }
    }

    /// Claim a fired timer
    ///
    /// Returns true if `timer` is the pending reconnect, which is then
    /// cleared.
    pub fn take_due(&mut self, timer: TimerId) -> bool {
        if self.pending == Some(timer) {
            self.pending = None;
            true
        } else {
            false
        }
    }

    /// A session reached Open; start counting from zero again
    pub fn on_open(&mut self) {
        self.attempt_count = 0;
        self.exhausted = false;
    }

    /// Cancel any pending reconnect
    pub fn cancel<T: Scheduler>(&mut self, scheduler: &mut T) {
        if let Some(timer) = self.pending.take() {
            scheduler.cancel(timer);
            debug!(timer, "Cancelled pending reconnect");
        }
    }

    /// Cancel the pending reconnect and reset the attempt count
    pub fn manual_reset<T: Scheduler>(&mut self, scheduler: &mut T) {
        self.cancel(scheduler);
        self.attempt_count = 0;
        self.exhausted = false;
    }
}
