//! Bounded, cancellable completion polling.
//!
//! The event lock is taken only for the duration of each attempt, never
//! while sleeping, so consumers can read the event between polls.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use tracing::debug;

use super::{CompletionOutcome, SharedEvent, SidecarReader};
use crate::normalize::NameTables;

/// How long and how often to poll for a sidecar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Give up after this long.
    pub timeout: Duration,
    /// Wait between attempts.
    pub interval: Duration,
}

impl RetryPolicy {
    /// Shortest wait between attempts; a zero interval is raised to this.
    pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

    /// A policy from millisecond settings.
    #[must_use]
    pub const fn from_millis(timeout_ms: u64, interval_ms: u64) -> Self {
        let interval = if interval_ms == 0 {
            Self::MIN_INTERVAL
        } else {
            Duration::from_millis(interval_ms)
        };
        Self {
            timeout: Duration::from_millis(timeout_ms),
            interval,
        }
    }

    /// A single attempt, no waiting.
    #[must_use]
    pub const fn once() -> Self {
        Self::from_millis(0, 0)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_millis(2000, 100)
    }
}

/// Cooperative cancellation flag, cloned into every waiter of a session.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    /// A fresh, uncancelled token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel every waiter holding a clone of this token.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// True once [`CancelToken::cancel`] was called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Poll until the event completes, a non-retryable outcome is reached, the
/// policy times out, or `cancel` fires.
///
/// On timeout or cancellation the last retryable outcome is returned and the
/// event stays incomplete.
pub fn complete_with_retry(
    event: &SharedEvent,
    reader: &dyn SidecarReader,
    tables: &NameTables,
    policy: RetryPolicy,
    cancel: &CancelToken,
) -> CompletionOutcome {
    let start = Instant::now();
    let mut attempts = 0_u32;
    loop {
        if cancel.is_cancelled() {
            debug!(attempts, "completion cancelled");
            return CompletionOutcome::NotYetAvailable;
        }

        let outcome = event.attempt_complete(reader, tables);
        attempts += 1;
        if !outcome.is_retryable() {
            return outcome;
        }

        let elapsed = start.elapsed();
        if elapsed >= policy.timeout {
            debug!(attempts, ?elapsed, ?outcome, "completion timed out; event left incomplete");
            return outcome;
        }

        let wait = policy
            .interval
            .max(RetryPolicy::MIN_INTERVAL)
            .min(policy.timeout - elapsed);
        sleep_unless_cancelled(wait, cancel);
    }
}

fn sleep_unless_cancelled(total: Duration, cancel: &CancelToken) {
    const SLICE: Duration = Duration::from_millis(10);
    let deadline = Instant::now() + total;
    loop {
        let now = Instant::now();
        if now >= deadline || cancel.is_cancelled() {
            return;
        }
        thread::sleep(SLICE.min(deadline - now));
    }
}
