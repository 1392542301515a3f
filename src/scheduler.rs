//! Deadline bookkeeping for the node cores.
//!
//! The cores never sleep or spawn timers themselves. Each periodic duty
//! (sampling, heartbeat, forced data send) is a [`Periodic`] that the core
//! asks "are you due at `now`?" from its `poll`, and the runtime sleeps
//! until the earliest [`Periodic::remaining`] of them.
//!
//! ```text
//!  now ──▶ poll() ──▶ Periodic::due? ──▶ work ──▶ Periodic::mark(now)
//!                          │
//!                          └──▶ min(remaining) ──▶ runtime timer
//! ```
//!
//! All times are monotonic milliseconds supplied by the caller.

use log::debug;

/// One recurring deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Periodic {
    /// Human-readable label for logs.
    label: &'static str,
    interval_ms: u64,
    /// `None` until first armed; an unarmed deadline is due immediately.
    next_due_ms: Option<u64>,
}

impl Periodic {
    /// A deadline that fires on the first poll, then every `interval_ms`.
    pub const fn new(label: &'static str, interval_ms: u32) -> Self {
        Self {
            label,
            interval_ms: interval_ms as u64,
            next_due_ms: None,
        }
    }

    pub fn interval_ms(&self) -> u64 {
        self.interval_ms
    }

    /// Whether the deadline has passed at `now_ms`.
    pub fn due(&self, now_ms: u64) -> bool {
        self.next_due_ms.is_none_or(|t| now_ms >= t)
    }

    /// Record that the duty ran at `now_ms`; the next fire is one interval later.
    ///
    /// Re-arming from `now` rather than from the previous deadline means a
    /// late poll never produces a burst of catch-up fires.
    pub fn mark(&mut self, now_ms: u64) {
        let next = now_ms.saturating_add(self.interval_ms);
        debug!("{}: next at {} ms", self.label, next);
        self.next_due_ms = Some(next);
    }

    /// Push the next fire to `delay_ms` after `now_ms`, without touching the interval.
    /// Used to retry a duty that failed.
    pub fn defer(&mut self, now_ms: u64, delay_ms: u64) {
        self.next_due_ms = Some(now_ms.saturating_add(delay_ms));
    }

    /// Milliseconds until the deadline, `0` if already due.
    pub fn remaining(&self, now_ms: u64) -> u64 {
        self.next_due_ms.map_or(0, |t| t.saturating_sub(now_ms))
    }
}

/// Smallest remaining time across several deadlines.
pub fn next_wakeup(now_ms: u64, deadlines: &[&Periodic]) -> u64 {
    deadlines
        .iter()
        .map(|p| p.remaining(now_ms))
        .min()
        .unwrap_or(u64::MAX)
}
