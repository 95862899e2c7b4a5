//! Per-kind alert rate limiting.
//!
//! [`AlertGate`] remembers when each [`AlertKind`] was last delivered and
//! refuses another delivery of that kind until the cooldown has elapsed.
//! The gate never records on its own: the caller records only after a
//! delivery actually succeeded, so a failed delivery is retried on the next
//! poll instead of being swallowed by the cooldown.

use std::collections::HashMap;
use std::time::Duration;

use crate::alert::AlertKind;
use crate::types::Timestamp;

/// Default minimum interval between two notifications of the same kind.
pub const ALERT_COOLDOWN: Duration = Duration::from_secs(300); // 5 minutes

#[derive(Debug, Clone)]
pub struct AlertGate {
    cooldown: Duration,
    last_sent: HashMap<AlertKind, Timestamp>,
}

impl Default for AlertGate {
    fn default() -> Self {
        Self::new(ALERT_COOLDOWN)
    }
}

impl AlertGate {
    /// Create an empty gate with the given cooldown window.
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_sent: HashMap::new(),
        }
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// When `kind` was last recorded as sent, if ever.
    pub fn last_sent(&self, kind: AlertKind) -> Option<Timestamp> {
        self.last_sent.get(&kind).copied()
    }

    /// Whether a notification of `kind` may be sent at `now`.
    ///
    /// True if nothing was recorded for `kind`, or at least the cooldown has
    /// elapsed since the record. A `now` earlier than the record (wall clock
    /// stepped backwards) counts as still cooling down.
    pub fn should_send(&self, kind: AlertKind, now: Timestamp) -> bool {
        let Some(last) = self.last_sent.get(&kind) else {
            return true;
        };
        match now.signed_duration_since(*last).to_std() {
            Ok(elapsed) => elapsed >= self.cooldown,
            Err(_) => false,
        }
    }

    /// Record a successful notification of `kind` at `now`.
    pub fn record_sent(&mut self, kind: AlertKind, now: Timestamp) {
        self.last_sent.insert(kind, now);
    }

    /// Earliest time another notification of `kind` will be allowed.
    pub fn next_allowed(&self, kind: AlertKind) -> Option<Timestamp> {
        let last = self.last_sent(kind)?;
        let cooldown = chrono::Duration::from_std(self.cooldown).ok()?;
        last.checked_add_signed(cooldown)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
