//! # Notification Queue
//!
//! Transient user-facing messages that expire after a duration.
//!
//! The queue keeps no clock of its own: callers pass the current time as
//! milliseconds on a monotonic scale they choose.

use crate::primitives::DEFAULT_NOTIFICATION_DURATION_MS;
use serde::{Deserialize, Serialize};

/// Severity of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Success,
    Error,
    Info,
    Warning,
}

/// Identifier of a queued notification. Unique per queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NotificationId(pub u64);

/// One queued notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub kind: NotificationKind,
    pub message: String,
    pub duration_ms: u64,
    pub expires_at_ms: u64,
}

/// FIFO of live notifications.
#[derive(Debug, Clone, Default)]
pub struct NotificationQueue {
    entries: Vec<Notification>,
    next_id: u64,
}

impl NotificationQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a notification. `duration_ms` of `None` or `Some(0)` falls
    /// back to the default duration.
    pub fn enqueue(
        &mut self,
        kind: NotificationKind,
        message: impl Into<String>,
        duration_ms: Option<u64>,
        now_ms: u64,
    ) -> NotificationId {
        let duration_ms = duration_ms
            .filter(|d| *d > 0)
            .unwrap_or(DEFAULT_NOTIFICATION_DURATION_MS);
        let id = NotificationId(self.next_id);
        self.next_id = self.next_id.saturating_add(1);

        self.entries.push(Notification {
            id,
            kind,
            message: message.into(),
            duration_ms,
            expires_at_ms: now_ms.saturating_add(duration_ms),
        });
        id
    }

    /// Remove a notification. Returns `false` if it was already gone.
    pub fn dismiss(&mut self, id: NotificationId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|n| n.id != id);
        self.entries.len() != before
    }

    /// Drop every notification whose time is up. Returns how many went.
    pub fn expire(&mut self, now_ms: u64) -> usize {
        let before = self.entries.len();
        self.entries.retain(|n| n.expires_at_ms > now_ms);
        before - self.entries.len()
    }

    /// Notifications still live at `now_ms`, oldest first.
    pub fn active(&self, now_ms: u64) -> impl Iterator<Item = &Notification> {
        self.entries.iter().filter(move |n| n.expires_at_ms > now_ms)
    }

    /// Number of entries held, expired or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
