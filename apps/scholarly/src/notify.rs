//! # Notifications
//!
//! The sink the wizard engine reports to, and the per-user notification
//! centers the HTTP API reads back.

use scholarly_core::{Notification, NotificationId, NotificationKind, NotificationQueue, UserId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use tokio::time::Instant;

/// Receiver of user-facing messages.
pub trait NotificationSink: Send + Sync {
    /// Queue a message. `None` uses the sink's default duration.
    fn notify(&self, kind: NotificationKind, message: &str, duration_ms: Option<u64>)
    -> NotificationId;

    /// Remove a message early. Returns `false` if it was already gone.
    fn dismiss(&self, id: NotificationId) -> bool;

    /// Messages that have not expired yet, oldest first.
    fn active(&self) -> Vec<Notification>;
}

// =============================================================================
// NOTIFICATION CENTER
// =============================================================================

/// A notification queue on a monotonic millisecond clock.
#[derive(Debug)]
pub struct NotificationCenter {
    queue: Mutex<NotificationQueue>,
    origin: Instant,
    default_duration_ms: u64,
}

impl NotificationCenter {
    pub fn new(default_duration_ms: u64) -> Self {
        Self {
            queue: Mutex::new(NotificationQueue::new()),
            origin: Instant::now(),
            default_duration_ms,
        }
    }

    fn now_ms(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    fn is_idle(&self) -> bool {
        self.active().is_empty()
    }
}

impl NotificationSink for NotificationCenter {
    fn notify(
        &self,
        kind: NotificationKind,
        message: &str,
        duration_ms: Option<u64>,
    ) -> NotificationId {
        let now = self.now_ms();
        let duration = duration_ms.or(Some(self.default_duration_ms));
        let mut queue = self.queue.lock().unwrap_or_else(|e| e.into_inner());
        queue.expire(now);
        queue.enqueue(kind, message, duration, now)
    }

    fn dismiss(&self, id: NotificationId) -> bool {
        let mut queue = self.queue.lock().unwrap_or_else(|e| e.into_inner());
        queue.dismiss(id)
    }

    fn active(&self) -> Vec<Notification> {
        let now = self.now_ms();
        let mut queue = self.queue.lock().unwrap_or_else(|e| e.into_inner());
        queue.expire(now);
        queue.active(now).cloned().collect()
    }
}

// =============================================================================
// NOTIFICATION HUB
// =============================================================================

/// One notification center per signed-in user.
///
/// Centers that nothing else holds and that have no active messages are
/// dropped whenever a new center is created.
#[derive(Debug)]
pub struct NotificationHub {
    centers: RwLock<HashMap<UserId, Arc<NotificationCenter>>>,
    default_duration_ms: u64,
}

impl NotificationHub {
    pub fn new(default_duration_ms: u64) -> Self {
        Self {
            centers: RwLock::new(HashMap::new()),
            default_duration_ms,
        }
    }

    /// The user's center, created on first use.
    pub fn center_for(&self, user: &UserId) -> Arc<NotificationCenter> {
        {
            let centers = self.centers.read().unwrap_or_else(|e| e.into_inner());
            if let Some(center) = centers.get(user) {
                return Arc::clone(center);
            }
        }

        let mut centers = self.centers.write().unwrap_or_else(|e| e.into_inner());
        if !centers.contains_key(user) {
            prune_idle(&mut centers);
        }
        Arc::clone(
            centers
                .entry(user.clone())
                .or_insert_with(|| Arc::new(NotificationCenter::new(self.default_duration_ms))),
        )
    }

    /// Drop centers with nothing to show that no wizard holds. Returns the
    /// number removed.
    pub fn prune(&self) -> usize {
        let mut centers = self.centers.write().unwrap_or_else(|e| e.into_inner());
        prune_idle(&mut centers)
    }

    /// Number of centers currently kept.
    pub fn len(&self) -> usize {
        self.centers.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn prune_idle(centers: &mut HashMap<UserId, Arc<NotificationCenter>>) -> usize {
    let before = centers.len();
    centers.retain(|_, center| Arc::strong_count(center) > 1 || !center.is_idle());
    before - centers.len()
}

// =============================================================================
// TESTS
// =============================================================================
