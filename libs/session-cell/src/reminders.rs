// libs/session-cell/src/reminders.rs
use chrono::{DateTime, Utc};

use crate::models::ReminderPayload;

/// Opaque reference to a scheduled reminder. Nothing in scope revokes one
/// today (there is no appointment-cancellation path), but the handle leaves
/// room for a caller to build that later.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReminderHandle(pub i64);

/// Fire-and-forget scheduling of a future notification. The core hands over
/// the fire time and payload and does not wait for delivery; durability
/// across restarts is the implementation's concern.
pub trait ReminderScheduler: Send + Sync {
    fn schedule(&self, fire_at: DateTime<Utc>, payload: ReminderPayload) -> ReminderHandle;
}
