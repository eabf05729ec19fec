// apps/bot/src/reminders.rs
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use session_cell::{
    ConversationChannel, Prompt, ReminderHandle, ReminderPayload, ReminderScheduler,
};

/// In-process reminder delivery: each scheduled reminder becomes a sleeping
/// tokio task that pushes the reminder text through the conversation channel
/// at fire time. Best-effort only — reminders do not survive a restart.
pub struct TokioReminderScheduler {
    channel: Arc<dyn ConversationChannel>,
    next_handle: AtomicI64,
}

impl TokioReminderScheduler {
    pub fn new(channel: Arc<dyn ConversationChannel>) -> Self {
        Self {
            channel,
            next_handle: AtomicI64::new(1),
        }
    }
}

impl ReminderScheduler for TokioReminderScheduler {
    fn schedule(&self, fire_at: DateTime<Utc>, payload: ReminderPayload) -> ReminderHandle {
        let handle = ReminderHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));
        let delay = (fire_at - Utc::now()).to_std().unwrap_or_default();
        debug!(
            "Reminder {:?} for appointment {} fires in {:?}",
            handle, payload.appointment_id, delay
        );

        let channel = Arc::clone(&self.channel);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let message = Prompt::text("Reminder: you have a doctor's appointment tomorrow!");
            if let Err(e) = channel.prompt(payload.user_id, message).await {
                warn!(
                    "Reminder for appointment {} was not delivered: {}",
                    payload.appointment_id, e
                );
            }
        });

        handle
    }
}
