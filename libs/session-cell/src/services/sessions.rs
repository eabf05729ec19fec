// libs/session-cell/src/services/sessions.rs
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use availability_cell::{Appointment, AvailabilityService, UserId};

use crate::channel::ConversationChannel;
use crate::clock::Clock;
use crate::models::{BookingSession, Prompt, Reply, ReminderPayload, SessionError, SessionState};
use crate::reminders::ReminderScheduler;
use crate::services::dialogue::DialogueService;

/// Owns one `BookingSession` per active user and drives the dialogue over
/// them. Sessions for different users are independent; the map lock only
/// spans the synchronous transition itself. Sessions are transient — a user
/// losing one (idle eviction, process restart) just restarts the dialogue.
pub struct SessionService {
    sessions: Mutex<HashMap<UserId, BookingSession>>,
    dialogue: DialogueService,
    engine: Arc<AvailabilityService>,
    channel: Arc<dyn ConversationChannel>,
    reminders: Arc<dyn ReminderScheduler>,
    clock: Arc<dyn Clock>,
    idle_timeout: Duration,
}

impl SessionService {
    pub fn new(
        engine: Arc<AvailabilityService>,
        channel: Arc<dyn ConversationChannel>,
        reminders: Arc<dyn ReminderScheduler>,
        clock: Arc<dyn Clock>,
        idle_timeout: StdDuration,
    ) -> Self {
        Self {
            dialogue: DialogueService::new(Arc::clone(&engine), Arc::clone(&clock)),
            sessions: Mutex::new(HashMap::new()),
            engine,
            channel,
            reminders,
            clock,
            idle_timeout: Duration::from_std(idle_timeout)
                .unwrap_or_else(|_| Duration::minutes(30)),
        }
    }

    /// Open (or reset) the booking dialogue for a user and send the first
    /// prompt.
    pub async fn start_booking(&self, user_id: UserId) -> Result<(), SessionError> {
        let now = self.clock.now();
        {
            let mut sessions = self.sessions.lock().await;
            sessions.insert(
                user_id,
                BookingSession {
                    user_id,
                    state: SessionState::SelectDepartment,
                    last_activity: now,
                },
            );
        }
        info!("Booking session started for user {}", user_id);
        self.channel
            .prompt(user_id, self.dialogue.opening_prompt())
            .await?;
        Ok(())
    }

    /// Feed one reply into the user's session. Cancel is honored in every
    /// state; input without an active session gets a hint instead of an
    /// error. An engine failure ends the session cleanly: the user gets a
    /// generic message and the error is returned for logging.
    pub async fn handle_input(&self, user_id: UserId, reply: Reply) -> Result<(), SessionError> {
        let mut sessions = self.sessions.lock().await;

        if is_cancel(&reply) {
            sessions.remove(&user_id);
            drop(sessions);
            info!("Session for user {} cancelled", user_id);
            self.channel
                .prompt(user_id, Prompt::text("Action cancelled."))
                .await?;
            return Ok(());
        }

        let state = match sessions.get_mut(&user_id) {
            Some(session) => std::mem::replace(&mut session.state, SessionState::Done),
            None => {
                drop(sessions);
                self.channel
                    .prompt(
                        user_id,
                        Prompt::text("No booking in progress. Send /record to start one."),
                    )
                    .await?;
                return Ok(());
            }
        };

        match self.dialogue.advance(user_id, state, &reply) {
            Ok(outcome) => {
                if matches!(outcome.next, SessionState::Done) {
                    sessions.remove(&user_id);
                    debug!("Session for user {} finished", user_id);
                } else if let Some(session) = sessions.get_mut(&user_id) {
                    session.state = outcome.next;
                    session.last_activity = self.clock.now();
                }
                drop(sessions);

                if let Some(appointment) = &outcome.booked {
                    self.schedule_reminder(appointment);
                }
                self.channel.prompt(user_id, outcome.prompt).await?;
                Ok(())
            }
            Err(e) => {
                sessions.remove(&user_id);
                drop(sessions);
                error!("Session for user {} ended by engine failure: {}", user_id, e);
                self.channel
                    .prompt(
                        user_id,
                        Prompt::text(
                            "Something went wrong and the booking was not saved. \
                             Please try again later.",
                        ),
                    )
                    .await?;
                Err(SessionError::Engine(e))
            }
        }
    }

    pub async fn send_welcome(&self, user_id: UserId) -> Result<(), SessionError> {
        self.channel
            .prompt(
                user_id,
                Prompt::text(
                    "Welcome to the clinic booking service!\n\n\
                     Available commands:\n\
                     /record - book an appointment\n\
                     /my_records - your appointments\n\
                     /departments - clinic departments\n\
                     /cancel - cancel the current action",
                ),
            )
            .await?;
        Ok(())
    }

    /// Send the user their booked appointments, soonest first.
    pub async fn send_user_appointments(&self, user_id: UserId) -> Result<(), SessionError> {
        let appointments = self.engine.user_appointments(user_id);
        let prompt = if appointments.is_empty() {
            Prompt::text("You have no appointments.")
        } else {
            let mut text = String::from("Your appointments:\n");
            for appointment in &appointments {
                text.push_str(&self.format_appointment(appointment));
            }
            Prompt::text(text)
        };
        self.channel.prompt(user_id, prompt).await?;
        Ok(())
    }

    pub async fn send_departments(&self, user_id: UserId) -> Result<(), SessionError> {
        let mut text = String::from("Clinic departments:\n");
        for department in self.engine.list_departments() {
            text.push_str(&format!("\n- {}", department.name));
        }
        self.channel.prompt(user_id, Prompt::text(text)).await?;
        Ok(())
    }

    /// Drop sessions idle longer than the configured timeout. Returns the
    /// number evicted.
    pub async fn evict_idle(&self) -> usize {
        let now = self.clock.now();
        let mut sessions = self.sessions.lock().await;
        let before = sessions.len();
        sessions.retain(|_, session| now - session.last_activity <= self.idle_timeout);
        let evicted = before - sessions.len();
        if evicted > 0 {
            info!("Evicted {} idle booking sessions", evicted);
        }
        evicted
    }

    /// Periodic idle-session sweep; run as a background task.
    pub async fn run_reaper(self: Arc<Self>, every: StdDuration) {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            self.evict_idle().await;
        }
    }

    pub async fn session_state(&self, user_id: UserId) -> Option<SessionState> {
        self.sessions
            .lock()
            .await
            .get(&user_id)
            .map(|session| session.state.clone())
    }

    pub async fn active_sessions(&self) -> usize {
        self.sessions.lock().await.len()
    }

    fn schedule_reminder(&self, appointment: &Appointment) {
        let fire_at = appointment.starts_at() - Duration::days(1);
        let handle = self.reminders.schedule(
            fire_at,
            ReminderPayload {
                user_id: appointment.user_id,
                appointment_id: appointment.id,
            },
        );
        debug!(
            "Reminder {:?} scheduled at {} for appointment {}",
            handle, fire_at, appointment.id
        );
    }

    fn format_appointment(&self, appointment: &Appointment) -> String {
        let doctor_name = self
            .engine
            .catalog()
            .doctor(appointment.doctor_id)
            .map(|doc| doc.name.clone())
            .unwrap_or_default();
        format!(
            "\n#{}\nDoctor: {}\nDate: {}\nTime: {}\nPatient: {}\nPhone: {}\n",
            appointment.id,
            doctor_name,
            appointment.date.format("%d.%m.%Y"),
            appointment.time.format("%H:%M"),
            appointment.patient_name,
            appointment.phone,
        )
    }
}

fn is_cancel(reply: &Reply) -> bool {
    match reply {
        Reply::Choice(id) => id == "cancel",
        Reply::Text(text) => text.trim() == "/cancel",
    }
}
