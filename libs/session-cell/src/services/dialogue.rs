// libs/session-cell/src/services/dialogue.rs
use std::sync::Arc;

use chrono::{Datelike, Duration, NaiveDate, NaiveTime, Weekday};
use tracing::{debug, warn};

use availability_cell::{
    Appointment, AvailabilityError, AvailabilityService, BookingRequest, UserId,
};
use catalog_cell::{DepartmentId, DoctorId};

use crate::clock::Clock;
use crate::models::{Choice, Prompt, Reply, SessionState};

/// How far ahead dates are offered, in calendar days starting tomorrow.
const WINDOW_DAYS: i64 = 14;

/// Result of feeding one reply into the state machine: the state to continue
/// in, the prompt to send back, and the appointment when the step committed
/// one.
#[derive(Debug, Clone)]
pub struct StepOutcome {
    pub next: SessionState,
    pub prompt: Prompt,
    pub booked: Option<Appointment>,
}

fn stay(state: SessionState, prompt: Prompt) -> StepOutcome {
    StepOutcome {
        next: state,
        prompt,
        booked: None,
    }
}

/// The per-step transition logic of the booking dialogue. Stateless itself:
/// the caller owns the `SessionState` and hands it in with each reply.
/// Malformed input never changes state, it only re-prompts; the sole
/// fallible path is the availability engine, and of its errors only a stale
/// slot at commit time is handled here (by looping back to time selection) —
/// anything else is terminal for the session and returned to the caller.
pub struct DialogueService {
    engine: Arc<AvailabilityService>,
    clock: Arc<dyn Clock>,
}

impl DialogueService {
    pub fn new(engine: Arc<AvailabilityService>, clock: Arc<dyn Clock>) -> Self {
        Self { engine, clock }
    }

    /// Prompt for a freshly started session.
    pub fn opening_prompt(&self) -> Prompt {
        self.departments_prompt(None)
    }

    /// Dates currently offered for selection: the next 14 calendar days,
    /// weekdays only. Recomputed from the clock on every call, so a session
    /// resumed the next day sees a shifted window.
    pub fn booking_window(&self) -> Vec<NaiveDate> {
        let today = self.clock.now().date_naive();
        (1..=WINDOW_DAYS)
            .map(|offset| today + Duration::days(offset))
            .filter(|date| !matches!(date.weekday(), Weekday::Sat | Weekday::Sun))
            .collect()
    }

    pub fn advance(
        &self,
        user_id: UserId,
        state: SessionState,
        reply: &Reply,
    ) -> Result<StepOutcome, AvailabilityError> {
        match state {
            SessionState::SelectDepartment => self.select_department(reply),
            SessionState::SelectDoctor { department_id } => {
                self.select_doctor(department_id, reply)
            }
            SessionState::SelectDate {
                department_id,
                doctor_id,
            } => self.select_date(department_id, doctor_id, reply),
            SessionState::SelectTime {
                department_id,
                doctor_id,
                date,
            } => self.select_time(department_id, doctor_id, date, reply),
            SessionState::EnterName {
                department_id,
                doctor_id,
                date,
                time,
            } => Ok(self.enter_name(department_id, doctor_id, date, time, reply)),
            SessionState::EnterPhone {
                department_id,
                doctor_id,
                date,
                time,
                patient_name,
            } => Ok(self.enter_phone(department_id, doctor_id, date, time, patient_name, reply)),
            SessionState::Confirm {
                department_id,
                doctor_id,
                date,
                time,
                patient_name,
                phone,
            } => self.confirm(
                user_id,
                department_id,
                doctor_id,
                date,
                time,
                patient_name,
                phone,
                reply,
            ),
            SessionState::Done => Ok(stay(
                SessionState::Done,
                Prompt::text("This booking is finished. Send /record to start a new one."),
            )),
        }
    }

    // ==========================================================================
    // PER-STATE TRANSITIONS
    // ==========================================================================

    fn select_department(&self, reply: &Reply) -> Result<StepOutcome, AvailabilityError> {
        if let Some(department_id) = parse_id(reply, "dept:") {
            if self.engine.catalog().department(department_id).is_none() {
                return Ok(stay(
                    SessionState::SelectDepartment,
                    self.departments_prompt(Some("That department is not on the list.")),
                ));
            }
            if self.engine.list_doctors(department_id).is_empty() {
                debug!("Department {} has no doctors, re-prompting", department_id);
                return Ok(stay(
                    SessionState::SelectDepartment,
                    self.departments_prompt(Some(
                        "No doctors are taking appointments in that department right now. \
                         Choose another one.",
                    )),
                ));
            }
            return Ok(StepOutcome {
                next: SessionState::SelectDoctor { department_id },
                prompt: self.doctors_prompt(department_id, None),
                booked: None,
            });
        }

        Ok(stay(
            SessionState::SelectDepartment,
            self.departments_prompt(Some("Pick a department from the list.")),
        ))
    }

    fn select_doctor(
        &self,
        department_id: DepartmentId,
        reply: &Reply,
    ) -> Result<StepOutcome, AvailabilityError> {
        if is_choice(reply, "back") {
            return Ok(stay(
                SessionState::SelectDepartment,
                self.departments_prompt(None),
            ));
        }

        if let Some(doctor_id) = parse_id(reply, "doctor:") {
            let belongs = self
                .engine
                .catalog()
                .doctor(doctor_id)
                .is_some_and(|doc| doc.department_id == department_id);
            if belongs {
                return Ok(StepOutcome {
                    next: SessionState::SelectDate {
                        department_id,
                        doctor_id,
                    },
                    prompt: self.dates_prompt(doctor_id, None),
                    booked: None,
                });
            }
        }

        Ok(stay(
            SessionState::SelectDoctor { department_id },
            self.doctors_prompt(department_id, Some("Pick a doctor from the list.")),
        ))
    }

    fn select_date(
        &self,
        department_id: DepartmentId,
        doctor_id: DoctorId,
        reply: &Reply,
    ) -> Result<StepOutcome, AvailabilityError> {
        if is_choice(reply, "back") {
            return Ok(stay(
                SessionState::SelectDoctor { department_id },
                self.doctors_prompt(department_id, None),
            ));
        }

        if let Some(date) = parse_date(reply) {
            if !self.booking_window().contains(&date) {
                return Ok(stay(
                    SessionState::SelectDate {
                        department_id,
                        doctor_id,
                    },
                    self.dates_prompt(
                        doctor_id,
                        Some("That date is not available. Choose one of the listed days."),
                    ),
                ));
            }

            let slots = self.engine.available_slots(doctor_id, date)?;
            if slots.is_empty() {
                return Ok(stay(
                    SessionState::SelectDate {
                        department_id,
                        doctor_id,
                    },
                    self.dates_prompt(doctor_id, Some("No free time on that date. Choose another day.")),
                ));
            }

            return Ok(StepOutcome {
                next: SessionState::SelectTime {
                    department_id,
                    doctor_id,
                    date,
                },
                prompt: self.times_prompt(&slots, None),
                booked: None,
            });
        }

        Ok(stay(
            SessionState::SelectDate {
                department_id,
                doctor_id,
            },
            self.dates_prompt(doctor_id, Some("Pick a date from the list.")),
        ))
    }

    fn select_time(
        &self,
        department_id: DepartmentId,
        doctor_id: DoctorId,
        date: NaiveDate,
        reply: &Reply,
    ) -> Result<StepOutcome, AvailabilityError> {
        if is_choice(reply, "back") {
            return Ok(stay(
                SessionState::SelectDate {
                    department_id,
                    doctor_id,
                },
                self.dates_prompt(doctor_id, None),
            ));
        }

        // Availability is advisory at this point: the grid is re-read here
        // and re-validated again inside the commit's critical section.
        let slots = self.engine.available_slots(doctor_id, date)?;

        if let Some(time) = parse_time(reply) {
            if slots.contains(&time) {
                return Ok(StepOutcome {
                    next: SessionState::EnterName {
                        department_id,
                        doctor_id,
                        date,
                        time,
                    },
                    prompt: self.name_prompt(None),
                    booked: None,
                });
            }
            return Ok(stay(
                SessionState::SelectTime {
                    department_id,
                    doctor_id,
                    date,
                },
                self.times_prompt(&slots, Some("That time is no longer free. Pick another slot.")),
            ));
        }

        Ok(stay(
            SessionState::SelectTime {
                department_id,
                doctor_id,
                date,
            },
            self.times_prompt(&slots, Some("Pick a time from the list.")),
        ))
    }

    fn enter_name(
        &self,
        department_id: DepartmentId,
        doctor_id: DoctorId,
        date: NaiveDate,
        time: NaiveTime,
        reply: &Reply,
    ) -> StepOutcome {
        if let Reply::Text(text) = reply {
            if text.split_whitespace().count() >= 2 {
                return StepOutcome {
                    next: SessionState::EnterPhone {
                        department_id,
                        doctor_id,
                        date,
                        time,
                        patient_name: text.trim().to_string(),
                    },
                    prompt: self.phone_prompt(None),
                    booked: None,
                };
            }
        }

        stay(
            SessionState::EnterName {
                department_id,
                doctor_id,
                date,
                time,
            },
            self.name_prompt(Some("Please enter the full name, at least two words.")),
        )
    }

    fn enter_phone(
        &self,
        department_id: DepartmentId,
        doctor_id: DoctorId,
        date: NaiveDate,
        time: NaiveTime,
        patient_name: String,
        reply: &Reply,
    ) -> StepOutcome {
        if let Reply::Text(text) = reply {
            if is_valid_phone(text) {
                let phone = text.trim().to_string();
                let prompt = self.confirm_prompt(doctor_id, date, time, &patient_name, &phone, None);
                return StepOutcome {
                    next: SessionState::Confirm {
                        department_id,
                        doctor_id,
                        date,
                        time,
                        patient_name,
                        phone,
                    },
                    prompt,
                    booked: None,
                };
            }
        }

        stay(
            SessionState::EnterPhone {
                department_id,
                doctor_id,
                date,
                time,
                patient_name,
            },
            self.phone_prompt(Some("That does not look like a valid phone number.")),
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn confirm(
        &self,
        user_id: UserId,
        department_id: DepartmentId,
        doctor_id: DoctorId,
        date: NaiveDate,
        time: NaiveTime,
        patient_name: String,
        phone: String,
        reply: &Reply,
    ) -> Result<StepOutcome, AvailabilityError> {
        if is_choice(reply, "reject") {
            return Ok(StepOutcome {
                next: SessionState::Done,
                prompt: Prompt::text("Booking cancelled."),
                booked: None,
            });
        }

        if is_choice(reply, "confirm") {
            let request = BookingRequest {
                user_id,
                doctor_id,
                date,
                time,
                patient_name: patient_name.clone(),
                phone: phone.clone(),
            };

            return match self.engine.commit_appointment(request) {
                Ok(appointment) => {
                    let prompt = self.summary_prompt(&appointment);
                    Ok(StepOutcome {
                        next: SessionState::Done,
                        prompt,
                        booked: Some(appointment),
                    })
                }
                Err(
                    AvailabilityError::SlotTaken { .. } | AvailabilityError::SlotOutsideGrid { .. },
                ) => {
                    warn!(
                        "Slot {} on {} for doctor {} went stale before commit, looping back",
                        time, date, doctor_id
                    );
                    let slots = self.engine.available_slots(doctor_id, date)?;
                    Ok(stay(
                        SessionState::SelectTime {
                            department_id,
                            doctor_id,
                            date,
                        },
                        self.times_prompt(
                            &slots,
                            Some("That slot was taken while you were confirming. Pick another time."),
                        ),
                    ))
                }
                Err(other) => Err(other),
            };
        }

        let prompt = self.confirm_prompt(
            doctor_id,
            date,
            time,
            &patient_name,
            &phone,
            Some("Use the buttons to confirm or cancel."),
        );
        Ok(stay(
            SessionState::Confirm {
                department_id,
                doctor_id,
                date,
                time,
                patient_name,
                phone,
            },
            prompt,
        ))
    }

    // ==========================================================================
    // PROMPT BUILDERS
    // ==========================================================================

    fn departments_prompt(&self, note: Option<&str>) -> Prompt {
        let choices = self
            .engine
            .list_departments()
            .into_iter()
            .map(|dept| Choice::new(format!("dept:{}", dept.id), dept.name))
            .collect();
        Prompt::with_choices(with_note("Choose a department:", note), choices)
    }

    fn doctors_prompt(&self, department_id: DepartmentId, note: Option<&str>) -> Prompt {
        let mut choices = self
            .engine
            .list_doctors(department_id)
            .into_iter()
            .map(|doc| Choice::new(format!("doctor:{}", doc.id), doc.name))
            .collect::<Vec<_>>();
        choices.push(Choice::new("back", "Back"));
        Prompt::with_choices(with_note("Choose a doctor:", note), choices)
    }

    fn dates_prompt(&self, doctor_id: DoctorId, note: Option<&str>) -> Prompt {
        let doctor_name = self
            .engine
            .catalog()
            .doctor(doctor_id)
            .map(|doc| doc.name.clone())
            .unwrap_or_default();
        let mut choices = self
            .booking_window()
            .into_iter()
            .map(|date| {
                Choice::new(
                    format!("date:{}", date.format("%Y-%m-%d")),
                    date.format("%d.%m.%Y (%a)").to_string(),
                )
            })
            .collect::<Vec<_>>();
        choices.push(Choice::new("back", "Back"));
        Prompt::with_choices(
            with_note(
                &format!("Doctor: {}\n\nChoose an appointment date:", doctor_name),
                note,
            ),
            choices,
        )
    }

    fn times_prompt(&self, slots: &[NaiveTime], note: Option<&str>) -> Prompt {
        let mut choices = slots
            .iter()
            .map(|time| {
                let label = time.format("%H:%M").to_string();
                Choice::new(format!("time:{}", label), label)
            })
            .collect::<Vec<_>>();
        choices.push(Choice::new("back", "Back"));
        Prompt::with_choices(with_note("Choose an appointment time:", note), choices)
    }

    fn name_prompt(&self, note: Option<&str>) -> Prompt {
        Prompt::text(with_note(
            "Enter the patient's full name:\n\nExample: John Michael Smith",
            note,
        ))
    }

    fn phone_prompt(&self, note: Option<&str>) -> Prompt {
        Prompt::text(with_note(
            "Enter a contact phone number:\n\nExample: +79161234567",
            note,
        ))
    }

    fn confirm_prompt(
        &self,
        doctor_id: DoctorId,
        date: NaiveDate,
        time: NaiveTime,
        patient_name: &str,
        phone: &str,
        note: Option<&str>,
    ) -> Prompt {
        let doctor_name = self
            .engine
            .catalog()
            .doctor(doctor_id)
            .map(|doc| doc.name.clone())
            .unwrap_or_default();
        let text = format!(
            "Please confirm the booking:\n\n\
             Doctor: {}\n\
             Date: {}\n\
             Time: {}\n\
             Patient: {}\n\
             Phone: {}",
            doctor_name,
            date.format("%d.%m.%Y"),
            time.format("%H:%M"),
            patient_name,
            phone,
        );
        Prompt::with_choices(
            with_note(&text, note),
            vec![
                Choice::new("confirm", "Confirm"),
                Choice::new("reject", "Cancel"),
            ],
        )
    }

    fn summary_prompt(&self, appointment: &Appointment) -> Prompt {
        let doctor_name = self
            .engine
            .catalog()
            .doctor(appointment.doctor_id)
            .map(|doc| doc.name.clone())
            .unwrap_or_default();
        Prompt::text(format!(
            "Booking #{} confirmed!\n\n\
             Doctor: {}\n\
             Date: {}\n\
             Time: {}\n\
             Patient: {}\n\n\
             Please arrive 10 minutes before your appointment.",
            appointment.id,
            doctor_name,
            appointment.date.format("%d.%m.%Y"),
            appointment.time.format("%H:%M"),
            appointment.patient_name,
        ))
    }
}

// ==============================================================================
// INPUT PARSING
// ==============================================================================

fn is_choice(reply: &Reply, id: &str) -> bool {
    matches!(reply, Reply::Choice(choice) if choice == id)
}

fn choice_value<'a>(reply: &'a Reply, prefix: &str) -> Option<&'a str> {
    match reply {
        Reply::Choice(id) => id.strip_prefix(prefix),
        Reply::Text(_) => None,
    }
}

fn parse_id(reply: &Reply, prefix: &str) -> Option<i64> {
    choice_value(reply, prefix)?.parse().ok()
}

fn parse_date(reply: &Reply) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(choice_value(reply, "date:")?, "%Y-%m-%d").ok()
}

fn parse_time(reply: &Reply) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(choice_value(reply, "time:")?, "%H:%M").ok()
}

fn is_valid_phone(text: &str) -> bool {
    let digits: String = text.chars().filter(|c| *c != '+' && *c != ' ').collect();
    digits.len() >= 10 && digits.chars().all(|c| c.is_ascii_digit())
}

fn with_note(base: &str, note: Option<&str>) -> String {
    match note {
        Some(note) => format!("{}\n\n{}", note, base),
        None => base.to_string(),
    }
}
