// libs/session-cell/src/models.rs
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use thiserror::Error;

use availability_cell::{AppointmentId, AvailabilityError, UserId};
use catalog_cell::{DepartmentId, DoctorId};

/// Where a user currently stands in the booking dialogue. Each variant
/// carries exactly the selections made so far, so a later-step field cannot
/// exist without the earlier ones it depends on, and stepping back drops the
/// dependent fields by construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    SelectDepartment,
    SelectDoctor {
        department_id: DepartmentId,
    },
    SelectDate {
        department_id: DepartmentId,
        doctor_id: DoctorId,
    },
    SelectTime {
        department_id: DepartmentId,
        doctor_id: DoctorId,
        date: NaiveDate,
    },
    EnterName {
        department_id: DepartmentId,
        doctor_id: DoctorId,
        date: NaiveDate,
        time: NaiveTime,
    },
    EnterPhone {
        department_id: DepartmentId,
        doctor_id: DoctorId,
        date: NaiveDate,
        time: NaiveTime,
        patient_name: String,
    },
    Confirm {
        department_id: DepartmentId,
        doctor_id: DoctorId,
        date: NaiveDate,
        time: NaiveTime,
        patient_name: String,
        phone: String,
    },
    Done,
}

/// One user's in-progress dialogue. Transient: never persisted, discarded on
/// completion, cancellation, or idle eviction.
#[derive(Debug, Clone)]
pub struct BookingSession {
    pub user_id: UserId,
    pub state: SessionState,
    pub last_activity: DateTime<Utc>,
}

/// Input delivered by the conversation channel: either a discrete choice
/// selection or free-form text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Choice(String),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    pub id: String,
    pub label: String,
}

impl Choice {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }
}

/// Outgoing message: text plus the choices the user may tap. Free-text steps
/// carry no choices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub text: String,
    pub choices: Vec<Choice>,
}

impl Prompt {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            choices: Vec::new(),
        }
    }

    pub fn with_choices(text: impl Into<String>, choices: Vec<Choice>) -> Self {
        Self {
            text: text.into(),
            choices,
        }
    }
}

/// What the reminder scheduler is handed on a successful commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderPayload {
    pub user_id: UserId,
    pub appointment_id: AppointmentId,
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Channel(#[from] ChannelError),

    #[error("availability engine failure: {0}")]
    Engine(#[from] AvailabilityError),
}

#[derive(Error, Debug)]
#[error("conversation channel failure: {0}")]
pub struct ChannelError(pub String);
