// libs/availability-cell/src/models.rs
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use catalog_cell::DoctorId;

pub type UserId = i64;
pub type AppointmentId = i64;

/// A committed booking. Created only by a successful commit and immutable
/// afterwards; the id is assigned monotonically and never reused.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: AppointmentId,
    pub user_id: UserId,
    pub doctor_id: DoctorId,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub patient_name: String,
    pub phone: String,
    pub created_at: DateTime<Utc>,
}

impl Appointment {
    /// Start of the visit as a UTC timestamp.
    pub fn starts_at(&self) -> DateTime<Utc> {
        self.date.and_time(self.time).and_utc()
    }
}

/// Everything a commit needs; collected step by step during the dialogue.
#[derive(Debug, Clone)]
pub struct BookingRequest {
    pub user_id: UserId,
    pub doctor_id: DoctorId,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub patient_name: String,
    pub phone: String,
}

#[derive(Error, Debug)]
pub enum AvailabilityError {
    #[error("doctor {0} not found")]
    DoctorNotFound(DoctorId),

    #[error("slot {time} on {date} is outside the working grid")]
    SlotOutsideGrid { date: NaiveDate, time: NaiveTime },

    #[error("slot {time} on {date} is already booked for doctor {doctor_id}")]
    SlotTaken {
        doctor_id: DoctorId,
        date: NaiveDate,
        time: NaiveTime,
    },

    #[error("appointment store failure: {0}")]
    Store(String),
}
