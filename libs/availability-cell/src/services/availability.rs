// libs/availability-cell/src/services/availability.rs
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

use chrono::{NaiveDate, NaiveTime, Utc};
use tracing::{debug, info, warn};

use catalog_cell::{Catalog, Department, DepartmentId, Doctor, DoctorId};

use crate::models::{Appointment, AppointmentId, AvailabilityError, BookingRequest, UserId};
use crate::store::AppointmentStore;

/// The slot-availability engine. Holds the shared schedule for every doctor:
/// an append-only arena of committed appointments plus a per-(doctor, date)
/// index of taken times for O(1) conflict lookups. All mutation happens
/// inside one critical section, so a commit's check-then-append is atomic
/// across concurrent sessions.
pub struct AvailabilityService {
    catalog: Arc<Catalog>,
    store: Arc<dyn AppointmentStore>,
    ledger: Mutex<AppointmentLedger>,
}

struct AppointmentLedger {
    appointments: Vec<Appointment>,
    taken: HashMap<(DoctorId, NaiveDate), BTreeSet<NaiveTime>>,
    next_id: AppointmentId,
}

impl AppointmentLedger {
    fn from_records(records: Vec<Appointment>) -> Self {
        let mut ledger = Self {
            appointments: Vec::with_capacity(records.len()),
            taken: HashMap::new(),
            next_id: records.iter().map(|apt| apt.id).max().unwrap_or(0) + 1,
        };
        for record in records {
            ledger.insert(record);
        }
        ledger
    }

    fn insert(&mut self, appointment: Appointment) {
        self.taken
            .entry((appointment.doctor_id, appointment.date))
            .or_default()
            .insert(appointment.time);
        self.appointments.push(appointment);
    }

    fn is_taken(&self, doctor_id: DoctorId, date: NaiveDate, time: NaiveTime) -> bool {
        self.taken
            .get(&(doctor_id, date))
            .is_some_and(|times| times.contains(&time))
    }
}

impl AvailabilityService {
    /// Build the engine over a catalog and a store, replaying persisted
    /// records so a restarted process resumes with correct conflict state
    /// and keeps ids monotonic.
    pub fn new(
        catalog: Arc<Catalog>,
        store: Arc<dyn AppointmentStore>,
    ) -> Result<Self, AvailabilityError> {
        let records = store
            .load()
            .map_err(|e| AvailabilityError::Store(e.to_string()))?;
        info!("Availability engine loaded {} existing appointments", records.len());

        Ok(Self {
            catalog,
            store,
            ledger: Mutex::new(AppointmentLedger::from_records(records)),
        })
    }

    /// Departments in catalog order.
    pub fn list_departments(&self) -> Vec<Department> {
        self.catalog.departments().to_vec()
    }

    /// Doctors of one department; an empty result is valid, not an error.
    pub fn list_doctors(&self, department_id: DepartmentId) -> Vec<Doctor> {
        self.catalog
            .doctors_in_department(department_id)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn get_doctor(&self, doctor_id: DoctorId) -> Result<Doctor, AvailabilityError> {
        self.catalog
            .doctor(doctor_id)
            .cloned()
            .ok_or(AvailabilityError::DoctorNotFound(doctor_id))
    }

    /// The full bookable grid for any day: every :00 and :30 inside working
    /// hours, skipping the break. Pure and deterministic.
    pub fn slot_grid(&self) -> Vec<NaiveTime> {
        let working = self.catalog.working_hours();
        let break_hours = self.catalog.break_hours();

        let mut slots = Vec::new();
        for hour in working.start_hour..working.end_hour {
            if break_hours.covers(hour) {
                continue;
            }
            for minute in [0, 30] {
                // Hours were bounds-checked at catalog load.
                slots.push(NaiveTime::from_hms_opt(hour, minute, 0).unwrap());
            }
        }
        slots
    }

    /// Free slots for a doctor on a date: the grid minus already-booked
    /// times. Recomputed on every call; an unknown doctor is an error while
    /// a fully-booked date is an empty, valid result.
    pub fn available_slots(
        &self,
        doctor_id: DoctorId,
        date: NaiveDate,
    ) -> Result<Vec<NaiveTime>, AvailabilityError> {
        self.get_doctor(doctor_id)?;

        let ledger = self.ledger.lock().expect("ledger mutex poisoned");
        let slots = self
            .slot_grid()
            .into_iter()
            .filter(|time| !ledger.is_taken(doctor_id, date, *time))
            .collect::<Vec<_>>();

        debug!(
            "{} free slots for doctor {} on {}",
            slots.len(),
            doctor_id,
            date
        );
        Ok(slots)
    }

    /// Validate and persist a new appointment as one atomic unit. The slot
    /// is re-checked under the lock, so a selection that went stale during
    /// the dialogue surfaces as `SlotTaken` instead of a double booking.
    pub fn commit_appointment(
        &self,
        request: BookingRequest,
    ) -> Result<Appointment, AvailabilityError> {
        self.get_doctor(request.doctor_id)?;

        if !self.slot_grid().contains(&request.time) {
            return Err(AvailabilityError::SlotOutsideGrid {
                date: request.date,
                time: request.time,
            });
        }

        let mut ledger = self.ledger.lock().expect("ledger mutex poisoned");

        if ledger.is_taken(request.doctor_id, request.date, request.time) {
            warn!(
                "Commit conflict: doctor {} already has {} on {}",
                request.doctor_id, request.time, request.date
            );
            return Err(AvailabilityError::SlotTaken {
                doctor_id: request.doctor_id,
                date: request.date,
                time: request.time,
            });
        }

        let appointment = Appointment {
            id: ledger.next_id,
            user_id: request.user_id,
            doctor_id: request.doctor_id,
            date: request.date,
            time: request.time,
            patient_name: request.patient_name,
            phone: request.phone,
            created_at: Utc::now(),
        };

        // Persist before touching the ledger: a failed append must leave the
        // in-memory schedule unchanged.
        self.store
            .append(&appointment)
            .map_err(|e| AvailabilityError::Store(e.to_string()))?;

        ledger.next_id += 1;
        ledger.insert(appointment.clone());

        info!(
            "Appointment {} committed: doctor {} on {} at {}",
            appointment.id, appointment.doctor_id, appointment.date, appointment.time
        );
        Ok(appointment)
    }

    /// All appointments of one user, ascending by (date, time).
    pub fn user_appointments(&self, user_id: UserId) -> Vec<Appointment> {
        let ledger = self.ledger.lock().expect("ledger mutex poisoned");
        let mut appointments = ledger
            .appointments
            .iter()
            .filter(|apt| apt.user_id == user_id)
            .cloned()
            .collect::<Vec<_>>();
        appointments.sort_by_key(|apt| (apt.date, apt.time));
        appointments
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }
}
