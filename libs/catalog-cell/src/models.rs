// libs/catalog-cell/src/models.rs
use serde::{Deserialize, Serialize};

pub type DepartmentId = i64;
pub type DoctorId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
    pub id: DepartmentId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Doctor {
    pub id: DoctorId,
    pub name: String,
    pub department_id: DepartmentId,
}

/// Daily working window, whole-hour bounds. Slots run from `start_hour`
/// (inclusive) to `end_hour` (exclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkingHours {
    pub start_hour: u32,
    pub end_hour: u32,
}

/// Mid-day break, whole-hour bounds. Slots whose hour falls in
/// `[start_hour, end_hour)` are not bookable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakHours {
    pub start_hour: u32,
    pub end_hour: u32,
}

impl BreakHours {
    pub fn covers(&self, hour: u32) -> bool {
        self.start_hour <= hour && hour < self.end_hour
    }
}

/// Read-only reference data snapshot, loaded once at startup and shared by
/// every session. Construction goes through the loader so the invariants
/// (valid hour bounds, doctors referencing existing departments) hold for
/// the lifetime of the process.
#[derive(Debug, Clone)]
pub struct Catalog {
    departments: Vec<Department>,
    doctors: Vec<Doctor>,
    working_hours: WorkingHours,
    break_hours: BreakHours,
}

impl Catalog {
    pub(crate) fn new(
        departments: Vec<Department>,
        doctors: Vec<Doctor>,
        working_hours: WorkingHours,
        break_hours: BreakHours,
    ) -> Self {
        Self {
            departments,
            doctors,
            working_hours,
            break_hours,
        }
    }

    /// Departments in the order the catalog file lists them.
    pub fn departments(&self) -> &[Department] {
        &self.departments
    }

    pub fn department(&self, id: DepartmentId) -> Option<&Department> {
        self.departments.iter().find(|dept| dept.id == id)
    }

    pub fn doctors_in_department(&self, department_id: DepartmentId) -> Vec<&Doctor> {
        self.doctors
            .iter()
            .filter(|doc| doc.department_id == department_id)
            .collect()
    }

    pub fn doctor(&self, id: DoctorId) -> Option<&Doctor> {
        self.doctors.iter().find(|doc| doc.id == id)
    }

    pub fn working_hours(&self) -> WorkingHours {
        self.working_hours
    }

    pub fn break_hours(&self) -> BreakHours {
        self.break_hours
    }
}

// ==============================================================================
// FILE REPRESENTATION
// ==============================================================================

/// On-disk hour range, kept as "HH:MM" strings to match the reference data
/// files this service inherits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HourRange {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogFile {
    pub departments: Vec<Department>,
    pub doctors: Vec<Doctor>,
    pub working_hours: HourRange,
    pub break_hours: HourRange,
}
