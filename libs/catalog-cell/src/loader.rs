// libs/catalog-cell/src/loader.rs
use std::fs;
use std::path::Path;

use thiserror::Error;
use tracing::{debug, info};

use crate::models::{
    BreakHours, Catalog, CatalogFile, Department, Doctor, HourRange, WorkingHours,
};

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("failed to read catalog file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse catalog file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid hour value: {0}")]
    InvalidHour(String),

    #[error("working hours are empty ({start_hour}:00 to {end_hour}:00)")]
    EmptyWorkingDay { start_hour: u32, end_hour: u32 },

    #[error("break hours {start_hour}:00 to {end_hour}:00 fall outside the working day")]
    BreakOutsideWorkingDay { start_hour: u32, end_hour: u32 },

    #[error("doctor {doctor_id} references unknown department {department_id}")]
    UnknownDepartment {
        doctor_id: i64,
        department_id: i64,
    },
}

/// Load the catalog from `path`, materializing the default reference data on
/// first start when no file exists yet.
pub fn load(path: &Path) -> Result<Catalog, CatalogError> {
    let file = if path.exists() {
        debug!("Loading catalog from {}", path.display());
        let raw = fs::read_to_string(path)?;
        serde_json::from_str(&raw)?
    } else {
        info!("Catalog file {} not found, writing defaults", path.display());
        let defaults = default_catalog_file();
        fs::write(path, serde_json::to_string_pretty(&defaults)?)?;
        defaults
    };

    build(file)
}

/// Validate a raw catalog file and convert it into the runtime snapshot.
pub fn build(file: CatalogFile) -> Result<Catalog, CatalogError> {
    let working_hours = WorkingHours {
        start_hour: parse_hour(&file.working_hours.start)?,
        end_hour: parse_hour(&file.working_hours.end)?,
    };
    let break_hours = BreakHours {
        start_hour: parse_hour(&file.break_hours.start)?,
        end_hour: parse_hour(&file.break_hours.end)?,
    };

    if working_hours.start_hour >= working_hours.end_hour {
        return Err(CatalogError::EmptyWorkingDay {
            start_hour: working_hours.start_hour,
            end_hour: working_hours.end_hour,
        });
    }

    if break_hours.start_hour > break_hours.end_hour
        || break_hours.start_hour < working_hours.start_hour
        || break_hours.end_hour > working_hours.end_hour
    {
        return Err(CatalogError::BreakOutsideWorkingDay {
            start_hour: break_hours.start_hour,
            end_hour: break_hours.end_hour,
        });
    }

    for doctor in &file.doctors {
        if !file.departments.iter().any(|dept| dept.id == doctor.department_id) {
            return Err(CatalogError::UnknownDepartment {
                doctor_id: doctor.id,
                department_id: doctor.department_id,
            });
        }
    }

    info!(
        "Catalog loaded: {} departments, {} doctors, hours {}:00-{}:00",
        file.departments.len(),
        file.doctors.len(),
        working_hours.start_hour,
        working_hours.end_hour
    );

    Ok(Catalog::new(
        file.departments,
        file.doctors,
        working_hours,
        break_hours,
    ))
}

/// Parse the leading hour out of an "HH:MM" string. Minutes past the hour are
/// not honored by the slot grid and are rejected when non-zero.
fn parse_hour(raw: &str) -> Result<u32, CatalogError> {
    let invalid = || CatalogError::InvalidHour(raw.to_string());

    let (hour_part, minute_part) = raw.split_once(':').ok_or_else(invalid)?;
    let hour: u32 = hour_part.parse().map_err(|_| invalid())?;
    let minute: u32 = minute_part.parse().map_err(|_| invalid())?;

    if hour > 23 || minute != 0 {
        return Err(invalid());
    }

    Ok(hour)
}

/// Reference data seeded on first start.
pub fn default_catalog_file() -> CatalogFile {
    CatalogFile {
        departments: vec![
            Department { id: 1, name: "Therapy".to_string() },
            Department { id: 2, name: "Surgery".to_string() },
            Department { id: 3, name: "Neurology".to_string() },
            Department { id: 4, name: "Cardiology".to_string() },
            Department { id: 5, name: "Ophthalmology".to_string() },
        ],
        doctors: vec![
            Doctor { id: 1, name: "A. Ivanov".to_string(), department_id: 1 },
            Doctor { id: 2, name: "E. Petrova".to_string(), department_id: 1 },
            Doctor { id: 3, name: "V. Sidorov".to_string(), department_id: 2 },
            Doctor { id: 4, name: "K. Kozlova".to_string(), department_id: 3 },
            Doctor { id: 5, name: "D. Smirnov".to_string(), department_id: 4 },
        ],
        working_hours: HourRange {
            start: "09:00".to_string(),
            end: "18:00".to_string(),
        },
        break_hours: HourRange {
            start: "13:00".to_string(),
            end: "14:00".to_string(),
        },
    }
}
