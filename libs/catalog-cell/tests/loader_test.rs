use std::fs;

use assert_matches::assert_matches;
use tempfile::tempdir;

use catalog_cell::{
    build, default_catalog_file, load, CatalogError, CatalogFile, Department, Doctor, HourRange,
};

fn small_catalog_file() -> CatalogFile {
    CatalogFile {
        departments: vec![Department {
            id: 1,
            name: "Therapy".to_string(),
        }],
        doctors: vec![Doctor {
            id: 1,
            name: "A. Ivanov".to_string(),
            department_id: 1,
        }],
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

#[test]
fn missing_file_materializes_defaults() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("catalog.json");

    let catalog = load(&path).unwrap();

    assert!(path.exists(), "defaults should be written on first start");
    assert_eq!(catalog.departments().len(), 5);
    assert_eq!(catalog.working_hours().start_hour, 9);
    assert_eq!(catalog.working_hours().end_hour, 18);
    assert_eq!(catalog.break_hours().start_hour, 13);
    // Ophthalmology has no doctors in the default data set.
    assert!(catalog.doctors_in_department(5).is_empty());
    assert_eq!(catalog.doctors_in_department(1).len(), 2);

    // The written file loads back identically.
    let reloaded = load(&path).unwrap();
    assert_eq!(reloaded.departments(), catalog.departments());
}

#[test]
fn loads_existing_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("catalog.json");
    fs::write(
        &path,
        serde_json::to_string_pretty(&small_catalog_file()).unwrap(),
    )
    .unwrap();

    let catalog = load(&path).unwrap();

    assert_eq!(catalog.departments().len(), 1);
    assert_eq!(catalog.doctor(1).unwrap().name, "A. Ivanov");
    assert_eq!(catalog.department(1).unwrap().name, "Therapy");
    assert!(catalog.doctor(2).is_none());
}

#[test]
fn rejects_dangling_department_reference() {
    let mut file = small_catalog_file();
    file.doctors[0].department_id = 9;

    assert_matches!(
        build(file),
        Err(CatalogError::UnknownDepartment {
            doctor_id: 1,
            department_id: 9,
        })
    );
}

#[test]
fn rejects_malformed_hour_strings() {
    let mut file = small_catalog_file();
    file.working_hours.start = "9am".to_string();
    assert_matches!(build(file), Err(CatalogError::InvalidHour(_)));

    let mut file = small_catalog_file();
    file.break_hours.start = "13:30".to_string();
    assert_matches!(build(file), Err(CatalogError::InvalidHour(_)));

    let mut file = small_catalog_file();
    file.working_hours.end = "25:00".to_string();
    assert_matches!(build(file), Err(CatalogError::InvalidHour(_)));
}

#[test]
fn rejects_empty_working_day() {
    let mut file = small_catalog_file();
    file.working_hours.start = "18:00".to_string();
    file.working_hours.end = "09:00".to_string();
    // Break bounds are checked after the working window itself.
    file.break_hours.start = "18:00".to_string();
    file.break_hours.end = "18:00".to_string();

    assert_matches!(build(file), Err(CatalogError::EmptyWorkingDay { .. }));
}

#[test]
fn rejects_break_outside_working_day() {
    let mut file = small_catalog_file();
    file.break_hours.start = "08:00".to_string();

    assert_matches!(build(file), Err(CatalogError::BreakOutsideWorkingDay { .. }));
}

#[test]
fn validates_default_data() {
    let catalog = build(default_catalog_file()).unwrap();
    for doctor in (1..=5).filter_map(|id| catalog.doctor(id)) {
        assert!(catalog.department(doctor.department_id).is_some());
    }
}
