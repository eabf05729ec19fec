// libs/availability-cell/src/store.rs
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use thiserror::Error;
use tracing::debug;

use crate::models::Appointment;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store I/O failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("store serialization failure: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Append-only persistence for committed appointments. Callers serialize
/// access through the engine's critical section, so implementations only
/// need to be internally consistent, not concurrent.
pub trait AppointmentStore: Send + Sync {
    /// Every record persisted so far, in append order.
    fn load(&self) -> Result<Vec<Appointment>, StoreError>;

    fn append(&self, appointment: &Appointment) -> Result<(), StoreError>;
}

/// Whole-file JSON store. Each append rewrites the file with the full record
/// list, which keeps the format trivially inspectable at this scale.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl AppointmentStore for JsonFileStore {
    fn load(&self) -> Result<Vec<Appointment>, StoreError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let raw = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    fn append(&self, appointment: &Appointment) -> Result<(), StoreError> {
        let mut records = self.load()?;
        records.push(appointment.clone());
        fs::write(&self.path, serde_json::to_string_pretty(&records)?)?;
        debug!(
            "Persisted appointment {} ({} records total)",
            appointment.id,
            records.len()
        );
        Ok(())
    }
}

/// In-process store for tests and ephemeral runs.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<Vec<Appointment>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AppointmentStore for MemoryStore {
    fn load(&self) -> Result<Vec<Appointment>, StoreError> {
        Ok(self.records.lock().expect("store mutex poisoned").clone())
    }

    fn append(&self, appointment: &Appointment) -> Result<(), StoreError> {
        self.records
            .lock()
            .expect("store mutex poisoned")
            .push(appointment.clone());
        Ok(())
    }
}
