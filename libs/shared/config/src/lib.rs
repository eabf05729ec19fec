use std::env;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub catalog_path: String,
    pub store_path: String,
    pub session_idle_minutes: u64,
    pub reaper_interval_seconds: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            catalog_path: env::var("MEDBOOK_CATALOG_PATH")
                .unwrap_or_else(|_| {
                    warn!("MEDBOOK_CATALOG_PATH not set, using catalog.json");
                    "catalog.json".to_string()
                }),
            store_path: env::var("MEDBOOK_STORE_PATH")
                .unwrap_or_else(|_| {
                    warn!("MEDBOOK_STORE_PATH not set, using appointments.json");
                    "appointments.json".to_string()
                }),
            session_idle_minutes: parse_var("MEDBOOK_SESSION_IDLE_MINUTES", 30),
            reaper_interval_seconds: parse_var("MEDBOOK_REAPER_INTERVAL_SECONDS", 60),
        }
    }

    pub fn session_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.session_idle_minutes * 60)
    }

    pub fn reaper_interval(&self) -> Duration {
        Duration::from_secs(self.reaper_interval_seconds)
    }
}

fn parse_var(name: &str, default: u64) -> u64 {
    match env::var(name) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("{} is not a number, using {}", name, default);
            default
        }),
        Err(_) => default,
    }
}
