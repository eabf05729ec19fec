use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use dotenv::dotenv;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod console;
mod reminders;

use availability_cell::{AvailabilityService, JsonFileStore};
use session_cell::{ConversationChannel, ReminderScheduler, SessionService, SystemClock};
use shared_config::AppConfig;

use console::ConsoleChannel;
use reminders::TokioReminderScheduler;

// The console transport serves a single operator.
const CONSOLE_USER: i64 = 1;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Loading Env Vars
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting medbook booking bot");

    // Load configuration and reference data
    let config = AppConfig::from_env();
    let catalog = Arc::new(
        catalog_cell::load(Path::new(&config.catalog_path)).context("failed to load catalog")?,
    );

    // Availability engine over the persistent appointment store
    let store = Arc::new(JsonFileStore::new(&config.store_path));
    let engine = Arc::new(
        AvailabilityService::new(catalog, store)
            .context("failed to build availability engine")?,
    );

    // Conversation channel, reminder scheduler, session machine
    let console = Arc::new(ConsoleChannel::new());
    let channel: Arc<dyn ConversationChannel> = console.clone();
    let scheduler: Arc<dyn ReminderScheduler> =
        Arc::new(TokioReminderScheduler::new(Arc::clone(&channel)));
    let sessions = Arc::new(SessionService::new(
        engine,
        channel,
        scheduler,
        Arc::new(SystemClock),
        config.session_idle_timeout(),
    ));

    // Idle-session reaper
    tokio::spawn(Arc::clone(&sessions).run_reaper(config.reaper_interval()));

    sessions.send_welcome(CONSOLE_USER).await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        let result = match input {
            "/start" => sessions.send_welcome(CONSOLE_USER).await,
            "/record" => sessions.start_booking(CONSOLE_USER).await,
            "/my_records" => sessions.send_user_appointments(CONSOLE_USER).await,
            "/departments" => sessions.send_departments(CONSOLE_USER).await,
            "/quit" => break,
            _ => {
                let reply = console.interpret(CONSOLE_USER, input).await;
                sessions.handle_input(CONSOLE_USER, reply).await
            }
        };

        if let Err(e) = result {
            warn!("Input handling failed: {}", e);
        }
    }

    info!("Booking bot stopped");
    Ok(())
}
