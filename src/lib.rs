pub mod angles;
pub mod capture;
pub mod comparison;
pub mod db;
pub mod error;
pub mod landmarks;
pub mod models;
pub mod progress;
pub mod replay;
pub mod settings;
pub mod store;
pub mod utils;

use std::{env, fs, path::PathBuf, sync::Arc};

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use log::{info, warn};

use capture::CaptureController;
use db::Database;
use models::SessionStatus;
use progress::ProgressTracker;
use replay::{replay, ReplayScript};
use settings::SettingsStore;

pub use error::CaptureError;

const DEFAULT_DB_PATH: &str = "romtrack.sqlite3";
const DEFAULT_SETTINGS_PATH: &str = "romtrack-settings.json";

/// Install the `env_logger` backend. `RUST_LOG` overrides the default `info`.
pub fn init_logging() {
    let _ = env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .try_init();
}

fn env_path(key: &str, default: &str) -> PathBuf {
    env::var_os(key)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(default))
}

/// Sessions still marked active belong to a run that never finished.
async fn recover_interrupted_sessions(db: &Database, user_id: &str) -> Result<()> {
    for mut session in db.list_active_sessions(user_id).await? {
        warn!(
            "Recovered interrupted session {}; marking as Cancelled",
            session.id
        );
        session.status = SessionStatus::Cancelled;
        session.ended_at = Some(Utc::now());
        db.finish_session(&session, &[]).await?;
    }
    Ok(())
}

/// Replay the JSON script named on the command line and print the outcome.
pub fn run() -> Result<()> {
    init_logging();

    let script_path = env::args()
        .nth(1)
        .ok_or_else(|| anyhow!("usage: romtrack <replay-script.json>"))?;
    let contents = fs::read_to_string(&script_path)
        .with_context(|| format!("Failed to read replay script {script_path}"))?;
    let script = ReplayScript::from_json(&contents)?;

    let settings = SettingsStore::new(env_path("ROMTRACK_SETTINGS", DEFAULT_SETTINGS_PATH))?;
    let engine = settings.settings();
    engine.clinical.validate()?;

    let runtime = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
    runtime.block_on(async move {
        let database = Database::new(env_path("ROMTRACK_DB", DEFAULT_DB_PATH))?;
        recover_interrupted_sessions(&database, &script.user_id).await?;

        let store = Arc::new(database);
        let tracker = ProgressTracker::new(
            store.clone(),
            engine.clinical.comparison_table(),
            engine.progress.clone(),
        );
        let controller = CaptureController::new(store, engine.clinical);

        info!(
            "Replaying {} phase(s) for {}",
            script.steps.len(),
            script.user_id
        );
        let outcome = replay(&controller, &tracker, &script).await?;

        println!("{}", serde_json::to_string_pretty(&outcome)?);
        Ok(())
    })
}
