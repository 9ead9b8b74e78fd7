use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

fn env_u32(key: &str, default: u32) -> u32 {
    env_opt(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    env_opt(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub planner: PlannerConfig,
    pub storage: StorageConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    pub fn from_env() -> Self {
        Self {
            planner: PlannerConfig::from_env(),
            storage: StorageConfig::from_env(),
        }
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded:");
        tracing::info!(
            "  planner:  tick={}s, horizon={}d, snapshot_retries={}",
            self.planner.tick_interval_secs,
            self.planner.horizon_days,
            self.planner.snapshot_retries
        );
        tracing::info!(
            "  storage:  backend={}, data_dir={}",
            self.storage.backend,
            self.storage.data_dir.display()
        );
    }
}

// ── Planner ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannerConfig {
    /// Seconds between planner sweeps over active rules.
    pub tick_interval_secs: u64,
    /// How far ahead (in days) each sweep materializes occurrences.
    pub horizon_days: u32,
    /// How many times a sweep retries a rule after a calendar revision moved under it.
    pub snapshot_retries: u32,
}

impl PlannerConfig {
    fn from_env() -> Self {
        Self {
            tick_interval_secs: env_u64("PLANNER_TICK_SECS", 300),
            horizon_days: env_u32("PLANNER_HORIZON_DAYS", 30),
            snapshot_retries: env_u32("PLANNER_SNAPSHOT_RETRIES", 3),
        }
    }
}

// ── Storage ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// "memory" or "file"
    pub backend: String,
    pub data_dir: PathBuf,
}

impl StorageConfig {
    fn from_env() -> Self {
        Self {
            backend: env_or("STORAGE_BACKEND", "memory"),
            data_dir: PathBuf::from(env_or("DATA_DIR", "data")),
        }
    }
}
