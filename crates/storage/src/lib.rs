//! Storage backends for the scheduling core.
//!
//! Implements the repository/calendar collaborator traits from
//! `sweeply-recurrence`: an in-memory backend for tests and dev, and a
//! JSON-file write-back backend for durable local state. The backend is
//! selected from config.

pub mod error;
pub mod file;
pub mod memory;

use std::sync::Arc;

use tracing::info;

pub use error::StoreError;
pub use file::FileRuleRepository;
pub use memory::{InMemoryRuleRepository, InMemoryTeamCalendar};

use sweeply_recurrence::traits::RuleRepository;

/// Config-selected storage wiring: a rule repository plus the local team
/// calendar (which also acts as the appointment factory).
pub struct ScheduleStore {
    pub repository: Arc<dyn RuleRepository>,
    pub calendar: Arc<InMemoryTeamCalendar>,
}

impl ScheduleStore {
    /// Build storage from config. `STORAGE_BACKEND=memory|file`.
    pub fn from_config(config: &sweeply_core::Config) -> Result<Self, StoreError> {
        let repository: Arc<dyn RuleRepository> = match config.storage.backend.as_str() {
            "memory" => Arc::new(InMemoryRuleRepository::new()),
            "file" => {
                let dir = config.storage.data_dir.join("rules");
                Arc::new(FileRuleRepository::new(&dir)?)
            }
            other => {
                return Err(StoreError::Other(format!(
                    "unknown storage backend: '{}' (expected 'memory' or 'file')",
                    other
                )))
            }
        };

        info!(backend = %config.storage.backend, "schedule store initialized");
        Ok(Self {
            repository,
            calendar: Arc::new(InMemoryTeamCalendar::new()),
        })
    }
}
