//! File-backed rule repository with write-back.
//!
//! One JSON file per rule under the configured directory, mirrored by an
//! in-memory map for reads. The directory is scanned once on startup;
//! unreadable files are skipped with a warning rather than failing the whole
//! load. Writes go through a temp file and rename so a crash mid-write never
//! leaves a truncated record.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{info, warn};

use sweeply_core::RuleId;
use sweeply_recurrence::schema::{RecurrenceRule, RuleStatus};
use sweeply_recurrence::traits::{Page, RepositoryError, RuleFilter, RuleRepository};

use crate::error::StoreError;

pub struct FileRuleRepository {
    dir: PathBuf,
    rules: Arc<RwLock<HashMap<RuleId, RecurrenceRule>>>,
}

impl FileRuleRepository {
    /// Open (or create) the rules directory and load every stored rule.
    pub fn new(dir: &Path) -> Result<Self, StoreError> {
        std::fs::create_dir_all(dir)?;
        if !dir.is_dir() {
            return Err(StoreError::NotADirectory(dir.display().to_string()));
        }

        let rules = load_all(dir)?;
        info!(path = %dir.display(), count = rules.len(), "file rule repository initialized");

        Ok(Self {
            dir: dir.to_path_buf(),
            rules: Arc::new(RwLock::new(rules)),
        })
    }

    fn rule_path(&self, id: RuleId) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }

    fn write_rule(&self, rule: &RecurrenceRule) -> Result<(), StoreError> {
        let path = self.rule_path(rule.id);
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_vec_pretty(rule)?;
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }
}

#[async_trait]
impl RuleRepository for FileRuleRepository {
    async fn save(&self, rule: &RecurrenceRule) -> Result<(), RepositoryError> {
        let mut map = self.rules.write().await;
        self.write_rule(rule).map_err(RepositoryError::from)?;
        map.insert(rule.id, rule.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: RuleId) -> Result<Option<RecurrenceRule>, RepositoryError> {
        Ok(self.rules.read().await.get(&id).cloned())
    }

    async fn list(
        &self,
        filter: &RuleFilter,
        page: Page,
    ) -> Result<Vec<RecurrenceRule>, RepositoryError> {
        let map = self.rules.read().await;
        let mut rules: Vec<_> = map.values().filter(|r| filter.matches(r)).cloned().collect();
        rules.sort_by_key(|r| (r.created_at, r.id));
        Ok(rules.into_iter().skip(page.offset).take(page.limit).collect())
    }

    async fn delete(&self, id: RuleId) -> Result<bool, RepositoryError> {
        let mut map = self.rules.write().await;
        let Some(rule) = map.get_mut(&id) else {
            return Ok(false);
        };
        rule.status = RuleStatus::Cancelled;
        rule.next_execution = None;
        rule.updated_at = Utc::now();
        let rule = rule.clone();
        self.write_rule(&rule).map_err(RepositoryError::from)?;
        info!(rule_id = %id, "rule soft-deleted (cancelled)");
        Ok(true)
    }
}

/// Scan the directory (flat) and load every `.json` rule file.
fn load_all(dir: &Path) -> Result<HashMap<RuleId, RecurrenceRule>, StoreError> {
    let mut rules = HashMap::new();

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }

        match load_rule_file(&path) {
            Ok(rule) => {
                rules.insert(rule.id, rule);
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping unreadable rule file");
            }
        }
    }

    Ok(rules)
}

fn load_rule_file(path: &Path) -> Result<RecurrenceRule, StoreError> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

// ── Tests ───────────────────────────────────────────────────────────
