//! Service façade over the scheduling components.
//!
//! `RecurrenceService` owns no I/O of its own: persistence and team calendars
//! arrive as injected collaborators at construction. Mutating operations on
//! the same rule are serialized through a per-rule async lock, because
//! `next_execution` is derived from `last_execution` and racing writers could
//! duplicate or skip occurrences. Every operation leaves a trail in the
//! audit log.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use sweeply_core::RuleId;

use crate::audit_log::{AuditLog, LogLevel, SchedulingPhase};
use crate::conflict::{ConflictChecker, PlannedVisit};
use crate::error::RecurrenceError;
use crate::generator;
use crate::lifecycle;
use crate::schema::{NewRule, Occurrence, RecurrenceRule, RuleStatus};
use crate::tracker;
use crate::traits::{Page, ProviderError, RuleFilter, RuleRepository, TeamCalendarProvider};
use crate::validation::validate_new_rule;

/// Default number of optimistic re-checks when a team calendar moves during
/// planning.
const DEFAULT_SNAPSHOT_RETRIES: u32 = 3;

pub struct RecurrenceService {
    repository: Arc<dyn RuleRepository>,
    calendar: Arc<dyn TeamCalendarProvider>,
    audit: Arc<AuditLog>,
    locks: Mutex<HashMap<RuleId, Arc<Mutex<()>>>>,
    snapshot_retries: u32,
}

impl RecurrenceService {
    pub fn new(
        repository: Arc<dyn RuleRepository>,
        calendar: Arc<dyn TeamCalendarProvider>,
    ) -> Self {
        Self {
            repository,
            calendar,
            audit: Arc::new(AuditLog::new()),
            locks: Mutex::new(HashMap::new()),
            snapshot_retries: DEFAULT_SNAPSHOT_RETRIES,
        }
    }

    pub fn with_snapshot_retries(mut self, retries: u32) -> Self {
        self.snapshot_retries = retries;
        self
    }

    /// Per-rule scheduling history, for dashboard display.
    pub fn audit_log(&self) -> Arc<AuditLog> {
        self.audit.clone()
    }

    // ── Create / read ───────────────────────────────────────────────

    /// Validate and persist a new rule.
    ///
    /// The rule starts `active` with `next_execution` seeded from the first
    /// series occurrence, so dashboards can show the upcoming visit without
    /// recomputing it.
    pub async fn create(&self, new: NewRule) -> Result<RecurrenceRule, RecurrenceError> {
        let result = validate_new_rule(&new);
        if !result.valid {
            warn!(
                company_id = %new.company_id,
                violations = result.errors.len(),
                "rule creation rejected"
            );
            return Err(RecurrenceError::InvalidRule(result.errors));
        }

        let now = Utc::now();
        let mut rule = RecurrenceRule::from_new(new, now);
        rule.next_execution = generator::first_in_series(&rule).map(|o| o.scheduled_start);

        for warning in &result.warnings {
            self.audit.log(
                rule.id,
                LogLevel::Warning,
                SchedulingPhase::Validation,
                format!("{}: {}", warning.path, warning.message),
            );
        }

        self.repository.save(&rule).await?;
        self.audit.log(
            rule.id,
            LogLevel::Info,
            SchedulingPhase::Persistence,
            format!("rule created ({} {})", rule.frequency, rule.service_type),
        );
        info!(rule_id = %rule.id, frequency = %rule.frequency, "rule created");
        Ok(rule)
    }

    pub async fn get(&self, rule_id: RuleId) -> Result<RecurrenceRule, RecurrenceError> {
        self.load(rule_id).await
    }

    pub async fn list(
        &self,
        filter: &RuleFilter,
        page: Page,
    ) -> Result<Vec<RecurrenceRule>, RecurrenceError> {
        Ok(self.repository.list(filter, page).await?)
    }

    // ── Lifecycle ───────────────────────────────────────────────────

    pub async fn pause(&self, rule_id: RuleId) -> Result<RecurrenceRule, RecurrenceError> {
        self.transition(rule_id, RuleStatus::Paused).await
    }

    /// Resume a paused rule. Completion is re-evaluated on resume, so a rule
    /// whose series was exhausted while paused moves straight to `completed`.
    pub async fn resume(&self, rule_id: RuleId) -> Result<RecurrenceRule, RecurrenceError> {
        self.transition(rule_id, RuleStatus::Active).await
    }

    /// Cancel a rule. Terminal and soft: the record is kept and historical
    /// occurrences already materialized stay untouched.
    pub async fn cancel(&self, rule_id: RuleId) -> Result<RecurrenceRule, RecurrenceError> {
        self.transition(rule_id, RuleStatus::Cancelled).await
    }

    async fn transition(
        &self,
        rule_id: RuleId,
        target: RuleStatus,
    ) -> Result<RecurrenceRule, RecurrenceError> {
        let lock = self.rule_lock(rule_id).await;
        let _guard = lock.lock().await;

        let mut rule = self.load(rule_id).await?;
        let from = rule.status;
        let now = Utc::now();

        if let Err(err) = lifecycle::apply_transition(&mut rule, target, now) {
            self.audit.log(
                rule_id,
                LogLevel::Warning,
                SchedulingPhase::Transition,
                format!("rejected: {} -> {}", from, target),
            );
            return Err(err);
        }

        let auto_completed =
            target == RuleStatus::Active && lifecycle::evaluate_completion(&mut rule, now);

        self.repository.save(&rule).await?;
        self.audit.log(
            rule_id,
            LogLevel::Info,
            SchedulingPhase::Transition,
            format!("{} -> {}", from, rule.status),
        );
        if auto_completed {
            info!(rule_id = %rule_id, "rule completed on resume; series exhausted");
        }
        if rule.is_terminal() {
            self.release_lock(rule_id).await;
        }
        Ok(rule)
    }

    // ── Occurrences ─────────────────────────────────────────────────

    /// Occurrences of an active rule within the window. Paused and terminal
    /// rules yield an empty sequence.
    pub async fn list_occurrences(
        &self,
        rule_id: RuleId,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<Vec<Occurrence>, RecurrenceError> {
        let rule = self.load(rule_id).await?;
        Ok(generator::generate(&rule, window_start, window_end))
    }

    /// Plan a window: generate candidates and conflict-check each against
    /// the assigned team's calendar.
    ///
    /// The snapshot is revisioned; if the calendar mutates between snapshot
    /// and re-check the whole batch is re-checked, up to the configured retry
    /// budget. A conflict on one candidate never blocks the others.
    pub async fn plan_window(
        &self,
        rule_id: RuleId,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<Vec<PlannedVisit>, RecurrenceError> {
        let rule = self.load(rule_id).await?;
        let candidates = generator::generate(&rule, window_start, window_end);
        self.audit.log(
            rule_id,
            LogLevel::Debug,
            SchedulingPhase::Generation,
            format!("{} candidates in window", candidates.len()),
        );
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let mut attempts = 0;
        loop {
            let snapshot = self
                .calendar
                .snapshot(rule.team_id, window_start, window_end)
                .await
                .map_err(map_provider_error)?;
            let planned = ConflictChecker::check_batch(&candidates, &snapshot);

            let current = self
                .calendar
                .revision(rule.team_id)
                .await
                .map_err(map_provider_error)?;
            if current == snapshot.revision {
                let conflicts = planned.iter().filter(|p| !p.outcome.is_accepted()).count();
                let level = if conflicts > 0 {
                    LogLevel::Warning
                } else {
                    LogLevel::Info
                };
                self.audit.log_with_details(
                    rule_id,
                    level,
                    SchedulingPhase::ConflictCheck,
                    format!("{} accepted, {} conflicts", planned.len() - conflicts, conflicts),
                    Some(serde_json::json!({
                        "revision": snapshot.revision,
                        "candidates": planned.len(),
                        "conflicts": conflicts,
                    })),
                );
                return Ok(planned);
            }

            attempts += 1;
            if attempts > self.snapshot_retries {
                self.audit.log(
                    rule_id,
                    LogLevel::Error,
                    SchedulingPhase::ConflictCheck,
                    "calendar kept changing; planning aborted",
                );
                return Err(RecurrenceError::Conflict(format!(
                    "team {} calendar changed {} times during planning",
                    rule.team_id, attempts
                )));
            }
            debug!(
                rule_id = %rule_id,
                snapshot_revision = snapshot.revision,
                current_revision = current,
                attempt = attempts,
                "calendar moved during planning; re-checking"
            );
        }
    }

    // ── Execution ───────────────────────────────────────────────────

    /// Record a completed occurrence, advance the execution pointers, and
    /// re-evaluate automatic completion.
    pub async fn record_execution(
        &self,
        rule_id: RuleId,
        occurrence_time: DateTime<Utc>,
    ) -> Result<RecurrenceRule, RecurrenceError> {
        let lock = self.rule_lock(rule_id).await;
        let _guard = lock.lock().await;

        let mut rule = self.load(rule_id).await?;
        let now = Utc::now();

        if let Err(err) = tracker::apply_execution(&mut rule, occurrence_time, now) {
            self.audit.log(
                rule_id,
                LogLevel::Warning,
                SchedulingPhase::Execution,
                format!("rejected execution at {}: {}", occurrence_time, err),
            );
            return Err(err);
        }

        // Completion is folded into the same save, so the persisted record
        // is always in its final state even if a later write would fail.
        let completed = lifecycle::evaluate_completion(&mut rule, now);
        self.repository.save(&rule).await?;
        self.audit.log(
            rule_id,
            LogLevel::Info,
            SchedulingPhase::Execution,
            format!("executed at {}", occurrence_time),
        );

        if completed {
            self.audit.log(
                rule_id,
                LogLevel::Info,
                SchedulingPhase::Transition,
                "active -> completed (series exhausted)",
            );
            self.release_lock(rule_id).await;
        }
        Ok(rule)
    }

    // ── Internals ───────────────────────────────────────────────────

    async fn load(&self, rule_id: RuleId) -> Result<RecurrenceRule, RecurrenceError> {
        self.repository
            .find_by_id(rule_id)
            .await?
            .ok_or_else(|| RecurrenceError::NotFound(format!("rule {}", rule_id)))
    }

    async fn rule_lock(&self, rule_id: RuleId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry(rule_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Terminal rules accept no further mutations, so their lock entry can
    /// go; otherwise the map grows by one entry per rule ever touched.
    async fn release_lock(&self, rule_id: RuleId) {
        self.locks.lock().await.remove(&rule_id);
    }
}

fn map_provider_error(err: ProviderError) -> RecurrenceError {
    match err {
        ProviderError::UnknownTeam(team_id) => {
            RecurrenceError::NotFound(format!("team {}", team_id))
        }
        other => RecurrenceError::Calendar(other),
    }
}

// ── Tests ───────────────────────────────────────────────────────────
