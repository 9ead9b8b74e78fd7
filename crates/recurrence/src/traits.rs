//! Collaborator trait definitions and their shared error types.
//!
//! The scheduling core performs no I/O of its own. Persistence, team
//! calendars, and appointment booking live behind these narrow async traits,
//! so the whole engine can be exercised purely in-memory.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use sweeply_core::{Appointment, BusyInterval, CompanyId, CustomerId, RuleId, TeamId};

use crate::schema::{Occurrence, RecurrenceRule, RuleStatus};

// ── Errors ──────────────────────────────────────────────────────────

/// Errors surfaced by a rule repository, classified per its retry contract.
///
/// `Transient` failures are retryable by the caller; `Permanent` ones are
/// fatal and must be surfaced. The repository itself exhausts its own
/// timeout/retry budget before returning either.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("transient repository failure: {0}")]
    Transient(String),

    #[error("permanent repository failure: {0}")]
    Permanent(String),
}

impl RepositoryError {
    pub fn is_transient(&self) -> bool {
        matches!(self, RepositoryError::Transient(_))
    }
}

/// Errors surfaced by the team-calendar / appointment collaborators.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("unknown team: {0}")]
    UnknownTeam(TeamId),

    #[error("calendar provider unavailable: {0}")]
    Unavailable(String),
}

// ── Listing ─────────────────────────────────────────────────────────

/// Filter for rule listings. Empty filter matches everything.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleFilter {
    pub company_id: Option<CompanyId>,
    pub customer_id: Option<CustomerId>,
    pub team_id: Option<TeamId>,
    pub status: Option<RuleStatus>,
}

impl RuleFilter {
    pub fn matches(&self, rule: &RecurrenceRule) -> bool {
        self.company_id.map_or(true, |id| rule.company_id == id)
            && self.customer_id.map_or(true, |id| rule.customer_id == id)
            && self.team_id.map_or(true, |id| rule.team_id == id)
            && self.status.map_or(true, |s| rule.status == s)
    }

    pub fn with_status(status: RuleStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }
}

/// Offset/limit pagination for rule listings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Page {
    pub offset: usize,
    pub limit: usize,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
        }
    }
}

// ── Calendar snapshot ───────────────────────────────────────────────

/// A consistent read of a team's commitments over a window.
///
/// The `revision` counter increases whenever the team's calendar mutates;
/// conflict checks re-read it before committing so a calendar that moved
/// under the check is detected rather than silently ignored.
#[derive(Debug, Clone)]
pub struct CalendarSnapshot {
    pub team_id: TeamId,
    pub revision: u64,
    pub busy: Vec<BusyInterval>,
}

// ── Collaborator traits ─────────────────────────────────────────────

/// Persistence boundary for recurrence rules.
///
/// `delete` is soft: implementations mark the rule cancelled and keep the
/// record, matching the platform policy that rules are never hard-deleted.
#[async_trait]
pub trait RuleRepository: Send + Sync {
    async fn save(&self, rule: &RecurrenceRule) -> Result<(), RepositoryError>;

    async fn find_by_id(&self, id: RuleId) -> Result<Option<RecurrenceRule>, RepositoryError>;

    async fn list(
        &self,
        filter: &RuleFilter,
        page: Page,
    ) -> Result<Vec<RecurrenceRule>, RepositoryError>;

    async fn delete(&self, id: RuleId) -> Result<bool, RepositoryError>;
}

/// Read access to a team's existing commitments.
#[async_trait]
pub trait TeamCalendarProvider: Send + Sync {
    /// A revisioned snapshot of the team's busy intervals within the window.
    async fn snapshot(
        &self,
        team_id: TeamId,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<CalendarSnapshot, ProviderError>;

    /// Current revision counter, for the optimistic re-check before commit.
    async fn revision(&self, team_id: TeamId) -> Result<u64, ProviderError>;
}

/// Books a durable appointment out of an accepted occurrence.
///
/// The appointment record is owned by the booking side of the platform;
/// completion is signalled back through `RecurrenceService::record_execution`.
#[async_trait]
pub trait AppointmentFactory: Send + Sync {
    async fn materialize(
        &self,
        rule: &RecurrenceRule,
        occurrence: &Occurrence,
    ) -> Result<Appointment, ProviderError>;
}
