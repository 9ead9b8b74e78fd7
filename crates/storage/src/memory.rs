//! In-memory backends for rules and team calendars.
//!
//! The rule repository is a plain map behind `Arc<RwLock<_>>`, suitable for
//! tests and single-process deployments. The team calendar doubles as the
//! appointment factory: materializing an occurrence books the interval and
//! bumps the team's revision counter, which is exactly what the planner's
//! optimistic conflict re-check observes.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use sweeply_core::{Appointment, RuleId, TeamId};
use sweeply_recurrence::schema::{Occurrence, RecurrenceRule, RuleStatus};
use sweeply_recurrence::traits::{
    AppointmentFactory, CalendarSnapshot, Page, ProviderError, RepositoryError, RuleFilter,
    RuleRepository, TeamCalendarProvider,
};

// ── Rule repository ─────────────────────────────────────────────────

#[derive(Default)]
pub struct InMemoryRuleRepository {
    rules: Arc<RwLock<HashMap<RuleId, RecurrenceRule>>>,
}

impl InMemoryRuleRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RuleRepository for InMemoryRuleRepository {
    async fn save(&self, rule: &RecurrenceRule) -> Result<(), RepositoryError> {
        let mut map = self.rules.write().await;
        map.insert(rule.id, rule.clone());
        debug!(rule_id = %rule.id, status = %rule.status, "rule saved");
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
        match map.get_mut(&id) {
            Some(rule) => {
                rule.status = RuleStatus::Cancelled;
                rule.next_execution = None;
                rule.updated_at = Utc::now();
                info!(rule_id = %id, "rule soft-deleted (cancelled)");
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

// ── Team calendar ───────────────────────────────────────────────────

#[derive(Default)]
struct TeamCalendarState {
    appointments: Vec<Appointment>,
    revision: u64,
}

/// In-memory team calendar and appointment factory.
///
/// Unknown teams read as empty calendars at revision 0: teams are owned by
/// an external collaborator, and a team without bookings is a valid state.
#[derive(Default)]
pub struct InMemoryTeamCalendar {
    teams: Arc<RwLock<HashMap<TeamId, TeamCalendarState>>>,
}

impl InMemoryTeamCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Book an appointment directly, bumping the team's revision. Used by
    /// `materialize` and by tests seeding existing commitments.
    pub async fn book(&self, appointment: Appointment) {
        let mut teams = self.teams.write().await;
        let state = teams.entry(appointment.team_id).or_default();
        state.appointments.push(appointment);
        state.revision += 1;
    }

    /// Number of booked appointments for a team.
    pub async fn booked_count(&self, team_id: TeamId) -> usize {
        let teams = self.teams.read().await;
        teams.get(&team_id).map_or(0, |s| s.appointments.len())
    }
}

#[async_trait]
impl TeamCalendarProvider for InMemoryTeamCalendar {
    async fn snapshot(
        &self,
        team_id: TeamId,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<CalendarSnapshot, ProviderError> {
        let teams = self.teams.read().await;
        let Some(state) = teams.get(&team_id) else {
            return Ok(CalendarSnapshot {
                team_id,
                revision: 0,
                busy: Vec::new(),
            });
        };

        let busy = state
            .appointments
            .iter()
            .map(Appointment::busy_interval)
            .filter(|b| b.overlaps(window_start, window_end))
            .collect();

        Ok(CalendarSnapshot {
            team_id,
            revision: state.revision,
            busy,
        })
    }

    async fn revision(&self, team_id: TeamId) -> Result<u64, ProviderError> {
        let teams = self.teams.read().await;
        Ok(teams.get(&team_id).map_or(0, |s| s.revision))
    }
}

#[async_trait]
impl AppointmentFactory for InMemoryTeamCalendar {
    async fn materialize(
        &self,
        rule: &RecurrenceRule,
        occurrence: &Occurrence,
    ) -> Result<Appointment, ProviderError> {
        let appointment = Appointment {
            id: Uuid::new_v4(),
            rule_id: Some(rule.id),
            customer_id: rule.customer_id,
            team_id: rule.team_id,
            service_type: rule.service_type,
            scheduled_start: occurrence.scheduled_start,
            scheduled_end: occurrence.scheduled_end,
        };
        self.book(appointment.clone()).await;
        info!(
            rule_id = %rule.id,
            team_id = %rule.team_id,
            start = %appointment.scheduled_start,
            "occurrence materialized"
        );
        Ok(appointment)
    }
}

// ── Tests ───────────────────────────────────────────────────────────
