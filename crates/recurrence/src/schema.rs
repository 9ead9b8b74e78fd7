//! Recurrence rule schema types.
//!
//! Defines the persisted rule record and its building blocks:
//! - `Frequency`: repetition cadence from daily through yearly
//! - `Anchor`: weekday anchor for day-based cadences, day-of-month for month-based
//! - `RuleStatus`: lifecycle state gating occurrence generation
//! - `RecurrenceRule` / `NewRule`: the stored record and the create request
//! - `Occurrence`: one computed visit instance, never persisted

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use sweeply_core::{CompanyId, CustomerId, RuleId, ServiceType, TeamId};

// ── Frequency ───────────────────────────────────────────────────────

/// Repetition cadence of a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Daily,
    Weekly,
    Biweekly,
    Monthly,
    Quarterly,
    Yearly,
}

impl Frequency {
    /// Day-based cadences stride in whole days and anchor to a weekday;
    /// the rest stride in whole months and anchor to a day of month.
    pub fn is_day_based(&self) -> bool {
        matches!(self, Frequency::Daily | Frequency::Weekly | Frequency::Biweekly)
    }

    /// Stride in days for day-based cadences.
    pub fn day_step(&self) -> Option<i64> {
        match self {
            Frequency::Daily => Some(1),
            Frequency::Weekly => Some(7),
            Frequency::Biweekly => Some(14),
            _ => None,
        }
    }

    /// Stride in calendar months for month-based cadences.
    pub fn month_step(&self) -> Option<i64> {
        match self {
            Frequency::Monthly => Some(1),
            Frequency::Quarterly => Some(3),
            Frequency::Yearly => Some(12),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Biweekly => "biweekly",
            Frequency::Monthly => "monthly",
            Frequency::Quarterly => "quarterly",
            Frequency::Yearly => "yearly",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily" => Ok(Frequency::Daily),
            "weekly" => Ok(Frequency::Weekly),
            "biweekly" => Ok(Frequency::Biweekly),
            "monthly" => Ok(Frequency::Monthly),
            "quarterly" => Ok(Frequency::Quarterly),
            "yearly" => Ok(Frequency::Yearly),
            other => Err(format!("unknown frequency: '{}'", other)),
        }
    }
}

// ── Anchor ──────────────────────────────────────────────────────────

/// Phase anchor of the occurrence series.
///
/// Day-based rules fix the weekday of the series start; month-based rules
/// fix the day of month, clamped per month to its last valid day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Anchor {
    DayOfWeek(Weekday),
    DayOfMonth(u32),
}

// ── Rule status ─────────────────────────────────────────────────────

/// Lifecycle state of a rule. Only `active` rules generate occurrences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleStatus {
    Active,
    Paused,
    Completed,
    Cancelled,
}

impl RuleStatus {
    /// Terminal states admit no further transitions or executions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RuleStatus::Completed | RuleStatus::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RuleStatus::Active => "active",
            RuleStatus::Paused => "paused",
            RuleStatus::Completed => "completed",
            RuleStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for RuleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RuleStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(RuleStatus::Active),
            "paused" => Ok(RuleStatus::Paused),
            "completed" => Ok(RuleStatus::Completed),
            "cancelled" => Ok(RuleStatus::Cancelled),
            other => Err(format!("unknown rule status: '{}'", other)),
        }
    }
}

// ── Rule records ────────────────────────────────────────────────────

/// A recurring service visit specification.
///
/// Owned by the scheduling core; the company/customer/team identifiers are
/// foreign keys into collaborator systems. Status is mutated only through
/// lifecycle transitions, execution pointers only through the tracker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurrenceRule {
    pub id: RuleId,
    pub company_id: CompanyId,
    pub customer_id: CustomerId,
    pub team_id: TeamId,
    pub frequency: Frequency,
    pub anchor: Anchor,
    pub time_of_day: NaiveTime,
    pub duration_minutes: u32,
    pub service_type: ServiceType,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub status: RuleStatus,
    pub last_execution: Option<DateTime<Utc>>,
    pub next_execution: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RecurrenceRule {
    /// Materialize a validated create request into a persistable rule.
    ///
    /// Starts `active` with empty execution pointers; the caller seeds
    /// `next_execution` from the generator after construction.
    pub fn from_new(new: NewRule, now: DateTime<Utc>) -> Self {
        Self {
            id: RuleId::new_v4(),
            company_id: new.company_id,
            customer_id: new.customer_id,
            team_id: new.team_id,
            frequency: new.frequency,
            anchor: new.anchor,
            time_of_day: new.time_of_day,
            duration_minutes: new.duration_minutes,
            service_type: new.service_type,
            start_date: new.start_date,
            end_date: new.end_date,
            status: RuleStatus::Active,
            last_execution: None,
            next_execution: None,
            notes: new.notes,
            created_at: now,
            updated_at: now,
        }
    }

    /// Visit length as a chrono duration.
    pub fn duration(&self) -> Duration {
        Duration::minutes(self.duration_minutes as i64)
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Create request for a new rule, as submitted by a company actor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewRule {
    pub company_id: CompanyId,
    pub customer_id: CustomerId,
    pub team_id: TeamId,
    pub frequency: Frequency,
    pub anchor: Anchor,
    pub time_of_day: NaiveTime,
    pub duration_minutes: u32,
    pub service_type: ServiceType,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub notes: Option<String>,
}

// ── Occurrence ──────────────────────────────────────────────────────

/// One computed visit instance of a rule.
///
/// Transient: consumed by the appointment collaborator to create a durable
/// booking, never stored by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occurrence {
    pub rule_id: RuleId,
    pub scheduled_start: DateTime<Utc>,
    pub scheduled_end: DateTime<Utc>,
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frequency_round_trips_through_str() {
        for freq in [
            Frequency::Daily,
            Frequency::Weekly,
            Frequency::Biweekly,
            Frequency::Monthly,
            Frequency::Quarterly,
            Frequency::Yearly,
        ] {
            assert_eq!(freq.as_str().parse::<Frequency>(), Ok(freq));
        }
        assert!("fortnightly".parse::<Frequency>().is_err());
    }

    #[test]
    fn frequency_steps_partition_day_and_month_cadences() {
        assert_eq!(Frequency::Daily.day_step(), Some(1));
        assert_eq!(Frequency::Weekly.day_step(), Some(7));
        assert_eq!(Frequency::Biweekly.day_step(), Some(14));
        assert_eq!(Frequency::Monthly.month_step(), Some(1));
        assert_eq!(Frequency::Quarterly.month_step(), Some(3));
        assert_eq!(Frequency::Yearly.month_step(), Some(12));

        assert!(Frequency::Daily.month_step().is_none());
        assert!(Frequency::Yearly.day_step().is_none());
    }

    #[test]
    fn status_terminal_split() {
        assert!(!RuleStatus::Active.is_terminal());
        assert!(!RuleStatus::Paused.is_terminal());
        assert!(RuleStatus::Completed.is_terminal());
        assert!(RuleStatus::Cancelled.is_terminal());
    }

    #[test]
    fn status_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&RuleStatus::Active).unwrap(), "\"active\"");
        assert_eq!(
            serde_json::from_str::<RuleStatus>("\"cancelled\"").unwrap(),
            RuleStatus::Cancelled
        );
    }

    #[test]
    fn anchor_serializes_tagged() {
        let json = serde_json::to_string(&Anchor::DayOfMonth(31)).unwrap();
        assert_eq!(json, "{\"day_of_month\":31}");

        let json = serde_json::to_string(&Anchor::DayOfWeek(Weekday::Mon)).unwrap();
        assert!(json.contains("day_of_week"));
        let back: Anchor = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Anchor::DayOfWeek(Weekday::Mon));
    }

    #[test]
    fn new_rule_rejects_unknown_fields() {
        let json = r#"{
            "company_id": "4b1c3a62-9a15-4b7e-8c43-0d9f4c6e8a01",
            "customer_id": "4b1c3a62-9a15-4b7e-8c43-0d9f4c6e8a02",
            "team_id": "4b1c3a62-9a15-4b7e-8c43-0d9f4c6e8a03",
            "frequency": "weekly",
            "anchor": {"day_of_week": "Mon"},
            "time_of_day": "10:00:00",
            "duration_minutes": 120,
            "service_type": "regular",
            "start_date": "2025-01-01",
            "surprise": true
        }"#;
        let err = serde_json::from_str::<NewRule>(json).unwrap_err();
        assert!(err.to_string().contains("surprise"));
    }

    #[test]
    fn from_new_starts_active_with_empty_pointers() {
        let json = r#"{
            "company_id": "4b1c3a62-9a15-4b7e-8c43-0d9f4c6e8a01",
            "customer_id": "4b1c3a62-9a15-4b7e-8c43-0d9f4c6e8a02",
            "team_id": "4b1c3a62-9a15-4b7e-8c43-0d9f4c6e8a03",
            "frequency": "weekly",
            "anchor": {"day_of_week": "Mon"},
            "time_of_day": "10:00:00",
            "duration_minutes": 120,
            "service_type": "deep",
            "start_date": "2025-01-01"
        }"#;
        let new: NewRule = serde_json::from_str(json).unwrap();
        let now = Utc::now();
        let rule = RecurrenceRule::from_new(new, now);

        assert_eq!(rule.status, RuleStatus::Active);
        assert!(rule.last_execution.is_none());
        assert!(rule.next_execution.is_none());
        assert_eq!(rule.created_at, now);
        assert_eq!(rule.updated_at, now);
        assert_eq!(rule.duration(), Duration::minutes(120));
    }
}
