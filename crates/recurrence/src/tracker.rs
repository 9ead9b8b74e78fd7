//! Execution pointer tracking.
//!
//! When the booking side signals that a visit completed, the tracker advances
//! `last_execution` and re-derives `next_execution` from the series. The
//! guard against out-of-order signals is strict: an execution at or before
//! the recorded `last_execution` is rejected without mutation.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::RecurrenceError;
use crate::generator;
use crate::schema::RecurrenceRule;

/// Record a completed occurrence on the rule.
///
/// Accepted on active and paused rules (a paused rule's already-booked
/// visits still complete); rejected on terminal rules. On success,
/// `next_execution` is the first series slot strictly after
/// `occurrence_time`, or `None` once the series is exhausted.
pub fn apply_execution(
    rule: &mut RecurrenceRule,
    occurrence_time: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<(), RecurrenceError> {
    if rule.is_terminal() {
        return Err(RecurrenceError::InvalidTransition(format!(
            "rule {} is {}; executions are no longer accepted",
            rule.id, rule.status
        )));
    }

    if let Some(current) = rule.last_execution {
        if occurrence_time <= current {
            return Err(RecurrenceError::StaleExecution {
                attempted: occurrence_time,
                current,
            });
        }
    }

    rule.last_execution = Some(occurrence_time);
    rule.next_execution =
        generator::next_in_series(rule, occurrence_time).map(|o| o.scheduled_start);
    rule.updated_at = now;

    debug!(
        rule_id = %rule.id,
        last = %occurrence_time,
        next = ?rule.next_execution,
        "execution recorded"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime, TimeZone, Weekday};
    use uuid::Uuid;

    use crate::schema::{Anchor, Frequency, NewRule, RuleStatus};
    use sweeply_core::ServiceType;

    fn make_rule(end: Option<(i32, u32, u32)>) -> RecurrenceRule {
        RecurrenceRule::from_new(
            NewRule {
                company_id: Uuid::new_v4(),
                customer_id: Uuid::new_v4(),
                team_id: Uuid::new_v4(),
                frequency: Frequency::Weekly,
                anchor: Anchor::DayOfWeek(Weekday::Mon),
                time_of_day: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
                duration_minutes: 120,
                service_type: ServiceType::Regular,
                start_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
                end_date: end.map(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d).unwrap()),
                notes: None,
            },
            Utc::now(),
        )
    }

    fn monday(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, day, 10, 0, 0).unwrap()
    }

    #[test]
    fn advances_both_pointers() {
        let mut rule = make_rule(None);
        apply_execution(&mut rule, monday(6), Utc::now()).unwrap();

        assert_eq!(rule.last_execution, Some(monday(6)));
        assert_eq!(rule.next_execution, Some(monday(13)));
    }

    #[test]
    fn next_is_strictly_after_last() {
        let mut rule = make_rule(None);
        apply_execution(&mut rule, monday(6), Utc::now()).unwrap();
        apply_execution(&mut rule, monday(13), Utc::now()).unwrap();

        assert!(rule.next_execution.unwrap() > rule.last_execution.unwrap());
        assert_eq!(rule.next_execution, Some(monday(20)));
    }

    #[test]
    fn stale_execution_rejected_without_mutation() {
        let mut rule = make_rule(None);
        apply_execution(&mut rule, monday(13), Utc::now()).unwrap();
        let snapshot = rule.clone();

        let err = apply_execution(&mut rule, monday(6), Utc::now()).unwrap_err();
        assert!(matches!(err, RecurrenceError::StaleExecution { .. }));
        assert_eq!(rule.last_execution, snapshot.last_execution);
        assert_eq!(rule.next_execution, snapshot.next_execution);
        assert_eq!(rule.updated_at, snapshot.updated_at);
    }

    #[test]
    fn replaying_the_same_instant_is_stale() {
        let mut rule = make_rule(None);
        apply_execution(&mut rule, monday(6), Utc::now()).unwrap();
        let err = apply_execution(&mut rule, monday(6), Utc::now()).unwrap_err();
        assert!(matches!(err, RecurrenceError::StaleExecution { .. }));
    }

    #[test]
    fn exhausted_series_leaves_next_empty() {
        let mut rule = make_rule(Some((2025, 1, 20)));
        apply_execution(&mut rule, monday(20), Utc::now()).unwrap();

        assert_eq!(rule.last_execution, Some(monday(20)));
        assert!(rule.next_execution.is_none());
    }

    #[test]
    fn paused_rule_still_accepts_executions() {
        let mut rule = make_rule(None);
        rule.status = RuleStatus::Paused;
        apply_execution(&mut rule, monday(6), Utc::now()).unwrap();

        assert_eq!(rule.status, RuleStatus::Paused);
        assert_eq!(rule.next_execution, Some(monday(13)));
    }

    #[test]
    fn terminal_rule_rejects_executions() {
        for status in [RuleStatus::Completed, RuleStatus::Cancelled] {
            let mut rule = make_rule(None);
            rule.status = status;
            let err = apply_execution(&mut rule, monday(6), Utc::now()).unwrap_err();
            assert!(matches!(err, RecurrenceError::InvalidTransition(_)));
            assert!(rule.last_execution.is_none());
        }
    }
}
