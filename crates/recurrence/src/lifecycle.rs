//! Rule lifecycle transitions.
//!
//! The transition table is small and closed: pause/resume between `active`
//! and `paused`, automatic completion out of `active`, and cancellation from
//! any non-terminal state. Everything else is rejected without mutating the
//! rule. Terminal transitions clear `next_execution`.

use chrono::{DateTime, Utc};
use tracing::info;

use crate::error::RecurrenceError;
use crate::schema::{RecurrenceRule, RuleStatus};

/// Apply a requested status transition, enforcing the transition table.
pub fn apply_transition(
    rule: &mut RecurrenceRule,
    target: RuleStatus,
    now: DateTime<Utc>,
) -> Result<(), RecurrenceError> {
    use RuleStatus::*;

    let allowed = matches!(
        (rule.status, target),
        (Active, Paused) | (Paused, Active) | (Active, Completed) | (Active, Cancelled) | (Paused, Cancelled)
    );
    if !allowed {
        return Err(RecurrenceError::InvalidTransition(format!(
            "rule {}: {} -> {}",
            rule.id, rule.status, target
        )));
    }

    let from = rule.status;
    rule.status = target;
    if target.is_terminal() {
        rule.next_execution = None;
    }
    rule.updated_at = now;
    info!(rule_id = %rule.id, from = %from, to = %target, "rule transition");
    Ok(())
}

/// Re-evaluate automatic completion after an execution was recorded.
///
/// An active rule completes once its bounded series is exhausted: `end_date`
/// is set and either the last execution reached it or no further occurrence
/// exists before it. Returns whether the rule transitioned.
pub fn evaluate_completion(rule: &mut RecurrenceRule, now: DateTime<Utc>) -> bool {
    if rule.status != RuleStatus::Active {
        return false;
    }
    let Some(end_date) = rule.end_date else {
        return false;
    };
    let Some(last) = rule.last_execution else {
        return false;
    };

    let exhausted = rule.next_execution.is_none() || last.date_naive() >= end_date;
    if !exhausted {
        return false;
    }

    rule.status = RuleStatus::Completed;
    rule.next_execution = None;
    rule.updated_at = now;
    info!(rule_id = %rule.id, end_date = %end_date, "rule auto-completed");
    true
}
