//! Pure occurrence generation.
//!
//! A rule defines one fixed series of visit dates, anchored at its
//! `start_date` and its weekday/day-of-month anchor. Querying a window
//! selects a subsequence of that series; it never re-phases it, which is what
//! keeps windowed listings and the execution tracker's pointer derivation in
//! agreement. Everything here is pure: no clocks, no I/O, no hidden state.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc, Weekday};

use crate::schema::{Anchor, Occurrence, RecurrenceRule, RuleStatus};

// ── Public API ──────────────────────────────────────────────────────

/// Generate every occurrence of `rule` whose start falls inside
/// `[window_start, window_end]` (both inclusive).
///
/// Only `active` rules generate; any other status yields an empty sequence.
/// The result is strictly increasing and identical across repeated calls
/// with the same arguments.
pub fn generate(
    rule: &RecurrenceRule,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
) -> Vec<Occurrence> {
    if rule.status != RuleStatus::Active || window_end < window_start {
        return Vec::new();
    }

    series(rule)
        .map(|date| occurrence_at(rule, date))
        .skip_while(|o| o.scheduled_start < window_start)
        .take_while(|o| o.scheduled_start <= window_end)
        .collect()
}

/// First series occurrence strictly after `after`, bounded by `end_date`.
///
/// Status-independent on purpose: the tracker keeps `next_execution` current
/// even while a rule is paused, so resuming continues from the right slot.
pub fn next_in_series(rule: &RecurrenceRule, after: DateTime<Utc>) -> Option<Occurrence> {
    series(rule)
        .map(|date| occurrence_at(rule, date))
        .find(|o| o.scheduled_start > after)
}

/// The very first occurrence of the series, used to seed `next_execution`
/// when a rule is created.
pub fn first_in_series(rule: &RecurrenceRule) -> Option<Occurrence> {
    series(rule).next().map(|date| occurrence_at(rule, date))
}

// ── Series walk ─────────────────────────────────────────────────────

fn series(rule: &RecurrenceRule) -> SeriesDates {
    SeriesDates::for_rule(rule)
}

/// Iterator over the series dates of a rule, in order, ending at `end_date`.
struct SeriesDates {
    state: SeriesState,
    until: Option<NaiveDate>,
}

enum SeriesState {
    /// Day-based cadence: fixed stride in whole days from an aligned start.
    Days { next: NaiveDate, step_days: i64 },
    /// Month-based cadence: stride in whole months, day re-clamped per month
    /// from the original anchor so clamping never propagates drift.
    Months {
        year: i32,
        month: u32,
        day: u32,
        step_months: i64,
    },
    Done,
}

impl SeriesDates {
    fn for_rule(rule: &RecurrenceRule) -> Self {
        let state = match (rule.frequency.day_step(), rule.frequency.month_step(), rule.anchor) {
            (Some(step_days), _, Anchor::DayOfWeek(weekday)) => SeriesState::Days {
                next: align_to_weekday(rule.start_date, weekday),
                step_days,
            },
            (_, Some(step_months), Anchor::DayOfMonth(day)) => {
                let (year, month) = first_anchor_month(rule.start_date, day);
                SeriesState::Months {
                    year,
                    month,
                    day,
                    step_months,
                }
            }
            // Mismatched anchor/frequency pairs are rejected at create; a
            // stored record that still carries one yields an empty series.
            _ => SeriesState::Done,
        };

        Self {
            state,
            until: rule.end_date,
        }
    }
}

impl Iterator for SeriesDates {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<NaiveDate> {
        let date = match &mut self.state {
            SeriesState::Days { next, step_days } => {
                let date = *next;
                *next += Duration::days(*step_days);
                date
            }
            SeriesState::Months {
                year,
                month,
                day,
                step_months,
            } => {
                let Some(date) = clamped_date(*year, *month, *day) else {
                    self.state = SeriesState::Done;
                    return None;
                };
                let total = (*year as i64) * 12 + (*month as i64 - 1) + *step_months;
                *year = total.div_euclid(12) as i32;
                *month = (total.rem_euclid(12) + 1) as u32;
                date
            }
            SeriesState::Done => return None,
        };

        if self.until.is_some_and(|until| date > until) {
            self.state = SeriesState::Done;
            return None;
        }
        Some(date)
    }
}

/// Combine a series date with the rule's time of day and duration.
fn occurrence_at(rule: &RecurrenceRule, date: NaiveDate) -> Occurrence {
    let scheduled_start = date.and_time(rule.time_of_day).and_utc();
    Occurrence {
        rule_id: rule.id,
        scheduled_start,
        scheduled_end: scheduled_start + rule.duration(),
    }
}

// ── Date helpers ────────────────────────────────────────────────────

/// First date at or after `from` falling on `weekday`.
fn align_to_weekday(from: NaiveDate, weekday: Weekday) -> NaiveDate {
    let ahead = (weekday.num_days_from_monday() + 7 - from.weekday().num_days_from_monday()) % 7;
    from + Duration::days(ahead as i64)
}

/// Year/month of the first clamped anchor date at or after `start`.
///
/// The clamped candidate of the month after `start` is always past the end
/// of `start`'s month, so at most one advance is needed.
fn first_anchor_month(start: NaiveDate, day: u32) -> (i32, u32) {
    match clamped_date(start.year(), start.month(), day) {
        Some(candidate) if candidate >= start => (start.year(), start.month()),
        _ => {
            if start.month() == 12 {
                (start.year() + 1, 1)
            } else {
                (start.year(), start.month() + 1)
            }
        }
    }
}

/// Build a date, clamping `day` to the last valid day of the month.
fn clamped_date(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day.min(days_in_month(year, month)))
}

/// Get the number of days in a month.
fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 => {
            if (year % 4 == 0 && year % 100 != 0) || (year % 400 == 0) {
                29
            } else {
                28
            }
        }
        _ => 30,
    }
}

// ── Tests ───────────────────────────────────────────────────────────
