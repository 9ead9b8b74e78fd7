//! New-rule validation with structured errors and suggestions.
//!
//! Validates a [`NewRule`] before it is ever persisted: anchor/frequency
//! pairing, date ordering, and duration. Returns a [`ValidationResult`] with
//! errors (block create) and warnings (advisory).

use serde::{Deserialize, Serialize};

use sweeply_core::ServiceType;

use crate::schema::{Anchor, NewRule};

// ── Result types ────────────────────────────────────────────────────

/// Overall validation outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

/// A blocking validation error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationError {
    /// Field-path location, e.g. `"anchor.day_of_month"`.
    pub path: String,
    pub message: String,
    /// Optional "Did you mean …?" suggestion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

/// A non-blocking advisory warning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationResult {
    fn new() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.valid = false;
        self.errors.push(ValidationError {
            path: path.into(),
            message: message.into(),
            suggestion: None,
        });
    }

    fn error_with_suggestion(
        &mut self,
        path: impl Into<String>,
        message: impl Into<String>,
        suggestion: impl Into<String>,
    ) {
        self.valid = false;
        self.errors.push(ValidationError {
            path: path.into(),
            message: message.into(),
            suggestion: Some(suggestion.into()),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ValidationWarning {
            path: path.into(),
            message: message.into(),
        });
    }
}

// ── Public API ──────────────────────────────────────────────────────

/// Validate a create request. The service rejects the request when
/// `result.valid` is false, carrying `result.errors` to the caller.
pub fn validate_new_rule(new: &NewRule) -> ValidationResult {
    let mut result = ValidationResult::new();
    validate_anchor(new, &mut result);
    validate_dates(new, &mut result);
    validate_duration(new, &mut result);
    result
}

/// Parse a service type string as received from the dashboard boundary,
/// suggesting the closest known value on a near miss.
pub fn parse_service_type(input: &str) -> Result<ServiceType, ValidationError> {
    input.parse::<ServiceType>().map_err(|message| {
        let candidates: Vec<&str> = ServiceType::ALL.iter().map(|t| t.as_str()).collect();
        ValidationError {
            path: "service_type".to_string(),
            message,
            suggestion: fuzzy_match(input, &candidates).map(|s| format!("Did you mean '{}'?", s)),
        }
    })
}

// ── Anchor / frequency pairing ──────────────────────────────────────

fn validate_anchor(new: &NewRule, result: &mut ValidationResult) {
    match (new.frequency.is_day_based(), new.anchor) {
        (true, Anchor::DayOfMonth(_)) => {
            result.error_with_suggestion(
                "anchor",
                format!("{} rules anchor to a weekday, not a day of month", new.frequency),
                "Use a day_of_week anchor for daily/weekly/biweekly cadences",
            );
        }
        (false, Anchor::DayOfWeek(_)) => {
            result.error_with_suggestion(
                "anchor",
                format!("{} rules anchor to a day of month, not a weekday", new.frequency),
                "Use a day_of_month anchor (1-31) for monthly/quarterly/yearly cadences",
            );
        }
        _ => {}
    }

    if let Anchor::DayOfMonth(day) = new.anchor {
        if !(1..=31).contains(&day) {
            result.error(
                "anchor.day_of_month",
                format!("day_of_month must be between 1 and 31, got {}", day),
            );
        } else if day > 28 {
            result.warn(
                "anchor.day_of_month",
                format!("day {} is clamped to the last day of shorter months", day),
            );
        }
    }
}

// ── Dates ───────────────────────────────────────────────────────────

fn validate_dates(new: &NewRule, result: &mut ValidationResult) {
    if let Some(end) = new.end_date {
        if end < new.start_date {
            result.error(
                "end_date",
                format!("end_date {} precedes start_date {}", end, new.start_date),
            );
        }
    }
}

// ── Duration ────────────────────────────────────────────────────────

/// Advisory ceiling for a single visit; anything longer is almost always a
/// data-entry mistake.
const LONG_VISIT_MINUTES: u32 = 8 * 60;

fn validate_duration(new: &NewRule, result: &mut ValidationResult) {
    if new.duration_minutes == 0 {
        result.error("duration_minutes", "duration must be greater than zero");
    } else if new.duration_minutes > LONG_VISIT_MINUTES {
        result.warn(
            "duration_minutes",
            format!("{} minutes is an unusually long visit", new.duration_minutes),
        );
    }
}

// ── Fuzzy matching ──────────────────────────────────────────────────

/// Find the closest match using Levenshtein distance. Returns None if best
/// distance exceeds half the candidate length (too dissimilar).
fn fuzzy_match<'a>(input: &str, candidates: &[&'a str]) -> Option<&'a str> {
    let input_lower = input.to_lowercase();
    let mut best: Option<(&str, usize)> = None;

    for &candidate in candidates {
        let dist = levenshtein(&input_lower, &candidate.to_lowercase());
        match best {
            None => best = Some((candidate, dist)),
            Some((_, best_dist)) if dist < best_dist => best = Some((candidate, dist)),
            _ => {}
        }
    }

    best.and_then(|(name, dist)| {
        let max_len = input.len().max(name.len());
        if dist <= max_len / 2 {
            Some(name)
        } else {
            None
        }
    })
}

/// Levenshtein edit distance between two strings.
fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let m = a.len();
    let n = b.len();

    let mut prev = (0..=n).collect::<Vec<_>>();
    let mut curr = vec![0; n + 1];

    for i in 1..=m {
        curr[0] = i;
        for j in 1..=n {
            let cost = if a[i - 1] == b[j - 1] { 0 } else { 1 };
            curr[j] = (prev[j] + 1)
                .min(curr[j - 1] + 1)
                .min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[n]
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime, Weekday};
    use uuid::Uuid;

    use crate::schema::Frequency;

    fn make_new(frequency: Frequency, anchor: Anchor) -> NewRule {
        NewRule {
            company_id: Uuid::new_v4(),
            customer_id: Uuid::new_v4(),
            team_id: Uuid::new_v4(),
            frequency,
            anchor,
            time_of_day: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            duration_minutes: 120,
            service_type: ServiceType::Regular,
            start_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            end_date: None,
            notes: None,
        }
    }

    #[test]
    fn valid_weekly_rule_passes() {
        let new = make_new(Frequency::Weekly, Anchor::DayOfWeek(Weekday::Mon));
        let result = validate_new_rule(&new);
        assert!(result.valid, "errors: {:?}", result.errors);
        assert!(result.errors.is_empty());
    }

    #[test]
    fn day_based_rule_rejects_day_of_month_anchor() {
        let new = make_new(Frequency::Weekly, Anchor::DayOfMonth(15));
        let result = validate_new_rule(&new);
        assert!(!result.valid);
        let err = result.errors.iter().find(|e| e.path == "anchor").unwrap();
        assert!(err.suggestion.as_deref().unwrap().contains("day_of_week"));
    }

    #[test]
    fn month_based_rule_rejects_weekday_anchor() {
        let new = make_new(Frequency::Monthly, Anchor::DayOfWeek(Weekday::Fri));
        let result = validate_new_rule(&new);
        assert!(!result.valid);
        let err = result.errors.iter().find(|e| e.path == "anchor").unwrap();
        assert!(err.suggestion.as_deref().unwrap().contains("day_of_month"));
    }

    #[test]
    fn day_of_month_out_of_range() {
        let new = make_new(Frequency::Monthly, Anchor::DayOfMonth(32));
        let result = validate_new_rule(&new);
        assert!(!result.valid);
        assert!(result.errors.iter().any(|e| e.path == "anchor.day_of_month"));

        let new = make_new(Frequency::Monthly, Anchor::DayOfMonth(0));
        assert!(!validate_new_rule(&new).valid);
    }

    #[test]
    fn high_day_of_month_warns_about_clamping() {
        let new = make_new(Frequency::Monthly, Anchor::DayOfMonth(31));
        let result = validate_new_rule(&new);
        assert!(result.valid);
        assert!(result
            .warnings
            .iter()
            .any(|w| w.path == "anchor.day_of_month"));
    }

    #[test]
    fn end_before_start_rejected() {
        let mut new = make_new(Frequency::Weekly, Anchor::DayOfWeek(Weekday::Mon));
        new.end_date = Some(NaiveDate::from_ymd_opt(2024, 12, 1).unwrap());
        let result = validate_new_rule(&new);
        assert!(!result.valid);
        assert!(result.errors.iter().any(|e| e.path == "end_date"));
    }

    #[test]
    fn end_equal_to_start_accepted() {
        let mut new = make_new(Frequency::Weekly, Anchor::DayOfWeek(Weekday::Mon));
        new.end_date = Some(new.start_date);
        assert!(validate_new_rule(&new).valid);
    }

    #[test]
    fn zero_duration_rejected() {
        let mut new = make_new(Frequency::Weekly, Anchor::DayOfWeek(Weekday::Mon));
        new.duration_minutes = 0;
        let result = validate_new_rule(&new);
        assert!(!result.valid);
        assert!(result.errors.iter().any(|e| e.path == "duration_minutes"));
    }

    #[test]
    fn long_duration_warns() {
        let mut new = make_new(Frequency::Weekly, Anchor::DayOfWeek(Weekday::Mon));
        new.duration_minutes = 10 * 60;
        let result = validate_new_rule(&new);
        assert!(result.valid);
        assert!(result
            .warnings
            .iter()
            .any(|w| w.path == "duration_minutes"));
    }

    #[test]
    fn multiple_violations_collected() {
        let mut new = make_new(Frequency::Monthly, Anchor::DayOfWeek(Weekday::Mon));
        new.duration_minutes = 0;
        new.end_date = Some(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        let result = validate_new_rule(&new);
        assert!(!result.valid);
        assert_eq!(result.errors.len(), 3);
    }

    // ── parse_service_type ──────────────────────────────────────────

    #[test]
    fn parse_service_type_exact() {
        assert_eq!(parse_service_type("deep").unwrap(), ServiceType::Deep);
    }

    #[test]
    fn parse_service_type_near_miss_suggests() {
        let err = parse_service_type("specialised").unwrap_err();
        assert_eq!(err.path, "service_type");
        assert!(err.suggestion.as_deref().unwrap().contains("specialized"));
    }

    #[test]
    fn parse_service_type_distant_input_has_no_suggestion() {
        let err = parse_service_type("zzzzzzzzzzzzzzzz").unwrap_err();
        assert!(err.suggestion.is_none());
    }

    #[test]
    fn levenshtein_basic() {
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("abc", "abc"), 0);
    }

    #[test]
    fn fuzzy_match_finds_close() {
        assert_eq!(fuzzy_match("regulr", &["regular", "deep"]), Some("regular"));
    }
}
