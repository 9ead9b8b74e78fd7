//! In-memory structured audit log for rule scheduling activity.
//!
//! Stores per-rule log entries capped at a configurable maximum (default 500)
//! with FIFO eviction. Uses `std::sync::RwLock` so it can be written from
//! both async service paths and synchronous helpers. The dashboard reads this
//! to show a rule's recent scheduling history.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use sweeply_core::RuleId;

/// Severity level for audit log entries.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl LogLevel {
    /// Numeric severity for comparison (higher = more severe).
    pub fn as_severity(&self) -> u8 {
        match self {
            LogLevel::Debug => 0,
            LogLevel::Info => 1,
            LogLevel::Warning => 2,
            LogLevel::Error => 3,
        }
    }
}

/// Phase of the scheduling flow that produced the log entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SchedulingPhase {
    Validation,
    Generation,
    ConflictCheck,
    Execution,
    Transition,
    Persistence,
}

/// A single audit log entry for a rule.
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub rule_id: RuleId,
    pub level: LogLevel,
    pub phase: SchedulingPhase,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Query parameters for filtering audit log entries.
#[derive(Debug, Default, Deserialize)]
pub struct LogQuery {
    /// Minimum log level (inclusive). Entries below this severity are excluded.
    pub level: Option<LogLevel>,
    /// Filter to a specific scheduling phase.
    pub phase: Option<SchedulingPhase>,
    /// Maximum number of entries to return (default 100).
    pub limit: Option<u32>,
    /// Only return entries at or after this instant.
    pub since: Option<DateTime<Utc>>,
}

/// In-memory per-rule audit log with FIFO eviction.
pub struct AuditLog {
    entries: Arc<RwLock<HashMap<RuleId, VecDeque<LogEntry>>>>,
    max_entries_per_rule: usize,
}

impl AuditLog {
    /// Create a new audit log with the default cap of 500 entries per rule.
    pub fn new() -> Self {
        Self::with_max_entries(500)
    }

    /// Create a new audit log with a custom per-rule entry cap.
    pub fn with_max_entries(max: usize) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            max_entries_per_rule: max,
        }
    }

    /// Append a basic log entry for a rule.
    pub fn log(
        &self,
        rule_id: RuleId,
        level: LogLevel,
        phase: SchedulingPhase,
        message: impl Into<String>,
    ) {
        self.log_with_details(rule_id, level, phase, message, None);
    }

    /// Append a log entry with optional structured details.
    pub fn log_with_details(
        &self,
        rule_id: RuleId,
        level: LogLevel,
        phase: SchedulingPhase,
        message: impl Into<String>,
        details: Option<serde_json::Value>,
    ) {
        let entry = LogEntry {
            timestamp: Utc::now(),
            rule_id,
            level,
            phase,
            message: message.into(),
            details,
        };

        let mut guard = self.entries.write().expect("audit_log lock poisoned");
        let deque = guard.entry(rule_id).or_insert_with(VecDeque::new);
        deque.push_back(entry);
        while deque.len() > self.max_entries_per_rule {
            deque.pop_front();
        }
    }

    /// Query log entries for a rule, newest-first.
    pub fn query(&self, rule_id: RuleId, params: &LogQuery) -> Vec<LogEntry> {
        let guard = self.entries.read().expect("audit_log lock poisoned");
        let Some(deque) = guard.get(&rule_id) else {
            return Vec::new();
        };

        let min_severity = params
            .level
            .as_ref()
            .map(|l| l.as_severity())
            .unwrap_or(0);
        let limit = params.limit.unwrap_or(100) as usize;

        deque
            .iter()
            .rev()
            .filter(|e| e.level.as_severity() >= min_severity)
            .filter(|e| params.phase.as_ref().map_or(true, |p| &e.phase == p))
            .filter(|e| params.since.map_or(true, |s| e.timestamp >= s))
            .take(limit)
            .cloned()
            .collect()
    }

    /// Clear all log entries for a specific rule.
    pub fn clear(&self, rule_id: RuleId) {
        let mut guard = self.entries.write().expect("audit_log lock poisoned");
        guard.remove(&rule_id);
    }
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn basic_log_and_query_newest_first() {
        let log = AuditLog::new();
        let rule = Uuid::new_v4();
        log.log(rule, LogLevel::Info, SchedulingPhase::Validation, "validated");
        log.log(rule, LogLevel::Debug, SchedulingPhase::Generation, "5 candidates");
        log.log(rule, LogLevel::Warning, SchedulingPhase::ConflictCheck, "1 conflict");

        let entries = log.query(rule, &LogQuery::default());
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].phase, SchedulingPhase::ConflictCheck);
        assert_eq!(entries[2].phase, SchedulingPhase::Validation);
    }

    #[test]
    fn level_filter_excludes_lower_severity() {
        let log = AuditLog::new();
        let rule = Uuid::new_v4();
        log.log(rule, LogLevel::Debug, SchedulingPhase::Generation, "debug");
        log.log(rule, LogLevel::Info, SchedulingPhase::Generation, "info");
        log.log(rule, LogLevel::Warning, SchedulingPhase::Generation, "warn");
        log.log(rule, LogLevel::Error, SchedulingPhase::Persistence, "error");

        let params = LogQuery {
            level: Some(LogLevel::Warning),
            ..LogQuery::default()
        };
        let entries = log.query(rule, &params);
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| e.level.as_severity() >= 2));
    }

    #[test]
    fn phase_filter() {
        let log = AuditLog::new();
        let rule = Uuid::new_v4();
        log.log(rule, LogLevel::Info, SchedulingPhase::Execution, "completed");
        log.log(rule, LogLevel::Info, SchedulingPhase::Transition, "paused");
        log.log(rule, LogLevel::Info, SchedulingPhase::Execution, "completed");

        let params = LogQuery {
            phase: Some(SchedulingPhase::Execution),
            ..LogQuery::default()
        };
        let entries = log.query(rule, &params);
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| e.phase == SchedulingPhase::Execution));
    }

    #[test]
    fn limit_caps_result_size() {
        let log = AuditLog::new();
        let rule = Uuid::new_v4();
        for i in 0..10 {
            log.log(rule, LogLevel::Info, SchedulingPhase::Generation, format!("msg {}", i));
        }

        let params = LogQuery {
            limit: Some(3),
            ..LogQuery::default()
        };
        assert_eq!(log.query(rule, &params).len(), 3);
    }

    #[test]
    fn fifo_eviction_drops_oldest() {
        let log = AuditLog::with_max_entries(3);
        let rule = Uuid::new_v4();
        for i in 1..=4 {
            log.log(rule, LogLevel::Info, SchedulingPhase::Generation, format!("msg {}", i));
        }

        let entries = log.query(rule, &LogQuery::default());
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[2].message, "msg 2");
        assert_eq!(entries[0].message, "msg 4");
    }

    #[test]
    fn clear_removes_rule_history() {
        let log = AuditLog::new();
        let rule = Uuid::new_v4();
        log.log(rule, LogLevel::Info, SchedulingPhase::Generation, "msg");
        log.clear(rule);
        assert!(log.query(rule, &LogQuery::default()).is_empty());
    }

    #[test]
    fn unknown_rule_yields_nothing() {
        let log = AuditLog::new();
        assert!(log.query(Uuid::new_v4(), &LogQuery::default()).is_empty());
    }

    #[test]
    fn per_rule_isolation() {
        let log = AuditLog::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        log.log(a, LogLevel::Info, SchedulingPhase::Generation, "a msg");
        log.log(b, LogLevel::Error, SchedulingPhase::Persistence, "b msg");

        assert_eq!(log.query(a, &LogQuery::default()).len(), 1);
        assert_eq!(log.query(b, &LogQuery::default())[0].rule_id, b);
    }

    #[test]
    fn details_are_preserved() {
        let log = AuditLog::new();
        let rule = Uuid::new_v4();
        let details = serde_json::json!({"candidates": 5, "conflicts": 1});
        log.log_with_details(
            rule,
            LogLevel::Info,
            SchedulingPhase::ConflictCheck,
            "window planned",
            Some(details.clone()),
        );

        let entries = log.query(rule, &LogQuery::default());
        assert_eq!(entries[0].details, Some(details));
    }
}
