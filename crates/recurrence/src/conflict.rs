//! Candidate-versus-calendar conflict checking.
//!
//! A conflict is any half-open overlap between a candidate occurrence and an
//! interval the team is already committed to. Conflicts are never resolved
//! here; they are returned as distinct outcomes so double-booking stays a
//! visible, attributable event for the caller to handle manually.

use serde::Serialize;

use sweeply_core::BusyInterval;

use crate::schema::Occurrence;
use crate::traits::CalendarSnapshot;

/// Result of checking a single candidate against a calendar snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum CandidateOutcome {
    Accepted,
    /// The earliest existing commitment the candidate overlaps.
    Conflict { with: BusyInterval },
}

impl CandidateOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, CandidateOutcome::Accepted)
    }
}

/// A candidate occurrence paired with its conflict-check outcome.
#[derive(Debug, Clone, Serialize)]
pub struct PlannedVisit {
    pub occurrence: Occurrence,
    #[serde(flatten)]
    pub outcome: CandidateOutcome,
}

pub struct ConflictChecker;

impl ConflictChecker {
    /// Check one candidate against a team-calendar snapshot.
    pub fn check(candidate: &Occurrence, snapshot: &CalendarSnapshot) -> CandidateOutcome {
        let hit = snapshot
            .busy
            .iter()
            .filter(|busy| busy.overlaps(candidate.scheduled_start, candidate.scheduled_end))
            .min_by_key(|busy| busy.start);

        match hit {
            Some(busy) => CandidateOutcome::Conflict { with: *busy },
            None => CandidateOutcome::Accepted,
        }
    }

    /// Check a batch of candidates. A conflict on one candidate never blocks
    /// the others.
    pub fn check_batch(candidates: &[Occurrence], snapshot: &CalendarSnapshot) -> Vec<PlannedVisit> {
        candidates
            .iter()
            .map(|candidate| PlannedVisit {
                occurrence: *candidate,
                outcome: Self::check(candidate, snapshot),
            })
            .collect()
    }
}
