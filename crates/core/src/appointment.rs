use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::{AppointmentId, CustomerId, RuleId, ServiceType, TeamId};

/// A booked visit materialized from a rule occurrence.
///
/// Appointments are owned by the booking side of the platform; this type is
/// the slice the scheduler needs to create them and to reason about what a
/// team is already committed to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: AppointmentId,
    pub rule_id: Option<RuleId>,
    pub customer_id: CustomerId,
    pub team_id: TeamId,
    pub service_type: ServiceType,
    pub scheduled_start: DateTime<Utc>,
    pub scheduled_end: DateTime<Utc>,
}

impl Appointment {
    pub fn busy_interval(&self) -> BusyInterval {
        BusyInterval {
            start: self.scheduled_start,
            end: self.scheduled_end,
        }
    }
}

/// A half-open time interval `[start, end)` during which a team is committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusyInterval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl BusyInterval {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// True when this interval overlaps `[start, end)`.
    ///
    /// Intervals are half-open, so back-to-back bookings (one ending exactly
    /// when the next starts) do not overlap.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start < end && start < self.end
    }
}
