use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of a recurrence rule.
pub type RuleId = Uuid;
/// Identifier of the company that owns a rule.
pub type CompanyId = Uuid;
/// Identifier of the customer a rule serves.
pub type CustomerId = Uuid;
/// Identifier of the team assigned to carry out the visits.
pub type TeamId = Uuid;
/// Identifier of a booked appointment (owned by the appointment collaborator).
pub type AppointmentId = Uuid;

/// Kind of cleaning visit a rule books.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceType {
    Regular,
    Deep,
    Specialized,
}

impl ServiceType {
    /// All known service types, for validation suggestions.
    pub const ALL: &'static [ServiceType] =
        &[ServiceType::Regular, ServiceType::Deep, ServiceType::Specialized];

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceType::Regular => "regular",
            ServiceType::Deep => "deep",
            ServiceType::Specialized => "specialized",
        }
    }
}

impl std::fmt::Display for ServiceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ServiceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "regular" => Ok(ServiceType::Regular),
            "deep" => Ok(ServiceType::Deep),
            "specialized" => Ok(ServiceType::Specialized),
            other => Err(format!("unknown service type: '{}'", other)),
        }
    }
}
