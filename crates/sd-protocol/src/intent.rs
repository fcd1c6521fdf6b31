use std::fmt;

use serde::{Deserialize, Serialize};

/// Action category a free-text utterance is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Intent {
    /// List the services catalog.
    #[serde(rename = "services.list")]
    ServicesList,
    /// Create a new appointment from the utterance.
    #[serde(rename = "appointments.create")]
    AppointmentsCreate,
    /// Patch (or cancel) an existing appointment by booking id.
    #[serde(rename = "appointments.update")]
    AppointmentsUpdate,
    /// Read-only question answered from the knowledge index.
    #[serde(rename = "qa")]
    Qa,
}

impl Intent {
    /// Wire name, identical to the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::ServicesList => "services.list",
            Intent::AppointmentsCreate => "appointments.create",
            Intent::AppointmentsUpdate => "appointments.update",
            Intent::Qa => "qa",
        }
    }

    /// Whether routing to this intent may write to the store.
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Intent::AppointmentsCreate | Intent::AppointmentsUpdate
        )
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reply tag used while the answer engine is still being built.
pub const QA_INITIALIZING: &str = "qa_initializing";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intent_serialization_matches_as_str() {
        for intent in [
            Intent::ServicesList,
            Intent::AppointmentsCreate,
            Intent::AppointmentsUpdate,
            Intent::Qa,
        ] {
            let json = serde_json::to_string(&intent).unwrap();
            assert_eq!(json, format!("\"{}\"", intent.as_str()));
        }
    }

    #[test]
    fn intent_deserialization() {
        let intent: Intent = serde_json::from_str(r#""appointments.update""#).unwrap();
        assert_eq!(intent, Intent::AppointmentsUpdate);
    }

    #[test]
    fn only_booking_intents_mutate() {
        assert!(Intent::AppointmentsCreate.is_mutation());
        assert!(Intent::AppointmentsUpdate.is_mutation());
        assert!(!Intent::ServicesList.is_mutation());
        assert!(!Intent::Qa.is_mutation());
    }
}
