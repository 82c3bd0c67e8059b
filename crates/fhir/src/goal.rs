//! FHIR `Goal`.

use crate::datatypes::CodeableConcept;
use crate::date::FhirDate;
use serde::Deserialize;

/// A desired health state, such as a personal wellbeing goal.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "GoalWire")]
pub struct Goal {
    pub id: Option<String>,
    pub lifecycle_status: Option<String>,
    pub description: CodeableConcept,
    /// `startDate`. A coded start (`startCodeableConcept`) has no calendar date and is dropped.
    pub start_date: Option<FhirDate>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoalWire {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    lifecycle_status: Option<String>,
    #[serde(default)]
    description: CodeableConcept,
    #[serde(default)]
    start_date: Option<FhirDate>,
}

impl From<GoalWire> for Goal {
    fn from(wire: GoalWire) -> Self {
        Self {
            id: wire.id,
            lifecycle_status: wire.lifecycle_status,
            description: wire.description,
            start_date: wire.start_date,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_start_date_and_description() {
        let goal: Goal = serde_json::from_str(
            r#"{
                "resourceType": "Goal",
                "lifecycleStatus": "active",
                "description": {"coding": [{"system": "http://snomed.info/sct", "code": "247751003"}]},
                "startDate": "2023-09-01"
            }"#,
        )
        .expect("parse goal");

        assert_eq!(goal.lifecycle_status.as_deref(), Some("active"));
        assert_eq!(goal.description.coding[0].code.as_deref(), Some("247751003"));
        assert_eq!(goal.start_date.map(|d| d.day()), Some(Some(1)));
    }

    #[test]
    fn coded_start_leaves_start_date_empty() {
        let goal: Goal = serde_json::from_str(
            r#"{"description": {"text": "Walk daily"}, "startCodeableConcept": {"text": "soon"}}"#,
        )
        .expect("parse goal");
        assert!(goal.start_date.is_none());
    }
}
