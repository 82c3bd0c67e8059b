//! FHIR `Condition`.

use crate::datatypes::CodeableConcept;
use crate::date::FhirDate;
use serde::Deserialize;

/// A clinical condition, problem or diagnosis.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "ConditionWire")]
pub struct Condition {
    pub id: Option<String>,
    pub clinical_status: Option<CodeableConcept>,
    pub code: Option<CodeableConcept>,
    /// `onsetDateTime`.
    pub onset: Option<FhirDate>,
    pub recorded_date: Option<FhirDate>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConditionWire {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    clinical_status: Option<CodeableConcept>,
    #[serde(default)]
    code: Option<CodeableConcept>,
    #[serde(default)]
    onset_date_time: Option<FhirDate>,
    #[serde(default)]
    recorded_date: Option<FhirDate>,
}

impl From<ConditionWire> for Condition {
    fn from(wire: ConditionWire) -> Self {
        Self {
            id: wire.id,
            clinical_status: wire.clinical_status,
            code: wire.code,
            onset: wire.onset_date_time,
            recorded_date: wire.recorded_date,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_onset_and_recorded_dates() {
        let condition: Condition = serde_json::from_str(
            r#"{
                "resourceType": "Condition",
                "code": {"coding": [{"system": "http://snomed.info/sct", "code": "38341003"}]},
                "onsetDateTime": "2019-06-01",
                "recordedDate": "2019-06-03"
            }"#,
        )
        .expect("parse condition");

        assert_eq!(condition.onset.map(|d| d.day()), Some(Some(1)));
        assert_eq!(condition.recorded_date.map(|d| d.day()), Some(Some(3)));
    }
}
