//! FHIR `Immunization`.

use crate::datatypes::{CodeableConcept, Reference};
use crate::date::FhirDate;
use serde::Deserialize;

/// A vaccine administration event.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "ImmunizationWire")]
pub struct Immunization {
    pub id: Option<String>,
    pub status: Option<String>,
    pub vaccine_code: CodeableConcept,
    /// `occurrenceDateTime`. Free-text occurrences (`occurrenceString`) are not dated.
    pub occurrence: Option<FhirDate>,
    pub lot_number: Option<String>,
    pub performers: Vec<ImmunizationPerformer>,
}

/// Who performed the immunization.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct ImmunizationPerformer {
    #[serde(default)]
    pub actor: Reference,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImmunizationWire {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    vaccine_code: CodeableConcept,
    #[serde(default)]
    occurrence_date_time: Option<FhirDate>,
    #[serde(default)]
    lot_number: Option<String>,
    #[serde(default)]
    performer: Vec<ImmunizationPerformer>,
}

impl From<ImmunizationWire> for Immunization {
    fn from(wire: ImmunizationWire) -> Self {
        Self {
            id: wire.id,
            status: wire.status,
            vaccine_code: wire.vaccine_code,
            occurrence: wire.occurrence_date_time,
            lot_number: wire.lot_number,
            performers: wire.performer,
        }
    }
}
