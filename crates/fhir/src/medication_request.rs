//! FHIR `MedicationRequest`.

use crate::datatypes::CodeableConcept;
use crate::date::FhirDate;
use serde::Deserialize;

/// A prescription or medication order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "MedicationRequestWire")]
pub struct MedicationRequest {
    pub id: Option<String>,
    pub status: Option<String>,
    /// `medicationCodeableConcept`. A `medicationReference` is not resolved.
    pub medication: Option<CodeableConcept>,
    pub authored_on: Option<FhirDate>,
    pub dosage_instructions: Vec<Dosage>,
}

/// Free-text dosage instruction.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct Dosage {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MedicationRequestWire {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    medication_codeable_concept: Option<CodeableConcept>,
    #[serde(default)]
    authored_on: Option<FhirDate>,
    #[serde(default)]
    dosage_instruction: Vec<Dosage>,
}

impl From<MedicationRequestWire> for MedicationRequest {
    fn from(wire: MedicationRequestWire) -> Self {
        Self {
            id: wire.id,
            status: wire.status,
            medication: wire.medication_codeable_concept,
            authored_on: wire.authored_on,
            dosage_instructions: wire.dosage_instruction,
        }
    }
}
