//! Polymorphic clinical resource carried in a health card bundle entry.
//!
//! Dispatch is on the `resourceType` key: known types are deserialized into their typed model,
//! everything else is kept as [`ClinicalResource::Other`] with only its type name. A resource
//! without a `resourceType` cannot be resolved and is reported as `None` so callers can skip it.

use crate::condition::Condition;
use crate::goal::Goal;
use crate::immunization::Immunization;
use crate::medication_request::MedicationRequest;
use crate::observation::Observation;
use crate::patient::Patient;
use crate::{deserialize_with_path, FhirResult};
use serde_json::Value;

/// A clinical resource from the credential subject's FHIR bundle.
#[derive(Clone, Debug, PartialEq)]
pub enum ClinicalResource {
    Condition(Condition),
    Goal(Goal),
    Immunization(Immunization),
    MedicationRequest(MedicationRequest),
    Observation(Observation),
    Patient(Patient),
    /// A resource type this crate does not model.
    Other { resource_type: String },
}

impl ClinicalResource {
    /// Translate a raw JSON resource into a typed resource.
    ///
    /// `path` is the location of `value` inside the payload and is used in error messages.
    ///
    /// # Returns
    ///
    /// `Ok(None)` if `value` has no string `resourceType`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::FhirError::Schema`] if a known resource type does not match its model.
    pub fn from_value(value: Value, path: &str) -> FhirResult<Option<Self>> {
        let Some(resource_type) = value
            .get("resourceType")
            .and_then(Value::as_str)
            .map(str::to_owned)
        else {
            return Ok(None);
        };

        let resource = match resource_type.as_str() {
            "Condition" => Self::Condition(deserialize_with_path(value, &resource_type, path)?),
            "Goal" => Self::Goal(deserialize_with_path(value, &resource_type, path)?),
            "Immunization" => {
                Self::Immunization(deserialize_with_path(value, &resource_type, path)?)
            }
            "MedicationRequest" => {
                Self::MedicationRequest(deserialize_with_path(value, &resource_type, path)?)
            }
            "Observation" => Self::Observation(deserialize_with_path(value, &resource_type, path)?),
            "Patient" => Self::Patient(deserialize_with_path(value, &resource_type, path)?),
            _ => Self::Other { resource_type },
        };

        Ok(Some(resource))
    }

    /// The FHIR `resourceType` name.
    pub fn resource_type(&self) -> &str {
        match self {
            Self::Condition(_) => "Condition",
            Self::Goal(_) => "Goal",
            Self::Immunization(_) => "Immunization",
            Self::MedicationRequest(_) => "MedicationRequest",
            Self::Observation(_) => "Observation",
            Self::Patient(_) => "Patient",
            Self::Other { resource_type } => resource_type,
        }
    }
}
