//! FHIR wire/boundary support for SMART Health Cards.
//!
//! This crate provides **wire models** and **translation helpers** for the JSON payload carried
//! inside a SMART Health Card:
//! - the verifiable-credential envelope (`iss`, `nbf`, `vc.credentialSubject`)
//! - the embedded FHIR R4 `Bundle`
//! - the handful of clinical resources a card viewer renders
//!
//! This crate focuses on:
//! - serialisation/deserialisation with field-path error reporting
//! - translation of FHIR choice types (`value[x]`, `effective[x]`, ...) into Rust enums
//! - partial-date parsing (`FhirDate`)
//!
//! It does not know about JWS framing, compression or display text; those live in `shc-core`.

pub mod condition;
pub mod datatypes;
pub mod date;
pub mod goal;
pub mod health_card;
pub mod immunization;
pub mod medication_request;
pub mod observation;
pub mod patient;
pub mod resource;

// Re-export facades
pub use health_card::{Bundle, BundleEntry, CredentialSubject, HealthCard, VerifiableCredential};
pub use resource::ClinicalResource;

// Re-export public domain-level types
pub use condition::Condition;
pub use datatypes::{CodeableConcept, Coding, HumanName, Quantity, Reference};
pub use date::FhirDate;
pub use goal::Goal;
pub use immunization::{Immunization, ImmunizationPerformer};
pub use medication_request::{Dosage, MedicationRequest};
pub use observation::{Observation, ObservationComponent, ObservationValue};
pub use patient::Patient;

/// Errors returned by the `fhir` boundary crate.
#[derive(Debug, thiserror::Error)]
pub enum FhirError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("{resource} schema mismatch at {path}: {message}")]
    Schema {
        resource: String,
        path: String,
        message: String,
    },

    #[error("invalid FHIR date: '{0}'")]
    InvalidDate(String),
}

/// Type alias for Results that can fail with a [`FhirError`].
pub type FhirResult<T> = Result<T, FhirError>;

/// Deserialize `T` with `serde_path_to_error`, reporting the failing field path.
///
/// `prefix` is prepended to the path so that nested documents (for example a resource inside
/// `entry[2]`) report a location relative to the outer payload.
pub(crate) fn deserialize_with_path<'de, D, T>(
    deserializer: D,
    resource: &str,
    prefix: &str,
) -> FhirResult<T>
where
    D: serde::Deserializer<'de>,
    T: serde::Deserialize<'de>,
{
    serde_path_to_error::deserialize(deserializer).map_err(|err| {
        let path = err.path().to_string();
        let message = err.into_inner().to_string();
        let path = match (prefix.is_empty(), path.as_str()) {
            (true, ".") | (true, "") => "<root>".to_string(),
            (true, _) => path,
            (false, ".") | (false, "") => prefix.to_string(),
            (false, _) => format!("{prefix}.{path}"),
        };
        FhirError::Schema {
            resource: resource.to_string(),
            path,
            message,
        }
    })
}
