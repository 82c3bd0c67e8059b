//! FHIR general-purpose data types used by health card resources.
//!
//! These are wire and domain types at once: the FHIR JSON shape is already what the display
//! layer wants, so there is no separate translation step. Unknown keys are ignored because
//! issuers routinely include elements a viewer does not render.

use serde::{Deserialize, Serialize};

/// A reference to a code defined by a terminology system.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Coding {
    /// Code-system URI, e.g. `http://loinc.org`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    /// Human display text. Minified health cards normally omit it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

/// A concept expressed as zero or more codings plus optional plain text.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct CodeableConcept {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub coding: Vec<Coding>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl CodeableConcept {
    /// Convenience constructor for a single-coding concept.
    pub fn from_coding(system: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            coding: vec![Coding {
                system: Some(system.into()),
                code: Some(code.into()),
                ..Coding::default()
            }],
            text: None,
        }
    }
}

/// A measured amount.
///
/// FHIR `decimal` values are carried as `f64`; health card quantities are lab values and
/// vital signs, well inside `f64` precision.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct Quantity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,

    /// One of `<`, `<=`, `>=`, `>`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comparator: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// A human name with text, parts and usage information.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct HumanName {
    #[serde(rename = "use", default, skip_serializing_if = "Option::is_none")]
    pub use_type: Option<String>,

    /// Pre-composed full name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub given: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prefix: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suffix: Vec<String>,
}

/// A reference from one resource to another.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Reference {
    /// Literal reference, e.g. `resource:0`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}
