//! FHIR `Patient` as carried in a health card.
//!
//! Health cards include only the minimum demographics needed to match the card to a person:
//! name(s) and birth date.

use crate::datatypes::HumanName;
use crate::date::FhirDate;
use serde::{Deserialize, Serialize};

/// Patient demographics.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Names in issuer order; viewers show the first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub name: Vec<HumanName>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<FhirDate>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
}
