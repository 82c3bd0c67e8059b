//! FHIR `Observation` and its `value[x]` choice type.
//!
//! Responsibilities:
//! - Define the domain-level observation, with `value[x]` collapsed into [`ObservationValue`]
//! - Define the wire model that mirrors the JSON keys (`valueQuantity`, `valueString`, ...)
//! - Translate wire to domain via `#[serde(from = ...)]`
//!
//! Notes:
//! - Value types a viewer cannot render (`valuePeriod`, `valueSampledData`, ...) are dropped
//!   rather than rejected.

use crate::datatypes::{CodeableConcept, Quantity};
use crate::date::FhirDate;
use serde::Deserialize;

// ============================================================================
// Public domain-level types
// ============================================================================

/// The `value[x]` of an observation or observation component.
#[derive(Clone, Debug, PartialEq)]
pub enum ObservationValue {
    Quantity(Quantity),
    CodeableConcept(CodeableConcept),
    String(String),
    Integer(i64),
    Boolean(bool),
    DateTime(FhirDate),
}

/// A measurement or assertion, such as a lab result.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(from = "ObservationWire")]
pub struct Observation {
    pub id: Option<String>,
    pub status: Option<String>,
    pub code: CodeableConcept,
    /// `effectiveDateTime` or `effectiveInstant`.
    pub effective: Option<FhirDate>,
    pub value: Option<ObservationValue>,
    pub components: Vec<ObservationComponent>,
}

/// One part of a multi-part observation (for example systolic/diastolic).
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(from = "ComponentWire")]
pub struct ObservationComponent {
    pub code: CodeableConcept,
    pub value: Option<ObservationValue>,
}

// ============================================================================
// Wire types (internal)
// ============================================================================

/// The `value[x]` keys shared by `Observation` and `Observation.component`.
#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ValueWire {
    #[serde(default)]
    value_quantity: Option<Quantity>,
    #[serde(default)]
    value_codeable_concept: Option<CodeableConcept>,
    #[serde(default)]
    value_string: Option<String>,
    #[serde(default)]
    value_integer: Option<i64>,
    #[serde(default)]
    value_boolean: Option<bool>,
    #[serde(default)]
    value_date_time: Option<FhirDate>,
}

impl ValueWire {
    fn into_value(self) -> Option<ObservationValue> {
        // FHIR permits at most one value[x]; take the first present in declaration order.
        self.value_quantity
            .map(ObservationValue::Quantity)
            .or_else(|| {
                self.value_codeable_concept
                    .map(ObservationValue::CodeableConcept)
            })
            .or_else(|| self.value_string.map(ObservationValue::String))
            .or_else(|| self.value_integer.map(ObservationValue::Integer))
            .or_else(|| self.value_boolean.map(ObservationValue::Boolean))
            .or_else(|| self.value_date_time.map(ObservationValue::DateTime))
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObservationWire {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    code: CodeableConcept,
    #[serde(default)]
    effective_date_time: Option<FhirDate>,
    #[serde(default)]
    effective_instant: Option<FhirDate>,
    #[serde(flatten)]
    value: ValueWire,
    #[serde(default)]
    component: Vec<ObservationComponent>,
}

#[derive(Deserialize)]
struct ComponentWire {
    #[serde(default)]
    code: CodeableConcept,
    #[serde(flatten)]
    value: ValueWire,
}

impl From<ObservationWire> for Observation {
    fn from(wire: ObservationWire) -> Self {
        Self {
            id: wire.id,
            status: wire.status,
            code: wire.code,
            effective: wire.effective_date_time.or(wire.effective_instant),
            value: wire.value.into_value(),
            components: wire.component,
        }
    }
}

impl From<ComponentWire> for ObservationComponent {
    fn from(wire: ComponentWire) -> Self {
        Self {
            code: wire.code,
            value: wire.value.into_value(),
        }
    }
}
