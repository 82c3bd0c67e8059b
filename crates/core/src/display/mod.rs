//! Human-readable projection of clinical resources.
//!
//! Responsibilities:
//! - Compute a title, optional subtitle and optional detail per resource type
//! - Pick an icon hint for the presentation layer
//! - Delegate coded-value text to a [`CodeSystemResolver`] passed in by the caller
//!
//! Notes:
//! - Projection is a pure function of the resource, the resolver and [`DisplayOptions`]; nothing
//!   is cached, so results always reflect the resolver passed in.
//! - Projection never fails. Missing or malformed fields leave their slot `None`, and the
//!   title always falls back to a fixed label.

pub mod coded;
pub mod format;

use crate::code_system::CodeSystemResolver;
use crate::config::{local_offset, CoreConfig};
use chrono::FixedOffset;
use coded::concept_display;
use fhir::{
    ClinicalResource, Condition, Goal, Immunization, MedicationRequest, Observation,
    ObservationComponent, ObservationValue, Patient,
};
use format::{format_date, format_quantity, full_name, non_empty, DateStyle};

/// Display strings for one resource.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DisplayFields {
    /// Never empty.
    pub title: String,
    pub subtitle: Option<String>,
    pub detail: Option<String>,
}

/// Presentation hint naming the symbol to show beside a resource.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IconHint {
    Stethoscope,
    Flag,
    CrossVial,
    Pills,
    CheckmarkRectangle,
    Person,
}

impl IconHint {
    pub fn as_str(self) -> &'static str {
        match self {
            IconHint::Stethoscope => "stethoscope",
            IconHint::Flag => "flag",
            IconHint::CrossVial => "cross.vial",
            IconHint::Pills => "pills",
            IconHint::CheckmarkRectangle => "checkmark.rectangle",
            IconHint::Person => "person",
        }
    }
}

/// One presentation row: display fields plus icon hint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResourceRow {
    pub fields: DisplayFields,
    pub icon: Option<IconHint>,
}

/// Reader-dependent display settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DisplayOptions {
    /// Offset that time-bearing dates are converted to before their calendar date is shown.
    pub offset: FixedOffset,
}

impl DisplayOptions {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    pub fn from_config(config: &CoreConfig) -> Self {
        Self::new(config.display_offset())
    }
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self::new(local_offset())
    }
}

/// Project `resource` using the machine's local offset for dates.
pub fn project(resource: &ClinicalResource, resolver: &CodeSystemResolver) -> DisplayFields {
    project_with(resource, resolver, &DisplayOptions::default())
}

pub fn project_with(
    resource: &ClinicalResource,
    resolver: &CodeSystemResolver,
    options: &DisplayOptions,
) -> DisplayFields {
    let projector = Projector {
        resolver,
        offset: options.offset,
    };
    match resource {
        ClinicalResource::Condition(condition) => projector.condition(condition),
        ClinicalResource::Goal(goal) => projector.goal(goal),
        ClinicalResource::Immunization(immunization) => projector.immunization(immunization),
        ClinicalResource::MedicationRequest(request) => projector.medication_request(request),
        ClinicalResource::Observation(observation) => projector.observation(observation),
        ClinicalResource::Patient(patient) => projector.patient(patient),
        ClinicalResource::Other { resource_type } => DisplayFields {
            title: non_empty(Some(resource_type.as_str()))
                .unwrap_or("Resource")
                .to_string(),
            subtitle: None,
            detail: None,
        },
    }
}

pub fn icon_hint(resource: &ClinicalResource) -> Option<IconHint> {
    match resource {
        ClinicalResource::Condition(_) => Some(IconHint::Stethoscope),
        ClinicalResource::Goal(_) => Some(IconHint::Flag),
        ClinicalResource::Immunization(_) => Some(IconHint::CrossVial),
        ClinicalResource::MedicationRequest(_) => Some(IconHint::Pills),
        ClinicalResource::Observation(_) => Some(IconHint::CheckmarkRectangle),
        ClinicalResource::Patient(_) => Some(IconHint::Person),
        ClinicalResource::Other { .. } => None,
    }
}

pub fn row(
    resource: &ClinicalResource,
    resolver: &CodeSystemResolver,
    options: &DisplayOptions,
) -> ResourceRow {
    ResourceRow {
        fields: project_with(resource, resolver, options),
        icon: icon_hint(resource),
    }
}

/// Display text for an observation `value[x]`.
pub fn value_display(value: &ObservationValue, resolver: &CodeSystemResolver) -> Option<String> {
    match value {
        ObservationValue::Quantity(quantity) => format_quantity(quantity),
        ObservationValue::CodeableConcept(concept) => concept_display(concept, resolver),
        ObservationValue::String(text) => non_empty(Some(text.as_str())).map(str::to_string),
        ObservationValue::Integer(n) => Some(n.to_string()),
        ObservationValue::Boolean(b) => Some(b.to_string()),
        ObservationValue::DateTime(_) => None,
    }
}

struct Projector<'a> {
    resolver: &'a CodeSystemResolver,
    offset: FixedOffset,
}

impl Projector<'_> {
    fn patient(&self, patient: &Patient) -> DisplayFields {
        DisplayFields {
            title: patient
                .name
                .first()
                .and_then(full_name)
                .unwrap_or_else(|| "Patient".into()),
            subtitle: patient
                .birth_date
                .as_ref()
                .and_then(|d| format_date(d, DateStyle::Long, self.offset)),
            detail: None,
        }
    }

    fn goal(&self, goal: &Goal) -> DisplayFields {
        DisplayFields {
            title: "Goal".into(),
            subtitle: goal
                .start_date
                .as_ref()
                .and_then(|d| format_date(d, DateStyle::Medium, self.offset))
                .map(|date| format!("Starting {date}")),
            detail: Some(
                concept_display(&goal.description, self.resolver)
                    .unwrap_or_else(|| "Goal".into()),
            ),
        }
    }

    fn immunization(&self, immunization: &Immunization) -> DisplayFields {
        DisplayFields {
            title: concept_display(&immunization.vaccine_code, self.resolver)
                .unwrap_or_else(|| "Immunization".into()),
            subtitle: immunization
                .occurrence
                .as_ref()
                .and_then(|d| format_date(d, DateStyle::Long, self.offset)),
            detail: immunization
                .performers
                .first()
                .and_then(|p| non_empty(p.actor.display.as_deref()))
                .map(str::to_string),
        }
    }

    fn observation(&self, observation: &Observation) -> DisplayFields {
        let detail = match &observation.value {
            Some(value) => value_display(value, self.resolver),
            None => self.components(&observation.components),
        };

        DisplayFields {
            title: concept_display(&observation.code, self.resolver)
                .unwrap_or_else(|| "Observation".into()),
            subtitle: observation
                .effective
                .as_ref()
                .and_then(|d| format_date(d, DateStyle::Long, self.offset)),
            detail,
        }
    }

    /// `"<code> = <value>"` for every component with both, joined by `", "`.
    fn components(&self, components: &[ObservationComponent]) -> Option<String> {
        let parts: Vec<String> = components
            .iter()
            .filter_map(|component| {
                let code = component
                    .code
                    .coding
                    .first()
                    .and_then(|c| non_empty(c.code.as_deref()))?;
                let value = value_display(component.value.as_ref()?, self.resolver)?;
                Some(format!("{code} = {value}"))
            })
            .collect();

        if parts.is_empty() {
            None
        } else {
            Some(parts.join(", "))
        }
    }

    fn condition(&self, condition: &Condition) -> DisplayFields {
        DisplayFields {
            title: condition
                .code
                .as_ref()
                .and_then(|code| concept_display(code, self.resolver))
                .unwrap_or_else(|| "Condition".into()),
            subtitle: condition
                .onset
                .as_ref()
                .or(condition.recorded_date.as_ref())
                .and_then(|d| format_date(d, DateStyle::Long, self.offset)),
            detail: None,
        }
    }

    fn medication_request(&self, request: &MedicationRequest) -> DisplayFields {
        DisplayFields {
            title: request
                .medication
                .as_ref()
                .and_then(|m| concept_display(m, self.resolver))
                .unwrap_or_else(|| "MedicationRequest".into()),
            subtitle: request
                .authored_on
                .as_ref()
                .and_then(|d| format_date(d, DateStyle::Long, self.offset)),
            detail: request
                .dosage_instructions
                .first()
                .and_then(|d| non_empty(d.text.as_deref()))
                .map(str::to_string),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Offset, Utc};
    use fhir::{
        CodeableConcept, Coding, Dosage, FhirDate, HumanName, ImmunizationPerformer, Quantity,
        Reference,
    };

    const LOINC: &str = "http://loinc.org";

    fn utc() -> DisplayOptions {
        DisplayOptions::new(Utc.fix())
    }

    fn date(s: &str) -> Option<FhirDate> {
        Some(FhirDate::parse(s).expect("valid date"))
    }

    fn show(resource: ClinicalResource) -> DisplayFields {
        project_with(&resource, &CodeSystemResolver::bundled(), &utc())
    }

    #[test]
    fn patient_uses_name_and_long_birth_date() {
        let fields = show(ClinicalResource::Patient(Patient {
            name: vec![HumanName {
                given: vec!["John".into(), "B.".into()],
                family: Some("Anyperson".into()),
                ..Default::default()
            }],
            birth_date: date("1951-01-20"),
            ..Default::default()
        }));
        assert_eq!(fields.title, "John B. Anyperson");
        assert_eq!(fields.subtitle.as_deref(), Some("January 20, 1951"));
        assert_eq!(fields.detail, None);
    }

    #[test]
    fn nameless_patient_falls_back_to_type() {
        let fields = show(ClinicalResource::Patient(Patient::default()));
        assert_eq!(fields.title, "Patient");
        assert_eq!(fields.subtitle, None);
    }

    #[test]
    fn goal_uses_medium_start_date_and_description() {
        let fields = show(ClinicalResource::Goal(Goal {
            description: CodeableConcept::from_coding("http://snomed.info/sct", "247751003"),
            start_date: date("2023-05-04"),
            ..Default::default()
        }));
        assert_eq!(fields.title, "Goal");
        assert_eq!(fields.subtitle.as_deref(), Some("Starting May 4, 2023"));
        assert_eq!(fields.detail.as_deref(), Some("Sense of Purpose"));

        let bare = show(ClinicalResource::Goal(Goal::default()));
        assert_eq!(bare.detail.as_deref(), Some("Goal"));
    }

    #[test]
    fn immunization_shows_vaccine_date_and_performer() {
        let fields = show(ClinicalResource::Immunization(Immunization {
            vaccine_code: CodeableConcept::from_coding("http://hl7.org/fhir/sid/cvx", "207"),
            occurrence: date("2021-01-01"),
            performers: vec![ImmunizationPerformer {
                actor: Reference {
                    display: Some("ABC General Hospital".into()),
                    ..Default::default()
                },
            }],
            ..Default::default()
        }));
        assert!(fields.title.starts_with("COVID-19, mRNA"));
        assert_eq!(fields.subtitle.as_deref(), Some("January 1, 2021"));
        assert_eq!(fields.detail.as_deref(), Some("ABC General Hospital"));
    }

    #[test]
    fn observation_detail_prefers_value() {
        let fields = show(ClinicalResource::Observation(Observation {
            code: CodeableConcept::from_coding(LOINC, "94558-4"),
            effective: date("2021-02-17T10:00:00+00:00"),
            value: Some(ObservationValue::CodeableConcept(CodeableConcept::from_coding(
                "http://snomed.info/sct",
                "260415000",
            ))),
            ..Default::default()
        }));
        assert!(fields.title.starts_with("SARS-CoV-2"));
        assert_eq!(fields.subtitle.as_deref(), Some("February 17, 2021"));
        assert_eq!(fields.detail.as_deref(), Some("Not detected"));
    }

    #[test]
    fn observation_components_are_joined() {
        let component = |code: &str, value: f64| ObservationComponent {
            code: CodeableConcept::from_coding(LOINC, code),
            value: Some(ObservationValue::Quantity(Quantity {
                value: Some(value),
                unit: Some("mm[Hg]".into()),
                ..Default::default()
            })),
        };
        let fields = show(ClinicalResource::Observation(Observation {
            code: CodeableConcept::from_coding(LOINC, "85354-9"),
            components: vec![
                component("8480-6", 120.0),
                ObservationComponent::default(),
                component("8462-4", 80.0),
            ],
            ..Default::default()
        }));
        assert_eq!(fields.title, "LOINC 85354-9");
        assert_eq!(
            fields.detail.as_deref(),
            Some("8480-6 = 120.0 mm[Hg], 8462-4 = 80.0 mm[Hg]")
        );
    }

    #[test]
    fn observation_without_value_or_components_has_no_detail() {
        let fields = show(ClinicalResource::Observation(Observation::default()));
        assert_eq!(fields.title, "Observation");
        assert_eq!(fields.detail, None);
    }

    #[test]
    fn condition_falls_back_to_recorded_date() {
        let fields = show(ClinicalResource::Condition(Condition {
            code: Some(CodeableConcept {
                coding: vec![Coding {
                    system: Some("http://hl7.org/fhir/sid/icd-10-cm".into()),
                    code: Some("E11.9".into()),
                    ..Default::default()
                }],
                ..Default::default()
            }),
            recorded_date: date("2020-06-30"),
            ..Default::default()
        }));
        assert_eq!(fields.title, "ICD-10-CM E11.9");
        assert_eq!(fields.subtitle.as_deref(), Some("June 30, 2020"));
    }

    #[test]
    fn medication_request_uses_first_dosage_text() {
        let fields = show(ClinicalResource::MedicationRequest(MedicationRequest {
            medication: Some(CodeableConcept {
                text: Some("Metformin 500 mg".into()),
                ..Default::default()
            }),
            dosage_instructions: vec![Dosage {
                text: Some("Twice daily".into()),
            }],
            ..Default::default()
        }));
        assert_eq!(fields.title, "Metformin 500 mg");
        assert_eq!(fields.detail.as_deref(), Some("Twice daily"));
    }

    #[test]
    fn other_resources_use_type_name_without_icon() {
        let resource = ClinicalResource::Other {
            resource_type: "Organization".into(),
        };
        let row = row(&resource, &CodeSystemResolver::bundled(), &utc());
        assert_eq!(row.fields.title, "Organization");
        assert_eq!(row.icon, None);
    }

    #[test]
    fn icon_hints_per_type() {
        assert_eq!(
            icon_hint(&ClinicalResource::Patient(Patient::default())),
            Some(IconHint::Person)
        );
        assert_eq!(
            icon_hint(&ClinicalResource::Immunization(Immunization::default())),
            Some(IconHint::CrossVial)
        );
        assert_eq!(IconHint::CheckmarkRectangle.as_str(), "checkmark.rectangle");
    }

    #[test]
    fn scalar_values() {
        let resolver = CodeSystemResolver::bundled();
        assert_eq!(
            value_display(&ObservationValue::Integer(42), &resolver).as_deref(),
            Some("42")
        );
        assert_eq!(
            value_display(&ObservationValue::Boolean(true), &resolver).as_deref(),
            Some("true")
        );
        assert_eq!(
            value_display(&ObservationValue::String("".into()), &resolver),
            None
        );
    }
}
