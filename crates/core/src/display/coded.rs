//! Display text for coded values.
//!
//! Precedence, highest first:
//!
//! 1. `CodeableConcept.text`
//! 2. for each coding in order: `coding.display`, then the resolver table
//! 3. the first coding as `"<system short name or URI> <code>"`
//!
//! Minified health cards usually omit both `text` and `display`, so step 2's table lookup and
//! step 3's fallback carry most of the weight in practice.

use super::format::non_empty;
use crate::code_system::CodeSystemResolver;
use fhir::{CodeableConcept, Coding};

/// Short names for well-known code systems.
const SYSTEM_SHORT_NAMES: &[(&str, &str)] = &[
    ("http://hl7.org/fhir/sid/cvx", "CVX"),
    ("http://loinc.org", "LOINC"),
    ("http://snomed.info/sct", "SNOMED"),
    ("http://www.nlm.nih.gov/research/umls/rxnorm", "RxNorm"),
    ("http://hl7.org/fhir/sid/icd-10-cm", "ICD-10-CM"),
    (
        "http://hl7.org/fhir/us/pco/CodeSystem/pco-concepts-temporary",
        "PCO",
    ),
    ("http://va.gov/fhir/vco/CodeSystem/well-being", "VCO"),
    (
        "http://va.gov/fhir/us/vco/CodeSystem/well-being-signs",
        "Well-Being Signs (WBS)",
    ),
];

/// The short name of a code system, or the URI itself when it is not a well-known one.
pub fn system_short_name(system: &str) -> &str {
    SYSTEM_SHORT_NAMES
        .iter()
        .find(|(uri, _)| *uri == system)
        .map_or(system, |(_, short)| *short)
}

/// Display text for a codeable concept, or `None` if it carries nothing displayable.
pub fn concept_display(concept: &CodeableConcept, resolver: &CodeSystemResolver) -> Option<String> {
    inline_text(concept)
        .or_else(|| concept.coding.iter().find_map(|c| coding_display(c, resolver)))
        .map(str::to_string)
        .or_else(|| concept.coding.first().and_then(system_and_code))
}

/// Display text for a single coding: its own `display`, else the resolver table.
pub fn coding_display<'a>(coding: &'a Coding, resolver: &'a CodeSystemResolver) -> Option<&'a str> {
    non_empty(coding.display.as_deref()).or_else(|| {
        let system = non_empty(coding.system.as_deref())?;
        let code = non_empty(coding.code.as_deref())?;
        resolver.resolve(system, code)
    })
}

fn inline_text(concept: &CodeableConcept) -> Option<&str> {
    non_empty(concept.text.as_deref())
}

fn system_and_code(coding: &Coding) -> Option<String> {
    let system = non_empty(coding.system.as_deref()).map(system_short_name);
    let code = non_empty(coding.code.as_deref());
    match (system, code) {
        (Some(system), Some(code)) => Some(format!("{system} {code}")),
        (Some(only), None) | (None, Some(only)) => Some(only.to_string()),
        (None, None) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code_system::CodeEntry;

    const LOINC: &str = "http://loinc.org";
    const SNOMED: &str = "http://snomed.info/sct";

    fn coding(system: &str, code: &str, display: Option<&str>) -> Coding {
        Coding {
            system: Some(system.into()),
            code: Some(code.into()),
            display: display.map(Into::into),
            ..Default::default()
        }
    }

    #[test]
    fn text_wins_over_everything() {
        let concept = CodeableConcept {
            text: Some("Free text".into()),
            coding: vec![coding(SNOMED, "247751003", Some("Coded display"))],
        };
        let resolver = CodeSystemResolver::bundled();
        assert_eq!(concept_display(&concept, &resolver).as_deref(), Some("Free text"));
    }

    #[test]
    fn coding_display_beats_resolver() {
        let concept = CodeableConcept {
            coding: vec![coding(SNOMED, "247751003", Some("Inline"))],
            ..Default::default()
        };
        let resolver = CodeSystemResolver::bundled();
        assert_eq!(concept_display(&concept, &resolver).as_deref(), Some("Inline"));
    }

    #[test]
    fn resolver_is_consulted_for_each_coding() {
        let concept = CodeableConcept {
            coding: vec![
                coding(LOINC, "0000-0", None),
                coding(SNOMED, "247751003", None),
            ],
            ..Default::default()
        };
        let resolver = CodeSystemResolver::bundled();
        assert_eq!(
            concept_display(&concept, &resolver).as_deref(),
            Some("Sense of Purpose")
        );
    }

    #[test]
    fn falls_back_to_short_name_and_code_of_first_coding() {
        let concept = CodeableConcept::from_coding(LOINC, "12345-6");
        let resolver = CodeSystemResolver::from_entries(std::iter::empty::<CodeEntry>());
        assert_eq!(
            concept_display(&concept, &resolver).as_deref(),
            Some("LOINC 12345-6")
        );
    }

    #[test]
    fn unknown_systems_fall_back_to_uri() {
        let concept = CodeableConcept::from_coding("urn:example:codes", "x1");
        let resolver = CodeSystemResolver::bundled();
        assert_eq!(
            concept_display(&concept, &resolver).as_deref(),
            Some("urn:example:codes x1")
        );
    }

    #[test]
    fn empty_strings_count_as_absent() {
        let concept = CodeableConcept {
            text: Some("  ".into()),
            coding: vec![coding(SNOMED, "247751003", Some(""))],
        };
        let resolver = CodeSystemResolver::bundled();
        assert_eq!(
            concept_display(&concept, &resolver).as_deref(),
            Some("Sense of Purpose")
        );
    }

    #[test]
    fn empty_concept_has_no_display() {
        let resolver = CodeSystemResolver::bundled();
        assert_eq!(concept_display(&CodeableConcept::default(), &resolver), None);
    }

    #[test]
    fn short_names() {
        assert_eq!(system_short_name("http://hl7.org/fhir/sid/cvx"), "CVX");
        assert_eq!(
            system_short_name("http://va.gov/fhir/us/vco/CodeSystem/well-being-signs"),
            "Well-Being Signs (WBS)"
        );
        assert_eq!(system_short_name("urn:other"), "urn:other");
    }
}
