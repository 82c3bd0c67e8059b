//! Code-system display lookup.
//!
//! Minified health cards carry codes without display text, so a viewer needs its own
//! `(system, code) -> display` table. [`CodeSystemResolver`] is built once at startup from:
//!
//! 1. an optional external value-set document (JSON or YAML), then
//! 2. the bundled table below, which overwrites external entries on key collision.
//!
//! After construction the table is immutable. It holds only owned `String`s, so it is
//! `Send + Sync` and can be shared by reference (or `Arc`) across any number of readers.
//!
//! ## External document formats
//!
//! Either a list of triples:
//!
//! ```json
//! [{"system": "http://loinc.org", "code": "94558-4", "display": "SARS-CoV-2 Ag"}]
//! ```
//!
//! or a FHIR `ValueSet` resource, from which `compose.include[].concept[]` (using the include's
//! `system`) and `expansion.contains[]` (recursively) are read.

use crate::config::CoreConfig;
use crate::{CardError, CardResult};
use serde::Deserialize;
use shc_types::NonEmptyText;
use std::collections::HashMap;
use std::path::Path;

/// Codes bundled with the viewer: `(system, code, display)`.
const BUNDLED_CODES: &[(&str, &str, &str)] = &[
    ("http://snomed.info/sct", "247751003", "Sense of Purpose"),
    ("http://snomed.info/sct", "260373001", "Detected"),
    ("http://snomed.info/sct", "260415000", "Not detected"),
    (
        "http://hl7.org/fhir/sid/cvx",
        "207",
        "COVID-19, mRNA, LNP-S, PF, 100 mcg/0.5mL dose or 50 mcg/0.25mL dose",
    ),
    (
        "http://hl7.org/fhir/sid/cvx",
        "208",
        "COVID-19, mRNA, LNP-S, PF, 30 mcg/0.3 mL dose",
    ),
    (
        "http://hl7.org/fhir/sid/cvx",
        "210",
        "COVID-19 vaccine, vector-nr, rS-ChAdOx1, PF, 0.5 mL",
    ),
    (
        "http://hl7.org/fhir/sid/cvx",
        "211",
        "COVID-19, subunit, rS-nanoparticle+Matrix-M1 Adjuvant, PF, 0.5 mL",
    ),
    (
        "http://hl7.org/fhir/sid/cvx",
        "212",
        "COVID-19 vaccine, vector-nr, rS-Ad26, PF, 0.5 mL",
    ),
    (
        "http://loinc.org",
        "94500-6",
        "SARS-CoV-2 (COVID-19) RNA [Presence] in Respiratory specimen by NAA with probe detection",
    ),
    (
        "http://loinc.org",
        "94558-4",
        "SARS-CoV-2 (COVID-19) Ag [Presence] in Respiratory specimen by Rapid immunoassay",
    ),
];

/// One `(system, code) -> display` mapping.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
pub struct CodeEntry {
    pub system: NonEmptyText,
    pub code: NonEmptyText,
    pub display: NonEmptyText,
}

impl CodeEntry {
    /// Build an entry, returning `None` if any part is blank.
    pub fn new(system: &str, code: &str, display: &str) -> Option<Self> {
        Some(Self {
            system: NonEmptyText::new(system).ok()?,
            code: NonEmptyText::new(code).ok()?,
            display: NonEmptyText::new(display).ok()?,
        })
    }
}

/// Read-only `(system, code) -> display` table.
#[derive(Clone, Debug, Default)]
pub struct CodeSystemResolver {
    // system -> code -> display, so lookups borrow the caller's `&str`s without allocating.
    table: HashMap<String, HashMap<String, String>>,
    len: usize,
}

impl CodeSystemResolver {
    /// A resolver holding only the bundled table.
    pub fn bundled() -> Self {
        Self::from_entries(std::iter::empty())
    }

    /// Build the resolver from the bundled table plus an optional value-set document.
    ///
    /// This never fails: a missing path means "bundled only", and an unreadable or malformed
    /// document is logged and ignored.
    pub fn load(value_set_path: Option<&Path>) -> Self {
        let external = match value_set_path {
            None => Vec::new(),
            Some(path) => match read_value_set(path) {
                Ok(entries) => entries,
                Err(err) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %err,
                        "ignoring value set document"
                    );
                    Vec::new()
                }
            },
        };

        let external_count = external.len();
        let resolver = Self::from_entries(external);
        tracing::info!(
            entries = resolver.len(),
            external = external_count,
            "code system table loaded"
        );
        resolver
    }

    pub fn from_config(config: &CoreConfig) -> Self {
        Self::load(config.value_set_path())
    }

    /// Build the resolver from `external` entries plus the bundled table.
    ///
    /// Later external entries overwrite earlier ones; bundled entries overwrite both.
    pub fn from_entries(external: impl IntoIterator<Item = CodeEntry>) -> Self {
        let mut resolver = Self::default();
        for entry in external {
            resolver.insert(
                entry.system.into_string(),
                entry.code.into_string(),
                entry.display.into_string(),
            );
        }
        for (system, code, display) in BUNDLED_CODES {
            resolver.insert(system.to_string(), code.to_string(), display.to_string());
        }
        resolver
    }

    /// Exact lookup of the display text for `code` in `system`.
    pub fn resolve(&self, system: &str, code: &str) -> Option<&str> {
        self.table.get(system)?.get(code).map(String::as_str)
    }

    /// Number of distinct `(system, code)` keys.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn insert(&mut self, system: String, code: String, display: String) {
        if self
            .table
            .entry(system)
            .or_default()
            .insert(code, display)
            .is_none()
        {
            self.len += 1;
        }
    }
}

/// Read and parse a value-set document. `.yaml`/`.yml` files are read as YAML, anything else
/// as JSON.
pub fn read_value_set(path: &Path) -> CardResult<Vec<CodeEntry>> {
    // The file handle is closed when read_to_string returns; parsing works on the owned text.
    let text = std::fs::read_to_string(path).map_err(CardError::FileRead)?;

    let is_yaml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));

    if is_yaml {
        parse_value_set_yaml(&text)
    } else {
        parse_value_set_json(&text)
    }
}

pub fn parse_value_set_json(text: &str) -> CardResult<Vec<CodeEntry>> {
    let document: ValueSetDocument =
        serde_json::from_str(text).map_err(|e| CardError::ValueSet(e.to_string()))?;
    document.into_entries()
}

pub fn parse_value_set_yaml(text: &str) -> CardResult<Vec<CodeEntry>> {
    let document: ValueSetDocument =
        serde_yaml::from_str(text).map_err(|e| CardError::ValueSet(e.to_string()))?;
    document.into_entries()
}

// ============================================================================
// Wire types (internal)
// ============================================================================

#[derive(Deserialize)]
#[serde(untagged)]
enum ValueSetDocument {
    Triples(Vec<TripleWire>),
    ValueSet(ValueSetWire),
}

#[derive(Deserialize)]
struct TripleWire {
    #[serde(default)]
    system: Option<String>,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    display: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ValueSetWire {
    resource_type: String,
    #[serde(default)]
    compose: Option<ComposeWire>,
    #[serde(default)]
    expansion: Option<ExpansionWire>,
}

#[derive(Deserialize)]
struct ComposeWire {
    #[serde(default)]
    include: Vec<IncludeWire>,
}

#[derive(Deserialize)]
struct IncludeWire {
    #[serde(default)]
    system: Option<String>,
    #[serde(default)]
    concept: Vec<ConceptWire>,
}

#[derive(Deserialize)]
struct ConceptWire {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    display: Option<String>,
}

#[derive(Deserialize)]
struct ExpansionWire {
    #[serde(default)]
    contains: Vec<ContainsWire>,
}

#[derive(Deserialize)]
struct ContainsWire {
    #[serde(default)]
    system: Option<String>,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    display: Option<String>,
    #[serde(default)]
    contains: Vec<ContainsWire>,
}

impl ValueSetDocument {
    fn into_entries(self) -> CardResult<Vec<CodeEntry>> {
        match self {
            ValueSetDocument::Triples(triples) => Ok(triples
                .into_iter()
                .filter_map(|t| entry(t.system, t.code, t.display))
                .collect()),
            ValueSetDocument::ValueSet(value_set) => {
                if value_set.resource_type != "ValueSet" {
                    return Err(CardError::ValueSet(format!(
                        "expected resourceType 'ValueSet', got '{}'",
                        value_set.resource_type
                    )));
                }

                let mut entries = Vec::new();
                for include in value_set.compose.map(|c| c.include).unwrap_or_default() {
                    for concept in include.concept {
                        entries.extend(entry(
                            include.system.clone(),
                            concept.code,
                            concept.display,
                        ));
                    }
                }
                if let Some(expansion) = value_set.expansion {
                    flatten_contains(expansion.contains, &mut entries);
                }
                Ok(entries)
            }
        }
    }
}

fn flatten_contains(contains: Vec<ContainsWire>, out: &mut Vec<CodeEntry>) {
    for item in contains {
        out.extend(entry(item.system, item.code, item.display));
        flatten_contains(item.contains, out);
    }
}

fn entry(system: Option<String>, code: Option<String>, display: Option<String>) -> Option<CodeEntry> {
    Some(CodeEntry {
        system: NonEmptyText::from_optional(system)?,
        code: NonEmptyText::from_optional(code)?,
        display: NonEmptyText::from_optional(display)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SNOMED: &str = "http://snomed.info/sct";
    const LOINC: &str = "http://loinc.org";

    #[test]
    fn bundled_table_resolves_known_codes() {
        let resolver = CodeSystemResolver::bundled();
        assert_eq!(resolver.resolve(SNOMED, "247751003"), Some("Sense of Purpose"));
        assert_eq!(resolver.len(), BUNDLED_CODES.len());
    }

    #[test]
    fn absent_keys_resolve_to_none() {
        let resolver = CodeSystemResolver::bundled();
        assert_eq!(resolver.resolve(SNOMED, "0000"), None);
        assert_eq!(resolver.resolve("urn:unknown", "247751003"), None);
        assert_eq!(resolver.resolve("", ""), None);
    }

    #[test]
    fn bundled_entries_win_on_collision() {
        let external = [
            CodeEntry::new(SNOMED, "247751003", "Overridden").expect("entry"),
            CodeEntry::new(LOINC, "1234-5", "External only").expect("entry"),
        ];
        let resolver = CodeSystemResolver::from_entries(external);

        assert_eq!(resolver.resolve(SNOMED, "247751003"), Some("Sense of Purpose"));
        assert_eq!(resolver.resolve(LOINC, "1234-5"), Some("External only"));
        assert_eq!(resolver.len(), BUNDLED_CODES.len() + 1);
    }

    #[test]
    fn parses_triples_and_skips_blank_fields() {
        let entries = parse_value_set_json(
            r#"[
                {"system": "http://loinc.org", "code": "1234-5", "display": "Test"},
                {"system": "http://loinc.org", "code": "", "display": "No code"},
                {"system": "http://loinc.org", "code": "9999-9"}
            ]"#,
        )
        .expect("valid document");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].display.as_str(), "Test");
    }

    #[test]
    fn parses_fhir_value_set_compose_and_expansion() {
        let entries = parse_value_set_json(
            r#"{
                "resourceType": "ValueSet",
                "compose": {"include": [{
                    "system": "http://va.gov/fhir/vco/CodeSystem/well-being",
                    "concept": [{"code": "purpose", "display": "Purpose"}]
                }]},
                "expansion": {"contains": [{
                    "system": "http://loinc.org", "code": "A", "display": "Group",
                    "contains": [{"system": "http://loinc.org", "code": "B", "display": "Child"}]
                }]}
            }"#,
        )
        .expect("valid value set");
        let codes: Vec<&str> = entries.iter().map(|e| e.code.as_str()).collect();
        assert_eq!(codes, vec!["purpose", "A", "B"]);
    }

    #[test]
    fn rejects_other_resource_types() {
        let err = parse_value_set_json(r#"{"resourceType": "CodeSystem"}"#)
            .expect_err("not a value set");
        assert!(matches!(err, CardError::ValueSet(msg) if msg.contains("CodeSystem")));
    }

    #[test]
    fn parses_yaml_triples() {
        let entries = parse_value_set_yaml(
            "- system: http://loinc.org\n  code: '1234-5'\n  display: From YAML\n",
        )
        .expect("valid yaml");
        assert_eq!(entries[0].display.as_str(), "From YAML");
    }

    #[test]
    fn load_merges_file_entries() {
        let mut file = tempfile::Builder::new()
            .suffix(".json")
            .tempfile()
            .expect("temp file");
        write!(
            file,
            r#"[{{"system": "{LOINC}", "code": "1234-5", "display": "From file"}}]"#
        )
        .expect("write");

        let resolver = CodeSystemResolver::load(Some(file.path()));
        assert_eq!(resolver.resolve(LOINC, "1234-5"), Some("From file"));
        assert_eq!(resolver.resolve(SNOMED, "247751003"), Some("Sense of Purpose"));
    }

    #[test]
    fn load_falls_back_to_bundled_on_bad_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let missing = dir.path().join("missing.json");
        let resolver = CodeSystemResolver::load(Some(&missing));
        assert_eq!(resolver.len(), BUNDLED_CODES.len());

        let malformed = dir.path().join("malformed.json");
        std::fs::write(&malformed, "{not json").expect("write");
        let resolver = CodeSystemResolver::load(Some(&malformed));
        assert_eq!(resolver.len(), BUNDLED_CODES.len());
    }

    #[test]
    fn resolver_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CodeSystemResolver>();

        let resolver = std::sync::Arc::new(CodeSystemResolver::bundled());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let resolver = std::sync::Arc::clone(&resolver);
                std::thread::spawn(move || {
                    resolver.resolve(SNOMED, "260373001").map(str::to_owned)
                })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().expect("thread"), Some("Detected".to_string()));
        }
    }
}
