//! SMART Health Card payload: the verifiable-credential envelope around a FHIR bundle.
//!
//! This module provides both domain-level types and the wire model for the decompressed JWS
//! payload.
//!
//! Responsibilities:
//! - Define a wire model matching the payload JSON (`iss`, `nbf`, `vc.credentialSubject`)
//! - Translate bundle entries into typed [`ClinicalResource`]s
//! - Report schema mismatches with a path into the payload (e.g. `vc.credentialSubject.fhirBundle`)
//!
//! Notes:
//! - Entries without a resource, or whose resource has no `resourceType`, are kept as entries
//!   with `resource: None` and skipped by [`HealthCard::resources`].

use crate::resource::ClinicalResource;
use crate::{deserialize_with_path, FhirError, FhirResult};
use chrono::{DateTime, Utc};
use serde::Deserialize;

// ============================================================================
// Public domain-level types
// ============================================================================

/// The decoded health card payload.
#[derive(Clone, Debug, PartialEq)]
pub struct HealthCard {
    /// Issuer URL (`iss`), used to locate the issuer's public keys.
    pub issuer: String,

    /// Issuance time (`nbf`).
    pub issued_at: Option<DateTime<Utc>>,

    /// Expiry time (`exp`), rarely present on health cards.
    pub expires_at: Option<DateTime<Utc>>,

    pub credential: VerifiableCredential,
}

/// The `vc` claim.
#[derive(Clone, Debug, PartialEq)]
pub struct VerifiableCredential {
    /// Credential type URIs, e.g. `https://smarthealth.cards#health-card`.
    pub types: Vec<String>,
    pub subject: CredentialSubject,
}

/// The `vc.credentialSubject` object.
#[derive(Clone, Debug, PartialEq)]
pub struct CredentialSubject {
    pub fhir_version: Option<String>,
    pub bundle: Option<Bundle>,
}

/// The embedded FHIR `Bundle`.
#[derive(Clone, Debug, PartialEq)]
pub struct Bundle {
    pub bundle_type: Option<String>,
    pub entries: Vec<BundleEntry>,
}

/// One bundle entry, optionally wrapping a resource.
#[derive(Clone, Debug, PartialEq)]
pub struct BundleEntry {
    /// Short-form URL such as `resource:0`.
    pub full_url: Option<String>,
    pub resource: Option<ClinicalResource>,
}

// ============================================================================
// Public HealthCard operations
// ============================================================================

impl HealthCard {
    /// Parse a health card from decompressed payload bytes.
    ///
    /// # Errors
    ///
    /// Returns [`FhirError`] if:
    /// - the bytes are not a single JSON document,
    /// - the envelope does not match the wire schema (with the failing path),
    /// - the bundle's `resourceType` is present but not `Bundle`,
    /// - a known resource does not match its model.
    pub fn from_slice(bytes: &[u8]) -> FhirResult<Self> {
        let mut deserializer = serde_json::Deserializer::from_slice(bytes);
        let wire: HealthCardWire = deserialize_with_path(&mut deserializer, "HealthCard", "")?;
        deserializer.end()?;

        wire_to_domain(wire)
    }

    /// The clinical resources in bundle order, skipping entries with no resolvable resource.
    pub fn resources(&self) -> impl Iterator<Item = &ClinicalResource> {
        self.credential
            .subject
            .bundle
            .iter()
            .flat_map(|bundle| bundle.entries.iter())
            .filter_map(|entry| entry.resource.as_ref())
    }
}

// ============================================================================
// Wire types (internal)
// ============================================================================

#[derive(Deserialize)]
struct HealthCardWire {
    iss: String,
    #[serde(default)]
    nbf: Option<f64>,
    #[serde(default)]
    exp: Option<f64>,
    vc: CredentialWire,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CredentialWire {
    #[serde(rename = "type", default)]
    types: Vec<String>,
    credential_subject: SubjectWire,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubjectWire {
    #[serde(default)]
    fhir_version: Option<String>,
    #[serde(default)]
    fhir_bundle: Option<BundleWire>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BundleWire {
    #[serde(default)]
    resource_type: Option<String>,
    #[serde(rename = "type", default)]
    bundle_type: Option<String>,
    #[serde(default)]
    entry: Option<Vec<EntryWire>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EntryWire {
    #[serde(default)]
    full_url: Option<String>,
    #[serde(default)]
    resource: Option<serde_json::Value>,
}

// ============================================================================
// Helper functions (internal)
// ============================================================================

fn wire_to_domain(wire: HealthCardWire) -> FhirResult<HealthCard> {
    let bundle = wire
        .vc
        .credential_subject
        .fhir_bundle
        .map(bundle_to_domain)
        .transpose()?;

    Ok(HealthCard {
        issuer: wire.iss,
        issued_at: wire.nbf.and_then(numeric_date),
        expires_at: wire.exp.and_then(numeric_date),
        credential: VerifiableCredential {
            types: wire.vc.types,
            subject: CredentialSubject {
                fhir_version: wire.vc.credential_subject.fhir_version,
                bundle,
            },
        },
    })
}

fn bundle_to_domain(wire: BundleWire) -> FhirResult<Bundle> {
    if let Some(resource_type) = wire.resource_type.as_deref() {
        if resource_type != "Bundle" {
            return Err(FhirError::InvalidInput(format!(
                "Expected fhirBundle resourceType 'Bundle', got '{resource_type}'"
            )));
        }
    }

    let entries = wire
        .entry
        .unwrap_or_default()
        .into_iter()
        .enumerate()
        .map(|(index, entry)| {
            let path = format!("vc.credentialSubject.fhirBundle.entry[{index}].resource");
            let resource = match entry.resource {
                Some(value) => ClinicalResource::from_value(value, &path)?,
                None => None,
            };
            Ok(BundleEntry {
                full_url: entry.full_url,
                resource,
            })
        })
        .collect::<FhirResult<Vec<_>>>()?;

    Ok(Bundle {
        bundle_type: wire.bundle_type,
        entries,
    })
}

/// Convert a JWT NumericDate (seconds since the epoch, possibly fractional).
fn numeric_date(seconds: f64) -> Option<DateTime<Utc>> {
    if !seconds.is_finite() {
        return None;
    }
    let whole = seconds.floor();
    let nanos = ((seconds - whole) * 1_000_000_000.0) as u32;
    DateTime::from_timestamp(whole as i64, nanos.min(999_999_999))
}
