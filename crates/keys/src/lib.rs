//! # SHC Keys
//!
//! ES256 signature verification for SMART Health Cards.
//!
//! Issuers publish their signing keys as a JWK Set at `<iss>/.well-known/jwks.json`. This crate
//! parses such a set (fetched by the caller, or read from a file) and implements
//! [`SignatureVerifier`] over it:
//!
//! - keys are selected by the token header's `kid`, or every key is tried when it is absent
//! - signatures are raw 64-byte `r || s` ECDSA P-256 over the encoded `<header>.<payload>`
//! - a key without a `kid` is indexed by its RFC 7638 JWK thumbprint, which is how health card
//!   issuers derive their key ids
//!
//! Fetching keys over the network, trust lists and revocation are left to the caller.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use p256::ecdsa::signature::Verifier;
use p256::ecdsa::{Signature, VerifyingKey};
use p256::pkcs8::DecodePublicKey;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use shc_core::{CardError, CardResult, SignatureVerifier, VerificationRequest};
use std::path::Path;

const ES256: &str = "ES256";

#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    #[error("failed to read key set: {0}")]
    FileRead(std::io::Error),
    #[error("invalid key set JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("invalid key '{kid}': {message}")]
    InvalidKey { kid: String, message: String },
    #[error("failed to parse public key: {0}")]
    PublicKeyParse(String),
    #[error("unsupported signature algorithm '{0}'")]
    UnsupportedAlgorithm(String),
    #[error("no key with id '{0}' in the issuer key set")]
    UnknownKeyId(String),
    #[error("issuer key set is empty")]
    NoKeys,
}

pub type KeyResult<T> = std::result::Result<T, KeyError>;

/// One issuer verification key.
#[derive(Clone, Debug)]
pub struct IssuerKey {
    kid: String,
    key: VerifyingKey,
}

impl IssuerKey {
    /// Wrap a key, using its JWK thumbprint as the key id.
    pub fn new(key: VerifyingKey) -> Self {
        Self {
            kid: jwk_thumbprint(&key),
            key,
        }
    }

    pub fn with_kid(kid: impl Into<String>, key: VerifyingKey) -> Self {
        Self {
            kid: kid.into(),
            key,
        }
    }

    pub fn kid(&self) -> &str {
        &self.kid
    }

    pub fn verifying_key(&self) -> &VerifyingKey {
        &self.key
    }
}

/// The verification keys of one issuer.
#[derive(Clone, Debug, Default)]
pub struct IssuerKeySet {
    issuer: Option<String>,
    keys: Vec<IssuerKey>,
}

impl IssuerKeySet {
    pub fn new(keys: impl IntoIterator<Item = IssuerKey>) -> Self {
        Self {
            issuer: None,
            keys: keys.into_iter().collect(),
        }
    }

    /// Parse a JWK Set document.
    ///
    /// Keys that are not EC P-256 are skipped. EC P-256 keys with missing or malformed
    /// coordinates are an error.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::InvalidJson`] if the document is not a JWK Set, and
    /// [`KeyError::InvalidKey`] for unusable P-256 keys.
    pub fn from_json(json: &str) -> KeyResult<Self> {
        let jwks: JwksWire = serde_json::from_str(json)?;

        let mut keys = Vec::with_capacity(jwks.keys.len());
        for (index, jwk) in jwks.keys.into_iter().enumerate() {
            let label = jwk.kid.clone().unwrap_or_else(|| format!("#{index}"));
            if jwk.kty != "EC" || jwk.crv.as_deref() != Some("P-256") {
                tracing::debug!(kid = %label, kty = %jwk.kty, "skipping non P-256 key");
                continue;
            }
            keys.push(issuer_key_from_jwk(jwk, &label)?);
        }

        tracing::debug!(keys = keys.len(), "issuer key set parsed");
        Ok(Self::new(keys))
    }

    pub fn from_file(path: &Path) -> KeyResult<Self> {
        let json = std::fs::read_to_string(path).map_err(KeyError::FileRead)?;
        Self::from_json(&json)
    }

    /// A single-key set from a PEM `SubjectPublicKeyInfo` (`-----BEGIN PUBLIC KEY-----`).
    pub fn from_public_key_pem(pem: &str) -> KeyResult<Self> {
        let key = VerifyingKey::from_public_key_pem(pem.trim())
            .map_err(|e| KeyError::PublicKeyParse(e.to_string()))?;
        Ok(Self::new([IssuerKey::new(key)]))
    }

    /// Restrict the set to tokens whose payload names `issuer` as `iss`.
    pub fn for_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    pub fn issuer(&self) -> Option<&str> {
        self.issuer.as_deref()
    }

    pub fn keys(&self) -> &[IssuerKey] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Verify a token's signature against this key set.
    ///
    /// # Returns
    ///
    /// `Ok(false)` if the signature is malformed, does not match, or the token names a
    /// different issuer than the one this set is bound to.
    ///
    /// # Errors
    ///
    /// Returns an error if the algorithm is not ES256, the `kid` is unknown, or the set is
    /// empty.
    pub fn verify_signature(&self, request: &VerificationRequest<'_>) -> KeyResult<bool> {
        if request.alg != ES256 {
            return Err(KeyError::UnsupportedAlgorithm(request.alg.to_string()));
        }
        if self.keys.is_empty() {
            return Err(KeyError::NoKeys);
        }

        if let (Some(expected), Some(actual)) = (self.issuer.as_deref(), request.issuer) {
            if expected != actual {
                tracing::debug!(expected, actual, "token issuer does not match key set");
                return Ok(false);
            }
        }

        let signature = match Signature::from_slice(request.signature) {
            Ok(s) => s,
            Err(_) => return Ok(false),
        };

        let candidates: Vec<&IssuerKey> = match request.kid {
            Some(kid) => {
                let matching: Vec<&IssuerKey> =
                    self.keys.iter().filter(|k| k.kid == kid).collect();
                if matching.is_empty() {
                    return Err(KeyError::UnknownKeyId(kid.to_string()));
                }
                matching
            }
            None => self.keys.iter().collect(),
        };

        Ok(candidates
            .iter()
            .any(|k| k.key.verify(request.signing_input, &signature).is_ok()))
    }
}

impl SignatureVerifier for IssuerKeySet {
    fn verify(&self, request: &VerificationRequest<'_>) -> CardResult<bool> {
        self.verify_signature(request)
            .map_err(|e| CardError::Verification(e.to_string()))
    }
}

/// RFC 7638 thumbprint of a P-256 key: base64url SHA-256 of its canonical JWK members.
pub fn jwk_thumbprint(key: &VerifyingKey) -> String {
    let point = key.to_encoded_point(false);
    // Uncompressed SEC1: 0x04 || x (32 bytes) || y (32 bytes)
    let (x, y) = point.as_bytes()[1..].split_at(32);
    let canonical = format!(
        r#"{{"crv":"P-256","kty":"EC","x":"{}","y":"{}"}}"#,
        URL_SAFE_NO_PAD.encode(x),
        URL_SAFE_NO_PAD.encode(y)
    );
    URL_SAFE_NO_PAD.encode(Sha256::digest(canonical.as_bytes()))
}

// ============================================================================
// Wire types (internal)
// ============================================================================

#[derive(Deserialize)]
struct JwksWire {
    keys: Vec<JwkWire>,
}

#[derive(Deserialize)]
struct JwkWire {
    kty: String,
    #[serde(default)]
    crv: Option<String>,
    #[serde(default)]
    x: Option<String>,
    #[serde(default)]
    y: Option<String>,
    #[serde(default)]
    kid: Option<String>,
}

fn issuer_key_from_jwk(jwk: JwkWire, label: &str) -> KeyResult<IssuerKey> {
    let invalid = |message: &str| KeyError::InvalidKey {
        kid: label.to_string(),
        message: message.to_string(),
    };

    let x = decode_coordinate(jwk.x.as_deref()).ok_or_else(|| invalid("bad 'x' coordinate"))?;
    let y = decode_coordinate(jwk.y.as_deref()).ok_or_else(|| invalid("bad 'y' coordinate"))?;

    let mut sec1 = Vec::with_capacity(65);
    sec1.push(0x04);
    sec1.extend_from_slice(&x);
    sec1.extend_from_slice(&y);
    let key = VerifyingKey::from_sec1_bytes(&sec1).map_err(|_| invalid("point is not on P-256"))?;

    let thumbprint = jwk_thumbprint(&key);
    match jwk.kid {
        Some(kid) => {
            if kid != thumbprint {
                tracing::warn!(kid = %kid, thumbprint = %thumbprint, "key id is not the JWK thumbprint");
            }
            Ok(IssuerKey::with_kid(kid, key))
        }
        None => Ok(IssuerKey::with_kid(thumbprint, key)),
    }
}

fn decode_coordinate(value: Option<&str>) -> Option<Vec<u8>> {
    let bytes = URL_SAFE_NO_PAD.decode(value?.trim_end_matches('=')).ok()?;
    (bytes.len() == 32).then_some(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use p256::ecdsa::signature::Signer;
    use p256::ecdsa::SigningKey;
    use p256::pkcs8::EncodePublicKey;
    use shc_core::jws::{self, Compression, JwsHeader};
    use shc_core::{CompactToken, HealthCardTokenModel};

    const ISSUER: &str = "https://issuer.example";

    fn signing_key(seed: u8) -> SigningKey {
        SigningKey::from_slice(&[seed; 32]).expect("valid scalar")
    }

    fn jwks_for(key: &SigningKey, kid: Option<&str>) -> String {
        let point = key.verifying_key().to_encoded_point(false);
        let (x, y) = point.as_bytes()[1..].split_at(32);
        let kid = kid
            .map(|k| format!(r#","kid":"{k}""#))
            .unwrap_or_default();
        format!(
            r#"{{"keys":[
                {{"kty":"RSA","n":"AQAB","e":"AQAB"}},
                {{"kty":"EC","crv":"P-256","use":"sig","alg":"ES256","x":"{}","y":"{}"{kid}}}
            ]}}"#,
            URL_SAFE_NO_PAD.encode(x),
            URL_SAFE_NO_PAD.encode(y),
        )
    }

    fn signed_token(key: &SigningKey, kid: Option<String>, payload: &[u8]) -> CompactToken {
        let header = JwsHeader::es256(kid, Compression::Deflate);
        let signing_input = jws::compose_signing_input(&header, payload).expect("compose");
        let signature: Signature = key.sign(signing_input.as_bytes());
        let compact = jws::attach_signature(&signing_input, &signature.to_bytes());
        CompactToken::parse(&compact).expect("parse")
    }

    #[test]
    fn parses_p256_keys_and_skips_others() {
        let key = signing_key(0x11);
        let set = IssuerKeySet::from_json(&jwks_for(&key, None)).expect("valid jwks");
        assert_eq!(set.len(), 1);
        assert_eq!(set.keys()[0].kid(), jwk_thumbprint(key.verifying_key()));
    }

    #[test]
    fn verifies_token_signed_by_key_in_set() {
        let key = signing_key(0x11);
        let kid = jwk_thumbprint(key.verifying_key());
        let set = IssuerKeySet::from_json(&jwks_for(&key, None)).expect("valid jwks");

        let token = signed_token(&key, Some(kid), b"{}");
        assert!(token.verify_with(&set, None).expect("verify"));
    }

    #[test]
    fn tries_every_key_when_kid_is_absent() {
        let signer = signing_key(0x22);
        let set = IssuerKeySet::new([
            IssuerKey::new(VerifyingKey::from(&signing_key(0x11))),
            IssuerKey::new(VerifyingKey::from(&signer)),
        ]);
        let token = signed_token(&signer, None, b"{}");
        assert!(token.verify_with(&set, None).expect("verify"));
    }

    #[test]
    fn signature_from_other_key_does_not_verify() {
        let set = IssuerKeySet::new([IssuerKey::with_kid(
            "k1",
            VerifyingKey::from(&signing_key(0x11)),
        )]);
        let token = signed_token(&signing_key(0x22), Some("k1".into()), b"{}");
        assert!(!token.verify_with(&set, None).expect("verify"));
    }

    #[test]
    fn unknown_kid_is_an_error() {
        let key = signing_key(0x11);
        let set = IssuerKeySet::new([IssuerKey::with_kid("k1", VerifyingKey::from(&key))]);
        let token = signed_token(&key, Some("k2".into()), b"{}");

        let err = set
            .verify_signature(&token.verification_request(None))
            .expect_err("unknown kid");
        match err {
            KeyError::UnknownKeyId(kid) => assert_eq!(kid, "k2"),
            other => panic!("expected UnknownKeyId error, got {other:?}"),
        }
        assert!(matches!(
            token.verify_with(&set, None),
            Err(CardError::Verification(_))
        ));
    }

    #[test]
    fn issuer_binding_rejects_other_issuers() {
        let key = signing_key(0x11);
        let set = IssuerKeySet::new([IssuerKey::with_kid("k1", VerifyingKey::from(&key))])
            .for_issuer(ISSUER);
        let token = signed_token(&key, Some("k1".into()), b"{}");

        assert!(token.verify_with(&set, Some(ISSUER)).expect("verify"));
        assert!(!token
            .verify_with(&set, Some("https://other.example"))
            .expect("verify"));
    }

    #[test]
    fn truncated_signature_does_not_verify() {
        let key = signing_key(0x11);
        let set = IssuerKeySet::new([IssuerKey::with_kid("k1", VerifyingKey::from(&key))]);
        let token = signed_token(&key, Some("k1".into()), b"{}");
        let mut request = token.verification_request(None);
        request.signature = &request.signature[..32];
        assert!(!set.verify_signature(&request).expect("verify"));
    }

    #[test]
    fn rejects_malformed_p256_keys() {
        let err = IssuerKeySet::from_json(
            r#"{"keys":[{"kty":"EC","crv":"P-256","kid":"bad","x":"AAAA","y":"AAAA"}]}"#,
        )
        .expect_err("short coordinates");
        assert!(matches!(err, KeyError::InvalidKey { kid, .. } if kid == "bad"));

        assert!(matches!(
            IssuerKeySet::from_json("{}"),
            Err(KeyError::InvalidJson(_))
        ));
    }

    #[test]
    fn empty_set_cannot_verify() {
        let key = signing_key(0x11);
        let token = signed_token(&key, None, b"{}");
        let err = IssuerKeySet::default()
            .verify_signature(&token.verification_request(None))
            .expect_err("empty set");
        assert!(matches!(err, KeyError::NoKeys));
    }

    #[test]
    fn loads_pem_public_keys() {
        let key = signing_key(0x33);
        let pem = key
            .verifying_key()
            .to_public_key_pem(p256::pkcs8::LineEnding::LF)
            .expect("pem");
        let set = IssuerKeySet::from_public_key_pem(&pem).expect("valid pem");
        let token = signed_token(&key, Some(jwk_thumbprint(key.verifying_key())), b"{}");
        assert!(token.verify_with(&set, None).expect("verify"));
    }

    #[test]
    fn loads_key_set_from_file() {
        let key = signing_key(0x11);
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("jwks.json");
        std::fs::write(&path, jwks_for(&key, Some("file-key"))).expect("write");

        let set = IssuerKeySet::from_file(&path).expect("valid file");
        assert_eq!(set.keys()[0].kid(), "file-key");

        let missing = IssuerKeySet::from_file(&dir.path().join("missing.json"));
        assert!(matches!(missing, Err(KeyError::FileRead(_))));
    }

    #[test]
    fn verifies_through_the_model() {
        let key = signing_key(0x11);
        let kid = jwk_thumbprint(key.verifying_key());
        let payload = format!(
            r#"{{"iss":"{ISSUER}","vc":{{"type":[],"credentialSubject":{{"fhirBundle":{{"resourceType":"Bundle","entry":[]}}}}}}}}"#
        );
        let token = signed_token(&key, Some(kid), payload.as_bytes());
        let numeric = shc_core::numeric::encode(token.compact()).expect("encode");

        let model = HealthCardTokenModel::new(Some(numeric));
        let set = IssuerKeySet::from_json(&jwks_for(&key, None))
            .expect("valid jwks")
            .for_issuer(ISSUER);
        assert!(model.verify_with(&set).expect("verify"));
    }
}
