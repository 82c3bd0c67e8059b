//! Compact JWS framing for SMART Health Cards.
//!
//! A health card is a compact JWS, `<header>.<payload>.<signature>`, each segment base64url
//! without padding. The header is a small JSON object:
//!
//! ```json
//! {"zip":"DEF","alg":"ES256","kid":"3Kfdg-XwP-7gXyywtUfUADwBumDOPKMQx-iELL11W9s"}
//! ```
//!
//! When `zip` is `DEF` the payload bytes are raw DEFLATE (no zlib/gzip wrapper) and must be
//! inflated before they are JSON.
//!
//! The signature is computed over the *encoded* `<header>.<payload>` text, so a
//! [`CompactToken`] keeps the original token text alongside the decoded segments and hands the
//! exact bytes to a [`crate::verify::SignatureVerifier`].

use crate::config::CoreConfig;
use crate::constants::{DEFAULT_MAX_PAYLOAD_BYTES, DEFLATE_ZIP, SUPPORTED_ALG};
use crate::error::Segment;
use crate::{numeric, CardError, CardResult};
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

/// base64url: no padding when encoding, padding optional when decoding.
const BASE64URL: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Protected JWS header.
///
/// Unknown fields are ignored. Header parameters that a recipient is *required* to understand
/// are listed in `crit`; none are supported, so a non-empty `crit` is rejected.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwsHeader {
    pub alg: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zip: Option<String>,

    /// Key id: the base64url JWK thumbprint of the issuer's signing key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typ: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub crit: Vec<String>,
}

impl JwsHeader {
    /// An `ES256` header as issued on health cards.
    pub fn es256(kid: Option<String>, compression: Compression) -> Self {
        Self {
            alg: SUPPORTED_ALG.to_string(),
            zip: match compression {
                Compression::None => None,
                Compression::Deflate => Some(DEFLATE_ZIP.to_string()),
            },
            kid,
            typ: None,
            crit: Vec::new(),
        }
    }

    /// Validate the header and return the payload compression it declares.
    ///
    /// # Errors
    ///
    /// Returns [`CardError::UnsupportedHeader`] for an algorithm other than `ES256`, a `zip`
    /// other than `DEF`, or any `crit` entry.
    pub fn compression(&self) -> CardResult<Compression> {
        if self.alg != SUPPORTED_ALG {
            return Err(CardError::UnsupportedHeader(format!(
                "algorithm '{}' is not supported",
                self.alg
            )));
        }

        if let Some(name) = self.crit.first() {
            return Err(CardError::UnsupportedHeader(format!(
                "critical header parameter '{name}' is not understood"
            )));
        }

        match self.zip.as_deref() {
            None => Ok(Compression::None),
            Some(DEFLATE_ZIP) => Ok(Compression::Deflate),
            Some(other) => Err(CardError::UnsupportedHeader(format!(
                "compression '{other}' is not supported"
            ))),
        }
    }
}

/// Payload compression declared by the header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Compression {
    None,
    /// Raw DEFLATE (`"zip":"DEF"`).
    Deflate,
}

/// A decoded compact JWS.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompactToken {
    compact: String,
    header_len: usize,
    payload_len: usize,
    header: JwsHeader,
    compression: Compression,
    payload: Vec<u8>,
    signature: Vec<u8>,
}

impl CompactToken {
    /// Parse compact JWS text with the default payload ceiling.
    pub fn parse(compact: &str) -> CardResult<Self> {
        Self::parse_with_limit(compact, DEFAULT_MAX_PAYLOAD_BYTES)
    }

    /// Parse compact JWS text, accepting at most `max_payload_bytes` of (inflated) payload.
    ///
    /// # Errors
    ///
    /// - [`CardError::MalformedToken`] unless there are exactly three non-empty segments, or if
    ///   an uncompressed payload exceeds the limit
    /// - [`CardError::InvalidEncoding`] if a segment is not base64url
    /// - [`CardError::UnsupportedHeader`] if the header is not JSON or fails validation
    /// - [`CardError::DecompressionFailed`] if a `DEF` payload does not inflate within the limit
    pub fn parse_with_limit(compact: &str, max_payload_bytes: usize) -> CardResult<Self> {
        let segments: Vec<&str> = compact.split('.').collect();
        let [header_b64, payload_b64, signature_b64] = segments[..] else {
            return Err(CardError::MalformedToken(format!(
                "expected 3 segments, found {}",
                segments.len()
            )));
        };

        for (segment, text) in [
            (Segment::Header, header_b64),
            (Segment::Payload, payload_b64),
            (Segment::Signature, signature_b64),
        ] {
            if text.is_empty() {
                return Err(CardError::MalformedToken(format!("{segment} segment is empty")));
            }
        }

        let header_bytes = decode_segment(header_b64, Segment::Header)?;
        let header: JwsHeader = serde_json::from_slice(&header_bytes).map_err(|e| {
            CardError::UnsupportedHeader(format!("header is not a valid JSON object: {e}"))
        })?;
        let compression = header.compression()?;

        let encoded_payload = decode_segment(payload_b64, Segment::Payload)?;
        let signature = decode_segment(signature_b64, Segment::Signature)?;

        let payload = match compression {
            Compression::None if encoded_payload.len() > max_payload_bytes => {
                return Err(CardError::MalformedToken(format!(
                    "payload exceeds {max_payload_bytes} bytes"
                )));
            }
            Compression::None => encoded_payload,
            Compression::Deflate => inflate(&encoded_payload, max_payload_bytes)?,
        };

        tracing::debug!(
            alg = %header.alg,
            kid = header.kid.as_deref().unwrap_or("-"),
            ?compression,
            payload_bytes = payload.len(),
            signature_bytes = signature.len(),
            "decoded compact JWS"
        );

        Ok(Self {
            compact: compact.to_string(),
            header_len: header_b64.len(),
            payload_len: payload_b64.len(),
            header,
            compression,
            payload,
            signature,
        })
    }

    pub fn header(&self) -> &JwsHeader {
        &self.header
    }

    pub fn compression(&self) -> Compression {
        self.compression
    }

    /// Payload bytes, inflated if the header declared `zip`.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Raw signature bytes (for ES256, 64 bytes `r || s`).
    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    /// The original compact token text.
    pub fn compact(&self) -> &str {
        &self.compact
    }

    /// The three base64url segments exactly as received.
    pub fn encoded_segments(&self) -> [&str; 3] {
        let payload_start = self.header_len + 1;
        let signature_start = payload_start + self.payload_len + 1;
        [
            &self.compact[..self.header_len],
            &self.compact[payload_start..payload_start + self.payload_len],
            &self.compact[signature_start..],
        ]
    }

    /// The JWS signing input, `<header-b64>.<payload-b64>`, exactly as received.
    pub fn signing_input(&self) -> &[u8] {
        &self.compact.as_bytes()[..self.header_len + 1 + self.payload_len]
    }
}

/// Decodes numeric serializations into [`CompactToken`]s.
#[derive(Clone, Debug)]
pub struct CompactTokenDecoder {
    max_payload_bytes: usize,
}

impl Default for CompactTokenDecoder {
    fn default() -> Self {
        Self {
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
        }
    }
}

impl CompactTokenDecoder {
    pub fn new(config: &CoreConfig) -> Self {
        Self {
            max_payload_bytes: config.max_payload_bytes(),
        }
    }

    /// Decode a digits-only numeric serialization.
    pub fn decode(&self, numeric: &str) -> CardResult<CompactToken> {
        let compact = numeric::decode(numeric)?;
        CompactToken::parse_with_limit(&compact, self.max_payload_bytes)
    }

    /// Decode QR text, with or without the `shc:/` prefix.
    pub fn decode_qr(&self, text: &str) -> CardResult<CompactToken> {
        self.decode(numeric::strip_scheme(text)?)
    }

    /// Parse compact JWS text directly.
    pub fn parse(&self, compact: &str) -> CardResult<CompactToken> {
        CompactToken::parse_with_limit(compact, self.max_payload_bytes)
    }
}

/// Decode a numeric serialization with default limits.
pub fn decode(numeric: &str) -> CardResult<CompactToken> {
    CompactTokenDecoder::default().decode(numeric)
}

/// Build `<header-b64>.<payload-b64>` for signing, deflating the payload if the header says so.
pub fn compose_signing_input(header: &JwsHeader, payload: &[u8]) -> CardResult<String> {
    let compression = header.compression()?;
    let header_json = serde_json::to_vec(header)
        .map_err(|e| CardError::InvalidInput(format!("failed to serialize JWS header: {e}")))?;
    let payload = match compression {
        Compression::None => payload.to_vec(),
        Compression::Deflate => deflate(payload)?,
    };

    Ok(format!(
        "{}.{}",
        BASE64URL.encode(header_json),
        BASE64URL.encode(payload)
    ))
}

/// Append a signature to a signing input, producing compact JWS text.
pub fn attach_signature(signing_input: &str, signature: &[u8]) -> String {
    format!("{signing_input}.{}", BASE64URL.encode(signature))
}

/// Build compact JWS text from a header, an uncompressed payload and a signature.
pub fn compose(header: &JwsHeader, payload: &[u8], signature: &[u8]) -> CardResult<String> {
    Ok(attach_signature(
        &compose_signing_input(header, payload)?,
        signature,
    ))
}

fn decode_segment(text: &str, segment: Segment) -> CardResult<Vec<u8>> {
    BASE64URL
        .decode(text)
        .map_err(|source| CardError::InvalidEncoding { segment, source })
}

fn inflate(bytes: &[u8], max_payload_bytes: usize) -> CardResult<Vec<u8>> {
    let mut out = Vec::new();
    DeflateDecoder::new(bytes)
        .take((max_payload_bytes as u64).saturating_add(1))
        .read_to_end(&mut out)
        .map_err(|e| CardError::DecompressionFailed(e.to_string()))?;

    if out.len() > max_payload_bytes {
        return Err(CardError::DecompressionFailed(format!(
            "inflated payload exceeds {max_payload_bytes} bytes"
        )));
    }
    if out.is_empty() {
        return Err(CardError::DecompressionFailed(
            "inflated payload is empty".into(),
        ));
    }

    Ok(out)
}

fn deflate(bytes: &[u8]) -> CardResult<Vec<u8>> {
    let mut encoder = DeflateEncoder::new(Vec::new(), flate2::Compression::best());
    encoder
        .write_all(bytes)
        .and_then(|_| encoder.finish())
        .map_err(|e| CardError::InvalidInput(format!("failed to deflate payload: {e}")))
}
