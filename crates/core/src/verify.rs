//! Signature verification seam.
//!
//! Decoding never checks signatures. A caller that wants authenticity plugs in a
//! [`SignatureVerifier`] (for example the JWKS-backed one in `shc-keys`) and asks the token or
//! the model to run it. Key discovery, trust lists and revocation belong to the verifier.

use crate::jws::CompactToken;
use crate::CardResult;

/// Everything a verifier needs to check one token.
#[derive(Clone, Copy, Debug)]
pub struct VerificationRequest<'a> {
    /// `alg` from the protected header. Always `ES256` for tokens that decoded successfully.
    pub alg: &'a str,
    pub kid: Option<&'a str>,
    /// `iss` from the payload, when the payload has been deserialized.
    pub issuer: Option<&'a str>,
    /// The encoded `<header>.<payload>` bytes the signature was computed over.
    pub signing_input: &'a [u8],
    /// Raw signature bytes (64-byte `r || s` for ES256).
    pub signature: &'a [u8],
}

/// Checks a token signature.
///
/// `Ok(false)` means the signature is well formed but does not match any usable key.
/// `Err(_)` is reserved for failures to *attempt* verification (unknown key id, bad key
/// material, unreachable key source).
pub trait SignatureVerifier {
    fn verify(&self, request: &VerificationRequest<'_>) -> CardResult<bool>;
}

impl<V: SignatureVerifier + ?Sized> SignatureVerifier for &V {
    fn verify(&self, request: &VerificationRequest<'_>) -> CardResult<bool> {
        (**self).verify(request)
    }
}

impl<V: SignatureVerifier + ?Sized> SignatureVerifier for Box<V> {
    fn verify(&self, request: &VerificationRequest<'_>) -> CardResult<bool> {
        (**self).verify(request)
    }
}

impl CompactToken {
    /// Build the verification request for this token.
    pub fn verification_request<'a>(&'a self, issuer: Option<&'a str>) -> VerificationRequest<'a> {
        let header = self.header();
        VerificationRequest {
            alg: &header.alg,
            kid: header.kid.as_deref(),
            issuer,
            signing_input: self.signing_input(),
            signature: self.signature(),
        }
    }

    /// Run `verifier` over this token.
    pub fn verify_with<V>(&self, verifier: &V, issuer: Option<&str>) -> CardResult<bool>
    where
        V: SignatureVerifier + ?Sized,
    {
        let verified = verifier.verify(&self.verification_request(issuer))?;
        tracing::debug!(
            kid = self.header().kid.as_deref().unwrap_or("-"),
            verified,
            "signature checked"
        );
        Ok(verified)
    }
}
