//! Health card token model.
//!
//! [`HealthCardTokenModel`] owns the scanned numeric serialization and everything derived from
//! it. Assigning a new value through [`HealthCardTokenModel::set_numeric_serialization`] is the
//! only state transition: the token is decoded, the payload deserialized and the resource list
//! rebuilt before the call returns, so readers never see a half-updated model.
//!
//! Failures never escape the model. Any decode or deserialization error collapses the model into
//! [`CardStatus::Invalid`] with no derived data; the error is logged and kept for
//! [`HealthCardTokenModel::last_error`].

use crate::code_system::CodeSystemResolver;
use crate::display::{self, DisplayOptions, ResourceRow};
use crate::jws::{CompactToken, CompactTokenDecoder};
use crate::numeric::{self, estimate_char_count};
use crate::verify::SignatureVerifier;
use crate::{CardError, CardResult};
use fhir::{ClinicalResource, HealthCard};

/// Externally visible model state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CardStatus {
    /// No input has been set, or it was cleared.
    Empty,
    /// The token decoded and the payload deserialized.
    Valid,
    /// Input is set but could not be decoded or deserialized.
    Invalid,
}

/// Everything derived from a successfully decoded card. Replaced wholesale on every assignment.
#[derive(Debug)]
struct DecodedCard {
    token: CompactToken,
    health_card: HealthCard,
    resources: Vec<ClinicalResource>,
}

#[derive(Debug)]
enum Derived {
    Empty,
    Valid(Box<DecodedCard>),
    Invalid(CardError),
}

#[derive(Debug)]
pub struct HealthCardTokenModel {
    decoder: CompactTokenDecoder,
    numeric_serialization: Option<String>,
    derived: Derived,
}

impl Default for HealthCardTokenModel {
    fn default() -> Self {
        Self::with_decoder(CompactTokenDecoder::default(), None)
    }
}

impl HealthCardTokenModel {
    /// Create a model and apply `numeric_serialization` as its first assignment.
    pub fn new(numeric_serialization: Option<String>) -> Self {
        Self::with_decoder(CompactTokenDecoder::default(), numeric_serialization)
    }

    pub fn with_decoder(
        decoder: CompactTokenDecoder,
        numeric_serialization: Option<String>,
    ) -> Self {
        let mut model = Self {
            decoder,
            numeric_serialization: None,
            derived: Derived::Empty,
        };
        model.set_numeric_serialization(numeric_serialization);
        model
    }

    /// Replace the input and recompute all derived state.
    ///
    /// Accepts either bare digits or full QR text (`shc:/...`).
    pub fn set_numeric_serialization(&mut self, value: Option<String>) {
        self.derived = match value.as_deref() {
            None => Derived::Empty,
            Some(text) => match self.decode_card(text) {
                Ok(card) => {
                    tracing::debug!(
                        issuer = %card.health_card.issuer,
                        resources = card.resources.len(),
                        "health card decoded"
                    );
                    Derived::Valid(Box::new(card))
                }
                Err(err) => {
                    tracing::warn!(error = %err, digits = text.len(), "health card rejected");
                    Derived::Invalid(err)
                }
            },
        };
        self.numeric_serialization = value;
    }

    fn decode_card(&self, text: &str) -> CardResult<DecodedCard> {
        let token = self.decoder.decode_qr(text)?;
        let health_card = HealthCard::from_slice(token.payload())?;
        let resources = health_card.resources().cloned().collect();
        Ok(DecodedCard {
            token,
            health_card,
            resources,
        })
    }

    pub fn numeric_serialization(&self) -> Option<&str> {
        self.numeric_serialization.as_deref()
    }

    pub fn status(&self) -> CardStatus {
        match self.derived {
            Derived::Empty => CardStatus::Empty,
            Derived::Valid(_) => CardStatus::Valid,
            Derived::Invalid(_) => CardStatus::Invalid,
        }
    }

    pub fn token(&self) -> Option<&CompactToken> {
        self.decoded().map(|card| &card.token)
    }

    pub fn health_card(&self) -> Option<&HealthCard> {
        self.decoded().map(|card| &card.health_card)
    }

    /// Clinical resources in bundle order. Empty unless the model is [`CardStatus::Valid`].
    pub fn resources(&self) -> &[ClinicalResource] {
        self.decoded()
            .map(|card| card.resources.as_slice())
            .unwrap_or_default()
    }

    /// Why the current input was rejected, when the model is [`CardStatus::Invalid`].
    pub fn last_error(&self) -> Option<&CardError> {
        match &self.derived {
            Derived::Invalid(err) => Some(err),
            _ => None,
        }
    }

    /// Diagnostic estimate of the JWS length carried by the current input.
    ///
    /// Counts only the digits, so `shc:/` and surrounding whitespace do not change the estimate.
    /// Input that is not a single-chunk QR text estimates to zero.
    pub fn jws_character_count(&self) -> usize {
        let digits = self
            .numeric_serialization
            .as_deref()
            .and_then(|text| numeric::strip_scheme(text).ok());
        estimate_char_count(digits.map(str::len))
    }

    /// One display row per resource, in bundle order.
    pub fn rows(&self, resolver: &CodeSystemResolver, options: &DisplayOptions) -> Vec<ResourceRow> {
        self.resources()
            .iter()
            .map(|resource| display::row(resource, resolver, options))
            .collect()
    }

    /// Verify the current token's signature.
    ///
    /// Returns `Ok(false)` without calling `verifier` unless the model is [`CardStatus::Valid`].
    pub fn verify_with<V>(&self, verifier: &V) -> CardResult<bool>
    where
        V: SignatureVerifier + ?Sized,
    {
        match self.decoded() {
            Some(card) => card
                .token
                .verify_with(verifier, Some(card.health_card.issuer.as_str())),
            None => Ok(false),
        }
    }

    fn decoded(&self) -> Option<&DecodedCard> {
        match &self.derived {
            Derived::Valid(card) => Some(&**card),
            _ => None,
        }
    }
}
