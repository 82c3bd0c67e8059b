/// Which of the three compact-token segments an encoding error refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Segment {
    Header,
    Payload,
    Signature,
}

impl std::fmt::Display for Segment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Segment::Header => "header",
            Segment::Payload => "payload",
            Segment::Signature => "signature",
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CardError {
    #[error("malformed numeric serialization: {0}")]
    MalformedNumeric(String),
    #[error("malformed compact token: {0}")]
    MalformedToken(String),
    #[error("invalid base64url in {segment} segment: {source}")]
    InvalidEncoding {
        segment: Segment,
        #[source]
        source: base64::DecodeError,
    },
    #[error("unsupported JWS header: {0}")]
    UnsupportedHeader(String),
    #[error("payload decompression failed: {0}")]
    DecompressionFailed(String),
    #[error("payload deserialization failed: {0}")]
    DeserializationFailed(#[from] fhir::FhirError),

    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("failed to read file: {0}")]
    FileRead(std::io::Error),
    #[error("invalid value set document: {0}")]
    ValueSet(String),
    #[error("signature verification error: {0}")]
    Verification(String),
}

pub type CardResult<T> = std::result::Result<T, CardError>;
