//! Constants used throughout the health card core crate.
//!
//! Wire-format constants live here so that the numeric codec, the JWS decoder and the
//! configuration defaults agree on a single value.

/// URI scheme prefix of a SMART Health Card QR payload.
pub const SHC_SCHEME: &str = "shc:/";

/// Offset added to each two-digit pair to recover the JWS character (`'-'` is 45).
pub const NUMERIC_OFFSET: u8 = b'-';

/// Largest pair value that maps to a JWS character (`45 + 77 = 'z'`).
pub const MAX_NUMERIC_PAIR: u8 = b'z' - NUMERIC_OFFSET;

/// QR data bits reserved for mode indicators and segment headers before the numeric payload.
pub const RESERVED_HEADER_BITS: usize = 76;

/// The only JWS algorithm health cards are signed with.
pub const SUPPORTED_ALG: &str = "ES256";

/// `zip` header value for raw DEFLATE payload compression.
pub const DEFLATE_ZIP: &str = "DEF";

/// Default ceiling on the decompressed payload size.
pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 1024 * 1024;

/// Environment variable naming an optional external value-set document.
pub const ENV_VALUE_SET_PATH: &str = "SHC_VALUE_SET_PATH";

/// Environment variable with the UTC offset used to display timestamps, e.g. `+01:00`.
pub const ENV_DISPLAY_UTC_OFFSET: &str = "SHC_DISPLAY_UTC_OFFSET";

/// Environment variable overriding [`DEFAULT_MAX_PAYLOAD_BYTES`].
pub const ENV_MAX_PAYLOAD_BYTES: &str = "SHC_MAX_PAYLOAD_BYTES";

/// Environment variable naming the issuer JWK Set used for signature verification.
pub const ENV_ISSUER_KEYS: &str = "SHC_ISSUER_KEYS";
