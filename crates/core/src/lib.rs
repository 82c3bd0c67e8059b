//! # SHC Core
//!
//! Decoding and display of SMART Health Cards.
//!
//! This crate turns scanned QR text into clinical display rows:
//! - Numeric-mode codec between `shc:/` digits and compact JWS text ([`numeric`])
//! - JWS framing, header rules and raw-deflate payloads ([`jws`])
//! - The token model that owns the current scan and its derived state ([`card`])
//! - Code-system display lookup ([`code_system`]) and per-resource projection ([`display`])
//! - A seam for plugging in signature verification ([`verify`])
//!
//! **No key material or transport**: issuer key handling lives in `shc-keys`, and reading input
//! (stdin, camera, files) belongs to the binaries.

pub mod card;
pub mod code_system;
pub mod config;
pub mod constants;
pub mod display;
pub mod error;
pub mod jws;
pub mod numeric;
pub mod verify;

pub use card::{CardStatus, HealthCardTokenModel};
pub use code_system::{CodeEntry, CodeSystemResolver};
pub use config::CoreConfig;
pub use display::{DisplayFields, DisplayOptions, IconHint, ResourceRow};
pub use error::{CardError, CardResult, Segment};
pub use jws::{CompactToken, CompactTokenDecoder, Compression, JwsHeader};
pub use numeric::estimate_char_count;
pub use verify::{SignatureVerifier, VerificationRequest};
