//! Numeric-mode serialization of a compact JWS.
//!
//! A SMART Health Card QR code stores its JWS in QR *numeric* mode: every JWS character `c`
//! becomes the two decimal digits of `c - 45`, so `'-'` is `00` and `'z'` is `77`. The QR text
//! is that digit string behind an `shc:/` prefix:
//!
//! `shc:/5676290952432060346029243740...`
//!
//! Only single-chunk cards are handled. The deprecated chunked form
//! (`shc:/<index>/<total>/<digits>`) is rejected.

use crate::constants::{MAX_NUMERIC_PAIR, NUMERIC_OFFSET, RESERVED_HEADER_BITS, SHC_SCHEME};
use crate::{CardError, CardResult};

/// Strip an optional `shc:/` prefix (any case) and surrounding whitespace from QR text.
///
/// # Errors
///
/// Returns [`CardError::MalformedNumeric`] for chunked payloads (`shc:/1/2/...`).
pub fn strip_scheme(text: &str) -> CardResult<&str> {
    let text = text.trim();
    let prefix_len = SHC_SCHEME.len();
    let digits = match text.get(..prefix_len) {
        Some(prefix) if prefix.eq_ignore_ascii_case(SHC_SCHEME) => &text[prefix_len..],
        _ => text,
    };

    if digits.contains('/') {
        return Err(CardError::MalformedNumeric(
            "chunked health card QR codes are not supported".into(),
        ));
    }

    Ok(digits)
}

/// Convert a numeric serialization back into compact JWS text.
///
/// # Errors
///
/// Returns [`CardError::MalformedNumeric`] if `numeric` is empty, contains anything other than
/// ASCII digits, has odd length, or contains a pair above 77 (which would map past `'z'`).
pub fn decode(numeric: &str) -> CardResult<String> {
    if numeric.is_empty() {
        return Err(CardError::MalformedNumeric("input is empty".into()));
    }

    if let Some(position) = numeric.bytes().position(|b| !b.is_ascii_digit()) {
        return Err(CardError::MalformedNumeric(format!(
            "non-digit character at position {position}"
        )));
    }

    if numeric.len() % 2 != 0 {
        return Err(CardError::MalformedNumeric(format!(
            "odd number of digits ({})",
            numeric.len()
        )));
    }

    numeric
        .as_bytes()
        .chunks_exact(2)
        .enumerate()
        .map(|(index, pair)| {
            let value = (pair[0] - b'0') * 10 + (pair[1] - b'0');
            if value > MAX_NUMERIC_PAIR {
                return Err(CardError::MalformedNumeric(format!(
                    "digit pair {value:02} at position {} is outside the JWS character range",
                    index * 2
                )));
            }
            Ok(char::from(value + NUMERIC_OFFSET))
        })
        .collect()
}

/// Convert compact JWS text into its numeric serialization (digits only, no prefix).
///
/// # Errors
///
/// Returns [`CardError::MalformedToken`] if `token` contains a character outside `'-'..='z'`.
pub fn encode(token: &str) -> CardResult<String> {
    let mut out = String::with_capacity(token.len() * 2);
    for (position, byte) in token.bytes().enumerate() {
        if !(NUMERIC_OFFSET..=NUMERIC_OFFSET + MAX_NUMERIC_PAIR).contains(&byte) {
            return Err(CardError::MalformedToken(format!(
                "character at position {position} cannot be numerically encoded"
            )));
        }
        let value = byte - NUMERIC_OFFSET;
        out.push(char::from(b'0' + value / 10));
        out.push(char::from(b'0' + value % 10));
    }
    Ok(out)
}

/// Convert compact JWS text into full QR text (`shc:/` + digits).
pub fn to_qr_text(token: &str) -> CardResult<String> {
    Ok(format!("{SHC_SCHEME}{}", encode(token)?))
}

/// Estimate the JWS character count carried by a numeric serialization of `len` digits.
///
/// Computed as `(len - 76) * 3 / 20`, clamped at zero. This is a progress/diagnostic figure
/// only and must not drive decoding decisions.
pub fn estimate_char_count(len: Option<usize>) -> usize {
    match len {
        Some(len) => len.saturating_sub(RESERVED_HEADER_BITS) * 3 / 20,
        None => 0,
    }
}
