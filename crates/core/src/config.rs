//! Core runtime configuration.
//!
//! This module defines configuration that should be resolved once at process startup and then
//! passed into core services. The intent is to avoid reading process-wide environment variables
//! while decoding or rendering, which can lead to inconsistent behaviour in multi-threaded
//! runtimes and test harnesses.

use crate::constants::DEFAULT_MAX_PAYLOAD_BYTES;
use crate::{CardError, CardResult};
use chrono::{FixedOffset, Local, Offset, Utc};
use std::path::{Path, PathBuf};

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    value_set_path: Option<PathBuf>,
    display_offset: FixedOffset,
    max_payload_bytes: usize,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns [`CardError::InvalidInput`] if `max_payload_bytes` is zero.
    pub fn new(
        value_set_path: Option<PathBuf>,
        display_offset: FixedOffset,
        max_payload_bytes: usize,
    ) -> CardResult<Self> {
        if max_payload_bytes == 0 {
            return Err(CardError::InvalidInput(
                "max_payload_bytes must be greater than zero".into(),
            ));
        }

        Ok(Self {
            value_set_path,
            display_offset,
            max_payload_bytes,
        })
    }

    /// Build a configuration from raw (already read) environment values.
    ///
    /// Each argument is the value of the corresponding `SHC_*` variable, or `None` if unset.
    pub fn from_env_values(
        value_set_path: Option<String>,
        display_utc_offset: Option<String>,
        max_payload_bytes: Option<String>,
    ) -> CardResult<Self> {
        let value_set_path = non_blank(value_set_path).map(PathBuf::from);
        Self::new(
            value_set_path,
            display_offset_from_env_value(display_utc_offset)?,
            max_payload_bytes_from_env_value(max_payload_bytes)?,
        )
    }

    pub fn value_set_path(&self) -> Option<&Path> {
        self.value_set_path.as_deref()
    }

    pub fn display_offset(&self) -> FixedOffset {
        self.display_offset
    }

    pub fn max_payload_bytes(&self) -> usize {
        self.max_payload_bytes
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            value_set_path: None,
            display_offset: local_offset(),
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
        }
    }
}

/// The machine's current UTC offset.
pub fn local_offset() -> FixedOffset {
    Local::now().offset().fix()
}

/// Parse a display UTC offset such as `+01:00`, `-0530` or `Z`.
///
/// If `value` is `None` or empty/whitespace, returns the machine's local offset.
pub fn display_offset_from_env_value(value: Option<String>) -> CardResult<FixedOffset> {
    let Some(value) = non_blank(value) else {
        return Ok(local_offset());
    };
    parse_utc_offset(&value)
}

/// Parse a UTC offset string.
///
/// # Errors
///
/// Returns [`CardError::InvalidInput`] unless `value` is `Z`/`UTC` or `±HH:MM`/`±HHMM` within
/// ±23:59.
pub fn parse_utc_offset(value: &str) -> CardResult<FixedOffset> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("z") || value.eq_ignore_ascii_case("utc") {
        return Ok(Utc.fix());
    }

    let invalid = || CardError::InvalidInput(format!("invalid UTC offset '{value}'"));

    let (sign, rest) = match value.as_bytes().first() {
        Some(b'+') => (1, &value[1..]),
        Some(b'-') => (-1, &value[1..]),
        _ => return Err(invalid()),
    };
    if !rest.is_ascii() {
        return Err(invalid());
    }
    let (hh, mm) = match rest.len() {
        4 => rest.split_at(2),
        5 if rest.as_bytes()[2] == b':' => (&rest[..2], &rest[3..]),
        _ => return Err(invalid()),
    };
    if !hh.bytes().chain(mm.bytes()).all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let hours: i32 = hh.parse().map_err(|_| invalid())?;
    let minutes: i32 = mm.parse().map_err(|_| invalid())?;
    if hours > 23 || minutes > 59 {
        return Err(invalid());
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}

/// Parse the decompressed payload ceiling.
///
/// If `value` is `None` or empty/whitespace, returns [`DEFAULT_MAX_PAYLOAD_BYTES`].
pub fn max_payload_bytes_from_env_value(value: Option<String>) -> CardResult<usize> {
    match non_blank(value) {
        None => Ok(DEFAULT_MAX_PAYLOAD_BYTES),
        Some(v) => v
            .parse::<usize>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| {
                CardError::InvalidInput(format!("invalid max payload bytes '{v}'"))
            }),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
