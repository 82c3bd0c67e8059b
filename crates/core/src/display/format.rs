//! Formatting of FHIR primitive and data-type values for display.
//!
//! Every function here is total: missing or unusable input yields `None`.

use chrono::{FixedOffset, NaiveDate};
use fhir::{FhirDate, HumanName, Quantity};

/// Calendar date styles, named after the platform date-formatter styles they mirror.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DateStyle {
    /// `March 20, 1992`
    Long,
    /// `Mar 20, 1992`
    Medium,
}

impl DateStyle {
    fn pattern(self) -> &'static str {
        match self {
            DateStyle::Long => "%B %-d, %Y",
            DateStyle::Medium => "%b %-d, %Y",
        }
    }
}

/// The calendar date a FHIR date denotes for a reader at `offset`.
///
/// Date-only values are built from their components (missing month or day count as 1) and are
/// never shifted by the offset. Values carrying a time are converted to `offset` first.
pub fn calendar_date(date: &FhirDate, offset: FixedOffset) -> Option<NaiveDate> {
    match date.instant() {
        Some(instant) => Some(instant.with_timezone(&offset).date_naive()),
        None => NaiveDate::from_ymd_opt(
            date.year(),
            date.month().unwrap_or(1),
            date.day().unwrap_or(1),
        ),
    }
}

pub fn format_date(date: &FhirDate, style: DateStyle, offset: FixedOffset) -> Option<String> {
    calendar_date(date, offset).map(|day| day.format(style.pattern()).to_string())
}

/// Render a quantity as `[comparator] value [unit]`.
///
/// Values with magnitude below 1 get two fraction digits, everything else one.
pub fn format_quantity(quantity: &Quantity) -> Option<String> {
    let value = quantity.value.filter(|v| v.is_finite())?;
    let digits = if value.abs() < 1.0 { 2 } else { 1 };
    let value = format!("{value:.digits$}");

    let parts: Vec<&str> = [
        quantity.comparator.as_deref(),
        Some(value.as_str()),
        quantity.unit.as_deref(),
    ]
    .into_iter()
    .flatten()
    .map(str::trim)
    .filter(|part| !part.is_empty())
    .collect();

    Some(parts.join(" "))
}

/// A person's name for display.
///
/// `text` is used verbatim when present; otherwise the non-empty parts are joined in the order
/// prefix, given, family, suffix.
pub fn full_name(name: &HumanName) -> Option<String> {
    if let Some(text) = non_empty(name.text.as_deref()) {
        return Some(text.to_string());
    }

    let parts: Vec<&str> = name
        .prefix
        .iter()
        .chain(name.given.iter())
        .chain(name.family.iter())
        .chain(name.suffix.iter())
        .map(|part| part.trim())
        .filter(|part| !part.is_empty())
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" "))
    }
}

/// Treat blank strings as absent.
pub(crate) fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Offset, Utc};

    fn date(s: &str) -> FhirDate {
        FhirDate::parse(s).expect("valid date")
    }

    fn utc() -> FixedOffset {
        Utc.fix()
    }

    fn offset(hours: i32) -> FixedOffset {
        FixedOffset::east_opt(hours * 3600).expect("valid offset")
    }

    #[test]
    fn long_and_medium_styles() {
        let birth = date("1992-03-20");
        assert_eq!(
            format_date(&birth, DateStyle::Long, utc()).as_deref(),
            Some("March 20, 1992")
        );
        assert_eq!(
            format_date(&birth, DateStyle::Medium, utc()).as_deref(),
            Some("Mar 20, 1992")
        );
    }

    #[test]
    fn date_only_values_ignore_the_display_offset() {
        let birth = date("1992-03-20");
        for hours in [-12, -5, 0, 9, 14] {
            assert_eq!(
                format_date(&birth, DateStyle::Long, offset(hours)).as_deref(),
                Some("March 20, 1992"),
                "offset {hours}"
            );
        }
    }

    #[test]
    fn partial_dates_default_missing_components() {
        assert_eq!(
            format_date(&date("1992"), DateStyle::Long, utc()).as_deref(),
            Some("January 1, 1992")
        );
        assert_eq!(
            format_date(&date("1992-07"), DateStyle::Medium, utc()).as_deref(),
            Some("Jul 1, 1992")
        );
    }

    #[test]
    fn timed_values_convert_to_display_offset() {
        let taken = date("2021-01-01T23:30:00Z");
        assert_eq!(
            format_date(&taken, DateStyle::Long, utc()).as_deref(),
            Some("January 1, 2021")
        );
        assert_eq!(
            format_date(&taken, DateStyle::Long, offset(2)).as_deref(),
            Some("January 2, 2021")
        );
    }

    #[test]
    fn impossible_calendar_dates_are_absent() {
        assert_eq!(format_date(&date("2021-02-30"), DateStyle::Long, utc()), None);
    }

    #[test]
    fn quantity_fraction_digits_follow_magnitude() {
        let small = Quantity {
            value: Some(0.5),
            ..Default::default()
        };
        let large = Quantity {
            value: Some(5.0),
            ..Default::default()
        };
        assert_eq!(format_quantity(&small).as_deref(), Some("0.50"));
        assert_eq!(format_quantity(&large).as_deref(), Some("5.0"));
    }

    #[test]
    fn quantity_includes_comparator_and_unit() {
        let quantity = Quantity {
            value: Some(120.0),
            comparator: Some("<".into()),
            unit: Some("mmHg".into()),
            ..Default::default()
        };
        assert_eq!(format_quantity(&quantity).as_deref(), Some("< 120.0 mmHg"));
    }

    #[test]
    fn quantity_without_value_is_absent() {
        let quantity = Quantity {
            unit: Some("mg".into()),
            ..Default::default()
        };
        assert_eq!(format_quantity(&quantity), None);
    }

    #[test]
    fn name_prefers_text() {
        let name = HumanName {
            text: Some("Dr. Jane Q. Public".into()),
            family: Some("Ignored".into()),
            ..Default::default()
        };
        assert_eq!(full_name(&name).as_deref(), Some("Dr. Jane Q. Public"));
    }

    #[test]
    fn name_joins_parts_in_order() {
        let name = HumanName {
            prefix: vec!["Dr.".into()],
            given: vec!["Jane".into(), "".into(), "Q.".into()],
            family: Some("Public".into()),
            suffix: vec!["PhD".into()],
            ..Default::default()
        };
        assert_eq!(full_name(&name).as_deref(), Some("Dr. Jane Q. Public PhD"));
        assert_eq!(full_name(&HumanName::default()), None);
    }
}
