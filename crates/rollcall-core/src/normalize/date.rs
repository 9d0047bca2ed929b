use crate::error::CoreError;
use crate::table::Cell;
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

/// Sentinel for unparseable or calendar-invalid input. Normalization never
/// raises; callers branch on this value instead.
pub const INVALID_DATE: &str = "invalid-date";

// Spreadsheet serial dates count days from 1899-12-30; the Unix epoch sits
// 25569 days after that.
const SHEET_EPOCH_UNIX_DAYS: f64 = 25_569.0;
const SECONDS_PER_DAY: f64 = 86_400.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateFormat {
    Iso,
    Au,
    Us,
}

impl DateFormat {
    pub const fn as_str(self) -> &'static str {
        match self {
            DateFormat::Iso => "iso",
            DateFormat::Au => "au",
            DateFormat::Us => "us",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "iso" => Ok(DateFormat::Iso),
            "au" | "international (au)" | "international(au)" => Ok(DateFormat::Au),
            "us" => Ok(DateFormat::Us),
            _ => Err(CoreError::InvalidDateFormat(raw.to_string())),
        }
    }
}

static ISO_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})-(\d{1,2})-(\d{1,2})$").expect("iso date shape"));
static SLASH_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})/(\d{1,2})/(\d{4}|\d{2})$").expect("slash date shape"));

/// Canonicalizes a cell into `YYYY-MM-DD`, the `invalid-date` sentinel, or
/// the empty string for empty input. Numeric cells are spreadsheet serial
/// day counts converted in the target offset; strings are matched against
/// the hinted regional shape with a generic fallback. Idempotent for any
/// valid output.
pub fn normalize_date(value: &Cell, format: DateFormat, offset: FixedOffset) -> String {
    match value {
        Cell::Empty => String::new(),
        Cell::Date(instant) => instant.with_timezone(&offset).format("%Y-%m-%d").to_string(),
        Cell::Number(serial) => serial_to_date(*serial, offset),
        Cell::Text(raw) => normalize_date_text(raw, format, offset),
    }
}

pub fn normalize_date_text(raw: &str, format: DateFormat, offset: FixedOffset) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    let parts = match format {
        DateFormat::Iso => ISO_SHAPE
            .captures(trimmed)
            .map(|caps| (component(&caps, 1), component(&caps, 2), component(&caps, 3))),
        DateFormat::Au => SLASH_SHAPE
            .captures(trimmed)
            .map(|caps| (component(&caps, 3), component(&caps, 2), component(&caps, 1))),
        DateFormat::Us => SLASH_SHAPE
            .captures(trimmed)
            .map(|caps| (component(&caps, 3), component(&caps, 1), component(&caps, 2))),
    };

    match parts {
        Some((year, month, day)) => assemble(&year, &month, &day),
        None => generic_date(trimmed, offset),
    }
}

pub fn parse_utc_offset(raw: &str) -> Result<FixedOffset, CoreError> {
    let trimmed = raw.trim();
    let invalid = || CoreError::InvalidUtcOffset(raw.to_string());

    if trimmed.eq_ignore_ascii_case("z") || trimmed.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0).ok_or_else(invalid);
    }

    let (sign, rest) = match trimmed.as_bytes().first() {
        Some(b'+') => (1, &trimmed[1..]),
        Some(b'-') => (-1, &trimmed[1..]),
        _ => return Err(invalid()),
    };
    let (hours, minutes) = rest.split_once(':').ok_or_else(invalid)?;
    let hours: i32 = hours.parse().map_err(|_| invalid())?;
    let minutes: i32 = minutes.parse().map_err(|_| invalid())?;
    if !(0..=14).contains(&hours) || !(0..60).contains(&minutes) {
        return Err(invalid());
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}

fn component(caps: &regex::Captures<'_>, index: usize) -> String {
    caps[index].to_string()
}

fn assemble(year: &str, month: &str, day: &str) -> String {
    let year = if year.len() == 2 {
        format!("20{year}")
    } else {
        year.to_string()
    };
    let (Ok(year), Ok(month), Ok(day)) = (
        year.parse::<i32>(),
        month.parse::<u32>(),
        day.parse::<u32>(),
    ) else {
        return INVALID_DATE.to_string();
    };
    match NaiveDate::from_ymd_opt(year, month, day) {
        Some(date) => date.format("%Y-%m-%d").to_string(),
        None => INVALID_DATE.to_string(),
    }
}

fn generic_date(raw: &str, offset: FixedOffset) -> String {
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.format("%Y-%m-%d").to_string();
    }
    if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
        return instant.with_timezone(&offset).format("%Y-%m-%d").to_string();
    }
    INVALID_DATE.to_string()
}

fn serial_to_date(serial: f64, offset: FixedOffset) -> String {
    if !serial.is_finite() {
        return INVALID_DATE.to_string();
    }
    let seconds = (serial - SHEET_EPOCH_UNIX_DAYS) * SECONDS_PER_DAY;
    match DateTime::<Utc>::from_timestamp(seconds.round() as i64, 0) {
        Some(instant) => instant.with_timezone(&offset).format("%Y-%m-%d").to_string(),
        None => INVALID_DATE.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::{normalize_date, normalize_date_text, parse_utc_offset, DateFormat, INVALID_DATE};
    use crate::table::Cell;
    use chrono::{FixedOffset, TimeZone, Utc};

    fn sydney() -> FixedOffset {
        parse_utc_offset("+10:00").expect("offset")
    }

    #[test]
    fn au_slash_dates_reassemble_padded() {
        assert_eq!(normalize_date_text("3/04/2010", DateFormat::Au, sydney()), "2010-04-03");
        assert_eq!(normalize_date_text("03/04/2010", DateFormat::Au, sydney()), "2010-04-03");
    }

    #[test]
    fn us_slash_dates_swap_day_and_month() {
        assert_eq!(normalize_date_text("3/04/2010", DateFormat::Us, sydney()), "2010-03-04");
    }

    #[test]
    fn two_digit_years_expand_to_2000s() {
        assert_eq!(normalize_date_text("3/04/10", DateFormat::Au, sydney()), "2010-04-03");
    }

    #[test]
    fn iso_hint_pads_components() {
        assert_eq!(normalize_date_text("2010-4-3", DateFormat::Iso, sydney()), "2010-04-03");
    }

    #[test]
    fn canonical_output_survives_any_hint() {
        for format in [DateFormat::Iso, DateFormat::Au, DateFormat::Us] {
            assert_eq!(
                normalize_date_text("2010-04-03", format, sydney()),
                "2010-04-03"
            );
        }
    }

    #[test]
    fn normalization_is_idempotent_for_valid_input() {
        let once = normalize_date_text("3/04/2010", DateFormat::Au, sydney());
        assert_eq!(normalize_date_text(&once, DateFormat::Au, sydney()), once);
    }

    #[test]
    fn calendar_invalid_dates_yield_sentinel() {
        assert_eq!(
            normalize_date_text("31/02/2020", DateFormat::Au, sydney()),
            INVALID_DATE
        );
        assert_eq!(
            normalize_date_text("gibberish", DateFormat::Au, sydney()),
            INVALID_DATE
        );
        assert_eq!(
            normalize_date_text(INVALID_DATE, DateFormat::Au, sydney()),
            INVALID_DATE
        );
    }

    #[test]
    fn empty_input_stays_empty() {
        assert_eq!(normalize_date(&Cell::Empty, DateFormat::Au, sydney()), "");
        assert_eq!(normalize_date_text("   ", DateFormat::Au, sydney()), "");
    }

    #[test]
    fn serial_numbers_convert_in_target_offset() {
        // 40271 days after 1899-12-30 is 2010-04-03 UTC.
        assert_eq!(
            normalize_date(&Cell::Number(40_271.0), DateFormat::Au, sydney()),
            "2010-04-03"
        );
        // A negative offset pushes midnight UTC back to the previous day.
        let new_york = parse_utc_offset("-05:00").expect("offset");
        assert_eq!(
            normalize_date(&Cell::Number(40_271.0), DateFormat::Au, new_york),
            "2010-04-02"
        );
    }

    #[test]
    fn non_finite_serials_yield_sentinel() {
        assert_eq!(
            normalize_date(&Cell::Number(f64::NAN), DateFormat::Au, sydney()),
            INVALID_DATE
        );
    }

    #[test]
    fn date_cells_format_their_instant() {
        let instant = Utc.with_ymd_and_hms(2010, 4, 2, 20, 0, 0).unwrap();
        assert_eq!(
            normalize_date(&Cell::Date(instant), DateFormat::Au, sydney()),
            "2010-04-03"
        );
    }

    #[test]
    fn offsets_parse_and_reject() {
        assert!(parse_utc_offset("+10:00").is_ok());
        assert!(parse_utc_offset("-05:30").is_ok());
        assert!(parse_utc_offset("utc").is_ok());
        assert!(parse_utc_offset("10:00").is_err());
        assert!(parse_utc_offset("+25:00").is_err());
        assert!(parse_utc_offset("sydney").is_err());
    }
}
