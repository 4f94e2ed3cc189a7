//! Spreadsheet date handling.
//!
//! Workbooks exported by the distribution system carry dates either as a
//! serial day count or as a malformed string that still embeds the serial
//! (`"01/01/45917"`). Serials count days from 1899-12-30, which reproduces
//! the 1900 leap-year quirk of common spreadsheet software; keep it that way.

use chrono::{Days, NaiveDate};
use regex::Regex;
use std::sync::OnceLock;

/// Lower exclusive bound of the accepted serial range (2009-07-06).
pub const SERIAL_MIN_EXCLUSIVE: i64 = 40_000;
/// Upper exclusive bound of the accepted serial range (2036-11-21).
pub const SERIAL_MAX_EXCLUSIVE: i64 = 50_000;
pub const INVALID_DATE_DISPLAY: &str = "Data inválida";

const ISO_FORMAT: &str = "%Y-%m-%d";

fn serial_epoch() -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(1899, 12, 30)
}

static LEADING_INTEGER: OnceLock<Option<Regex>> = OnceLock::new();
static SLASHED_SERIAL: OnceLock<Option<Regex>> = OnceLock::new();
static BARE_SERIAL: OnceLock<Option<Regex>> = OnceLock::new();
static SLASHED_CALENDAR_DATE: OnceLock<Option<Regex>> = OnceLock::new();

fn cached(cell: &'static OnceLock<Option<Regex>>, pattern: &str) -> Option<&'static Regex> {
    cell.get_or_init(|| Regex::new(pattern).ok()).as_ref()
}

fn first_group_number(
    cell: &'static OnceLock<Option<Regex>>,
    pattern: &str,
    text: &str,
) -> Option<i64> {
    cached(cell, pattern)?
        .captures(text)?
        .get(1)?
        .as_str()
        .parse::<i64>()
        .ok()
}

fn in_serial_range(serial: i64) -> bool {
    serial > SERIAL_MIN_EXCLUSIVE && serial < SERIAL_MAX_EXCLUSIVE
}

/// Converts a serial day count to a calendar date. Returns `None` only when
/// the result falls outside chrono's representable range.
#[must_use]
pub fn decode_serial(serial: i64) -> Option<NaiveDate> {
    let epoch = serial_epoch()?;
    if serial >= 0 {
        epoch.checked_add_days(Days::new(serial.unsigned_abs()))
    } else {
        epoch.checked_sub_days(Days::new(serial.unsigned_abs()))
    }
}

/// Finds a plausible serial in `text`: a leading integer, then the year slot
/// of a `D/M/NNNNN` string, then any five-digit run.
#[must_use]
pub fn extract_serial(text: &str) -> Option<i64> {
    if text.trim().is_empty() {
        return None;
    }
    if let Some(direct) = first_group_number(&LEADING_INTEGER, r"^\s*([+-]?\d+)", text) {
        if in_serial_range(direct) {
            return Some(direct);
        }
    }
    if let Some(serial) = first_group_number(&SLASHED_SERIAL, r"\d{1,2}/\d{1,2}/(\d{5})", text) {
        if in_serial_range(serial) {
            return Some(serial);
        }
    }
    if let Some(serial) = first_group_number(&BARE_SERIAL, r"(\d{5})", text) {
        if in_serial_range(serial) {
            return Some(serial);
        }
    }
    None
}

/// Decodes `text` to `YYYY-MM-DD`, or `None` when no serial can be found.
#[must_use]
pub fn to_iso(text: &str) -> Option<String> {
    let serial = extract_serial(text)?;
    decode_serial(serial).map(|d| d.format(ISO_FORMAT).to_string())
}

/// Parses a genuine `DD/MM/YYYY` calendar string into ISO form.
#[must_use]
pub fn calendar_text_to_iso(text: &str) -> Option<String> {
    let caps =
        cached(&SLASHED_CALENDAR_DATE, r"(\d{1,2})/(\d{1,2})/(\d{4})\b")?.captures(text)?;
    let day = caps.get(1)?.as_str().parse::<u32>().ok()?;
    let month = caps.get(2)?.as_str().parse::<u32>().ok()?;
    let year = caps.get(3)?.as_str().parse::<i32>().ok()?;
    NaiveDate::from_ymd_opt(year, month, day).map(|d| d.format(ISO_FORMAT).to_string())
}

/// Formats an ISO date as `DD/MM/YYYY`; anything else yields
/// [`INVALID_DATE_DISPLAY`].
#[must_use]
pub fn format_for_display(iso_date: &str) -> String {
    let trimmed = iso_date.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, ISO_FORMAT) {
        return date.format("%d/%m/%Y").to_string();
    }
    // Timestamps such as `2025-09-15T10:00:00Z` still carry a usable date.
    if let Some(prefix) = trimmed.get(..10) {
        if let Ok(date) = NaiveDate::parse_from_str(prefix, ISO_FORMAT) {
            return date.format("%d/%m/%Y").to_string();
        }
    }
    INVALID_DATE_DISPLAY.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serial_epoch_matches_spreadsheet_convention() {
        assert_eq!(decode_serial(0), NaiveDate::from_ymd_opt(1899, 12, 30));
        assert_eq!(decode_serial(1), NaiveDate::from_ymd_opt(1899, 12, 31));
        assert_eq!(decode_serial(45917), NaiveDate::from_ymd_opt(2025, 9, 17));
    }

    #[test]
    fn extract_serial_prefers_direct_integers() {
        assert_eq!(extract_serial("45917"), Some(45917));
        assert_eq!(extract_serial(" 45000 "), Some(45000));
        assert_eq!(extract_serial("01/01/45917"), Some(45917));
        assert_eq!(extract_serial("lote 45917 b"), Some(45917));
    }

    #[test]
    fn extract_serial_rejects_out_of_range_candidates() {
        assert_eq!(extract_serial("99999999"), None);
        assert_eq!(extract_serial("40000"), None);
        assert_eq!(extract_serial("50000"), None);
        assert_eq!(extract_serial("12/03/2024"), None);
        assert_eq!(extract_serial(""), None);
    }

    #[test]
    fn to_iso_composes_extraction_and_decoding() {
        assert_eq!(to_iso("01/01/45917").as_deref(), Some("2025-09-17"));
        assert_eq!(to_iso("not a date"), None);
    }

    #[test]
    fn calendar_text_is_read_day_first() {
        assert_eq!(
            calendar_text_to_iso("5/9/2025").as_deref(),
            Some("2025-09-05")
        );
        assert_eq!(calendar_text_to_iso("31/02/2025"), None);
        assert_eq!(calendar_text_to_iso("01/01/45917"), None);
    }

    #[test]
    fn display_format_never_fails() {
        assert_eq!(format_for_display("2025-09-17"), "17/09/2025");
        assert_eq!(format_for_display("2025-09-17T08:30:00Z"), "17/09/2025");
        assert_eq!(format_for_display(""), INVALID_DATE_DISPLAY);
        assert_eq!(format_for_display("17/09/2025"), INVALID_DATE_DISPLAY);
        assert_eq!(format_for_display("2025-13-40"), INVALID_DATE_DISPLAY);
    }
}
