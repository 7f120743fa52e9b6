// SPDX-License-Identifier: Apache-2.0

//! Naive calendar time helpers.
//!
//! Every timestamp in the service is a wall-clock `NaiveDateTime`. Index
//! rows, filename tokens and request bounds are compared in that frame with
//! no timezone conversion; attaching zones here reintroduces the DST shift
//! between filename-derived and index-derived times.

use chrono::{NaiveDate, NaiveDateTime, TimeDelta, Timelike};

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y%m%dT%H%M%S%.f",
    "%Y%m%dT%H%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y%m%d"];

const FILENAME_TOKEN_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Parse an ISO-8601 date or date-time into naive wall-clock time.
///
/// A trailing `Z` or numeric UTC offset is accepted and dropped; the wall
/// clock digits are kept as written. Precision below one microsecond is
/// truncated.
#[must_use]
pub fn parse_naive_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let text = strip_utc_offset(raw.trim());
    if text.is_empty() {
        return None;
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(text, fmt) {
            return Some(truncate_to_micros(ts));
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(day) = NaiveDate::parse_from_str(text, fmt) {
            return day.and_hms_opt(0, 0, 0);
        }
    }
    None
}

/// Parse one `YYYYMMDD_HHMMSS` filename token.
#[must_use]
pub fn parse_filename_token(token: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(token, FILENAME_TOKEN_FORMAT).ok()
}

/// `YYYY-MM-DDTHH:MM:SS`, with `.ffffff` only when the microsecond part is
/// non-zero.
#[must_use]
pub fn format_iso(ts: &NaiveDateTime) -> String {
    with_optional_micros(ts, "%Y-%m-%dT%H:%M:%S")
}

/// Text form used for SQL binding and comparison against decoded filename
/// tokens: `YYYY-MM-DD HH:MM:SS[.ffffff]`.
#[must_use]
pub fn format_sql_timestamp(ts: &NaiveDateTime) -> String {
    with_optional_micros(ts, "%Y-%m-%d %H:%M:%S")
}

/// `HH:MM:SS.ffffff`, always with six fractional digits.
#[must_use]
pub fn format_clock_label(ts: &NaiveDateTime) -> String {
    format!("{}.{:06}", ts.format("%H:%M:%S"), micros_of(ts))
}

/// `start + seconds`, rounded to the nearest microsecond.
#[must_use]
pub fn offset_by_seconds(start: &NaiveDateTime, seconds: f64) -> Option<NaiveDateTime> {
    if !seconds.is_finite() {
        return None;
    }
    let micros = (seconds * 1e6).round();
    if micros.abs() >= i64::MAX as f64 {
        return None;
    }
    start.checked_add_signed(TimeDelta::microseconds(micros as i64))
}

fn with_optional_micros(ts: &NaiveDateTime, fmt: &str) -> String {
    let micros = micros_of(ts);
    if micros == 0 {
        ts.format(fmt).to_string()
    } else {
        format!("{}.{micros:06}", ts.format(fmt))
    }
}

fn micros_of(ts: &NaiveDateTime) -> u32 {
    (ts.nanosecond() % 1_000_000_000) / 1_000
}

fn truncate_to_micros(ts: NaiveDateTime) -> NaiveDateTime {
    let nanos = ts.nanosecond();
    ts.with_nanosecond(nanos - nanos % 1_000).unwrap_or(ts)
}

fn strip_utc_offset(text: &str) -> &str {
    if let Some(rest) = text.strip_suffix(|c: char| c == 'Z' || c == 'z') {
        return rest;
    }
    let Some(tail) = text.get(10..) else {
        return text;
    };
    let Some(rel) = tail.rfind(|c: char| c == '+' || c == '-') else {
        return text;
    };
    let split = 10 + rel;
    let offset = &text[split + 1..];
    let digits = offset.chars().filter(char::is_ascii_digit).count();
    let well_formed = offset.chars().all(|c| c.is_ascii_digit() || c == ':')
        && (digits == 2 || digits == 4);
    if well_formed {
        &text[..split]
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(raw: &str) -> NaiveDateTime {
        parse_naive_timestamp(raw).expect("timestamp")
    }

    #[test]
    fn parses_common_iso_shapes() {
        let expected = NaiveDate::from_ymd_opt(2025, 9, 8)
            .and_then(|d| d.and_hms_opt(12, 0, 0))
            .expect("date");
        assert_eq!(ts("2025-09-08T12:00:00"), expected);
        assert_eq!(ts("2025-09-08 12:00:00"), expected);
        assert_eq!(ts("2025-09-08T12:00"), expected);
        assert_eq!(ts(" 2025-09-08T12:00:00 "), expected);
        assert_eq!(ts("20250908T120000"), expected);
        assert_eq!(
            ts("2025-09-08"),
            NaiveDate::from_ymd_opt(2025, 9, 8)
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .expect("midnight")
        );
    }

    #[test]
    fn offsets_are_dropped_not_converted() {
        assert_eq!(ts("2025-09-08T12:00:00Z"), ts("2025-09-08T12:00:00"));
        assert_eq!(ts("2025-09-08T12:00:00-04:00"), ts("2025-09-08T12:00:00"));
        assert_eq!(ts("2025-09-08T12:00:00+0200"), ts("2025-09-08T12:00:00"));
    }

    #[test]
    fn fractional_seconds_keep_microseconds() {
        let t = ts("2025-09-08T12:00:00.1234567");
        assert_eq!(format_iso(&t), "2025-09-08T12:00:00.123456");
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_naive_timestamp("").is_none());
        assert!(parse_naive_timestamp("yesterday").is_none());
        assert!(parse_naive_timestamp("2025-13-01T00:00:00").is_none());
    }

    #[test]
    fn iso_output_omits_zero_micros() {
        assert_eq!(format_iso(&ts("2025-09-08T12:00:00")), "2025-09-08T12:00:00");
        assert_eq!(
            format_iso(&ts("2025-09-08T12:00:00.5")),
            "2025-09-08T12:00:00.500000"
        );
        assert_eq!(
            format_sql_timestamp(&ts("2025-09-08T12:00:00")),
            "2025-09-08 12:00:00"
        );
    }

    #[test]
    fn clock_label_has_six_digits() {
        assert_eq!(format_clock_label(&ts("2025-09-08T01:02:03")), "01:02:03.000000");
        assert_eq!(
            format_clock_label(&ts("2025-09-08T01:02:03.000042")),
            "01:02:03.000042"
        );
    }

    #[test]
    fn filename_tokens_parse_strictly() {
        assert_eq!(parse_filename_token("20250908_120000"), Some(ts("2025-09-08T12:00:00")));
        assert!(parse_filename_token("20251399_120000").is_none());
    }

    #[test]
    fn offsets_round_to_microseconds() {
        let start = ts("2025-09-08T12:00:00");
        let got = offset_by_seconds(&start, 1.000_000_4).expect("offset");
        assert_eq!(format_iso(&got), "2025-09-08T12:00:01");
        let got = offset_by_seconds(&start, 0.000_000_6).expect("offset");
        assert_eq!(format_iso(&got), "2025-09-08T12:00:00.000001");
        assert!(offset_by_seconds(&start, f64::NAN).is_none());
    }
}
