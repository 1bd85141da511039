//! Value derivations for CWR fields.
//!
//! These never fail: unparsable input yields the documented zero sentinel so
//! that field widths and validator patterns stay intact.

use serde::{Deserialize, Serialize};

/// Sentinel for an absent IPI.
pub const EMPTY_IPI: &str = "00000000000";

/// Sentinel for an absent or unparsable share.
pub const EMPTY_SHARE: &str = "00000";

/// Sentinel for an absent, unparsable or out-of-range duration.
pub const EMPTY_DURATION: &str = "000000";

/// `HHMMSS` holds at most 99:59:59.
const MAX_DURATION_SECONDS: u64 = 99 * 3600 + 59 * 60 + 59;

/// How a colon-separated duration token is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DurationNotation {
    /// `H:MM` or `H:MM:SS` (spreadsheet time cells).
    #[default]
    Clock,
    /// `M:SS` or `H:MM:SS`.
    MinutesSeconds,
}

/// Convert a duration to `HHMMSS`.
///
/// Accepts a colon token (see [`DurationNotation`]) or a seconds count,
/// possibly decimal (fractions are truncated). Totals of 100 hours or more
/// do not fit the field and yield [`EMPTY_DURATION`].
pub fn parse_duration(raw: &str, notation: DurationNotation) -> String {
    total_seconds(raw.trim(), notation)
        .filter(|total| *total <= MAX_DURATION_SECONDS)
        .map(format_hhmmss)
        .unwrap_or_else(|| EMPTY_DURATION.to_string())
}

fn total_seconds(raw: &str, notation: DurationNotation) -> Option<u64> {
    if raw.contains(':') {
        let parts = raw
            .split(':')
            .map(|p| p.trim().parse::<u64>().ok())
            .collect::<Option<Vec<u64>>>()?;

        let (h, m, s) = match (parts.as_slice(), notation) {
            ([h, m, s], _) => (*h, *m, *s),
            ([h, m], DurationNotation::Clock) => (*h, *m, 0),
            ([m, s], DurationNotation::MinutesSeconds) => (0, *m, *s),
            _ => return None,
        };
        return h
            .checked_mul(3600)?
            .checked_add(m.checked_mul(60)?)?
            .checked_add(s);
    }

    let seconds: f64 = raw.parse().ok()?;
    if seconds.is_finite() && seconds >= 0.0 {
        Some(seconds.trunc() as u64)
    } else {
        None
    }
}

fn format_hhmmss(total: u64) -> String {
    let (minutes, seconds) = (total / 60, total % 60);
    let (hours, minutes) = (minutes / 60, minutes % 60);
    format!("{:02}{:02}{:02}", hours, minutes, seconds)
}

/// Format a percentage as 5-digit basis points (`100` → `10000`).
///
/// A trailing `%` is accepted. Half basis points round to the even
/// neighbour. Values over 999.99% produce six digits and are rejected later
/// by the encoder.
pub fn format_share(raw: Option<&str>) -> String {
    raw.map(|r| r.trim().trim_end_matches('%').trim())
        .and_then(|r| r.parse::<f64>().ok())
        .filter(|v| v.is_finite() && *v >= 0.0)
        .map(|v| format!("{:05}", round_half_even(v * 100.0) as u64))
        .unwrap_or_else(|| EMPTY_SHARE.to_string())
}

fn round_half_even(value: f64) -> f64 {
    let floor = value.floor();
    if value - floor != 0.5 {
        return value.round();
    }
    if floor % 2.0 == 0.0 {
        floor
    } else {
        floor + 1.0
    }
}

/// Keep the digits of an IPI and left-pad to 11.
pub fn pad_ipi(raw: Option<&str>) -> String {
    let digits: String = raw
        .unwrap_or_default()
        .chars()
        .filter(|c| c.is_ascii_digit())
        .collect();

    if digits.is_empty() {
        EMPTY_IPI.to_string()
    } else {
        format!("{:0>11}", digits)
    }
}

/// ISWC reduced to its alphanumerics (`T-123.456.789-0` → `T1234567890`).
pub fn normalize_iswc(raw: Option<&str>) -> String {
    raw.unwrap_or_default()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_uppercase()
}

/// 4-digit cut number: the track number when numeric, else the ordinal.
pub fn cut_number(track_number: &str, ordinal: usize) -> String {
    let cut = track_number
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite() && *n >= 0.0)
        .map(|n| n.trunc() as u64)
        .unwrap_or(ordinal as u64);
    format!("{:04}", cut)
}

/// Known upstream spellings of label names and their registered form.
const LABEL_CORRECTIONS: &[(&str, &str)] = &[("REDCOLA", "RED COLA")];

/// Upper-case a label and correct known spelling variants.
pub fn normalize_label(raw: &str) -> String {
    let upper = raw.trim().to_uppercase();
    let compact: String = upper.chars().filter(|c| !c.is_whitespace()).collect();
    LABEL_CORRECTIONS
        .iter()
        .find(|(variant, _)| *variant == compact)
        .map(|(_, registered)| registered.to_string())
        .unwrap_or(upper)
}
