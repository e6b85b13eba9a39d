use bigdecimal::BigDecimal;
use chrono::{Duration, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use std::str::FromStr;

use crate::domain::{CanonicalField, FieldKind, Priority};
use crate::pipeline::ingestion::table::{RawCell, RawRow};
use crate::pipeline::processing::column_map::ColumnMapping;

/// Outcome of normalizing one raw cell against a target kind.
///
/// `Empty` and `Unparseable` both leave the record field null, but the
/// distinction matters downstream: only `Unparseable` means the sheet held
/// real content we could not read, which zeroes the field's confidence term
/// and earns a parse-error anomaly.
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizedCell {
    Empty,
    Value(FieldValue),
    Unparseable,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Priority(Priority),
    Cost(BigDecimal),
    Date(NaiveDate),
}

/// Date formats tried in order; first successful parse wins. Excel serial
/// numbers are the final fallback.
const DATE_FORMATS: [&str; 6] = [
    "%Y-%m-%d",
    "%m/%d/%Y",
    "%d-%b-%Y",
    "%Y/%m/%d",
    "%m-%d-%Y",
    "%B %d, %Y",
];

/// Serial window accepted for bare digit strings (roughly 1954..2119), so a
/// stray year like "2024" is not misread as a date in 1905.
const SERIAL_STRING_MIN: i64 = 20_000;
const SERIAL_STRING_MAX: i64 = 80_000;

/// Largest serial Excel itself will represent (9999-12-31).
const SERIAL_MAX: f64 = 2_958_465.0;

static NON_NUMERIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^0-9.\-]").unwrap());

fn is_null_token(raw: &str) -> bool {
    matches!(
        raw.trim().to_lowercase().as_str(),
        "" | "null" | "none" | "n/a" | "na"
    )
}

/// Normalize one raw cell into the value shape of its canonical field.
/// Pure and total: malformed input yields `Unparseable`, never a panic.
pub fn normalize_cell(kind: FieldKind, cell: &RawCell) -> NormalizedCell {
    match cell {
        RawCell::Blank => NormalizedCell::Empty,
        RawCell::Text(s) if is_null_token(s) => NormalizedCell::Empty,
        RawCell::Text(s) => match kind {
            FieldKind::Text => match normalize_text(s) {
                Some(text) => NormalizedCell::Value(FieldValue::Text(text)),
                None => NormalizedCell::Empty,
            },
            FieldKind::Priority => match normalize_priority(s) {
                Some(p) => NormalizedCell::Value(FieldValue::Priority(p)),
                None => NormalizedCell::Unparseable,
            },
            FieldKind::Cost => match normalize_cost(s) {
                Some(c) => NormalizedCell::Value(FieldValue::Cost(c)),
                None => NormalizedCell::Unparseable,
            },
            FieldKind::Date => match normalize_date(s) {
                Some(d) => NormalizedCell::Value(FieldValue::Date(d)),
                None => NormalizedCell::Unparseable,
            },
        },
        RawCell::Number(n) => match kind {
            FieldKind::Text => NormalizedCell::Value(FieldValue::Text(cell.display())),
            FieldKind::Priority => match normalize_priority(&cell.display()) {
                Some(p) => NormalizedCell::Value(FieldValue::Priority(p)),
                None => NormalizedCell::Unparseable,
            },
            FieldKind::Cost => match BigDecimal::try_from(*n) {
                Ok(c) => NormalizedCell::Value(FieldValue::Cost(c)),
                Err(_) => NormalizedCell::Unparseable,
            },
            FieldKind::Date => match excel_serial_date(*n) {
                Some(d) => NormalizedCell::Value(FieldValue::Date(d)),
                None => NormalizedCell::Unparseable,
            },
        },
    }
}

/// Trim and collapse internal whitespace; empty becomes null.
pub fn normalize_text(raw: &str) -> Option<String> {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed)
    }
}

/// Normalize priority words and the abbreviations legacy sheets use.
pub fn normalize_priority(raw: &str) -> Option<Priority> {
    let s = raw.trim().to_lowercase();
    match s.as_str() {
        "high" | "h" | "1" | "p1" | "critical" | "urgent" => return Some(Priority::High),
        "medium" | "med" | "m" | "2" | "p2" | "moderate" | "normal" => {
            return Some(Priority::Medium)
        }
        "low" | "l" | "3" | "p3" | "minor" | "routine" => return Some(Priority::Low),
        _ => {}
    }

    // Keyword fallback for free-form values like "HIGH - safety critical"
    if ["high", "critical", "urgent", "emergency"]
        .iter()
        .any(|k| s.contains(k))
    {
        return Some(Priority::High);
    }
    if ["medium", "moderate", "normal"].iter().any(|k| s.contains(k)) {
        return Some(Priority::Medium);
    }
    if ["low", "minor", "routine"].iter().any(|k| s.contains(k)) {
        return Some(Priority::Low);
    }
    None
}

/// Strip currency symbols and thousands separators, parse as decimal.
/// No clamping here: magnitude checks belong to the anomaly detector.
pub fn normalize_cost(raw: &str) -> Option<BigDecimal> {
    let cleaned = NON_NUMERIC.replace_all(raw.trim(), "");
    if cleaned.is_empty() {
        return None;
    }
    BigDecimal::from_str(&cleaned).ok()
}

/// Parse a date string against the fixed format list, falling back to an
/// Excel serial when the cell is a bare digit string in a plausible window.
pub fn normalize_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, format) {
            return Some(date);
        }
    }
    if s.chars().all(|c| c.is_ascii_digit()) {
        if let Ok(serial) = s.parse::<i64>() {
            if (SERIAL_STRING_MIN..=SERIAL_STRING_MAX).contains(&serial) {
                return excel_serial_date(serial as f64);
            }
        }
    }
    None
}

/// Days since 1899-12-30, the convention Excel serials use.
fn excel_serial_date(serial: f64) -> Option<NaiveDate> {
    if !(1.0..=SERIAL_MAX).contains(&serial) {
        return None;
    }
    NaiveDate::from_ymd_opt(1899, 12, 30)
        .and_then(|epoch| epoch.checked_add_signed(Duration::days(serial.trunc() as i64)))
}

static BLANK: RawCell = RawCell::Blank;

/// Per-field confidence contributions for one row under the document
/// mapping: an unmapped field contributes 0, a mapped field contributes its
/// mapping score unless its cell held content that failed to parse.
pub fn confidence_terms(row: &RawRow, mapping: &ColumnMapping) -> Vec<(CanonicalField, f64)> {
    CanonicalField::ALL
        .iter()
        .map(|&field| {
            let term = match mapping.get(field) {
                None => 0.0,
                Some(matched) => {
                    let cell = row.get(matched.column).unwrap_or(&BLANK);
                    match normalize_cell(field.kind(), cell) {
                        NormalizedCell::Unparseable => 0.0,
                        _ => matched.score,
                    }
                }
            };
            (field, term)
        })
        .collect()
}

/// Mean of the per-field terms across all canonical fields.
pub fn confidence_score(row: &RawRow, mapping: &ColumnMapping) -> f64 {
    let terms = confidence_terms(row, mapping);
    if terms.is_empty() {
        return 0.0;
    }
    terms.iter().map(|(_, t)| t).sum::<f64>() / terms.len() as f64
}
