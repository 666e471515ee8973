//! Field coercion
//!
//! Locale-aware parsing of numbers and dates as they appear on Korean golf
//! sites: `1,500,000원`, `15억원`, `2024.06.06 ~ 06.09`, `2024년 6월 6일`.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use regex::Regex;
use std::sync::LazyLock;

/// Plain number with optional 3-digit grouping and fraction
static GROUPED_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?(?:\d{1,3}(?:,\d{3})+|\d+)(?:\.\d+)?$").expect("Invalid number regex")
});

/// Spaces around date separators (`2024. 6. 6.`)
static DATE_SEPARATOR_SPACES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*([./-])\s*").expect("Invalid date regex"));

/// Decorations stripped before numeric parsing
const NUMBER_DECORATIONS: &[&str] = &["KRW", "USD", "₩", "$", "원", "달러", "홀", "위", "명"];

const EOK: f64 = 100_000_000.0;
const MAN: f64 = 10_000.0;

/// Parse an integer field
///
/// Returns `None` when the text is not a well-formed number, e.g. `36,0`
/// (thousands separator in the wrong place) or free text.
pub fn parse_number(text: &str) -> Option<i64> {
    let mut cleaned: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    for decoration in NUMBER_DECORATIONS {
        cleaned = cleaned.replace(decoration, "");
    }

    // Tied rankings: T3
    if let Some(rest) = cleaned.strip_prefix(['T', 't']) {
        if rest.chars().next().is_some_and(|c| c.is_ascii_digit()) {
            cleaned = rest.to_string();
        }
    }

    if cleaned.is_empty() {
        return None;
    }

    if cleaned.contains('억') || cleaned.contains('만') {
        return parse_korean_units(&cleaned);
    }

    parse_grouped(&cleaned).map(|n| n.round() as i64)
}

/// Parse a number that must follow the grouping rules
fn parse_grouped(text: &str) -> Option<f64> {
    if !GROUPED_NUMBER.is_match(text) {
        return None;
    }
    text.replace(',', "").parse::<f64>().ok()
}

/// Expand `억` (10^8) and `만` (10^4) units: `10억5,000만` → 1_050_000_000
fn parse_korean_units(text: &str) -> Option<i64> {
    let mut total = 0.0;
    let mut rest = text;

    if let Some((eok, tail)) = rest.split_once('억') {
        total += parse_grouped(eok)? * EOK;
        rest = tail;
    }
    if let Some((man, tail)) = rest.split_once('만') {
        total += parse_grouped(man)? * MAN;
        rest = tail;
    }
    if !rest.is_empty() {
        total += parse_grouped(rest)?;
    }

    Some(total.round() as i64)
}

/// Parse a calendar date
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.date_naive());
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(dt.date());
        }
    }

    // Weekday suffixes such as "2024.06.06(목)"
    let without_weekday = match trimmed.find('(') {
        Some(pos) => trimmed[..pos].trim(),
        None => trimmed,
    };

    let compact = DATE_SEPARATOR_SPACES
        .replace_all(without_weekday, "$1")
        .replace(' ', "");
    let compact = compact.trim_end_matches('.');

    if compact.len() == 8 && compact.chars().all(|c| c.is_ascii_digit()) {
        let year = compact[..4].parse().ok()?;
        let month = compact[4..6].parse().ok()?;
        let day = compact[6..].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    for format in ["%Y-%m-%d", "%Y.%m.%d", "%Y/%m/%d", "%Y년%m월%d일"] {
        if let Ok(date) = NaiveDate::parse_from_str(compact, format) {
            return Some(date);
        }
    }

    None
}

/// Parse a date or a date range (`start ~ end`)
///
/// The end may omit the year (`2024.06.06 ~ 06.09`); it then inherits the
/// start's year. An unparsable end is reported as `None` rather than failing.
pub fn parse_date_range(text: &str) -> Option<(NaiveDate, Option<NaiveDate>)> {
    let Some((start, end)) = split_range(text) else {
        return parse_date(text).map(|d| (d, None));
    };

    let start = parse_date(start)?;
    let end = parse_date(end).or_else(|| {
        let end = end.trim().trim_end_matches('.');
        let sep = if end.contains('-') {
            "-"
        } else if end.contains('/') {
            "/"
        } else {
            "."
        };
        parse_date(&format!("{}{sep}{end}", start.year()))
    });

    Some((start, end))
}

fn split_range(text: &str) -> Option<(&str, &str)> {
    for sep in ['~', '～', '–'] {
        if let Some(parts) = text.split_once(sep) {
            return Some(parts);
        }
    }
    text.split_once(" - ")
}
