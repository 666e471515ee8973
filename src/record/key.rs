//! Logical keys and field values
//!
//! A logical key identifies "the same real-world entity" across sources and
//! runs. Comparison uses the trimmed, case-folded form; the display form keeps
//! whatever casing the record carried.

use crate::types::DataType;
use chrono::NaiveDate;
use sha2::{Digest, Sha256};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Separator between key parts in the normalized form
const KEY_SEPARATOR: char = '\u{1f}';

/// Normalized identifying tuple of a record
#[derive(Debug, Clone)]
pub struct LogicalKey {
    display: String,
    normalized: String,
    complete: bool,
}

impl LogicalKey {
    /// Build a key from its parts
    pub fn new(parts: &[&str]) -> Self {
        let trimmed: Vec<&str> = parts.iter().map(|p| p.trim()).collect();
        let complete = !trimmed.is_empty() && trimmed.iter().all(|p| !p.is_empty());
        let normalized = trimmed
            .iter()
            .map(|p| fold(p))
            .collect::<Vec<_>>()
            .join(&KEY_SEPARATOR.to_string());

        Self {
            display: trimmed.join(" | "),
            normalized,
            complete,
        }
    }

    /// Whether every part of the key is non-empty
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// The comparison form
    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    /// Stable identifier derived from the key
    ///
    /// Two records with equal keys always get the same id.
    pub fn fingerprint(&self, data_type: DataType) -> String {
        let mut hasher = Sha256::new();
        hasher.update(data_type.as_str().as_bytes());
        hasher.update([KEY_SEPARATOR as u8]);
        hasher.update(self.normalized.as_bytes());
        let digest = hex::encode(hasher.finalize());

        let prefix = match data_type {
            DataType::Tournaments => "trn",
            DataType::GolfCourses => "crs",
            DataType::Players => "ply",
        };
        format!("{prefix}-{}", &digest[..16])
    }
}

/// Case-fold and collapse inner whitespace
fn fold(part: &str) -> String {
    part.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

impl PartialEq for LogicalKey {
    fn eq(&self, other: &Self) -> bool {
        self.normalized == other.normalized
    }
}

impl Eq for LogicalKey {}

impl Hash for LogicalKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.normalized.hash(state);
    }
}

impl PartialOrd for LogicalKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for LogicalKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.normalized.cmp(&other.normalized)
    }
}

impl fmt::Display for LogicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display)
    }
}

/// Dynamically typed view of a record field
///
/// Validation rules and quality checks address fields by name through this.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Field is absent or blank
    Empty,
    /// Text field
    Text(String),
    /// Integer field
    Number(i64),
    /// Calendar date field
    Date(NaiveDate),
}

impl FieldValue {
    /// Text value, `Empty` when blank
    pub fn text(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v) if !v.is_empty() => FieldValue::Text(v.to_string()),
            _ => FieldValue::Empty,
        }
    }

    /// Date value, `Empty` when absent
    pub fn date(value: Option<NaiveDate>) -> Self {
        value.map_or(FieldValue::Empty, FieldValue::Date)
    }

    /// Whether the field is absent or blank
    pub fn is_empty(&self) -> bool {
        matches!(self, FieldValue::Empty)
    }

    /// Whether the field would be overwritten by a merge
    ///
    /// Zero counts as unset for numbers: unparsable numbers normalize to zero.
    pub fn is_unset(&self) -> bool {
        matches!(self, FieldValue::Empty | FieldValue::Number(0))
    }

    /// Numeric value, if this is a number
    pub fn as_number(&self) -> Option<i64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Empty => Ok(()),
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Number(n) => write!(f, "{n}"),
            FieldValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}
