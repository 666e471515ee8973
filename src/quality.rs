//! Data quality checks
//!
//! Evaluated per data type on the output of validation. A breached threshold
//! is reported as a warning; with `enforce` set it fails the data type
//! instead, so a bad crawl cannot overwrite a good snapshot.

use crate::error::{Error, Result};
use crate::record::DomainRecord;
use crate::types::{DataType, Issue, Stage};
use crate::validate::Validated;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Fields left out of completeness figures
const SKIPPED_FIELDS: &[&str] = &["id", "source", "last_updated"];

/// Thresholds applied to each data type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityThresholds {
    /// Minimum share of records passing validation (0.0 - 1.0)
    pub min_valid_ratio: f64,
    /// Maximum share of valid records with an unclassified region
    pub max_unclassified_ratio: Option<f64>,
    /// Minimum number of valid records
    pub min_records: usize,
    /// Fail the data type on a breach instead of warning
    pub enforce: bool,
}

impl Default for QualityThresholds {
    fn default() -> Self {
        Self {
            min_valid_ratio: 0.0,
            max_unclassified_ratio: None,
            min_records: 0,
            enforce: false,
        }
    }
}

impl QualityThresholds {
    /// Reject ratios outside 0..=1
    pub fn check(&self) -> Result<()> {
        let ratios = [
            ("quality.min_valid_ratio", Some(self.min_valid_ratio)),
            ("quality.max_unclassified_ratio", self.max_unclassified_ratio),
        ];
        for (field, ratio) in ratios {
            if let Some(ratio) = ratio {
                if !(0.0..=1.0).contains(&ratio) {
                    return Err(Error::invalid_value(
                        field,
                        format!("{ratio} is not between 0 and 1"),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Quality figures for one data type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub data_type: DataType,
    /// Records checked by validation
    pub total: usize,
    /// Records that passed validation
    pub valid: usize,
    pub valid_ratio: f64,
    /// Share of valid records tagged with the unclassified region
    pub unclassified_ratio: f64,
    /// Share of valid records with a value, per field
    pub completeness: BTreeMap<String, f64>,
    /// Thresholds that were not met
    pub breaches: Vec<String>,
    /// Whether breaches fail the data type
    pub enforced: bool,
}

impl QualityReport {
    /// Whether the data type may proceed to export
    pub fn passed(&self) -> bool {
        !self.enforced || self.breaches.is_empty()
    }

    /// Breaches as run issues
    pub fn issues(&self) -> Vec<Issue> {
        self.breaches
            .iter()
            .map(|b| Issue::new(Stage::Quality, b.clone()).for_type(self.data_type))
            .collect()
    }
}

/// Compute quality figures and compare them to thresholds
pub fn evaluate<T: DomainRecord>(
    validated: &Validated<T>,
    thresholds: &QualityThresholds,
) -> QualityReport {
    let total = validated.total();
    let valid = validated.valid.len();
    let valid_ratio = ratio(valid, total);
    let unclassified = validated.valid.iter().filter(|r| r.is_unclassified()).count();
    let unclassified_ratio = if valid == 0 {
        0.0
    } else {
        ratio(unclassified, valid)
    };

    let completeness = T::FIELDS
        .iter()
        .filter(|f| !SKIPPED_FIELDS.contains(f))
        .map(|field| {
            let filled = validated
                .valid
                .iter()
                .filter(|r| !r.field(field).is_unset())
                .count();
            ((*field).to_string(), ratio(filled, valid))
        })
        .collect();

    let mut breaches = Vec::new();
    if valid_ratio < thresholds.min_valid_ratio {
        breaches.push(format!(
            "valid ratio {valid_ratio:.2} is below {:.2}",
            thresholds.min_valid_ratio
        ));
    }
    if let Some(max) = thresholds.max_unclassified_ratio {
        if unclassified_ratio > max {
            breaches.push(format!(
                "unclassified region ratio {unclassified_ratio:.2} is above {max:.2}"
            ));
        }
    }
    if valid < thresholds.min_records {
        breaches.push(format!(
            "{valid} valid records, at least {} expected",
            thresholds.min_records
        ));
    }

    QualityReport {
        data_type: T::DATA_TYPE,
        total,
        valid,
        valid_ratio,
        unclassified_ratio,
        completeness,
        breaches,
        enforced: thresholds.enforce,
    }
}

/// `part / whole`, 1.0 for an empty whole
fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        1.0
    } else {
        part as f64 / whole as f64
    }
}
