//! Validation stage
//!
//! Checks records against a config-driven [`RuleSet`] and partitions them
//! into valid and rejected. Every rule is evaluated, so a rejected record
//! lists all of its violations. Records pass through unchanged.
//!
//! Numeric `0` reads as "not provided": it fails a `required` rule but is
//! skipped by range rules, the same way an empty text is skipped by enum
//! rules.

mod types;

pub use types::{RangeRule, Rejected, RuleSet, Validated, ValidationRules, Violation};

use crate::config::config_key;
use crate::error::{Error, Result};
use crate::record::{canonical_field_name, fields_of, DomainRecord};
use crate::types::DataType;
use tracing::debug;

/// Partition records into valid and rejected
pub fn validate<T: DomainRecord>(records: Vec<T>, rules: &RuleSet) -> Validated<T> {
    let mut out = Validated::default();

    for record in records {
        let violations = rules.check(&record);
        if violations.is_empty() {
            out.valid.push(record);
        } else {
            out.rejected.push(Rejected { record, violations });
        }
    }

    debug!(
        data_type = %T::DATA_TYPE,
        valid = out.valid.len(),
        rejected = out.rejected.len(),
        "Validated records"
    );
    out
}

impl RuleSet {
    /// All violations of a single record
    pub fn check<T: DomainRecord>(&self, record: &T) -> Vec<Violation> {
        let mut violations = Vec::new();

        for name in &self.required {
            let field = canonical_field_name(name);
            if record.field(&field).is_unset() {
                violations.push(Violation::new(field, "is required"));
            }
        }

        for (name, range) in &self.ranges {
            let field = canonical_field_name(name);
            let value = record.field(&field);
            if value.is_unset() {
                continue;
            }
            let Some(number) = value.as_number() else {
                violations.push(Violation::new(field, format!("'{value}' is not numeric")));
                continue;
            };
            if let Some(min) = range.min.filter(|min| number < *min) {
                violations.push(Violation::new(
                    field.clone(),
                    format!("{number} is below minimum {min}"),
                ));
            }
            if let Some(max) = range.max.filter(|max| number > *max) {
                violations.push(Violation::new(
                    field,
                    format!("{number} is above maximum {max}"),
                ));
            }
        }

        for (name, allowed) in &self.enums {
            let field = canonical_field_name(name);
            let value = record.field(&field);
            if value.is_empty() {
                continue;
            }
            let text = value.to_string();
            if !allowed.iter().any(|a| a.trim() == text) {
                violations.push(Violation::new(
                    field,
                    format!("'{text}' is not one of [{}]", allowed.join(", ")),
                ));
            }
        }

        violations
    }

    /// Reject rules naming unknown fields or inverted ranges
    pub fn check_fields(&self, data_type: DataType) -> Result<()> {
        let known = fields_of(data_type);
        let names = self
            .required
            .iter()
            .chain(self.ranges.keys())
            .chain(self.enums.keys());

        for name in names {
            let field = canonical_field_name(name);
            if !known.contains(&field.as_str()) {
                return Err(Error::invalid_value(
                    format!("validation.{}", config_key(data_type)),
                    format!("unknown field '{name}'"),
                ));
            }
        }

        for (name, range) in &self.ranges {
            if let (Some(min), Some(max)) = (range.min, range.max) {
                if min > max {
                    return Err(Error::invalid_value(
                        format!("validation.{}.ranges.{name}", config_key(data_type)),
                        format!("min {min} is greater than max {max}"),
                    ));
                }
            }
        }

        Ok(())
    }
}

impl ValidationRules {
    /// Check every rule set against its record type
    pub fn check_fields(&self) -> Result<()> {
        for data_type in DataType::ALL {
            self.for_type(data_type).check_fields(data_type)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests;
