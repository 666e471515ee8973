//! Validation rule and result types

use crate::types::DataType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// Rules
// ============================================================================

/// Inclusive numeric bounds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<i64>,
}

impl RangeRule {
    /// Range with both bounds
    pub fn between(min: i64, max: i64) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
        }
    }

    /// Range with a lower bound only
    pub fn at_least(min: i64) -> Self {
        Self {
            min: Some(min),
            max: None,
        }
    }
}

/// Rules for one data type
///
/// Field names are snake_case record fields; camelCase spellings from the
/// snapshot format are accepted too.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleSet {
    /// Fields that must be non-empty
    pub required: Vec<String>,
    /// Numeric bounds per field
    pub ranges: BTreeMap<String, RangeRule>,
    /// Allowed values per field
    pub enums: BTreeMap<String, Vec<String>>,
}

impl RuleSet {
    /// Add a required field
    #[must_use]
    pub fn require(mut self, field: &str) -> Self {
        self.required.push(field.to_string());
        self
    }

    /// Add a numeric range
    #[must_use]
    pub fn range(mut self, field: &str, rule: RangeRule) -> Self {
        self.ranges.insert(field.to_string(), rule);
        self
    }

    /// Add an allowed-value list
    #[must_use]
    pub fn one_of(mut self, field: &str, values: &[&str]) -> Self {
        self.enums.insert(
            field.to_string(),
            values.iter().map(ToString::to_string).collect(),
        );
        self
    }

    /// Default rules for tournaments
    pub fn tournaments() -> Self {
        Self::default()
            .require("name")
            .require("start_date")
            .range("prize_money", RangeRule::at_least(0))
    }

    /// Default rules for golf courses
    pub fn golf_courses() -> Self {
        Self::default()
            .require("name")
            .require("region")
            .range("holes", RangeRule::between(1, 36))
            .one_of("course_type", &["회원제", "대중제"])
    }

    /// Default rules for players
    pub fn players() -> Self {
        Self::default()
            .require("member_id")
            .require("association")
            .require("name")
            .range("prize_money", RangeRule::at_least(0))
            .one_of("association", &["KPGA", "KLPGA"])
    }

    /// Whether the set contains no rule at all
    pub fn is_empty(&self) -> bool {
        self.required.is_empty() && self.ranges.is_empty() && self.enums.is_empty()
    }
}

/// Rule sets for every data type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationRules {
    pub tournaments: RuleSet,
    pub golf_courses: RuleSet,
    pub players: RuleSet,
}

impl Default for ValidationRules {
    fn default() -> Self {
        Self {
            tournaments: RuleSet::tournaments(),
            golf_courses: RuleSet::golf_courses(),
            players: RuleSet::players(),
        }
    }
}

impl ValidationRules {
    /// Rule set for a data type
    pub fn for_type(&self, data_type: DataType) -> &RuleSet {
        match data_type {
            DataType::Tournaments => &self.tournaments,
            DataType::GolfCourses => &self.golf_courses,
            DataType::Players => &self.players,
        }
    }
}

// ============================================================================
// Results
// ============================================================================

/// A single failed rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub field: String,
    pub reason: String,
}

impl Violation {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// A record that failed at least one rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rejected<T> {
    pub record: T,
    pub violations: Vec<Violation>,
}

/// Records partitioned by validation outcome
#[derive(Debug, Clone, PartialEq)]
pub struct Validated<T> {
    pub valid: Vec<T>,
    pub rejected: Vec<Rejected<T>>,
}

impl<T> Default for Validated<T> {
    fn default() -> Self {
        Self {
            valid: Vec::new(),
            rejected: Vec::new(),
        }
    }
}

impl<T> Validated<T> {
    /// Number of records checked
    pub fn total(&self) -> usize {
        self.valid.len() + self.rejected.len()
    }
}
