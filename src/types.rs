//! Common types used throughout fairway-etl
//!
//! This module contains shared type definitions, type aliases,
//! and utility types used across multiple modules.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Type Aliases
// ============================================================================

/// JSON value type (re-exported from serde_json)
pub type JsonValue = serde_json::Value;

/// JSON object type
pub type JsonObject = serde_json::Map<String, JsonValue>;

// ============================================================================
// Data Type
// ============================================================================

/// The kinds of records the pipeline ingests
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DataType {
    /// Tournament schedules and results
    Tournaments,
    /// Golf course registry entries
    GolfCourses,
    /// Tour players
    Players,
}

impl DataType {
    /// All data types, in processing order
    pub const ALL: [DataType; 3] = [
        DataType::Tournaments,
        DataType::GolfCourses,
        DataType::Players,
    ];

    /// Name used in config files and the snapshot
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Tournaments => "tournaments",
            DataType::GolfCourses => "golfCourses",
            DataType::Players => "players",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['-', '_'], "").as_str() {
            "tournaments" | "tournament" => Ok(DataType::Tournaments),
            "golfcourses" | "golfcourse" | "courses" => Ok(DataType::GolfCourses),
            "players" | "player" => Ok(DataType::Players),
            _ => Err(crate::error::Error::UnknownDataType {
                name: s.to_string(),
            }),
        }
    }
}

// ============================================================================
// Raw Records
// ============================================================================

/// Payload returned by a source before extraction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum RawPayload {
    /// An HTML page or fragment
    Html(String),
    /// A pre-structured row (e.g. a CSV line keyed by header)
    Row(JsonObject),
    /// A JSON document: an object is one row, an array is many
    Json(JsonValue),
    /// A row the decoder could not parse, with the reason
    Malformed(String),
}

/// A record as fetched from a source, tagged with provenance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    /// Source that produced the record
    pub source_id: String,
    /// When the record was fetched
    pub fetched_at: DateTime<Utc>,
    /// The payload itself
    pub payload: RawPayload,
}

impl RawRecord {
    /// Create a raw record fetched now
    pub fn new(source_id: impl Into<String>, payload: RawPayload) -> Self {
        Self {
            source_id: source_id.into(),
            fetched_at: Utc::now(),
            payload,
        }
    }

    /// Create a raw record with an explicit fetch time
    #[must_use]
    pub fn fetched_at(mut self, at: DateTime<Utc>) -> Self {
        self.fetched_at = at;
        self
    }

    /// Create a row record from a JSON object
    pub fn row(source_id: impl Into<String>, row: JsonObject) -> Self {
        Self::new(source_id, RawPayload::Row(row))
    }

    /// Create an HTML record
    pub fn html(source_id: impl Into<String>, html: impl Into<String>) -> Self {
        Self::new(source_id, RawPayload::Html(html.into()))
    }

    /// Create a placeholder for a row that failed to decode
    pub fn malformed(source_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(source_id, RawPayload::Malformed(reason.into()))
    }
}

// ============================================================================
// Stages and Issues
// ============================================================================

/// Pipeline stage that produced an issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Config,
    Fetch,
    Normalize,
    Merge,
    Validate,
    Quality,
    Export,
    Controller,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Config => "config",
            Stage::Fetch => "fetch",
            Stage::Normalize => "normalize",
            Stage::Merge => "merge",
            Stage::Validate => "validate",
            Stage::Quality => "quality",
            Stage::Export => "export",
            Stage::Controller => "controller",
        };
        f.write_str(name)
    }
}

/// A warning or error recorded during a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    /// Data type the issue belongs to (None for run-level issues)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<DataType>,
    /// Stage that raised it
    pub stage: Stage,
    /// Source involved, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Human-readable message
    pub message: String,
}

impl Issue {
    /// Create a new issue
    pub fn new(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            data_type: None,
            stage,
            source: None,
            message: message.into(),
        }
    }

    /// Attach a data type
    #[must_use]
    pub fn for_type(mut self, data_type: DataType) -> Self {
        self.data_type = Some(data_type);
        self
    }

    /// Attach a source id
    #[must_use]
    pub fn from_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}", self.stage)?;
        if let Some(data_type) = self.data_type {
            write!(f, "/{data_type}")?;
        }
        if let Some(source) = &self.source {
            write!(f, "/{source}")?;
        }
        write!(f, "] {}", self.message)
    }
}

// ============================================================================
// Utilities
// ============================================================================

/// Extension trait for Option<String> to handle blank strings
pub trait OptionStringExt {
    /// Returns None if the string is empty after trimming, else the trimmed string
    fn none_if_blank(self) -> Option<String>;
}

impl OptionStringExt for Option<String> {
    fn none_if_blank(self) -> Option<String> {
        self.and_then(OptionStringExt::none_if_blank)
    }
}

impl OptionStringExt for String {
    fn none_if_blank(self) -> Option<String> {
        let trimmed = self.trim();
        if trimmed.is_empty() {
            None
        } else if trimmed.len() == self.len() {
            Some(self)
        } else {
            Some(trimmed.to_string())
        }
    }
}
