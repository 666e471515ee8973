//! Decoder types and traits
//!
//! Defines the core decoder abstractions.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Format of a fetched body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecoderFormat {
    /// JSON format (default)
    #[default]
    Json,
    /// JSON Lines format (one JSON object per line)
    Jsonl,
    /// CSV format
    Csv,
    /// HTML page, decoded during extraction
    Html,
}

/// Selectors used to pull rows out of an HTML page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HtmlSelectors {
    /// Selector for table rows
    pub row: String,
    /// Selector for cells within a row
    pub cell: String,
    /// Selector for record containers whose children carry the field attribute
    pub item: Option<String>,
    /// Attribute naming the field an element holds
    pub field_attribute: String,
}

impl Default for HtmlSelectors {
    fn default() -> Self {
        Self {
            row: "table tr".to_string(),
            cell: "th, td".to_string(),
            item: None,
            field_attribute: "data-field".to_string(),
        }
    }
}

/// Configuration for decoding bodies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// Body format
    pub format: DecoderFormat,
    /// Dot path to the record array (for JSON)
    pub record_path: Option<String>,
    /// CSV delimiter (default: comma)
    pub csv_delimiter: char,
    /// Whether CSV has a header row
    pub csv_has_header: bool,
    /// HTML selectors
    pub html: HtmlSelectors,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            format: DecoderFormat::Json,
            record_path: None,
            csv_delimiter: ',',
            csv_has_header: true,
            html: HtmlSelectors::default(),
        }
    }
}

impl DecoderConfig {
    /// Create a JSON decoder config
    pub fn json() -> Self {
        Self::default()
    }

    /// Create a JSON decoder config with a record path
    pub fn json_with_path(path: impl Into<String>) -> Self {
        Self {
            record_path: Some(path.into()),
            ..Self::default()
        }
    }

    /// Create a JSONL decoder config
    pub fn jsonl() -> Self {
        Self {
            format: DecoderFormat::Jsonl,
            ..Self::default()
        }
    }

    /// Create a CSV decoder config
    pub fn csv() -> Self {
        Self {
            format: DecoderFormat::Csv,
            ..Self::default()
        }
    }

    /// Create a CSV decoder config with custom delimiter
    pub fn csv_with_delimiter(delimiter: char, has_header: bool) -> Self {
        Self {
            format: DecoderFormat::Csv,
            csv_delimiter: delimiter,
            csv_has_header: has_header,
            ..Self::default()
        }
    }

    /// Create an HTML decoder config
    pub fn html() -> Self {
        Self {
            format: DecoderFormat::Html,
            ..Self::default()
        }
    }

    /// Set the record path
    #[must_use]
    pub fn with_record_path(mut self, path: impl Into<String>) -> Self {
        self.record_path = Some(path.into());
        self
    }
}

/// One decoded row, or the reason it could not be parsed
pub type DecodedRow = std::result::Result<Value, String>;

/// Trait for decoding bodies into records
pub trait RecordDecoder: Send + Sync {
    /// Decode the body into a list of records
    ///
    /// Fails on the first row that cannot be parsed.
    fn decode(&self, body: &str) -> Result<Vec<Value>>;

    /// Decode the body row by row, keeping rows that fail to parse
    ///
    /// Only a body that cannot be read at all (a broken header, invalid JSON
    /// document) is an error. Line-oriented formats override this.
    fn decode_rows(&self, body: &str) -> Result<Vec<DecodedRow>> {
        Ok(self.decode(body)?.into_iter().map(Ok).collect())
    }
}
