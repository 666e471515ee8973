//! Decoder implementations
//!
//! Each decoder handles a specific body format.

use super::types::{DecodedRow, DecoderConfig, DecoderFormat, HtmlSelectors, RecordDecoder};
use crate::error::{Error, Result};
use scraper::{ElementRef, Html, Selector};
use serde_json::{Map, Value};

/// Build the decoder for a config
pub fn decoder_for(config: &DecoderConfig) -> Result<Box<dyn RecordDecoder>> {
    Ok(match config.format {
        DecoderFormat::Json => match &config.record_path {
            Some(path) => Box::new(JsonDecoder::with_path(path)),
            None => Box::new(JsonDecoder::new()),
        },
        DecoderFormat::Jsonl => Box::new(JsonlDecoder::new()),
        DecoderFormat::Csv => Box::new(CsvDecoder::with_options(
            config.csv_delimiter,
            config.csv_has_header,
        )),
        DecoderFormat::Html => Box::new(HtmlDecoder::new(&config.html)?),
    })
}

// ============================================================================
// JSON Decoder
// ============================================================================

/// JSON decoder with optional record path extraction
#[derive(Debug, Clone, Default)]
pub struct JsonDecoder {
    /// Dot path to extract records
    record_path: Option<String>,
}

impl JsonDecoder {
    /// Create a new JSON decoder
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a JSON decoder with a record path
    pub fn with_path(path: impl Into<String>) -> Self {
        Self {
            record_path: Some(path.into()),
        }
    }

    /// Extract records from a JSON value using the path
    fn extract_records(&self, value: &Value) -> Vec<Value> {
        let target = match &self.record_path {
            Some(path) => match extract_simple_path(value, path) {
                Some(v) => v,
                None => return Vec::new(),
            },
            None => value,
        };

        match target {
            Value::Array(arr) => arr.clone(),
            Value::Null => Vec::new(),
            v => vec![v.clone()],
        }
    }
}

impl RecordDecoder for JsonDecoder {
    fn decode(&self, body: &str) -> Result<Vec<Value>> {
        let value: Value = serde_json::from_str(body).map_err(|e| Error::Decode {
            message: format!("Failed to parse JSON: {e}"),
        })?;
        Ok(self.extract_records(&value))
    }
}

/// Follow a dot path such as `data.items` or `$.results`
fn extract_simple_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let path = path.strip_prefix("$.").unwrap_or(path);
    if path.is_empty() || path == "$" {
        return Some(value);
    }

    let mut current = value;
    for part in path.split('.') {
        current = match (current, part.parse::<usize>()) {
            (Value::Array(arr), Ok(index)) => arr.get(index)?,
            _ => current.get(part)?,
        };
    }
    Some(current)
}

// ============================================================================
// JSONL Decoder
// ============================================================================

/// JSON Lines decoder (one JSON object per line)
#[derive(Debug, Clone, Default)]
pub struct JsonlDecoder;

impl JsonlDecoder {
    /// Create a new JSONL decoder
    pub fn new() -> Self {
        Self
    }
}

impl RecordDecoder for JsonlDecoder {
    fn decode(&self, body: &str) -> Result<Vec<Value>> {
        self.decode_rows(body)?
            .into_iter()
            .map(|row| row.map_err(|message| Error::Decode { message }))
            .collect()
    }

    fn decode_rows(&self, body: &str) -> Result<Vec<DecodedRow>> {
        let mut records = Vec::new();

        for (line_num, line) in body.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            records.push(
                serde_json::from_str::<Value>(line)
                    .map_err(|e| format!("Failed to parse JSONL at line {}: {e}", line_num + 1)),
            );
        }

        Ok(records)
    }
}

// ============================================================================
// CSV Decoder
// ============================================================================

/// CSV decoder with configurable delimiter and header handling
///
/// Cells stay strings; typing happens during normalization so that numbers
/// like `1,200` keep their separators until the locale-aware parser sees them.
#[derive(Debug, Clone)]
pub struct CsvDecoder {
    /// Field delimiter
    delimiter: char,
    /// Whether the first row is a header
    has_header: bool,
}

impl Default for CsvDecoder {
    fn default() -> Self {
        Self {
            delimiter: ',',
            has_header: true,
        }
    }
}

impl CsvDecoder {
    /// Create a new CSV decoder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a CSV decoder with custom settings
    pub fn with_options(delimiter: char, has_header: bool) -> Self {
        Self {
            delimiter,
            has_header,
        }
    }
}

impl RecordDecoder for CsvDecoder {
    fn decode(&self, body: &str) -> Result<Vec<Value>> {
        self.decode_rows(body)?
            .into_iter()
            .map(|row| row.map_err(|message| Error::CsvParse { message }))
            .collect()
    }

    fn decode_rows(&self, body: &str) -> Result<Vec<DecodedRow>> {
        let body = body.strip_prefix('\u{feff}').unwrap_or(body);
        let mut records = Vec::new();
        let mut lines = body.lines().filter(|l| !l.trim().is_empty()).peekable();

        let headers: Vec<String> = if self.has_header {
            match lines.next() {
                Some(header_line) => parse_csv_line(header_line, self.delimiter)?,
                None => return Ok(records),
            }
        } else if let Some(first_line) = lines.peek() {
            let field_count = parse_csv_line(first_line, self.delimiter)?.len();
            (0..field_count).map(|i| format!("column_{i}")).collect()
        } else {
            return Ok(records);
        };

        for line in lines {
            let fields = match parse_csv_line(line, self.delimiter) {
                Ok(fields) => fields,
                Err(Error::CsvParse { message }) => {
                    records.push(Err(message));
                    continue;
                }
                Err(e) => return Err(e),
            };
            let mut obj = Map::new();

            for (i, header) in headers.iter().enumerate() {
                let value = fields.get(i).cloned().unwrap_or_default();
                let json_value = if value.is_empty() {
                    Value::Null
                } else {
                    Value::String(value)
                };
                obj.insert(header.clone(), json_value);
            }

            records.push(Ok(Value::Object(obj)));
        }

        Ok(records)
    }
}

/// Parse a CSV line into fields
fn parse_csv_line(line: &str, delimiter: char) -> Result<Vec<String>> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '"' {
            if in_quotes {
                // Escaped quote
                if chars.peek() == Some(&'"') {
                    current.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            } else {
                in_quotes = true;
            }
        } else if c == delimiter && !in_quotes {
            fields.push(current.trim().to_string());
            current = String::new();
        } else {
            current.push(c);
        }
    }

    if in_quotes {
        return Err(Error::CsvParse {
            message: format!("Unterminated quoted field in line: {line}"),
        });
    }

    fields.push(current.trim().to_string());
    Ok(fields)
}

// ============================================================================
// HTML Decoder
// ============================================================================

/// HTML decoder producing one object per table row or per item element
///
/// Table mode uses the first row of `th` cells as headers. Item mode reads
/// every descendant that carries the field attribute.
#[derive(Debug, Clone)]
pub struct HtmlDecoder {
    row: Selector,
    cell: Selector,
    header_cell: Selector,
    item: Option<Selector>,
    field_attribute: String,
    field_selector: Selector,
}

impl HtmlDecoder {
    /// Create an HTML decoder from selectors
    pub fn new(selectors: &HtmlSelectors) -> Result<Self> {
        let field_attribute = selectors.field_attribute.clone();
        Ok(Self {
            row: parse_selector(&selectors.row)?,
            cell: parse_selector(&selectors.cell)?,
            header_cell: parse_selector("th")?,
            item: selectors.item.as_deref().map(parse_selector).transpose()?,
            field_selector: parse_selector(&format!("[{field_attribute}]"))?,
            field_attribute,
        })
    }

    fn decode_items(&self, document: &Html, item: &Selector) -> Vec<Value> {
        document
            .select(item)
            .filter_map(|element| {
                let mut obj = Map::new();
                for field in element.select(&self.field_selector) {
                    if let Some(name) = field.value().attr(&self.field_attribute) {
                        obj.insert(name.to_string(), Value::String(element_text(&field)));
                    }
                }
                (!obj.is_empty()).then_some(Value::Object(obj))
            })
            .collect()
    }

    fn decode_table(&self, document: &Html) -> Vec<Value> {
        let mut headers: Option<Vec<String>> = None;
        let mut records = Vec::new();

        for row in document.select(&self.row) {
            let is_header = row.select(&self.header_cell).next().is_some()
                && row.select(&self.cell).all(|c| c.value().name() == "th");
            let cells: Vec<String> = row.select(&self.cell).map(|c| element_text(&c)).collect();

            if cells.is_empty() {
                continue;
            }

            if is_header {
                headers = Some(cells);
                continue;
            }

            let Some(names) = &headers else {
                continue;
            };

            let mut obj = Map::new();
            for (i, name) in names.iter().enumerate() {
                let value = cells.get(i).cloned().unwrap_or_default();
                let json_value = if value.is_empty() {
                    Value::Null
                } else {
                    Value::String(value)
                };
                obj.insert(name.clone(), json_value);
            }
            records.push(Value::Object(obj));
        }

        records
    }
}

impl RecordDecoder for HtmlDecoder {
    fn decode(&self, body: &str) -> Result<Vec<Value>> {
        let document = Html::parse_document(body);
        Ok(match &self.item {
            Some(item) => self.decode_items(&document, item),
            None => self.decode_table(&document),
        })
    }
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| Error::HtmlParse {
        message: format!("Invalid selector '{selector}': {e}"),
    })
}

/// Text content with whitespace collapsed
fn element_text(element: &ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}
