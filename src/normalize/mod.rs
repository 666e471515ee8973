//! Extraction and normalization stage
//!
//! Turns raw payloads into typed, key-sorted domain records.
//!
//! # Overview
//!
//! - HTML payloads are decoded into rows with the source's selectors
//! - JSON arrays are split into rows, objects and CSV rows are used as-is
//! - Headers are mapped to fields, values coerced (numbers, dates, regions)
//! - Rows that cannot form a record are dropped with a warning
//!
//! The output is sorted by logical key, so the same input always produces
//! the same output.

mod coerce;
mod fields;
mod records;
mod region;

pub use coerce::{parse_date, parse_date_range, parse_number};
pub use fields::{AliasTable, FieldMap};
pub use records::{normalize_association, normalize_course_type, Normalize, RowContext};
pub use region::{classify_region, lookup_region};

use crate::decode::{HtmlDecoder, HtmlSelectors, RecordDecoder};
use crate::error::{Error, Result};
use crate::record::DomainRecord;
use crate::types::{Issue, JsonObject, JsonValue, RawPayload, RawRecord, Stage};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Per-source extraction settings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionProfile {
    /// Selectors for HTML payloads
    pub html: HtmlSelectors,
    /// Values for fields a source never provides (e.g. its association)
    pub defaults: BTreeMap<String, String>,
}

/// Extraction profiles keyed by source id
pub type ExtractionProfiles = HashMap<String, ExtractionProfile>;

/// Output of the normalization stage
#[derive(Debug, Clone)]
pub struct Normalized<T> {
    /// Records, sorted by logical key
    pub records: Vec<T>,
    /// Non-fatal problems, including dropped rows
    pub warnings: Vec<Issue>,
    /// Number of rows seen
    pub rows: usize,
    /// Number of rows dropped
    pub dropped: usize,
}

impl<T> Default for Normalized<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            warnings: Vec::new(),
            rows: 0,
            dropped: 0,
        }
    }
}

/// Normalize raw records with default extraction settings
pub fn normalize<T: Normalize>(raw: &[RawRecord]) -> Normalized<T> {
    normalize_with(raw, &ExtractionProfiles::new())
}

/// Normalize raw records using per-source extraction profiles
pub fn normalize_with<T: Normalize>(
    raw: &[RawRecord],
    profiles: &ExtractionProfiles,
) -> Normalized<T> {
    let default_profile = ExtractionProfile::default();
    let mut out = Normalized::default();

    for record in raw {
        let profile = profiles.get(&record.source_id).unwrap_or(&default_profile);

        // Rows the decoder could not parse still take a row number
        if let RawPayload::Malformed(reason) = &record.payload {
            let raw_id = format!("{}#{}", record.source_id, out.rows);
            out.rows += 1;
            out.dropped += 1;
            out.warnings.push(warning::<T>(
                &record.source_id,
                format!("{raw_id}: {reason}, record dropped"),
            ));
            continue;
        }

        let rows = match extract_rows(record, profile) {
            Ok(rows) => rows,
            Err(e) => {
                out.dropped += 1;
                out.warnings.push(warning::<T>(&record.source_id, e.to_string()));
                continue;
            }
        };

        for row in &rows {
            let row_no = out.rows;
            out.rows += 1;
            let mut cx = RowContext::new(&record.source_id, row_no, record.fetched_at);
            let mut fields = FieldMap::from_row(row, T::ALIASES);
            fields.apply_defaults(&profile.defaults, T::ALIASES);

            if fields.is_empty() {
                out.dropped += 1;
                out.warnings.push(warning::<T>(
                    &record.source_id,
                    format!("{}: no recognizable fields", cx.raw_id),
                ));
                continue;
            }

            match T::from_fields(&fields, &mut cx) {
                Ok(parsed) if parsed.logical_key().is_complete() => {
                    out.records.push(parsed);
                }
                Ok(parsed) => {
                    out.dropped += 1;
                    cx.warnings.push(format!(
                        "{}: incomplete key '{}'",
                        cx.raw_id,
                        parsed.logical_key()
                    ));
                }
                Err(reason) => {
                    out.dropped += 1;
                    cx.warnings.push(format!("{reason}, record dropped"));
                }
            }

            out.warnings.extend(
                cx.warnings
                    .into_iter()
                    .map(|message| warning::<T>(&record.source_id, message)),
            );
        }
    }

    // Stable: equal keys keep input order for the within-run dedup
    out.records.sort_by_key(T::logical_key);

    debug!(
        data_type = %T::DATA_TYPE,
        rows = out.rows,
        records = out.records.len(),
        dropped = out.dropped,
        "Normalized records"
    );

    out
}

fn warning<T: DomainRecord>(source: &str, message: String) -> Issue {
    Issue::new(Stage::Normalize, message)
        .for_type(T::DATA_TYPE)
        .from_source(source)
}

/// Split a raw payload into rows
pub fn extract_rows(record: &RawRecord, profile: &ExtractionProfile) -> Result<Vec<JsonObject>> {
    let values = match &record.payload {
        RawPayload::Row(row) => return Ok(vec![row.clone()]),
        RawPayload::Json(JsonValue::Array(items)) => items.clone(),
        RawPayload::Json(value) => vec![value.clone()],
        RawPayload::Html(html) => HtmlDecoder::new(&profile.html)?.decode(html)?,
        RawPayload::Malformed(reason) => {
            return Err(Error::normalization(&record.source_id, reason.clone()))
        }
    };

    values
        .into_iter()
        .map(|value| match value {
            JsonValue::Object(obj) => Ok(obj),
            other => Err(Error::normalization(
                &record.source_id,
                format!("expected an object row, got {other}"),
            )),
        })
        .collect()
}

#[cfg(test)]
mod tests;
