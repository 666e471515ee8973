//! Dedup and merge stage
//!
//! # Overview
//!
//! - [`dedupe`] collapses records of one run that share a logical key
//!   (last write wins in batch order, conflicting values are reported)
//! - [`merge`] applies a run's records to the previously exported ones
//!
//! Both use [`DomainRecord::overlay`]: a non-empty incoming value replaces
//! the current one, an empty one never erases it. Keys compare
//! case-insensitively and the first-seen casing is kept.

use crate::record::{conflicting_fields, DomainRecord, LogicalKey};
use crate::types::{Issue, Stage};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use tracing::debug;

/// Collapse same-key records of a single run
///
/// Records are applied in slice order, so a later record overrides an earlier
/// one field by field. A warning is produced for every collision whose
/// records disagree on a non-empty field.
pub fn dedupe<T: DomainRecord>(records: Vec<T>) -> (Vec<T>, Vec<Issue>) {
    let total = records.len();
    let mut by_key: BTreeMap<LogicalKey, T> = BTreeMap::new();
    let mut warnings = Vec::new();

    for record in records {
        match by_key.entry(record.logical_key()) {
            Entry::Vacant(slot) => {
                slot.insert(record);
            }
            Entry::Occupied(mut slot) => {
                let key = slot.key().to_string();
                let current = slot.get_mut();
                let conflicts = conflicting_fields(current, &record);
                if !conflicts.is_empty() {
                    warnings.push(
                        Issue::new(
                            Stage::Merge,
                            format!(
                                "'{key}' from {} and {} disagree on {}; keeping {}",
                                current.provenance().source,
                                record.provenance().source,
                                conflicts.join(", "),
                                record.provenance().source,
                            ),
                        )
                        .for_type(T::DATA_TYPE)
                        .from_source(record.provenance().source.clone()),
                    );
                }
                current.overlay(&record);
            }
        }
    }

    let out: Vec<T> = by_key.into_values().collect();
    debug!(
        data_type = %T::DATA_TYPE,
        input = total,
        output = out.len(),
        conflicts = warnings.len(),
        "Deduplicated records"
    );
    (out, warnings)
}

/// Merge a run's records into the previously stored ones
///
/// Records only present in `existing` are kept unchanged. Matching records
/// keep their stored id and key casing. Every output record has an id; new
/// ones get a fingerprint of their logical key. The result is sorted by key
/// and merging the same incoming set twice changes nothing.
pub fn merge<T: DomainRecord>(existing: &[T], incoming: &[T]) -> Vec<T> {
    let mut by_key: BTreeMap<LogicalKey, T> = BTreeMap::new();

    for record in existing.iter().chain(incoming) {
        match by_key.entry(record.logical_key()) {
            Entry::Vacant(slot) => {
                slot.insert(record.clone());
            }
            Entry::Occupied(mut slot) => {
                let current = slot.get_mut();
                current.overlay(record);
                if current.id().is_none() {
                    if let Some(id) = record.id() {
                        current.set_id(id.to_string());
                    }
                }
            }
        }
    }

    let merged: Vec<T> = by_key
        .into_iter()
        .map(|(key, mut record)| {
            if record.id().is_none() {
                record.set_id(key.fingerprint(T::DATA_TYPE));
            }
            record
        })
        .collect();

    debug!(
        data_type = %T::DATA_TYPE,
        existing = existing.len(),
        incoming = incoming.len(),
        merged = merged.len(),
        "Merged records"
    );
    merged
}
