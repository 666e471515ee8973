//! Domain record module
//!
//! Typed records produced by normalization and stored in the snapshot.
//!
//! # Overview
//!
//! - `Tournament`, `GolfCourse`, `Player` - the three record types
//! - `DomainRecord` - what merge, validation and export need from a record
//! - `LogicalKey` - normalized identity used for dedup and ordering
//! - `FieldValue` - by-name field access for configurable rules

mod key;
mod types;

pub use key::{FieldValue, LogicalKey};
pub use types::{GolfCourse, Player, Provenance, Tournament, UNCLASSIFIED_REGION};

use crate::types::DataType;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;

/// Fields that describe provenance rather than the entity
const BOOKKEEPING_FIELDS: &[&str] = &["id", "source", "last_updated"];

/// Behaviour shared by all record types
pub trait DomainRecord:
    Clone + Debug + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Data type this record belongs to
    const DATA_TYPE: DataType;

    /// Field names addressable through [`DomainRecord::field`]
    const FIELDS: &'static [&'static str];

    /// Identity of the real-world entity
    fn logical_key(&self) -> LogicalKey;

    /// Stable identifier, if assigned
    fn id(&self) -> Option<&str>;

    /// Assign the stable identifier
    fn set_id(&mut self, id: String);

    /// Source and fetch time
    fn provenance(&self) -> &Provenance;

    /// Canonical region code, for types that carry one
    fn region(&self) -> Option<&str> {
        None
    }

    /// Read a field by snake_case name; unknown names read as `Empty`
    fn field(&self, name: &str) -> FieldValue;

    /// Apply an incoming (newer) version of the same entity
    ///
    /// Non-empty incoming values win, empty ones keep the current value.
    /// Key fields and the id are never touched.
    fn overlay(&mut self, incoming: &Self);

    /// Whether the region is the unclassified tag
    fn is_unclassified(&self) -> bool {
        self.region() == Some(UNCLASSIFIED_REGION)
    }

    /// Whether `name` is a field of this record type
    fn has_field(name: &str) -> bool {
        Self::FIELDS.contains(&name)
    }
}

/// Fields where both records hold different non-empty values
pub fn conflicting_fields<T: DomainRecord>(a: &T, b: &T) -> Vec<&'static str> {
    T::FIELDS
        .iter()
        .copied()
        .filter(|name| !BOOKKEEPING_FIELDS.contains(name))
        .filter(|name| {
            let left = a.field(name);
            let right = b.field(name);
            !left.is_unset() && !right.is_unset() && !same_value(&left, &right)
        })
        .collect()
}

/// Text compares case-insensitively, everything else exactly
fn same_value(left: &FieldValue, right: &FieldValue) -> bool {
    match (left, right) {
        (FieldValue::Text(a), FieldValue::Text(b)) => a.to_lowercase() == b.to_lowercase(),
        _ => left == right,
    }
}

/// Convert a camelCase field name to the snake_case form used by rules
pub fn canonical_field_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for c in name.trim().chars() {
        if c.is_ascii_uppercase() {
            if !out.is_empty() {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else if c == '-' || c == ' ' {
            out.push('_');
        } else {
            out.push(c);
        }
    }
    out
}

/// Field names for a data type
pub fn fields_of(data_type: DataType) -> &'static [&'static str] {
    match data_type {
        DataType::Tournaments => Tournament::FIELDS,
        DataType::GolfCourses => GolfCourse::FIELDS,
        DataType::Players => Player::FIELDS,
    }
}
