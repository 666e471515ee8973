//! Domain record types
//!
//! Records serialize in camelCase, which is also the snapshot wire format.
//! Field names used by validation rules are snake_case.

use super::key::{FieldValue, LogicalKey};
use super::DomainRecord;
use crate::types::DataType;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Region tag for text that did not map to a canonical region
pub const UNCLASSIFIED_REGION: &str = "미분류";

/// Where a record came from and when
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provenance {
    /// Source id
    pub source: String,
    /// Fetch time of the data backing the record
    pub last_updated: DateTime<Utc>,
}

impl Provenance {
    /// Create provenance for a source
    pub fn new(source: impl Into<String>, last_updated: DateTime<Utc>) -> Self {
        Self {
            source: source.into(),
            last_updated,
        }
    }
}

// ============================================================================
// Tournament
// ============================================================================

/// A scheduled or completed tournament
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tournament {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub venue: Option<String>,
    pub region: String,
    #[serde(default)]
    pub association: Option<String>,
    #[serde(default)]
    pub prize_money: i64,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(flatten)]
    pub provenance: Provenance,
}

impl DomainRecord for Tournament {
    const DATA_TYPE: DataType = DataType::Tournaments;
    const FIELDS: &'static [&'static str] = &[
        "id",
        "name",
        "start_date",
        "end_date",
        "venue",
        "region",
        "association",
        "prize_money",
        "url",
        "source",
        "last_updated",
    ];

    fn logical_key(&self) -> LogicalKey {
        let date = self.start_date.format("%Y-%m-%d").to_string();
        LogicalKey::new(&[&self.name, &date])
    }

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn set_id(&mut self, id: String) {
        self.id = Some(id);
    }

    fn provenance(&self) -> &Provenance {
        &self.provenance
    }

    fn region(&self) -> Option<&str> {
        Some(&self.region)
    }

    fn field(&self, name: &str) -> FieldValue {
        match name {
            "id" => FieldValue::text(self.id.as_deref()),
            "name" => FieldValue::text(Some(&self.name)),
            "start_date" => FieldValue::Date(self.start_date),
            "end_date" => FieldValue::date(self.end_date),
            "venue" => FieldValue::text(self.venue.as_deref()),
            "region" => FieldValue::text(Some(&self.region)),
            "association" => FieldValue::text(self.association.as_deref()),
            "prize_money" => FieldValue::Number(self.prize_money),
            "url" => FieldValue::text(self.url.as_deref()),
            "source" => FieldValue::text(Some(&self.provenance.source)),
            "last_updated" => FieldValue::Date(self.provenance.last_updated.date_naive()),
            _ => FieldValue::Empty,
        }
    }

    fn overlay(&mut self, incoming: &Self) {
        overlay_date(&mut self.end_date, incoming.end_date);
        overlay_text(&mut self.venue, &incoming.venue);
        overlay_region(&mut self.region, &incoming.region);
        overlay_text(&mut self.association, &incoming.association);
        overlay_number(&mut self.prize_money, incoming.prize_money);
        overlay_text(&mut self.url, &incoming.url);
        self.provenance = incoming.provenance.clone();
    }
}

// ============================================================================
// Golf Course
// ============================================================================

/// A golf course registry entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GolfCourse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub region: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    /// 회원제 (members) or 대중제 (public)
    #[serde(default)]
    pub course_type: Option<String>,
    #[serde(default)]
    pub holes: i64,
    #[serde(flatten)]
    pub provenance: Provenance,
}

impl DomainRecord for GolfCourse {
    const DATA_TYPE: DataType = DataType::GolfCourses;
    const FIELDS: &'static [&'static str] = &[
        "id",
        "name",
        "region",
        "address",
        "phone",
        "website",
        "course_type",
        "holes",
        "source",
        "last_updated",
    ];

    fn logical_key(&self) -> LogicalKey {
        LogicalKey::new(&[&self.name, &self.region])
    }

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn set_id(&mut self, id: String) {
        self.id = Some(id);
    }

    fn provenance(&self) -> &Provenance {
        &self.provenance
    }

    fn region(&self) -> Option<&str> {
        Some(&self.region)
    }

    fn field(&self, name: &str) -> FieldValue {
        match name {
            "id" => FieldValue::text(self.id.as_deref()),
            "name" => FieldValue::text(Some(&self.name)),
            "region" => FieldValue::text(Some(&self.region)),
            "address" => FieldValue::text(self.address.as_deref()),
            "phone" => FieldValue::text(self.phone.as_deref()),
            "website" => FieldValue::text(self.website.as_deref()),
            "course_type" => FieldValue::text(self.course_type.as_deref()),
            "holes" => FieldValue::Number(self.holes),
            "source" => FieldValue::text(Some(&self.provenance.source)),
            "last_updated" => FieldValue::Date(self.provenance.last_updated.date_naive()),
            _ => FieldValue::Empty,
        }
    }

    fn overlay(&mut self, incoming: &Self) {
        overlay_text(&mut self.address, &incoming.address);
        overlay_text(&mut self.phone, &incoming.phone);
        overlay_text(&mut self.website, &incoming.website);
        overlay_text(&mut self.course_type, &incoming.course_type);
        overlay_number(&mut self.holes, incoming.holes);
        self.provenance = incoming.provenance.clone();
    }
}

// ============================================================================
// Player
// ============================================================================

/// A tour professional registered with an association
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub member_id: String,
    pub association: String,
    pub name: String,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    pub region: String,
    #[serde(default)]
    pub ranking: i64,
    #[serde(default)]
    pub prize_money: i64,
    #[serde(flatten)]
    pub provenance: Provenance,
}

impl DomainRecord for Player {
    const DATA_TYPE: DataType = DataType::Players;
    const FIELDS: &'static [&'static str] = &[
        "id",
        "member_id",
        "association",
        "name",
        "birth_date",
        "region",
        "ranking",
        "prize_money",
        "source",
        "last_updated",
    ];

    fn logical_key(&self) -> LogicalKey {
        LogicalKey::new(&[&self.member_id, &self.association])
    }

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn set_id(&mut self, id: String) {
        self.id = Some(id);
    }

    fn provenance(&self) -> &Provenance {
        &self.provenance
    }

    fn region(&self) -> Option<&str> {
        Some(&self.region)
    }

    fn field(&self, name: &str) -> FieldValue {
        match name {
            "id" => FieldValue::text(self.id.as_deref()),
            "member_id" => FieldValue::text(Some(&self.member_id)),
            "association" => FieldValue::text(Some(&self.association)),
            "name" => FieldValue::text(Some(&self.name)),
            "birth_date" => FieldValue::date(self.birth_date),
            "region" => FieldValue::text(Some(&self.region)),
            "ranking" => FieldValue::Number(self.ranking),
            "prize_money" => FieldValue::Number(self.prize_money),
            "source" => FieldValue::text(Some(&self.provenance.source)),
            "last_updated" => FieldValue::Date(self.provenance.last_updated.date_naive()),
            _ => FieldValue::Empty,
        }
    }

    fn overlay(&mut self, incoming: &Self) {
        if !incoming.name.trim().is_empty() {
            self.name.clone_from(&incoming.name);
        }
        overlay_date(&mut self.birth_date, incoming.birth_date);
        overlay_region(&mut self.region, &incoming.region);
        overlay_number(&mut self.ranking, incoming.ranking);
        overlay_number(&mut self.prize_money, incoming.prize_money);
        self.provenance = incoming.provenance.clone();
    }
}

// ============================================================================
// Overlay helpers
// ============================================================================

fn overlay_text(existing: &mut Option<String>, incoming: &Option<String>) {
    if let Some(value) = incoming.as_deref().filter(|v| !v.trim().is_empty()) {
        *existing = Some(value.to_string());
    }
}

fn overlay_number(existing: &mut i64, incoming: i64) {
    if incoming != 0 {
        *existing = incoming;
    }
}

fn overlay_date(existing: &mut Option<NaiveDate>, incoming: Option<NaiveDate>) {
    if incoming.is_some() {
        *existing = incoming;
    }
}

/// An unclassified incoming region never replaces a classified one
fn overlay_region(existing: &mut String, incoming: &str) {
    let incoming = incoming.trim();
    if !incoming.is_empty() && incoming != UNCLASSIFIED_REGION {
        *existing = incoming.to_string();
    }
}
