//! Row to record conversion
//!
//! Each record type builds itself from a [`FieldMap`]. Coercion problems that
//! keep the record (bad numbers, unmapped regions) are pushed as warnings on
//! the [`RowContext`]; problems that drop it are returned as `Err`.

use super::coerce::{parse_date, parse_date_range, parse_number};
use super::fields::{AliasTable, FieldMap, GOLF_COURSE_ALIASES, PLAYER_ALIASES, TOURNAMENT_ALIASES};
use super::region::lookup_region;
use crate::record::{DomainRecord, GolfCourse, Player, Provenance, Tournament, UNCLASSIFIED_REGION};
use crate::types::OptionStringExt;
use chrono::{DateTime, NaiveDate, Utc};

/// Per-row state while building a record
#[derive(Debug)]
pub struct RowContext {
    /// Identifies the row in warnings (`source#index`)
    pub raw_id: String,
    pub source_id: String,
    pub fetched_at: DateTime<Utc>,
    pub warnings: Vec<String>,
}

impl RowContext {
    pub fn new(source_id: &str, index: usize, fetched_at: DateTime<Utc>) -> Self {
        Self {
            raw_id: format!("{source_id}#{index}"),
            source_id: source_id.to_string(),
            fetched_at,
            warnings: Vec::new(),
        }
    }

    fn provenance(&self) -> Provenance {
        Provenance::new(&self.source_id, self.fetched_at)
    }

    /// Numeric field; absent is 0, unparsable is 0 with a warning
    fn number(&mut self, fields: &FieldMap, field: &str) -> i64 {
        let Some(text) = fields.get(field) else {
            return 0;
        };
        parse_number(text).unwrap_or_else(|| {
            self.warnings.push(format!(
                "{}: unparsable {field} '{text}', defaulted to 0",
                self.raw_id
            ));
            0
        })
    }

    /// Optional date; present but unparsable drops the record
    fn optional_date(
        &self,
        fields: &FieldMap,
        field: &str,
    ) -> std::result::Result<Option<NaiveDate>, String> {
        match fields.get(field) {
            None => Ok(None),
            Some(text) => parse_date(text)
                .map(Some)
                .ok_or_else(|| format!("{}: unparsable {field} '{text}'", self.raw_id)),
        }
    }

    /// Canonical region from the first available text, tagged when unmapped
    fn region(&mut self, candidates: &[Option<&str>]) -> String {
        let texts: Vec<&str> = candidates.iter().flatten().copied().collect();
        if let Some(code) = texts.iter().find_map(|t| lookup_region(t)) {
            return code.to_string();
        }
        let shown = texts.first().copied().unwrap_or("");
        self.warnings.push(format!(
            "{}: region '{shown}' is unclassified, flagged for manual review",
            self.raw_id
        ));
        UNCLASSIFIED_REGION.to_string()
    }
}

/// Construction of a record from a mapped row
pub trait Normalize: DomainRecord {
    /// Header aliases for this record type
    const ALIASES: AliasTable;

    /// Build the record, or explain why the row is dropped
    fn from_fields(fields: &FieldMap, cx: &mut RowContext) -> std::result::Result<Self, String>;
}

fn required(fields: &FieldMap, field: &str, cx: &RowContext) -> std::result::Result<String, String> {
    fields
        .text(field)
        .none_if_blank()
        .ok_or_else(|| format!("{}: missing {field}", cx.raw_id))
}

impl Normalize for Tournament {
    const ALIASES: AliasTable = TOURNAMENT_ALIASES;

    fn from_fields(fields: &FieldMap, cx: &mut RowContext) -> std::result::Result<Self, String> {
        let name = required(fields, "name", cx)?;

        let (start_date, range_end) = match (fields.get("start_date"), fields.get("period")) {
            (Some(text), _) | (None, Some(text)) => parse_date_range(text)
                .ok_or_else(|| format!("{}: unparsable start date '{text}'", cx.raw_id))?,
            (None, None) => return Err(format!("{}: missing start_date", cx.raw_id)),
        };
        let end_date = cx.optional_date(fields, "end_date")?.or(range_end);

        let venue = fields.text("venue");
        let region = cx.region(&[fields.get("region"), venue.as_deref()]);

        Ok(Tournament {
            id: None,
            name,
            start_date,
            end_date,
            venue,
            region,
            association: fields.get("association").map(normalize_association),
            prize_money: cx.number(fields, "prize_money"),
            url: fields.text("url"),
            provenance: cx.provenance(),
        })
    }
}

impl Normalize for GolfCourse {
    const ALIASES: AliasTable = GOLF_COURSE_ALIASES;

    fn from_fields(fields: &FieldMap, cx: &mut RowContext) -> std::result::Result<Self, String> {
        let name = required(fields, "name", cx)?;
        let address = fields.text("address");
        let region = cx.region(&[fields.get("region"), address.as_deref()]);

        Ok(GolfCourse {
            id: None,
            name,
            region,
            address,
            phone: fields.text("phone"),
            website: fields.text("website"),
            course_type: fields.get("course_type").map(normalize_course_type),
            holes: cx.number(fields, "holes"),
            provenance: cx.provenance(),
        })
    }
}

impl Normalize for Player {
    const ALIASES: AliasTable = PLAYER_ALIASES;

    fn from_fields(fields: &FieldMap, cx: &mut RowContext) -> std::result::Result<Self, String> {
        let member_id = required(fields, "member_id", cx)?;
        let association = normalize_association(&required(fields, "association", cx)?);
        let name = required(fields, "name", cx)?;
        let birth_date = cx.optional_date(fields, "birth_date")?;
        let region = cx.region(&[fields.get("region")]);

        Ok(Player {
            id: None,
            member_id,
            association,
            name,
            birth_date,
            region,
            ranking: cx.number(fields, "ranking"),
            prize_money: cx.number(fields, "prize_money"),
            provenance: cx.provenance(),
        })
    }
}

/// Map association spellings to their acronym
pub fn normalize_association(text: &str) -> String {
    let trimmed = text.trim();
    match trimmed.replace(' ', "").as_str() {
        "한국여자프로골프협회" => "KLPGA".to_string(),
        "한국프로골프협회" => "KPGA".to_string(),
        other => other.to_uppercase(),
    }
}

/// Map course type spellings to 회원제 / 대중제; other text passes through
pub fn normalize_course_type(text: &str) -> String {
    let trimmed = text.trim();
    match trimmed.to_lowercase().as_str() {
        "회원제" | "회원" | "member" | "members" | "private" => "회원제".to_string(),
        "대중제" | "대중" | "퍼블릭" | "public" => "대중제".to_string(),
        _ => trimmed.to_string(),
    }
}
