//! Column name mapping
//!
//! Sources label the same field in many ways (`대회명`, `Tournament Name`,
//! `title`). Each record type declares aliases; headers are compared after
//! lowercasing and dropping spaces, underscores and hyphens.

use crate::types::{JsonObject, JsonValue};
use std::collections::BTreeMap;

/// Canonical field name and its accepted header spellings
pub type AliasTable = &'static [(&'static str, &'static [&'static str])];

pub const TOURNAMENT_ALIASES: AliasTable = &[
    ("name", &["name", "tournament", "tournamentname", "title", "대회명", "대회", "대회이름"]),
    ("start_date", &["startdate", "date", "start", "개최일", "시작일", "일자", "날짜"]),
    ("end_date", &["enddate", "end", "종료일"]),
    ("period", &["period", "dates", "schedule", "기간", "대회기간", "일정"]),
    ("venue", &["venue", "course", "golfcourse", "장소", "골프장", "개최지", "코스"]),
    ("region", &["region", "location", "area", "지역", "위치"]),
    ("association", &["association", "tour", "협회", "투어"]),
    ("prize_money", &["prizemoney", "prize", "purse", "총상금", "상금", "상금규모"]),
    ("url", &["url", "link", "링크"]),
];

pub const GOLF_COURSE_ALIASES: AliasTable = &[
    ("name", &["name", "coursename", "golfcourse", "골프장명", "골프장", "이름", "사업장명"]),
    ("region", &["region", "city", "province", "지역", "시도"]),
    ("address", &["address", "addr", "주소", "소재지", "소재지주소", "도로명주소"]),
    ("phone", &["phone", "tel", "telephone", "전화번호", "연락처"]),
    ("website", &["website", "homepage", "url", "홈페이지"]),
    ("course_type", &["coursetype", "type", "구분", "운영형태", "형태", "회원제구분"]),
    ("holes", &["holes", "holecount", "홀수", "홀", "규모"]),
];

pub const PLAYER_ALIASES: AliasTable = &[
    ("member_id", &["memberid", "id", "playerid", "회원번호", "선수번호", "회원id"]),
    ("association", &["association", "tour", "협회", "소속협회"]),
    ("name", &["name", "playername", "선수명", "이름", "성명"]),
    ("birth_date", &["birthdate", "birthday", "dob", "생년월일"]),
    ("region", &["region", "hometown", "지역", "출신", "출신지"]),
    ("ranking", &["ranking", "rank", "순위"]),
    ("prize_money", &["prizemoney", "earnings", "상금", "획득상금", "상금액"]),
];

/// A row with headers mapped to canonical field names
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMap {
    values: BTreeMap<&'static str, String>,
}

impl FieldMap {
    /// Map a raw row through an alias table
    ///
    /// Unknown columns are ignored. When two columns map to the same field the
    /// first non-blank one wins.
    pub fn from_row(row: &JsonObject, aliases: AliasTable) -> Self {
        let mut values = BTreeMap::new();
        for (header, value) in row {
            let Some(field) = resolve(header, aliases) else {
                continue;
            };
            let Some(text) = value_text(value) else {
                continue;
            };
            values.entry(field).or_insert(text);
        }
        Self { values }
    }

    /// Fill fields that the row left blank
    pub fn apply_defaults(&mut self, defaults: &BTreeMap<String, String>, aliases: AliasTable) {
        for (name, value) in defaults {
            let Some(field) = resolve(name, aliases) else {
                continue;
            };
            let value = value.trim();
            if !value.is_empty() {
                self.values.entry(field).or_insert_with(|| value.to_string());
            }
        }
    }

    /// Non-blank text of a field
    pub fn get(&self, field: &str) -> Option<&str> {
        self.values.get(field).map(String::as_str)
    }

    /// Owned non-blank text of a field
    pub fn text(&self, field: &str) -> Option<String> {
        self.get(field).map(ToString::to_string)
    }

    /// Whether no field was recognized
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

fn resolve(header: &str, aliases: AliasTable) -> Option<&'static str> {
    let folded = fold_header(header);
    aliases
        .iter()
        .find(|(field, names)| *field == folded || names.contains(&folded.as_str()))
        .map(|(field, _)| *field)
}

fn fold_header(header: &str) -> String {
    header
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '_' | '-' | '.'))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Text form of a JSON cell, `None` when blank
fn value_text(value: &JsonValue) -> Option<String> {
    let text = match value {
        JsonValue::Null => return None,
        JsonValue::String(s) => s.trim().to_string(),
        JsonValue::Number(n) => n.to_string(),
        JsonValue::Bool(b) => b.to_string(),
        other => other.to_string(),
    };
    (!text.is_empty()).then_some(text)
}
