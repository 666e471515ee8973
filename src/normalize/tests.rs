//! Tests for the normalization stage

use super::*;
use crate::decode::DecoderConfig;
use crate::record::{GolfCourse, Player, Tournament, UNCLASSIFIED_REGION};
use chrono::{NaiveDate, TimeZone, Utc};
use pretty_assertions::assert_eq;
use serde_json::json;

fn row(source: &str, value: JsonValue) -> RawRecord {
    RawRecord::row(source, value.as_object().cloned().unwrap())
        .fetched_at(Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap())
}

// ============================================================================
// Coercion through the stage
// ============================================================================

#[test]
fn test_malformed_number_defaults_to_zero_and_keeps_record() {
    let raw = vec![row(
        "registry",
        json!({"name": "Sky72", "region": "인천", "holes": "36,0"}),
    )];

    let out = normalize::<GolfCourse>(&raw);

    assert_eq!(out.records.len(), 1);
    assert_eq!(out.records[0].holes, 0);
    assert_eq!(out.dropped, 0);
    assert_eq!(out.warnings.len(), 1);
    assert!(out.warnings[0].message.contains("unparsable holes '36,0'"));
    assert_eq!(out.warnings[0].stage, Stage::Normalize);
}

#[test]
fn test_unparsable_date_drops_record() {
    let raw = vec![
        row("kpga", json!({"대회명": "A", "개최일": "미정"})),
        row("kpga", json!({"대회명": "B", "개최일": "2024.06.06", "지역": "경기"})),
    ];

    let out = normalize::<Tournament>(&raw);

    assert_eq!(out.records.len(), 1);
    assert_eq!(out.records[0].name, "B");
    assert_eq!(out.dropped, 1);
    assert!(out
        .warnings
        .iter()
        .any(|w| w.message.contains("kpga#0") && w.message.contains("record dropped")));
}

#[test]
fn test_unparsable_optional_date_drops_record() {
    let raw = vec![row(
        "kpga",
        json!({"member_id": "1", "association": "KPGA", "name": "A", "생년월일": "1990-99-99"}),
    )];
    let out = normalize::<Player>(&raw);
    assert!(out.records.is_empty());
    assert_eq!(out.dropped, 1);
}

#[test]
fn test_unmapped_region_is_tagged_not_dropped() {
    let raw = vec![row("registry", json!({"name": "Overseas CC", "address": "Hawaii"}))];

    let out = normalize::<GolfCourse>(&raw);

    assert_eq!(out.records.len(), 1);
    assert_eq!(out.records[0].region, UNCLASSIFIED_REGION);
    assert!(out.warnings[0].message.contains("manual review"));
}

#[test]
fn test_region_derived_from_address() {
    let raw = vec![row(
        "registry",
        json!({"골프장명": "남서울CC", "주소": "경기도 성남시 분당구", "구분": "public"}),
    )];

    let out = normalize::<GolfCourse>(&raw);

    assert_eq!(out.records[0].region, "경기");
    assert_eq!(out.records[0].course_type.as_deref(), Some("대중제"));
    assert!(out.warnings.is_empty());
}

#[test]
fn test_tournament_period_and_prize() {
    let raw = vec![row(
        "kpga",
        json!({
            "대회명": "KPGA 선수권",
            "기간": "2024.06.06 ~ 06.09",
            "골프장": "에이원CC (경남 양산)",
            "총상금": "15억원",
            "투어": "kpga"
        }),
    )];

    let out = normalize::<Tournament>(&raw);
    let t = &out.records[0];

    assert_eq!(t.start_date, NaiveDate::from_ymd_opt(2024, 6, 6).unwrap());
    assert_eq!(t.end_date, NaiveDate::from_ymd_opt(2024, 6, 9));
    assert_eq!(t.region, "경남");
    assert_eq!(t.prize_money, 1_500_000_000);
    assert_eq!(t.association.as_deref(), Some("KPGA"));
    assert_eq!(t.provenance.source, "kpga");
}

#[test]
fn test_missing_key_field_drops_record() {
    let raw = vec![row("klpga", json!({"name": "김철수", "member_id": "1001"}))];
    let out = normalize::<Player>(&raw);
    assert!(out.records.is_empty());
    assert!(out.warnings[0].message.contains("missing association"));
}

#[test]
fn test_profile_defaults_fill_association() {
    let raw = vec![row("klpga", json!({"선수명": "이영희", "회원번호": "2002", "지역": "서울"}))];
    let profiles = ExtractionProfiles::from([(
        "klpga".to_string(),
        ExtractionProfile {
            defaults: BTreeMap::from([("association".to_string(), "klpga".to_string())]),
            ..ExtractionProfile::default()
        },
    )]);

    let out = normalize_with::<Player>(&raw, &profiles);

    assert_eq!(out.records.len(), 1);
    assert_eq!(out.records[0].association, "KLPGA");
}

#[test]
fn test_row_without_known_fields_is_dropped() {
    let raw = vec![row("x", json!({"foo": "bar"}))];
    let out = normalize::<GolfCourse>(&raw);
    assert_eq!(out.dropped, 1);
    assert!(out.warnings[0].message.contains("no recognizable fields"));
}

// ============================================================================
// Payload kinds
// ============================================================================

#[test]
fn test_html_payload() {
    let html = r#"<table>
        <tr><th>골프장명</th><th>지역</th><th>홀수</th></tr>
        <tr><td>Sky72</td><td>인천</td><td>72홀</td></tr>
        <tr><td>Blue Heron</td><td>경기 여주</td><td>18</td></tr>
    </table>"#;
    let raw = vec![RawRecord::html("registry", html)];

    let out = normalize::<GolfCourse>(&raw);

    assert_eq!(out.rows, 2);
    let names: Vec<&str> = out.records.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Blue Heron", "Sky72"]);
    assert_eq!(out.records[1].holes, 72);
}

#[test]
fn test_json_array_payload() {
    let raw = vec![RawRecord::new(
        "api",
        RawPayload::Json(json!([
            {"name": "A", "region": "제주"},
            {"name": "B", "region": "제주"}
        ])),
    )];
    let out = normalize::<GolfCourse>(&raw);
    assert_eq!(out.records.len(), 2);
}

#[test]
fn test_non_object_json_is_a_warning() {
    let raw = vec![RawRecord::new("api", RawPayload::Json(json!([1, 2])))];
    let out = normalize::<GolfCourse>(&raw);
    assert!(out.records.is_empty());
    assert_eq!(out.dropped, 1);
    assert_eq!(out.warnings[0].source.as_deref(), Some("api"));
}

#[test]
fn test_malformed_row_is_dropped_with_its_raw_id() {
    let body = "name,region,holes\nSky72,인천,72\n\"Broken,경기,18\nLake,경기,18\n";
    let raw = crate::source::records_from_body("registry", body, &DecoderConfig::csv()).unwrap();

    let out = normalize::<GolfCourse>(&raw);

    assert_eq!(out.rows, 3);
    assert_eq!(out.dropped, 1);
    let names: Vec<&str> = out.records.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Lake", "Sky72"]);
    assert_eq!(out.warnings.len(), 1);
    assert!(out.warnings[0].message.starts_with("registry#1: "));
    assert!(out.warnings[0].message.ends_with("record dropped"));
}

// ============================================================================
// Determinism
// ============================================================================

#[test]
fn test_output_sorted_and_deterministic() {
    let raw = vec![
        row("a", json!({"name": "Zeta", "region": "경기"})),
        row("a", json!({"name": "alpha", "region": "경기"})),
        row("b", json!({"name": "Mid", "region": "강원"})),
    ];

    let first = normalize::<GolfCourse>(&raw);
    let second = normalize::<GolfCourse>(&raw);

    assert_eq!(first.records, second.records);
    let names: Vec<&str> = first.records.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["alpha", "Mid", "Zeta"]);
}

#[test]
fn test_equal_keys_keep_input_order() {
    let raw = vec![
        row("first", json!({"name": "Sky72", "region": "인천"})),
        row("second", json!({"name": "SKY72", "region": "인천"})),
    ];
    let out = normalize::<GolfCourse>(&raw);
    assert_eq!(out.records[0].provenance.source, "first");
    assert_eq!(out.records[1].provenance.source, "second");
}
