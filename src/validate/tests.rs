//! Tests for validation

use super::*;
use crate::record::{GolfCourse, Player, Provenance, Tournament};
use chrono::{NaiveDate, TimeZone, Utc};
use pretty_assertions::assert_eq;

fn provenance() -> Provenance {
    Provenance::new("test", Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap())
}

fn course(name: &str, holes: i64, course_type: Option<&str>) -> GolfCourse {
    GolfCourse {
        id: None,
        name: name.to_string(),
        region: "경기".to_string(),
        address: None,
        phone: None,
        website: None,
        course_type: course_type.map(ToString::to_string),
        holes,
        provenance: provenance(),
    }
}

fn player(member_id: &str, association: &str, prize_money: i64) -> Player {
    Player {
        id: None,
        member_id: member_id.to_string(),
        association: association.to_string(),
        name: "홍길동".to_string(),
        birth_date: None,
        region: "서울".to_string(),
        ranking: 0,
        prize_money,
        provenance: provenance(),
    }
}

// ============================================================================
// Default rules
// ============================================================================

#[test]
fn test_default_course_rules() {
    let rules = RuleSet::golf_courses();
    let records = vec![
        course("Good", 18, Some("대중제")),
        course("Too Many Holes", 54, None),
        course("Weird Type", 9, Some("semi-private")),
        course("No Holes Known", 0, None),
    ];

    let out = validate(records, &rules);

    let valid: Vec<&str> = out.valid.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(valid, vec!["Good", "No Holes Known"]);
    assert_eq!(out.rejected.len(), 2);
    assert_eq!(out.rejected[0].violations[0].field, "holes");
    assert!(out.rejected[0].violations[0].reason.contains("above maximum 36"));
    assert_eq!(out.rejected[1].violations[0].field, "course_type");
}

#[test]
fn test_all_violations_are_collected() {
    let rules = RuleSet::players();
    let out = validate(vec![player("", "LPGA", -5)], &rules);

    assert!(out.valid.is_empty());
    let fields: Vec<&str> = out.rejected[0]
        .violations
        .iter()
        .map(|v| v.field.as_str())
        .collect();
    assert_eq!(fields, vec!["member_id", "prize_money", "association"]);
}

#[test]
fn test_records_are_not_mutated() {
    let original = course("Sky72", 72, Some("회원제"));
    let out = validate(vec![original.clone()], &RuleSet::golf_courses());
    assert_eq!(out.rejected[0].record, original);
}

#[test]
fn test_empty_rule_set_accepts_everything() {
    let out = validate(vec![course("", -1, None)], &RuleSet::default());
    assert_eq!(out.valid.len(), 1);
    assert_eq!(out.total(), 1);
}

#[test]
fn test_required_date_and_camel_case_names() {
    let rules = RuleSet::default().require("endDate");
    let t = Tournament {
        id: None,
        name: "Open".to_string(),
        start_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
        end_date: None,
        venue: None,
        region: "제주".to_string(),
        association: None,
        prize_money: 0,
        url: None,
        provenance: provenance(),
    };

    let violations = rules.check(&t);
    assert_eq!(violations, vec![Violation::new("end_date", "is required")]);
}

#[test]
fn test_range_on_text_field_is_a_violation() {
    let rules = RuleSet::default().range("name", RangeRule::at_least(1));
    let violations = rules.check(&course("Sky72", 18, None));
    assert!(violations[0].reason.contains("not numeric"));
}

// ============================================================================
// Rule configuration
// ============================================================================

#[test]
fn test_default_rules_pass_field_check() {
    ValidationRules::default().check_fields().unwrap();
}

#[test]
fn test_unknown_field_is_config_error() {
    let rules = RuleSet::default().require("handicap");
    let err = rules.check_fields(DataType::Players).unwrap_err();
    assert!(err.is_config());
    assert!(err.to_string().contains("handicap"));
}

#[test]
fn test_inverted_range_is_config_error() {
    let rules = RuleSet::default().range("holes", RangeRule::between(36, 9));
    let err = rules.check_fields(DataType::GolfCourses).unwrap_err();
    assert!(err.to_string().contains("greater than max"));
}

#[test]
fn test_rules_deserialize_with_defaults() {
    let yaml = r"
players:
  required: [member_id, name]
";
    let rules: ValidationRules = serde_yaml::from_str(yaml).unwrap();

    assert_eq!(rules.players.required, vec!["member_id", "name"]);
    assert!(rules.players.enums.is_empty());
    assert_eq!(rules.golf_courses, RuleSet::golf_courses());
}
