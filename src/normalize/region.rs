//! Region lookup
//!
//! Maps free-text locations (addresses, city names, romanized names) to the
//! canonical short province codes used across the snapshot.

use crate::record::UNCLASSIFIED_REGION;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Canonical region code and the spellings that map to it
const PROVINCES: &[(&str, &[&str])] = &[
    ("서울", &["서울", "서울시", "서울특별시", "seoul"]),
    ("부산", &["부산", "부산시", "부산광역시", "busan"]),
    ("대구", &["대구", "대구시", "대구광역시", "daegu"]),
    ("인천", &["인천", "인천시", "인천광역시", "incheon"]),
    ("광주", &["광주광역시", "gwangju"]),
    ("대전", &["대전", "대전시", "대전광역시", "daejeon"]),
    ("울산", &["울산", "울산시", "울산광역시", "ulsan"]),
    ("세종", &["세종", "세종시", "세종특별자치시", "sejong"]),
    ("경기", &["경기", "경기도", "gyeonggi", "gyeonggi-do"]),
    ("강원", &["강원", "강원도", "강원특별자치도", "gangwon", "gangwon-do"]),
    ("충북", &["충북", "충청북도", "chungbuk", "chungcheongbuk-do"]),
    ("충남", &["충남", "충청남도", "chungnam", "chungcheongnam-do"]),
    ("전북", &["전북", "전라북도", "전북특별자치도", "jeonbuk", "jeollabuk-do"]),
    ("전남", &["전남", "전라남도", "jeonnam", "jeollanam-do"]),
    ("경북", &["경북", "경상북도", "gyeongbuk", "gyeongsangbuk-do"]),
    ("경남", &["경남", "경상남도", "gyeongnam", "gyeongsangnam-do"]),
    ("제주", &["제주", "제주도", "제주특별자치도", "jeju", "jeju-do"]),
];

/// Cities and counties with golf courses, keyed without their 시/군 suffix
const CITIES: &[(&str, &[&str])] = &[
    (
        "경기",
        &[
            "용인", "이천", "여주", "포천", "가평", "안성", "파주", "화성", "평택", "양평", "양주",
            "남양주", "성남", "고양", "김포", "광명",
        ],
    ),
    ("강원", &["춘천", "원주", "홍천", "강릉", "평창", "정선", "횡성", "고성", "속초"]),
    ("충북", &["청주", "충주", "제천", "음성", "진천", "괴산"]),
    ("충남", &["천안", "아산", "태안", "당진", "공주", "보령", "부여"]),
    ("전북", &["전주", "군산", "익산", "무주", "고창", "정읍"]),
    ("전남", &["여수", "순천", "해남", "나주", "영암", "무안", "광양"]),
    ("경북", &["경주", "포항", "구미", "안동", "상주", "칠곡"]),
    ("경남", &["창원", "김해", "거제", "양산", "남해", "통영", "사천", "밀양"]),
    ("제주", &["서귀포", "제주시"]),
    ("인천", &["송도", "영종", "영종도"]),
    ("부산", &["기장", "해운대"]),
];

static LOOKUP: LazyLock<HashMap<String, &'static str>> = LazyLock::new(|| {
    let mut map = HashMap::new();
    for (code, aliases) in PROVINCES {
        for alias in *aliases {
            map.insert((*alias).to_lowercase(), *code);
        }
    }
    for (code, cities) in CITIES {
        for city in *cities {
            map.entry((*city).to_string()).or_insert(*code);
        }
    }
    map
});

/// Map free text to a canonical region code
///
/// Tokens are tried left to right, so `경기도 용인시 처인구` resolves on the
/// province before the city is considered.
pub fn lookup_region(text: &str) -> Option<&'static str> {
    let tokens = text
        .split(|c: char| c.is_whitespace() || matches!(c, ',' | '(' | ')' | '/' | '·'))
        .map(str::trim)
        .filter(|t| !t.is_empty());

    for token in tokens {
        let lower = token.to_lowercase();
        if let Some(code) = LOOKUP.get(&lower) {
            return Some(*code);
        }
        if let Some(code) = strip_admin_suffix(token).and_then(|t| LOOKUP.get(t)) {
            return Some(*code);
        }
        // Unspaced addresses: 경기도용인시
        if let Some(code) = PROVINCES
            .iter()
            .flat_map(|(code, aliases)| aliases.iter().map(move |a| (code, a)))
            .filter(|(_, alias)| alias.chars().count() >= 2 && !alias.is_ascii())
            .find(|(_, alias)| token.starts_with(**alias) && token.chars().count() > 3)
            .map(|(code, _)| *code)
        {
            return Some(code);
        }
    }

    None
}

/// Canonical region code, or the unclassified tag
pub fn classify_region(text: &str) -> &'static str {
    lookup_region(text).unwrap_or(UNCLASSIFIED_REGION)
}

/// `용인시` → `용인`, `가평군` → `가평`
fn strip_admin_suffix(token: &str) -> Option<&str> {
    token
        .strip_suffix('시')
        .or_else(|| token.strip_suffix('군'))
        .filter(|t| t.chars().count() >= 2)
}
