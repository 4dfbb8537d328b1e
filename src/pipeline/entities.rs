//! Entity extraction — free text to `QueryEntities`.
//!
//! Four slots, keyword/regex matching, fixed Spanish vocabulary. Pure
//! and total: every slot independently defaults to absent and nothing
//! here can fail. Questions and workbook file names go through the
//! same code.

use regex::Regex;

use crate::models::QueryEntities;

/// Month vocabulary, numeric codes 1..=12.
const MONTHS: &[(&str, u32)] = &[
    ("enero", 1),
    ("febrero", 2),
    ("marzo", 3),
    ("abril", 4),
    ("mayo", 5),
    ("junio", 6),
    ("julio", 7),
    ("agosto", 8),
    ("septiembre", 9),
    ("octubre", 10),
    ("noviembre", 11),
    ("diciembre", 12),
];

/// Closed pathology vocabulary: (match text, canonical name). Accented
/// and accent-free spellings map to one canonical entry; no fuzzy
/// matching beyond that.
const PATHOLOGIES: &[(&str, &str)] = &[
    ("diabetes", "diabetes"),
    ("hipertensión", "hipertensión"),
    ("hipertension", "hipertensión"),
    ("asma", "asma"),
    ("cardiopatía", "cardiopatía"),
    ("cardiopatia", "cardiopatía"),
    ("epilepsia", "epilepsia"),
    ("obesidad", "obesidad"),
    ("desnutrición", "desnutrición"),
    ("desnutricion", "desnutrición"),
    ("tuberculosis", "tuberculosis"),
    ("dengue", "dengue"),
    ("embarazo", "embarazo"),
    ("alcoholismo", "alcoholismo"),
    ("tabaquismo", "tabaquismo"),
];

/// Parse a question (or file name) into its four entity slots.
pub fn extract(text: &str) -> QueryEntities {
    let lower = text.to_lowercase();
    QueryEntities {
        month: find_month(&lower),
        year: find_year(text),
        clinic: find_clinic(&lower),
        pathology: find_pathology(&lower),
    }
}

/// Month and year only — used when scoring candidate documents by
/// their file names.
pub fn month_year(text: &str) -> (Option<u32>, Option<i32>) {
    (find_month(&text.to_lowercase()), find_year(text))
}

/// First `20xx` token in the text.
fn find_year(text: &str) -> Option<i32> {
    let year_re = Regex::new(r"(20\d{2})").unwrap();
    year_re
        .find(text)
        .and_then(|m| m.as_str().parse::<i32>().ok())
}

/// Earliest month-name mention wins. The byte position of the match is
/// the tie-breaker, so "de enero a febrero" resolves to enero
/// regardless of vocabulary order.
fn find_month(lower: &str) -> Option<u32> {
    MONTHS
        .iter()
        .filter_map(|(name, code)| lower.find(name).map(|pos| (pos, *code)))
        .min_by_key(|(pos, _)| *pos)
        .map(|(_, code)| code)
}

/// Clinic id: marker keyword + digits yields the canonical "CMF <n>";
/// marker + free text yields the trimmed, upper-cased capture.
fn find_clinic(lower: &str) -> Option<String> {
    let numbered = Regex::new(r"\b(?:cmf|consultorio)\s*(?:no\.?\s*|nº\s*|n°\s*|#\s*)?(\d{1,3})\b")
        .unwrap();
    if let Some(cap) = numbered.captures(lower) {
        return Some(format!("CMF {}", &cap[1]));
    }

    let named = Regex::new(r"\b(?:cmf|consultorio)\s+([a-záéíóúüñ][a-záéíóúüñ ]*)").unwrap();
    if let Some(cap) = named.captures(lower) {
        let name = cap[1].trim();
        if !name.is_empty() {
            return Some(name.to_uppercase());
        }
    }
    None
}

/// Earliest mention from the closed vocabulary, canonicalized.
fn find_pathology(lower: &str) -> Option<String> {
    PATHOLOGIES
        .iter()
        .filter_map(|(needle, canonical)| lower.find(needle).map(|pos| (pos, *canonical)))
        .min_by_key(|(pos, _)| *pos)
        .map(|(_, canonical)| canonical.to_string())
}
