//! Relevance scoring — ranks stored documents against extracted
//! entities when the aggregate path yields nothing.
//!
//! Additive keyword weights over the candidate name (month and year
//! parsed from it with the same vocabulary the extractor uses) and
//! content. Sorting is stable: equal scores keep input order, which is
//! what makes the fallback deterministic.

use crate::models::{QueryEntities, StoredDocument};

use super::entities;

/// Additive weights per matched slot.
#[derive(Debug, Clone, Copy)]
pub struct ScoringWeights {
    pub year: i32,
    pub month: i32,
    pub clinic_strong: i32,
    pub clinic_token: i32,
    pub pathology: i32,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            year: 3,
            month: 4,
            clinic_strong: 5,
            clinic_token: 1,
            pathology: 2,
        }
    }
}

/// Score one candidate against the extracted entities.
fn score(entities: &QueryEntities, candidate: &StoredDocument, weights: &ScoringWeights) -> i32 {
    let name_lower = candidate.name.to_lowercase();
    let (cand_month, cand_year) = entities::month_year(&candidate.name);

    let mut total = 0;

    if let (Some(want), Some(have)) = (entities.year, cand_year) {
        if want == have {
            total += weights.year;
        }
    }

    if let (Some(want), Some(have)) = (entities.month, cand_month) {
        if want == have {
            total += weights.month;
        }
    }

    if let Some(ref clinic) = entities.clinic {
        let clinic_lower = clinic.to_lowercase();
        if name_lower.contains(&clinic_lower) {
            total += weights.clinic_strong;
        }
        if clinic_lower
            .split_whitespace()
            .any(|token| name_lower.contains(token))
        {
            total += weights.clinic_token;
        }
    }

    if let Some(ref pathology) = entities.pathology {
        let pathology_lower = pathology.to_lowercase();
        let in_content = candidate
            .raw_text
            .as_deref()
            .is_some_and(|text| text.to_lowercase().contains(&pathology_lower));
        if name_lower.contains(&pathology_lower) || in_content {
            total += weights.pathology;
        }
    }

    total
}

/// Rank candidates, most relevant first, returning at most `top_k`.
///
/// Never returns an empty sequence for a non-empty candidate set: when
/// no candidate scores above zero (or no entity was extracted at all)
/// the first `top_k` candidates in input order act as the fallback.
pub fn score_and_rank(
    entities: &QueryEntities,
    candidates: &[StoredDocument],
    top_k: usize,
) -> Vec<StoredDocument> {
    if candidates.is_empty() || top_k == 0 {
        return Vec::new();
    }

    // A fully general question matches everything; skip the scoring.
    if entities.is_empty() {
        return candidates.iter().take(top_k).cloned().collect();
    }

    let weights = ScoringWeights::default();
    let mut scored: Vec<(i32, &StoredDocument)> = candidates
        .iter()
        .map(|candidate| (score(entities, candidate, &weights), candidate))
        .collect();

    // sort_by_key is stable: ties preserve input order.
    scored.sort_by_key(|(s, _)| std::cmp::Reverse(*s));

    let top: Vec<StoredDocument> = scored
        .iter()
        .filter(|(s, _)| *s > 0)
        .take(top_k)
        .map(|(_, d)| (*d).clone())
        .collect();

    if top.is_empty() {
        // Nothing actionable in the question: show recents instead of
        // returning no evidence at all.
        candidates.iter().take(top_k).cloned().collect()
    } else {
        top
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(name: &str) -> StoredDocument {
        StoredDocument {
            id: uuid::Uuid::new_v4(),
            name: name.to_string(),
            storage_path: format!("/uploads/{name}"),
            raw_text: None,
        }
    }

    fn names(docs: &[StoredDocument]) -> Vec<&str> {
        docs.iter().map(|d| d.name.as_str()).collect()
    }

    #[test]
    fn year_and_month_outrank_year_only() {
        let entities = crate::pipeline::entities::extract("registro de enero 2024");
        let candidates = vec![
            doc("REGISTRO FEBRERO 2024.xlsx"),
            doc("REGISTRO ENERO 2024.xlsx"),
            doc("REGISTRO ENERO 2023.xlsx"),
        ];
        let ranked = score_and_rank(&entities, &candidates, 3);
        // year+month (7) > month only (4) > year only (3)
        assert_eq!(
            names(&ranked),
            vec![
                "REGISTRO ENERO 2024.xlsx",
                "REGISTRO ENERO 2023.xlsx",
                "REGISTRO FEBRERO 2024.xlsx"
            ]
        );
    }

    #[test]
    fn clinic_substring_scores_strong() {
        let entities = crate::pipeline::entities::extract("datos del cmf 5");
        let candidates = vec![doc("RESUMEN ANUAL.xlsx"), doc("CMF 5 ENERO.xlsx")];
        let ranked = score_and_rank(&entities, &candidates, 2);
        assert_eq!(ranked[0].name, "CMF 5 ENERO.xlsx");
    }

    #[test]
    fn pathology_matches_in_content() {
        let entities = crate::pipeline::entities::extract("casos de diabetes");
        let mut with_content = doc("REGISTRO MARZO 2024.xlsx");
        with_content.raw_text = Some("Diabetes\t5\t3".into());
        let candidates = vec![doc("REGISTRO ABRIL 2024.xlsx"), with_content];
        let ranked = score_and_rank(&entities, &candidates, 1);
        assert_eq!(ranked[0].name, "REGISTRO MARZO 2024.xlsx");
    }

    #[test]
    fn ties_preserve_input_order() {
        let entities = crate::pipeline::entities::extract("registro de 2024");
        let candidates = vec![
            doc("A 2024.xlsx"),
            doc("B 2024.xlsx"),
            doc("C 2024.xlsx"),
        ];
        let ranked = score_and_rank(&entities, &candidates, 3);
        assert_eq!(names(&ranked), vec!["A 2024.xlsx", "B 2024.xlsx", "C 2024.xlsx"]);
    }

    #[test]
    fn zero_score_falls_back_to_input_order() {
        let entities = crate::pipeline::entities::extract("casos de dengue en 2025");
        let candidates = vec![doc("VIEJO 2019.xlsx"), doc("OTRO 2018.xlsx")];
        let ranked = score_and_rank(&entities, &candidates, 1);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].name, "VIEJO 2019.xlsx");
    }

    #[test]
    fn no_entities_returns_first_k() {
        let entities = QueryEntities::default();
        let candidates = vec![doc("uno.xlsx"), doc("dos.xlsx"), doc("tres.xlsx")];
        let ranked = score_and_rank(&entities, &candidates, 2);
        assert_eq!(names(&ranked), vec!["uno.xlsx", "dos.xlsx"]);
    }

    #[test]
    fn never_empty_for_nonempty_candidates() {
        let entities = crate::pipeline::entities::extract("casos de asma en 2030");
        let candidates = vec![doc("cualquiera.xlsx")];
        assert_eq!(score_and_rank(&entities, &candidates, 3).len(), 1);
        assert!(score_and_rank(&entities, &[], 3).is_empty());
    }
}
