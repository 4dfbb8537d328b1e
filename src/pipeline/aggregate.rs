//! Aggregate query building — extracted entities into a record filter.
//!
//! Clinic filters by name equality, pathology by containment. Month
//! and year are extracted from questions but Records carry no temporal
//! attribute, so those slots deliberately do not reach the filter;
//! they still steer document relevance on the fallback path.

use crate::models::{AggregateFilter, QueryEntities};

/// Build the aggregation filter for the extracted entities. With no
/// applicable slot the aggregate runs unfiltered (still row-capped by
/// the store).
pub fn build_filter(entities: &QueryEntities) -> AggregateFilter {
    AggregateFilter {
        clinic_eq: entities.clinic.clone(),
        pathology_contains: entities.pathology.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::entities::extract;

    #[test]
    fn clinic_and_pathology_reach_the_filter() {
        let filter = build_filter(&extract("casos de asma en el cmf 5"));
        assert_eq!(filter.clinic_eq.as_deref(), Some("CMF 5"));
        assert_eq!(filter.pathology_contains.as_deref(), Some("asma"));
    }

    #[test]
    fn month_and_year_are_not_applied() {
        // "casos de diabetes en 2024": year extracted but absent from
        // the filter — records have no temporal attribute to match.
        let entities = extract("casos de diabetes en enero de 2024");
        assert_eq!(entities.year, Some(2024));
        assert_eq!(entities.month, Some(1));

        let filter = build_filter(&entities);
        assert_eq!(filter.pathology_contains.as_deref(), Some("diabetes"));
        assert!(filter.clinic_eq.is_none());
        assert_eq!(
            filter,
            AggregateFilter {
                clinic_eq: None,
                pathology_contains: Some("diabetes".into()),
            }
        );
    }

    #[test]
    fn empty_entities_mean_unfiltered() {
        let filter = build_filter(&QueryEntities::default());
        assert_eq!(filter, AggregateFilter::default());
    }
}
