//! Skillsync - adaptive skill matching and model lifecycle engine
//!
//! Matches candidate skills against job requirements through a synonym
//! taxonomy, learns new synonyms from recruiter corrections, and manages the
//! versioned models that rank candidates: deterministic A/B allocation,
//! performance tracking, promotion and retraining decisions.

pub mod config;
pub mod core;
pub mod models;
pub mod services;
pub mod telemetry;

// Re-export commonly used types
pub use core::{fuzzy_similarity, normalize, FeedbackAggregator, SkillMatcher, SynonymTaxonomy};
pub use models::{AllocationDecision, FeedbackEntry, MatchResult, MatchType, ModelVersion, SynonymCandidate};
pub use services::{InMemoryRegistry, ModelVersionManager, PerformanceTracker, RetrainingTrigger, TaxonomyStore};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        let taxonomy = SynonymTaxonomy::from_document(
            &serde_json::from_str(r#"{"database": {"postgresql": ["postgres"]}}"#).unwrap(),
        );
        let matcher = SkillMatcher::with_default_options(std::sync::Arc::new(taxonomy));

        let result = matcher.match_one(&["Postgres"], "PostgreSQL", None);
        assert!(result.matched);
        assert_eq!(result.match_type, MatchType::Synonym);
    }
}
