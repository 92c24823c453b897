use std::collections::BTreeMap;
use std::sync::Arc;

use crate::core::similarity::{fuzzy_similarity, normalize};
use crate::core::taxonomy::SynonymTaxonomy;
use crate::models::{MatchResult, MatchSummary, MatchType};

/// Candidate skill identical to the requirement, byte for byte after trimming
pub const EXACT_CONFIDENCE: f64 = 1.0;
/// Candidate skill identical after normalization
pub const NORMALIZED_CONFIDENCE: f64 = 0.95;
pub const CONTEXT_CONFIDENCE: f64 = 0.95;
pub const SYNONYM_CONFIDENCE: f64 = 0.85;
/// Synonym strategy hit on the implicit self-synonym
pub const SELF_SYNONYM_CONFIDENCE: f64 = 0.95;

pub const DEFAULT_FUZZY_THRESHOLD: f64 = 0.7;
pub const DEFAULT_LOW_CONFIDENCE_THRESHOLD: f64 = 0.8;

/// Tunables for the matching pipeline
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchOptions {
    pub use_fuzzy: bool,
    pub fuzzy_threshold: f64,
    pub low_confidence_threshold: f64,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            use_fuzzy: true,
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
            low_confidence_threshold: DEFAULT_LOW_CONFIDENCE_THRESHOLD,
        }
    }
}

/// Skill matching orchestrator - runs the strategy pipeline against a taxonomy snapshot
///
/// # Strategy priority (first hit wins)
/// 1. Direct match on the normalized name
/// 2. Context group match (only when a context is supplied)
/// 3. Taxonomy synonym match
/// 4. Fuzzy similarity at or above the threshold
#[derive(Debug, Clone)]
pub struct SkillMatcher {
    taxonomy: Arc<SynonymTaxonomy>,
    options: MatchOptions,
}

impl SkillMatcher {
    pub fn new(taxonomy: Arc<SynonymTaxonomy>, options: MatchOptions) -> Self {
        Self { taxonomy, options }
    }

    pub fn with_default_options(taxonomy: Arc<SynonymTaxonomy>) -> Self {
        Self::new(taxonomy, MatchOptions::default())
    }

    pub fn taxonomy(&self) -> &SynonymTaxonomy {
        &self.taxonomy
    }

    pub fn options(&self) -> &MatchOptions {
        &self.options
    }

    /// Score a candidate skill list against one required skill with the configured options
    pub fn match_one<S: AsRef<str>>(
        &self,
        candidate_skills: &[S],
        required_skill: &str,
        context: Option<&str>,
    ) -> MatchResult {
        self.match_one_with(
            candidate_skills,
            required_skill,
            context,
            self.options.use_fuzzy,
            self.options.fuzzy_threshold,
        )
    }

    /// Score a candidate skill list against one required skill
    ///
    /// # Arguments
    /// * `candidate_skills` - The candidate's skills, in the order they were listed
    /// * `required_skill` - The job requirement
    /// * `context` - Optional context group name (e.g. "web_framework")
    /// * `use_fuzzy` - Disables the fuzzy strategy when false
    /// * `fuzzy_threshold` - Minimum similarity for a fuzzy hit, inclusive
    pub fn match_one_with<S: AsRef<str>>(
        &self,
        candidate_skills: &[S],
        required_skill: &str,
        context: Option<&str>,
        use_fuzzy: bool,
        fuzzy_threshold: f64,
    ) -> MatchResult {
        let required = normalize(required_skill);
        if required.is_empty() || candidate_skills.is_empty() {
            return MatchResult::none();
        }

        // Pair each candidate with its normalized form once; blank entries never match
        let candidates: Vec<(&str, String)> = candidate_skills
            .iter()
            .map(|s| (s.as_ref(), normalize(s.as_ref())))
            .filter(|(_, normalized)| !normalized.is_empty())
            .collect();

        if candidates.is_empty() {
            return MatchResult::none();
        }

        direct_match(&candidates, required_skill, &required)
            .or_else(|| context.and_then(|ctx| self.context_match(&candidates, &required, ctx)))
            .or_else(|| self.synonym_match(&candidates, &required))
            .or_else(|| {
                if use_fuzzy {
                    fuzzy_match(&candidates, &required, fuzzy_threshold)
                } else {
                    None
                }
            })
            .unwrap_or_else(MatchResult::none)
    }

    /// Apply `match_one` to every required skill
    pub fn match_many<S, R>(
        &self,
        candidate_skills: &[S],
        required_skills: &[R],
        context: Option<&str>,
    ) -> BTreeMap<String, MatchResult>
    where
        S: AsRef<str>,
        R: AsRef<str>,
    {
        required_skills
            .iter()
            .map(|required| {
                let required = required.as_ref();
                (
                    required.to_string(),
                    self.match_one(candidate_skills, required, context),
                )
            })
            .collect()
    }

    /// Summarize a batch of results for recruiter review
    pub fn summarize(&self, results: &BTreeMap<String, MatchResult>) -> MatchSummary {
        let matched = results.values().filter(|r| r.matched).count();
        let unmatched = results
            .iter()
            .filter(|(_, r)| !r.matched)
            .map(|(skill, _)| skill.clone())
            .collect();

        MatchSummary {
            match_percentage: match_percentage(results),
            matched,
            total: results.len(),
            low_confidence: low_confidence_matches(results, self.options.low_confidence_threshold),
            unmatched,
        }
    }

    /// Stage 2: both the requirement and a candidate sit in the same entry of the context group
    fn context_match(
        &self,
        candidates: &[(&str, String)],
        required: &str,
        context: &str,
    ) -> Option<MatchResult> {
        let group = self.taxonomy.context_group(context)?;
        let entries: Vec<_> = group.values().filter(|set| set.contains(required)).collect();
        if entries.is_empty() {
            return None;
        }

        candidates
            .iter()
            .find(|(_, normalized)| entries.iter().any(|set| set.contains(normalized)))
            .map(|(raw, _)| MatchResult::hit(MatchType::Context, CONTEXT_CONFIDENCE, *raw))
    }

    /// Stage 3: a candidate is a known synonym of the requirement, or vice versa
    fn synonym_match(&self, candidates: &[(&str, String)], required: &str) -> Option<MatchResult> {
        let equivalents = self.taxonomy.equivalents(required);

        candidates.iter().find_map(|(raw, normalized)| {
            let hit = equivalents.contains(normalized)
                || self.taxonomy.equivalents(normalized).contains(required);
            if !hit {
                return None;
            }

            let confidence = if normalized == required {
                SELF_SYNONYM_CONFIDENCE
            } else {
                SYNONYM_CONFIDENCE
            };
            Some(MatchResult::hit(MatchType::Synonym, confidence, *raw))
        })
    }
}

/// Stage 1: exact match first, then normalized match, in input order
fn direct_match(
    candidates: &[(&str, String)],
    required_raw: &str,
    required: &str,
) -> Option<MatchResult> {
    let required_raw = required_raw.trim();

    candidates
        .iter()
        .find(|(raw, _)| raw.trim() == required_raw)
        .map(|(raw, _)| MatchResult::hit(MatchType::Direct, EXACT_CONFIDENCE, *raw))
        .or_else(|| {
            candidates
                .iter()
                .find(|(_, normalized)| normalized == required)
                .map(|(raw, _)| MatchResult::hit(MatchType::Direct, NORMALIZED_CONFIDENCE, *raw))
        })
}

/// Stage 4: best similarity at or above the threshold; ties keep the earliest candidate
fn fuzzy_match(
    candidates: &[(&str, String)],
    required: &str,
    threshold: f64,
) -> Option<MatchResult> {
    let mut best: Option<(&str, f64)> = None;

    for (raw, normalized) in candidates {
        let score = fuzzy_similarity(normalized, required);
        if best.map_or(true, |(_, best_score)| score > best_score) {
            best = Some((*raw, score));
        }
    }

    best.filter(|(_, score)| *score >= threshold)
        .map(|(raw, score)| MatchResult::hit(MatchType::Fuzzy, score, raw))
}

/// Share of matched requirements as a percentage, rounded to 2 decimals; 0 on empty input
pub fn match_percentage(results: &BTreeMap<String, MatchResult>) -> f64 {
    if results.is_empty() {
        return 0.0;
    }

    let matched = results.values().filter(|r| r.matched).count();
    let pct = 100.0 * matched as f64 / results.len() as f64;
    (pct * 100.0).round() / 100.0
}

/// Matched requirements whose confidence is below `threshold`, flagged for recruiter review
pub fn low_confidence_matches(
    results: &BTreeMap<String, MatchResult>,
    threshold: f64,
) -> Vec<String> {
    results
        .iter()
        .filter(|(_, r)| r.matched && r.confidence < threshold)
        .map(|(skill, _)| skill.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::taxonomy::TaxonomyDocument;

    fn create_taxonomy() -> Arc<SynonymTaxonomy> {
        let doc: TaxonomyDocument = serde_json::from_str(
            r#"{
                "web_framework": {
                    "react": ["reactjs", "react.js"],
                    "angular": ["angularjs"]
                },
                "database": {
                    "postgresql": ["postgres", "psql"]
                },
                "programming_language": {
                    "javascript": ["js", "ecmascript"]
                }
            }"#,
        )
        .unwrap();
        Arc::new(SynonymTaxonomy::from_document(&doc))
    }

    fn create_matcher() -> SkillMatcher {
        SkillMatcher::with_default_options(create_taxonomy())
    }

    #[test]
    fn test_direct_match_exact() {
        let matcher = create_matcher();
        let result = matcher.match_one(&["Rust", "Go"], "Rust", None);

        assert_eq!(result.match_type, MatchType::Direct);
        assert_eq!(result.confidence, EXACT_CONFIDENCE);
        assert_eq!(result.matched_as.as_deref(), Some("Rust"));
    }

    #[test]
    fn test_direct_match_normalized() {
        let matcher = create_matcher();
        let result = matcher.match_one(&["  node.JS "], "Node.js", None);

        assert_eq!(result.match_type, MatchType::Direct);
        assert_eq!(result.confidence, NORMALIZED_CONFIDENCE);
    }

    #[test]
    fn test_direct_outranks_synonym() {
        let matcher = create_matcher();
        // "reactjs" would hit via synonym, but "react" is a direct hit
        let result = matcher.match_one(&["ReactJS", "react"], "React", Some("web_framework"));

        assert_eq!(result.match_type, MatchType::Direct);
        assert_eq!(result.matched_as.as_deref(), Some("react"));
    }

    #[test]
    fn test_context_match() {
        let matcher = create_matcher();
        let result = matcher.match_one(&["ReactJS", "TypeScript"], "React", Some("web_framework"));

        assert_eq!(result.match_type, MatchType::Context);
        assert_eq!(result.confidence, CONTEXT_CONFIDENCE);
        assert_eq!(result.matched_as.as_deref(), Some("ReactJS"));
    }

    #[test]
    fn test_context_group_keeps_entries_apart() {
        let matcher = create_matcher();
        // Angular and React share a context group but are not interchangeable
        let result = matcher.match_one_with(&["Angular"], "React", Some("web_framework"), false, 0.7);

        assert!(!result.matched);
    }

    #[test]
    fn test_unknown_context_falls_through_to_synonym() {
        let matcher = create_matcher();
        let result = matcher.match_one(&["Postgres"], "PostgreSQL", Some("cooking"));

        assert_eq!(result.match_type, MatchType::Synonym);
        assert_eq!(result.confidence, SYNONYM_CONFIDENCE);
    }

    #[test]
    fn test_synonym_match_reverse_direction() {
        let matcher = create_matcher();
        let result = matcher.match_one(&["JavaScript"], "ECMAScript", None);

        assert_eq!(result.match_type, MatchType::Synonym);
        assert_eq!(result.matched_as.as_deref(), Some("JavaScript"));
    }

    #[test]
    fn test_fuzzy_match() {
        let matcher = create_matcher();
        let result = matcher.match_one(&["PostgreSQL"], "Postgre", None);

        assert_eq!(result.match_type, MatchType::Fuzzy);
        assert!(result.confidence > 0.7);
        assert_eq!(result.matched_as.as_deref(), Some("PostgreSQL"));
    }

    #[test]
    fn test_fuzzy_tie_keeps_first_candidate() {
        let matcher = create_matcher();
        let result = matcher.match_one(&["Kubernetez", "Kubernetex"], "Kubernetes", None);

        assert_eq!(result.match_type, MatchType::Fuzzy);
        assert_eq!(result.matched_as.as_deref(), Some("Kubernetez"));
    }

    #[test]
    fn test_fuzzy_threshold_is_inclusive() {
        let matcher = create_matcher();

        // lcs 6 over 16 characters: exactly 0.75
        let at = matcher.match_one_with(&["Postgr"], "PostgreSQL", None, true, 0.75);
        assert_eq!(at.match_type, MatchType::Fuzzy);
        assert_eq!(at.confidence, 0.75);

        let above = matcher.match_one_with(&["Postgr"], "PostgreSQL", None, true, 0.76);
        assert!(!above.matched);
    }

    #[test]
    fn test_fuzzy_disabled() {
        let matcher = create_matcher();
        let result = matcher.match_one_with(&["PostgreSQL"], "Postgre", None, false, 0.7);

        assert_eq!(result, MatchResult::none());
    }

    #[test]
    fn test_empty_inputs_yield_none() {
        let matcher = create_matcher();
        let empty: [&str; 0] = [];

        assert_eq!(matcher.match_one(&empty, "Rust", None).match_type, MatchType::None);
        assert_eq!(matcher.match_one(&["Rust"], "", None).match_type, MatchType::None);
        assert_eq!(matcher.match_one(&["Rust"], "  !! ", None).match_type, MatchType::None);
    }

    #[test]
    fn test_match_many_and_percentage() {
        let matcher = create_matcher();
        let results = matcher.match_many(
            &["Rust", "Postgres", "Docker"],
            &["Rust", "PostgreSQL", "Haskell", "Docker"],
            None,
        );

        assert_eq!(results.len(), 4);
        assert!(!results["Haskell"].matched);
        assert_eq!(match_percentage(&results), 75.0);
    }

    #[test]
    fn test_match_percentage_edges() {
        assert_eq!(match_percentage(&BTreeMap::new()), 0.0);

        let matcher = create_matcher();
        let results = matcher.match_many(&["Rust"], &["rust", "RUST"], None);
        assert_eq!(match_percentage(&results), 100.0);

        let results = matcher.match_many(&["Rust"], &["Rust", "Go", "Zig"], None);
        assert_eq!(match_percentage(&results), 33.33);
    }

    #[test]
    fn test_low_confidence_matches_skip_unmatched() {
        let matcher = create_matcher();
        let results = matcher.match_many(
            &["Rust", "Postgres"],
            &["Rust", "PostgreSQL", "Cobol"],
            None,
        );

        assert_eq!(low_confidence_matches(&results, 0.9), vec!["PostgreSQL".to_string()]);
    }

    #[test]
    fn test_summarize() {
        let matcher = create_matcher();
        let results = matcher.match_many(&["Rust", "PostgreSQL"], &["Rust", "Postgr", "Cobol"], None);
        let summary = matcher.summarize(&results);

        assert_eq!(summary.matched, 2);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.unmatched, vec!["Cobol".to_string()]);
        assert_eq!(summary.low_confidence, vec!["Postgr".to_string()]);
    }
}
