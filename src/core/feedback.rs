use chrono::Utc;
use std::collections::{BTreeMap, BTreeSet};

use crate::core::similarity::normalize;
use crate::models::{CandidateMetadata, CorrectionAggregate, FeedbackEntry, SynonymCandidate};

/// Corrections a canonical skill needs before it is considered at all
pub const MIN_CORRECTION_THRESHOLD: usize = 3;
/// Aggregate confidence a correction needs to become a synonym candidate
pub const MIN_SYNONYM_CONFIDENCE: f64 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AggregationSettings {
    pub min_correction_threshold: usize,
    pub min_synonym_confidence: f64,
}

impl Default for AggregationSettings {
    fn default() -> Self {
        Self {
            min_correction_threshold: MIN_CORRECTION_THRESHOLD,
            min_synonym_confidence: MIN_SYNONYM_CONFIDENCE,
        }
    }
}

/// Turns recruiter feedback into per-canonical-skill correction statistics
/// and proposes taxonomy additions from them.
#[derive(Debug, Clone, Default)]
pub struct FeedbackAggregator {
    settings: AggregationSettings,
}

impl FeedbackAggregator {
    pub fn new(settings: AggregationSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &AggregationSettings {
        &self.settings
    }

    /// Group corrections by normalized canonical skill
    ///
    /// Entries without both a shown and a corrected skill, or whose shown and
    /// corrected skills normalize to the same string, carry no signal and are
    /// skipped. Groups below the correction threshold are dropped entirely.
    pub fn aggregate(&self, entries: &[FeedbackEntry]) -> BTreeMap<String, CorrectionAggregate> {
        let threshold = self.settings.min_correction_threshold.max(1);
        let mut groups: BTreeMap<String, CorrectionAggregate> = BTreeMap::new();
        let mut skipped = 0usize;

        for entry in entries {
            let (Some(shown), Some(corrected)) = (entry.shown(), entry.corrected_skill()) else {
                skipped += 1;
                continue;
            };

            let shown = normalize(shown);
            let canonical = normalize(corrected);
            if shown.is_empty() || canonical.is_empty() || shown == canonical {
                skipped += 1;
                continue;
            }

            let group = groups.entry(canonical).or_insert_with(|| CorrectionAggregate {
                synonyms: Vec::new(),
                correction_count: 0,
                confidence: 0.0,
                sources: BTreeSet::new(),
            });

            if !group.synonyms.contains(&shown) {
                group.synonyms.push(shown);
            }
            group.correction_count += 1;
            group.sources.insert(entry.source.clone());
        }

        let total_groups = groups.len();
        groups.retain(|_, group| group.correction_count >= threshold);
        for group in groups.values_mut() {
            group.confidence = (group.correction_count as f64 / (threshold * 2) as f64).min(1.0);
        }

        tracing::debug!(
            entries = entries.len(),
            skipped,
            groups = total_groups,
            retained = groups.len(),
            "Aggregated skill corrections"
        );

        groups
    }

    /// Propose taxonomy additions from sufficiently confident corrections
    ///
    /// The output is a proposal only; approving and applying it is up to the caller.
    pub fn generate_synonym_candidates(
        &self,
        corrections: &BTreeMap<String, CorrectionAggregate>,
        organization_id: Option<&str>,
    ) -> Vec<SynonymCandidate> {
        let generated_at = Utc::now();

        corrections
            .iter()
            .filter(|(_, correction)| correction.confidence >= self.settings.min_synonym_confidence)
            .map(|(canonical, correction)| SynonymCandidate {
                canonical_skill: canonical.clone(),
                custom_synonyms: correction.synonyms.clone(),
                confidence: correction.confidence,
                correction_count: correction.correction_count,
                organization_id: organization_id.map(str::to_string),
                metadata: CandidateMetadata {
                    sources: correction.sources.iter().cloned().collect(),
                    generated_at,
                    auto_generated: true,
                },
            })
            .collect()
    }
}

/// [`FeedbackAggregator::aggregate`] with default thresholds
pub fn aggregate_corrections(entries: &[FeedbackEntry]) -> BTreeMap<String, CorrectionAggregate> {
    FeedbackAggregator::default().aggregate(entries)
}

/// [`FeedbackAggregator::generate_synonym_candidates`] with default thresholds
pub fn generate_synonym_candidates(
    corrections: &BTreeMap<String, CorrectionAggregate>,
    organization_id: Option<&str>,
) -> Vec<SynonymCandidate> {
    FeedbackAggregator::default().generate_synonym_candidates(corrections, organization_id)
}
