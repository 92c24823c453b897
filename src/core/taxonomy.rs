use std::collections::{BTreeMap, BTreeSet};

use crate::core::similarity::normalize;
use crate::models::SynonymCandidate;

/// Raw taxonomy shape: `{context_group: {canonical_skill: [synonym, ...]}}`
pub type TaxonomyDocument = BTreeMap<String, BTreeMap<String, Vec<String>>>;

/// Canonical skill -> interchangeable names (canonical included) within one context
pub type ContextGroup = BTreeMap<String, BTreeSet<String>>;

/// Normalized synonym taxonomy
///
/// Every name is stored in normalized form, and every canonical skill's
/// synonym set contains the canonical name itself. Synonym sets are the union
/// of the canonical skill's entries across all context groups; context groups
/// keep their own per-context sets for context-scoped matching.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SynonymTaxonomy {
    synonyms: BTreeMap<String, BTreeSet<String>>,
    contexts: BTreeMap<String, ContextGroup>,
}

impl SynonymTaxonomy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a taxonomy from its document form. Blank names are skipped.
    pub fn from_document(document: &TaxonomyDocument) -> Self {
        let mut taxonomy = Self::new();

        for (context, entries) in document {
            let group_key = context_key(context);
            for (canonical, synonyms) in entries {
                let canonical_key = normalize(canonical);
                if canonical_key.is_empty() {
                    continue;
                }

                let mut set = BTreeSet::new();
                set.insert(canonical_key.clone());
                set.extend(synonyms.iter().map(|s| normalize(s)).filter(|s| !s.is_empty()));

                taxonomy
                    .synonyms
                    .entry(canonical_key.clone())
                    .or_default()
                    .extend(set.iter().cloned());

                if !group_key.is_empty() {
                    taxonomy
                        .contexts
                        .entry(group_key.clone())
                        .or_default()
                        .entry(canonical_key)
                        .or_default()
                        .extend(set);
                }
            }
        }

        taxonomy
    }

    /// Overlay another taxonomy on top of this one (set union)
    pub fn merge(&mut self, overlay: &SynonymTaxonomy) {
        for (canonical, set) in &overlay.synonyms {
            self.synonyms
                .entry(canonical.clone())
                .or_default()
                .extend(set.iter().cloned());
        }

        for (context, group) in &overlay.contexts {
            let target = self.contexts.entry(context.clone()).or_default();
            for (canonical, set) in group {
                target
                    .entry(canonical.clone())
                    .or_default()
                    .extend(set.iter().cloned());
            }
        }
    }

    /// Consuming variant of [`merge`](Self::merge)
    pub fn merged(mut self, overlay: &SynonymTaxonomy) -> Self {
        self.merge(overlay);
        self
    }

    /// Add synonyms to a canonical skill, creating it when unknown
    pub fn add_synonyms<I, S>(&mut self, canonical: &str, synonyms: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let canonical_key = normalize(canonical);
        if canonical_key.is_empty() {
            return;
        }

        let set = self.synonyms.entry(canonical_key.clone()).or_default();
        set.insert(canonical_key);
        set.extend(
            synonyms
                .into_iter()
                .map(|s| normalize(s.as_ref()))
                .filter(|s| !s.is_empty()),
        );
    }

    /// Apply an approved synonym candidate
    pub fn apply_candidate(&mut self, candidate: &SynonymCandidate) {
        self.add_synonyms(&candidate.canonical_skill, &candidate.custom_synonyms);
    }

    /// Synonym set of a canonical skill
    pub fn synonyms_of(&self, canonical: &str) -> Option<&BTreeSet<String>> {
        self.synonyms.get(&normalize(canonical))
    }

    /// Canonical name a skill belongs to; a canonical name maps to itself
    pub fn canonical_of(&self, skill: &str) -> Option<&str> {
        let key = normalize(skill);
        if let Some((canonical, _)) = self.synonyms.get_key_value(&key) {
            return Some(canonical.as_str());
        }

        self.synonyms
            .iter()
            .find(|(_, set)| set.contains(&key))
            .map(|(canonical, _)| canonical.as_str())
    }

    /// Every name interchangeable with `skill`, including `skill` itself
    ///
    /// A skill absent from the taxonomy yields the single-element set
    /// containing its own normalized form.
    pub fn equivalents(&self, skill: &str) -> BTreeSet<String> {
        let key = normalize(skill);
        let mut result = BTreeSet::new();

        for (canonical, set) in &self.synonyms {
            if *canonical == key || set.contains(&key) {
                result.extend(set.iter().cloned());
            }
        }

        if !key.is_empty() {
            result.insert(key);
        }
        result
    }

    /// Context group lookup, case-insensitive on the group name
    pub fn context_group(&self, context: &str) -> Option<&ContextGroup> {
        self.contexts.get(&context_key(context))
    }

    pub fn context_names(&self) -> impl Iterator<Item = &str> {
        self.contexts.keys().map(|k| k.as_str())
    }

    /// Number of canonical skills
    pub fn len(&self) -> usize {
        self.synonyms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.synonyms.is_empty()
    }
}

/// Context group names are compared case-insensitively but otherwise verbatim
fn context_key(name: &str) -> String {
    name.trim().to_lowercase()
}

impl From<&TaxonomyDocument> for SynonymTaxonomy {
    fn from(document: &TaxonomyDocument) -> Self {
        Self::from_document(document)
    }
}
