// Core algorithm exports
pub mod allocation;
pub mod degradation;
pub mod feedback;
pub mod matcher;
pub mod metrics;
pub mod similarity;
pub mod taxonomy;

pub use allocation::{order_experiments, select_allocation, traffic_bucket};
pub use degradation::{detect_performance_degradation, DegradationSettings};
pub use feedback::{aggregate_corrections, generate_synonym_candidates, AggregationSettings, FeedbackAggregator};
pub use matcher::{low_confidence_matches, match_percentage, MatchOptions, SkillMatcher};
pub use metrics::{calculate_confusion_matrix, calculate_metrics, Average, MetricsError};
pub use similarity::{fuzzy_similarity, normalize};
pub use taxonomy::{SynonymTaxonomy, TaxonomyDocument};
