// Model exports
pub mod domain;
pub mod reports;
pub mod requests;

pub use domain::{
    AccuracyMetrics, AllocationDecision, AllocationType, CandidateMetadata, ConfusionMatrix,
    CorrectionAggregate, DatasetType, ExperimentConfig, FeedbackEntry, MatchResult, MatchType,
    ModelMetadata, ModelVersion, PerformanceDelta, PerformanceRecord, SynonymCandidate,
    TrainingEvent, TrainingStatus,
};
pub use reports::{
    ClassificationMetrics, DegradationReport, MatchSummary, ModelMetrics, PromotionRecommendation,
    RetrainingDecision,
};
pub use requests::NewModelVersion;
