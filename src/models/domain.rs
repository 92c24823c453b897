use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;
use validator::Validate;

/// Strategy that produced a skill match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    Direct,
    Context,
    Synonym,
    Fuzzy,
    None,
}

impl MatchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchType::Direct => "direct",
            MatchType::Context => "context",
            MatchType::Synonym => "synonym",
            MatchType::Fuzzy => "fuzzy",
            MatchType::None => "none",
        }
    }
}

/// Outcome of scoring a candidate skill list against one required skill
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub matched: bool,
    pub confidence: f64,
    pub matched_as: Option<String>,
    pub match_type: MatchType,
}

impl MatchResult {
    /// A miss: nothing in the candidate list satisfies the requirement
    pub fn none() -> Self {
        Self {
            matched: false,
            confidence: 0.0,
            matched_as: None,
            match_type: MatchType::None,
        }
    }

    /// A hit; confidence is clamped to [0, 1]
    pub fn hit(match_type: MatchType, confidence: f64, matched_as: impl Into<String>) -> Self {
        Self {
            matched: true,
            confidence: confidence.clamp(0.0, 1.0),
            matched_as: Some(matched_as.into()),
            match_type,
        }
    }
}

/// Recruiter feedback on a surfaced skill match. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackEntry {
    pub id: Uuid,
    #[serde(default)]
    pub shown_skill: Option<String>,
    #[serde(default)]
    pub actual_skill: Option<String>,
    #[serde(default)]
    pub recruiter_correction: Option<String>,
    pub was_correct: bool,
    #[serde(default = "default_source")]
    pub source: String,
    #[serde(default)]
    pub confidence_score: Option<f64>,
    pub created_at: DateTime<Utc>,
}

fn default_source() -> String {
    "recruiter".to_string()
}

impl FeedbackEntry {
    /// Feedback entry correcting `shown` to `corrected`
    pub fn correction(shown: &str, corrected: &str, source: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            shown_skill: Some(shown.to_string()),
            actual_skill: None,
            recruiter_correction: Some(corrected.to_string()),
            was_correct: false,
            source: source.to_string(),
            confidence_score: None,
            created_at: Utc::now(),
        }
    }

    /// The skill the recruiter says was meant: an explicit correction wins
    /// over the recorded actual skill. Blank values count as absent.
    pub fn corrected_skill(&self) -> Option<&str> {
        non_blank(self.recruiter_correction.as_deref()).or_else(|| non_blank(self.actual_skill.as_deref()))
    }

    pub fn shown(&self) -> Option<&str> {
        non_blank(self.shown_skill.as_deref())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Correction statistics for one canonical skill
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectionAggregate {
    pub synonyms: Vec<String>,
    pub correction_count: usize,
    pub confidence: f64,
    pub sources: BTreeSet<String>,
}

/// Proposed taxonomy addition awaiting external review
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynonymCandidate {
    pub canonical_skill: String,
    pub custom_synonyms: Vec<String>,
    pub confidence: f64,
    pub correction_count: usize,
    pub organization_id: Option<String>,
    pub metadata: CandidateMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateMetadata {
    pub sources: Vec<String>,
    pub generated_at: DateTime<Utc>,
    pub auto_generated: bool,
}

/// A/B experiment settings attached to a model version
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct ExperimentConfig {
    #[serde(default)]
    #[validate(range(min = 0.0, max = 100.0))]
    pub traffic_percentage: Option<f64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
}

impl ExperimentConfig {
    pub fn with_traffic(traffic_percentage: f64) -> Self {
        Self {
            traffic_percentage: Some(traffic_percentage),
            ..Self::default()
        }
    }
}

/// Evaluation metrics stored alongside a model version
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccuracyMetrics {
    #[serde(default)]
    pub accuracy: Option<f64>,
    #[serde(default)]
    pub precision: Option<f64>,
    #[serde(default)]
    pub recall: Option<f64>,
    #[serde(default)]
    pub f1_score: Option<f64>,
    #[serde(default)]
    pub auc_score: Option<f64>,
    #[serde(default)]
    pub sample_size: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    #[serde(default)]
    pub framework: Option<String>,
    #[serde(default)]
    pub training_samples: Option<u64>,
    #[serde(default)]
    pub trained_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// A persisted version of a named matching/ranking model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelVersion {
    pub id: Uuid,
    pub model_name: String,
    pub version: String,
    pub file_path: String,
    /// 0-100
    #[serde(default)]
    pub performance_score: Option<f64>,
    pub is_active: bool,
    pub is_experiment: bool,
    #[serde(default)]
    pub experiment_config: Option<ExperimentConfig>,
    #[serde(default)]
    pub accuracy_metrics: Option<AccuracyMetrics>,
    #[serde(default)]
    pub model_metadata: ModelMetadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ModelVersion {
    /// Share of live traffic routed to this version, 0 when not configured
    pub fn traffic_percentage(&self) -> f64 {
        self.experiment_config
            .as_ref()
            .and_then(|c| c.traffic_percentage)
            .unwrap_or(0.0)
    }

    /// Number of evaluated samples backing `accuracy_metrics`, 0 when unknown
    pub fn sample_size(&self) -> u64 {
        self.accuracy_metrics
            .as_ref()
            .and_then(|m| m.sample_size)
            .unwrap_or(0)
    }

    /// Stored F1 baseline, falling back to accuracy
    pub fn baseline_score(&self) -> Option<f64> {
        self.accuracy_metrics
            .as_ref()
            .and_then(|m| m.f1_score.or(m.accuracy))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetType {
    Training,
    Validation,
    Test,
    Production,
}

/// Confusion matrix with labels sorted ascending. The named cells are only
/// filled for two-label problems.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub matrix: Vec<Vec<u64>>,
    pub shape: (usize, usize),
    pub labels: Vec<i64>,
    pub true_negatives: Option<u64>,
    pub false_positives: Option<u64>,
    pub false_negatives: Option<u64>,
    pub true_positives: Option<u64>,
}

/// Change against the previous record of the same dataset type
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerformanceDelta {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: Option<f64>,
}

/// One point of the per-version, per-dataset performance time series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceRecord {
    pub id: Uuid,
    pub model_version_id: Uuid,
    pub dataset_type: DatasetType,
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: Option<f64>,
    pub auc_score: Option<f64>,
    pub sample_size: u64,
    pub confusion_matrix: Option<ConfusionMatrix>,
    pub performance_delta: Option<PerformanceDelta>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AllocationType {
    Control,
    Experiment,
    Fallback,
}

/// Which model version serves a given user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationDecision {
    pub version_id: Option<Uuid>,
    pub version: String,
    pub allocation_type: AllocationType,
    pub is_fallback: bool,
    /// Traffic bucket in [0, 100); absent when no split was computed
    pub bucket: Option<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrainingStatus {
    Started,
    Completed,
    Failed,
}

/// Entry in the training event log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingEvent {
    pub id: Uuid,
    pub model_name: String,
    pub status: TrainingStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub version_id: Option<Uuid>,
}

impl TrainingEvent {
    pub fn completed(model_name: &str, completed_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            model_name: model_name.to_string(),
            status: TrainingStatus::Completed,
            started_at: completed_at,
            completed_at: Some(completed_at),
            version_id: None,
        }
    }
}
