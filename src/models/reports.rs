use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Classification metrics for one evaluation run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassificationMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub auc_score: Option<f64>,
}

/// Recruiter-facing summary of a batch of skill matches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchSummary {
    pub match_percentage: f64,
    pub matched: usize,
    pub total: usize,
    pub low_confidence: Vec<String>,
    pub unmatched: Vec<String>,
}

/// Aggregate view over every version of a model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetrics {
    pub total_versions: usize,
    pub active_version: Option<String>,
    pub experiment_count: usize,
    pub avg_performance_score: Option<f64>,
    pub best_performance_score: Option<f64>,
    /// "control" plus one entry per experiment with traffic
    pub traffic_distribution: BTreeMap<String, f64>,
}

/// Whether an experiment should replace the active version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromotionRecommendation {
    pub should_promote: bool,
    pub current_active: String,
    pub current_score: Option<f64>,
    pub experiment_id: Option<Uuid>,
    pub experiment_version: Option<String>,
    pub experiment_score: Option<f64>,
    pub performance_improvement_pct: Option<f64>,
    pub sample_size: Option<u64>,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DegradationReport {
    pub is_degraded: bool,
    pub current_f1: Option<f64>,
    pub baseline_f1: Option<f64>,
    pub drop_amount: Option<f64>,
    pub drop_percentage: Option<f64>,
    pub reason: String,
}

impl DegradationReport {
    pub(crate) fn not_degraded(reason: &str) -> Self {
        Self {
            is_degraded: false,
            current_f1: None,
            baseline_f1: None,
            drop_amount: None,
            drop_percentage: None,
            reason: reason.to_string(),
        }
    }
}

/// Combined retraining decision with the reasons behind it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrainingDecision {
    pub should_retrain: bool,
    pub reasons: Vec<String>,
    pub performance_degraded: bool,
    pub sufficient_feedback: bool,
    pub interval_satisfied: bool,
    pub feedback_count: usize,
    pub days_since_last_training: Option<i64>,
}
