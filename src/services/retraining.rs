use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

use crate::models::{DatasetType, RetrainingDecision};
use crate::services::registry::{FeedbackSource, ModelRegistry, RegistryError, TrainingEventLog};

pub const DEFAULT_PERFORMANCE_THRESHOLD: f64 = 0.05;
pub const DEFAULT_MIN_FEEDBACK_SAMPLES: usize = 50;
pub const DEFAULT_MIN_INTERVAL_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetrainingPolicy {
    /// Absolute drop from the stored baseline that counts as degradation
    pub performance_threshold: f64,
    /// Feedback entries needed inside the interval window
    pub min_feedback_samples: usize,
    pub min_interval_days: i64,
}

impl Default for RetrainingPolicy {
    fn default() -> Self {
        Self {
            performance_threshold: DEFAULT_PERFORMANCE_THRESHOLD,
            min_feedback_samples: DEFAULT_MIN_FEEDBACK_SAMPLES,
            min_interval_days: DEFAULT_MIN_INTERVAL_DAYS,
        }
    }
}

/// Decides whether a model should be retrained
///
/// Retraining needs enough fresh feedback and enough time since the last
/// completed run. A degraded active model is reported as a reason but does
/// not open either gate on its own.
pub struct RetrainingTrigger {
    registry: Arc<dyn ModelRegistry>,
    feedback: Arc<dyn FeedbackSource>,
    training_log: Arc<dyn TrainingEventLog>,
    /// Production samples the latest record needs before its F1 is trusted
    min_samples: u64,
}

impl RetrainingTrigger {
    pub fn new(
        registry: Arc<dyn ModelRegistry>,
        feedback: Arc<dyn FeedbackSource>,
        training_log: Arc<dyn TrainingEventLog>,
        min_samples: u64,
    ) -> Self {
        Self {
            registry,
            feedback,
            training_log,
            min_samples,
        }
    }

    pub async fn should_trigger_retraining(
        &self,
        model_name: &str,
        policy: &RetrainingPolicy,
    ) -> Result<RetrainingDecision, RegistryError> {
        self.should_trigger_retraining_at(model_name, policy, Utc::now())
            .await
    }

    /// Same as [`should_trigger_retraining`](Self::should_trigger_retraining)
    /// evaluated at `now`
    pub async fn should_trigger_retraining_at(
        &self,
        model_name: &str,
        policy: &RetrainingPolicy,
        now: DateTime<Utc>,
    ) -> Result<RetrainingDecision, RegistryError> {
        let mut reasons = Vec::new();

        let performance_degraded = match self.degradation(model_name, policy).await? {
            Some(reason) => {
                reasons.push(reason);
                true
            }
            None => false,
        };

        let window_start = now - Duration::days(policy.min_interval_days);
        let feedback_count = self.feedback.count_feedback_since(window_start).await?;
        let sufficient_feedback = feedback_count >= policy.min_feedback_samples;
        if sufficient_feedback {
            reasons.push(format!(
                "{} feedback entries in the last {} days (minimum {})",
                feedback_count, policy.min_interval_days, policy.min_feedback_samples
            ));
        }

        let last_training = self.training_log.last_completed_training(model_name).await?;
        let days_since_last_training = last_training
            .and_then(|event| event.completed_at)
            .map(|completed| (now - completed).num_days());
        let interval_satisfied = days_since_last_training.map_or(true, |days| days >= policy.min_interval_days);
        if interval_satisfied {
            reasons.push(match days_since_last_training {
                Some(days) => format!("{} days since last training", days),
                None => "no completed training on record".to_string(),
            });
        }

        let should_retrain = sufficient_feedback && interval_satisfied;

        tracing::info!(
            model = model_name,
            should_retrain,
            performance_degraded,
            feedback_count,
            days_since_last_training = ?days_since_last_training,
            "Evaluated retraining trigger"
        );

        Ok(RetrainingDecision {
            should_retrain,
            reasons,
            performance_degraded,
            sufficient_feedback,
            interval_satisfied,
            feedback_count,
            days_since_last_training,
        })
    }

    /// Compare the latest production F1 of the active version with its stored baseline
    async fn degradation(
        &self,
        model_name: &str,
        policy: &RetrainingPolicy,
    ) -> Result<Option<String>, RegistryError> {
        let Some(active) = self.registry.active_version(model_name).await? else {
            return Ok(None);
        };
        let Some(baseline) = active.baseline_score() else {
            return Ok(None);
        };

        let latest = self
            .registry
            .performance_history(active.id, Some(DatasetType::Production), 1)
            .await?
            .into_iter()
            .next();
        let Some(record) = latest else {
            return Ok(None);
        };
        let Some(current) = record.f1_score else {
            return Ok(None);
        };

        if record.sample_size < self.min_samples {
            tracing::debug!(
                model = model_name,
                samples = record.sample_size,
                "Too few production samples for degradation check"
            );
            return Ok(None);
        }

        let drop = baseline - current;
        if drop >= policy.performance_threshold {
            Ok(Some(format!(
                "f1 {:.4} is {:.4} below the stored baseline {:.4}",
                current, drop, baseline
            )))
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AccuracyMetrics, FeedbackEntry, ModelMetadata, ModelVersion, PerformanceRecord, TrainingEvent};
    use crate::services::memory::InMemoryRegistry;
    use uuid::Uuid;

    const MODEL: &str = "skill_ranker";

    fn create_trigger(registry: &Arc<InMemoryRegistry>) -> RetrainingTrigger {
        RetrainingTrigger::new(registry.clone(), registry.clone(), registry.clone(), 100)
    }

    fn create_feedback(count: usize, at: DateTime<Utc>) -> Vec<FeedbackEntry> {
        (0..count)
            .map(|_| {
                let mut entry = FeedbackEntry::correction("reactjs", "React", "recruiter");
                entry.created_at = at;
                entry
            })
            .collect()
    }

    async fn insert_active_with_drop(registry: &InMemoryRegistry, baseline: f64, current: f64) {
        let now = Utc::now();
        let version = ModelVersion {
            id: Uuid::new_v4(),
            model_name: MODEL.to_string(),
            version: "v1".to_string(),
            file_path: String::new(),
            performance_score: Some(80.0),
            is_active: true,
            is_experiment: false,
            experiment_config: None,
            accuracy_metrics: Some(AccuracyMetrics {
                f1_score: Some(baseline),
                ..AccuracyMetrics::default()
            }),
            model_metadata: ModelMetadata::default(),
            created_at: now,
            updated_at: now,
        };
        let record = PerformanceRecord {
            id: Uuid::new_v4(),
            model_version_id: version.id,
            dataset_type: DatasetType::Production,
            accuracy: current,
            precision: current,
            recall: current,
            f1_score: Some(current),
            auc_score: None,
            sample_size: 500,
            confusion_matrix: None,
            performance_delta: None,
            created_at: now,
        };
        registry.insert_version(version).await.unwrap();
        registry.append_performance(record).await.unwrap();
    }

    #[tokio::test]
    async fn test_feedback_and_interval_trigger() {
        let registry = Arc::new(InMemoryRegistry::new());
        let now = Utc::now();
        registry.add_feedback(create_feedback(60, now - Duration::days(1))).await;
        registry
            .record_training(TrainingEvent::completed(MODEL, now - Duration::days(10)))
            .await
            .unwrap();

        let decision = create_trigger(&registry)
            .should_trigger_retraining_at(MODEL, &RetrainingPolicy::default(), now)
            .await
            .unwrap();

        assert!(decision.should_retrain);
        assert_eq!(decision.feedback_count, 60);
        assert_eq!(decision.days_since_last_training, Some(10));
        assert_eq!(decision.reasons.len(), 2);
    }

    #[tokio::test]
    async fn test_degradation_alone_does_not_trigger() {
        let registry = Arc::new(InMemoryRegistry::new());
        let now = Utc::now();
        insert_active_with_drop(&registry, 0.9, 0.7).await;
        registry.add_feedback(create_feedback(10, now - Duration::days(1))).await;

        let decision = create_trigger(&registry)
            .should_trigger_retraining_at(MODEL, &RetrainingPolicy::default(), now)
            .await
            .unwrap();

        assert!(decision.performance_degraded);
        assert!(!decision.sufficient_feedback);
        assert!(decision.interval_satisfied);
        assert!(!decision.should_retrain);
        assert!(decision.reasons.iter().any(|r| r.contains("baseline")));
    }

    #[tokio::test]
    async fn test_recent_training_blocks() {
        let registry = Arc::new(InMemoryRegistry::new());
        let now = Utc::now();
        registry.add_feedback(create_feedback(80, now - Duration::hours(6))).await;
        registry
            .record_training(TrainingEvent::completed(MODEL, now - Duration::days(2)))
            .await
            .unwrap();

        let decision = create_trigger(&registry)
            .should_trigger_retraining_at(MODEL, &RetrainingPolicy::default(), now)
            .await
            .unwrap();

        assert!(decision.sufficient_feedback);
        assert!(!decision.interval_satisfied);
        assert!(!decision.should_retrain);
    }

    #[tokio::test]
    async fn test_old_feedback_is_ignored() {
        let registry = Arc::new(InMemoryRegistry::new());
        let now = Utc::now();
        registry.add_feedback(create_feedback(80, now - Duration::days(30))).await;

        let decision = create_trigger(&registry)
            .should_trigger_retraining_at(MODEL, &RetrainingPolicy::default(), now)
            .await
            .unwrap();

        assert_eq!(decision.feedback_count, 0);
        assert!(!decision.should_retrain);
    }
}
