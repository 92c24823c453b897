use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::core::degradation::{detect_performance_degradation, DegradationSettings};
use crate::core::metrics::{calculate_confusion_matrix, calculate_metrics, Average, MetricsError};
use crate::models::{DatasetType, DegradationReport, PerformanceDelta, PerformanceRecord};
use crate::services::registry::{ModelRegistry, RegistryError};

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("Metrics error: {0}")]
    Metrics(#[from] MetricsError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("Model version {0} not found")]
    UnknownVersion(Uuid),
}

/// Records evaluation runs and watches them for regressions
pub struct PerformanceTracker {
    registry: Arc<dyn ModelRegistry>,
    settings: DegradationSettings,
}

impl PerformanceTracker {
    pub fn new(registry: Arc<dyn ModelRegistry>, settings: DegradationSettings) -> Self {
        Self { registry, settings }
    }

    pub fn settings(&self) -> &DegradationSettings {
        &self.settings
    }

    /// Evaluate predictions for a version and append the result to its history
    ///
    /// The delta is taken against the latest record with the same dataset type.
    pub async fn record_performance(
        &self,
        version_id: Uuid,
        dataset_type: DatasetType,
        y_true: &[i64],
        y_pred: &[i64],
        y_scores: Option<&[f64]>,
        average: Average,
    ) -> Result<PerformanceRecord, TrackerError> {
        let metrics = calculate_metrics(y_true, y_pred, y_scores, average)?;
        let confusion_matrix = calculate_confusion_matrix(y_true, y_pred)?;

        if self.registry.get_version(version_id).await?.is_none() {
            return Err(TrackerError::UnknownVersion(version_id));
        }

        let previous = self
            .registry
            .performance_history(version_id, Some(dataset_type), 1)
            .await?
            .into_iter()
            .next();

        let performance_delta = previous.map(|prev| PerformanceDelta {
            accuracy: metrics.accuracy - prev.accuracy,
            precision: metrics.precision - prev.precision,
            recall: metrics.recall - prev.recall,
            f1_score: prev.f1_score.map(|f1| metrics.f1_score - f1),
        });

        let record = PerformanceRecord {
            id: Uuid::new_v4(),
            model_version_id: version_id,
            dataset_type,
            accuracy: metrics.accuracy,
            precision: metrics.precision,
            recall: metrics.recall,
            f1_score: Some(metrics.f1_score),
            auc_score: metrics.auc_score,
            sample_size: y_true.len() as u64,
            confusion_matrix: Some(confusion_matrix),
            performance_delta,
            created_at: Utc::now(),
        };

        self.registry.append_performance(record.clone()).await?;
        tracing::info!(
            version_id = %version_id,
            dataset = ?dataset_type,
            f1 = metrics.f1_score,
            samples = record.sample_size,
            "Recorded model performance"
        );

        Ok(record)
    }

    /// Stored records, newest first
    pub async fn history(
        &self,
        version_id: Uuid,
        dataset_type: Option<DatasetType>,
        limit: usize,
    ) -> Result<Vec<PerformanceRecord>, TrackerError> {
        Ok(self
            .registry
            .performance_history(version_id, dataset_type, limit)
            .await?)
    }

    /// Run the degradation detector over the latest record and its baseline window
    pub async fn detect_degradation(
        &self,
        version_id: Uuid,
        dataset_type: DatasetType,
    ) -> Result<DegradationReport, TrackerError> {
        let history = self
            .history(version_id, Some(dataset_type), self.settings.window_size + 1)
            .await?;
        let report = detect_performance_degradation(&history, &self.settings);

        if report.is_degraded {
            tracing::warn!(version_id = %version_id, reason = %report.reason, "Performance degradation detected");
        } else {
            tracing::debug!(version_id = %version_id, reason = %report.reason, "No degradation");
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ModelMetadata, ModelVersion};
    use crate::services::memory::InMemoryRegistry;

    async fn create_tracker() -> (PerformanceTracker, Uuid) {
        let registry = Arc::new(InMemoryRegistry::new());
        let now = Utc::now();
        let version = ModelVersion {
            id: Uuid::new_v4(),
            model_name: "skill_ranker".to_string(),
            version: "v1".to_string(),
            file_path: String::new(),
            performance_score: None,
            is_active: true,
            is_experiment: false,
            experiment_config: None,
            accuracy_metrics: None,
            model_metadata: ModelMetadata::default(),
            created_at: now,
            updated_at: now,
        };
        let id = version.id;
        registry.insert_version(version).await.unwrap();

        let settings = DegradationSettings {
            min_samples: 4,
            window_size: 2,
            ..DegradationSettings::default()
        };
        (PerformanceTracker::new(registry, settings), id)
    }

    #[tokio::test]
    async fn test_record_computes_delta_per_dataset() {
        let (tracker, id) = create_tracker().await;

        let first = tracker
            .record_performance(id, DatasetType::Production, &[1, 1, 0, 0], &[1, 1, 0, 0], None, Average::Binary)
            .await
            .unwrap();
        assert!(first.performance_delta.is_none());
        assert_eq!(first.confusion_matrix.unwrap().true_positives, Some(2));

        tracker
            .record_performance(id, DatasetType::Validation, &[1, 0], &[0, 0], None, Average::Binary)
            .await
            .unwrap();

        let second = tracker
            .record_performance(id, DatasetType::Production, &[1, 1, 0, 0], &[1, 0, 0, 0], None, Average::Binary)
            .await
            .unwrap();
        let delta = second.performance_delta.unwrap();
        assert!((delta.accuracy + 0.25).abs() < 1e-9);
        assert!(delta.f1_score.unwrap() < 0.0);
    }

    #[tokio::test]
    async fn test_detect_degradation_over_history() {
        let (tracker, id) = create_tracker().await;
        let perfect = [1, 1, 0, 0];

        for _ in 0..2 {
            tracker
                .record_performance(id, DatasetType::Production, &perfect, &perfect, None, Average::Binary)
                .await
                .unwrap();
        }
        let report = tracker.detect_degradation(id, DatasetType::Production).await.unwrap();
        assert!(!report.is_degraded);

        tracker
            .record_performance(id, DatasetType::Production, &perfect, &[0, 0, 0, 0], None, Average::Binary)
            .await
            .unwrap();
        let report = tracker.detect_degradation(id, DatasetType::Production).await.unwrap();
        assert!(report.is_degraded);
        assert_eq!(report.current_f1, Some(0.0));
        assert_eq!(report.baseline_f1, Some(1.0));
    }

    #[tokio::test]
    async fn test_rejects_bad_input_and_unknown_version() {
        let (tracker, id) = create_tracker().await;

        let result = tracker
            .record_performance(id, DatasetType::Test, &[1, 0], &[1], None, Average::Binary)
            .await;
        assert!(matches!(result, Err(TrackerError::Metrics(MetricsError::LengthMismatch { .. }))));

        let result = tracker
            .record_performance(Uuid::new_v4(), DatasetType::Test, &[1], &[1], None, Average::Binary)
            .await;
        assert!(matches!(result, Err(TrackerError::UnknownVersion(_))));
    }
}
