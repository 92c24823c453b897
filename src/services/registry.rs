use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    DatasetType, ExperimentConfig, FeedbackEntry, ModelVersion, PerformanceRecord, TrainingEvent,
};

/// Errors raised by data-access collaborators
///
/// `Ok(None)` from a lookup means "there is no such row"; `Err(Unavailable)`
/// means the collaborator could not be reached and the answer is unknown.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Registry unavailable: {0}")]
    Unavailable(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Read/write access to model version rows and their performance history
#[async_trait]
pub trait ModelRegistry: Send + Sync {
    /// The version with `is_active = true` and `is_experiment = false`
    async fn active_version(&self, model_name: &str) -> Result<Option<ModelVersion>, RegistryError>;

    /// Every version with `is_experiment = true`
    async fn experiment_versions(&self, model_name: &str) -> Result<Vec<ModelVersion>, RegistryError>;

    /// Every version of a model, newest first
    async fn all_versions(&self, model_name: &str) -> Result<Vec<ModelVersion>, RegistryError>;

    async fn get_version(&self, id: Uuid) -> Result<Option<ModelVersion>, RegistryError>;

    async fn insert_version(&self, version: ModelVersion) -> Result<(), RegistryError>;

    async fn update_experiment_config(
        &self,
        id: Uuid,
        config: ExperimentConfig,
    ) -> Result<ModelVersion, RegistryError>;

    /// Activate `id` and deactivate the previous active version as one step.
    /// On error the previously active version must remain active.
    async fn promote_version(&self, model_name: &str, id: Uuid) -> Result<ModelVersion, RegistryError>;

    async fn delete_version(&self, id: Uuid) -> Result<(), RegistryError>;

    /// Performance records of a version, newest first
    async fn performance_history(
        &self,
        version_id: Uuid,
        dataset_type: Option<DatasetType>,
        limit: usize,
    ) -> Result<Vec<PerformanceRecord>, RegistryError>;

    async fn append_performance(&self, record: PerformanceRecord) -> Result<(), RegistryError>;
}

/// Read access to recruiter feedback
#[async_trait]
pub trait FeedbackSource: Send + Sync {
    async fn feedback_since(&self, since: DateTime<Utc>) -> Result<Vec<FeedbackEntry>, RegistryError>;

    async fn count_feedback_since(&self, since: DateTime<Utc>) -> Result<usize, RegistryError> {
        Ok(self.feedback_since(since).await?.len())
    }
}

/// Log of training runs per model
#[async_trait]
pub trait TrainingEventLog: Send + Sync {
    /// Most recent training event with status `completed`
    async fn last_completed_training(
        &self,
        model_name: &str,
    ) -> Result<Option<TrainingEvent>, RegistryError>;

    async fn record_training(&self, event: TrainingEvent) -> Result<(), RegistryError>;
}
