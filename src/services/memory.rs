use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{
    DatasetType, ExperimentConfig, FeedbackEntry, ModelVersion, PerformanceRecord, TrainingEvent,
    TrainingStatus,
};
use crate::services::registry::{FeedbackSource, ModelRegistry, RegistryError, TrainingEventLog};

#[derive(Debug, Default)]
struct RegistryState {
    versions: Vec<ModelVersion>,
    performance: Vec<PerformanceRecord>,
    feedback: Vec<FeedbackEntry>,
    training: Vec<TrainingEvent>,
}

/// In-process registry backing every collaborator trait
///
/// All mutations of one call happen under a single write lock, so
/// `promote_version` is atomic with respect to concurrent readers.
#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    state: RwLock<RegistryState>,
    unavailable: AtomicBool,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail with `RegistryError::Unavailable`
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Append feedback entries
    pub async fn add_feedback(&self, entries: impl IntoIterator<Item = FeedbackEntry>) {
        self.state.write().await.feedback.extend(entries);
    }

    fn check(&self) -> Result<(), RegistryError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RegistryError::Unavailable(
                "in-memory registry marked unavailable".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl ModelRegistry for InMemoryRegistry {
    async fn active_version(&self, model_name: &str) -> Result<Option<ModelVersion>, RegistryError> {
        self.check()?;
        let state = self.state.read().await;
        Ok(state
            .versions
            .iter()
            .filter(|v| v.model_name == model_name && v.is_active && !v.is_experiment)
            .max_by_key(|v| v.updated_at)
            .cloned())
    }

    async fn experiment_versions(&self, model_name: &str) -> Result<Vec<ModelVersion>, RegistryError> {
        self.check()?;
        let state = self.state.read().await;
        let mut experiments: Vec<ModelVersion> = state
            .versions
            .iter()
            .filter(|v| v.model_name == model_name && v.is_experiment)
            .cloned()
            .collect();
        experiments.sort_by_key(|v| v.created_at);
        Ok(experiments)
    }

    async fn all_versions(&self, model_name: &str) -> Result<Vec<ModelVersion>, RegistryError> {
        self.check()?;
        let state = self.state.read().await;
        let mut versions: Vec<ModelVersion> = state
            .versions
            .iter()
            .filter(|v| v.model_name == model_name)
            .cloned()
            .collect();
        versions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(versions)
    }

    async fn get_version(&self, id: Uuid) -> Result<Option<ModelVersion>, RegistryError> {
        self.check()?;
        let state = self.state.read().await;
        Ok(state.versions.iter().find(|v| v.id == id).cloned())
    }

    async fn insert_version(&self, version: ModelVersion) -> Result<(), RegistryError> {
        self.check()?;
        let mut state = self.state.write().await;

        if state.versions.iter().any(|v| v.id == version.id) {
            return Err(RegistryError::Conflict(format!("version {} already exists", version.id)));
        }

        let second_active = version.is_active
            && !version.is_experiment
            && state.versions.iter().any(|v| {
                v.model_name == version.model_name && v.is_active && !v.is_experiment
            });
        if second_active {
            return Err(RegistryError::Conflict(format!(
                "{} already has an active version",
                version.model_name
            )));
        }

        state.versions.push(version);
        Ok(())
    }

    async fn update_experiment_config(
        &self,
        id: Uuid,
        config: ExperimentConfig,
    ) -> Result<ModelVersion, RegistryError> {
        self.check()?;
        let mut state = self.state.write().await;
        let version = state
            .versions
            .iter_mut()
            .find(|v| v.id == id)
            .ok_or_else(|| RegistryError::NotFound(format!("model version {}", id)))?;

        version.experiment_config = Some(config);
        version.updated_at = Utc::now();
        Ok(version.clone())
    }

    async fn promote_version(&self, model_name: &str, id: Uuid) -> Result<ModelVersion, RegistryError> {
        self.check()?;
        let mut state = self.state.write().await;

        let target = state
            .versions
            .iter()
            .position(|v| v.id == id && v.model_name == model_name)
            .ok_or_else(|| RegistryError::NotFound(format!("{} version {}", model_name, id)))?;

        let now = Utc::now();
        for (index, version) in state.versions.iter_mut().enumerate() {
            if version.model_name != model_name {
                continue;
            }
            if index == target {
                version.is_active = true;
                version.is_experiment = false;
                version.updated_at = now;
            } else if version.is_active && !version.is_experiment {
                version.is_active = false;
                version.updated_at = now;
            }
        }

        Ok(state.versions[target].clone())
    }

    async fn delete_version(&self, id: Uuid) -> Result<(), RegistryError> {
        self.check()?;
        let mut state = self.state.write().await;
        let before = state.versions.len();
        state.versions.retain(|v| v.id != id);
        if state.versions.len() == before {
            return Err(RegistryError::NotFound(format!("model version {}", id)));
        }
        Ok(())
    }

    async fn performance_history(
        &self,
        version_id: Uuid,
        dataset_type: Option<DatasetType>,
        limit: usize,
    ) -> Result<Vec<PerformanceRecord>, RegistryError> {
        self.check()?;
        let state = self.state.read().await;

        // Reverse insertion order so equal timestamps still come back newest first
        let mut records: Vec<PerformanceRecord> = state
            .performance
            .iter()
            .rev()
            .filter(|r| r.model_version_id == version_id)
            .filter(|r| dataset_type.map_or(true, |d| r.dataset_type == d))
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records.truncate(limit);
        Ok(records)
    }

    async fn append_performance(&self, record: PerformanceRecord) -> Result<(), RegistryError> {
        self.check()?;
        self.state.write().await.performance.push(record);
        Ok(())
    }
}

#[async_trait]
impl FeedbackSource for InMemoryRegistry {
    async fn feedback_since(&self, since: DateTime<Utc>) -> Result<Vec<FeedbackEntry>, RegistryError> {
        self.check()?;
        let state = self.state.read().await;
        Ok(state
            .feedback
            .iter()
            .filter(|f| f.created_at >= since)
            .cloned()
            .collect())
    }

    async fn count_feedback_since(&self, since: DateTime<Utc>) -> Result<usize, RegistryError> {
        self.check()?;
        let state = self.state.read().await;
        Ok(state.feedback.iter().filter(|f| f.created_at >= since).count())
    }
}

#[async_trait]
impl TrainingEventLog for InMemoryRegistry {
    async fn last_completed_training(
        &self,
        model_name: &str,
    ) -> Result<Option<TrainingEvent>, RegistryError> {
        self.check()?;
        let state = self.state.read().await;
        Ok(state
            .training
            .iter()
            .filter(|e| e.model_name == model_name && e.status == TrainingStatus::Completed)
            .filter(|e| e.completed_at.is_some())
            .max_by_key(|e| e.completed_at)
            .cloned())
    }

    async fn record_training(&self, event: TrainingEvent) -> Result<(), RegistryError> {
        self.check()?;
        self.state.write().await.training.push(event);
        Ok(())
    }
}
