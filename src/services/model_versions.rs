use chrono::Utc;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;
use validator::Validate;

use crate::core::allocation::select_allocation;
use crate::models::{
    AllocationDecision, ExperimentConfig, ModelMetrics, ModelVersion, NewModelVersion,
    PromotionRecommendation,
};
use crate::services::registry::{ModelRegistry, RegistryError};

pub const DEFAULT_FALLBACK_VERSION: &str = "baseline";
pub const DEFAULT_MIN_IMPROVEMENT_PCT: f64 = 5.0;
pub const DEFAULT_MIN_SAMPLE_SIZE: u64 = 100;

/// Slack for floating point sums of traffic percentages
const TRAFFIC_EPSILON: f64 = 1e-9;

/// Errors from model lifecycle operations
#[derive(Debug, Error)]
pub enum ModelVersionError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Traffic over-allocated for {model_name}: {requested}% requested, {available}% available")]
    TrafficExceeded {
        model_name: String,
        requested: f64,
        available: f64,
    },

    #[error("Model version {0} not found")]
    NotFound(Uuid),

    #[error("Model version {id} belongs to {actual}, not {expected}")]
    WrongModel {
        id: Uuid,
        expected: String,
        actual: String,
    },

    #[error("Model version {0} is not an experiment")]
    NotExperiment(Uuid),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelSettings {
    /// Version label served when a model has no active version
    pub fallback_version: String,
    pub min_improvement_pct: f64,
    pub min_sample_size: u64,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            fallback_version: DEFAULT_FALLBACK_VERSION.to_string(),
            min_improvement_pct: DEFAULT_MIN_IMPROVEMENT_PCT,
            min_sample_size: DEFAULT_MIN_SAMPLE_SIZE,
        }
    }
}

/// Result of [`ModelVersionManager::promote_if_recommended`]
#[derive(Debug, Clone)]
pub struct PromotionOutcome {
    pub recommendation: Option<PromotionRecommendation>,
    pub promoted: Option<ModelVersion>,
}

/// Owns active/experimental model versions: traffic allocation, aggregate
/// metrics and promotion decisions
///
/// Allocation hashes user ids with `D` (SHA-256 unless built with
/// [`with_digest`](Self::with_digest)).
pub struct ModelVersionManager<D = Sha256> {
    registry: Arc<dyn ModelRegistry>,
    settings: ModelSettings,
    _digest: PhantomData<fn() -> D>,
}

impl ModelVersionManager<Sha256> {
    pub fn new(registry: Arc<dyn ModelRegistry>, settings: ModelSettings) -> Self {
        Self::with_digest(registry, settings)
    }
}

impl<D: Digest> ModelVersionManager<D> {
    pub fn with_digest(registry: Arc<dyn ModelRegistry>, settings: ModelSettings) -> Self {
        Self {
            registry,
            settings,
            _digest: PhantomData,
        }
    }

    pub fn settings(&self) -> &ModelSettings {
        &self.settings
    }

    /// The single active, non-experimental version; `None` when there is none
    pub async fn get_active_model(&self, model_name: &str) -> Result<Option<ModelVersion>, RegistryError> {
        self.registry.active_version(model_name).await
    }

    /// All experimental versions, active or not
    pub async fn get_experiment_models(&self, model_name: &str) -> Result<Vec<ModelVersion>, RegistryError> {
        self.registry.experiment_versions(model_name).await
    }

    /// All versions, newest first
    pub async fn get_all_model_versions(&self, model_name: &str) -> Result<Vec<ModelVersion>, RegistryError> {
        let mut versions = self.registry.all_versions(model_name).await?;
        versions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(versions)
    }

    /// Deterministic version choice for a user
    ///
    /// Registry failures are returned as errors, never turned into a fallback
    /// allocation.
    pub async fn allocate_model_for_user(
        &self,
        model_name: &str,
        user_id: &str,
    ) -> Result<AllocationDecision, RegistryError> {
        let active = self.registry.active_version(model_name).await?;
        let experiments = match &active {
            Some(_) => self.registry.experiment_versions(model_name).await?,
            None => {
                tracing::warn!(model = model_name, "No active model version, serving fallback");
                Vec::new()
            }
        };

        let decision = select_allocation::<D>(
            active.as_ref(),
            &experiments,
            user_id,
            &self.settings.fallback_version,
        );

        tracing::debug!(
            model = model_name,
            version = %decision.version,
            allocation = ?decision.allocation_type,
            bucket = ?decision.bucket,
            "Allocated model version"
        );

        Ok(decision)
    }

    /// Version counts, score statistics and the current traffic split
    pub async fn calculate_model_metrics(&self, model_name: &str) -> Result<ModelMetrics, RegistryError> {
        let versions = self.registry.all_versions(model_name).await?;

        let active_version = versions
            .iter()
            .find(|v| v.is_active && !v.is_experiment)
            .map(|v| v.version.clone());
        let experiments: Vec<&ModelVersion> = versions.iter().filter(|v| v.is_experiment).collect();

        let scores: Vec<f64> = versions.iter().filter_map(|v| v.performance_score).collect();
        let avg_performance_score = if scores.is_empty() {
            None
        } else {
            Some(scores.iter().sum::<f64>() / scores.len() as f64)
        };
        let best_performance_score = scores.iter().copied().reduce(f64::max);

        let experiment_traffic: f64 = experiments.iter().map(|v| v.traffic_percentage()).sum();
        let mut traffic_distribution = BTreeMap::new();
        traffic_distribution.insert("control".to_string(), (100.0 - experiment_traffic).max(0.0));
        for experiment in &experiments {
            let traffic = experiment.traffic_percentage();
            if traffic > 0.0 {
                traffic_distribution.insert(experiment.version.clone(), traffic);
            }
        }

        Ok(ModelMetrics {
            total_versions: versions.len(),
            active_version,
            experiment_count: experiments.len(),
            avg_performance_score,
            best_performance_score,
            traffic_distribution,
        })
    }

    /// Compare experiments with enough samples against the active version
    ///
    /// `None` when there is no active version or no experiment at all.
    /// Otherwise a recommendation that carries the best improvement observed,
    /// promoting only when it reaches `min_improvement_pct`.
    pub async fn recommend_promotion(
        &self,
        model_name: &str,
        min_improvement_pct: f64,
        min_sample_size: u64,
    ) -> Result<Option<PromotionRecommendation>, RegistryError> {
        let Some(active) = self.registry.active_version(model_name).await? else {
            return Ok(None);
        };
        let experiments = self.registry.experiment_versions(model_name).await?;
        if experiments.is_empty() {
            return Ok(None);
        }

        let active_score = active.performance_score.filter(|s| *s > 0.0);
        let mut best: Option<(&ModelVersion, f64)> = None;

        for experiment in &experiments {
            if experiment.sample_size() < min_sample_size {
                continue;
            }
            let (Some(current), Some(candidate)) = (active_score, experiment.performance_score) else {
                continue;
            };

            let improvement = round2((candidate - current) / current * 100.0);
            if best.map_or(true, |(_, best_improvement)| improvement > best_improvement) {
                best = Some((experiment, improvement));
            }
        }

        let recommendation = match best {
            None => PromotionRecommendation {
                should_promote: false,
                current_active: active.version.clone(),
                current_score: active.performance_score,
                experiment_id: None,
                experiment_version: None,
                experiment_score: None,
                performance_improvement_pct: None,
                sample_size: None,
                reason: format!(
                    "no experiment has a performance score and at least {} samples",
                    min_sample_size
                ),
            },
            Some((experiment, improvement)) => {
                let should_promote = improvement > 0.0 && improvement >= min_improvement_pct;
                let reason = if should_promote {
                    format!(
                        "{} improves on {} by {:.2}%",
                        experiment.version, active.version, improvement
                    )
                } else {
                    format!(
                        "best improvement {:.2}% is below the {:.2}% minimum",
                        improvement, min_improvement_pct
                    )
                };

                PromotionRecommendation {
                    should_promote,
                    current_active: active.version.clone(),
                    current_score: active.performance_score,
                    experiment_id: Some(experiment.id),
                    experiment_version: Some(experiment.version.clone()),
                    experiment_score: experiment.performance_score,
                    performance_improvement_pct: Some(improvement),
                    sample_size: Some(experiment.sample_size()),
                    reason,
                }
            }
        };

        Ok(Some(recommendation))
    }

    /// [`recommend_promotion`](Self::recommend_promotion) with the configured thresholds
    pub async fn recommend_promotion_default(
        &self,
        model_name: &str,
    ) -> Result<Option<PromotionRecommendation>, RegistryError> {
        self.recommend_promotion(
            model_name,
            self.settings.min_improvement_pct,
            self.settings.min_sample_size,
        )
        .await
    }

    /// Register a new version as an inactive experiment
    ///
    /// The active version is never touched here, so an aborted
    /// create/evaluate/promote sequence leaves serving unchanged.
    ///
    /// The traffic check and the insert are separate registry calls;
    /// callers serialize registrations for one model.
    pub async fn register_experiment(&self, request: NewModelVersion) -> Result<ModelVersion, ModelVersionError> {
        request.validate()?;

        let traffic = request.experiment_config.traffic_percentage.unwrap_or(0.0);
        self.ensure_traffic_available(&request.model_name, None, traffic).await?;

        let now = Utc::now();
        let version = ModelVersion {
            id: Uuid::new_v4(),
            model_name: request.model_name,
            version: request.version,
            file_path: request.file_path,
            performance_score: request.performance_score,
            is_active: false,
            is_experiment: true,
            experiment_config: Some(ExperimentConfig {
                started_at: request.experiment_config.started_at.or(Some(now)),
                ..request.experiment_config
            }),
            accuracy_metrics: request.accuracy_metrics,
            model_metadata: request.model_metadata,
            created_at: now,
            updated_at: now,
        };

        self.registry.insert_version(version.clone()).await?;
        tracing::info!(
            model = %version.model_name,
            version = %version.version,
            traffic,
            "Registered experimental model version"
        );
        Ok(version)
    }

    /// Change an experiment's traffic share
    pub async fn set_traffic(&self, version_id: Uuid, traffic_percentage: f64) -> Result<ModelVersion, ModelVersionError> {
        let version = self.require_version(version_id).await?;
        if !version.is_experiment {
            return Err(ModelVersionError::NotExperiment(version_id));
        }

        let config = ExperimentConfig {
            traffic_percentage: Some(traffic_percentage),
            ..version.experiment_config.clone().unwrap_or_default()
        };
        config.validate()?;
        self.ensure_traffic_available(&version.model_name, Some(version_id), traffic_percentage)
            .await?;

        let updated = self.registry.update_experiment_config(version_id, config).await?;
        tracing::info!(
            model = %updated.model_name,
            version = %updated.version,
            traffic = traffic_percentage,
            "Updated experiment traffic"
        );
        Ok(updated)
    }

    /// Make experiment `version_id` the active version of `model_name`
    ///
    /// Promoting the version that is already active is a no-op.
    pub async fn promote(&self, model_name: &str, version_id: Uuid) -> Result<ModelVersion, ModelVersionError> {
        let version = self.require_version(version_id).await?;
        if version.model_name != model_name {
            return Err(ModelVersionError::WrongModel {
                id: version_id,
                expected: model_name.to_string(),
                actual: version.model_name,
            });
        }
        if version.is_active && !version.is_experiment {
            return Ok(version);
        }
        if !version.is_experiment {
            return Err(ModelVersionError::NotExperiment(version_id));
        }

        let promoted = self.registry.promote_version(model_name, version_id).await?;
        tracing::info!(model = model_name, version = %promoted.version, "Promoted model version");
        Ok(promoted)
    }

    /// Promote the recommended experiment, if any, using the configured thresholds
    pub async fn promote_if_recommended(&self, model_name: &str) -> Result<PromotionOutcome, ModelVersionError> {
        let recommendation = self.recommend_promotion_default(model_name).await?;

        let promoted = match recommendation.as_ref() {
            Some(rec) if rec.should_promote => match rec.experiment_id {
                Some(id) => Some(self.promote(model_name, id).await?),
                None => None,
            },
            _ => None,
        };

        Ok(PromotionOutcome {
            recommendation,
            promoted,
        })
    }

    /// Remove an experiment that will not be promoted
    pub async fn discard_experiment(&self, version_id: Uuid) -> Result<(), ModelVersionError> {
        let version = self.require_version(version_id).await?;
        if !version.is_experiment {
            return Err(ModelVersionError::NotExperiment(version_id));
        }

        self.registry.delete_version(version_id).await?;
        tracing::info!(model = %version.model_name, version = %version.version, "Discarded experiment");
        Ok(())
    }

    async fn require_version(&self, version_id: Uuid) -> Result<ModelVersion, ModelVersionError> {
        self.registry
            .get_version(version_id)
            .await?
            .ok_or(ModelVersionError::NotFound(version_id))
    }

    /// Reject traffic that would push the experiments of a model past 100%
    async fn ensure_traffic_available(
        &self,
        model_name: &str,
        exclude: Option<Uuid>,
        requested: f64,
    ) -> Result<(), ModelVersionError> {
        let allocated: f64 = self
            .registry
            .experiment_versions(model_name)
            .await?
            .iter()
            .filter(|v| Some(v.id) != exclude)
            .map(|v| v.traffic_percentage())
            .sum();

        let available = (100.0 - allocated).max(0.0);
        if requested > available + TRAFFIC_EPSILON {
            return Err(ModelVersionError::TrafficExceeded {
                model_name: model_name.to_string(),
                requested,
                available,
            });
        }
        Ok(())
    }
}

#[inline]
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
