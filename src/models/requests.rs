use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::domain::{AccuracyMetrics, ExperimentConfig, ModelMetadata};

/// Request to register a new experimental model version
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewModelVersion {
    #[validate(length(min = 1))]
    pub model_name: String,
    #[validate(length(min = 1))]
    pub version: String,
    #[serde(default)]
    pub file_path: String,
    #[serde(default)]
    #[validate(range(min = 0.0, max = 100.0))]
    pub performance_score: Option<f64>,
    #[serde(default)]
    #[validate(nested)]
    pub experiment_config: ExperimentConfig,
    #[serde(default)]
    pub accuracy_metrics: Option<AccuracyMetrics>,
    #[serde(default)]
    pub model_metadata: ModelMetadata,
}

impl NewModelVersion {
    pub fn new(model_name: &str, version: &str, traffic_percentage: f64) -> Self {
        Self {
            model_name: model_name.to_string(),
            version: version.to_string(),
            file_path: format!("models/{}/{}.bin", model_name, version),
            performance_score: None,
            experiment_config: ExperimentConfig::with_traffic(traffic_percentage),
            accuracy_metrics: None,
            model_metadata: ModelMetadata::default(),
        }
    }
}
