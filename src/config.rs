use chrono::{DateTime, Utc};
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::degradation::{DegradationSettings, DEFAULT_DEGRADATION_THRESHOLD, DEFAULT_MIN_SAMPLES, DEFAULT_WINDOW_SIZE};
use crate::core::feedback::{AggregationSettings, MIN_CORRECTION_THRESHOLD, MIN_SYNONYM_CONFIDENCE};
use crate::core::matcher::{MatchOptions, DEFAULT_FUZZY_THRESHOLD, DEFAULT_LOW_CONFIDENCE_THRESHOLD};
use crate::services::model_versions::{ModelSettings, DEFAULT_FALLBACK_VERSION, DEFAULT_MIN_IMPROVEMENT_PCT, DEFAULT_MIN_SAMPLE_SIZE};
use crate::services::retraining::{RetrainingPolicy, DEFAULT_MIN_FEEDBACK_SAMPLES, DEFAULT_MIN_INTERVAL_DAYS, DEFAULT_PERFORMANCE_THRESHOLD};

const ENV_PREFIX: &str = "SKILLSYNC";

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub matching: MatchingSettings,
    #[serde(default)]
    pub feedback: FeedbackSettings,
    #[serde(default)]
    pub models: ModelsSettings,
    #[serde(default)]
    pub performance: PerformanceSettings,
    #[serde(default)]
    pub retraining: RetrainingSettings,
    #[serde(default)]
    pub taxonomy: TaxonomySettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MatchingSettings {
    #[serde(default = "default_use_fuzzy")]
    pub use_fuzzy: bool,
    #[serde(default = "default_fuzzy_threshold")]
    pub fuzzy_threshold: f64,
    #[serde(default = "default_low_confidence_threshold")]
    pub low_confidence_threshold: f64,
}

impl Default for MatchingSettings {
    fn default() -> Self {
        Self {
            use_fuzzy: default_use_fuzzy(),
            fuzzy_threshold: default_fuzzy_threshold(),
            low_confidence_threshold: default_low_confidence_threshold(),
        }
    }
}

fn default_use_fuzzy() -> bool { true }
fn default_fuzzy_threshold() -> f64 { DEFAULT_FUZZY_THRESHOLD }
fn default_low_confidence_threshold() -> f64 { DEFAULT_LOW_CONFIDENCE_THRESHOLD }

impl From<&MatchingSettings> for MatchOptions {
    fn from(settings: &MatchingSettings) -> Self {
        Self {
            use_fuzzy: settings.use_fuzzy,
            fuzzy_threshold: settings.fuzzy_threshold,
            low_confidence_threshold: settings.low_confidence_threshold,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedbackSettings {
    #[serde(default = "default_min_correction_threshold")]
    pub min_correction_threshold: usize,
    #[serde(default = "default_min_synonym_confidence")]
    pub min_synonym_confidence: f64,
    /// How far back feedback is read when aggregating corrections
    #[serde(default = "default_lookback_days")]
    pub lookback_days: i64,
}

impl Default for FeedbackSettings {
    fn default() -> Self {
        Self {
            min_correction_threshold: default_min_correction_threshold(),
            min_synonym_confidence: default_min_synonym_confidence(),
            lookback_days: default_lookback_days(),
        }
    }
}

impl FeedbackSettings {
    /// Start of the feedback window read for aggregation
    pub fn lookback_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - chrono::Duration::days(self.lookback_days)
    }
}

fn default_min_correction_threshold() -> usize { MIN_CORRECTION_THRESHOLD }
fn default_min_synonym_confidence() -> f64 { MIN_SYNONYM_CONFIDENCE }
fn default_lookback_days() -> i64 { 30 }

impl From<&FeedbackSettings> for AggregationSettings {
    fn from(settings: &FeedbackSettings) -> Self {
        Self {
            min_correction_threshold: settings.min_correction_threshold,
            min_synonym_confidence: settings.min_synonym_confidence,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelsSettings {
    #[serde(default = "default_fallback_version")]
    pub fallback_version: String,
    #[serde(default = "default_min_improvement_pct")]
    pub min_improvement_pct: f64,
    #[serde(default = "default_min_sample_size")]
    pub min_sample_size: u64,
}

impl Default for ModelsSettings {
    fn default() -> Self {
        Self {
            fallback_version: default_fallback_version(),
            min_improvement_pct: default_min_improvement_pct(),
            min_sample_size: default_min_sample_size(),
        }
    }
}

fn default_fallback_version() -> String { DEFAULT_FALLBACK_VERSION.to_string() }
fn default_min_improvement_pct() -> f64 { DEFAULT_MIN_IMPROVEMENT_PCT }
fn default_min_sample_size() -> u64 { DEFAULT_MIN_SAMPLE_SIZE }

impl From<&ModelsSettings> for ModelSettings {
    fn from(settings: &ModelsSettings) -> Self {
        Self {
            fallback_version: settings.fallback_version.clone(),
            min_improvement_pct: settings.min_improvement_pct,
            min_sample_size: settings.min_sample_size,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PerformanceSettings {
    #[serde(default = "default_degradation_threshold")]
    pub degradation_threshold: f64,
    #[serde(default = "default_min_samples")]
    pub min_samples: u64,
    #[serde(default = "default_window_size")]
    pub window_size: usize,
}

impl Default for PerformanceSettings {
    fn default() -> Self {
        Self {
            degradation_threshold: default_degradation_threshold(),
            min_samples: default_min_samples(),
            window_size: default_window_size(),
        }
    }
}

fn default_degradation_threshold() -> f64 { DEFAULT_DEGRADATION_THRESHOLD }
fn default_min_samples() -> u64 { DEFAULT_MIN_SAMPLES }
fn default_window_size() -> usize { DEFAULT_WINDOW_SIZE }

impl From<&PerformanceSettings> for DegradationSettings {
    fn from(settings: &PerformanceSettings) -> Self {
        Self {
            threshold: settings.degradation_threshold,
            min_samples: settings.min_samples,
            window_size: settings.window_size,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetrainingSettings {
    #[serde(default = "default_performance_threshold")]
    pub performance_threshold: f64,
    #[serde(default = "default_min_feedback_samples")]
    pub min_feedback_samples: usize,
    #[serde(default = "default_min_interval_days")]
    pub min_interval_days: i64,
}

impl Default for RetrainingSettings {
    fn default() -> Self {
        Self {
            performance_threshold: default_performance_threshold(),
            min_feedback_samples: default_min_feedback_samples(),
            min_interval_days: default_min_interval_days(),
        }
    }
}

fn default_performance_threshold() -> f64 { DEFAULT_PERFORMANCE_THRESHOLD }
fn default_min_feedback_samples() -> usize { DEFAULT_MIN_FEEDBACK_SAMPLES }
fn default_min_interval_days() -> i64 { DEFAULT_MIN_INTERVAL_DAYS }

impl From<&RetrainingSettings> for RetrainingPolicy {
    fn from(settings: &RetrainingSettings) -> Self {
        Self {
            performance_threshold: settings.performance_threshold,
            min_feedback_samples: settings.min_feedback_samples,
            min_interval_days: settings.min_interval_days,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TaxonomySettings {
    /// JSON taxonomy file; the built-in taxonomy is used when unset
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Directory holding `<organization_id>.json` overlays
    #[serde(default)]
    pub overlay_dir: Option<PathBuf>,
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: u64,
    #[serde(default)]
    pub ttl_secs: Option<u64>,
}

impl Default for TaxonomySettings {
    fn default() -> Self {
        Self {
            path: None,
            overlay_dir: None,
            cache_capacity: default_cache_capacity(),
            ttl_secs: None,
        }
    }
}

fn default_cache_capacity() -> u64 { 64 }

impl TaxonomySettings {
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration files (config/default, config/local)
    /// 3. Environment variables (prefixed with SKILLSYNC__)
    pub fn load() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., SKILLSYNC__MATCHING__FUZZY_THRESHOLD -> matching.fuzzy_threshold
            .add_source(environment())
            .build()?
            .try_deserialize()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(environment())
            .build()?
            .try_deserialize()
    }
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}
