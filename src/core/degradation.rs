use crate::models::{DegradationReport, PerformanceRecord};

pub const DEFAULT_DEGRADATION_THRESHOLD: f64 = 0.05;
pub const DEFAULT_MIN_SAMPLES: u64 = 100;
pub const DEFAULT_WINDOW_SIZE: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DegradationSettings {
    /// Absolute F1 drop that counts as degradation
    pub threshold: f64,
    /// Minimum sample size of the most recent record
    pub min_samples: u64,
    /// Number of records after the most recent one that form the baseline
    pub window_size: usize,
}

impl Default for DegradationSettings {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_DEGRADATION_THRESHOLD,
            min_samples: DEFAULT_MIN_SAMPLES,
            window_size: DEFAULT_WINDOW_SIZE,
        }
    }
}

/// Compare the most recent F1 against the mean of the preceding window
///
/// `history` must be ordered newest first. Checks run in order: at least two
/// records, both values present, enough samples behind the current record,
/// and finally the drop against the threshold.
pub fn detect_performance_degradation(
    history: &[PerformanceRecord],
    settings: &DegradationSettings,
) -> DegradationReport {
    let Some((current, previous)) = history.split_first() else {
        return DegradationReport::not_degraded("insufficient history");
    };
    if previous.is_empty() {
        return DegradationReport::not_degraded("insufficient history");
    }

    let window = &previous[..settings.window_size.max(1).min(previous.len())];
    let baseline_values: Vec<f64> = window.iter().filter_map(|r| r.f1_score).collect();
    let baseline_f1 = if baseline_values.is_empty() {
        None
    } else {
        Some(baseline_values.iter().sum::<f64>() / baseline_values.len() as f64)
    };
    let current_f1 = current.f1_score;

    let (Some(current_value), Some(baseline_value)) = (current_f1, baseline_f1) else {
        return DegradationReport {
            current_f1,
            baseline_f1,
            ..DegradationReport::not_degraded("missing data")
        };
    };

    if current.sample_size < settings.min_samples {
        return DegradationReport {
            current_f1,
            baseline_f1,
            ..DegradationReport::not_degraded("insufficient sample size")
        };
    }

    let drop_amount = baseline_value - current_value;
    let drop_percentage = if baseline_value > 0.0 {
        drop_amount / baseline_value * 100.0
    } else {
        0.0
    };
    let is_degraded = drop_amount >= settings.threshold;

    let reason = if is_degraded {
        format!(
            "f1 dropped {:.4} ({:.2}%) below the {}-record baseline",
            drop_amount,
            drop_percentage,
            window.len()
        )
    } else {
        "performance stable".to_string()
    };

    DegradationReport {
        is_degraded,
        current_f1,
        baseline_f1,
        drop_amount: Some(drop_amount),
        drop_percentage: Some(drop_percentage),
        reason,
    }
}
