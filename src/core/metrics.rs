use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

use crate::models::{ClassificationMetrics, ConfusionMatrix};

/// Label treated as the positive class for binary averaging and AUC
pub const POSITIVE_LABEL: i64 = 1;

/// Errors for malformed prediction data
#[derive(Debug, Error, PartialEq)]
pub enum MetricsError {
    #[error("No predictions supplied")]
    Empty,

    #[error("Label count mismatch: {y_true} true labels, {y_pred} predictions")]
    LengthMismatch { y_true: usize, y_pred: usize },

    #[error("Score count mismatch: {labels} labels, {scores} scores")]
    ScoreLengthMismatch { labels: usize, scores: usize },
}

/// How per-class precision/recall are combined
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Average {
    /// Scores for the positive label (1) only
    #[default]
    Binary,
    /// Unweighted mean over every label
    Macro,
    /// Global true/false positive counts
    Micro,
}

/// Accuracy, precision, recall, F1 and (binary problems with scores only) AUC
///
/// Precision or recall with a zero denominator resolve to 0.
pub fn calculate_metrics(
    y_true: &[i64],
    y_pred: &[i64],
    y_scores: Option<&[f64]>,
    average: Average,
) -> Result<ClassificationMetrics, MetricsError> {
    check_lengths(y_true, y_pred)?;
    if let Some(scores) = y_scores {
        if scores.len() != y_true.len() {
            return Err(MetricsError::ScoreLengthMismatch {
                labels: y_true.len(),
                scores: scores.len(),
            });
        }
    }

    let total = y_true.len() as f64;
    let correct = y_true.iter().zip(y_pred).filter(|(t, p)| t == p).count() as f64;
    let accuracy = correct / total;

    let (precision, recall, f1_score) = match average {
        Average::Binary => {
            let counts = LabelCounts::for_label(y_true, y_pred, POSITIVE_LABEL);
            (counts.precision(), counts.recall(), counts.f1())
        }
        Average::Macro => {
            let labels = sorted_labels(y_true, y_pred);
            let n = labels.len() as f64;
            let (p, r, f) = labels
                .iter()
                .map(|label| LabelCounts::for_label(y_true, y_pred, *label))
                .fold((0.0, 0.0, 0.0), |(p, r, f), c| {
                    (p + c.precision(), r + c.recall(), f + c.f1())
                });
            (p / n, r / n, f / n)
        }
        Average::Micro => {
            let counts = sorted_labels(y_true, y_pred)
                .iter()
                .map(|label| LabelCounts::for_label(y_true, y_pred, *label))
                .fold(LabelCounts::default(), |acc, c| LabelCounts {
                    tp: acc.tp + c.tp,
                    fp: acc.fp + c.fp,
                    fn_: acc.fn_ + c.fn_,
                });
            (counts.precision(), counts.recall(), counts.f1())
        }
    };

    let auc_score = match y_scores {
        Some(scores) if is_binary(y_true, y_pred) => roc_auc(y_true, scores),
        _ => None,
    };

    Ok(ClassificationMetrics {
        accuracy,
        precision,
        recall,
        f1_score,
        auc_score,
    })
}

/// Confusion matrix over the sorted union of labels; rows are true labels,
/// columns predictions
pub fn calculate_confusion_matrix(
    y_true: &[i64],
    y_pred: &[i64],
) -> Result<ConfusionMatrix, MetricsError> {
    check_lengths(y_true, y_pred)?;

    let labels = sorted_labels(y_true, y_pred);
    let index = |label: i64| labels.binary_search(&label).unwrap_or_default();

    let mut matrix = vec![vec![0u64; labels.len()]; labels.len()];
    for (t, p) in y_true.iter().zip(y_pred) {
        matrix[index(*t)][index(*p)] += 1;
    }

    let binary = labels.len() == 2;
    let cell = |row: usize, col: usize| binary.then(|| matrix[row][col]);

    Ok(ConfusionMatrix {
        true_negatives: cell(0, 0),
        false_positives: cell(0, 1),
        false_negatives: cell(1, 0),
        true_positives: cell(1, 1),
        shape: (labels.len(), labels.len()),
        matrix,
        labels,
    })
}

/// Area under the ROC curve via the rank-sum formulation, averaging ranks of
/// tied scores. `None` unless both classes are present.
pub fn roc_auc(y_true: &[i64], y_scores: &[f64]) -> Option<f64> {
    if y_true.len() != y_scores.len() {
        return None;
    }

    let positives = y_true.iter().filter(|&&t| t == POSITIVE_LABEL).count();
    let negatives = y_true.len() - positives;
    if positives == 0 || negatives == 0 {
        return None;
    }

    let mut order: Vec<usize> = (0..y_scores.len()).collect();
    order.sort_by(|&a, &b| {
        y_scores[a]
            .partial_cmp(&y_scores[b])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut positive_rank_sum = 0.0;
    let mut start = 0;
    while start < order.len() {
        let mut end = start;
        while end + 1 < order.len() && y_scores[order[end + 1]] == y_scores[order[start]] {
            end += 1;
        }

        // Ranks are 1-based; tied scores share the mean of their ranks
        let average_rank = (start + end) as f64 / 2.0 + 1.0;
        for &i in &order[start..=end] {
            if y_true[i] == POSITIVE_LABEL {
                positive_rank_sum += average_rank;
            }
        }
        start = end + 1;
    }

    let p = positives as f64;
    let n = negatives as f64;
    Some((positive_rank_sum - p * (p + 1.0) / 2.0) / (p * n))
}

fn check_lengths(y_true: &[i64], y_pred: &[i64]) -> Result<(), MetricsError> {
    if y_true.len() != y_pred.len() {
        return Err(MetricsError::LengthMismatch {
            y_true: y_true.len(),
            y_pred: y_pred.len(),
        });
    }
    if y_true.is_empty() {
        return Err(MetricsError::Empty);
    }
    Ok(())
}

fn sorted_labels(y_true: &[i64], y_pred: &[i64]) -> Vec<i64> {
    y_true
        .iter()
        .chain(y_pred)
        .copied()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Every label is 0 or 1
fn is_binary(y_true: &[i64], y_pred: &[i64]) -> bool {
    y_true.iter().chain(y_pred).all(|&l| l == 0 || l == POSITIVE_LABEL)
}

#[derive(Debug, Clone, Copy, Default)]
struct LabelCounts {
    tp: u64,
    fp: u64,
    fn_: u64,
}

impl LabelCounts {
    fn for_label(y_true: &[i64], y_pred: &[i64], label: i64) -> Self {
        y_true
            .iter()
            .zip(y_pred)
            .fold(Self::default(), |mut counts, (&t, &p)| {
                match (t == label, p == label) {
                    (true, true) => counts.tp += 1,
                    (false, true) => counts.fp += 1,
                    (true, false) => counts.fn_ += 1,
                    (false, false) => {}
                }
                counts
            })
    }

    fn precision(&self) -> f64 {
        ratio(self.tp, self.tp + self.fp)
    }

    fn recall(&self) -> f64 {
        ratio(self.tp, self.tp + self.fn_)
    }

    fn f1(&self) -> f64 {
        let p = self.precision();
        let r = self.recall();
        if p + r == 0.0 {
            0.0
        } else {
            2.0 * p * r / (p + r)
        }
    }
}

#[inline]
fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}
