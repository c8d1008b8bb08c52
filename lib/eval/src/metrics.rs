//! Classification, regression and ranking metrics used by the evaluation
//! harnesses.

use anyhow::{bail, Result};
use serde::Serialize;

/// Binary confusion matrix, positive class = `true`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConfusionMatrix {
    pub true_negatives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
    pub true_positives: usize,
}

impl ConfusionMatrix {
    pub fn from_labels(truth: &[bool], predicted: &[bool]) -> Self {
        let mut m = Self::default();
        for (&t, &p) in truth.iter().zip(predicted) {
            match (t, p) {
                (false, false) => m.true_negatives += 1,
                (false, true) => m.false_positives += 1,
                (true, false) => m.false_negatives += 1,
                (true, true) => m.true_positives += 1,
            }
        }
        m
    }

    /// tp / (tp + fp), 0 when nothing was predicted positive
    pub fn precision(&self) -> f64 {
        ratio(self.true_positives, self.true_positives + self.false_positives)
    }

    /// tp / (tp + fn), 0 when there are no positives
    pub fn recall(&self) -> f64 {
        ratio(self.true_positives, self.true_positives + self.false_negatives)
    }

    /// Harmonic mean of precision and recall, 0 when both are 0
    pub fn f1(&self) -> f64 {
        let (p, r) = (self.precision(), self.recall());
        if p + r == 0.0 {
            0.0
        } else {
            2.0 * p * r / (p + r)
        }
    }
}

#[inline]
fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

/// Arithmetic mean, NaN for an empty slice
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Median, averaging the two middle values for even lengths. NaN when empty.
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Mean of `(ln(1 + t) - ln(1 + p))²`. Inputs must be non-negative.
pub fn mean_squared_log_error(truth: &[f64], predicted: &[f64]) -> Result<f64> {
    if truth.len() != predicted.len() {
        bail!(
            "length mismatch: {} targets, {} predictions",
            truth.len(),
            predicted.len()
        );
    }
    if truth.is_empty() {
        bail!("no values to compare");
    }
    if truth.iter().chain(predicted).any(|&v| v < 0.0) {
        bail!("mean squared log error is undefined for negative values");
    }
    let errors: Vec<f64> = truth
        .iter()
        .zip(predicted)
        .map(|(&t, &p)| (t.ln_1p() - p.ln_1p()).powi(2))
        .collect();
    Ok(mean(&errors))
}

/// Median of `|t - p|`
pub fn median_absolute_error(truth: &[f64], predicted: &[f64]) -> Result<f64> {
    if truth.len() != predicted.len() {
        bail!(
            "length mismatch: {} targets, {} predictions",
            truth.len(),
            predicted.len()
        );
    }
    let errors: Vec<f64> = truth
        .iter()
        .zip(predicted)
        .map(|(t, p)| (t - p).abs())
        .collect();
    Ok(median(&errors))
}

/// Number of ranks strictly below `k` (ranks are 0-based)
pub fn hits(ranks: &[usize], k: usize) -> usize {
    ranks.iter().filter(|&&rank| rank < k).count()
}

/// Share of ranks strictly below `k`, NaN when there are none
pub fn hit_rate(ranks: &[usize], k: usize) -> f64 {
    if ranks.is_empty() {
        return f64::NAN;
    }
    hits(ranks, k) as f64 / ranks.len() as f64
}
