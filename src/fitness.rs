//! This module implements the online (Welford) statistics used while learning
//! and evaluating the rule tree.

use serde_derive::{Deserialize, Serialize};

/// Smallest standard deviation treated as different from an exactly constant
/// target. Nodes whose stdev falls below it are never split.
pub const EPSILON: f64 = 16.0 * std::f64::EPSILON;

/// Delta to add to `mean` once `x` becomes the `n`-th item.
pub fn mean_delta(x: f64, mean: f64, n: usize) -> f64 {
    (x - mean) / (n as f64)
}

/// Delta to add to the sum of squared deviations from the mean, given the
/// mean after (`new_mean`) and before (`old_mean`) `x` was seen.
pub fn sum_sq_dev_delta(x: f64, new_mean: f64, old_mean: f64) -> f64 {
    (x - old_mean) * (x - new_mean)
}

/// Sample standard deviation with Bessel's correction. A single item has no
/// spread.
///
/// # Example
/// ```rust
/// use ruletree::fitness::stdev;
/// assert_eq!(stdev(0.0, 1), 0.0);
/// assert_eq!(stdev(8.0, 3), 2.0);
/// ```
pub fn stdev(sum_sq_dev: f64, n: usize) -> f64 {
    if n > 1 {
        (sum_sq_dev / ((n - 1) as f64)).sqrt()
    } else {
        0.0
    }
}

/// Percentage reduction of the parent's variance achieved by children whose
/// weighted average variance is `weighted_child_var`. Negative when the split
/// makes things worse.
pub fn variance_reduction_pct(parent_sum_sq_dev: f64, parent_size: usize, weighted_child_var: f64) -> f64 {
    let parent_var = parent_sum_sq_dev / (parent_size as f64);
    (parent_var - weighted_child_var) * 100.0 / parent_var
}

/// Rounds to 4 decimal places, the precision used by metrics and summaries.
pub fn round4(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}

/// Running count, mean and sum of squared deviations from the mean.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunningStats {
    pub size: usize,
    pub mean: f64,
    pub sum_sq_dev: f64,
}

impl RunningStats {
    pub fn new() -> Self {
        RunningStats::default()
    }

    /// Folds `x` in: count first, then the mean with the new count, then the
    /// squared deviation with the new and the previous mean.
    pub fn push(&mut self, x: f64) {
        let prev_mean = self.mean;
        self.size += 1;
        self.mean += mean_delta(x, self.mean, self.size);
        self.sum_sq_dev += sum_sq_dev_delta(x, self.mean, prev_mean);
    }

    pub fn stdev(&self) -> f64 {
        stdev(self.sum_sq_dev, self.size)
    }
}

/// Compares predictions with true target values one record at a time.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EvaluationAccumulator {
    pub size: usize,
    pub mean: f64,
    pub prev_mean: f64,
    /// Sum of squared deviations of the true values from their mean.
    pub grand_sum_sq_dev_from_mean: f64,
    /// Sum of squared deviations of the true values from the predictions.
    pub sum_sq_dev_from_prediction: f64,
}

impl EvaluationAccumulator {
    pub fn new() -> Self {
        EvaluationAccumulator::default()
    }

    pub fn update(&mut self, actual: f64, predicted: f64) {
        self.prev_mean = self.mean;
        self.size += 1;
        self.mean += mean_delta(actual, self.mean, self.size);
        self.grand_sum_sq_dev_from_mean += sum_sq_dev_delta(actual, self.mean, self.prev_mean);
        self.sum_sq_dev_from_prediction += (actual - predicted) * (actual - predicted);
    }

    /// Share of the target's variance explained by the predictions. `NaN`
    /// when the evaluated targets are constant or nothing was evaluated.
    pub fn metrics(&self) -> Metrics {
        let vr = (self.grand_sum_sq_dev_from_mean - self.sum_sq_dev_from_prediction) * 100.0
            / self.grand_sum_sq_dev_from_mean;
        Metrics {
            size: self.size,
            variance_reduction: round4(vr),
        }
    }
}

/// Out-of-sample fit of the tree.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metrics {
    pub size: usize,
    /// In percent, rounded to 4 decimal places.
    pub variance_reduction: f64,
}
