//! k-fold cross-validation of a configured `RegressionTree`.

use log::debug;
use rand::seq::SliceRandom;
use rand::Rng;
use serde_derive::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{Result, RtError};
use crate::fitness::Metrics;
use crate::regression_tree::RegressionTree;

/// Outcome of one fold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoldReport {
    pub fold: usize,
    pub rules_learned: usize,
    pub metrics: Metrics,
}

/// Bounds of `fold` within `n` shuffled rows.
fn fold_bounds(n: usize, folds: usize, fold: usize) -> (usize, usize) {
    (fold * n / folds, (fold + 1) * n / folds)
}

/// Shuffles `rows` and, for every fold, trains `model` on the other folds and
/// evaluates it on the held-out one. `model` is reset before each fold and
/// holds the last fold's tree afterwards.
///
/// # Example
/// ```
/// use rand::rngs::StdRng;
/// use rand::SeedableRng;
/// use ruletree::config::{ColumnDef, ModelConfig};
/// use ruletree::regression_tree::RegressionTree;
/// use ruletree::validation::cross_validate;
/// use serde_json::json;
///
/// let mut rt = RegressionTree::new();
/// rt.configure(
///     &[ColumnDef::categorical("size"), ColumnDef::target("price")],
///     ModelConfig::default(),
/// ).unwrap();
/// let sizes = ["s", "m", "l"];
/// let rows: Vec<Vec<_>> = (0..150)
///     .map(|i| vec![json!(sizes[i % 3]), json!((i % 3) as f64)])
///     .collect();
/// let reports = cross_validate(&mut rt, &rows, 5, &mut StdRng::seed_from_u64(7)).unwrap();
/// assert_eq!(reports.len(), 5);
/// ```
pub fn cross_validate<R: Rng + ?Sized>(
    model: &mut RegressionTree,
    rows: &[Vec<Value>],
    folds: usize,
    rng: &mut R,
) -> Result<Vec<FoldReport>> {
    if folds < 2 || folds > rows.len() {
        return Err(RtError::InvalidFolds {
            folds,
            rows: rows.len(),
        });
    }
    let mut order: Vec<usize> = (0..rows.len()).collect();
    order.shuffle(rng);

    let mut reports = Vec::with_capacity(folds);
    for fold in 0..folds {
        let (start, end) = fold_bounds(rows.len(), folds, fold);
        model.reset();
        for (pos, &i) in order.iter().enumerate() {
            if pos < start || pos >= end {
                model.ingest(&rows[i])?;
            }
        }
        let rules_learned = model.learn()?;
        for &i in order[start..end].iter() {
            let record = model.record_from_row(&rows[i])?;
            model.evaluate(&record)?;
        }
        let metrics = model.metrics();
        debug!(
            "fold {}: {} rules, variance reduction {}% over {} rows",
            fold, rules_learned, metrics.variance_reduction, metrics.size
        );
        reports.push(FoldReport {
            fold,
            rules_learned,
            metrics,
        });
    }
    Ok(reports)
}
