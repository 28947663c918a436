//! This module implements the regression tree model: it owns the schema, the
//! ingested rows, the learned rule tree and the evaluation state.
//!
//! # Example
//! ```
//! use ruletree::config::{ColumnDef, ModelConfig};
//! use ruletree::regression_tree::RegressionTree;
//! use serde_json::json;
//!
//! let mut rt = RegressionTree::new();
//! let columns = vec![
//!     ColumnDef::categorical("size"),
//!     ColumnDef::categorical("color"),
//!     ColumnDef::target("price"),
//! ];
//! rt.configure(&columns, ModelConfig::default()).unwrap();
//!
//! let sizes = ["small", "medium", "large"];
//! let colors = ["red", "blue"];
//! for i in 0..120 {
//!     let size = sizes[i % 3];
//!     let price = 10.0 * (1 + i % 3) as f64 + if (i / 3) % 2 == 0 { 1.0 } else { -1.0 };
//!     rt.ingest(&[json!(size), json!(colors[(i / 3) % 2]), json!(price)]).unwrap();
//! }
//!
//! // one rule per size
//! assert_eq!(rt.learn().unwrap(), 3);
//! let predicted = rt.predict(&json!({ "size": "large" })).unwrap();
//! assert!((predicted - 30.0).abs() < 1e-9);
//! ```

#[cfg(feature = "enable_training")]
use std::collections::BTreeMap;

#[cfg(feature = "enable_training")]
use log::trace;
use log::debug;
use serde_json::Value;

#[cfg(feature = "enable_training")]
use crate::candidates::{BestSplit, CandidateStats, ColumnGroups};
use crate::columns::{EncodedRow, Schema};
use crate::config::{ColumnDef, ModelConfig};
use crate::errors::{Result, RtError};
#[cfg(feature = "enable_training")]
use crate::fitness::{variance_reduction_pct, RunningStats, EPSILON};
use crate::fitness::{EvaluationAccumulator, Metrics};
use crate::rule_tree::{RuleTree, Visit};
#[cfg(feature = "enable_training")]
use crate::rule_tree::TreeNode;
use crate::summary::{summarize, Summary};

/// `learn()` refuses to run on fewer rows than this.
pub const MIN_ROWS_TO_LEARN: usize = 60;

fn json_type(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// A regression tree over categorical columns.
#[derive(Debug, Default)]
pub struct RegressionTree {
    config: ModelConfig,
    schema: Option<Schema>,
    rows: Vec<EncodedRow>,
    tree: Option<RuleTree>,
    eval: EvaluationAccumulator,
}

impl RegressionTree {
    /// Return an unconfigured model with the default parameters.
    pub fn new() -> Self {
        RegressionTree::default()
    }

    /// Build a prediction-only model from an exported tree.
    pub fn from_json(json: &str) -> Result<Self> {
        let mut rt = RegressionTree::new();
        rt.import_json(json)?;
        Ok(rt)
    }

    /// Defines the columns of the input data, in the order their values are
    /// supplied to `ingest()`, and the learning parameters. Everything learned
    /// or ingested before is discarded. Returns the number of columns.
    pub fn configure(&mut self, columns: &[ColumnDef], config: ModelConfig) -> Result<usize> {
        config.validate()?;
        let schema = Schema::new(columns)?;
        let n = schema.len();
        debug!(
            "configured {} columns ({} features, target `{}`)\n{}",
            n,
            schema.feature_count(),
            schema.target().name,
            config.to_string()
        );
        self.config = config;
        self.schema = Some(schema);
        self.rows.clear();
        self.tree = None;
        self.eval = EvaluationAccumulator::new();
        Ok(n)
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn schema(&self) -> Option<&Schema> {
        self.schema.as_ref()
    }

    pub fn tree(&self) -> Option<&RuleTree> {
        self.tree.as_ref()
    }

    /// Number of rows ingested since the last `configure()` or `reset()`.
    pub fn ingested(&self) -> usize {
        self.rows.len()
    }

    /// Ingests one row of data. Suited to be called back on every row read
    /// from an asynchronous source.
    #[cfg(feature = "enable_training")]
    pub fn ingest(&mut self, row: &[Value]) -> Result<()> {
        let schema = self.schema.as_mut().ok_or(RtError::NotConfigured)?;
        let encoded = schema.encode(row)?;
        self.rows.push(encoded);
        Ok(())
    }

    /// Learns the rule tree from the ingested rows and returns the number of
    /// rules learned, i.e. the leaves below the root.
    #[cfg(feature = "enable_training")]
    pub fn learn(&mut self) -> Result<usize> {
        let schema = self.schema.as_ref().ok_or(RtError::NotConfigured)?;
        if self.rows.len() < MIN_ROWS_TO_LEARN {
            return Err(RtError::InsufficientData {
                required: MIN_ROWS_TO_LEARN,
                found: self.rows.len(),
            });
        }

        let mut root_stats = RunningStats::new();
        for row in self.rows.iter() {
            root_stats.push(row[row.len() - 1]);
        }
        debug!(
            "root: size = {}, mean = {}, stdev = {}",
            root_stats.size,
            root_stats.mean,
            root_stats.stdev()
        );

        let builder = Builder {
            config: &self.config,
            schema,
            rows: &self.rows,
        };
        let mut root = TreeNode::new(root_stats.size, root_stats.mean, root_stats.stdev());
        let subset: Vec<usize> = (0..self.rows.len()).collect();
        builder.split(&mut root, &root_stats, &subset, &schema.split_candidates(), 1);

        let tree = RuleTree::new(root, Some(schema.target().name.clone()));
        let rules = tree.rules_learned;
        debug!("rules learned = {}", rules);
        self.tree = Some(tree);
        Ok(rules)
    }

    fn visit(&self, input: &Value) -> Result<Visit<'_>> {
        let record = input
            .as_object()
            .ok_or_else(|| RtError::InvalidInput(json_type(input).to_string()))?;
        let tree = self.tree.as_ref().ok_or(RtError::NotTrained)?;
        Ok(tree.navigate(record))
    }

    /// Predicts the target from `input`, an object of column name/value
    /// pairs. The mean of the node where the walk stops is returned; a value
    /// the tree has never seen stops the walk early.
    pub fn predict(&self, input: &Value) -> Result<f64> {
        let v = self.visit(input)?;
        match v.missing {
            Some(column) => Err(RtError::MissingColumn(column)),
            None => Ok(v.node.mean),
        }
    }

    /// Like `predict()`, but hands the node where the walk stopped to
    /// `modifier` as `(size, mean, stdev, columns used, missing column)` and
    /// returns its result. A missing column is reported to `modifier` instead
    /// of failing.
    pub fn predict_with<F>(&self, input: &Value, modifier: F) -> Result<f64>
    where
        F: Fn(usize, f64, f64, &[String], Option<&str>) -> f64,
    {
        let v = self.visit(input)?;
        Ok(modifier(
            v.node.size,
            v.node.mean,
            v.node.stdev,
            &v.path,
            v.missing.as_deref(),
        ))
    }

    fn target_name(&self) -> Option<&str> {
        match &self.schema {
            Some(schema) => Some(schema.target().name.as_str()),
            None => self.tree.as_ref().and_then(|t| t.target.as_deref()),
        }
    }

    /// Compares the prediction for `record` with the target value it carries.
    pub fn evaluate(&mut self, record: &Value) -> Result<()> {
        let predicted = self.predict(record)?;
        let target = self.target_name().ok_or(RtError::NotTrained)?.to_string();
        let actual = match record.get(&target) {
            None | Some(Value::Null) => return Err(RtError::MissingColumn(target)),
            Some(v) => v.as_f64().ok_or_else(|| RtError::InvalidValue {
                column: target.clone(),
                found: v.to_string(),
            })?,
        };
        self.eval.update(actual, predicted);
        Ok(())
    }

    /// Variance reduction observed over the records passed to `evaluate()`.
    pub fn metrics(&self) -> Metrics {
        self.eval.metrics()
    }

    pub fn summary(&self) -> Result<Summary> {
        let tree = self.tree.as_ref().ok_or(RtError::NotTrained)?;
        Ok(summarize(&tree.root))
    }

    pub fn export_json(&self) -> Result<String> {
        self.tree.as_ref().ok_or(RtError::NotTrained)?.to_json()
    }

    /// Replaces the rule tree with an exported one. The model is left
    /// untouched when the import fails.
    pub fn import_json(&mut self, json: &str) -> Result<()> {
        let tree = RuleTree::from_json(json)?;
        debug!("imported rule tree with {} rules", tree.rules_learned);
        self.tree = Some(tree);
        self.eval = EvaluationAccumulator::new();
        Ok(())
    }

    /// Discards the ingested rows, the rule tree and the evaluation state.
    /// Columns, parameters and category codes are kept, so the same instance
    /// can be trained again, e.g. once per cross-validation fold.
    pub fn reset(&mut self) {
        self.rows.clear();
        self.tree = None;
        self.eval = EvaluationAccumulator::new();
    }

    /// Turns a raw row into the column name/value record `predict()` and
    /// `evaluate()` expect.
    pub fn record_from_row(&self, row: &[Value]) -> Result<Value> {
        self.schema
            .as_ref()
            .ok_or(RtError::NotConfigured)?
            .record_from_row(row)
    }
}

/// Grows the tree over the row store.
#[cfg(feature = "enable_training")]
struct Builder<'a> {
    config: &'a ModelConfig,
    schema: &'a Schema,
    rows: &'a [EncodedRow],
}

#[cfg(feature = "enable_training")]
impl<'a> Builder<'a> {
    /// Looks for a worthy split of the rows in `subset`.
    fn best_split(
        &self,
        stats: &RunningStats,
        subset: &[usize],
        candidates: &[usize],
    ) -> Option<(BestSplit, f64, CandidateStats)> {
        if subset.len() <= self.config.min_split_candidate_items || stats.stdev() < EPSILON {
            return None;
        }
        let cs = CandidateStats::from_rows(candidates, self.rows, subset);
        let best = cs.select_best_split(self.config.min_avg_children_items)?;
        let vr = variance_reduction_pct(stats.sum_sq_dev, stats.size, best.weighted_variance);
        if vr < self.config.min_percent_variance_reduction {
            return None;
        }
        Some((best, vr, cs))
    }

    /// Splits `node` when a worthy split exists and grows its children at
    /// `depth`; otherwise `node` stays a leaf.
    fn split(
        &self,
        node: &mut TreeNode,
        stats: &RunningStats,
        subset: &[usize],
        candidates: &[usize],
        depth: usize,
    ) {
        let (best, vr, cs) = match self.best_split(stats, subset, candidates) {
            Some(s) => s,
            None => return,
        };
        let column = &self.schema.feature(best.column).name;
        trace!(
            "depth {}: split {} rows on `{}`, variance reduction {:.4}%",
            depth,
            subset.len(),
            column,
            vr
        );
        node.split_column = Some(column.clone());
        node.variance_reduction_pct = Some(vr);

        let remaining: Vec<usize> = candidates
            .iter()
            .copied()
            .filter(|&c| c != best.column)
            .collect();
        if let Some(groups) = cs.into_groups(best.column) {
            self.grow(node, &remaining, groups, best.column, depth);
        }
    }

    /// Creates a child of `node` for every group of `split_column` large
    /// enough to be kept, and tries to split each of them further.
    fn grow(
        &self,
        node: &mut TreeNode,
        candidates: &[usize],
        groups: ColumnGroups,
        split_column: usize,
        depth: usize,
    ) {
        if depth > self.config.max_depth {
            return;
        }
        let column = self.schema.feature(split_column);
        let mut branches = BTreeMap::new();
        for (code, group) in groups.into_iter() {
            let value = column.decode(code).unwrap_or_default().to_string();
            if group.stats.size < self.config.min_leaf_node_items {
                trace!(
                    "pruned `{}` = {:?} with {} items",
                    column.name,
                    value,
                    group.stats.size
                );
                continue;
            }
            let mut child = TreeNode::new(group.stats.size, group.stats.mean, group.stats.stdev());
            self.split(&mut child, &group.stats, &group.rows, candidates, depth + 1);
            branches.insert(value, child);
        }
        node.branches = Some(branches);
    }
}

#[cfg(all(test, feature = "enable_training"))]
mod tests {
    use super::*;
    use serde_json::json;

    fn configured() -> RegressionTree {
        let mut rt = RegressionTree::new();
        rt.configure(
            &[ColumnDef::categorical("size"), ColumnDef::target("y")],
            ModelConfig::default(),
        )
        .unwrap();
        rt
    }

    #[test]
    fn unconfigured_model() {
        let mut rt = RegressionTree::new();
        assert!(matches!(rt.ingest(&[json!(1)]), Err(RtError::NotConfigured)));
        assert!(matches!(rt.learn(), Err(RtError::NotConfigured)));
        assert!(matches!(rt.predict(&json!({})), Err(RtError::NotTrained)));
        assert!(matches!(rt.export_json(), Err(RtError::NotTrained)));
    }

    #[test]
    fn configure_counts_columns() {
        let mut rt = RegressionTree::new();
        let n = rt
            .configure(
                &[
                    ColumnDef::categorical("id").excluded(),
                    ColumnDef::categorical("size"),
                    ColumnDef::target("y"),
                ],
                ModelConfig::default(),
            )
            .unwrap();
        assert_eq!(n, 3);
    }

    #[test]
    fn learn_needs_sixty_rows() {
        let mut rt = configured();
        for i in 0..59 {
            rt.ingest(&[json!("a"), json!(i)]).unwrap();
        }
        match rt.learn() {
            Err(RtError::InsufficientData { required, found }) => {
                assert_eq!(required, 60);
                assert_eq!(found, 59);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(rt.tree().is_none());
    }

    #[test]
    fn failed_ingest_stores_nothing() {
        let mut rt = configured();
        assert!(rt.ingest(&[json!("a")]).is_err());
        assert!(rt.ingest(&[json!("a"), json!("x")]).is_err());
        assert_eq!(rt.ingested(), 0);
        assert_eq!(rt.schema().unwrap().feature(0).next_code(), 0);
    }

    #[test]
    fn predict_requires_an_object() {
        let mut rt = configured();
        for i in 0..60 {
            rt.ingest(&[json!("a"), json!(i % 7)]).unwrap();
        }
        rt.learn().unwrap();
        match rt.predict(&json!([1, 2])) {
            Err(RtError::InvalidInput(found)) => assert_eq!(found, "array"),
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(rt.predict(&json!("size")), Err(RtError::InvalidInput(_))));
    }

    #[test]
    fn max_depth_zero_keeps_split_fields_on_the_root() {
        let mut cfg = ModelConfig::default();
        cfg.set_max_depth(0);
        let mut rt = RegressionTree::new();
        rt.configure(&[ColumnDef::categorical("size"), ColumnDef::target("y")], cfg)
            .unwrap();
        for i in 0..90 {
            let size = ["s", "m", "l"][i % 3];
            rt.ingest(&[json!(size), json!((i % 3) as f64 * 10.0)]).unwrap();
        }
        assert_eq!(rt.learn().unwrap(), 0);
        let root = &rt.tree().unwrap().root;
        assert_eq!(root.split_column.as_deref(), Some("size"));
        assert!(root.branches.is_none());
    }

    // 95 rows of "x" with y = i % 5, then 5 rows of "rare" with y = 100
    fn with_rare_category() -> RegressionTree {
        let mut rt = RegressionTree::new();
        rt.configure(&[ColumnDef::categorical("a"), ColumnDef::target("y")], ModelConfig::default())
            .unwrap();
        for i in 0..95 {
            rt.ingest(&[json!("x"), json!((i % 5) as f64)]).unwrap();
        }
        for _ in 0..5 {
            rt.ingest(&[json!("rare"), json!(100.0)]).unwrap();
        }
        rt
    }

    fn smallest_below_root(node: &TreeNode) -> usize {
        node.branches.as_ref().map_or(usize::MAX, |b| {
            b.values()
                .map(|c| c.size.min(smallest_below_root(c)))
                .min()
                .unwrap_or(usize::MAX)
        })
    }

    #[test]
    fn small_branches_are_pruned() {
        let mut rt = with_rare_category();
        assert_eq!(rt.learn().unwrap(), 1);
        let root = &rt.tree().unwrap().root;
        assert_eq!(root.split_column.as_deref(), Some("a"));
        let branches = root.branches.as_ref().unwrap();
        assert_eq!(branches.keys().collect::<Vec<_>>(), vec!["x"]);
        assert_eq!(branches["x"].size, 95);
        assert!(smallest_below_root(root) >= rt.config().min_leaf_node_items);

        // the pruned value is unseen when predicting
        let root_mean = root.mean;
        assert_eq!(rt.predict(&json!({"a": "rare"})).unwrap(), root_mean);
        assert!((root_mean - 6.9).abs() < 1e-9);
    }

    #[test]
    fn weak_split_leaves_the_node_alone() {
        // the parity of i drives y; size explains well under 1% of the variance
        let data: Vec<(&str, f64)> = (0..120)
            .map(|i| (["s", "m", "l"][i % 3], 10.0 * (i % 2) as f64 + 0.5 * (i % 3) as f64))
            .collect();
        let learn_with = |min_pct: f64| {
            let mut cfg = ModelConfig::default();
            cfg.set_min_percent_variance_reduction(min_pct);
            let mut rt = RegressionTree::new();
            rt.configure(&[ColumnDef::categorical("size"), ColumnDef::target("y")], cfg)
                .unwrap();
            for (size, y) in data.iter() {
                rt.ingest(&[json!(size), json!(y)]).unwrap();
            }
            let rules = rt.learn().unwrap();
            (rt, rules)
        };

        let (rt, rules) = learn_with(ModelConfig::default().min_percent_variance_reduction);
        assert_eq!(rules, 0);
        let root = &rt.tree().unwrap().root;
        assert!(root.split_column.is_none());
        assert!(root.variance_reduction_pct.is_none());
        assert!(root.branches.is_none());

        let (rt, rules) = learn_with(0.5);
        assert_eq!(rules, 3);
        let vr = rt.tree().unwrap().root.variance_reduction_pct.unwrap();
        assert!(vr > 0.5 && vr < 1.0, "variance reduction {}", vr);
    }

    #[test]
    fn export_import_keeps_predictions_bit_for_bit() {
        let mut rt = with_rare_category();
        rt.learn().unwrap();
        let imported = RegressionTree::from_json(&rt.export_json().unwrap()).unwrap();
        assert_eq!(imported.tree(), rt.tree());
        for input in [json!({"a": "x"}), json!({"a": "rare"})].iter() {
            let before = rt.predict(input).unwrap();
            let after = imported.predict(input).unwrap();
            assert_eq!(before.to_bits(), after.to_bits());
        }
    }
}
