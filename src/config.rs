//! This module implements the config for the regression rule tree: the column
//! definitions of the input data and the parameters that steer learning.

use serde_derive::{Deserialize, Serialize};

use crate::errors::{Result, RtError};

/// Defines one column of the input data, in the same sequence in which the
/// values of a row are supplied to `ingest()`.
///
/// # Example
/// ```rust
/// use ruletree::config::ColumnDef;
/// let cols: Vec<ColumnDef> = serde_json::from_str(
///     r#"[{ "name": "model", "categorical": true, "exclude": true },
///         { "name": "mpg", "categorical": false, "target": true },
///         { "name": "origin", "categorical": true }]"#,
/// ).unwrap();
/// assert!(cols[1].target);
/// assert!(!cols[2].exclude);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    /// `false` marks a continuous column.
    #[serde(default = "default_categorical")]
    pub categorical: bool,
    /// Excluded columns are read but never used for learning.
    #[serde(default)]
    pub exclude: bool,
    /// The column whose value is predicted. Exactly one, continuous.
    #[serde(default)]
    pub target: bool,
}

fn default_categorical() -> bool {
    true
}

impl ColumnDef {
    pub fn categorical(name: &str) -> Self {
        ColumnDef {
            name: name.to_string(),
            categorical: true,
            exclude: false,
            target: false,
        }
    }

    pub fn continuous(name: &str) -> Self {
        ColumnDef {
            name: name.to_string(),
            categorical: false,
            exclude: false,
            target: false,
        }
    }

    pub fn target(name: &str) -> Self {
        ColumnDef {
            name: name.to_string(),
            categorical: false,
            exclude: false,
            target: true,
        }
    }

    pub fn excluded(mut self) -> Self {
        self.exclude = true;
        self
    }
}

/// Parameters of the tree. Any option omitted from a JSON parameter object
/// keeps its default.
///
/// # Example
/// ```rust
/// use ruletree::config::ModelConfig;
/// let cfg: ModelConfig = serde_json::from_str(
///     r#"{ "minPercentVarianceReduction": 0.5, "minSplitCandidateItems": 30 }"#,
/// ).unwrap();
/// assert_eq!(cfg.max_depth, 20);
/// assert_eq!(cfg.min_split_candidate_items, 30);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ModelConfig {
    /// Maximum depth of the tree after which learning stops.
    pub max_depth: usize,
    /// Minimum variance reduction (in percent) required for a split to occur.
    pub min_percent_variance_reduction: f64,
    /// A node is split further only when it holds more items than this.
    pub min_split_candidate_items: usize,
    /// Minimum number of items a child must hold to be retained in the tree.
    pub min_leaf_node_items: usize,
    /// The average number of items across the children of a split must exceed
    /// this for a column to become a split candidate; keeps id-like columns
    /// out of the tree.
    pub min_avg_children_items: f64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelConfig {
    pub fn new() -> ModelConfig {
        ModelConfig {
            max_depth: 20,
            min_percent_variance_reduction: 10.0,
            min_split_candidate_items: 50,
            min_leaf_node_items: 10,
            min_avg_children_items: 2.0,
        }
    }

    pub fn set_max_depth(&mut self, n: usize) {
        self.max_depth = n;
    }

    pub fn set_min_percent_variance_reduction(&mut self, pct: f64) {
        self.min_percent_variance_reduction = pct;
    }

    pub fn set_min_split_candidate_items(&mut self, n: usize) {
        self.min_split_candidate_items = n;
    }

    pub fn set_min_leaf_node_items(&mut self, n: usize) {
        self.min_leaf_node_items = n;
    }

    pub fn set_min_avg_children_items(&mut self, n: f64) {
        self.min_avg_children_items = n;
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if !self.min_percent_variance_reduction.is_finite() {
            return Err(RtError::InvalidConfig(format!(
                "minPercentVarianceReduction must be finite, found {}",
                self.min_percent_variance_reduction
            )));
        }
        if !self.min_avg_children_items.is_finite() {
            return Err(RtError::InvalidConfig(format!(
                "minAvgChildrenItems must be finite, found {}",
                self.min_avg_children_items
            )));
        }
        Ok(())
    }

    pub fn to_string(&self) -> String {
        let mut s = String::from("");
        s.push_str(&format!("maximum depth = {}\n", self.max_depth));
        s.push_str(&format!(
            "min percent variance reduction = {}\n",
            self.min_percent_variance_reduction
        ));
        s.push_str(&format!(
            "min split candidate items = {}\n",
            self.min_split_candidate_items
        ));
        s.push_str(&format!("min leaf node items = {}\n", self.min_leaf_node_items));
        s.push_str(&format!(
            "min avg children items = {}\n",
            self.min_avg_children_items
        ));
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = ModelConfig::default();
        assert_eq!(cfg.max_depth, 20);
        assert_eq!(cfg.min_percent_variance_reduction, 10.0);
        assert_eq!(cfg.min_split_candidate_items, 50);
        assert_eq!(cfg.min_leaf_node_items, 10);
        assert_eq!(cfg.min_avg_children_items, 2.0);
    }

    #[test]
    fn partial_overrides_keep_defaults() {
        let cfg: ModelConfig =
            serde_json::from_str(r#"{ "minLeafNodeItems": 5, "maxDepth": 3 }"#).unwrap();
        assert_eq!(cfg.min_leaf_node_items, 5);
        assert_eq!(cfg.max_depth, 3);
        assert_eq!(cfg.min_split_candidate_items, 50);
    }

    #[test]
    fn setters_and_dump() {
        let mut cfg = ModelConfig::new();
        cfg.set_max_depth(4);
        cfg.set_min_leaf_node_items(3);
        cfg.set_min_avg_children_items(1.5);
        let s = cfg.to_string();
        assert!(s.contains("maximum depth = 4"));
        assert!(s.contains("min leaf node items = 3"));
        assert!(s.contains("min avg children items = 1.5"));
    }

    #[test]
    fn rejects_non_finite_threshold() {
        let mut cfg = ModelConfig::new();
        cfg.set_min_percent_variance_reduction(f64::NAN);
        assert!(matches!(cfg.validate(), Err(RtError::InvalidConfig(_))));
    }

    #[test]
    fn column_def_helpers() {
        let c = ColumnDef::categorical("year").excluded();
        assert!(c.categorical && c.exclude && !c.target);
        let t = ColumnDef::target("mpg");
        assert!(!t.categorical && t.target);
    }
}
