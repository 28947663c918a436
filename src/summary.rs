//! Summary of a learned rule tree: how important each column is, judged by
//! how high in the tree and how often it was used to split, plus the spread of
//! the leaf predictions.

use std::collections::BTreeMap;

use serde_derive::{Deserialize, Serialize};

use crate::fitness::round4;
use crate::rule_tree::TreeNode;

/// Splits sharing the same level and column hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnImportance {
    /// Depth of the split, the root being level 1. Lower is more important.
    pub level: usize,
    /// Split columns from the root down to this split, `/` separated.
    pub column_hierarchy: String,
    pub splits: usize,
    #[serde(rename = "minVR")]
    pub min_vr: f64,
    #[serde(rename = "maxVR")]
    pub max_vr: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeanAndSd {
    pub mean: f64,
    pub its_sd: f64,
}

/// Extremes over the leaves of the tree.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeafStats {
    pub min: MeanAndSd,
    pub max: MeanAndSd,
    #[serde(rename = "minSD")]
    pub min_sd: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub columns_importance: Vec<ColumnImportance>,
    pub stats: LeafStats,
}

#[derive(Debug, Clone, Copy)]
struct SplitTally {
    splits: usize,
    min_vr: f64,
    max_vr: f64,
}

fn walk(
    node: &TreeNode,
    depth: usize,
    hierarchy: &str,
    tally: &mut BTreeMap<(usize, String), SplitTally>,
    stats: &mut LeafStats,
) {
    let branches = match &node.branches {
        Some(b) if !b.is_empty() => b,
        _ => {
            if stats.min.mean > node.mean {
                stats.min = MeanAndSd {
                    mean: node.mean,
                    its_sd: node.stdev,
                };
            }
            if stats.max.mean < node.mean {
                stats.max = MeanAndSd {
                    mean: node.mean,
                    its_sd: node.stdev,
                };
            }
            stats.min_sd = stats.min_sd.min(node.stdev);
            return;
        }
    };

    let column = node.split_column.as_deref().unwrap_or("");
    let path = if hierarchy.is_empty() {
        column.to_string()
    } else {
        format!("{}/{}", hierarchy, column)
    };
    let vr = round4(node.variance_reduction_pct.unwrap_or(std::f64::NAN));
    let entry = tally.entry((depth, path.clone())).or_insert(SplitTally {
        splits: 0,
        min_vr: std::f64::INFINITY,
        max_vr: std::f64::NEG_INFINITY,
    });
    entry.splits += 1;
    entry.min_vr = entry.min_vr.min(vr);
    entry.max_vr = entry.max_vr.max(vr);

    for child in branches.values() {
        walk(child, depth + 1, &path, tally, stats);
    }
}

/// Summarises the tree rooted at `root`. The table is sorted by level
/// (ascending), then by number of splits (descending).
pub fn summarize(root: &TreeNode) -> Summary {
    let mut tally = BTreeMap::new();
    let mut stats = LeafStats {
        min: MeanAndSd {
            mean: std::f64::INFINITY,
            its_sd: 0.0,
        },
        max: MeanAndSd {
            mean: std::f64::NEG_INFINITY,
            its_sd: 0.0,
        },
        min_sd: std::f64::INFINITY,
    };
    walk(root, 1, "", &mut tally, &mut stats);

    let mut table: Vec<ColumnImportance> = tally
        .into_iter()
        .map(|((level, column_hierarchy), t)| ColumnImportance {
            level,
            column_hierarchy,
            splits: t.splits,
            min_vr: t.min_vr,
            max_vr: t.max_vr,
        })
        .collect();
    // the map already orders equal levels by hierarchy; the sort is stable
    table.sort_by(|a, b| a.level.cmp(&b.level).then(b.splits.cmp(&a.splits)));

    Summary {
        columns_importance: table,
        stats,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule_tree::tests::sample_tree;
    use crate::rule_tree::TreeNode;

    #[test]
    fn importance_table() {
        let s = summarize(&sample_tree().root);
        assert_eq!(s.columns_importance.len(), 2);
        let first = &s.columns_importance[0];
        assert_eq!(first.level, 1);
        assert_eq!(first.column_hierarchy, "weight");
        assert_eq!(first.splits, 1);
        assert_eq!(first.min_vr, 61.25);
        let second = &s.columns_importance[1];
        assert_eq!(second.level, 2);
        assert_eq!(second.column_hierarchy, "weight/origin");
        assert_eq!(second.max_vr, 42.5);
    }

    #[test]
    fn leaf_extremes() {
        let s = summarize(&sample_tree().root);
        assert_eq!(s.stats.min, MeanAndSd { mean: 14.0, its_sd: 1.5 });
        assert_eq!(s.stats.max, MeanAndSd { mean: 30.0, its_sd: 4.0 });
        assert_eq!(s.stats.min_sd, 1.5);
    }

    #[test]
    fn splits_sharing_a_hierarchy_are_tallied_together() {
        let mut tree = sample_tree();
        {
            let low = tree.root.branches.as_mut().unwrap().get_mut("low").unwrap();
            low.split_column = Some("origin".to_string());
            low.variance_reduction_pct = Some(12.345_67);
            let mut b = BTreeMap::new();
            b.insert("US".to_string(), TreeNode::new(30, 28.0, 0.5));
            b.insert("Europe".to_string(), TreeNode::new(30, 32.0, 3.0));
            low.branches = Some(b);
        }
        let s = summarize(&tree.root);
        let row = s
            .columns_importance
            .iter()
            .find(|r| r.column_hierarchy == "weight/origin")
            .unwrap();
        assert_eq!(row.splits, 2);
        assert_eq!(row.min_vr, 12.3457);
        assert_eq!(row.max_vr, 42.5);
        assert_eq!(s.stats.min_sd, 0.5);
        assert_eq!(s.stats.max.mean, 32.0);
    }

    #[test]
    fn root_only_tree() {
        let s = summarize(&TreeNode::new(80, 5.0, 0.0));
        assert!(s.columns_importance.is_empty());
        assert_eq!(s.stats.min.mean, 5.0);
        assert_eq!(s.stats.max.mean, 5.0);
        assert_eq!(s.stats.min_sd, 0.0);
    }
}
