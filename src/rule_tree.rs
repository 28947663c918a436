//! This module implements the rule tree: the persisted model produced by
//! learning, and the traversal used for prediction.
//!
//! Every node carries the size, mean and stdev of the target values of the
//! rows that reached it. Internal nodes name the column they split on and
//! own one child per retained category value of that column.

use std::collections::BTreeMap;

use serde_derive::{Deserialize, Serialize};
use serde_json::Value;

use crate::columns::category_key;
use crate::errors::{Result, RtError};

/// Version tag written into every exported tree.
pub const RULES_TREE_VERSION: &str = "WRT 1.0.0";

/// A node of the rule tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeNode {
    pub size: usize,
    pub mean: f64,
    pub stdev: f64,
    /// Name of the column used to split this node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub split_column: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variance_reduction_pct: Option<f64>,
    /// Children keyed by the original category value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branches: Option<BTreeMap<String, TreeNode>>,
}

impl TreeNode {
    pub fn new(size: usize, mean: f64, stdev: f64) -> Self {
        TreeNode {
            size,
            mean,
            stdev,
            split_column: None,
            variance_reduction_pct: None,
            branches: None,
        }
    }

    /// A node without children, including one whose children were all pruned.
    pub fn is_leaf(&self) -> bool {
        self.branches.as_ref().map_or(true, |b| b.is_empty())
    }

    /// Number of terminal nodes in the subtree rooted here.
    pub fn count_leaves(&self) -> usize {
        match &self.branches {
            Some(branches) if !branches.is_empty() => {
                branches.values().map(|b| b.count_leaves()).sum()
            }
            _ => 1,
        }
    }

    fn describe(&self) -> String {
        let mut s = format!(
            "size: {}, mean: {:.4}, stdev: {:.4}",
            self.size, self.mean, self.stdev
        );
        if let (Some(col), Some(vr)) = (&self.split_column, self.variance_reduction_pct) {
            s.push_str(&format!(", split: {} ({:.4}%)", col, vr));
        }
        s
    }
}

/// Outcome of walking the tree for one input.
#[derive(Debug, Clone, PartialEq)]
pub struct Visit<'a> {
    /// The node where the walk stopped.
    pub node: &'a TreeNode,
    /// Split columns followed from the root.
    pub path: Vec<String>,
    /// Set when the walk stopped because the input lacks this column.
    pub missing: Option<String>,
}

/// The learned model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleTree {
    pub version: String,
    pub rules_learned: usize,
    /// Name of the predicted column.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(flatten)]
    pub root: TreeNode,
}

impl RuleTree {
    pub fn new(root: TreeNode, target: Option<String>) -> Self {
        let mut tree = RuleTree {
            version: RULES_TREE_VERSION.to_string(),
            rules_learned: 0,
            target,
            root,
        };
        tree.rules_learned = tree.count_rules();
        tree
    }

    /// Terminal nodes below the root; an unsplit root has learned nothing.
    pub fn count_rules(&self) -> usize {
        if self.root.is_leaf() {
            0
        } else {
            self.root.count_leaves()
        }
    }

    /// Walks from the root following the values of `input`, an object of
    /// column name/value pairs. `null` counts as absent.
    pub fn navigate(&self, input: &serde_json::Map<String, Value>) -> Visit<'_> {
        let mut node = &self.root;
        let mut path = Vec::new();
        loop {
            let branches = match &node.branches {
                Some(b) if !b.is_empty() => b,
                _ => break,
            };
            let column = match &node.split_column {
                Some(c) => c,
                None => break,
            };
            let value = match input.get(column) {
                None | Some(Value::Null) => {
                    return Visit {
                        node,
                        path,
                        missing: Some(column.clone()),
                    }
                }
                Some(v) => v,
            };
            match branches.get(&category_key(value)) {
                Some(child) => {
                    path.push(column.clone());
                    node = child;
                }
                None => break,
            }
        }
        Visit {
            node,
            path,
            missing: None,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parses an exported tree. The version tag is checked before the tree
    /// itself is decoded.
    pub fn from_json(json: &str) -> Result<Self> {
        if json.trim().is_empty() {
            return Err(RtError::InvalidModel);
        }
        let value: Value = serde_json::from_str(json).map_err(RtError::ParseError)?;
        if value.is_null() {
            return Err(RtError::InvalidModel);
        }
        match value.get("version") {
            Some(Value::String(v)) if v == RULES_TREE_VERSION => {}
            other => {
                return Err(RtError::VersionMismatch {
                    expected: RULES_TREE_VERSION.to_string(),
                    found: other.map_or_else(|| "nothing".to_string(), |v| v.to_string()),
                })
            }
        }
        serde_json::from_value(value).map_err(RtError::ParseError)
    }

    /// Renders the tree one node per line, children indented below their
    /// parent. For debug use.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let mut stack: Vec<(usize, Option<&str>, &TreeNode)> = vec![(0, None, &self.root)];
        while let Some((depth, key, node)) = stack.pop() {
            for _ in 0..depth {
                out.push_str("    ");
            }
            match key {
                Some(k) => out.push_str(&format!("----[{}] {}\n", k, node.describe())),
                None => out.push_str(&format!("----{}\n", node.describe())),
            }
            if let Some(branches) = &node.branches {
                for (k, child) in branches.iter().rev() {
                    stack.push((depth + 1, Some(k.as_str()), child));
                }
            }
        }
        out
    }

    /// For debug use. Prints the whole tree.
    pub fn print(&self) {
        print!("{}", self.render());
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;

    /// weight -> (low: leaf, high: split on origin -> US, Japan)
    pub(crate) fn sample_tree() -> RuleTree {
        let us = TreeNode::new(20, 14.0, 1.5);
        let japan = TreeNode::new(12, 19.0, 2.0);
        let mut high = TreeNode::new(40, 16.0, 3.0);
        high.split_column = Some("origin".to_string());
        high.variance_reduction_pct = Some(42.5);
        let mut hb = BTreeMap::new();
        hb.insert("US".to_string(), us);
        hb.insert("Japan".to_string(), japan);
        high.branches = Some(hb);
        let low = TreeNode::new(60, 30.0, 4.0);
        let mut root = TreeNode::new(100, 24.4, 7.5);
        root.split_column = Some("weight".to_string());
        root.variance_reduction_pct = Some(61.25);
        let mut rb = BTreeMap::new();
        rb.insert("high".to_string(), high);
        rb.insert("low".to_string(), low);
        root.branches = Some(rb);
        RuleTree::new(root, Some("mpg".to_string()))
    }

    fn obj(v: Value) -> serde_json::Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn rules_are_terminal_nodes_below_the_root() {
        let tree = sample_tree();
        assert_eq!(tree.rules_learned, 3);
        let root_only = RuleTree::new(TreeNode::new(10, 1.0, 0.0), None);
        assert_eq!(root_only.rules_learned, 0);
    }

    #[test]
    fn empty_branches_count_as_one_rule() {
        let mut tree = sample_tree();
        if let Some(b) = tree.root.branches.as_mut() {
            b.get_mut("low").unwrap().branches = Some(BTreeMap::new());
        }
        assert_eq!(tree.count_rules(), 3);
        assert!(tree.root.branches.as_ref().unwrap()["low"].is_leaf());
    }

    #[test]
    fn navigate_to_leaf() {
        let tree = sample_tree();
        let v = tree.navigate(&obj(json!({"weight": "high", "origin": "Japan"})));
        assert_eq!(v.node.mean, 19.0);
        assert_eq!(v.path, vec!["weight", "origin"]);
        assert_eq!(v.missing, None);
    }

    #[test]
    fn navigate_stops_on_missing_or_unseen() {
        let tree = sample_tree();
        let v = tree.navigate(&obj(json!({"weight": "high", "origin": null})));
        assert_eq!(v.node.mean, 16.0);
        assert_eq!(v.missing.as_deref(), Some("origin"));

        let v = tree.navigate(&obj(json!({"weight": "medium"})));
        assert_eq!(v.node.mean, 24.4);
        assert!(v.path.is_empty());
        assert_eq!(v.missing, None);
    }

    #[test]
    fn json_round_trip() {
        let tree = sample_tree();
        let json = tree.to_json().unwrap();
        assert!(json.contains("\"version\":\"WRT 1.0.0\""));
        assert!(json.contains("\"splitColumn\":\"weight\""));
        let back = RuleTree::from_json(&json).unwrap();
        assert_eq!(back, tree);
    }

    #[test]
    fn import_failures() {
        assert!(matches!(RuleTree::from_json(""), Err(RtError::InvalidModel)));
        assert!(matches!(RuleTree::from_json("  "), Err(RtError::InvalidModel)));
        assert!(matches!(RuleTree::from_json("null"), Err(RtError::InvalidModel)));
        assert!(matches!(RuleTree::from_json("{\"size\":"), Err(RtError::ParseError(_))));
        assert!(matches!(
            RuleTree::from_json(r#"{"size": 1, "mean": 2.0, "stdev": 0.0, "rulesLearned": 0}"#),
            Err(RtError::VersionMismatch { .. })
        ));
        assert!(matches!(
            RuleTree::from_json(r#"{"version": "WRT 0.9.0", "size": 1}"#),
            Err(RtError::VersionMismatch { .. })
        ));
        assert!(matches!(
            RuleTree::from_json(r#"{"version": "WRT 1.0.0", "size": "many"}"#),
            Err(RtError::ParseError(_))
        ));
    }

    #[test]
    fn render_indents_children() {
        let out = sample_tree().render();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 5);
        assert!(lines[0].starts_with("----size: 100"));
        assert!(lines[1].starts_with("    ----[high]"));
        assert!(lines[2].starts_with("        ----[Japan]"));
    }
}
