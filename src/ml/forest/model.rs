use serde::{Deserialize, Serialize};

use crate::ml::argmax;

/// Node of a flattened binary decision tree. The root is node 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TreeNode {
    /// Route to `left` when `feature <= threshold`, otherwise to `right`.
    Split {
        feature_index: u16,
        threshold: f32,
        left: u32,
        right: u32,
    },
    /// Class distribution of the training samples that reached this leaf.
    Leaf { distribution: Vec<f32> },
}

/// A single CART classification tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<TreeNode>,
}

impl DecisionTree {
    /// Leaf distribution reached by a feature vector.
    ///
    /// Missing features read as 0. A malformed tree yields an empty slice.
    pub fn predict_proba(&self, features: &[f32]) -> &[f32] {
        let mut idx = 0usize;
        // A well-formed tree reaches a leaf in at most `nodes.len()` steps.
        for _ in 0..=self.nodes.len() {
            match self.nodes.get(idx) {
                Some(TreeNode::Leaf { distribution }) => return distribution,
                Some(TreeNode::Split {
                    feature_index,
                    threshold,
                    left,
                    right,
                }) => {
                    let value = features.get(*feature_index as usize).copied().unwrap_or(0.0);
                    let next = if value <= *threshold { *left } else { *right };
                    idx = next as usize;
                }
                None => break,
            }
        }
        &[]
    }

    pub fn depth(&self) -> usize {
        let mut max_depth = 0usize;
        let mut stack = vec![(0usize, 0usize)];
        while let Some((idx, depth)) = stack.pop() {
            max_depth = max_depth.max(depth);
            if let Some(TreeNode::Split { left, right, .. }) = self.nodes.get(idx) {
                if depth < self.nodes.len() {
                    stack.push((*left as usize, depth + 1));
                    stack.push((*right as usize, depth + 1));
                }
            }
        }
        max_depth
    }

    pub fn leaf_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|node| matches!(node, TreeNode::Leaf { .. }))
            .count()
    }

    fn validate(&self, n_features: usize, n_classes: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }
        let len = self.nodes.len();
        for (idx, node) in self.nodes.iter().enumerate() {
            match node {
                TreeNode::Split {
                    feature_index,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature_index as usize >= n_features {
                        return Err(format!("node {idx} splits on unknown feature {feature_index}"));
                    }
                    if !threshold.is_finite() {
                        return Err(format!("node {idx} has a non-finite threshold"));
                    }
                    // Children are always appended after their parent.
                    for child in [*left as usize, *right as usize] {
                        if child <= idx || child >= len {
                            return Err(format!("node {idx} has invalid child {child}"));
                        }
                    }
                }
                TreeNode::Leaf { distribution } => {
                    if distribution.len() != n_classes {
                        return Err(format!(
                            "leaf {idx} has {} probabilities, expected {n_classes}",
                            distribution.len()
                        ));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Random forest classifier: averaged class probabilities of its trees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestModel {
    /// Model format version.
    pub model_version: i64,
    /// Feature names in the order predict expects them.
    pub feature_names: Vec<String>,
    /// Ordered list of class identifiers.
    pub classes: Vec<String>,
    pub trees: Vec<DecisionTree>,
}

impl ForestModel {
    pub const FORMAT_VERSION: i64 = 1;

    /// Validate structural invariants of the model.
    pub fn validate(&self) -> Result<(), String> {
        if self.model_version != Self::FORMAT_VERSION {
            return Err(format!(
                "Unsupported model_version {} (expected {})",
                self.model_version,
                Self::FORMAT_VERSION
            ));
        }
        if self.classes.is_empty() {
            return Err("Model must contain at least 1 class".to_string());
        }
        if self.trees.is_empty() {
            return Err("Model must contain at least 1 tree".to_string());
        }
        for (tree_idx, tree) in self.trees.iter().enumerate() {
            tree.validate(self.feature_names.len(), self.classes.len())
                .map_err(|err| format!("tree {tree_idx}: {err}"))?;
        }
        Ok(())
    }

    /// Mean of per-tree leaf distributions.
    pub fn predict_proba(&self, features: &[f32]) -> Vec<f32> {
        let n_classes = self.classes.len();
        let mut sum = vec![0.0f32; n_classes];
        let mut voters = 0usize;
        for tree in &self.trees {
            let dist = tree.predict_proba(features);
            if dist.len() != n_classes {
                continue;
            }
            for (acc, &p) in sum.iter_mut().zip(dist) {
                *acc += p;
            }
            voters += 1;
        }
        if voters > 0 {
            for v in &mut sum {
                *v /= voters as f32;
            }
        }
        sum
    }

    pub fn predict_class_index(&self, features: &[f32]) -> usize {
        argmax(&self.predict_proba(features))
    }

    pub fn predict_class(&self, features: &[f32]) -> Option<&str> {
        self.classes
            .get(self.predict_class_index(features))
            .map(String::as_str)
    }
}
