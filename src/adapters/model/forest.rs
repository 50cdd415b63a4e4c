//! Random forest evaluation over exported decision trees.
//!
//! Trees are stored as flat node arrays. A split sends a sample to `left`
//! when `x[feature] <= threshold`, otherwise to `right`. Leaves hold the
//! class distribution of their training samples (counts or fractions).
//! The forest probability is the mean of the per-tree normalized leaf
//! distributions.

use serde::{Deserialize, Serialize};

use crate::domain::ClassProbabilities;
use crate::ports::{check_input, Classifier, ClassifierError};

/// Number of classes a leaf distribution must cover.
const N_CLASSES: usize = 2;

/// A single tree node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: Vec<f64>,
    },
}

impl TreeNode {
    #[must_use]
    pub fn split(feature: usize, threshold: f64, left: usize, right: usize) -> Self {
        Self::Split {
            feature,
            threshold,
            left,
            right,
        }
    }

    #[must_use]
    pub fn leaf(no_disease: f64, disease: f64) -> Self {
        Self::Leaf {
            value: vec![no_disease, disease],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DecisionTree {
    pub nodes: Vec<TreeNode>,
}

impl DecisionTree {
    #[must_use]
    pub fn new(nodes: Vec<TreeNode>) -> Self {
        Self { nodes }
    }

    /// Structural checks run once at load.
    ///
    /// Children must point forward, which rules out cycles and bounds
    /// traversal by the node count.
    ///
    /// # Errors
    /// Returns a description of the first malformed node.
    pub fn validate(&self, n_features: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".into());
        }
        let n = self.nodes.len();
        for (i, node) in self.nodes.iter().enumerate() {
            match node {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature >= n_features {
                        return Err(format!(
                            "node {i} splits on feature {feature}, model has {n_features}"
                        ));
                    }
                    if !threshold.is_finite() {
                        return Err(format!("node {i} has a non-finite threshold"));
                    }
                    for child in [*left, *right] {
                        if child <= i || child >= n {
                            return Err(format!("node {i} has invalid child index {child}"));
                        }
                    }
                }
                TreeNode::Leaf { value } => {
                    if value.len() != N_CLASSES {
                        return Err(format!(
                            "leaf {i} has {} class values, expected {N_CLASSES}",
                            value.len()
                        ));
                    }
                    if value.iter().any(|v| !v.is_finite() || *v < 0.0) {
                        return Err(format!("leaf {i} has a negative or non-finite value"));
                    }
                    if value.iter().sum::<f64>() <= 0.0 {
                        return Err(format!("leaf {i} has an empty class distribution"));
                    }
                }
            }
        }
        Ok(())
    }

    /// Normalized class distribution of the leaf `features` falls into.
    fn leaf_distribution(&self, features: &[f64]) -> Result<[f64; N_CLASSES], ClassifierError> {
        let mut idx = 0;
        // Forward-only children mean a valid walk visits at most `nodes.len()` nodes.
        for _ in 0..self.nodes.len() {
            let node = self.nodes.get(idx).ok_or_else(|| {
                ClassifierError::InvalidOutput(format!("tree walked to missing node {idx}"))
            })?;
            match node {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let x = features.get(*feature).ok_or_else(|| {
                        ClassifierError::InvalidOutput(format!(
                            "split references missing feature {feature}"
                        ))
                    })?;
                    idx = if *x <= *threshold { *left } else { *right };
                }
                TreeNode::Leaf { value } => {
                    let total: f64 = value.iter().sum();
                    if value.len() != N_CLASSES || total <= 0.0 {
                        return Err(ClassifierError::InvalidOutput(format!(
                            "leaf {idx} has an unusable class distribution"
                        )));
                    }
                    return Ok([value[0] / total, value[1] / total]);
                }
            }
        }
        Err(ClassifierError::InvalidOutput(
            "tree traversal did not reach a leaf".into(),
        ))
    }
}

/// Bagged ensemble of decision trees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RandomForest {
    pub feature_names: Vec<String>,
    pub trees: Vec<DecisionTree>,
}

impl RandomForest {
    #[must_use]
    pub fn new(feature_names: Vec<String>, trees: Vec<DecisionTree>) -> Self {
        Self {
            feature_names,
            trees,
        }
    }

    /// # Errors
    /// Fails if the forest is empty or any tree is malformed.
    pub fn validate(&self) -> Result<(), String> {
        if self.trees.is_empty() {
            return Err("random forest has no trees".into());
        }
        let n = self.feature_names.len();
        for (t, tree) in self.trees.iter().enumerate() {
            tree.validate(n).map_err(|e| format!("tree {t}: {e}"))?;
        }
        Ok(())
    }
}

impl Classifier for RandomForest {
    fn name(&self) -> &str {
        "random_forest"
    }

    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn predict_proba(&self, features: &[f64]) -> Result<ClassProbabilities, ClassifierError> {
        check_input(self.n_features(), features)?;
        if self.trees.is_empty() {
            return Err(ClassifierError::InvalidOutput("random forest has no trees".into()));
        }

        let mut acc = [0.0; N_CLASSES];
        for tree in &self.trees {
            let dist = tree.leaf_distribution(features)?;
            acc[0] += dist[0];
            acc[1] += dist[1];
        }
        let n = self.trees.len() as f64;
        Ok(ClassProbabilities {
            no_disease: acc[0] / n,
            disease: acc[1] / n,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("x{i}")).collect()
    }

    fn stump(feature: usize, threshold: f64, left: (f64, f64), right: (f64, f64)) -> DecisionTree {
        DecisionTree::new(vec![
            TreeNode::split(feature, threshold, 1, 2),
            TreeNode::leaf(left.0, left.1),
            TreeNode::leaf(right.0, right.1),
        ])
    }

    #[test]
    fn test_split_is_inclusive_on_left() {
        let forest = RandomForest::new(names(1), vec![stump(0, 0.5, (1.0, 0.0), (0.0, 1.0))]);
        let at = forest.predict_proba(&[0.5]).unwrap();
        assert_eq!(at.disease, 0.0);
        let above = forest.predict_proba(&[0.5000001]).unwrap();
        assert_eq!(above.disease, 1.0);
    }

    #[test]
    fn test_forest_averages_normalized_leaves() {
        // Leaf counts are normalized per tree before averaging.
        let forest = RandomForest::new(
            names(2),
            vec![
                stump(0, 0.0, (30.0, 10.0), (0.0, 5.0)),
                stump(1, 0.0, (0.2, 0.8), (0.9, 0.1)),
            ],
        );
        let p = forest.predict_proba(&[-1.0, -1.0]).unwrap();
        assert!((p.disease - (0.25 + 0.8) / 2.0).abs() < 1e-12);
        assert!((p.no_disease + p.disease - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_wrong_shape_rejected() {
        let forest = RandomForest::new(names(2), vec![stump(0, 0.0, (1.0, 0.0), (0.0, 1.0))]);
        assert!(matches!(
            forest.predict_proba(&[0.0]),
            Err(ClassifierError::FeatureCount { expected: 2, got: 1 })
        ));
        assert!(matches!(
            forest.predict_proba(&[0.0, f64::NAN]),
            Err(ClassifierError::NonFiniteFeature { index: 1, .. })
        ));
    }

    #[test]
    fn test_validate_catches_malformed_trees() {
        let backwards = DecisionTree::new(vec![
            TreeNode::leaf(1.0, 0.0),
            TreeNode::split(0, 0.0, 0, 0),
        ]);
        assert!(backwards.validate(1).is_err());

        let bad_feature = stump(3, 0.0, (1.0, 0.0), (0.0, 1.0));
        assert!(bad_feature.validate(2).unwrap_err().contains("feature 3"));

        let empty_leaf = stump(0, 0.0, (0.0, 0.0), (0.0, 1.0));
        assert!(empty_leaf.validate(1).is_err());

        let three_class = DecisionTree::new(vec![TreeNode::Leaf {
            value: vec![1.0, 1.0, 1.0],
        }]);
        assert!(three_class.validate(1).is_err());

        assert!(RandomForest::new(names(1), vec![]).validate().is_err());
    }

    #[test]
    fn test_node_json_shapes() {
        let json = r#"{"nodes": [
            {"feature": 0, "threshold": 1.5, "left": 1, "right": 2},
            {"value": [3, 1]},
            {"value": [0.1, 0.9]}
        ]}"#;
        let tree: DecisionTree = serde_json::from_str(json).expect("parse");
        assert_eq!(tree.nodes[0], TreeNode::split(0, 1.5, 1, 2));
        assert_eq!(tree.nodes[1], TreeNode::leaf(3.0, 1.0));
        assert!(tree.validate(1).is_ok());
    }
}
