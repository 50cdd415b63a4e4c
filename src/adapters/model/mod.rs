//! Trained model adapters implementing the `Classifier` port.
//!
//! The exported classifier artifact names its model family in a `kind` tag.

mod forest;
mod logistic;

use serde::{Deserialize, Serialize};

pub use forest::{DecisionTree, RandomForest, TreeNode};
pub use logistic::LogisticRegression;

use crate::domain::ClassProbabilities;
use crate::ports::{Classifier, ClassifierError};

/// A classifier artifact as exported by the training pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelArtifact {
    RandomForest(RandomForest),
    LogisticRegression(LogisticRegression),
}

impl ModelArtifact {
    /// # Errors
    /// Returns a description of the first structural problem.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Self::RandomForest(m) => m.validate(),
            Self::LogisticRegression(m) => m.validate(),
        }
    }

    fn inner(&self) -> &dyn Classifier {
        match self {
            Self::RandomForest(m) => m as &dyn Classifier,
            Self::LogisticRegression(m) => m as &dyn Classifier,
        }
    }
}

impl Classifier for ModelArtifact {
    fn name(&self) -> &str {
        self.inner().name()
    }

    fn feature_names(&self) -> &[String] {
        self.inner().feature_names()
    }

    fn predict_proba(&self, features: &[f64]) -> Result<ClassProbabilities, ClassifierError> {
        self.inner().predict_proba(features)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_tag_selects_family() {
        let json = r#"{
            "kind": "logistic_regression",
            "feature_names": ["a"],
            "coefficients": [1.0],
            "intercept": 0.0
        }"#;
        let model: ModelArtifact = serde_json::from_str(json).expect("parse");
        assert_eq!(model.name(), "logistic_regression");
        assert_eq!(model.n_features(), 1);
        assert!(model.validate().is_ok());

        let forest = r#"{
            "kind": "random_forest",
            "feature_names": ["a"],
            "trees": [{"nodes": [{"value": [1, 3]}]}]
        }"#;
        let model: ModelArtifact = serde_json::from_str(forest).expect("parse");
        let p = model.predict_proba(&[0.0]).unwrap();
        assert!((p.disease - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let json = r#"{"kind": "svm", "feature_names": []}"#;
        assert!(serde_json::from_str::<ModelArtifact>(json).is_err());
    }
}
