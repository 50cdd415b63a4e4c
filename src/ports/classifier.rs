//! Classifier port: trait for class-probability inference.
//!
//! This trait abstracts the trained model from the inference pipeline.

use crate::domain::ClassProbabilities;

/// Errors raised while evaluating a classifier.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClassifierError {
    #[error("feature count mismatch: got {got}, expected {expected}")]
    FeatureCount { expected: usize, got: usize },

    #[error("feature {index} is not finite ({value})")]
    NonFiniteFeature { index: usize, value: f64 },

    #[error("model produced invalid output: {0}")]
    InvalidOutput(String),
}

/// Trait for trained binary classifiers.
///
/// Implementations are immutable after construction and shared across
/// requests, hence `Send + Sync`.
pub trait Classifier: Send + Sync {
    /// Short model description for logs.
    fn name(&self) -> &str;

    /// Column names the model was fit on, in input order.
    fn feature_names(&self) -> &[String];

    /// Number of inputs the model expects.
    fn n_features(&self) -> usize {
        self.feature_names().len()
    }

    /// Class probabilities `[no disease, disease]` for one sample.
    ///
    /// # Errors
    /// Returns `ClassifierError` if the input has the wrong shape, contains
    /// non-finite values, or the model state is inconsistent.
    fn predict_proba(&self, features: &[f64]) -> Result<ClassProbabilities, ClassifierError>;
}

/// Shape and finiteness check shared by classifier implementations.
///
/// # Errors
/// Returns the first violation found.
pub fn check_input(expected: usize, features: &[f64]) -> Result<(), ClassifierError> {
    if features.len() != expected {
        return Err(ClassifierError::FeatureCount {
            expected,
            got: features.len(),
        });
    }
    if let Some((index, &value)) = features.iter().enumerate().find(|(_, v)| !v.is_finite()) {
        return Err(ClassifierError::NonFiniteFeature { index, value });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_input() {
        assert!(check_input(3, &[1.0, 2.0, 3.0]).is_ok());
        assert_eq!(
            check_input(3, &[1.0, 2.0]),
            Err(ClassifierError::FeatureCount { expected: 3, got: 2 })
        );
        assert!(matches!(
            check_input(2, &[1.0, f64::INFINITY]),
            Err(ClassifierError::NonFiniteFeature { index: 1, .. })
        ));
    }
}
