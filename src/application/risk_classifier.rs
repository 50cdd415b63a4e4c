//! Risk classifier: runs the trained model and bands the result.

use crate::domain::{FeatureVector, PredictionResult};
use crate::ports::Classifier;
use crate::CardioRiskError;

/// Applies a shared classifier to feature vectors.
pub struct RiskClassifier<'a> {
    classifier: &'a dyn Classifier,
}

impl<'a> RiskClassifier<'a> {
    #[must_use]
    pub fn new(classifier: &'a dyn Classifier) -> Self {
        Self { classifier }
    }

    /// Class probabilities and risk band for one vector.
    ///
    /// # Errors
    /// Returns `ClassifierInferenceFailure` if the model rejects the vector or
    /// returns probabilities that are not a valid distribution. No band is
    /// produced in that case.
    pub fn predict(&self, vector: &FeatureVector) -> Result<PredictionResult, CardioRiskError> {
        let probabilities = self
            .classifier
            .predict_proba(vector.as_slice())
            .map_err(|e| {
                tracing::error!(
                    "Classifier {} rejected feature vector {}: {}",
                    self.classifier.name(),
                    vector,
                    e
                );
                CardioRiskError::ClassifierInferenceFailure(e.to_string())
            })?;

        if let Err(reason) = probabilities.check() {
            tracing::error!(
                "Classifier {} returned invalid probabilities {:?} for {}: {}",
                self.classifier.name(),
                probabilities,
                vector,
                reason
            );
            return Err(CardioRiskError::ClassifierInferenceFailure(reason));
        }

        Ok(PredictionResult::from_probabilities(probabilities))
    }
}

/// Free-function form of [`RiskClassifier::predict`].
///
/// # Errors
/// See [`RiskClassifier::predict`].
pub fn predict(
    vector: &FeatureVector,
    classifier: &dyn Classifier,
) -> Result<PredictionResult, CardioRiskError> {
    RiskClassifier::new(classifier).predict(vector)
}
