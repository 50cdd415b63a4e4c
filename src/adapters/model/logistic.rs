//! Logistic regression evaluation.

use serde::{Deserialize, Serialize};

use crate::domain::ClassProbabilities;
use crate::ports::{check_input, Classifier, ClassifierError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogisticRegression {
    pub feature_names: Vec<String>,
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

impl LogisticRegression {
    /// # Errors
    /// Fails on a coefficient count mismatch or non-finite parameters.
    pub fn validate(&self) -> Result<(), String> {
        if self.coefficients.len() != self.feature_names.len() {
            return Err(format!(
                "logistic regression has {} coefficients for {} features",
                self.coefficients.len(),
                self.feature_names.len()
            ));
        }
        if !self.intercept.is_finite() || self.coefficients.iter().any(|c| !c.is_finite()) {
            return Err("logistic regression parameters are not finite".into());
        }
        Ok(())
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

impl Classifier for LogisticRegression {
    fn name(&self) -> &str {
        "logistic_regression"
    }

    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn predict_proba(&self, features: &[f64]) -> Result<ClassProbabilities, ClassifierError> {
        check_input(self.n_features(), features)?;
        if self.coefficients.len() != features.len() {
            return Err(ClassifierError::InvalidOutput(
                "coefficient count does not match feature count".into(),
            ));
        }
        let z = self.intercept
            + self
                .coefficients
                .iter()
                .zip(features)
                .map(|(w, x)| w * x)
                .sum::<f64>();
        let disease = sigmoid(z);
        Ok(ClassProbabilities {
            no_disease: 1.0 - disease,
            disease,
        })
    }
}
