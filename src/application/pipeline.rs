//! Prediction service: the per-request pipeline over shared artifacts.
//!
//! Artifacts are loaded once and shared read-only behind an `Arc`; each
//! request builds its own record, vector and result.

use std::path::Path;
use std::sync::Arc;

use crate::adapters::artifacts::{check_feature_contract, ArtifactBundle, ArtifactLoader};
use crate::config::AppConfig;
use crate::domain::{
    Assessment, EncoderSet, FeatureVector, NumericScaler, PatientRecord, PredictionResult,
};
use crate::ports::Classifier;
use crate::CardioRiskError;

use super::feature_builder::FeatureBuilder;
use super::risk_classifier::RiskClassifier;

/// The fitted encoders, scaler and classifier of one training run.
pub struct ModelArtifacts {
    encoders: EncoderSet,
    scaler: NumericScaler,
    classifier: Box<dyn Classifier>,
}

impl ModelArtifacts {
    /// Combine artifacts, checking the classifier against the feature layout.
    ///
    /// # Errors
    /// Returns `ArtifactLoadFailure` if the classifier was not fit on the
    /// 12-column layout.
    pub fn new(
        encoders: EncoderSet,
        scaler: NumericScaler,
        classifier: Box<dyn Classifier>,
    ) -> Result<Self, CardioRiskError> {
        check_feature_contract(classifier.feature_names())?;
        Ok(Self {
            encoders,
            scaler,
            classifier,
        })
    }

    /// Load and verify the bundle in `dir`.
    ///
    /// # Errors
    /// Returns `ArtifactLoadFailure` on any loading or trust failure.
    pub fn load(dir: &Path, loader: &ArtifactLoader) -> Result<Self, CardioRiskError> {
        Self::try_from(loader.load(dir)?)
    }

    #[must_use]
    pub fn encoders(&self) -> &EncoderSet {
        &self.encoders
    }

    #[must_use]
    pub fn scaler(&self) -> &NumericScaler {
        &self.scaler
    }

    #[must_use]
    pub fn classifier(&self) -> &dyn Classifier {
        self.classifier.as_ref()
    }
}

impl TryFrom<ArtifactBundle> for ModelArtifacts {
    type Error = CardioRiskError;

    fn try_from(bundle: ArtifactBundle) -> Result<Self, Self::Error> {
        bundle.check()?;
        Ok(Self {
            encoders: bundle.encoders,
            scaler: bundle.scaler,
            classifier: Box::new(bundle.classifier),
        })
    }
}

impl std::fmt::Debug for ModelArtifacts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelArtifacts")
            .field("encoders", &self.encoders)
            .field("scaler", &self.scaler)
            .field("classifier", &self.classifier.name())
            .finish()
    }
}

/// Service for running risk predictions.
///
/// Cloning is cheap and clones share the same artifacts.
#[derive(Debug, Clone)]
pub struct PredictionService {
    artifacts: Arc<ModelArtifacts>,
}

impl PredictionService {
    #[must_use]
    pub fn new(artifacts: Arc<ModelArtifacts>) -> Self {
        Self { artifacts }
    }

    /// Load artifacts as described by `config`.
    ///
    /// # Errors
    /// Returns `ArtifactLoadFailure` if trust cannot be established or the
    /// bundle fails to load.
    pub fn from_config(config: &AppConfig) -> Result<Self, CardioRiskError> {
        let loader = ArtifactLoader::from_config(config)?;
        let artifacts = ModelArtifacts::load(&config.artifact_dir, &loader)?;
        Ok(Self::new(Arc::new(artifacts)))
    }

    #[must_use]
    pub fn artifacts(&self) -> &ModelArtifacts {
        &self.artifacts
    }

    /// # Errors
    /// See [`FeatureBuilder::build`].
    pub fn build_features(&self, record: &PatientRecord) -> Result<FeatureVector, CardioRiskError> {
        FeatureBuilder::new(&self.artifacts.encoders, &self.artifacts.scaler).build(record)
    }

    /// Run the full pipeline for one record.
    ///
    /// # Errors
    /// Any feature building or inference error; none yields a band.
    pub fn predict(&self, record: &PatientRecord) -> Result<PredictionResult, CardioRiskError> {
        let vector = self.build_features(record)?;
        let result = RiskClassifier::new(self.artifacts.classifier()).predict(&vector)?;
        tracing::info!(
            "Prediction complete: band={}, p_disease={:.4}",
            result.risk_band,
            result.probability_disease
        );
        Ok(result)
    }

    /// Predict and stamp the result with an id and timestamp.
    ///
    /// # Errors
    /// See [`PredictionService::predict`].
    pub fn assess(
        &self,
        record: &PatientRecord,
        patient_id: Option<&str>,
    ) -> Result<Assessment, CardioRiskError> {
        let result = self.predict(record)?;
        let assessment = match patient_id {
            Some(id) => Assessment::with_patient(result, id),
            None => Assessment::new(result),
        };
        tracing::debug!("Assessment {} created", assessment.id);
        Ok(assessment)
    }
}
