//! # CardioRisk
//!
//! Heart disease risk prediction from eleven clinical attributes.
//!
//! This crate provides:
//! - Validated patient records with closed categorical vocabularies
//! - The preprocessing pipeline the classifier was trained with (label
//!   encoding, standardization, a derived Cholesterol/MaxHR ratio)
//! - Random forest and logistic regression evaluation over exported models
//! - Signed, integrity-checked artifact bundles
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture:
//! - `domain`: Core types (PatientRecord, FeatureVector, PredictionResult)
//! - `ports`: Trait definitions for external operations (Classifier)
//! - `adapters`: Concrete implementations (artifact bundle, model families)
//! - `application`: The per-request prediction pipeline
//! - `config`: Environment-driven runtime settings

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

pub use application::{ModelArtifacts, PredictionService};
pub use domain::{PatientInput, PatientRecord, PredictionResult, RiskBand};

/// Result type for CardioRisk operations
pub type Result<T> = std::result::Result<T, CardioRiskError>;

/// Main error type for CardioRisk
#[derive(Debug, thiserror::Error)]
pub enum CardioRiskError {
    #[error("Unknown category {label:?} for column {column}")]
    UnknownCategory { column: &'static str, label: String },

    #[error("Degenerate input: {0}")]
    DegenerateInput(String),

    #[error("Artifact load failed: {0}")]
    ArtifactLoadFailure(#[from] adapters::ArtifactError),

    #[error("Classifier inference failed: {0}")]
    ClassifierInferenceFailure(String),

    #[error("Invalid patient data: {0}")]
    Validation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
