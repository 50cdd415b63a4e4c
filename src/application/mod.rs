//! Application layer: Use cases and services.
//!
//! Orchestrates the domain types and the classifier port into the
//! per-request prediction pipeline.

mod feature_builder;
mod pipeline;
mod risk_classifier;

pub use feature_builder::{build, FeatureBuilder};
pub use pipeline::{ModelArtifacts, PredictionService};
pub use risk_classifier::{predict, RiskClassifier};
