//! Domain layer: Core business types and logic.
//!
//! Pure types with no I/O. Preprocessing parameters and patient records
//! validate on construction, so downstream code can rely on them.

mod features;
mod patient;
mod prediction;
mod preprocessing;

pub use features::{
    FeatureColumn, FeatureVector, NumericColumn, NumericValues, FEATURE_COUNT, FEATURE_NAMES,
    NUMERIC_COUNT, NUMERIC_NAMES,
};
pub use patient::{
    Categorical, ChestPainType, ExerciseAngina, PatientInput, PatientRecord, RestingEcg, Sex,
    StSlope, OLDPEAK_RANGE,
};
pub use prediction::{
    Assessment, ClassProbabilities, PredictionResult, RiskBand, DISCLAIMER,
    LOW_RISK_BELOW_PERCENT, MODERATE_RISK_UP_TO_PERCENT,
};
pub use preprocessing::{CategoryEncoder, EncoderSet, NumericScaler};
