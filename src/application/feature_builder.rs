//! Feature builder: turns a validated record into the classifier input.
//!
//! Steps run in a fixed order: encode the categorical columns, standardize
//! the six numeric columns, derive `Cholesterol_to_MaxHR` from the scaled
//! values, then assemble the 12 columns in model order.

use crate::domain::{
    EncoderSet, FeatureColumn, FeatureVector, NumericColumn, NumericScaler, NumericValues,
    PatientRecord,
};
use crate::CardioRiskError;

/// Borrowed view over the fitted preprocessing artifacts.
#[derive(Debug, Clone, Copy)]
pub struct FeatureBuilder<'a> {
    encoders: &'a EncoderSet,
    scaler: &'a NumericScaler,
}

/// Categorical codes in encoder output form.
#[derive(Debug, Clone, Copy)]
struct EncodedCategories {
    sex: f64,
    chest_pain_type: f64,
    resting_ecg: f64,
    exercise_angina: f64,
    st_slope: f64,
}

impl<'a> FeatureBuilder<'a> {
    #[must_use]
    pub fn new(encoders: &'a EncoderSet, scaler: &'a NumericScaler) -> Self {
        Self { encoders, scaler }
    }

    /// Build the feature vector for one record.
    ///
    /// # Errors
    /// - `UnknownCategory` if a fitted encoder lacks the record's label
    /// - `DegenerateInput` if the scaled MaxHR is zero or the derived ratio is
    ///   not finite
    pub fn build(&self, record: &PatientRecord) -> Result<FeatureVector, CardioRiskError> {
        let codes = self.encode(record)?;
        let scaled = self.scaler.transform(&record.numeric_values());
        let ratio = cholesterol_to_max_hr(&scaled)?;

        let vector = FeatureVector::try_assemble(|column| {
            Ok::<f64, CardioRiskError>(match column {
                FeatureColumn::Age => scaled[NumericColumn::Age],
                FeatureColumn::Sex => codes.sex,
                FeatureColumn::ChestPainType => codes.chest_pain_type,
                FeatureColumn::RestingBp => scaled[NumericColumn::RestingBp],
                FeatureColumn::Cholesterol => scaled[NumericColumn::Cholesterol],
                FeatureColumn::FastingBs => scaled[NumericColumn::FastingBs],
                FeatureColumn::RestingEcg => codes.resting_ecg,
                FeatureColumn::MaxHr => scaled[NumericColumn::MaxHr],
                FeatureColumn::ExerciseAngina => codes.exercise_angina,
                FeatureColumn::Oldpeak => scaled[NumericColumn::Oldpeak],
                FeatureColumn::StSlope => codes.st_slope,
                FeatureColumn::CholesterolToMaxHr => ratio,
            })
        })?;

        if !vector.is_finite() {
            return Err(CardioRiskError::DegenerateInput(format!(
                "feature vector contains non-finite values: {vector}"
            )));
        }

        tracing::debug!("Built feature vector {}", vector);
        Ok(vector)
    }

    fn encode(&self, record: &PatientRecord) -> Result<EncodedCategories, CardioRiskError> {
        Ok(EncodedCategories {
            sex: self.encoders.encode(record.sex())?,
            chest_pain_type: self.encoders.encode(record.chest_pain_type())?,
            resting_ecg: self.encoders.encode(record.resting_ecg())?,
            exercise_angina: self.encoders.encode(record.exercise_angina())?,
            st_slope: self.encoders.encode(record.st_slope())?,
        })
    }
}

/// Derived ratio of the scaled Cholesterol to the scaled MaxHR.
fn cholesterol_to_max_hr(scaled: &NumericValues) -> Result<f64, CardioRiskError> {
    let max_hr = scaled[NumericColumn::MaxHr];
    if max_hr == 0.0 {
        return Err(CardioRiskError::DegenerateInput(
            "scaled MaxHR is zero, Cholesterol_to_MaxHR is undefined".into(),
        ));
    }
    let ratio = scaled[NumericColumn::Cholesterol] / max_hr;
    if !ratio.is_finite() {
        return Err(CardioRiskError::DegenerateInput(format!(
            "Cholesterol_to_MaxHR is not finite ({ratio})"
        )));
    }
    Ok(ratio)
}

/// Free-function form of [`FeatureBuilder::build`].
///
/// # Errors
/// See [`FeatureBuilder::build`].
pub fn build(
    record: &PatientRecord,
    encoders: &EncoderSet,
    scaler: &NumericScaler,
) -> Result<FeatureVector, CardioRiskError> {
    FeatureBuilder::new(encoders, scaler).build(record)
}
