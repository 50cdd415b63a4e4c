//! Fitted preprocessing parameters: categorical encoders and the numeric scaler.
//!
//! Both are produced at training time and only ever read here. Their serde
//! representations mirror the exported training artifacts and are validated
//! on deserialization, so a loaded value is always usable.

use serde::{Deserialize, Serialize};

use super::features::{NumericColumn, NumericValues, NUMERIC_COUNT, NUMERIC_NAMES};
use super::patient::{Categorical, ChestPainType, ExerciseAngina, RestingEcg, Sex, StSlope};
use crate::CardioRiskError;

/// Label to integer code mapping learned for one categorical column.
///
/// The code of a label is its position in `classes`, matching a fitted
/// label encoder whose `classes_` are exported in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "EncoderParams", into = "EncoderParams")]
pub struct CategoryEncoder {
    classes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct EncoderParams {
    classes: Vec<String>,
}

impl TryFrom<EncoderParams> for CategoryEncoder {
    type Error = String;

    fn try_from(params: EncoderParams) -> Result<Self, Self::Error> {
        Self::new(params.classes)
    }
}

impl From<CategoryEncoder> for EncoderParams {
    fn from(encoder: CategoryEncoder) -> Self {
        Self {
            classes: encoder.classes,
        }
    }
}

impl CategoryEncoder {
    /// # Errors
    /// Fails if `classes` is empty or contains duplicates.
    pub fn new(classes: Vec<String>) -> Result<Self, String> {
        if classes.is_empty() {
            return Err("encoder has no classes".into());
        }
        for (i, label) in classes.iter().enumerate() {
            if classes[..i].contains(label) {
                return Err(format!("encoder lists class {label:?} twice"));
            }
        }
        Ok(Self { classes })
    }

    /// Encoder over labels in the given order.
    ///
    /// # Errors
    /// Same as [`CategoryEncoder::new`].
    pub fn from_labels<'a>(labels: impl IntoIterator<Item = &'a str>) -> Result<Self, String> {
        Self::new(labels.into_iter().map(str::to_string).collect())
    }

    #[must_use]
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Integer code of `label`, if it was seen at training time.
    #[must_use]
    pub fn code_of(&self, label: &str) -> Option<usize> {
        self.classes.iter().position(|c| c == label)
    }
}

/// The five fitted encoders, one per categorical column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EncoderSet {
    #[serde(rename = "Sex")]
    pub(crate) sex: CategoryEncoder,
    #[serde(rename = "ChestPainType")]
    pub(crate) chest_pain_type: CategoryEncoder,
    #[serde(rename = "RestingECG")]
    pub(crate) resting_ecg: CategoryEncoder,
    #[serde(rename = "ExerciseAngina")]
    pub(crate) exercise_angina: CategoryEncoder,
    #[serde(rename = "ST_Slope")]
    pub(crate) st_slope: CategoryEncoder,
}

impl EncoderSet {
    #[must_use]
    pub fn new(
        sex: CategoryEncoder,
        chest_pain_type: CategoryEncoder,
        resting_ecg: CategoryEncoder,
        exercise_angina: CategoryEncoder,
        st_slope: CategoryEncoder,
    ) -> Self {
        Self {
            sex,
            chest_pain_type,
            resting_ecg,
            exercise_angina,
            st_slope,
        }
    }

    /// Encode one categorical value as the numeric code the classifier saw.
    ///
    /// # Errors
    /// Returns `UnknownCategory` if the fitted encoder never saw the label.
    pub fn encode<C: Categorical>(&self, value: C) -> Result<f64, CardioRiskError> {
        C::encoder(self)
            .code_of(value.label())
            .map(|code| code as f64)
            .ok_or_else(|| CardioRiskError::UnknownCategory {
                column: C::COLUMN.name(),
                label: value.label().to_string(),
            })
    }

    /// Each encoder with its dataset column name, in feature order.
    #[must_use]
    pub fn columns(&self) -> [(&'static str, &CategoryEncoder); 5] {
        [
            (Sex::COLUMN.name(), &self.sex),
            (ChestPainType::COLUMN.name(), &self.chest_pain_type),
            (RestingEcg::COLUMN.name(), &self.resting_ecg),
            (ExerciseAngina::COLUMN.name(), &self.exercise_angina),
            (StSlope::COLUMN.name(), &self.st_slope),
        ]
    }

    /// Form labels that the fitted encoders cannot encode, as `(column, label)`.
    #[must_use]
    pub fn vocabulary_gaps(&self) -> Vec<(&'static str, &'static str)> {
        let mut gaps = Vec::new();
        collect_gaps::<Sex>(self, &mut gaps);
        collect_gaps::<ChestPainType>(self, &mut gaps);
        collect_gaps::<RestingEcg>(self, &mut gaps);
        collect_gaps::<ExerciseAngina>(self, &mut gaps);
        collect_gaps::<StSlope>(self, &mut gaps);
        gaps
    }
}

fn collect_gaps<C: Categorical>(set: &EncoderSet, out: &mut Vec<(&'static str, &'static str)>) {
    let encoder = C::encoder(set);
    for value in C::VARIANTS {
        if encoder.code_of(value.label()).is_none() {
            out.push((C::COLUMN.name(), value.label()));
        }
    }
}

/// Per-column standardization: `(x - mean) / scale`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ScalerParams", into = "ScalerParams")]
pub struct NumericScaler {
    mean: [f64; NUMERIC_COUNT],
    scale: [f64; NUMERIC_COUNT],
}

/// Exported scaler layout: parallel arrays plus the columns they were fit on.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct ScalerParams {
    columns: Vec<String>,
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl TryFrom<ScalerParams> for NumericScaler {
    type Error = String;

    fn try_from(params: ScalerParams) -> Result<Self, Self::Error> {
        if params.columns != NUMERIC_NAMES {
            return Err(format!(
                "scaler columns {:?} do not match expected {:?}",
                params.columns, NUMERIC_NAMES
            ));
        }
        let mean: [f64; NUMERIC_COUNT] = params.mean.try_into().map_err(|v: Vec<f64>| {
            format!("scaler mean has {} values, expected {NUMERIC_COUNT}", v.len())
        })?;
        let scale: [f64; NUMERIC_COUNT] = params.scale.try_into().map_err(|v: Vec<f64>| {
            format!("scaler scale has {} values, expected {NUMERIC_COUNT}", v.len())
        })?;
        Self::new(mean, scale)
    }
}

impl From<NumericScaler> for ScalerParams {
    fn from(scaler: NumericScaler) -> Self {
        Self {
            columns: NUMERIC_NAMES.iter().map(|s| s.to_string()).collect(),
            mean: scaler.mean.to_vec(),
            scale: scaler.scale.to_vec(),
        }
    }
}

impl NumericScaler {
    /// Parameters are given in [`NumericColumn::ALL`] order.
    ///
    /// # Errors
    /// Fails on non-finite parameters or a zero scale.
    pub fn new(mean: [f64; NUMERIC_COUNT], scale: [f64; NUMERIC_COUNT]) -> Result<Self, String> {
        for column in NumericColumn::ALL {
            let (m, s) = (mean[column.index()], scale[column.index()]);
            if !m.is_finite() || !s.is_finite() {
                return Err(format!("scaler parameters for {} are not finite", column.name()));
            }
            if s == 0.0 {
                return Err(format!("scaler scale for {} is zero", column.name()));
            }
        }
        Ok(Self { mean, scale })
    }

    #[must_use]
    pub fn mean(&self, column: NumericColumn) -> f64 {
        self.mean[column.index()]
    }

    #[must_use]
    pub fn scale(&self, column: NumericColumn) -> f64 {
        self.scale[column.index()]
    }

    /// Standardize all six columns.
    #[must_use]
    pub fn transform(&self, raw: &NumericValues) -> NumericValues {
        NumericValues::from_fn(|column| {
            (raw[column] - self.mean[column.index()]) / self.scale[column.index()]
        })
    }
}
