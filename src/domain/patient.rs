//! Patient record types for heart disease risk prediction.
//!
//! Eleven clinical attributes, as collected by the intake form. Categorical
//! attributes are closed enumerations: a label outside the vocabulary is
//! rejected when the record is built, never mapped to a default.

use serde::{Deserialize, Serialize};

use super::features::{FeatureColumn, NumericColumn, NumericValues};
use super::preprocessing::{CategoryEncoder, EncoderSet};
use crate::CardioRiskError;

/// A closed categorical vocabulary for one feature column.
pub trait Categorical: Copy + Eq + std::fmt::Debug + 'static {
    /// Feature column this value is encoded into.
    const COLUMN: FeatureColumn;

    /// Every label the intake form offers.
    const VARIANTS: &'static [Self];

    /// Label as it appears in the training data.
    fn label(self) -> &'static str;

    /// The fitted encoder responsible for this column.
    fn encoder(encoders: &EncoderSet) -> &CategoryEncoder;

    /// Parse a raw label. Matching is exact and case-sensitive.
    ///
    /// # Errors
    /// Returns `UnknownCategory` if the label is not in the vocabulary.
    fn from_label(raw: &str) -> Result<Self, CardioRiskError> {
        Self::VARIANTS
            .iter()
            .copied()
            .find(|v| v.label() == raw)
            .ok_or_else(|| CardioRiskError::UnknownCategory {
                column: Self::COLUMN.name(),
                label: raw.to_string(),
            })
    }
}

/// Biological sex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Sex {
    #[serde(rename = "M")]
    Male,
    #[serde(rename = "F")]
    Female,
}

impl Categorical for Sex {
    const COLUMN: FeatureColumn = FeatureColumn::Sex;
    const VARIANTS: &'static [Self] = &[Self::Male, Self::Female];

    fn label(self) -> &'static str {
        match self {
            Self::Male => "M",
            Self::Female => "F",
        }
    }

    fn encoder(encoders: &EncoderSet) -> &CategoryEncoder {
        &encoders.sex
    }
}

/// Chest pain classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ChestPainType {
    #[serde(rename = "ATA")]
    AtypicalAngina,
    #[serde(rename = "NAP")]
    NonAnginalPain,
    #[serde(rename = "ASY")]
    Asymptomatic,
    #[serde(rename = "TA")]
    TypicalAngina,
}

impl Categorical for ChestPainType {
    const COLUMN: FeatureColumn = FeatureColumn::ChestPainType;
    const VARIANTS: &'static [Self] = &[
        Self::AtypicalAngina,
        Self::NonAnginalPain,
        Self::Asymptomatic,
        Self::TypicalAngina,
    ];

    fn label(self) -> &'static str {
        match self {
            Self::AtypicalAngina => "ATA",
            Self::NonAnginalPain => "NAP",
            Self::Asymptomatic => "ASY",
            Self::TypicalAngina => "TA",
        }
    }

    fn encoder(encoders: &EncoderSet) -> &CategoryEncoder {
        &encoders.chest_pain_type
    }
}

/// Resting electrocardiogram result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RestingEcg {
    Normal,
    /// ST-T wave abnormality
    #[serde(rename = "ST")]
    StAbnormality,
    /// Left ventricular hypertrophy
    #[serde(rename = "LVH")]
    Lvh,
}

impl Categorical for RestingEcg {
    const COLUMN: FeatureColumn = FeatureColumn::RestingEcg;
    const VARIANTS: &'static [Self] = &[Self::Normal, Self::StAbnormality, Self::Lvh];

    fn label(self) -> &'static str {
        match self {
            Self::Normal => "Normal",
            Self::StAbnormality => "ST",
            Self::Lvh => "LVH",
        }
    }

    fn encoder(encoders: &EncoderSet) -> &CategoryEncoder {
        &encoders.resting_ecg
    }
}

/// Exercise-induced angina.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ExerciseAngina {
    #[serde(rename = "N")]
    No,
    #[serde(rename = "Y")]
    Yes,
}

impl Categorical for ExerciseAngina {
    const COLUMN: FeatureColumn = FeatureColumn::ExerciseAngina;
    const VARIANTS: &'static [Self] = &[Self::No, Self::Yes];

    fn label(self) -> &'static str {
        match self {
            Self::No => "N",
            Self::Yes => "Y",
        }
    }

    fn encoder(encoders: &EncoderSet) -> &CategoryEncoder {
        &encoders.exercise_angina
    }
}

/// Slope of the peak exercise ST segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum StSlope {
    Up,
    Flat,
    Down,
}

impl Categorical for StSlope {
    const COLUMN: FeatureColumn = FeatureColumn::StSlope;
    const VARIANTS: &'static [Self] = &[Self::Up, Self::Flat, Self::Down];

    fn label(self) -> &'static str {
        match self {
            Self::Up => "Up",
            Self::Flat => "Flat",
            Self::Down => "Down",
        }
    }

    fn encoder(encoders: &EncoderSet) -> &CategoryEncoder {
        &encoders.st_slope
    }
}

/// Raw intake payload, keyed by training-data column names.
///
/// Nothing is checked at this stage; see [`PatientRecord::from_input`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PatientInput {
    #[serde(rename = "Age")]
    pub age: i64,
    #[serde(rename = "Sex")]
    pub sex: String,
    #[serde(rename = "ChestPainType")]
    pub chest_pain_type: String,
    #[serde(rename = "RestingBP")]
    pub resting_bp: i64,
    #[serde(rename = "Cholesterol")]
    pub cholesterol: i64,
    #[serde(rename = "FastingBS")]
    pub fasting_bs: i64,
    #[serde(rename = "RestingECG")]
    pub resting_ecg: String,
    #[serde(rename = "MaxHR")]
    pub max_hr: i64,
    #[serde(rename = "ExerciseAngina")]
    pub exercise_angina: String,
    #[serde(rename = "Oldpeak")]
    pub oldpeak: f64,
    #[serde(rename = "ST_Slope")]
    pub st_slope: String,
}

impl Default for PatientInput {
    /// The intake form's initial values.
    fn default() -> Self {
        Self {
            age: 40,
            sex: "M".into(),
            chest_pain_type: "ATA".into(),
            resting_bp: 140,
            cholesterol: 200,
            fasting_bs: 0,
            resting_ecg: "Normal".into(),
            max_hr: 150,
            exercise_angina: "N".into(),
            oldpeak: 0.0,
            st_slope: "Up".into(),
        }
    }
}

/// A validated patient record. Immutable once built.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PatientRecord {
    #[serde(rename = "Age")]
    age: u8,
    #[serde(rename = "Sex")]
    sex: Sex,
    #[serde(rename = "ChestPainType")]
    chest_pain_type: ChestPainType,
    #[serde(rename = "RestingBP")]
    resting_bp: u16,
    #[serde(rename = "Cholesterol")]
    cholesterol: u16,
    #[serde(rename = "FastingBS")]
    fasting_bs: u8,
    #[serde(rename = "RestingECG")]
    resting_ecg: RestingEcg,
    #[serde(rename = "MaxHR")]
    max_hr: u16,
    #[serde(rename = "ExerciseAngina")]
    exercise_angina: ExerciseAngina,
    #[serde(rename = "Oldpeak")]
    oldpeak: f64,
    #[serde(rename = "ST_Slope")]
    st_slope: StSlope,
}

/// Inclusive Oldpeak bounds offered by the intake form.
pub const OLDPEAK_RANGE: (f64, f64) = (-2.6, 6.2);

fn check_int(errors: &mut Vec<String>, name: &str, value: i64, max: i64) {
    if !(0..=max).contains(&value) {
        errors.push(format!("{name} {value} out of range [0, {max}]"));
    }
}

impl PatientRecord {
    /// Parse labels and check ranges.
    ///
    /// # Errors
    /// Returns `UnknownCategory` for the first label outside its vocabulary,
    /// or `Validation` listing every out-of-range numeric field.
    pub fn from_input(input: &PatientInput) -> Result<Self, CardioRiskError> {
        let sex = Sex::from_label(&input.sex)?;
        let chest_pain_type = ChestPainType::from_label(&input.chest_pain_type)?;
        let resting_ecg = RestingEcg::from_label(&input.resting_ecg)?;
        let exercise_angina = ExerciseAngina::from_label(&input.exercise_angina)?;
        let st_slope = StSlope::from_label(&input.st_slope)?;

        let mut errors = Vec::new();
        check_int(&mut errors, "Age", input.age, 120);
        check_int(&mut errors, "RestingBP", input.resting_bp, 300);
        check_int(&mut errors, "Cholesterol", input.cholesterol, 1000);
        check_int(&mut errors, "MaxHR", input.max_hr, 300);
        if input.fasting_bs != 0 && input.fasting_bs != 1 {
            errors.push(format!("FastingBS {} must be 0 or 1", input.fasting_bs));
        }
        let (lo, hi) = OLDPEAK_RANGE;
        if !input.oldpeak.is_finite() || input.oldpeak < lo || input.oldpeak > hi {
            errors.push(format!("Oldpeak {} out of range [{lo}, {hi}]", input.oldpeak));
        }
        if !errors.is_empty() {
            return Err(CardioRiskError::Validation(errors.join("; ")));
        }

        // Ranges were checked above, so the narrowing casts are lossless.
        Ok(Self {
            age: input.age as u8,
            sex,
            chest_pain_type,
            resting_bp: input.resting_bp as u16,
            cholesterol: input.cholesterol as u16,
            fasting_bs: input.fasting_bs as u8,
            resting_ecg,
            max_hr: input.max_hr as u16,
            exercise_angina,
            oldpeak: input.oldpeak,
            st_slope,
        })
    }

    /// Record built from the intake form defaults.
    #[must_use]
    pub fn example() -> Self {
        Self {
            age: 40,
            sex: Sex::Male,
            chest_pain_type: ChestPainType::AtypicalAngina,
            resting_bp: 140,
            cholesterol: 200,
            fasting_bs: 0,
            resting_ecg: RestingEcg::Normal,
            max_hr: 150,
            exercise_angina: ExerciseAngina::No,
            oldpeak: 0.0,
            st_slope: StSlope::Up,
        }
    }

    #[must_use]
    pub fn age(&self) -> u8 {
        self.age
    }

    #[must_use]
    pub fn sex(&self) -> Sex {
        self.sex
    }

    #[must_use]
    pub fn chest_pain_type(&self) -> ChestPainType {
        self.chest_pain_type
    }

    #[must_use]
    pub fn resting_bp(&self) -> u16 {
        self.resting_bp
    }

    #[must_use]
    pub fn cholesterol(&self) -> u16 {
        self.cholesterol
    }

    #[must_use]
    pub fn fasting_bs(&self) -> u8 {
        self.fasting_bs
    }

    #[must_use]
    pub fn resting_ecg(&self) -> RestingEcg {
        self.resting_ecg
    }

    #[must_use]
    pub fn max_hr(&self) -> u16 {
        self.max_hr
    }

    #[must_use]
    pub fn exercise_angina(&self) -> ExerciseAngina {
        self.exercise_angina
    }

    #[must_use]
    pub fn oldpeak(&self) -> f64 {
        self.oldpeak
    }

    #[must_use]
    pub fn st_slope(&self) -> StSlope {
        self.st_slope
    }

    /// Unscaled values of the six scaler columns, in scaler order.
    #[must_use]
    pub fn numeric_values(&self) -> NumericValues {
        NumericValues::from_fn(|column| match column {
            NumericColumn::Age => f64::from(self.age),
            NumericColumn::RestingBp => f64::from(self.resting_bp),
            NumericColumn::Cholesterol => f64::from(self.cholesterol),
            NumericColumn::FastingBs => f64::from(self.fasting_bs),
            NumericColumn::MaxHr => f64::from(self.max_hr),
            NumericColumn::Oldpeak => self.oldpeak,
        })
    }
}

impl TryFrom<&PatientInput> for PatientRecord {
    type Error = CardioRiskError;

    fn try_from(input: &PatientInput) -> Result<Self, Self::Error> {
        Self::from_input(input)
    }
}
