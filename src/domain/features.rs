//! Feature vector layout expected by the classifier.
//!
//! The column order declared here is the single source of truth: the feature
//! builder assembles vectors from it and the artifact loader validates the
//! classifier's declared feature names against it.

use std::ops::Index;

use serde::ser::{Serialize, SerializeMap, Serializer};

/// Number of columns fed to the classifier.
pub const FEATURE_COUNT: usize = 12;

/// Number of columns passed through the numeric scaler.
pub const NUMERIC_COUNT: usize = 6;

/// One column of the classifier input, in model order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureColumn {
    Age = 0,
    Sex = 1,
    ChestPainType = 2,
    RestingBp = 3,
    Cholesterol = 4,
    FastingBs = 5,
    RestingEcg = 6,
    MaxHr = 7,
    ExerciseAngina = 8,
    Oldpeak = 9,
    StSlope = 10,
    /// Derived: scaled cholesterol over scaled max heart rate.
    CholesterolToMaxHr = 11,
}

impl FeatureColumn {
    /// All columns in the order the classifier was fit on.
    pub const ALL: [FeatureColumn; FEATURE_COUNT] = [
        Self::Age,
        Self::Sex,
        Self::ChestPainType,
        Self::RestingBp,
        Self::Cholesterol,
        Self::FastingBs,
        Self::RestingEcg,
        Self::MaxHr,
        Self::ExerciseAngina,
        Self::Oldpeak,
        Self::StSlope,
        Self::CholesterolToMaxHr,
    ];

    /// Column name as it appears in the training data.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Age => "Age",
            Self::Sex => "Sex",
            Self::ChestPainType => "ChestPainType",
            Self::RestingBp => "RestingBP",
            Self::Cholesterol => "Cholesterol",
            Self::FastingBs => "FastingBS",
            Self::RestingEcg => "RestingECG",
            Self::MaxHr => "MaxHR",
            Self::ExerciseAngina => "ExerciseAngina",
            Self::Oldpeak => "Oldpeak",
            Self::StSlope => "ST_Slope",
            Self::CholesterolToMaxHr => "Cholesterol_to_MaxHR",
        }
    }

    /// Position of this column in the feature vector.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Look up a column by its training-data name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.name() == name)
    }
}

impl std::fmt::Display for FeatureColumn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Column names in model order, derived from [`FeatureColumn::ALL`].
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = {
    let mut names = [""; FEATURE_COUNT];
    let mut i = 0;
    while i < FEATURE_COUNT {
        names[i] = FeatureColumn::ALL[i].name();
        i += 1;
    }
    names
};

/// The six columns standardized by the scaler, in scaler order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumericColumn {
    Age = 0,
    RestingBp = 1,
    Cholesterol = 2,
    FastingBs = 3,
    MaxHr = 4,
    Oldpeak = 5,
}

impl NumericColumn {
    pub const ALL: [NumericColumn; NUMERIC_COUNT] = [
        Self::Age,
        Self::RestingBp,
        Self::Cholesterol,
        Self::FastingBs,
        Self::MaxHr,
        Self::Oldpeak,
    ];

    /// The feature-vector column this numeric column lands in.
    #[must_use]
    pub const fn feature_column(self) -> FeatureColumn {
        match self {
            Self::Age => FeatureColumn::Age,
            Self::RestingBp => FeatureColumn::RestingBp,
            Self::Cholesterol => FeatureColumn::Cholesterol,
            Self::FastingBs => FeatureColumn::FastingBs,
            Self::MaxHr => FeatureColumn::MaxHr,
            Self::Oldpeak => FeatureColumn::Oldpeak,
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        self.feature_column().name()
    }

    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Scaler column names in scaler order.
pub const NUMERIC_NAMES: [&str; NUMERIC_COUNT] = {
    let mut names = [""; NUMERIC_COUNT];
    let mut i = 0;
    while i < NUMERIC_COUNT {
        names[i] = NumericColumn::ALL[i].name();
        i += 1;
    }
    names
};

/// Values for the six scaler columns, indexed by [`NumericColumn`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumericValues([f64; NUMERIC_COUNT]);

impl NumericValues {
    /// Build the values by asking for each column in scaler order.
    pub fn from_fn(mut value_of: impl FnMut(NumericColumn) -> f64) -> Self {
        let mut values = [0.0; NUMERIC_COUNT];
        for column in NumericColumn::ALL {
            values[column.index()] = value_of(column);
        }
        Self(values)
    }

    #[must_use]
    pub fn as_array(&self) -> &[f64; NUMERIC_COUNT] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = (NumericColumn, f64)> + '_ {
        NumericColumn::ALL.iter().map(move |&c| (c, self.0[c.index()]))
    }
}

impl Index<NumericColumn> for NumericValues {
    type Output = f64;

    fn index(&self, column: NumericColumn) -> &f64 {
        &self.0[column.index()]
    }
}

/// Ordered numeric input to the classifier.
///
/// Can only be built through [`FeatureVector::try_assemble`], which visits
/// [`FeatureColumn::ALL`] so every value lands in its declared slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector {
    values: [f64; FEATURE_COUNT],
}

impl FeatureVector {
    /// Assemble a vector by asking for every column in model order.
    ///
    /// # Errors
    /// Propagates the first error returned by `value_of`.
    pub fn try_assemble<E>(
        mut value_of: impl FnMut(FeatureColumn) -> Result<f64, E>,
    ) -> Result<Self, E> {
        let mut values = [0.0; FEATURE_COUNT];
        for column in FeatureColumn::ALL {
            values[column.index()] = value_of(column)?;
        }
        Ok(Self { values })
    }

    #[must_use]
    pub fn get(&self, column: FeatureColumn) -> f64 {
        self.values[column.index()]
    }

    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    /// Column/value pairs in model order.
    pub fn iter(&self) -> impl Iterator<Item = (FeatureColumn, f64)> + '_ {
        FeatureColumn::ALL
            .iter()
            .map(move |&c| (c, self.values[c.index()]))
    }

    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.values.iter().all(|v| v.is_finite())
    }
}

impl Serialize for FeatureVector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(FEATURE_COUNT))?;
        for (column, value) in self.iter() {
            map.serialize_entry(column.name(), &value)?;
        }
        map.end()
    }
}

impl std::fmt::Display for FeatureVector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self
            .iter()
            .map(|(c, v)| format!("{}={v:.6}", c.name()))
            .collect();
        write!(f, "[{}]", parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declared_order_matches_indices() {
        for (i, column) in FeatureColumn::ALL.iter().enumerate() {
            assert_eq!(column.index(), i);
            assert_eq!(FEATURE_NAMES[i], column.name());
        }
        for (i, column) in NumericColumn::ALL.iter().enumerate() {
            assert_eq!(column.index(), i);
        }
    }

    #[test]
    fn test_feature_names_literal_order() {
        assert_eq!(
            FEATURE_NAMES,
            [
                "Age",
                "Sex",
                "ChestPainType",
                "RestingBP",
                "Cholesterol",
                "FastingBS",
                "RestingECG",
                "MaxHR",
                "ExerciseAngina",
                "Oldpeak",
                "ST_Slope",
                "Cholesterol_to_MaxHR",
            ]
        );
        assert_eq!(
            NUMERIC_NAMES,
            ["Age", "RestingBP", "Cholesterol", "FastingBS", "MaxHR", "Oldpeak"]
        );
    }

    #[test]
    fn test_from_name() {
        assert_eq!(FeatureColumn::from_name("ST_Slope"), Some(FeatureColumn::StSlope));
        assert_eq!(FeatureColumn::from_name("st_slope"), None);
    }

    #[test]
    fn test_assemble_places_each_value_in_its_slot() {
        let v = FeatureVector::try_assemble::<()>(|c| Ok(c.index() as f64 * 10.0))
            .expect("assemble");
        assert_eq!(v.as_slice().len(), FEATURE_COUNT);
        assert!((v.get(FeatureColumn::MaxHr) - 70.0).abs() < f64::EPSILON);
        let names: Vec<&str> = v.iter().map(|(c, _)| c.name()).collect();
        assert_eq!(names, FEATURE_NAMES.to_vec());
    }

    #[test]
    fn test_assemble_propagates_error() {
        let result = FeatureVector::try_assemble(|c| {
            if c == FeatureColumn::Oldpeak {
                Err("boom")
            } else {
                Ok(1.0)
            }
        });
        assert_eq!(result, Err("boom"));
    }

    #[test]
    fn test_serialize_keeps_model_order() {
        let v = FeatureVector::try_assemble::<()>(|_| Ok(0.5)).expect("assemble");
        let json = serde_json::to_string(&v).expect("serialize");
        let age = json.find("\"Age\"").expect("age key");
        let ratio = json.find("\"Cholesterol_to_MaxHR\"").expect("ratio key");
        let slope = json.find("\"ST_Slope\"").expect("slope key");
        assert!(age < slope && slope < ratio);
    }

    #[test]
    fn test_numeric_values_index() {
        let n = NumericValues::from_fn(|c| c.index() as f64);
        assert!((n[NumericColumn::MaxHr] - 4.0).abs() < f64::EPSILON);
        assert_eq!(NumericColumn::MaxHr.feature_column(), FeatureColumn::MaxHr);
    }
}
