//! Prediction result types.
//!
//! Represents the classifier output and its interpretation as a risk band.

use serde::{Deserialize, Serialize};

/// Fixed note shown alongside every prediction.
pub const DISCLAIMER: &str = "This is a statistical aid based on a Random Forest model trained \
with SMOTE class-imbalance correction and GridSearchCV hyperparameter search. It is not a \
substitute for professional medical judgment; consult a qualified clinician for medical advice.";

/// Upper bound (exclusive, percent) of the low-risk band.
pub const LOW_RISK_BELOW_PERCENT: f64 = 30.0;

/// Upper bound (inclusive, percent) of the moderate-risk band.
pub const MODERATE_RISK_UP_TO_PERCENT: f64 = 50.0;

/// Risk band derived from the probability of heart disease.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskBand {
    /// Below 30%
    Low,
    /// 30% to 50%, both inclusive
    Moderate,
    /// Above 50%
    High,
}

impl RiskBand {
    /// Band for a disease probability expressed as a percentage.
    ///
    /// `< 30` is Low, `30..=50` is Moderate, anything else is High.
    #[must_use]
    pub fn from_percentage(percent: f64) -> Self {
        if percent < LOW_RISK_BELOW_PERCENT {
            Self::Low
        } else if percent <= MODERATE_RISK_UP_TO_PERCENT {
            Self::Moderate
        } else {
            Self::High
        }
    }

    /// Band for a disease probability expressed as a fraction.
    #[must_use]
    pub fn from_probability(probability: f64) -> Self {
        Self::from_percentage(probability * 100.0)
    }

    /// Message shown to the clinician.
    #[must_use]
    pub fn message(&self) -> &'static str {
        match self {
            Self::Low => "The patient is predicted to NOT have heart disease.",
            Self::Moderate => "The patient has a moderate risk of heart disease.",
            Self::High => "The patient is predicted to be at risk of heart disease.",
        }
    }

    /// Display color (RGB).
    #[must_use]
    pub fn color(&self) -> (u8, u8, u8) {
        match self {
            Self::Low => (16, 185, 129),      // Emerald (#10B981)
            Self::Moderate => (251, 191, 36), // Amber (#FBBF24)
            Self::High => (244, 63, 94),      // Rose (#F43F5E)
        }
    }
}

impl std::fmt::Display for RiskBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "LOW"),
            Self::Moderate => write!(f, "MODERATE"),
            Self::High => write!(f, "HIGH"),
        }
    }
}

/// Raw class probabilities returned by a classifier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassProbabilities {
    /// Probability of class 0 (no heart disease)
    pub no_disease: f64,
    /// Probability of class 1 (heart disease)
    pub disease: f64,
}

impl ClassProbabilities {
    /// Maximum allowed deviation of the two probabilities' sum from 1.
    pub const SUM_TOLERANCE: f64 = 1e-6;

    /// Check that both values are finite, within `[0, 1]` and sum to 1.
    ///
    /// # Errors
    /// Returns a description of the first violated condition.
    pub fn check(&self) -> Result<(), String> {
        for (name, p) in [("no_disease", self.no_disease), ("disease", self.disease)] {
            if !p.is_finite() || !(0.0..=1.0).contains(&p) {
                return Err(format!("probability {name}={p} outside [0, 1]"));
            }
        }
        let sum = self.no_disease + self.disease;
        if (sum - 1.0).abs() > Self::SUM_TOLERANCE {
            return Err(format!("class probabilities sum to {sum}, expected 1"));
        }
        Ok(())
    }
}

/// Interpreted prediction handed to the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Probability of no heart disease (0.0 to 1.0)
    pub probability_no_disease: f64,

    /// Probability of heart disease (0.0 to 1.0)
    pub probability_disease: f64,

    /// Band derived from `probability_disease`
    pub risk_band: RiskBand,
}

impl PredictionResult {
    /// Interpret class probabilities.
    #[must_use]
    pub fn from_probabilities(probabilities: ClassProbabilities) -> Self {
        Self {
            probability_no_disease: probabilities.no_disease,
            probability_disease: probabilities.disease,
            risk_band: RiskBand::from_percentage(probabilities.disease * 100.0),
        }
    }

    #[must_use]
    pub fn percent_no_disease(&self) -> f64 {
        self.probability_no_disease * 100.0
    }

    #[must_use]
    pub fn percent_disease(&self) -> f64 {
        self.probability_disease * 100.0
    }

    /// Both probabilities as percentages with two decimals.
    #[must_use]
    pub fn summary_lines(&self) -> [String; 2] {
        [
            format!(
                "Probability of no heart disease: {:.2}%",
                self.percent_no_disease()
            ),
            format!("Probability of heart disease: {:.2}%", self.percent_disease()),
        ]
    }
}

/// A prediction stamped with an identifier and creation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assessment {
    /// Unique identifier
    pub id: String,

    /// Caller-supplied patient reference, if any
    pub patient_id: Option<String>,

    pub result: PredictionResult,

    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Assessment {
    #[must_use]
    pub fn new(result: PredictionResult) -> Self {
        Self {
            id: uuid_v4(),
            patient_id: None,
            result,
            created_at: chrono::Utc::now(),
        }
    }

    #[must_use]
    pub fn with_patient(result: PredictionResult, patient_id: impl Into<String>) -> Self {
        Self {
            patient_id: Some(patient_id.into()),
            ..Self::new(result)
        }
    }
}

/// Random UUID v4 from a ChaCha20 CSPRNG seeded with OS entropy.
fn uuid_v4() -> String {
    use rand::Rng;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    let mut rng = ChaCha20Rng::from_entropy();
    let mut bytes: [u8; 16] = rng.gen();
    bytes[6] = (bytes[6] & 0x0f) | 0x40;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;

    let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
    format!(
        "{}-{}-{}-{}-{}",
        &hex[0..8],
        &hex[8..12],
        &hex[12..16],
        &hex[16..20],
        &hex[20..32]
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_band_boundaries() {
        assert_eq!(RiskBand::from_percentage(0.0), RiskBand::Low);
        assert_eq!(RiskBand::from_percentage(29.999), RiskBand::Low);
        assert_eq!(RiskBand::from_percentage(30.0), RiskBand::Moderate);
        assert_eq!(RiskBand::from_percentage(50.0), RiskBand::Moderate);
        assert_eq!(RiskBand::from_percentage(50.0001), RiskBand::High);
        assert_eq!(RiskBand::from_percentage(100.0), RiskBand::High);
    }

    #[test]
    fn test_band_from_probability() {
        assert_eq!(RiskBand::from_probability(0.1), RiskBand::Low);
        assert_eq!(RiskBand::from_probability(0.5), RiskBand::Moderate);
        assert_eq!(RiskBand::from_probability(0.9), RiskBand::High);
    }

    proptest! {
        #[test]
        fn prop_band_partitions_percent_range(p in 0.0f64..=100.0) {
            let band = RiskBand::from_percentage(p);
            let expected = if p < 30.0 {
                RiskBand::Low
            } else if p <= 50.0 {
                RiskBand::Moderate
            } else {
                RiskBand::High
            };
            prop_assert_eq!(band, expected);
        }
    }

    #[test]
    fn test_probability_check() {
        let ok = ClassProbabilities { no_disease: 0.7, disease: 0.3 };
        assert!(ok.check().is_ok());

        let off = ClassProbabilities { no_disease: 0.7, disease: 0.4 };
        assert!(off.check().unwrap_err().contains("sum"));

        let nan = ClassProbabilities { no_disease: f64::NAN, disease: 0.4 };
        assert!(nan.check().is_err());

        let negative = ClassProbabilities { no_disease: 1.1, disease: -0.1 };
        assert!(negative.check().is_err());
    }

    #[test]
    fn test_result_formatting() {
        let result = PredictionResult::from_probabilities(ClassProbabilities {
            no_disease: 0.625,
            disease: 0.375,
        });
        assert_eq!(result.risk_band, RiskBand::Moderate);
        let [no, yes] = result.summary_lines();
        assert_eq!(no, "Probability of no heart disease: 62.50%");
        assert_eq!(yes, "Probability of heart disease: 37.50%");
    }

    #[test]
    fn test_assessment_creation() {
        let result = PredictionResult::from_probabilities(ClassProbabilities {
            no_disease: 0.25,
            disease: 0.75,
        });
        let assessment = Assessment::with_patient(result, "bed-12");
        assert_eq!(assessment.result.risk_band, RiskBand::High);
        assert_eq!(assessment.patient_id.as_deref(), Some("bed-12"));
        assert!(Assessment::new(result).patient_id.is_none());
    }

    #[test]
    fn test_uuid_generation() {
        let id1 = uuid_v4();
        let id2 = uuid_v4();
        assert_ne!(id1, id2);
        assert_eq!(id1.len(), 36);
        assert_eq!(&id1[14..15], "4");
    }
}
