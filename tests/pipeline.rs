//! End-to-end tests over the demo artifact bundle, signed at test time.

use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use ed25519_dalek::SigningKey;
use proptest::prelude::*;
use rand::RngCore;

use cardiorisk::adapters::artifacts::{
    sign_bundle, ArtifactLoader, ArtifactTrust, BUNDLE_FILES, CLASSIFIER_FILE,
};
use cardiorisk::domain::{FeatureColumn, PatientInput, PatientRecord, RiskBand, FEATURE_NAMES};
use cardiorisk::{CardioRiskError, ModelArtifacts, PredictionService};

fn demo_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("artifacts/demo")
}

fn signed_copy() -> (tempfile::TempDir, SigningKey) {
    let dir = tempfile::tempdir().expect("tempdir");
    for file in BUNDLE_FILES {
        std::fs::copy(demo_dir().join(file), dir.path().join(file)).expect("copy");
    }
    let mut seed = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut seed);
    let key = SigningKey::from_bytes(&seed);
    sign_bundle(dir.path(), &key, Some(1), None).expect("sign");
    (dir, key)
}

fn service() -> PredictionService {
    static SERVICE: OnceLock<PredictionService> = OnceLock::new();
    SERVICE
        .get_or_init(|| {
            let (dir, key) = signed_copy();
            let loader = ArtifactLoader::new(ArtifactTrust::Verified(key.verifying_key()));
            let artifacts = ModelArtifacts::load(dir.path(), &loader).expect("load");
            PredictionService::new(Arc::new(artifacts))
        })
        .clone()
}

fn record(input: PatientInput) -> PatientRecord {
    PatientRecord::from_input(&input).expect("valid record")
}

#[test]
fn form_defaults_are_low_risk() {
    let result = service().predict(&PatientRecord::example()).expect("predict");

    let expected = (0.15 + 0.1 + 0.3) / 3.0;
    assert!((result.probability_disease - expected).abs() < 1e-12);
    assert!((result.probability_no_disease + result.probability_disease - 1.0).abs() < 1e-6);
    assert_eq!(result.risk_band, RiskBand::Low);
    assert_eq!(
        result.summary_lines()[1],
        "Probability of heart disease: 18.33%"
    );
}

#[test]
fn flat_slope_is_moderate_risk() {
    let result = service()
        .predict(&record(PatientInput {
            st_slope: "Flat".into(),
            ..PatientInput::default()
        }))
        .expect("predict");
    assert!((result.probability_disease - 0.35).abs() < 1e-9);
    assert_eq!(result.risk_band, RiskBand::Moderate);
}

#[test]
fn symptomatic_patient_is_high_risk() {
    let result = service()
        .predict(&record(PatientInput {
            age: 65,
            chest_pain_type: "ASY".into(),
            max_hr: 110,
            exercise_angina: "Y".into(),
            oldpeak: 2.0,
            st_slope: "Flat".into(),
            ..PatientInput::default()
        }))
        .expect("predict");
    assert!((result.probability_disease - 0.75).abs() < 1e-9);
    assert_eq!(result.risk_band, RiskBand::High);
}

#[test]
fn feature_vector_follows_declared_order() {
    let vector = service()
        .build_features(&PatientRecord::example())
        .expect("features");
    assert_eq!(vector.as_slice().len(), FEATURE_NAMES.len());
    for (i, (column, _)) in vector.iter().enumerate() {
        assert_eq!(column.name(), FEATURE_NAMES[i]);
    }
    assert_eq!(vector.get(FeatureColumn::StSlope), 2.0);
}

#[test]
fn unknown_label_fails_before_prediction() {
    let raw = r#"{"Age": 50, "Sex": "M", "ChestPainType": "XYZ", "RestingBP": 130,
        "Cholesterol": 220, "FastingBS": 0, "RestingECG": "Normal", "MaxHR": 140,
        "ExerciseAngina": "N", "Oldpeak": 1.0, "ST_Slope": "Up"}"#;
    let input: PatientInput = serde_json::from_str(raw).expect("parse");
    let err = PatientRecord::from_input(&input).unwrap_err();
    assert!(matches!(
        err,
        CardioRiskError::UnknownCategory { column: "ChestPainType", .. }
    ));
}

#[test]
fn eleven_column_classifier_fails_to_load() {
    let (dir, key) = signed_copy();
    let path = dir.path().join(CLASSIFIER_FILE);
    let mut model: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).expect("read")).expect("json");
    model["feature_names"]
        .as_array_mut()
        .expect("names")
        .pop();
    std::fs::write(&path, serde_json::to_vec(&model).expect("json")).expect("write");
    sign_bundle(dir.path(), &key, Some(2), None).expect("re-sign");

    let loader = ArtifactLoader::new(ArtifactTrust::Verified(key.verifying_key()));
    let err = ModelArtifacts::load(dir.path(), &loader).unwrap_err();
    assert!(matches!(err, CardioRiskError::ArtifactLoadFailure(_)));
    assert!(err.to_string().contains("Cholesterol_to_MaxHR"));
}

#[test]
fn missing_artifact_fails_to_load() {
    let (dir, key) = signed_copy();
    std::fs::remove_file(dir.path().join(BUNDLE_FILES[2])).expect("remove");
    let loader = ArtifactLoader::new(ArtifactTrust::Verified(key.verifying_key()));
    assert!(ModelArtifacts::load(dir.path(), &loader).is_err());
}

fn arb_input() -> impl Strategy<Value = PatientInput> {
    (
        (0i64..=120, prop::sample::select(vec!["M", "F"])),
        prop::sample::select(vec!["ATA", "NAP", "ASY", "TA"]),
        (0i64..=300, 0i64..=1000, 0i64..=1),
        prop::sample::select(vec!["Normal", "ST", "LVH"]),
        0i64..=300,
        prop::sample::select(vec!["N", "Y"]),
        -2.6f64..=6.2,
        prop::sample::select(vec!["Up", "Flat", "Down"]),
    )
        .prop_map(
            |((age, sex), cp, (bp, chol, fbs), ecg, max_hr, angina, oldpeak, slope)| PatientInput {
                age,
                sex: sex.into(),
                chest_pain_type: cp.into(),
                resting_bp: bp,
                cholesterol: chol,
                fasting_bs: fbs,
                resting_ecg: ecg.into(),
                max_hr,
                exercise_angina: angina.into(),
                oldpeak,
                st_slope: slope.into(),
            },
        )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn predictions_are_deterministic_and_conserve_probability(input in arb_input()) {
        let svc = service();
        let record = PatientRecord::from_input(&input).expect("valid record");
        match (svc.predict(&record), svc.predict(&record)) {
            (Ok(a), Ok(b)) => {
                prop_assert_eq!(a.probability_disease.to_bits(), b.probability_disease.to_bits());
                prop_assert_eq!(a.risk_band, b.risk_band);
                prop_assert!((a.probability_no_disease + a.probability_disease - 1.0).abs() < 1e-6);
                prop_assert_eq!(a.risk_band, RiskBand::from_probability(a.probability_disease));
            }
            (
                Err(CardioRiskError::DegenerateInput(_)),
                Err(CardioRiskError::DegenerateInput(_)),
            ) => {}
            (a, b) => prop_assert!(false, "inconsistent outcomes: {:?} / {:?}", a, b),
        }
    }
}
