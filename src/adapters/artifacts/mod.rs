//! Artifact bundle adapter.
//!
//! A bundle is a directory holding the fitted label encoders, the numeric
//! scaler and the trained classifier as JSON, bound together by a signed
//! manifest. Everything is loaded and checked once; the loaded values are
//! read-only afterwards.
//!
//! Trust model:
//! - [`ArtifactTrust::Verified`] requires `manifest.json` and `artifacts.sig`
//!   signed by the configured Ed25519 key, with matching SHA-256 hashes.
//! - [`ArtifactTrust::AllowUnsigned`] skips the signature. It is honored in
//!   debug builds only; release builds refuse it.

pub mod manifest;

use std::fs;
use std::path::{Path, PathBuf};

use base64::Engine;
use ed25519_dalek::VerifyingKey;
use serde::de::DeserializeOwned;

use crate::adapters::model::ModelArtifact;
use crate::config::AppConfig;
use crate::domain::{EncoderSet, NumericScaler, FEATURE_COUNT, FEATURE_NAMES};
use crate::ports::Classifier;

pub use manifest::{sign_bundle, verify_bundle, ArtifactManifest};

pub const CLASSIFIER_FILE: &str = "classifier.json";
pub const SCALER_FILE: &str = "scaler.json";
pub const ENCODERS_FILE: &str = "encoders.json";
pub const MANIFEST_FILE: &str = "manifest.json";
pub const SIGNATURE_FILE: &str = "artifacts.sig";

/// Files a manifest must bind.
pub const BUNDLE_FILES: [&str; 3] = [CLASSIFIER_FILE, SCALER_FILE, ENCODERS_FILE];

/// Artifact loading errors.
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{file} is malformed: {reason}")]
    Malformed { file: String, reason: String },

    #[error("{file} is incompatible with this pipeline: {reason}")]
    Incompatible { file: String, reason: String },

    #[error("signature verification failed: {0}")]
    Signature(String),

    #[error("manifest rejected: {0}")]
    Manifest(String),

    #[error("unsigned artifacts are not accepted in release builds")]
    UnsignedRejected,

    #[error("no artifact verifying key configured (set {0})")]
    NoVerifyingKey(&'static str),
}

/// How much the loader trusts the bundle on disk.
#[derive(Debug, Clone)]
pub enum ArtifactTrust {
    /// Require a valid signature from this key.
    Verified(VerifyingKey),
    /// Skip signature checks (debug builds only).
    AllowUnsigned,
}

impl ArtifactTrust {
    /// Resolve trust from configuration.
    ///
    /// A configured public key always wins over the unsigned switch.
    ///
    /// # Errors
    /// Fails if the key file cannot be read or decoded, or if neither a key
    /// nor the unsigned switch is configured.
    pub fn from_config(config: &AppConfig) -> Result<Self, ArtifactError> {
        if let Some(path) = &config.signing_pubkey_file {
            let b64 = fs::read_to_string(path).map_err(|source| ArtifactError::Read {
                path: path.clone(),
                source,
            })?;
            return Ok(Self::Verified(Self::verifying_key_from_b64(&b64)?));
        }
        if config.allow_unsigned_artifacts {
            return Ok(Self::AllowUnsigned);
        }
        Err(ArtifactError::NoVerifyingKey(crate::config::PUBKEY_FILE_ENV))
    }

    /// Decode a base64 Ed25519 public key.
    ///
    /// # Errors
    /// Fails on invalid base64, a wrong length, or an invalid curve point.
    pub fn verifying_key_from_b64(b64: &str) -> Result<VerifyingKey, ArtifactError> {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(b64.trim())
            .map_err(|_| ArtifactError::Signature("invalid public key base64".into()))?;
        let pubkey: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
            ArtifactError::Signature("invalid public key length (expected 32 bytes)".into())
        })?;
        VerifyingKey::from_bytes(&pubkey)
            .map_err(|_| ArtifactError::Signature("invalid verifying key".into()))
    }
}

/// The three fitted artifacts, parsed and checked.
#[derive(Debug, Clone)]
pub struct ArtifactBundle {
    pub encoders: EncoderSet,
    pub scaler: NumericScaler,
    pub classifier: ModelArtifact,
    /// Present when the bundle was verified or carried a manifest.
    pub manifest: Option<ArtifactManifest>,
}

impl ArtifactBundle {
    /// Check the classifier against the feature layout and its own structure.
    ///
    /// # Errors
    /// Returns `Incompatible` for a column mismatch and `Malformed` for a
    /// structurally invalid model.
    pub fn check(&self) -> Result<(), ArtifactError> {
        check_feature_contract(self.classifier.feature_names())?;
        self.classifier
            .validate()
            .map_err(|reason| ArtifactError::Malformed {
                file: CLASSIFIER_FILE.into(),
                reason,
            })
    }
}

/// Loads artifact bundles under a fixed trust policy.
#[derive(Debug, Clone)]
pub struct ArtifactLoader {
    trust: ArtifactTrust,
    max_age_secs: Option<i64>,
}

impl ArtifactLoader {
    #[must_use]
    pub fn new(trust: ArtifactTrust) -> Self {
        Self {
            trust,
            max_age_secs: None,
        }
    }

    /// # Errors
    /// See [`ArtifactTrust::from_config`].
    pub fn from_config(config: &AppConfig) -> Result<Self, ArtifactError> {
        let trust = ArtifactTrust::from_config(config)?;
        Ok(Self::new(trust).with_max_age(config.artifact_max_age_secs))
    }

    /// Reject manifests older than `max_age_secs`.
    #[must_use]
    pub fn with_max_age(mut self, max_age_secs: Option<i64>) -> Self {
        self.max_age_secs = max_age_secs;
        self
    }

    /// Verify and parse the bundle in `dir`.
    ///
    /// # Errors
    /// Fails if trust checks fail, a file is missing or malformed, or the
    /// classifier does not match the 12-column feature layout.
    pub fn load(&self, dir: &Path) -> Result<ArtifactBundle, ArtifactError> {
        let manifest = match &self.trust {
            ArtifactTrust::Verified(key) => Some(verify_bundle(dir, key, self.max_age_secs)?),
            ArtifactTrust::AllowUnsigned => {
                if !cfg!(debug_assertions) {
                    return Err(ArtifactError::UnsignedRejected);
                }
                tracing::warn!("Loading artifacts from {:?} without signature verification", dir);
                unsigned_manifest(dir)?
            }
        };

        let encoders: EncoderSet = read_json(dir, ENCODERS_FILE)?;
        let scaler: NumericScaler = read_json(dir, SCALER_FILE)?;
        let classifier: ModelArtifact = read_json(dir, CLASSIFIER_FILE)?;
        let bundle = ArtifactBundle {
            encoders,
            scaler,
            classifier,
            manifest,
        };
        bundle.check()?;

        for (column, label) in bundle.encoders.vocabulary_gaps() {
            tracing::warn!(
                "Encoder for {} has no class for form label {:?}; requests using it will fail",
                column,
                label
            );
        }

        tracing::info!(
            "Loaded {} classifier with {} features from {:?}",
            bundle.classifier.name(),
            bundle.classifier.n_features(),
            dir
        );

        Ok(bundle)
    }
}

// Without a key, a manifest that happens to be present is still checked for
// integrity, though not authenticity.
fn unsigned_manifest(dir: &Path) -> Result<Option<ArtifactManifest>, ArtifactError> {
    let path = dir.join(MANIFEST_FILE);
    if !path.exists() {
        return Ok(None);
    }
    let manifest: ArtifactManifest = read_json(dir, MANIFEST_FILE)?;
    manifest.check_hashes(dir)?;
    Ok(Some(manifest))
}

fn read_json<T: DeserializeOwned>(dir: &Path, file: &str) -> Result<T, ArtifactError> {
    let path = dir.join(file);
    let bytes = fs::read(&path).map_err(|source| ArtifactError::Read { path, source })?;
    serde_json::from_slice(&bytes).map_err(|e| ArtifactError::Malformed {
        file: file.to_string(),
        reason: e.to_string(),
    })
}

/// Check that a classifier was fit on exactly [`FEATURE_NAMES`], in order.
///
/// # Errors
/// Returns `Incompatible` describing the first difference.
pub fn check_feature_contract(names: &[String]) -> Result<(), ArtifactError> {
    if names.len() != FEATURE_COUNT {
        let mut reason = format!(
            "classifier expects {} features, pipeline produces {FEATURE_COUNT}",
            names.len()
        );
        if names.len() == FEATURE_COUNT - 1 {
            reason.push_str(&format!(
                " (the classifier was fit without {})",
                FEATURE_NAMES[FEATURE_COUNT - 1]
            ));
        }
        return Err(ArtifactError::Incompatible {
            file: CLASSIFIER_FILE.into(),
            reason,
        });
    }
    if let Some((i, (got, want))) = names
        .iter()
        .zip(FEATURE_NAMES.iter())
        .enumerate()
        .find(|(_, (got, want))| got.as_str() != **want)
    {
        return Err(ArtifactError::Incompatible {
            file: CLASSIFIER_FILE.into(),
            reason: format!("feature {i} is {got:?}, expected {want:?}"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::SigningKey;
    use rand::RngCore;

    fn demo_dir() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("artifacts/demo")
    }

    fn copy_demo(dst: &Path) {
        for file in BUNDLE_FILES {
            fs::copy(demo_dir().join(file), dst.join(file)).expect("copy artifact");
        }
    }

    fn signing_key() -> SigningKey {
        let mut seed = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut seed);
        SigningKey::from_bytes(&seed)
    }

    fn signed_bundle() -> (tempfile::TempDir, SigningKey) {
        let dir = tempfile::tempdir().expect("tempdir");
        copy_demo(dir.path());
        let key = signing_key();
        sign_bundle(dir.path(), &key, Some(1), None).expect("sign");
        (dir, key)
    }

    #[test]
    fn test_verified_load_roundtrip() {
        let (dir, key) = signed_bundle();
        let loader = ArtifactLoader::new(ArtifactTrust::Verified(key.verifying_key()));
        let bundle = loader.load(dir.path()).expect("load");
        assert_eq!(bundle.classifier.n_features(), FEATURE_COUNT);
        assert_eq!(bundle.manifest.map(|m| m.serial), Some(1));
    }

    #[test]
    fn test_tampered_file_rejected() {
        let (dir, key) = signed_bundle();
        let scaler_path = dir.path().join(SCALER_FILE);
        let mut text = fs::read_to_string(&scaler_path).expect("read");
        text.push('\n');
        fs::write(&scaler_path, text).expect("write");

        let loader = ArtifactLoader::new(ArtifactTrust::Verified(key.verifying_key()));
        let err = loader.load(dir.path()).unwrap_err();
        assert!(matches!(err, ArtifactError::Manifest(ref m) if m.contains(SCALER_FILE)));
    }

    #[test]
    fn test_wrong_key_rejected() {
        let (dir, _key) = signed_bundle();
        let other = signing_key();
        let loader = ArtifactLoader::new(ArtifactTrust::Verified(other.verifying_key()));
        assert!(matches!(
            loader.load(dir.path()),
            Err(ArtifactError::Signature(_))
        ));
    }

    #[test]
    fn test_missing_signature_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        copy_demo(dir.path());
        let loader = ArtifactLoader::new(ArtifactTrust::Verified(signing_key().verifying_key()));
        assert!(matches!(
            loader.load(dir.path()),
            Err(ArtifactError::Signature(_))
        ));
    }

    #[cfg(debug_assertions)]
    #[test]
    fn test_unsigned_allowed_in_debug() {
        let dir = tempfile::tempdir().expect("tempdir");
        copy_demo(dir.path());
        let bundle = ArtifactLoader::new(ArtifactTrust::AllowUnsigned)
            .load(dir.path())
            .expect("load");
        assert!(bundle.manifest.is_none());
    }

    #[cfg(not(debug_assertions))]
    #[test]
    fn test_unsigned_refused_in_release() {
        let dir = tempfile::tempdir().expect("tempdir");
        copy_demo(dir.path());
        assert!(matches!(
            ArtifactLoader::new(ArtifactTrust::AllowUnsigned).load(dir.path()),
            Err(ArtifactError::UnsignedRejected)
        ));
    }

    #[test]
    fn test_eleven_column_classifier_is_incompatible() {
        let names: Vec<String> = FEATURE_NAMES[..FEATURE_COUNT - 1]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let err = check_feature_contract(&names).unwrap_err();
        assert!(err.to_string().contains("Cholesterol_to_MaxHR"));
    }

    #[test]
    fn test_reordered_columns_are_incompatible() {
        let mut names: Vec<String> = FEATURE_NAMES.iter().map(|s| s.to_string()).collect();
        names.swap(0, 1);
        let err = check_feature_contract(&names).unwrap_err();
        assert!(err.to_string().contains("feature 0"));

        let names: Vec<String> = FEATURE_NAMES.iter().map(|s| s.to_string()).collect();
        assert!(check_feature_contract(&names).is_ok());
    }

    #[test]
    fn test_hand_built_bundle_is_checked() {
        let (dir, key) = signed_bundle();
        let loader = ArtifactLoader::new(ArtifactTrust::Verified(key.verifying_key()));
        let mut bundle = loader.load(dir.path()).expect("load");
        assert!(bundle.check().is_ok());

        if let ModelArtifact::RandomForest(forest) = &mut bundle.classifier {
            forest.feature_names.reverse();
        }
        assert!(matches!(
            bundle.check(),
            Err(ArtifactError::Incompatible { .. })
        ));
    }

    #[test]
    fn test_malformed_scaler_reported_by_file() {
        let (dir, key) = signed_bundle();
        fs::write(dir.path().join(SCALER_FILE), b"{\"mean\": []}").expect("write");
        sign_bundle(dir.path(), &key, Some(2), None).expect("re-sign");

        let loader = ArtifactLoader::new(ArtifactTrust::Verified(key.verifying_key()));
        let err = loader.load(dir.path()).unwrap_err();
        assert!(matches!(err, ArtifactError::Malformed { ref file, .. } if file == SCALER_FILE));
    }

    #[test]
    fn test_verifying_key_from_b64() {
        let key = signing_key().verifying_key();
        let b64 = base64::engine::general_purpose::STANDARD.encode(key.to_bytes());
        let decoded = ArtifactTrust::verifying_key_from_b64(&format!("{b64}\n")).expect("decode");
        assert_eq!(decoded, key);
        assert!(ArtifactTrust::verifying_key_from_b64("AAAA").is_err());
    }

    #[test]
    fn test_trust_from_config() {
        let key = signing_key().verifying_key();
        let dir = tempfile::tempdir().expect("tempdir");
        let key_file = dir.path().join("pub.b64");
        fs::write(
            &key_file,
            base64::engine::general_purpose::STANDARD.encode(key.to_bytes()),
        )
        .expect("write");

        let cfg = AppConfig {
            signing_pubkey_file: Some(key_file),
            allow_unsigned_artifacts: true,
            ..AppConfig::default()
        };
        assert!(matches!(
            ArtifactTrust::from_config(&cfg),
            Ok(ArtifactTrust::Verified(k)) if k == key
        ));

        assert!(matches!(
            ArtifactTrust::from_config(&AppConfig::default()),
            Err(ArtifactError::NoVerifyingKey(_))
        ));
    }
}
