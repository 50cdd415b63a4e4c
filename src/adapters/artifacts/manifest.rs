//! Signed manifest binding an artifact bundle.
//!
//! `manifest.json` records the SHA-256 of every bundle file together with a
//! serial, a creation timestamp and a random nonce. `artifacts.sig` holds the
//! Ed25519 signature over the exact manifest bytes.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use base64::Engine;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::{ArtifactError, BUNDLE_FILES, MANIFEST_FILE, SIGNATURE_FILE};

/// The only manifest layout understood by this loader.
pub const MANIFEST_VERSION: u32 = 1;

/// Decoded nonce length in bytes.
pub const NONCE_LEN: usize = 16;

/// Clock skew tolerated for `created_at` in the future.
const FUTURE_SKEW_SECS: i64 = 300;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArtifactManifest {
    pub version: u32,
    /// Monotonic build number of the bundle.
    pub serial: u64,
    /// Unix timestamp (seconds) when the manifest was created.
    pub created_at: i64,
    /// Random nonce, base64 of 16 bytes.
    pub nonce_b64: String,
    /// Relative file name to lowercase hex SHA-256.
    pub files: BTreeMap<String, String>,
}

pub(crate) fn unix_now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

pub(crate) fn sha256_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

// Constant-time compare for ASCII hex digests.
fn constant_time_eq_str(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff: u8 = 0;
    for (x, y) in a.as_bytes().iter().zip(b.as_bytes()) {
        diff |= x ^ y;
    }
    diff == 0
}

fn read_file(path: &Path) -> Result<Vec<u8>, ArtifactError> {
    fs::read(path).map_err(|source| ArtifactError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<(), ArtifactError> {
    fs::write(path, bytes).map_err(|source| ArtifactError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Fresh random nonce, base64 encoded.
#[must_use]
pub fn make_nonce_b64() -> String {
    let mut nonce = [0u8; NONCE_LEN];
    rand::rngs::OsRng.fill_bytes(&mut nonce);
    base64::engine::general_purpose::STANDARD.encode(nonce)
}

/// # Errors
/// Fails unless `nonce_b64` decodes to exactly [`NONCE_LEN`] bytes.
pub fn validate_nonce_b64(nonce_b64: &str) -> Result<(), ArtifactError> {
    let raw = base64::engine::general_purpose::STANDARD
        .decode(nonce_b64.trim())
        .map_err(|e| ArtifactError::Manifest(format!("invalid nonce base64: {e}")))?;
    if raw.len() != NONCE_LEN {
        return Err(ArtifactError::Manifest(format!(
            "nonce must decode to exactly {NONCE_LEN} bytes"
        )));
    }
    Ok(())
}

impl ArtifactManifest {
    /// Hash the bundle files in `dir` into a new manifest.
    ///
    /// `serial` defaults to the creation timestamp; `nonce_b64` defaults to
    /// a fresh random nonce.
    ///
    /// # Errors
    /// Fails if a bundle file is unreadable or the nonce is invalid.
    pub fn for_bundle(
        dir: &Path,
        serial: Option<u64>,
        nonce_b64: Option<String>,
    ) -> Result<Self, ArtifactError> {
        let mut files = BTreeMap::new();
        for rel in BUNDLE_FILES {
            let bytes = read_file(&dir.join(rel))?;
            files.insert(rel.to_string(), sha256_hex(&bytes));
        }

        let created_at = unix_now();
        let nonce_b64 = match nonce_b64 {
            Some(n) => {
                validate_nonce_b64(&n)?;
                n
            }
            None => make_nonce_b64(),
        };

        Ok(Self {
            version: MANIFEST_VERSION,
            serial: serial.unwrap_or_else(|| created_at.max(1) as u64),
            created_at,
            nonce_b64,
            files,
        })
    }

    /// Serialized form that gets signed and written.
    ///
    /// # Errors
    /// Fails only if serialization fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ArtifactError> {
        serde_json::to_vec_pretty(self).map_err(|e| ArtifactError::Malformed {
            file: MANIFEST_FILE.into(),
            reason: e.to_string(),
        })
    }

    /// Field checks: version, nonce, timestamps and required files.
    ///
    /// # Errors
    /// Returns `ArtifactError::Manifest` naming the violated rule.
    pub fn check_fields(&self, now: i64, max_age_secs: Option<i64>) -> Result<(), ArtifactError> {
        if self.version != MANIFEST_VERSION {
            return Err(ArtifactError::Manifest(format!(
                "unsupported manifest version {}",
                self.version
            )));
        }
        validate_nonce_b64(&self.nonce_b64)?;

        if self.created_at > now + FUTURE_SKEW_SECS {
            return Err(ArtifactError::Manifest(
                "manifest created_at is in the future".into(),
            ));
        }
        if let Some(max_age) = max_age_secs {
            if now.saturating_sub(self.created_at) > max_age {
                return Err(ArtifactError::Manifest(format!(
                    "manifest is older than the allowed {max_age}s"
                )));
            }
        }

        for rel in BUNDLE_FILES {
            if !self.files.contains_key(rel) {
                return Err(ArtifactError::Manifest(format!(
                    "manifest does not bind {rel}"
                )));
            }
        }
        Ok(())
    }

    /// Compare every bound file against its recorded digest.
    ///
    /// # Errors
    /// Fails on an unreadable file or a digest mismatch.
    pub fn check_hashes(&self, dir: &Path) -> Result<(), ArtifactError> {
        for (rel, expected_hex) in &self.files {
            if rel.contains("..") || Path::new(rel).is_absolute() {
                return Err(ArtifactError::Manifest(format!(
                    "manifest path {rel:?} escapes the bundle directory"
                )));
            }
            let bytes = read_file(&dir.join(rel))?;
            if !constant_time_eq_str(&sha256_hex(&bytes), expected_hex) {
                return Err(ArtifactError::Manifest(format!("hash mismatch for {rel}")));
            }
        }
        Ok(())
    }
}

/// Write `manifest.json` and `artifacts.sig` for the bundle in `dir`.
///
/// # Errors
/// Fails if a bundle file cannot be read or an output cannot be written.
pub fn sign_bundle(
    dir: &Path,
    signing_key: &SigningKey,
    serial: Option<u64>,
    nonce_b64: Option<String>,
) -> Result<ArtifactManifest, ArtifactError> {
    let manifest = ArtifactManifest::for_bundle(dir, serial, nonce_b64)?;
    let bytes = manifest.to_bytes()?;
    write_file(&dir.join(MANIFEST_FILE), &bytes)?;

    let signature: Signature = signing_key.sign(&bytes);
    write_file(&dir.join(SIGNATURE_FILE), &signature.to_bytes())?;

    tracing::info!(
        "Signed artifact bundle in {:?} (serial={}, files={})",
        dir,
        manifest.serial,
        manifest.files.len()
    );
    Ok(manifest)
}

/// Verify signature, fields and hashes of the bundle in `dir`.
///
/// # Errors
/// Fails on a missing or invalid signature, a rejected manifest field, or a
/// digest mismatch.
pub fn verify_bundle(
    dir: &Path,
    key: &VerifyingKey,
    max_age_secs: Option<i64>,
) -> Result<ArtifactManifest, ArtifactError> {
    let sig_path = dir.join(SIGNATURE_FILE);
    let manifest_path = dir.join(MANIFEST_FILE);
    if !sig_path.exists() || !manifest_path.exists() {
        return Err(ArtifactError::Signature(format!(
            "{MANIFEST_FILE} and {SIGNATURE_FILE} are required in {dir:?}"
        )));
    }

    let sig_bytes = read_file(&sig_path)?;
    let sig_array: [u8; 64] = sig_bytes
        .as_slice()
        .try_into()
        .map_err(|_| {
            ArtifactError::Signature("invalid signature length (expected 64 bytes)".into())
        })?;
    let signature = Signature::from_bytes(&sig_array);

    let manifest_bytes = read_file(&manifest_path)?;
    key.verify(&manifest_bytes, &signature)
        .map_err(|_| ArtifactError::Signature("invalid artifact signature".into()))?;

    let manifest: ArtifactManifest =
        serde_json::from_slice(&manifest_bytes).map_err(|e| ArtifactError::Malformed {
            file: MANIFEST_FILE.into(),
            reason: e.to_string(),
        })?;
    manifest.check_fields(unix_now(), max_age_secs)?;
    manifest.check_hashes(dir)?;

    tracing::info!(
        "Artifact signature and hashes verified (serial={})",
        manifest.serial
    );
    Ok(manifest)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest(created_at: i64) -> ArtifactManifest {
        let files = BUNDLE_FILES
            .iter()
            .map(|f| (f.to_string(), "00".repeat(32)))
            .collect();
        ArtifactManifest {
            version: MANIFEST_VERSION,
            serial: 7,
            created_at,
            nonce_b64: base64::engine::general_purpose::STANDARD.encode([0u8; NONCE_LEN]),
            files,
        }
    }

    #[test]
    fn test_check_fields_accepts_fresh_manifest() {
        let now = 1_700_000_000;
        assert!(manifest(now).check_fields(now, None).is_ok());
        assert!(manifest(now + 299).check_fields(now, None).is_ok());
    }

    #[test]
    fn test_check_fields_rejects_future_and_stale() {
        let now = 1_700_000_000;
        assert!(manifest(now + 301).check_fields(now, None).is_err());
        assert!(manifest(now - 100).check_fields(now, Some(50)).is_err());
        assert!(manifest(now - 100).check_fields(now, Some(500)).is_ok());
    }

    #[test]
    fn test_check_fields_requires_every_bundle_file() {
        let now = 1_700_000_000;
        let mut m = manifest(now);
        m.files.remove(BUNDLE_FILES[1]);
        let err = m.check_fields(now, None).unwrap_err();
        assert!(err.to_string().contains(BUNDLE_FILES[1]));
    }

    #[test]
    fn test_check_fields_rejects_bad_version_and_nonce() {
        let now = 1_700_000_000;
        let mut m = manifest(now);
        m.version = 2;
        assert!(m.check_fields(now, None).is_err());

        let mut m = manifest(now);
        m.nonce_b64 = base64::engine::general_purpose::STANDARD.encode([0u8; 8]);
        assert!(m.check_fields(now, None).is_err());
    }

    #[test]
    fn test_sha256_hex_known_vector() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_constant_time_eq_str() {
        assert!(constant_time_eq_str("abcd", "abcd"));
        assert!(!constant_time_eq_str("abcd", "abce"));
        assert!(!constant_time_eq_str("abc", "abcd"));
    }

    #[test]
    fn test_nonce_roundtrip() {
        assert!(validate_nonce_b64(&make_nonce_b64()).is_ok());
        assert!(validate_nonce_b64("not base64!").is_err());
    }
}
