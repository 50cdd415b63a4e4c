//! Runtime configuration loaded from the process environment.
//!
//! Every setting has a default so the binary starts without any variables
//! set. Values are read once at startup and never reloaded.

use std::path::PathBuf;

/// Artifact directory used when `CARDIORISK_ARTIFACT_DIR` is unset.
pub const DEFAULT_ARTIFACT_DIR: &str = "artifacts/demo";

/// Log file used in file mode when `CARDIORISK_LOG_FILE` is unset.
pub const DEFAULT_LOG_FILE: &str = "cardiorisk.log";

pub const ARTIFACT_DIR_ENV: &str = "CARDIORISK_ARTIFACT_DIR";
pub const ALLOW_UNSIGNED_ENV: &str = "CARDIORISK_ALLOW_UNSIGNED_ARTIFACTS";
pub const PUBKEY_FILE_ENV: &str = "CARDIORISK_SIGNING_PUBKEY_B64_FILE";
pub const MAX_AGE_ENV: &str = "CARDIORISK_ARTIFACT_MAX_AGE_SECS";
pub const LOG_MODE_ENV: &str = "CARDIORISK_LOG_MODE";
pub const LOG_FILE_ENV: &str = "CARDIORISK_LOG_FILE";

/// Where formatted log lines go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogMode {
    /// stderr, leaving stdout for prediction output
    Stderr,
    /// Append to `log_file`
    File,
}

/// Snapshot of configuration values consumed by the binaries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub artifact_dir: PathBuf,
    /// Accept a bundle without manifest and signature (debug builds only).
    pub allow_unsigned_artifacts: bool,
    /// File holding the base64 Ed25519 verifying key for artifact bundles.
    pub signing_pubkey_file: Option<PathBuf>,
    /// Reject manifests older than this many seconds.
    pub artifact_max_age_secs: Option<i64>,
    pub log_mode: LogMode,
    pub log_file: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            artifact_dir: PathBuf::from(DEFAULT_ARTIFACT_DIR),
            allow_unsigned_artifacts: false,
            signing_pubkey_file: None,
            artifact_max_age_secs: None,
            log_mode: LogMode::Stderr,
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
        }
    }
}

/// Truthy values accepted for boolean switches.
#[must_use]
pub fn parse_bool(value: &str) -> bool {
    matches!(value.trim(), "1" | "true" | "TRUE" | "yes" | "YES")
}

/// A positive whole number of seconds, or `None`.
#[must_use]
pub fn parse_max_age_secs(value: &str) -> Option<i64> {
    value.trim().parse::<i64>().ok().filter(|&secs| secs > 0)
}

impl AppConfig {
    /// Create a configuration snapshot from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a snapshot from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let log_mode = match non_empty(LOG_MODE_ENV).as_deref().map(str::trim) {
            Some("file") => LogMode::File,
            Some("stderr") | None => LogMode::Stderr,
            Some(other) => {
                // Logging is not up yet, so this cannot go through tracing.
                eprintln!("Unknown {LOG_MODE_ENV} value {other:?}, using stderr");
                LogMode::Stderr
            }
        };

        let artifact_max_age_secs = match non_empty(MAX_AGE_ENV) {
            None => None,
            Some(raw) => {
                let secs = parse_max_age_secs(&raw);
                if secs.is_none() {
                    eprintln!("Invalid {MAX_AGE_ENV} value {raw:?}, artifact age is not checked");
                }
                secs
            }
        };

        Self {
            artifact_dir: non_empty(ARTIFACT_DIR_ENV)
                .map(PathBuf::from)
                .unwrap_or(defaults.artifact_dir),
            allow_unsigned_artifacts: non_empty(ALLOW_UNSIGNED_ENV)
                .map(|v| parse_bool(&v))
                .unwrap_or(false),
            signing_pubkey_file: non_empty(PUBKEY_FILE_ENV).map(|v| PathBuf::from(v.trim())),
            artifact_max_age_secs,
            log_mode,
            log_file: non_empty(LOG_FILE_ENV)
                .map(PathBuf::from)
                .unwrap_or(defaults.log_file),
        }
    }
}
