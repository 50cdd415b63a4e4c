//! Signs an artifact bundle.
//!
//! Hashes `classifier.json`, `scaler.json` and `encoders.json` into
//! `manifest.json` and writes the Ed25519 signature to `artifacts.sig`.
//!
//! ```bash
//! CARDIORISK_SIGNING_KEY_B64_FILE=keys/seed.b64 \
//!     cargo run --bin sign_artifacts -- artifacts/demo --serial 3
//! ```
//!
//! The seed is read from `CARDIORISK_SIGNING_KEY_B64_FILE`, or from
//! `CARDIORISK_SIGNING_KEY_B64` in debug builds only.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use base64::engine::general_purpose;
use base64::Engine;
use clap::Parser;
use ed25519_dalek::SigningKey;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use cardiorisk::adapters::artifacts::sign_bundle;

const KEY_FILE_ENV: &str = "CARDIORISK_SIGNING_KEY_B64_FILE";
const KEY_ENV_DEV: &str = "CARDIORISK_SIGNING_KEY_B64";

#[derive(Parser)]
#[command(name = "sign_artifacts", about = "Sign an artifact bundle directory")]
struct Args {
    /// Bundle directory
    dir: PathBuf,

    /// Bundle serial (default: current Unix time)
    #[arg(long)]
    serial: Option<u64>,

    /// Base64 of a 16-byte nonce (default: random)
    #[arg(long)]
    nonce_b64: Option<String>,
}

#[derive(Zeroize, ZeroizeOnDrop)]
struct Seed([u8; 32]);

fn read_seed_b64() -> Result<Zeroizing<String>> {
    let secret = if let Ok(path) = std::env::var(KEY_FILE_ENV) {
        let content = std::fs::read_to_string(path.trim())
            .with_context(|| format!("reading signing key file {path:?}"))?;
        Zeroizing::new(content.trim_end_matches(['\n', '\r']).to_string())
    } else if cfg!(debug_assertions) {
        match std::env::var(KEY_ENV_DEV) {
            Ok(v) => Zeroizing::new(v.trim_end_matches(['\n', '\r']).to_string()),
            Err(_) => {
                bail!("missing signing key: set {KEY_FILE_ENV} (or {KEY_ENV_DEV} in debug builds)")
            }
        }
    } else {
        bail!("missing signing key: set {KEY_FILE_ENV}");
    };

    if secret.is_empty() {
        bail!("empty signing key");
    }
    Ok(secret)
}

fn read_seed() -> Result<Seed> {
    let b64 = read_seed_b64()?;
    let raw = Zeroizing::new(
        general_purpose::STANDARD
            .decode(b64.trim())
            .context("invalid base64 in signing key")?,
    );
    if raw.len() != 32 {
        bail!(
            "signing key seed must be 32 bytes after base64 decode (got {})",
            raw.len()
        );
    }
    let mut seed = Seed([0u8; 32]);
    seed.0.copy_from_slice(&raw);
    Ok(seed)
}

fn main() -> Result<()> {
    let args = Args::parse();

    let seed = read_seed()?;
    let signing_key = SigningKey::from_bytes(&seed.0);
    drop(seed);

    let manifest = sign_bundle(&args.dir, &signing_key, args.serial, args.nonce_b64)?;

    println!(
        "Signed {} files in {:?} (serial {})",
        manifest.files.len(),
        args.dir,
        manifest.serial
    );
    println!(
        "Verifying key (base64): {}",
        general_purpose::STANDARD.encode(signing_key.verifying_key().as_bytes())
    );
    Ok(())
}
