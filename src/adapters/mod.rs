//! Adapters layer: Concrete implementations of ports.
//!
//! - `artifacts`: loading and signing of the fitted artifact bundle
//! - `model`: classifier families behind the `Classifier` port
//! - `sanitize`: identifier and secret redaction for logs

pub mod artifacts;
pub mod model;
pub mod sanitize;

pub use artifacts::ArtifactError;
