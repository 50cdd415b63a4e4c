//! Ports layer: Trait definitions for external operations.
//!
//! Following Hexagonal Architecture, these traits define the boundary
//! between the inference pipeline and the trained model implementation.

mod classifier;

pub use classifier::{check_input, Classifier, ClassifierError};
