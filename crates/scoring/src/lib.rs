//! Credit score prediction
//!
//! Features:
//! - Stored-column to model-column mapping with categorical encodings
//! - Standard scaler applied with previously fitted parameters
//! - Gradient-boosted tree ensemble (JSON) or ONNX regressor
//! - Fail-closed scoring: any failure yields the configured default score

pub mod features;
pub mod model;
pub mod scaler;
pub mod scorer;

pub use features::{FeatureMapper, FeatureValue, FeatureVector, COLUMN_MAPPING};
pub use model::{load_regressor, Regressor, TreeEnsemble};
#[cfg(feature = "onnx")]
pub use model::OnnxRegressor;
pub use scaler::StandardScaler;
pub use scorer::{ArtifactState, DegradeReason, ScoreResult, Scorer};

use thiserror::Error;

/// Scoring errors
///
/// Never surfaced by [`Scorer::score`]; each one maps to a [`DegradeReason`].
#[derive(Error, Debug)]
pub enum ScoringError {
    #[error("Artifact not found: {0}")]
    ArtifactMissing(String),

    #[error("Invalid artifact {path}: {message}")]
    InvalidArtifact { path: String, message: String },

    #[error("Feature mismatch: {0}")]
    FeatureMismatch(String),

    #[error("Non-numeric value {label:?} for feature {column}")]
    NonNumeric { column: String, label: String },

    #[error("Model error: {0}")]
    Model(String),

    #[error("Prediction is not finite: {0}")]
    NonFinite(f64),

    #[error("Unsupported model format: {0}")]
    UnsupportedFormat(String),
}

impl ScoringError {
    pub(crate) fn invalid(path: impl Into<String>, message: impl Into<String>) -> Self {
        ScoringError::InvalidArtifact {
            path: path.into(),
            message: message.into(),
        }
    }
}
