//! Error types for artifact loading, inference and request handling

use std::path::PathBuf;

use thiserror::Error;

/// Failure to load or validate a pipeline artifact at startup
#[derive(Error, Debug)]
pub enum ArtifactError {
    /// Required artifact file does not exist
    #[error("{name} artifact not found at {}", path.display())]
    Missing { name: &'static str, path: PathBuf },

    /// Artifact file exists but could not be read
    #[error("failed to read {name} artifact: {source}")]
    Io {
        name: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// Artifact file is not valid JSON for its type
    #[error("failed to parse {name} artifact: {source}")]
    Parse {
        name: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// Artifact parsed but is inconsistent with itself or its neighbours
    #[error("invalid {name} artifact: {reason}")]
    Invalid { name: &'static str, reason: String },
}

impl ArtifactError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            name,
            reason: reason.into(),
        }
    }
}

/// A pipeline stage rejected its input
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransformError {
    #[error("unknown category {value:?} for feature {feature}")]
    UnknownCategory { feature: &'static str, value: String },

    #[error("{stage} expected {expected} features, got {found}")]
    DimensionMismatch {
        stage: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("feature {feature} does not match its encoding")]
    WrongKind { feature: &'static str },

    #[error("{stage} produced a non-finite value")]
    NonFinite { stage: &'static str },
}

/// Request-level failures, each rendered into the `error` field of a
/// failure payload
#[derive(Error, Debug)]
pub enum PredictError {
    #[error("Model not loaded. Please check model files in /model folder.")]
    ModelUnavailable,

    #[error("Invalid input format. Please enter valid numbers.")]
    InvalidFormat,

    #[error("Invalid input values. Please check your data.")]
    InvalidRange,

    #[error("Prediction error: {0}")]
    Transform(#[from] TransformError),

    #[error("Prediction error: cluster {0} has no catalog entry")]
    UncataloguedCluster(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_messages_are_fixed() {
        assert_eq!(
            PredictError::ModelUnavailable.to_string(),
            "Model not loaded. Please check model files in /model folder."
        );
        assert_eq!(
            PredictError::InvalidFormat.to_string(),
            "Invalid input format. Please enter valid numbers."
        );
        assert_eq!(
            PredictError::InvalidRange.to_string(),
            "Invalid input values. Please check your data."
        );
    }

    #[test]
    fn test_transform_error_keeps_description() {
        let err = PredictError::from(TransformError::UnknownCategory {
            feature: "Education",
            value: "Doctorate".to_string(),
        });
        assert_eq!(
            err.to_string(),
            "Prediction error: unknown category \"Doctorate\" for feature Education"
        );
    }
}
