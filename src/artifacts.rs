//! Loading the fitted pipeline from the model directory at startup

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::error::ArtifactError;
use crate::model::{Clusterer, PipelineArtifacts, Reduction};
use crate::transform::{Encoder, Projector, Scaler};

pub const ENCODER_FILE: &str = "encoder.json";
pub const SCALER_FILE: &str = "scaler.json";
pub const PROJECTOR_FILE: &str = "pca.json";
pub const CLUSTERER_FILE: &str = "kmeans_model.json";

/// Outcome of loading the model directory; fixed for the process lifetime
#[derive(Debug)]
pub enum ArtifactStore {
    Ready(PipelineArtifacts),
    Unavailable { reason: String },
}

impl ArtifactStore {
    /// Load every artifact from `dir`. Never fails: a missing or broken
    /// required artifact leaves the store unavailable with the reason
    /// recorded.
    pub fn load(dir: &Path, max_clusters: usize) -> Self {
        match load_pipeline(dir, max_clusters) {
            Ok(artifacts) => {
                info!(
                    "Loaded model from {} ({} clusters, projection {})",
                    dir.display(),
                    artifacts.n_clusters(),
                    if artifacts.reduction().is_enabled() {
                        "enabled"
                    } else {
                        "disabled"
                    }
                );
                ArtifactStore::Ready(artifacts)
            }
            Err(e) => {
                warn!("Model unavailable: {}", e);
                ArtifactStore::Unavailable {
                    reason: e.to_string(),
                }
            }
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, ArtifactStore::Ready(_))
    }

    pub fn artifacts(&self) -> Option<&PipelineArtifacts> {
        match self {
            ArtifactStore::Ready(artifacts) => Some(artifacts),
            ArtifactStore::Unavailable { .. } => None,
        }
    }

    pub fn unavailable_reason(&self) -> Option<&str> {
        match self {
            ArtifactStore::Ready(_) => None,
            ArtifactStore::Unavailable { reason } => Some(reason),
        }
    }
}

fn load_pipeline(dir: &Path, max_clusters: usize) -> Result<PipelineArtifacts, ArtifactError> {
    let encoder: Encoder = read_required(dir, ENCODER_FILE, "encoder")?;
    let scaler: Scaler = read_required(dir, SCALER_FILE, "scaler")?;
    let clusterer: Clusterer = read_required(dir, CLUSTERER_FILE, "clusterer")?;

    let reduction = match read_optional::<Projector>(dir, PROJECTOR_FILE, "projector")? {
        Some(projector) => Reduction::Projected(projector),
        None => {
            debug!("No {} in {}, clustering scaled features directly", PROJECTOR_FILE, dir.display());
            Reduction::Identity
        }
    };

    PipelineArtifacts::new(encoder, scaler, reduction, clusterer, max_clusters)
}

fn read_required<T: DeserializeOwned>(
    dir: &Path,
    file: &str,
    name: &'static str,
) -> Result<T, ArtifactError> {
    let path = dir.join(file);
    read_optional(dir, file, name)?.ok_or(ArtifactError::Missing { name, path })
}

fn read_optional<T: DeserializeOwned>(
    dir: &Path,
    file: &str,
    name: &'static str,
) -> Result<Option<T>, ArtifactError> {
    let path: PathBuf = dir.join(file);
    let contents = match fs::read_to_string(&path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(source) => return Err(ArtifactError::Io { name, source }),
    };

    serde_json::from_str(&contents)
        .map(Some)
        .map_err(|source| ArtifactError::Parse { name, source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const ENCODER: &str = r#"{"columns": [
        {"kind": "passthrough", "field": "Income"},
        {"kind": "one_hot", "field": "Education", "categories": ["Basic", "Graduation"]}
    ]}"#;
    const SCALER: &str = r#"{"mean": [50000.0, 0.0, 0.0], "scale": [10000.0, 1.0, 1.0]}"#;
    const CLUSTERER: &str = r#"{"centroids": [[0.0, 0.0, 1.0], [2.0, 1.0, 0.0]]}"#;

    fn write_model_dir(files: &[(&str, &str)]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for (name, contents) in files {
            fs::write(dir.path().join(name), contents).unwrap();
        }
        dir
    }

    #[test]
    fn test_load_without_projector() {
        let dir = write_model_dir(&[
            (ENCODER_FILE, ENCODER),
            (SCALER_FILE, SCALER),
            (CLUSTERER_FILE, CLUSTERER),
        ]);

        let store = ArtifactStore::load(dir.path(), 4);
        assert!(store.is_ready());
        assert!(store.unavailable_reason().is_none());

        let artifacts = store.artifacts().unwrap();
        assert!(!artifacts.reduction().is_enabled());
        assert_eq!(artifacts.n_clusters(), 2);
    }

    #[test]
    fn test_load_with_projector() {
        let dir = write_model_dir(&[
            (ENCODER_FILE, ENCODER),
            (SCALER_FILE, SCALER),
            (
                PROJECTOR_FILE,
                r#"{"mean": [0.0, 0.0, 0.0], "components": [[1.0, 0.0, 0.0]]}"#,
            ),
            (CLUSTERER_FILE, r#"{"centroids": [[-1.0], [1.0]]}"#),
        ]);

        let store = ArtifactStore::load(dir.path(), 4);
        assert!(store.artifacts().unwrap().reduction().is_enabled());
    }

    #[test]
    fn test_missing_required_artifact() {
        let dir = write_model_dir(&[(ENCODER_FILE, ENCODER), (SCALER_FILE, SCALER)]);

        let store = ArtifactStore::load(dir.path(), 4);
        assert!(!store.is_ready());
        assert!(store.artifacts().is_none());

        let reason = store.unavailable_reason().unwrap();
        assert!(reason.contains("clusterer"), "reason: {}", reason);
        assert!(reason.contains(CLUSTERER_FILE), "reason: {}", reason);
    }

    #[test]
    fn test_corrupt_artifact() {
        let dir = write_model_dir(&[
            (ENCODER_FILE, ENCODER),
            (SCALER_FILE, "not json"),
            (CLUSTERER_FILE, CLUSTERER),
        ]);

        let store = ArtifactStore::load(dir.path(), 4);
        assert!(store
            .unavailable_reason()
            .unwrap()
            .starts_with("failed to parse scaler artifact"));
    }

    #[test]
    fn test_corrupt_projector_is_not_ignored() {
        let dir = write_model_dir(&[
            (ENCODER_FILE, ENCODER),
            (SCALER_FILE, SCALER),
            (PROJECTOR_FILE, "{}"),
            (CLUSTERER_FILE, CLUSTERER),
        ]);

        assert!(!ArtifactStore::load(dir.path(), 4).is_ready());
    }

    #[test]
    fn test_too_many_clusters_fails_closed() {
        let dir = write_model_dir(&[
            (ENCODER_FILE, ENCODER),
            (SCALER_FILE, SCALER),
            (CLUSTERER_FILE, CLUSTERER),
        ]);

        assert!(!ArtifactStore::load(dir.path(), 1).is_ready());
    }

    #[test]
    fn test_missing_directory() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::load(&dir.path().join("absent"), 4);
        assert!(!store.is_ready());
    }
}
