//! K-Means cluster assignment and the full inference pipeline

use linfa_nn::distance::{Distance, L2Dist};
use ndarray::{Array1, Array2, ArrayView1};
use serde::Deserialize;

use crate::data::CustomerRecord;
use crate::error::{ArtifactError, TransformError};
use crate::transform::{check_width, rows_to_array, Encoder, Projector, Scaler};

/// Fitted K-Means centroids
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "ClustererFile")]
pub struct Clusterer {
    /// Cluster centroids in model space, one row per cluster
    centroids: Array2<f64>,
}

#[derive(Deserialize)]
struct ClustererFile {
    centroids: Vec<Vec<f64>>,
}

impl TryFrom<ClustererFile> for Clusterer {
    type Error = String;

    fn try_from(file: ClustererFile) -> Result<Self, Self::Error> {
        let centroids = rows_to_array(file.centroids).map_err(|e| format!("centroids {}", e))?;
        if centroids.iter().any(|v| !v.is_finite()) {
            return Err("centroids contain non-finite values".to_string());
        }
        Ok(Self { centroids })
    }
}

impl Clusterer {
    pub fn new(centroids: Array2<f64>) -> Self {
        Self { centroids }
    }

    pub fn n_clusters(&self) -> usize {
        self.centroids.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.centroids.ncols()
    }

    /// Index of the nearest centroid; ties go to the lowest index
    pub fn predict(&self, features: ArrayView1<f64>) -> Result<usize, TransformError> {
        check_width("clusterer", self.n_features(), features.len())?;

        let mut min_distance = f64::INFINITY;
        let mut closest_cluster = None;

        for (cluster_idx, centroid) in self.centroids.outer_iter().enumerate() {
            let distance = L2Dist.rdistance(features, centroid);
            if distance < min_distance {
                min_distance = distance;
                closest_cluster = Some(cluster_idx);
            }
        }

        closest_cluster.ok_or(TransformError::NonFinite { stage: "clusterer" })
    }
}

/// Whether a dimensionality-reduction step runs between scaling and
/// clustering
#[derive(Debug, Clone, PartialEq)]
pub enum Reduction {
    Identity,
    Projected(Projector),
}

impl Reduction {
    pub fn is_enabled(&self) -> bool {
        matches!(self, Reduction::Projected(_))
    }

    fn output_width(&self, input_width: usize) -> usize {
        match self {
            Reduction::Identity => input_width,
            Reduction::Projected(projector) => projector.output_width(),
        }
    }

    fn apply(&self, features: Array1<f64>) -> Result<Array1<f64>, TransformError> {
        match self {
            Reduction::Identity => Ok(features),
            Reduction::Projected(projector) => projector.transform(features.view()),
        }
    }
}

/// Every fitted stage of the pipeline, checked to chain together
#[derive(Debug, Clone)]
pub struct PipelineArtifacts {
    encoder: Encoder,
    scaler: Scaler,
    reduction: Reduction,
    clusterer: Clusterer,
}

impl PipelineArtifacts {
    /// Assemble the stages, rejecting any pair whose widths disagree or a
    /// clusterer with more clusters than `max_clusters`
    pub fn new(
        encoder: Encoder,
        scaler: Scaler,
        reduction: Reduction,
        clusterer: Clusterer,
        max_clusters: usize,
    ) -> Result<Self, ArtifactError> {
        encoder.validate()?;
        scaler.validate(encoder.output_width())?;

        if let Reduction::Projected(projector) = &reduction {
            if projector.input_width() != scaler.width() {
                return Err(ArtifactError::invalid(
                    "projector",
                    format!(
                        "expects {} features but the scaler produces {}",
                        projector.input_width(),
                        scaler.width()
                    ),
                ));
            }
        }

        let model_width = reduction.output_width(scaler.width());
        if clusterer.n_features() != model_width {
            return Err(ArtifactError::invalid(
                "clusterer",
                format!(
                    "centroids have {} features but the pipeline produces {}",
                    clusterer.n_features(),
                    model_width
                ),
            ));
        }

        if clusterer.n_clusters() > max_clusters {
            return Err(ArtifactError::invalid(
                "clusterer",
                format!(
                    "{} clusters but only {} are described",
                    clusterer.n_clusters(),
                    max_clusters
                ),
            ));
        }

        Ok(Self {
            encoder,
            scaler,
            reduction,
            clusterer,
        })
    }

    pub fn reduction(&self) -> &Reduction {
        &self.reduction
    }

    pub fn n_clusters(&self) -> usize {
        self.clusterer.n_clusters()
    }

    /// Run one record through encoder, scaler, optional projector and
    /// clusterer
    pub fn predict(&self, record: &CustomerRecord) -> Result<usize, TransformError> {
        let encoded = self.encoder.transform(record)?;
        let scaled = self.scaler.transform(encoded.view())?;
        let reduced = self.reduction.apply(scaled)?;
        self.clusterer.predict(reduced.view())
    }
}
