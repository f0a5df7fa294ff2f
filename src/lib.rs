//! Segment Advisor: a web service that assigns customers to marketing
//! segments with a pre-trained K-Means pipeline
//!
//! Fitted artifacts (encoder, scaler, optional PCA projector, centroids) are
//! loaded once at startup; each form submission is encoded, scaled,
//! projected and matched to its nearest centroid.

pub mod artifacts;
pub mod catalog;
pub mod cli;
pub mod data;
pub mod error;
pub mod model;
pub mod page;
pub mod server;
pub mod transform;

// Re-export public items for easier access
pub use artifacts::ArtifactStore;
pub use catalog::{ClusterCatalog, ClusterDescriptor};
pub use cli::Args;
pub use data::CustomerRecord;
pub use error::{ArtifactError, PredictError, TransformError};
pub use model::{Clusterer, PipelineArtifacts, Reduction};
pub use server::{build_router, handle, AppContext, PredictResponse};

/// Common result type used throughout the application
pub type Result<T> = anyhow::Result<T>;
