//! HTTP surface: shared context, request handling and the axum router

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{rejection::FormRejection, State},
    response::Html,
    routing::{get, post},
    Form, Json, Router,
};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use tower_http::trace::TraceLayer;
use tracing::{debug, warn};

use crate::artifacts::ArtifactStore;
use crate::catalog::{ClusterCatalog, ClusterDescriptor};
use crate::data::CustomerRecord;
use crate::error::PredictError;
use crate::page;

/// Everything loaded at startup, shared read-only by all requests
#[derive(Debug)]
pub struct AppContext {
    pub store: ArtifactStore,
    pub catalog: ClusterCatalog,
    pub team: Vec<String>,
}

impl AppContext {
    pub fn new(store: ArtifactStore, catalog: ClusterCatalog, team: Vec<String>) -> Self {
        Self {
            store,
            catalog,
            team,
        }
    }

    pub fn model_loaded(&self) -> bool {
        self.store.is_ready()
    }
}

/// Outcome of `POST /predict`. Serialized as a flat JSON object whose
/// `success` flag is derived from the variant.
#[derive(Debug, Clone, PartialEq)]
pub enum PredictResponse {
    Success {
        cluster: usize,
        name: String,
        description: String,
        strategy: String,
        color: String,
    },
    Failure {
        error: String,
    },
}

impl Serialize for PredictResponse {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            PredictResponse::Success {
                cluster,
                name,
                description,
                strategy,
                color,
            } => {
                let mut map = serializer.serialize_map(Some(6))?;
                map.serialize_entry("success", &true)?;
                map.serialize_entry("cluster", cluster)?;
                map.serialize_entry("name", name)?;
                map.serialize_entry("description", description)?;
                map.serialize_entry("strategy", strategy)?;
                map.serialize_entry("color", color)?;
                map.end()
            }
            PredictResponse::Failure { error } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("success", &false)?;
                map.serialize_entry("error", error)?;
                map.end()
            }
        }
    }
}

impl PredictResponse {
    fn success(descriptor: &ClusterDescriptor) -> Self {
        PredictResponse::Success {
            cluster: descriptor.id,
            name: descriptor.name.to_string(),
            description: descriptor.description.to_string(),
            strategy: descriptor.strategy.to_string(),
            color: descriptor.color.to_string(),
        }
    }

    fn failure(error: &PredictError) -> Self {
        PredictResponse::Failure {
            error: error.to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, PredictResponse::Success { .. })
    }
}

/// Classify one form submission. Every outcome, including failures, is a
/// well-formed response.
pub fn handle(context: &AppContext, fields: &HashMap<String, String>) -> PredictResponse {
    match classify(context, fields) {
        Ok(descriptor) => PredictResponse::success(descriptor),
        Err(e) => {
            debug!("Prediction rejected: {}", e);
            PredictResponse::failure(&e)
        }
    }
}

fn classify<'a>(
    context: &'a AppContext,
    fields: &HashMap<String, String>,
) -> Result<&'a ClusterDescriptor, PredictError> {
    let artifacts = context
        .store
        .artifacts()
        .ok_or(PredictError::ModelUnavailable)?;

    let record = CustomerRecord::from_form(fields).map_err(|e| {
        debug!("Unparseable form: {}", e);
        PredictError::InvalidFormat
    })?;

    if !record.is_valid() {
        return Err(PredictError::InvalidRange);
    }

    let cluster = artifacts.predict(&record)?;
    context.catalog.get(cluster).ok_or_else(|| {
        warn!("Model assigned cluster {} which has no catalog entry", cluster);
        PredictError::UncataloguedCluster(cluster)
    })
}

/// GET /health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub model_loaded: bool,
}

/// POST /predict
///
/// A body that is not a decodable form is treated as a submission with no
/// fields.
async fn predict(
    State(context): State<Arc<AppContext>>,
    form: Result<Form<Vec<(String, String)>>, FormRejection>,
) -> Json<PredictResponse> {
    let fields = match form {
        Ok(Form(pairs)) => first_values(pairs),
        Err(rejection) => {
            debug!("Rejected form body: {}", rejection);
            HashMap::new()
        }
    };
    Json(handle(&context, &fields))
}

/// Collapse form pairs into a map; a repeated field keeps its first value
fn first_values(pairs: Vec<(String, String)>) -> HashMap<String, String> {
    let mut fields = HashMap::with_capacity(pairs.len());
    for (name, value) in pairs {
        fields.entry(name).or_insert(value);
    }
    fields
}

/// GET /
async fn index(State(context): State<Arc<AppContext>>) -> Html<String> {
    Html(page::render_index(&context))
}

/// GET /health
async fn health(State(context): State<Arc<AppContext>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        model_loaded: context.model_loaded(),
    })
}

/// Build application router
pub fn build_router(context: Arc<AppContext>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/predict", post(predict))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(context)
}
