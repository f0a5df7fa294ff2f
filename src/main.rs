//! Segment Advisor: customer segmentation web service
//!
//! Loads the fitted pipeline, then serves the index page and the
//! prediction endpoint.

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use segment_advisor::{build_router, AppContext, ArtifactStore, Args, ClusterCatalog};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse();

    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::fmt()
        .with_env_filter(args.log_filter(rust_log.as_deref()))
        .init();

    info!(
        "Starting Segment Advisor v{}",
        env!("CARGO_PKG_VERSION")
    );

    let addr = args.bind_addr()?;
    let catalog = ClusterCatalog::default();

    info!("Model directory: {}", args.model_dir.display());
    let store = ArtifactStore::load(&args.model_dir, catalog.len());
    match store.unavailable_reason() {
        None => info!("✓ Model loaded, {} segments available", catalog.len()),
        Some(reason) => warn!("✗ Model not loaded ({}); predictions disabled", reason),
    }

    let team = args.team_members();
    if !team.is_empty() {
        info!("Team: {}", team.join(", "));
    }

    let context = Arc::new(AppContext::new(store, catalog, team));
    let app = build_router(context);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
