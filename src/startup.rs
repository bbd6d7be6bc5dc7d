use crate::{
    config::Config,
    domain::GenerationRepository,
    gateway::HuggingFaceGateway,
    local::LocalCopies,
    storage::S3FileStorage,
};
use anyhow::Context;
use std::time::Duration;
use tracing;

/// Upper bound on the startup token check against the inference API.
pub const TOKEN_CHECK_TIMEOUT: Duration = Duration::from_secs(10);

/// Prepares everything a generation request touches before the server starts.
///
/// Only the local directory and the dev bucket bootstrap are fatal; schema and
/// token problems are logged.
pub async fn init_resources(
    config: &Config,
    repo: &dyn GenerationRepository,
    file_storage: &S3FileStorage,
    gateway: &HuggingFaceGateway,
    local_copies: &LocalCopies,
) -> anyhow::Result<()> {
    tracing::info!("Startup: Initializing resources...");

    local_copies
        .ensure_dir()
        .await
        .with_context(|| format!("Startup: Could not create '{}'", local_copies.dir().display()))?;

    match repo.ensure_schema().await {
        Ok(()) => tracing::info!("Startup: Generations table ready."),
        Err(e) => tracing::warn!(error = %e, "Startup: Could not ensure generations table"),
    }

    // Real deployments provision the bucket; only bootstrap S3-compatible dev stores.
    if config.storage_endpoint.is_some() {
        file_storage
            .ensure_bucket()
            .await
            .context("Startup: Blob storage bucket is not usable")?;
    }

    match gateway.check_token(TOKEN_CHECK_TIMEOUT).await {
        Ok(status) if status.is_success() => tracing::info!(%status, "Startup: Inference API token accepted"),
        Ok(status) => tracing::warn!(%status, "Startup: Inference API token check returned non-success status"),
        Err(e) => tracing::warn!(error = %e, "Startup: Inference API token check failed"),
    }

    tracing::info!("Startup: Resource initialization complete.");
    Ok(())
}
