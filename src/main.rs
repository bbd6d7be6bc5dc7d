use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod db;
mod domain;
mod errors;
mod gateway;
mod handlers;
mod local;
mod models;
mod repositories;
mod routes;
mod startup;
mod storage;

use crate::config::Config;
use crate::db::Database;
use crate::domain::{FileStorage, GenerationRepository, ImageGateway};
use crate::gateway::HuggingFaceGateway;
use crate::local::LocalCopies;
use crate::repositories::PostgresGenerationRepository;
use crate::storage::S3FileStorage;

/// AppState holds shared resources for the web server.
pub struct AppState {
    pub generation_repo: Arc<dyn GenerationRepository>,
    pub file_storage: Arc<dyn FileStorage>,
    pub gateway: Arc<dyn ImageGateway>,
    pub local_copies: LocalCopies,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing (logging)
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "banita=debug,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = Config::load()?;
    tracing::info!(environment = ?config.environment, "Configuration loaded");

    // --- Client Initialization ---
    let database = Database::connect(&config.database_url)?;
    let generation_repo = Arc::new(PostgresGenerationRepository::new(database.clone()));

    tracing::info!("Initializing blob storage client...");
    let file_storage = Arc::new(S3FileStorage::connect(&config).await);

    let gateway = Arc::new(HuggingFaceGateway::new(
        reqwest::Client::new(),
        config.inference_model_url.clone(),
        config.inference_api_token.clone(),
    ));

    let local_copies = LocalCopies::from_config(&config);

    startup::init_resources(&config, generation_repo.as_ref(), &file_storage, &gateway, &local_copies).await?;

    // --- Application State ---
    let state = Arc::new(AppState {
        generation_repo,
        file_storage,
        gateway,
        local_copies,
    });

    let app = routes::create_router(state);

    // --- Server Startup ---
    tracing::info!("Server listening on http://{}", config.bind_address);
    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    database.close();
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
