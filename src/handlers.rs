use crate::{
    AppState,
    errors::{AppError, GenerateError},
    models::{GenerateRequest, GenerateResponse, Generation},
};
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    response::{Html, IntoResponse},
};
use chrono::Utc;
use std::{sync::Arc, time::Instant};
use tracing;
use uuid::Uuid;

const INDEX_HTML: &str = include_str!("../static/index.html");

/// Handler for GET /
pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// Handler for POST /api/generate-image
pub async fn generate_image(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<Json<GenerateResponse>, AppError> {
    let started = Instant::now();

    let Json(request) = payload.map_err(|e| AppError::InvalidInput(e.body_text()))?;
    let prompt = request
        .prompt
        .filter(|p| !p.trim().is_empty())
        .ok_or(AppError::MissingPrompt)?;
    tracing::info!(%prompt, "Received generation request");

    match run_generation(&state, &prompt).await {
        Ok(generation) => {
            let execution_time = elapsed_ms(started);
            tracing::info!(generation_id = generation.id, execution_time_ms = execution_time, "Generation completed");
            Ok(Json(GenerateResponse {
                url: generation.image_url,
                execution_time,
            }))
        }
        Err(source) => Err(AppError::GenerationFailed {
            source,
            execution_time: elapsed_ms(started),
        }),
    }
}

// One attempt end to end: inference, optional local copy, upload, then insert.
async fn run_generation(state: &AppState, prompt: &str) -> Result<Generation, GenerateError> {
    if let Err(e) = state.generation_repo.ensure_schema().await {
        tracing::error!(error.source = ?e, "Error creating generations table");
    }

    let image = state.gateway.generate(prompt).await?;

    let file_name = image_file_name();
    state.local_copies.save(&file_name, &image).await?;

    let url = state
        .file_storage
        .upload(&file_name, image, Some("image/png".to_string()))
        .await?;
    tracing::info!(%url, "Image stored in blob storage");

    let generation = state.generation_repo.create(prompt, &url).await?;
    Ok(generation)
}

/// Handler for GET /api/generations
pub async fn list_generations(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    tracing::debug!("Listing all generations via handler");
    let generations = state.generation_repo.list_all().await?;
    tracing::info!("Handler successfully retrieved {} generations", generations.len());
    Ok(Json(generations))
}

fn image_file_name() -> String {
    format!(
        "generated-{}-{}.png",
        Utc::now().timestamp_millis(),
        Uuid::new_v4().simple()
    )
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
