use crate::errors::{GatewayError, RepoError, StorageError};
use crate::models::Generation;
use async_trait::async_trait;
use axum::body::Bytes;

/// Trait defining operations for storing and retrieving generation records.
#[async_trait]
pub trait GenerationRepository: Send + Sync + 'static { // Send+Sync+'static required for Arc<dyn>
    /// Creates the backing table if it does not exist yet. Safe to call repeatedly.
    async fn ensure_schema(&self) -> Result<(), RepoError>;

    /// Inserts a new record and returns it with its assigned id and timestamp.
    async fn create(&self, prompt: &str, image_url: &str) -> Result<Generation, RepoError>;

    /// Lists every record, oldest first.
    async fn list_all(&self) -> Result<Vec<Generation>, RepoError>;
}

/// Trait for publishing image data to public blob storage.
#[async_trait]
pub trait FileStorage: Send + Sync + 'static {
    /// Uploads the data under `key` and returns the URL it is publicly served from.
    async fn upload(&self, key: &str, data: Bytes, content_type: Option<String>) -> Result<String, StorageError>;
}

/// The hosted text-to-image model.
#[async_trait]
pub trait ImageGateway: Send + Sync + 'static {
    /// Runs one inference for `prompt` and returns the raw, non-empty image bytes.
    async fn generate(&self, prompt: &str) -> Result<Bytes, GatewayError>;
}
