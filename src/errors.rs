use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

// --- Domain/Infrastructure Errors ---

#[derive(Error, Debug)]
pub enum RepoError {
    #[error("Database backend error: {0:#}")]
    BackendError(#[from] anyhow::Error), // Wrap Anyhow errors from DB layer
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("File upload failed: {0}")]
    UploadFailed(String),

    #[error("Bucket unavailable: {0}")]
    BucketUnavailable(String),
}

/// What the inference service reported when it refused a request.
///
/// Displayed as compact JSON so the client can unpack it from `details`.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UpstreamFailure {
    pub status: u16,
    pub status_text: String,
    pub message: Option<String>,
    pub warnings: Vec<String>,
}

impl fmt::Display for UpstreamFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(json) => f.write_str(&json),
            Err(_) => write!(f, "{} {}", self.status, self.status_text),
        }
    }
}

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("{0}")]
    Upstream(UpstreamFailure),

    #[error("Empty image response")]
    EmptyImage,

    #[error("Inference request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Inference request timed out after {0:?}")]
    TimedOut(std::time::Duration),
}

/// Failure of a single generation run. `Display` is what the client sees as `details`.
#[derive(Error, Debug)]
pub enum GenerateError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("Could not write local copy: {0}")]
    LocalCopy(#[from] std::io::Error),

    #[error("Could not store generated image")]
    Storage(#[source] StorageError),

    #[error("Could not save generation record")]
    Repository(#[source] RepoError),
}

impl From<StorageError> for GenerateError {
    fn from(err: StorageError) -> Self {
        GenerateError::Storage(err)
    }
}

impl From<RepoError> for GenerateError {
    fn from(err: RepoError) -> Self {
        GenerateError::Repository(err)
    }
}

// --- Web Layer Error ---

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Prompt is required")]
    MissingPrompt,

    #[error("Failed to generate image after {execution_time}ms: {source}")]
    GenerationFailed {
        #[source]
        source: GenerateError,
        execution_time: u64,
    },

    #[error("Could not read generation data")]
    RepositoryError(#[source] RepoError),
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        AppError::RepositoryError(err)
    }
}

// --- Axum Response Implementation ---

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::InvalidInput(msg) => {
                tracing::warn!(error.message = %msg, "Rejecting request body");
                (StatusCode::BAD_REQUEST, Json(serde_json::json!({ "error": msg }))).into_response()
            }
            AppError::MissingPrompt => (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({ "error": "Prompt is required" })),
            )
                .into_response(),
            AppError::GenerationFailed { source, execution_time } => {
                tracing::error!(error.source = ?source, execution_time_ms = execution_time, "Generation failed");
                let body = serde_json::json!({
                    "error": "Failed to generate image",
                    "details": source.to_string(),
                    "executionTime": execution_time,
                });
                (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
            }
            AppError::RepositoryError(e) => {
                tracing::error!(error.source = ?e, "Repository error occurred");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(serde_json::json!({ "error": "Database operation failed" })),
                )
                    .into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde_json::Value;

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn upstream_failure_displays_as_json() {
        let failure = UpstreamFailure {
            status: 503,
            status_text: "Service Unavailable".to_string(),
            message: Some("Model is currently loading".to_string()),
            warnings: vec!["retry later".to_string()],
        };

        let parsed: Value = serde_json::from_str(&failure.to_string()).unwrap();
        assert_eq!(parsed["status"], 503);
        assert_eq!(parsed["statusText"], "Service Unavailable");
        assert_eq!(parsed["message"], "Model is currently loading");
        assert_eq!(parsed["warnings"][0], "retry later");
    }

    #[tokio::test]
    async fn missing_prompt_is_bad_request() {
        let response = AppError::MissingPrompt.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await, serde_json::json!({ "error": "Prompt is required" }));
    }

    #[tokio::test]
    async fn generation_failure_carries_details_and_time() {
        let err = AppError::GenerationFailed {
            source: GenerateError::Gateway(GatewayError::EmptyImage),
            execution_time: 42,
        };
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert_eq!(body["error"], "Failed to generate image");
        assert_eq!(body["details"], "Empty image response");
        assert_eq!(body["executionTime"], 42);
    }

    #[tokio::test]
    async fn infrastructure_failures_hide_backend_detail() {
        let err = AppError::GenerationFailed {
            source: StorageError::UploadFailed("AccessDenied: secret bucket policy".into()).into(),
            execution_time: 7,
        };
        let body = body_json(err.into_response()).await;
        assert_eq!(body["details"], "Could not store generated image");

        let err = AppError::GenerationFailed {
            source: RepoError::BackendError(anyhow::anyhow!("connection refused")).into(),
            execution_time: 7,
        };
        let body = body_json(err.into_response()).await;
        assert_eq!(body["details"], "Could not save generation record");
    }

    #[test]
    fn storage_errors_name_the_failing_step() {
        let err = StorageError::BucketUnavailable("'banita-images': AccessDenied".into());
        assert_eq!(err.to_string(), "Bucket unavailable: 'banita-images': AccessDenied");

        let err = StorageError::UploadFailed("timeout".into());
        assert_eq!(err.to_string(), "File upload failed: timeout");
    }
}
