use crate::{
    domain::ImageGateway,
    errors::{GatewayError, UpstreamFailure},
};
use async_trait::async_trait;
use axum::body::Bytes;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;

/// Hosted inference endpoint for a single text-to-image model.
#[derive(Debug, Clone)]
pub struct HuggingFaceGateway {
    client: reqwest::Client,
    model_url: String,
    api_token: String,
}

// Error payload shape returned by the inference API on failure.
#[derive(Deserialize, Default)]
struct ErrorBody {
    #[serde(default)]
    error: Option<Value>,
    #[serde(default)]
    warnings: Option<Vec<Value>>,
}

impl HuggingFaceGateway {
    pub fn new(client: reqwest::Client, model_url: impl Into<String>, api_token: impl Into<String>) -> Self {
        let model_url = model_url.into();
        tracing::info!(%model_url, "Initializing HuggingFaceGateway");
        Self {
            client,
            model_url,
            api_token: api_token.into(),
        }
    }

    /// Calls the model endpoint with the configured token and returns the status it answers with.
    ///
    /// Gives up with `GatewayError::TimedOut` once `limit` elapses.
    pub async fn check_token(&self, limit: Duration) -> Result<StatusCode, GatewayError> {
        let request = async {
            let response = self
                .client
                .get(&self.model_url)
                .bearer_auth(&self.api_token)
                .send()
                .await?;
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::debug!(%status, body = %body, "Inference token check response");
            Ok::<_, GatewayError>(status)
        };

        match tokio::time::timeout(limit, request).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!("Inference token check timed out after {:?}", limit);
                Err(GatewayError::TimedOut(limit))
            }
        }
    }
}

#[async_trait]
impl ImageGateway for HuggingFaceGateway {
    async fn generate(&self, prompt: &str) -> Result<Bytes, GatewayError> {
        tracing::debug!(model_url = %self.model_url, "Requesting image from inference API");

        let response = self
            .client
            .post(&self.model_url)
            .bearer_auth(&self.api_token)
            .json(&json!({ "inputs": prompt }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let failure = upstream_failure(status, &body);
            tracing::warn!(status = failure.status, message = ?failure.message, "Inference API rejected request");
            return Err(GatewayError::Upstream(failure));
        }

        let image = response.bytes().await?;
        if image.is_empty() {
            return Err(GatewayError::EmptyImage);
        }

        tracing::debug!(size = image.len(), "Inference API returned image");
        Ok(image)
    }
}

fn upstream_failure(status: StatusCode, body: &str) -> UpstreamFailure {
    let (message, warnings) = match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => (
            parsed.error.map(value_text),
            parsed
                .warnings
                .unwrap_or_default()
                .into_iter()
                .map(value_text)
                .collect(),
        ),
        Err(_) => {
            let trimmed = body.trim();
            ((!trimmed.is_empty()).then(|| trimmed.to_string()), Vec::new())
        }
    };

    UpstreamFailure {
        status: status.as_u16(),
        status_text: status.canonical_reason().unwrap_or_default().to_string(),
        message,
        warnings,
    }
}

fn value_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}
