use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A persisted prompt together with the public URL of the image it produced.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Generation {
    pub id: i32,
    pub prompt: String,
    pub image_url: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Deserialize, Debug, Default)]
pub struct GenerateRequest {
    #[serde(default)]
    pub prompt: Option<String>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub url: String,
    /// Whole milliseconds spent serving the request.
    pub execution_time: u64,
}
