use std::{env, net::SocketAddr, path::PathBuf, str::FromStr};
use thiserror::Error;

pub const DEFAULT_MODEL_URL: &str =
    "https://api-inference.huggingface.co/models/stabilityai/stable-diffusion-2-1";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid environment variable format for {0}: {1}")]
    InvalidVar(String, String),
}

/// Where the process is running. Only development keeps local copies of images.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunEnvironment {
    Development,
    Production,
}

impl FromStr for RunEnvironment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(RunEnvironment::Development),
            "production" | "prod" => Ok(RunEnvironment::Production),
            other => Err(format!("unknown environment '{}'", other)),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub inference_api_token: String,
    pub inference_model_url: String,
    pub blob_bucket_name: String,
    // Overrides the URL prefix handed back to clients for uploaded images
    pub blob_public_base_url: Option<String>,
    pub aws_region: String,
    // Optional endpoint for LocalStack or another S3-compatible store
    pub storage_endpoint: Option<String>,
    pub environment: RunEnvironment,
    pub generations_dir: PathBuf,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (ignores errors, relies on env vars otherwise)
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &str| var(key).ok_or_else(|| ConfigError::MissingVar(key.into()));

        let bind_address_str = var("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:3000".to_string());
        let bind_address = SocketAddr::from_str(&bind_address_str)
            .map_err(|e| ConfigError::InvalidVar("BIND_ADDRESS".into(), e.to_string()))?;

        let database_url = var("DATABASE_URL")
            .or_else(|| var("POSTGRES_URL"))
            .ok_or_else(|| ConfigError::MissingVar("DATABASE_URL".into()))?;

        let inference_api_token = required("HUGGING_FACE_API_TOKEN")?;
        let inference_model_url =
            var("INFERENCE_MODEL_URL").unwrap_or_else(|| DEFAULT_MODEL_URL.to_string());

        let blob_bucket_name = required("BLOB_BUCKET_NAME")?;
        let blob_public_base_url = var("BLOB_PUBLIC_BASE_URL");

        let aws_region = var("AWS_DEFAULT_REGION").unwrap_or_else(|| "us-east-1".to_string());
        let storage_endpoint = var("AWS_ENDPOINT_URL");

        let environment = match var("BANITA_ENV") {
            Some(raw) => raw
                .parse()
                .map_err(|e| ConfigError::InvalidVar("BANITA_ENV".into(), e))?,
            None => RunEnvironment::Production,
        };

        let generations_dir =
            PathBuf::from(var("GENERATIONS_DIR").unwrap_or_else(|| "generations".to_string()));

        Ok(Config {
            bind_address,
            database_url,
            inference_api_token,
            inference_model_url,
            blob_bucket_name,
            blob_public_base_url,
            aws_region,
            storage_endpoint,
            environment,
            generations_dir,
        })
    }

    pub fn is_development(&self) -> bool {
        self.environment == RunEnvironment::Development
    }
}
