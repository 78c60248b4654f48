use std::{env, sync::Arc};

use aws_config::{BehaviorVersion, Region};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header};
use lambda_http::{tracing, Error};

use crate::store::{DynamoStore, MarketStore, MemoryStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    DynamoDB,
    Memory,
}

/// Startup settings, read once from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base64 HS256 secret shared with the identity provider.
    pub jwt_secret: String,
    pub region: String,
    /// Overrides the DynamoDB endpoint, e.g. DynamoDB Local.
    pub dynamodb_endpoint: Option<String>,
    pub store_backend: StoreBackend,
}

impl Config {
    pub fn from_env() -> Result<Self, Error> {
        let jwt_secret = env::var("JWT_SECRET").map_err(|e| format!("JWT_SECRET: {}", e))?;
        let region = env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".to_string());
        let dynamodb_endpoint = env::var("DYNAMODB_ENDPOINT").ok();
        let store_backend = match env::var("STORE_BACKEND").as_deref() {
            Ok("memory") => StoreBackend::Memory,
            Ok("dynamodb") | Err(_) => StoreBackend::DynamoDB,
            Ok(other) => return Err(format!("Unknown STORE_BACKEND: {}", other).into()),
        };

        Ok(Self {
            jwt_secret,
            region,
            dynamodb_endpoint,
            store_backend,
        })
    }
}

pub struct AppState {
    pub store: Arc<dyn MarketStore>,
    pub jwt: (EncodingKey, DecodingKey, Header),
}

impl AppState {
    pub async fn new(config: Config) -> Result<Self, Error> {
        let store: Arc<dyn MarketStore> = match config.store_backend {
            StoreBackend::DynamoDB => {
                let mut loader = aws_config::defaults(BehaviorVersion::latest())
                    .region(Region::new(config.region.clone()));
                if let Some(endpoint) = &config.dynamodb_endpoint {
                    loader = loader.endpoint_url(endpoint);
                }
                Arc::new(DynamoStore::new(&loader.load().await))
            }
            StoreBackend::Memory => Arc::new(MemoryStore::new()),
        };
        tracing::info!("Using {} store", store.backend_tag());

        Self::with_store(store, &config.jwt_secret)
    }

    pub fn with_store(store: Arc<dyn MarketStore>, secret: &str) -> Result<Self, Error> {
        Ok(Self {
            store,
            jwt: (
                EncodingKey::from_base64_secret(secret)?,
                DecodingKey::from_base64_secret(secret)?,
                Header::new(Algorithm::HS256),
            ),
        })
    }
}
