use async_trait::async_trait;
use tracing::info;

use super::{ChatResult, Generate, GenerateRequest, GeminiClient, RemoteBackend};
use crate::config::AppConfig;

/// Enum to hold the generation backends
pub enum ProviderClient {
    Gemini(GeminiClient),
    Remote(RemoteBackend),
}

impl ProviderClient {
    /// Pick the backend from configuration
    pub fn from_config(config: &AppConfig) -> Self {
        // Priority order:
        // 1. ORHEN_SERVER_URL → a running `orhen serve`
        // 2. otherwise → Gemini directly (a missing key surfaces per request)

        if let Some(url) = &config.server_url {
            info!("using chat server at {}", url);
            return Self::Remote(RemoteBackend::new(url.clone()));
        }

        info!("using Gemini model {}", config.gemini_model);
        Self::Gemini(GeminiClient::new(
            config.gemini_base_url.clone(),
            config.gemini_model.clone(),
            config.gemini_api_key.clone(),
        ))
    }
}

#[async_trait]
impl Generate for ProviderClient {
    async fn generate(&self, request: &GenerateRequest) -> ChatResult<String> {
        match self {
            ProviderClient::Gemini(client) => client.generate(request).await,
            ProviderClient::Remote(client) => client.generate(request).await,
        }
    }
}
