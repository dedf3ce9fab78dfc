/// AI module for Orhen
///
/// This module provides the backend capabilities the chat pipeline depends on:
/// generating a reply, running a search, and transcribing audio.
///
/// # Architecture
///
/// - `gemini` - Direct client for the Gemini `generateContent` REST API
/// - `remote` - Client for a running `orhen serve` instance
/// - `demo` - Static search and transcription providers
/// - `providers` - Provider selection from configuration
///
/// # Usage
///
/// ```rust,no_run
/// use orhen::ai::{Generate, GenerateRequest, ProviderClient};
/// use orhen::config::AppConfig;
/// use orhen::history::Part;
///
/// # async fn example() -> anyhow::Result<()> {
/// let backend = ProviderClient::from_config(&AppConfig::from_env());
/// let reply = backend
///     .generate(&GenerateRequest::new(Vec::new(), vec![Part::text("Hello!")]))
///     .await?;
/// # Ok(())
/// # }
/// ```
mod demo;
mod error;
mod gemini;
mod providers;
mod remote;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::history::{Part, Turn};
use crate::types::{InputMode, SearchResult};

pub use demo::{DemoSearch, DemoTranscriber};
pub use error::{ChatError, ChatResult, ErrorKind};
pub use gemini::{
    DEFAULT_BASE_URL as GEMINI_DEFAULT_BASE_URL, DEFAULT_MODEL as GEMINI_DEFAULT_MODEL, GeminiClient,
};
pub use providers::ProviderClient;
pub use remote::RemoteBackend;

/// Sampling settings sent with every generation call. Not user-configurable.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub max_output_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.9,
            top_p: 0.95,
            top_k: 40,
            max_output_tokens: 8192,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct GenerateRequest {
    pub history: Vec<Turn>,
    pub parts: Vec<Part>,
    pub config: GenerationConfig,
    pub mode: InputMode,
    /// Opaque behavior bundle, forwarded untouched.
    pub instructions: Option<serde_json::Value>,
}

impl GenerateRequest {
    pub fn new(history: Vec<Turn>, parts: Vec<Part>) -> Self {
        Self {
            history,
            parts,
            config: GenerationConfig::default(),
            mode: InputMode::Normal,
            instructions: None,
        }
    }
}

#[async_trait]
pub trait Generate: Send + Sync {
    async fn generate(&self, request: &GenerateRequest) -> ChatResult<String>;
}

#[async_trait]
pub trait Search: Send + Sync {
    async fn search(&self, query: &str) -> ChatResult<Vec<SearchResult>>;
}

#[async_trait]
pub trait Transcribe: Send + Sync {
    async fn transcribe(&self, audio: Vec<u8>) -> ChatResult<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_config_wire_names() {
        let json = serde_json::to_value(GenerationConfig::default()).unwrap();
        assert_eq!(json["topK"], 40);
        assert_eq!(json["maxOutputTokens"], 8192);
        assert!(json.get("topP").is_some());
    }
}
