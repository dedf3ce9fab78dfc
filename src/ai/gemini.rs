use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{ChatError, ChatResult, Generate, GenerateRequest, GenerationConfig};
use crate::history::{Turn, TurnRole};

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash-exp-image-generation";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Client for the Gemini `generateContent` endpoint
pub struct GeminiClient {
    client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl GeminiClient {
    pub fn new(base_url: String, model: String, api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            api_key,
        }
    }

    pub fn has_credentials(&self) -> bool {
        self.api_key.as_deref().is_some_and(|key| !key.is_empty())
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest<'a> {
    contents: Vec<Turn>,
    generation_config: &'a GenerationConfig,
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiCandidateContent>,
}

#[derive(Deserialize)]
struct GeminiCandidateContent {
    #[serde(default)]
    parts: Vec<GeminiPartResponse>,
}

#[derive(Deserialize)]
struct GeminiPartResponse {
    text: Option<String>,
}

#[derive(Deserialize)]
struct GeminiErrorBody {
    error: GeminiError,
}

#[derive(Deserialize)]
struct GeminiError {
    message: String,
    #[serde(default)]
    status: Option<String>,
}

/// Concatenated text of the first candidate.
fn extract_text(body: &str) -> ChatResult<String> {
    let parsed: GeminiResponse = serde_json::from_str(body)?;
    let text = parsed
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect::<String>()
        })
        .unwrap_or_default();
    Ok(text)
}

fn classify_failure(status: u16, body: &str) -> ChatError {
    match serde_json::from_str::<GeminiErrorBody>(body) {
        Ok(parsed) => ChatError::service(
            status,
            parsed
                .error
                .status
                .unwrap_or_else(|| "SERVICE_ERROR".to_string()),
            parsed.error.message,
        ),
        Err(_) => ChatError::service(status, "SERVICE_ERROR", format!("Gemini error {status}: {body}")),
    }
}

#[async_trait]
impl Generate for GeminiClient {
    async fn generate(&self, request: &GenerateRequest) -> ChatResult<String> {
        let api_key = self
            .api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| ChatError::configuration("API key not configured"))?;

        let mut contents = request.history.clone();
        contents.push(Turn {
            role: TurnRole::User,
            parts: request.parts.clone(),
        });

        debug!(
            model = %self.model,
            history = request.history.len(),
            parts = request.parts.len(),
            "sending generateContent request"
        );

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(&GeminiRequest {
                contents,
                generation_config: &request.config,
            })
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(classify_failure(status.as_u16(), &body));
        }

        let text = extract_text(&body)?;
        if text.trim().is_empty() {
            return Err(ChatError::EmptyResponse);
        }
        Ok(text.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::Part;

    #[test]
    fn extracts_first_candidate_text() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"Hello"},{"text":" world"}]}}]}"#;
        assert_eq!(extract_text(body).unwrap(), "Hello world");
    }

    #[test]
    fn missing_candidates_yield_empty_text() {
        assert_eq!(extract_text(r#"{"candidates":[]}"#).unwrap(), "");
        assert_eq!(extract_text("{}").unwrap(), "");
    }

    #[test]
    fn classifies_provider_errors() {
        let body = r#"{"error":{"code":429,"message":"Quota exceeded","status":"RESOURCE_EXHAUSTED"}}"#;
        match classify_failure(429, body) {
            ChatError::Service {
                status,
                code,
                message,
            } => {
                assert_eq!(status, 429);
                assert_eq!(code, "RESOURCE_EXHAUSTED");
                assert_eq!(message, "Quota exceeded");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_key_is_configuration_error() {
        let client = GeminiClient::new(DEFAULT_BASE_URL.into(), DEFAULT_MODEL.into(), None);
        assert!(!client.has_credentials());
        let err = client
            .generate(&GenerateRequest::new(Vec::new(), vec![Part::text("hi")]))
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::Configuration(_)));
    }
}
